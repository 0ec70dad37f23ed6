//! RSS/Atom feeds fetched through the rss2json conversion service.
//!
//! - [`fetcher`] - HTTP request, response decoding and item normalization
//! - [`format`] - publish-date parsing and relative-time display
//!
//! Fetching is fail-soft: [`FeedFetcher::fetch_feed`] always returns a
//! renderable [`FeedSnapshot`], substituting an error snapshot when anything
//! goes wrong.

mod fetcher;
mod format;
mod types;

pub use fetcher::{FeedError, FeedFetcher};
pub use format::{format_relative_time, parse_pub_date};
pub use types::{FeedItem, FeedSnapshot, FeedSource};
