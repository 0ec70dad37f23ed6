//! Spotify "now playing" support.
//!
//! - [`session`] - OAuth authorization code flow with PKCE, token storage
//!   and the authenticated request layer
//! - [`pkce`] - verifier generation and S256 challenge derivation
//! - [`types`] - normalized playback snapshot
//!
//! # Example
//!
//! ```ignore
//! let session = MusicSession::new(SessionConfig::from_config(&config), caps);
//! if !session.is_authenticated().await {
//!     let url = session.begin_authorization().await?;
//!     open::that(url.as_str())?;
//! }
//! let now_playing = session.get_currently_playing().await;
//! ```

mod error;
pub mod pkce;
mod session;
mod types;

pub use error::{AuthError, MusicError};
pub use session::{
    CallbackOutcome, MusicSession, SessionConfig, SessionState, ACCESS_TOKEN_KEY,
    CODE_VERIFIER_KEY, SCOPES, TOKEN_EXPIRY_KEY,
};
pub use types::{format_time, PlaybackSnapshot, Track};
