//! Utility functions shared by the widgets and the terminal host.
//!
//! - **Text processing**: HTML-to-text, control-character stripping and
//!   Unicode-aware truncation
//! - **URL validation**: scheme checks before opening links and HTTPS checks
//!   for configured service endpoints

mod text;
mod url_validator;

pub use text::{strip_control_chars, strip_html, truncate_to_width};
pub use url_validator::{validate_endpoint, validate_url_for_open, UrlValidationError};
