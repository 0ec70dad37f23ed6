use thiserror::Error;

use crate::http::TransportError;
use crate::storage::StoreError;

/// Reasons an authenticated call was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    /// No token stored, or the stored token is past its expiry.
    #[error("not authenticated")]
    NotAuthenticated,
    /// The API answered 401; the session has already been cleared.
    #[error("token expired")]
    TokenExpired,
}

/// Errors from the Spotify session layer.
#[derive(Debug, Error)]
pub enum MusicError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// Non-2xx response other than 401
    #[error("Spotify API error: {0}")]
    HttpStatus(u16),
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),
    /// Response body was not the expected shape
    #[error("Unexpected response from Spotify: {0}")]
    Upstream(String),
    /// Authorization callback arrived but no verifier was stored
    #[error("No PKCE code verifier stored; start the login again")]
    MissingVerifier,
    /// The authorization server redirected back with `?error=`
    #[error("Authorization denied: {0}")]
    AuthorizationDenied(String),
    #[error("Spotify client id not configured")]
    Unconfigured,
    #[error(transparent)]
    Storage(#[from] StoreError),
    #[error("Invalid endpoint URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl MusicError {
    /// The error is a 401 or missing token; the user must log in again.
    pub fn requires_login(&self) -> bool {
        matches!(self, MusicError::Auth(_))
    }
}
