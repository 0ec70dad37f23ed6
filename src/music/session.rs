use chrono::{DateTime, TimeDelta, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use url::Url;

use super::error::{AuthError, MusicError};
use super::pkce::{code_challenge, generate_verifier, VERIFIER_LENGTH};
use super::types::PlaybackSnapshot;
use crate::capability::Capabilities;
use crate::config::Config;
use crate::http::{HttpRequest, Method};
use crate::storage::StoreError;

pub const ACCESS_TOKEN_KEY: &str = "spotify_access_token";
/// Expiry as epoch milliseconds, decimal string.
pub const TOKEN_EXPIRY_KEY: &str = "spotify_token_expiry";
pub const CODE_VERIFIER_KEY: &str = "spotify_code_verifier";

pub const SCOPES: [&str; 3] = [
    "user-read-currently-playing",
    "user-read-playback-state",
    "user-modify-playback-state",
];

/// Used when the token endpoint omits `expires_in`.
const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;
/// Upper bound on a stored token lifetime (one year).
const MAX_EXPIRES_IN_SECS: i64 = 365 * 24 * 3600;

/// Static settings for one session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub client_id: Option<String>,
    pub redirect_uri: String,
    pub authorize_url: String,
    pub token_url: String,
    pub api_base: String,
    pub allow_implicit_grant: bool,
}

impl SessionConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            client_id: config.client_id().map(str::to_string),
            redirect_uri: config.redirect_uri.clone(),
            authorize_url: config.endpoints.authorize.clone(),
            token_url: config.endpoints.token.clone(),
            api_base: config.endpoints.playback_api.clone(),
            allow_implicit_grant: config.allow_implicit_grant,
        }
    }
}

/// Where the session stands, derived from storage and the clock on each call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unconfigured,
    Unauthenticated,
    /// Verifier stored, waiting for the redirect back.
    Authenticating,
    Authenticated,
    /// Token still stored but past its expiry.
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// The URL carried no authorization response.
    NoCallback,
    /// A token was obtained and stored.
    Authorized,
}

struct AuthSession {
    access_token: SecretString,
    expires_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Spotify OAuth (authorization code + PKCE) session and authenticated
/// request layer.
///
/// All state lives in the injected key-value store; the struct itself holds
/// only configuration, so independent instances never interfere.
pub struct MusicSession {
    config: SessionConfig,
    caps: Capabilities,
}

impl MusicSession {
    pub fn new(config: SessionConfig, caps: Capabilities) -> Self {
        Self { config, caps }
    }

    pub fn is_configured(&self) -> bool {
        self.config.client_id.is_some()
    }

    fn client_id(&self) -> Result<&str, MusicError> {
        self.config.client_id.as_deref().ok_or(MusicError::Unconfigured)
    }

    // ========================================================================
    // Token storage
    // ========================================================================

    async fn stored_session(&self) -> Result<Option<AuthSession>, StoreError> {
        let store = &self.caps.store;
        let token = store.get(ACCESS_TOKEN_KEY).await?;
        let expiry = store.get(TOKEN_EXPIRY_KEY).await?;

        let (Some(token), Some(expiry)) = (token, expiry) else {
            return Ok(None);
        };
        let Some(expires_at) = expiry
            .trim()
            .parse::<i64>()
            .ok()
            .and_then(DateTime::from_timestamp_millis)
        else {
            tracing::warn!(expiry = %expiry, "Stored token expiry is not a timestamp");
            return Ok(None);
        };

        Ok(Some(AuthSession {
            access_token: SecretString::from(token),
            expires_at,
        }))
    }

    /// Valid (present and unexpired) access token.
    async fn token(&self) -> Result<Option<SecretString>, StoreError> {
        let now = self.caps.clock.now();
        Ok(self
            .stored_session()
            .await?
            .filter(|s| now < s.expires_at)
            .map(|s| s.access_token))
    }

    /// True iff a token and expiry are stored and the expiry is in the future.
    ///
    /// Purely a read-time check: an expired token stays in storage until
    /// logout or a 401.
    pub async fn is_authenticated(&self) -> bool {
        match self.token().await {
            Ok(token) => token.is_some(),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read session; treating as logged out");
                false
            }
        }
    }

    pub async fn state(&self) -> SessionState {
        if !self.is_configured() {
            return SessionState::Unconfigured;
        }
        let now = self.caps.clock.now();
        match self.stored_session().await {
            Ok(Some(session)) if now < session.expires_at => SessionState::Authenticated,
            Ok(Some(_)) => SessionState::Expired,
            Ok(None) => match self.caps.store.get(CODE_VERIFIER_KEY).await {
                Ok(Some(_)) => SessionState::Authenticating,
                _ => SessionState::Unauthenticated,
            },
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read session state");
                SessionState::Unauthenticated
            }
        }
    }

    async fn save_token(&self, access_token: &str, expires_in_secs: i64) -> Result<(), StoreError> {
        let clamped = expires_in_secs.clamp(0, MAX_EXPIRES_IN_SECS);
        if clamped != expires_in_secs {
            tracing::warn!(expires_in = expires_in_secs, clamped, "Token lifetime out of range");
        }
        let now = self.caps.clock.now();
        let expires_at = TimeDelta::try_seconds(clamped)
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .unwrap_or(now);
        self.caps.store.set(ACCESS_TOKEN_KEY, access_token).await?;
        self.caps
            .store
            .set(TOKEN_EXPIRY_KEY, &expires_at.timestamp_millis().to_string())
            .await?;
        tracing::info!(expires_at = %expires_at, "Spotify session stored");
        Ok(())
    }

    /// Clear the stored token and expiry.
    pub async fn logout(&self) {
        for key in [ACCESS_TOKEN_KEY, TOKEN_EXPIRY_KEY] {
            if let Err(e) = self.caps.store.remove(key).await {
                tracing::error!(key, error = %e, "Failed to clear session slot");
            }
        }
        tracing::info!("Spotify session cleared");
    }

    async fn remove_verifier(&self) {
        if let Err(e) = self.caps.store.remove(CODE_VERIFIER_KEY).await {
            tracing::error!(error = %e, "Failed to remove PKCE verifier");
        }
    }

    // ========================================================================
    // Authorization flow
    // ========================================================================

    /// Start an authorization attempt.
    ///
    /// Stores a fresh PKCE verifier (overwriting any previous one) and
    /// returns the authorization URL the user must visit.
    pub async fn begin_authorization(&self) -> Result<Url, MusicError> {
        let client_id = self.client_id()?;

        let verifier = generate_verifier(self.caps.random.as_ref(), VERIFIER_LENGTH);
        self.caps.store.set(CODE_VERIFIER_KEY, &verifier).await?;
        let challenge = code_challenge(self.caps.digest.as_ref(), &verifier);

        let scope = SCOPES.join(" ");
        let url = Url::parse_with_params(
            &self.config.authorize_url,
            &[
                ("client_id", client_id),
                ("response_type", "code"),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("scope", scope.as_str()),
                ("code_challenge_method", "S256"),
                ("code_challenge", challenge.as_str()),
                ("show_dialog", "false"),
            ],
        )?;

        tracing::info!("Authorization started");
        Ok(url)
    }

    /// Handle the redirect back from the authorization server.
    ///
    /// - `?code=` is exchanged for a token using the stored verifier
    /// - `?error=` clears the verifier and reports the denial
    /// - `#access_token=` (implicit grant) is stored only when
    ///   `allow_implicit_grant` is set
    ///
    /// The verifier is removed after every exchange attempt.
    pub async fn complete_authorization(&self, callback: &Url) -> Result<CallbackOutcome, MusicError> {
        let query = |name: &str| {
            callback
                .query_pairs()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.into_owned())
        };

        if let Some(error) = query("error") {
            self.remove_verifier().await;
            tracing::warn!(error = %error, "Authorization server returned an error");
            return Err(MusicError::AuthorizationDenied(error));
        }

        if let Some(code) = query("code") {
            return self.exchange_code(&code).await;
        }

        if let Some(fragment) = callback.fragment() {
            let params: Vec<(String, String)> = url::form_urlencoded::parse(fragment.as_bytes())
                .into_owned()
                .collect();
            let param = |name: &str| params.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str());

            if let Some(token) = param("access_token") {
                if !self.config.allow_implicit_grant {
                    tracing::warn!(
                        "Ignoring implicit-grant token in callback; set allow_implicit_grant to accept it"
                    );
                    return Ok(CallbackOutcome::NoCallback);
                }
                self.client_id()?;
                tracing::warn!("Accepting deprecated implicit-grant token");
                let expires_in = param("expires_in")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(DEFAULT_EXPIRES_IN_SECS);
                self.save_token(token, expires_in).await?;
                return Ok(CallbackOutcome::Authorized);
            }
        }

        Ok(CallbackOutcome::NoCallback)
    }

    async fn exchange_code(&self, code: &str) -> Result<CallbackOutcome, MusicError> {
        let client_id = self.client_id()?;
        let Some(verifier) = self.caps.store.get(CODE_VERIFIER_KEY).await? else {
            tracing::warn!("Authorization code received without a stored verifier");
            return Err(MusicError::MissingVerifier);
        };

        let body = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("client_id", client_id)
            .append_pair("grant_type", "authorization_code")
            .append_pair("code", code)
            .append_pair("redirect_uri", &self.config.redirect_uri)
            .append_pair("code_verifier", &verifier)
            .finish();

        let request = HttpRequest::new(Method::Post, &self.config.token_url)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(body);

        let result = self.caps.http.send(request).await;
        self.remove_verifier().await;
        let response = result?;

        if !response.is_success() {
            tracing::error!(status = response.status, "Failed to exchange code for token");
            return Err(MusicError::HttpStatus(response.status));
        }

        let token: TokenResponse = serde_json::from_str(&response.body)
            .map_err(|e| MusicError::Upstream(e.to_string()))?;
        self.save_token(
            &token.access_token,
            token.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS),
        )
        .await?;

        Ok(CallbackOutcome::Authorized)
    }

    // ========================================================================
    // Authenticated requests
    // ========================================================================

    /// Issue an authenticated call against the playback API.
    ///
    /// `endpoint` is relative to the versioned base (e.g. `/me/player/play`).
    /// Returns `Ok(None)` for 204 and empty bodies. A 401 clears the session
    /// before returning [`AuthError::TokenExpired`]. Never retries.
    pub async fn request(
        &self,
        endpoint: &str,
        method: Method,
        body: Option<&serde_json::Value>,
    ) -> Result<Option<serde_json::Value>, MusicError> {
        let Some(token) = self.token().await? else {
            return Err(AuthError::NotAuthenticated.into());
        };

        let url = format!("{}{}", self.config.api_base.trim_end_matches('/'), endpoint);
        let mut request = HttpRequest::new(method, url)
            .header("Authorization", format!("Bearer {}", token.expose_secret()))
            .header("Content-Type", "application/json");
        if let (Some(body), true) = (body, method != Method::Get) {
            request = request.body(body.to_string());
        }

        let response = self.caps.http.send(request).await?;
        match response.status {
            204 => return Ok(None),
            401 => {
                tracing::warn!(endpoint, "Spotify token rejected");
                self.logout().await;
                return Err(AuthError::TokenExpired.into());
            }
            status if !response.is_success() => return Err(MusicError::HttpStatus(status)),
            _ => {}
        }

        if response.body.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&response.body)
            .map(Some)
            .map_err(|e| MusicError::Upstream(e.to_string()))
    }

    /// Currently playing track, or `None` when nothing is active or the
    /// request failed for any reason.
    pub async fn get_currently_playing(&self) -> Option<PlaybackSnapshot> {
        let body = match self
            .request("/me/player/currently-playing", Method::Get, None)
            .await
        {
            Ok(Some(body)) => body,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(error = %e, "Error fetching current track");
                return None;
            }
        };

        PlaybackSnapshot::from_response(body).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Unexpected currently-playing payload");
            None
        })
    }

    pub async fn play(&self) -> Result<(), MusicError> {
        self.command("/me/player/play", Method::Put, "play").await
    }

    pub async fn pause(&self) -> Result<(), MusicError> {
        self.command("/me/player/pause", Method::Put, "pause").await
    }

    pub async fn next(&self) -> Result<(), MusicError> {
        self.command("/me/player/next", Method::Post, "next").await
    }

    pub async fn previous(&self) -> Result<(), MusicError> {
        self.command("/me/player/previous", Method::Post, "previous")
            .await
    }

    async fn command(&self, endpoint: &str, method: Method, action: &str) -> Result<(), MusicError> {
        self.request(endpoint, method, None)
            .await
            .map(|_| ())
            .inspect_err(|e| tracing::error!(action, error = %e, "Playback command failed"))
    }
}
