//! Configuration file parser for ~/.config/homedeck/config.toml.
//!
//! The config file is optional: a missing file yields `Config::default()`.
//! Unknown keys are accepted but logged as potential typos.
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

use crate::feed::FeedSource;
use crate::theme::PaletteConfig;

/// Placeholder shipped in sample configs. Treated the same as no client id.
pub const CLIENT_ID_PLACEHOLDER: &str = "YOUR_CLIENT_ID_HERE";

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("Invalid endpoint '{name}': {reason}")]
    InvalidEndpoint { name: &'static str, reason: String },
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Service endpoints. Overridable so tests and self-hosted converters can
/// point the clients elsewhere.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub feed_converter: String,
    pub authorize: String,
    pub token: String,
    pub playback_api: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            feed_converter: "https://api.rss2json.com/v1/api.json".to_string(),
            authorize: "https://accounts.spotify.com/authorize".to_string(),
            token: "https://accounts.spotify.com/api/token".to_string(),
            playback_api: "https://api.spotify.com/v1".to_string(),
        }
    }
}

impl Endpoints {
    /// Reject non-HTTPS endpoints (loopback excepted).
    pub fn validate(&self) -> Result<(), ConfigError> {
        let all = [
            ("feed_converter", &self.feed_converter),
            ("authorize", &self.authorize),
            ("token", &self.token),
            ("playback_api", &self.playback_api),
        ];
        for (name, value) in all {
            crate::util::validate_endpoint(value).map_err(|e| ConfigError::InvalidEndpoint {
                name,
                reason: e.to_string(),
            })?;
        }
        Ok(())
    }
}

/// Top-level application configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Feeds offered in the selector, in display order.
    pub feeds: Vec<FeedSource>,

    /// Items requested from the converter and shown per feed.
    pub max_items_per_feed: usize,

    /// Spotify application client id. `None` or the placeholder disables
    /// the player widget.
    pub playback_client_id: Option<String>,

    /// Registered redirect URI for the authorization code flow.
    pub redirect_uri: String,

    /// Accept `#access_token=` callbacks (deprecated implicit grant).
    pub allow_implicit_grant: bool,

    pub palette: PaletteConfig,

    /// Action name -> key string overrides, e.g. `quit = "Ctrl+q"`.
    pub keybindings: HashMap<String, String>,

    pub endpoints: Endpoints,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            feeds: Vec::new(),
            max_items_per_feed: 10,
            playback_client_id: None,
            redirect_uri: "http://127.0.0.1:8888/callback".to_string(),
            allow_implicit_grant: false,
            palette: PaletteConfig::default(),
            keybindings: HashMap::new(),
            endpoints: Endpoints::default(),
        }
    }
}

/// The client id is not a secret, but it identifies the user's app
/// registration; keep it out of logs anyway.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("feeds", &self.feeds)
            .field("max_items_per_feed", &self.max_items_per_feed)
            .field(
                "playback_client_id",
                &self.playback_client_id.as_ref().map(|_| "[REDACTED]"),
            )
            .field("redirect_uri", &self.redirect_uri)
            .field("allow_implicit_grant", &self.allow_implicit_grant)
            .field("palette", &self.palette)
            .field("keybindings", &self.keybindings)
            .field("endpoints", &self.endpoints)
            .finish()
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 8] = [
        "feeds",
        "max_items_per_feed",
        "playback_client_id",
        "redirect_uri",
        "allow_implicit_grant",
        "palette",
        "keybindings",
        "endpoints",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing or empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)`
    /// - Non-HTTPS endpoint → `Err(ConfigError::InvalidEndpoint)`
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(content)?;
        config.endpoints.validate()?;
        tracing::info!(
            feeds = config.feeds.len(),
            player = config.client_id().is_some(),
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Configured client id, or `None` when missing, blank or the placeholder.
    pub fn client_id(&self) -> Option<&str> {
        self.playback_client_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty() && *id != CLIENT_ID_PLACEHOLDER)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.feeds.is_empty());
        assert_eq!(config.max_items_per_feed, 10);
        assert!(config.client_id().is_none());
        assert!(!config.allow_implicit_grant);
        assert_eq!(config.endpoints.token, "https://accounts.spotify.com/api/token");
    }

    #[test]
    fn test_missing_file_returns_default() {
        let path = Path::new("/tmp/homedeck_test_nonexistent_config.toml");
        let config = Config::load(path).unwrap();
        assert_eq!(config.max_items_per_feed, 10);
    }

    #[test]
    fn test_whitespace_only_file_returns_default() {
        let dir = std::env::temp_dir().join("homedeck_config_test_whitespace");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "   \n  \n").unwrap();

        let config = Config::load(&path).unwrap();
        assert!(config.feeds.is_empty());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_full_config() {
        let content = r##"
max_items_per_feed = 5
playback_client_id = "6c129ccfdfc94390b2c234542cb75b62"
redirect_uri = "http://127.0.0.1:9999/cb"
allow_implicit_grant = true

[[feeds]]
name = "Heise News"
url = "https://www.heise.de/rss/heise-atom.xml"

[[feeds]]
name = "Golem.de"
url = "https://rss.golem.de/rss.php?feed=ATOM1.0"

[palette]
green = "#00ff00"
"##;
        let config = Config::from_toml(content).unwrap();
        assert_eq!(config.max_items_per_feed, 5);
        assert_eq!(config.feeds.len(), 2);
        assert_eq!(config.feeds[1].name, "Golem.de");
        assert_eq!(config.client_id(), Some("6c129ccfdfc94390b2c234542cb75b62"));
        assert_eq!(config.redirect_uri, "http://127.0.0.1:9999/cb");
        assert!(config.allow_implicit_grant);
        assert_eq!(config.palette.green, "#00ff00");
        // untouched palette keys keep defaults
        assert_eq!(config.palette.red, PaletteConfig::default().red);
    }

    #[test]
    fn test_placeholder_client_id_is_unconfigured() {
        let config = Config::from_toml("playback_client_id = \"YOUR_CLIENT_ID_HERE\"").unwrap();
        assert!(config.client_id().is_none());

        let config = Config::from_toml("playback_client_id = \"  \"").unwrap();
        assert!(config.client_id().is_none());
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let result = Config::from_toml("this is not [valid toml");
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().contains("Invalid TOML"));
    }

    #[test]
    fn test_wrong_type_returns_error() {
        assert!(Config::from_toml("max_items_per_feed = \"ten\"").is_err());
    }

    #[test]
    fn test_unknown_keys_accepted() {
        let config = Config::from_toml("clock = \"k:i p\"\nmax_items_per_feed = 3").unwrap();
        assert_eq!(config.max_items_per_feed, 3);
    }

    #[test]
    fn test_insecure_endpoint_rejected() {
        let result = Config::from_toml("[endpoints]\ntoken = \"http://evil.example/token\"");
        assert!(matches!(
            result,
            Err(ConfigError::InvalidEndpoint { name: "token", .. })
        ));
    }

    #[test]
    fn test_loopback_endpoint_accepted() {
        let config =
            Config::from_toml("[endpoints]\nplayback_api = \"http://127.0.0.1:4000/v1\"").unwrap();
        assert_eq!(config.endpoints.playback_api, "http://127.0.0.1:4000/v1");
    }

    #[test]
    fn test_too_large_file_rejected() {
        let dir = std::env::temp_dir().join("homedeck_config_test_too_large");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "a".repeat(1_048_577)).unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::TooLarge(_)));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_debug_masks_client_id() {
        let config = Config {
            playback_client_id: Some("my-app-id-12345".to_string()),
            ..Config::default()
        };
        let debug_output = format!("{:?}", config);
        assert!(!debug_output.contains("my-app-id-12345"));
        assert!(debug_output.contains("[REDACTED]"));
    }
}
