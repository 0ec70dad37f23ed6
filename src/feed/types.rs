use chrono::{DateTime, Utc};
use serde::Deserialize;

/// A configured feed. Identified by its position in the config list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FeedSource {
    pub name: String,
    pub url: String,
}

/// Most recent fetch result for one feed. Replaced, never merged.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedSnapshot {
    pub title: String,
    pub description: String,
    pub link: String,
    pub items: Vec<FeedItem>,
}

impl FeedSnapshot {
    pub const ERROR_TITLE: &'static str = "Error loading feed";

    /// Degraded snapshot returned when a fetch fails.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            title: Self::ERROR_TITLE.to_string(),
            description: message.into(),
            link: "#".to_string(),
            items: Vec::new(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.title == Self::ERROR_TITLE && self.link == "#" && self.items.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeedItem {
    pub title: String,
    pub link: String,
    /// Plain text; markup already stripped.
    pub description: String,
    /// `None` when the upstream date could not be parsed.
    pub published_at: Option<DateTime<Utc>>,
    pub thumbnail_url: Option<String>,
}
