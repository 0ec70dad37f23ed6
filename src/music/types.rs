use serde::Deserialize;

/// Normalized currently-playing state. Replaced wholesale on every poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackSnapshot {
    pub is_playing: bool,
    pub track: Track,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub name: String,
    /// Artist names joined with ", "
    pub artists: String,
    pub album: String,
    pub album_art_url: Option<String>,
    pub duration_ms: u64,
    pub progress_ms: u64,
    pub uri: String,
}

impl PlaybackSnapshot {
    /// Normalize a `/me/player/currently-playing` body. `None` when no item
    /// is active.
    pub(crate) fn from_response(body: serde_json::Value) -> Result<Option<Self>, serde_json::Error> {
        let raw: RawCurrentlyPlaying = serde_json::from_value(body)?;
        Ok(raw.item.map(|item| PlaybackSnapshot {
            is_playing: raw.is_playing,
            track: Track {
                name: item.name,
                artists: item
                    .artists
                    .into_iter()
                    .map(|a| a.name)
                    .collect::<Vec<_>>()
                    .join(", "),
                album: item.album.name,
                album_art_url: item.album.images.into_iter().next().map(|i| i.url),
                duration_ms: item.duration_ms,
                progress_ms: raw.progress_ms.unwrap_or(0),
                uri: item.uri,
            },
        }))
    }

    /// Playback position as a fraction of the track, clamped to `[0, 1]`.
    pub fn progress_ratio(&self) -> f64 {
        if self.track.duration_ms == 0 {
            return 0.0;
        }
        (self.track.progress_ms as f64 / self.track.duration_ms as f64).clamp(0.0, 1.0)
    }
}

/// Format milliseconds as `m:ss`.
///
/// ```
/// use homedeck::music::format_time;
///
/// assert_eq!(format_time(0), "0:00");
/// assert_eq!(format_time(61_999), "1:01");
/// assert_eq!(format_time(3_600_000), "60:00");
/// ```
pub fn format_time(ms: u64) -> String {
    let total_seconds = ms / 1000;
    format!("{}:{:02}", total_seconds / 60, total_seconds % 60)
}

// ============================================================================
// Wire format
// ============================================================================

#[derive(Debug, Deserialize)]
struct RawCurrentlyPlaying {
    #[serde(default)]
    is_playing: bool,
    #[serde(default)]
    progress_ms: Option<u64>,
    #[serde(default)]
    item: Option<RawItem>,
}

#[derive(Debug, Deserialize)]
struct RawItem {
    #[serde(default)]
    name: String,
    #[serde(default)]
    uri: String,
    #[serde(default)]
    duration_ms: u64,
    #[serde(default)]
    artists: Vec<RawNamed>,
    #[serde(default)]
    album: RawAlbum,
}

#[derive(Debug, Deserialize)]
struct RawNamed {
    name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawAlbum {
    name: String,
    images: Vec<RawImage>,
}

#[derive(Debug, Deserialize)]
struct RawImage {
    url: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_from_response_normalizes_track() {
        let body = json!({
            "is_playing": true,
            "progress_ms": 30_000,
            "item": {
                "name": "Song",
                "uri": "spotify:track:1",
                "duration_ms": 120_000,
                "artists": [{"name": "A"}, {"name": "B"}],
                "album": {"name": "Album", "images": [{"url": "https://i/640"}, {"url": "https://i/300"}]}
            }
        });

        let snapshot = PlaybackSnapshot::from_response(body).unwrap().unwrap();
        assert_eq!(
            snapshot,
            PlaybackSnapshot {
                is_playing: true,
                track: Track {
                    name: "Song".to_string(),
                    artists: "A, B".to_string(),
                    album: "Album".to_string(),
                    album_art_url: Some("https://i/640".to_string()),
                    duration_ms: 120_000,
                    progress_ms: 30_000,
                    uri: "spotify:track:1".to_string(),
                },
            }
        );
        assert_eq!(snapshot.progress_ratio(), 0.25);
    }

    #[test]
    fn test_null_item_is_none() {
        let body = json!({"is_playing": false, "item": null});
        assert_eq!(PlaybackSnapshot::from_response(body).unwrap(), None);
    }

    #[test]
    fn test_missing_album_art() {
        let body = json!({
            "is_playing": false,
            "item": {"name": "Episode", "uri": "spotify:episode:1", "duration_ms": 1000}
        });
        let snapshot = PlaybackSnapshot::from_response(body).unwrap().unwrap();
        assert_eq!(snapshot.track.album_art_url, None);
        assert_eq!(snapshot.track.artists, "");
        assert_eq!(snapshot.track.progress_ms, 0);
    }

    #[test]
    fn test_progress_ratio_clamped() {
        let mut snapshot = PlaybackSnapshot {
            is_playing: true,
            track: Track {
                name: String::new(),
                artists: String::new(),
                album: String::new(),
                album_art_url: None,
                duration_ms: 0,
                progress_ms: 10,
                uri: String::new(),
            },
        };
        assert_eq!(snapshot.progress_ratio(), 0.0);

        snapshot.track.duration_ms = 5;
        assert_eq!(snapshot.progress_ratio(), 1.0);
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(59_999), "0:59");
        assert_eq!(format_time(185_000), "3:05");
    }
}
