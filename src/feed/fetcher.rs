use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use url::Url;

use super::format::parse_pub_date;
use super::types::{FeedItem, FeedSnapshot};
use crate::http::{HttpClient, HttpRequest, TransportError};
use crate::util::strip_html;

/// Errors that can occur while fetching a feed.
///
/// Never escapes [`FeedFetcher::fetch_feed`]; the message becomes the
/// description of the error snapshot.
#[derive(Debug, Error)]
pub enum FeedError {
    /// Network-level error (DNS, connection, TLS, timeout)
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// Converter answered with a non-2xx status
    #[error("HTTP error! status: {0}")]
    HttpStatus(u16),
    /// Converter reported an application-level failure
    #[error("RSS API error: {0}")]
    Upstream(String),
    /// Response body was not the expected JSON shape
    #[error("Unexpected response from feed converter: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Invalid feed converter URL: {0}")]
    InvalidEndpoint(#[from] url::ParseError),
}

// ============================================================================
// Converter wire format
// ============================================================================

#[derive(Debug, Deserialize)]
struct RawResponse {
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    feed: RawFeed,
    #[serde(default, deserialize_with = "null_as_default")]
    items: Vec<RawItem>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawFeed {
    #[serde(deserialize_with = "null_as_default")]
    title: String,
    #[serde(deserialize_with = "null_as_default")]
    description: String,
    #[serde(deserialize_with = "null_as_default")]
    link: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawItem {
    #[serde(deserialize_with = "null_as_default")]
    title: String,
    #[serde(deserialize_with = "null_as_default")]
    link: String,
    #[serde(deserialize_with = "null_as_default")]
    pub_date: String,
    #[serde(deserialize_with = "null_as_default")]
    description: String,
    thumbnail: Option<String>,
    enclosure: Option<RawEnclosure>,
}

/// Converters emit `null` for missing RSS elements; read it as the default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawEnclosure {
    link: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

impl From<RawItem> for FeedItem {
    fn from(raw: RawItem) -> Self {
        let published_at = parse_pub_date(&raw.pub_date);
        if published_at.is_none() && !raw.pub_date.is_empty() {
            tracing::debug!(pub_date = %raw.pub_date, "Unparseable item date");
        }

        let thumbnail_url = non_empty(raw.thumbnail)
            .or_else(|| non_empty(raw.enclosure.and_then(|e| e.link)));

        FeedItem {
            title: raw.title,
            link: raw.link,
            description: strip_html(&raw.description),
            published_at,
            thumbnail_url,
        }
    }
}

// ============================================================================
// Fetcher
// ============================================================================

/// Stateless client for the RSS-to-JSON conversion endpoint.
#[derive(Clone)]
pub struct FeedFetcher {
    http: Arc<dyn HttpClient>,
    endpoint: String,
}

impl FeedFetcher {
    pub fn new(http: Arc<dyn HttpClient>, endpoint: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
        }
    }

    /// Fetch and normalize one feed, limited to `item_limit` items.
    ///
    /// Never fails: transport errors, non-2xx statuses, malformed bodies and
    /// converter-reported errors all yield [`FeedSnapshot::error`] with the
    /// error message as description.
    pub async fn fetch_feed(&self, feed_url: &str, item_limit: usize) -> FeedSnapshot {
        match self.try_fetch(feed_url, item_limit).await {
            Ok(snapshot) => {
                tracing::debug!(
                    feed = %feed_url,
                    items = snapshot.items.len(),
                    "Feed fetched"
                );
                snapshot
            }
            Err(e) => {
                tracing::warn!(feed = %feed_url, error = %e, "Error fetching RSS feed");
                FeedSnapshot::error(e.to_string())
            }
        }
    }

    async fn try_fetch(&self, feed_url: &str, item_limit: usize) -> Result<FeedSnapshot, FeedError> {
        let count = item_limit.to_string();
        let url = Url::parse_with_params(
            &self.endpoint,
            &[("rss_url", feed_url), ("count", count.as_str())],
        )?;

        let response = self.http.send(HttpRequest::get(url.as_str())).await?;
        if !response.is_success() {
            return Err(FeedError::HttpStatus(response.status));
        }

        let raw: RawResponse = serde_json::from_str(&response.body)?;
        if raw.status != "ok" {
            return Err(FeedError::Upstream(
                non_empty(raw.message).unwrap_or_else(|| "Unknown error".to_string()),
            ));
        }

        Ok(FeedSnapshot {
            title: raw.feed.title,
            description: raw.feed.description,
            link: raw.feed.link,
            items: raw.items.into_iter().map(FeedItem::from).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::ReqwestHttp;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher_for(server: &MockServer) -> FeedFetcher {
        let http = Arc::new(ReqwestHttp::new().unwrap());
        FeedFetcher::new(http, format!("{}/v1/api.json", server.uri()))
    }

    #[tokio::test]
    async fn test_fetch_normalizes_items() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/api.json"))
            .and(query_param("rss_url", "https://example.com/rss"))
            .and(query_param("count", "5"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"status":"ok","feed":{"title":"T"},"items":[
                    {"title":"A","pubDate":"2024-01-01T00:00:00Z","description":"<p>hi</p>"}
                ]}"#,
            ))
            .expect(1)
            .mount(&mock_server)
            .await;

        let snapshot = fetcher_for(&mock_server)
            .fetch_feed("https://example.com/rss", 5)
            .await;

        assert_eq!(snapshot.title, "T");
        assert_eq!(snapshot.items.len(), 1);
        assert_eq!(snapshot.items[0].title, "A");
        assert_eq!(snapshot.items[0].description, "hi");
        assert_eq!(
            snapshot.items[0].published_at,
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(snapshot.items[0].thumbnail_url, None);
    }

    #[tokio::test]
    async fn test_thumbnail_falls_back_to_enclosure() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"status":"ok","feed":{"title":"T","description":"D","link":"https://example.com"},
                   "items":[
                     {"title":"explicit","thumbnail":"https://img/1.png","enclosure":{"link":"https://img/2.png"}},
                     {"title":"empty thumb","thumbnail":"","enclosure":{"link":"https://img/3.png"}},
                     {"title":"nothing","enclosure":{}}
                   ]}"#,
            ))
            .mount(&mock_server)
            .await;

        let snapshot = fetcher_for(&mock_server).fetch_feed("https://example.com/rss", 10).await;

        let thumbs: Vec<_> = snapshot
            .items
            .iter()
            .map(|i| i.thumbnail_url.as_deref())
            .collect();
        assert_eq!(
            thumbs,
            vec![Some("https://img/1.png"), Some("https://img/3.png"), None]
        );
        assert_eq!(snapshot.description, "D");
        assert_eq!(snapshot.link, "https://example.com");
    }

    #[tokio::test]
    async fn test_null_fields_read_as_empty() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"status":"ok","feed":{"title":"T","description":null,"link":null},
                   "items":[
                     {"title":null,"link":null,"pubDate":null,"description":null,"thumbnail":null},
                     {"title":"B","link":"https://example.com/b"}
                   ]}"#,
            ))
            .mount(&mock_server)
            .await;

        let snapshot = fetcher_for(&mock_server).fetch_feed("https://example.com/rss", 10).await;

        assert!(!snapshot.is_error());
        assert_eq!(snapshot.description, "");
        assert_eq!(snapshot.items.len(), 2);
        assert_eq!(snapshot.items[0].title, "");
        assert_eq!(snapshot.items[0].published_at, None);
        assert_eq!(snapshot.items[0].thumbnail_url, None);
        assert_eq!(snapshot.items[1].link, "https://example.com/b");
    }

    #[tokio::test]
    async fn test_http_500_is_fail_soft() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1) // no retries
            .mount(&mock_server)
            .await;

        let snapshot = fetcher_for(&mock_server).fetch_feed("https://example.com/rss", 5).await;

        assert!(snapshot.is_error());
        assert_eq!(snapshot.title, "Error loading feed");
        assert_eq!(snapshot.description, "HTTP error! status: 500");
        assert_eq!(snapshot.link, "#");
        assert!(snapshot.items.is_empty());
    }

    #[tokio::test]
    async fn test_upstream_error_status() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"status":"error","message":"Cannot download this RSS feed"}"#,
            ))
            .mount(&mock_server)
            .await;

        let snapshot = fetcher_for(&mock_server).fetch_feed("https://bad.example/rss", 5).await;

        assert!(snapshot.is_error());
        assert_eq!(snapshot.description, "RSS API error: Cannot download this RSS feed");
    }

    #[tokio::test]
    async fn test_upstream_error_without_message() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"status":"error"}"#))
            .mount(&mock_server)
            .await;

        let snapshot = fetcher_for(&mock_server).fetch_feed("https://bad.example/rss", 5).await;
        assert_eq!(snapshot.description, "RSS API error: Unknown error");
    }

    #[tokio::test]
    async fn test_malformed_body_is_fail_soft() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>nope</html>"))
            .mount(&mock_server)
            .await;

        let snapshot = fetcher_for(&mock_server).fetch_feed("https://example.com/rss", 5).await;
        assert!(snapshot.is_error());
        assert!(snapshot.description.starts_with("Unexpected response"));
    }

    #[tokio::test]
    async fn test_transport_failure_is_fail_soft() {
        let http = Arc::new(ReqwestHttp::new().unwrap());
        let fetcher = FeedFetcher::new(http, "http://127.0.0.1:9/v1/api.json");

        let snapshot = fetcher.fetch_feed("https://example.com/rss", 5).await;
        assert!(snapshot.is_error());
        assert!(snapshot.items.is_empty());
    }
}
