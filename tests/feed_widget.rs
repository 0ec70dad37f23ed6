//! Integration tests for the feed widget: fetch through the converter,
//! selection changes while fetches are in flight, and task failures.

use async_trait::async_trait;
use homedeck::feed::FeedFetcher;
use homedeck::feed::FeedSource;
use homedeck::http::{HttpClient, HttpRequest, HttpResponse, ReqwestHttp, TransportError};
use homedeck::widget::{FeedState, FeedWidget, Widget, WidgetEvent};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn source(name: &str) -> FeedSource {
    FeedSource {
        name: name.to_string(),
        url: format!("https://{}.example/rss", name),
    }
}

fn converter_body(title: &str, items: &[&str]) -> String {
    let items: Vec<_> = items
        .iter()
        .map(|t| {
            serde_json::json!({
                "title": t,
                "link": format!("https://example.com/{}", t),
                "pubDate": "2024-01-01 00:00:00",
                "description": "<p>body</p>",
            })
        })
        .collect();
    serde_json::json!({"status": "ok", "feed": {"title": title}, "items": items}).to_string()
}

async fn mount_feed(server: &MockServer, name: &str, title: &str, delay: Duration) {
    Mock::given(method("GET"))
        .and(path("/api.json"))
        .and(query_param("rss_url", format!("https://{}.example/rss", name)))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(converter_body(title, &["one", "two", "three"]))
                .set_delay(delay),
        )
        .mount(server)
        .await;
}

fn widget_for(server: &MockServer, feeds: Vec<FeedSource>, max_items: usize) -> FeedWidget {
    let http = Arc::new(ReqwestHttp::new().unwrap());
    let fetcher = Arc::new(FeedFetcher::new(http, format!("{}/api.json", server.uri())));
    FeedWidget::new(fetcher, feeds, max_items)
}

async fn apply_next(widget: &mut FeedWidget, rx: &mut mpsc::Receiver<WidgetEvent>) {
    match rx.recv().await.expect("channel closed") {
        WidgetEvent::FeedLoaded {
            generation,
            index,
            result,
        } => widget.apply_loaded(generation, index, result),
        other => panic!("unexpected event: {:?}", other),
    }
}

#[tokio::test]
async fn test_attach_loads_first_feed() {
    let server = MockServer::start().await;
    mount_feed(&server, "a", "Feed A", Duration::ZERO).await;

    let (tx, mut rx) = mpsc::channel(8);
    let mut widget = widget_for(&server, vec![source("a"), source("b")], 2);
    widget.on_attach(tx).await;
    assert_eq!(widget.state(), &FeedState::Loading);

    apply_next(&mut widget, &mut rx).await;

    let FeedState::Loaded(snapshot) = widget.state() else {
        panic!("expected loaded state, got {:?}", widget.state());
    };
    assert_eq!(snapshot.title, "Feed A");
    assert_eq!(snapshot.items[0].description, "body");
    assert!(snapshot.items[0].published_at.is_some());
    assert_eq!(widget.visible_items().len(), 2, "capped at max_items");
    assert_eq!(widget.selected_link(), Some("https://example.com/one"));
}

#[tokio::test]
async fn test_selection_race_resolves_to_latest_selection() {
    let server = MockServer::start().await;
    mount_feed(&server, "slow", "Slow feed", Duration::from_millis(300)).await;
    mount_feed(&server, "fast", "Fast feed", Duration::ZERO).await;

    let (tx, mut rx) = mpsc::channel(8);
    let mut widget = widget_for(&server, vec![source("slow"), source("fast")], 10);
    widget.on_attach(tx).await;
    widget.select_feed(1);

    // Fast result lands first, the slow one for the old selection after it
    apply_next(&mut widget, &mut rx).await;
    apply_next(&mut widget, &mut rx).await;

    assert_eq!(widget.selected_feed(), 1);
    let FeedState::Loaded(snapshot) = widget.state() else {
        panic!("expected loaded state, got {:?}", widget.state());
    };
    assert_eq!(snapshot.title, "Fast feed");
}

#[tokio::test]
async fn test_converter_failure_shows_error_snapshot() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let (tx, mut rx) = mpsc::channel(8);
    let mut widget = widget_for(&server, vec![source("a")], 10);
    widget.on_attach(tx).await;
    apply_next(&mut widget, &mut rx).await;

    let FeedState::Loaded(snapshot) = widget.state() else {
        panic!("expected loaded state, got {:?}", widget.state());
    };
    assert!(snapshot.is_error());
    assert_eq!(snapshot.description, "HTTP error! status: 500");
    assert!(widget.visible_items().is_empty());
}

struct PanickingHttp;

#[async_trait]
impl HttpClient for PanickingHttp {
    async fn send(&self, _request: HttpRequest) -> Result<HttpResponse, TransportError> {
        panic!("boom");
    }
}

#[tokio::test]
async fn test_panicking_fetch_surfaces_as_error_state() {
    let fetcher = Arc::new(FeedFetcher::new(
        Arc::new(PanickingHttp),
        "https://api.rss2json.com/v1/api.json",
    ));
    let (tx, mut rx) = mpsc::channel(8);
    let mut widget = FeedWidget::new(fetcher, vec![source("a")], 10);
    widget.on_attach(tx).await;
    apply_next(&mut widget, &mut rx).await;

    assert_eq!(widget.state(), &FeedState::Error("boom".to_string()));
}
