use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;

use super::{catch_task_panic, Widget, WidgetEvent};
use crate::feed::{FeedFetcher, FeedItem, FeedSnapshot, FeedSource};

/// What the feed panel is currently showing.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedState {
    /// No feeds configured. Terminal.
    Empty,
    Loading,
    Loaded(FeedSnapshot),
    /// The fetch task itself failed (panicked). Fetch errors arrive as a
    /// degraded [`FeedSnapshot`] instead.
    Error(String),
}

/// Feed reader widget: a list of configured feeds, one of them selected,
/// and the last snapshot fetched for it.
///
/// Every fetch is tagged with a generation number. Switching feeds bumps the
/// generation, so a slow response for a previously selected feed can never
/// overwrite the newer one.
pub struct FeedWidget {
    fetcher: Arc<FeedFetcher>,
    feeds: Vec<FeedSource>,
    max_items: usize,
    selected_feed: usize,
    selected_item: usize,
    state: FeedState,
    generation: u64,
    events: Option<mpsc::Sender<WidgetEvent>>,
    detached: bool,
}

impl FeedWidget {
    pub fn new(fetcher: Arc<FeedFetcher>, feeds: Vec<FeedSource>, max_items: usize) -> Self {
        let state = if feeds.is_empty() {
            FeedState::Empty
        } else {
            FeedState::Loading
        };
        Self {
            fetcher,
            feeds,
            max_items,
            selected_feed: 0,
            selected_item: 0,
            state,
            generation: 0,
            events: None,
            detached: false,
        }
    }

    pub fn state(&self) -> &FeedState {
        &self.state
    }

    pub fn feeds(&self) -> &[FeedSource] {
        &self.feeds
    }

    pub fn selected_feed(&self) -> usize {
        self.selected_feed
    }

    pub fn selected_item(&self) -> usize {
        self.selected_item
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Items to display, capped at `max_items`.
    pub fn visible_items(&self) -> &[FeedItem] {
        match &self.state {
            FeedState::Loaded(snapshot) => {
                let n = snapshot.items.len().min(self.max_items);
                &snapshot.items[..n]
            }
            _ => &[],
        }
    }

    /// Link of the highlighted item, if any.
    pub fn selected_link(&self) -> Option<&str> {
        self.visible_items()
            .get(self.selected_item)
            .map(|item| item.link.as_str())
            .filter(|link| !link.is_empty())
    }

    /// Switch to feed `index` and start fetching it. Out-of-range indices are
    /// ignored.
    pub fn select_feed(&mut self, index: usize) {
        if index >= self.feeds.len() {
            tracing::warn!(index, feeds = self.feeds.len(), "Feed index out of range");
            return;
        }
        self.selected_feed = index;
        self.spawn_fetch();
    }

    pub fn next_feed(&mut self) {
        if self.feeds.is_empty() {
            return;
        }
        self.select_feed((self.selected_feed + 1) % self.feeds.len());
    }

    pub fn previous_feed(&mut self) {
        if self.feeds.is_empty() {
            return;
        }
        let len = self.feeds.len();
        self.select_feed((self.selected_feed + len - 1) % len);
    }

    /// Refetch the selected feed.
    pub fn reload(&mut self) {
        if !self.feeds.is_empty() {
            self.spawn_fetch();
        }
    }

    pub fn select_next_item(&mut self) {
        let len = self.visible_items().len();
        if len > 0 {
            self.selected_item = (self.selected_item + 1).min(len - 1);
        }
    }

    pub fn select_previous_item(&mut self) {
        self.selected_item = self.selected_item.saturating_sub(1);
    }

    /// Apply a finished fetch. Stale generations and results arriving after
    /// detach are dropped.
    pub fn apply_loaded(&mut self, generation: u64, index: usize, result: Result<FeedSnapshot, String>) {
        if self.detached {
            tracing::debug!(generation, "Ignoring feed result after detach");
            return;
        }
        if generation != self.generation {
            tracing::debug!(
                generation,
                current = self.generation,
                index,
                "Discarding stale feed result"
            );
            return;
        }

        self.selected_item = 0;
        self.state = match result {
            Ok(snapshot) => FeedState::Loaded(snapshot),
            Err(panic_msg) => FeedState::Error(panic_msg),
        };
    }

    fn spawn_fetch(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        self.state = FeedState::Loading;
        self.selected_item = 0;

        let Some(events) = self.events.clone() else {
            return;
        };
        let generation = self.generation;
        let index = self.selected_feed;
        let url = self.feeds[index].url.clone();
        let fetcher = self.fetcher.clone();
        let limit = self.max_items;

        tracing::debug!(index, generation, feed = %url, "Spawning feed fetch");

        tokio::spawn(async move {
            let result = catch_task_panic(async { fetcher.fetch_feed(&url, limit).await }).await;
            if let Err(panic_msg) = &result {
                tracing::error!(task = "feed_fetch", index, error = %panic_msg, "Background task panicked");
            }
            if events
                .send(WidgetEvent::FeedLoaded {
                    generation,
                    index,
                    result,
                })
                .await
                .is_err()
            {
                tracing::debug!(index, "Feed result dropped (receiver closed)");
            }
        });
    }
}

#[async_trait]
impl Widget for FeedWidget {
    async fn on_attach(&mut self, events: mpsc::Sender<WidgetEvent>) {
        self.events = Some(events);
        if self.feeds.is_empty() {
            tracing::info!("No feeds configured");
            self.state = FeedState::Empty;
            return;
        }
        self.spawn_fetch();
    }

    fn on_detach(&mut self) {
        self.detached = true;
        self.events = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::ReqwestHttp;

    fn source(name: &str) -> FeedSource {
        FeedSource {
            name: name.to_string(),
            url: format!("https://{name}.example/rss"),
        }
    }

    fn widget(feeds: Vec<FeedSource>) -> FeedWidget {
        let http = Arc::new(ReqwestHttp::new().unwrap());
        let fetcher = Arc::new(FeedFetcher::new(http, "http://127.0.0.1:9/api.json"));
        FeedWidget::new(fetcher, feeds, 2)
    }

    fn item(title: &str) -> FeedItem {
        FeedItem {
            title: title.to_string(),
            link: format!("https://example.com/{title}"),
            description: String::new(),
            published_at: None,
            thumbnail_url: None,
        }
    }

    fn snapshot(items: Vec<FeedItem>) -> FeedSnapshot {
        FeedSnapshot {
            title: "T".to_string(),
            description: String::new(),
            link: "https://example.com".to_string(),
            items,
        }
    }

    #[tokio::test]
    async fn test_no_feeds_is_empty() {
        let (tx, _rx) = mpsc::channel(4);
        let mut w = widget(Vec::new());
        w.on_attach(tx).await;
        assert_eq!(w.state(), &FeedState::Empty);

        w.next_feed();
        w.reload();
        assert_eq!(w.state(), &FeedState::Empty);
        assert_eq!(w.generation(), 0);
    }

    #[test]
    fn test_selection_wraps() {
        let mut w = widget(vec![source("a"), source("b"), source("c")]);
        w.previous_feed();
        assert_eq!(w.selected_feed(), 2);
        w.next_feed();
        assert_eq!(w.selected_feed(), 0);
        w.select_feed(7);
        assert_eq!(w.selected_feed(), 0);
    }

    #[test]
    fn test_stale_generation_is_discarded() {
        let mut w = widget(vec![source("a"), source("b")]);
        w.select_feed(0);
        let first = w.generation();
        w.select_feed(1);
        let second = w.generation();

        w.apply_loaded(second, 1, Ok(snapshot(vec![item("fresh")])));
        w.apply_loaded(first, 0, Ok(snapshot(vec![item("stale")])));

        assert_eq!(w.visible_items()[0].title, "fresh");
    }

    #[test]
    fn test_visible_items_capped_and_item_navigation() {
        let mut w = widget(vec![source("a")]);
        w.select_feed(0);
        let generation = w.generation();
        w.apply_loaded(
            generation,
            0,
            Ok(snapshot(vec![item("1"), item("2"), item("3")])),
        );

        assert_eq!(w.visible_items().len(), 2);
        w.select_next_item();
        w.select_next_item();
        assert_eq!(w.selected_item(), 1);
        assert_eq!(w.selected_link(), Some("https://example.com/2"));
        w.select_previous_item();
        w.select_previous_item();
        assert_eq!(w.selected_item(), 0);
    }

    #[test]
    fn test_panic_result_becomes_error_state() {
        let mut w = widget(vec![source("a")]);
        w.select_feed(0);
        let generation = w.generation();
        w.apply_loaded(generation, 0, Err("boom".to_string()));
        assert_eq!(w.state(), &FeedState::Error("boom".to_string()));
    }

    #[test]
    fn test_results_after_detach_are_ignored() {
        let mut w = widget(vec![source("a")]);
        w.select_feed(0);
        let generation = w.generation();
        w.on_detach();
        w.apply_loaded(generation, 0, Ok(snapshot(Vec::new())));
        assert_eq!(w.state(), &FeedState::Loading);
    }
}
