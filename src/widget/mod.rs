//! Start-page widgets and their lifecycle.
//!
//! The host calls [`Widget::on_attach`] once when the page comes up and
//! [`Widget::on_detach`] once when it goes away. Widgets do their I/O on
//! spawned tasks and report back through [`WidgetEvent`]s, which the host
//! drains on its event loop and hands to the owning widget. Widget state is
//! only ever mutated from that loop.

use async_trait::async_trait;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use tokio::sync::mpsc;

use crate::feed::FeedSnapshot;
use crate::music::PlaybackSnapshot;

pub mod feed;
pub mod player;

pub use feed::{FeedState, FeedWidget};
pub use player::{Control, PlayerView, PlayerWidget, PollHandle, POLL_INTERVAL, SKIP_SETTLE_DELAY};

/// Results delivered from widget background tasks to the host loop.
#[derive(Debug)]
pub enum WidgetEvent {
    /// A feed fetch finished.
    ///
    /// `generation` is the widget's fetch counter when the task was spawned;
    /// `Err` carries a panic message from the fetch task.
    FeedLoaded {
        generation: u64,
        index: usize,
        result: Result<FeedSnapshot, String>,
    },
    /// A playback poll finished. `authenticated` is the session state read
    /// after the poll, so a 401 during the poll shows up here as `false`.
    /// `epoch` is the player's logout counter when the poll was scheduled.
    PlaybackUpdated {
        epoch: u64,
        snapshot: Option<PlaybackSnapshot>,
        authenticated: bool,
    },
    /// A playback control request failed.
    ControlFailed {
        control: Control,
        error: String,
        requires_login: bool,
    },
    /// A background task panicked.
    TaskPanicked { task: &'static str, error: String },
}

#[async_trait]
pub trait Widget: Send {
    /// Called once when the page loads. `events` is where background results go.
    async fn on_attach(&mut self, events: mpsc::Sender<WidgetEvent>);

    /// Called once when the page unloads. Results arriving afterwards are
    /// ignored.
    fn on_detach(&mut self);
}

/// Runs `future`, converting a panic into `Err(message)`.
pub(crate) async fn catch_task_panic<F, T>(future: F) -> Result<T, String>
where
    F: std::future::Future<Output = T>,
{
    AssertUnwindSafe(future)
        .catch_unwind()
        .await
        .map_err(|panic| {
            if let Some(s) = panic.downcast_ref::<&'static str>() {
                s.to_string()
            } else if let Some(s) = panic.downcast_ref::<String>() {
                s.clone()
            } else {
                "Unknown panic".to_string()
            }
        })
}

/// Spawns `future`, reporting a panic as [`WidgetEvent::TaskPanicked`].
pub(crate) fn spawn_guarded<F>(task: &'static str, events: mpsc::Sender<WidgetEvent>, future: F)
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(error) = catch_task_panic(future).await {
            tracing::error!(task, error = %error, "Background task panicked");
            let _ = events.send(WidgetEvent::TaskPanicked { task, error }).await;
        }
    });
}
