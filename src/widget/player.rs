use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use url::Url;

use super::{spawn_guarded, Widget, WidgetEvent};
use crate::music::{CallbackOutcome, MusicError, MusicSession, PlaybackSnapshot};

/// How often the currently-playing track is refreshed.
pub const POLL_INTERVAL: Duration = Duration::from_millis(5000);

/// Wait after previous/next before re-polling, so the API reports the new
/// track instead of the old one.
pub const SKIP_SETTLE_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerView {
    /// No client id configured; login cannot work.
    Unconfigured,
    LoggedOut,
    /// Logged in, nothing active on any device.
    NoTrack,
    NowPlaying(PlaybackSnapshot),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Play,
    Pause,
    Next,
    Previous,
}

impl Control {
    pub fn name(self) -> &'static str {
        match self {
            Control::Play => "play",
            Control::Pause => "pause",
            Control::Next => "next",
            Control::Previous => "previous",
        }
    }

    fn settle_delay(self) -> Duration {
        match self {
            Control::Play | Control::Pause => Duration::ZERO,
            Control::Next | Control::Previous => SKIP_SETTLE_DELAY,
        }
    }

    async fn send(self, session: &MusicSession) -> Result<(), MusicError> {
        match self {
            Control::Play => session.play().await,
            Control::Pause => session.pause().await,
            Control::Next => session.next().await,
            Control::Previous => session.previous().await,
        }
    }
}

/// Handle to the periodic playback poll.
///
/// Stopping is idempotent and safe before [`PollHandle::start`]. Dropping
/// the handle stops the task.
#[derive(Debug, Default)]
pub struct PollHandle {
    task: Option<JoinHandle<()>>,
}

impl PollHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Poll every `period`, first tick one period from now, tagging results
    /// with `epoch`. Restarts if already running.
    pub fn start(
        &mut self,
        session: Arc<MusicSession>,
        events: mpsc::Sender<WidgetEvent>,
        period: Duration,
        epoch: u64,
    ) {
        self.stop();
        self.task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if !poll_once(&session, &events, epoch).await {
                    tracing::debug!("Playback poll stopped (receiver closed)");
                    break;
                }
            }
        }));
        tracing::debug!(period_ms = period.as_millis() as u64, "Playback polling started");
    }

    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::debug!("Playback polling stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Fetch the current track and report it along with the post-poll auth
/// state. Returns false once the receiver is gone.
async fn poll_once(session: &MusicSession, events: &mpsc::Sender<WidgetEvent>, epoch: u64) -> bool {
    let snapshot = session.get_currently_playing().await;
    let authenticated = session.is_authenticated().await;
    events
        .send(WidgetEvent::PlaybackUpdated {
            epoch,
            snapshot,
            authenticated,
        })
        .await
        .is_ok()
}

/// Spotify "now playing" widget.
pub struct PlayerWidget {
    session: Arc<MusicSession>,
    /// Redirect URL handed over by the host, resolved on attach.
    pending_callback: Option<Url>,
    view: PlayerView,
    poll: PollHandle,
    poll_interval: Duration,
    /// Bumped on logout; poll results from an earlier epoch are dropped.
    session_epoch: u64,
    events: Option<mpsc::Sender<WidgetEvent>>,
    detached: bool,
}

impl PlayerWidget {
    pub fn new(session: Arc<MusicSession>, pending_callback: Option<Url>) -> Self {
        let view = if session.is_configured() {
            PlayerView::LoggedOut
        } else {
            PlayerView::Unconfigured
        };
        Self {
            session,
            pending_callback,
            view,
            poll: PollHandle::new(),
            poll_interval: POLL_INTERVAL,
            session_epoch: 0,
            events: None,
            detached: false,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn view(&self) -> &PlayerView {
        &self.view
    }

    pub fn is_polling(&self) -> bool {
        self.poll.is_running()
    }

    pub fn is_logged_in(&self) -> bool {
        matches!(self.view, PlayerView::NoTrack | PlayerView::NowPlaying(_))
    }

    pub fn session_epoch(&self) -> u64 {
        self.session_epoch
    }

    /// Apply a poll result. A `false` auth state means the session was
    /// cleared (e.g. by a 401), so polling stops and the login prompt shows.
    /// Results polled before the last logout are dropped.
    pub fn apply_playback(
        &mut self,
        epoch: u64,
        snapshot: Option<PlaybackSnapshot>,
        authenticated: bool,
    ) {
        if self.detached {
            return;
        }
        if epoch != self.session_epoch {
            tracing::debug!(epoch, current = self.session_epoch, "Discarding poll from before logout");
            return;
        }
        if !authenticated {
            if self.is_logged_in() {
                tracing::info!("Spotify session ended; showing login prompt");
            }
            self.poll.stop();
            self.view = self.logged_out_view();
            return;
        }
        self.view = match snapshot {
            Some(snapshot) => PlayerView::NowPlaying(snapshot),
            None => PlayerView::NoTrack,
        };
    }

    /// Apply a failed control. Returns the status line to show, or `None`
    /// once detached.
    pub fn apply_control_failure(
        &mut self,
        control: Control,
        error: &str,
        requires_login: bool,
    ) -> Option<String> {
        if self.detached {
            return None;
        }
        if requires_login {
            self.poll.stop();
            self.view = self.logged_out_view();
        }
        Some(format!("Failed to {}: {}", control.name(), error))
    }

    /// Play if paused or idle, pause if playing.
    pub fn toggle_playback(&self) {
        let control = match &self.view {
            PlayerView::NowPlaying(snapshot) if snapshot.is_playing => Control::Pause,
            _ => Control::Play,
        };
        self.send_control(control);
    }

    pub fn next(&self) {
        self.send_control(Control::Next);
    }

    pub fn previous(&self) {
        self.send_control(Control::Previous);
    }

    /// Issue `control` in the background, then re-poll after its settle
    /// delay. Failures come back as [`WidgetEvent::ControlFailed`].
    pub fn send_control(&self, control: Control) {
        if !self.is_logged_in() {
            tracing::debug!(control = control.name(), "Ignoring control while logged out");
            return;
        }
        let Some(events) = self.events.clone() else {
            return;
        };
        let session = self.session.clone();
        let task_events = events.clone();
        let epoch = self.session_epoch;

        spawn_guarded("playback_control", events, async move {
            match control.send(&session).await {
                Ok(()) => {
                    let delay = control.settle_delay();
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    poll_once(&session, &task_events, epoch).await;
                }
                Err(e) => {
                    let _ = task_events
                        .send(WidgetEvent::ControlFailed {
                            control,
                            error: e.to_string(),
                            requires_login: e.requires_login(),
                        })
                        .await;
                }
            }
        });
    }

    /// Start an authorization attempt and return the URL to open. The host
    /// is expected to open it and exit; the flow finishes on the next run.
    pub async fn login(&self) -> Result<Url, MusicError> {
        self.session.begin_authorization().await
    }

    pub async fn logout(&mut self) {
        self.poll.stop();
        self.session_epoch = self.session_epoch.wrapping_add(1);
        self.session.logout().await;
        self.view = self.logged_out_view();
    }

    fn logged_out_view(&self) -> PlayerView {
        if self.session.is_configured() {
            PlayerView::LoggedOut
        } else {
            PlayerView::Unconfigured
        }
    }

    async fn resolve_callback(&mut self) {
        let Some(callback) = self.pending_callback.take() else {
            return;
        };
        match self.session.complete_authorization(&callback).await {
            Ok(CallbackOutcome::Authorized) => tracing::info!("Spotify login complete"),
            Ok(CallbackOutcome::NoCallback) => {
                tracing::debug!("Callback URL carried no authorization response")
            }
            Err(e) => tracing::error!(error = %e, "Spotify login failed"),
        }
    }
}

#[async_trait]
impl Widget for PlayerWidget {
    async fn on_attach(&mut self, events: mpsc::Sender<WidgetEvent>) {
        self.events = Some(events.clone());

        if !self.session.is_configured() {
            tracing::warn!("Spotify client id not set; configure playback_client_id in config.toml");
            self.view = PlayerView::Unconfigured;
            return;
        }

        self.resolve_callback().await;

        if !self.session.is_authenticated().await {
            self.view = PlayerView::LoggedOut;
            return;
        }

        let snapshot = self.session.get_currently_playing().await;
        let authenticated = self.session.is_authenticated().await;
        self.apply_playback(self.session_epoch, snapshot, authenticated);

        if authenticated {
            self.poll.start(
                self.session.clone(),
                events,
                self.poll_interval,
                self.session_epoch,
            );
        }
    }

    fn on_detach(&mut self) {
        self.poll.stop();
        self.detached = true;
        self.events = None;
    }
}
