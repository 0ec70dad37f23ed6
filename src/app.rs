//! Host state for the start page: the two widgets plus the bits of UI state
//! that belong to neither (focus, status line, help overlay).

use std::borrow::Cow;
use tokio::time::Instant;
use url::Url;

use crate::keybindings::{Context, KeybindingRegistry};
use crate::theme::Palette;
use crate::widget::{FeedWidget, PlayerWidget};

/// Status messages disappear after this long.
const STATUS_TTL_SECS: u64 = 3;

/// Which panel receives panel-specific keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Feeds,
    Player,
}

impl Focus {
    pub fn toggle(self) -> Self {
        match self {
            Focus::Feeds => Focus::Player,
            Focus::Player => Focus::Feeds,
        }
    }

    pub fn context(self) -> Context {
        match self {
            Focus::Feeds => Context::Feeds,
            Focus::Player => Context::Player,
        }
    }
}

pub struct App {
    pub feed: FeedWidget,
    pub player: PlayerWidget,
    pub focus: Focus,
    pub palette: Palette,
    pub keybindings: KeybindingRegistry,
    pub show_help: bool,
    /// Message and the time it was set.
    pub status_message: Option<(Cow<'static, str>, Instant)>,
    pub needs_redraw: bool,
    /// Set when the user started a login; the host exits so the browser can
    /// take over, and prints this URL.
    pub pending_login: Option<Url>,
}

impl App {
    pub fn new(
        feed: FeedWidget,
        player: PlayerWidget,
        palette: Palette,
        keybindings: KeybindingRegistry,
    ) -> Self {
        Self {
            feed,
            player,
            focus: Focus::Feeds,
            palette,
            keybindings,
            show_help: false,
            status_message: None,
            needs_redraw: true,
            pending_login: None,
        }
    }

    pub fn set_status(&mut self, msg: impl Into<Cow<'static, str>>) {
        self.status_message = Some((msg.into(), Instant::now()));
        self.needs_redraw = true;
    }

    /// Clear the status message once it is older than its TTL.
    /// Returns true if a message was cleared.
    pub fn clear_expired_status(&mut self) -> bool {
        if let Some((_, time)) = &self.status_message {
            if time.elapsed().as_secs() >= STATUS_TTL_SECS {
                self.status_message = None;
                return true;
            }
        }
        false
    }
}
