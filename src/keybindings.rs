//! Keybinding registry: maps actions to key events with config overrides.
//!
//! Defaults cover both panels; `[keybindings]` in config.toml rebinds any
//! action by name (e.g. `toggle_playback = "p"`).
use crossterm::event::{KeyCode, KeyModifiers};
use std::collections::HashMap;

// ============================================================================
// Action Enum
// ============================================================================

/// All user-facing actions that can be triggered by keybindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Quit,
    NavDown,
    NavUp,
    CycleFocus,
    NextFeed,
    PreviousFeed,
    ReloadFeed,
    OpenInBrowser,
    TogglePlayback,
    NextTrack,
    PreviousTrack,
    Login,
    Logout,
    ShowHelp,
}

impl Action {
    /// Human-readable description for the help overlay.
    pub fn describe(self) -> &'static str {
        match self {
            Self::Quit => "Quit",
            Self::NavDown => "Next item",
            Self::NavUp => "Previous item",
            Self::CycleFocus => "Switch panel",
            Self::NextFeed => "Next feed",
            Self::PreviousFeed => "Previous feed",
            Self::ReloadFeed => "Reload feed",
            Self::OpenInBrowser => "Open item in browser",
            Self::TogglePlayback => "Play / pause",
            Self::NextTrack => "Next track",
            Self::PreviousTrack => "Previous track",
            Self::Login => "Log in to Spotify",
            Self::Logout => "Log out of Spotify",
            Self::ShowHelp => "Toggle help",
        }
    }
}

// ============================================================================
// Context Enum
// ============================================================================

/// Dispatch context: which panel has focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Context {
    Global,
    Feeds,
    Player,
}

// ============================================================================
// Key Specification
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeySpec {
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
}

impl KeySpec {
    pub const fn new(code: KeyCode, modifiers: KeyModifiers) -> Self {
        Self { code, modifiers }
    }

    pub const fn plain(code: KeyCode) -> Self {
        Self::new(code, KeyModifiers::NONE)
    }

    pub const fn ctrl(c: char) -> Self {
        Self::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }
}

/// Parse a key string from config into a KeySpec.
///
/// Supported formats:
/// - Single char: "q", "j", "/"
/// - Named keys: "Enter", "Esc", "Tab", "Up", "Down", "Left", "Right", "Space"
/// - Modifier combos: "Ctrl+q"
fn parse_key_string(s: &str) -> Option<KeySpec> {
    let s = s.trim();

    if let Some(rest) = s.strip_prefix("Ctrl+") {
        let mut chars = rest.trim().chars();
        return match (chars.next(), chars.next()) {
            (Some(c), None) => Some(KeySpec::ctrl(c)),
            _ => None,
        };
    }

    let named = match s.to_lowercase().as_str() {
        "enter" | "return" => Some(KeyCode::Enter),
        "esc" | "escape" => Some(KeyCode::Esc),
        "tab" => Some(KeyCode::Tab),
        "up" => Some(KeyCode::Up),
        "down" => Some(KeyCode::Down),
        "left" => Some(KeyCode::Left),
        "right" => Some(KeyCode::Right),
        "space" => Some(KeyCode::Char(' ')),
        _ => None,
    };
    if let Some(code) = named {
        return Some(KeySpec::plain(code));
    }

    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(KeySpec::plain(KeyCode::Char(c))),
        _ => None,
    }
}

/// Format a KeySpec for the help overlay.
fn format_key(key: &KeySpec) -> String {
    let modifier = if key.modifiers.contains(KeyModifiers::CONTROL) {
        "Ctrl+"
    } else {
        ""
    };

    let key_name = match key.code {
        KeyCode::Char(' ') => "Space".to_string(),
        KeyCode::Char(c) => c.to_string(),
        KeyCode::Enter => "Enter".to_string(),
        KeyCode::Esc => "Esc".to_string(),
        KeyCode::Tab => "Tab".to_string(),
        KeyCode::Up => "Up".to_string(),
        KeyCode::Down => "Down".to_string(),
        KeyCode::Left => "Left".to_string(),
        KeyCode::Right => "Right".to_string(),
        _ => "?".to_string(),
    };

    format!("{}{}", modifier, key_name)
}

fn parse_action_name(name: &str) -> Option<Action> {
    match name.to_lowercase().as_str() {
        "quit" => Some(Action::Quit),
        "nav_down" | "down" => Some(Action::NavDown),
        "nav_up" | "up" => Some(Action::NavUp),
        "cycle_focus" | "tab" => Some(Action::CycleFocus),
        "next_feed" => Some(Action::NextFeed),
        "previous_feed" | "prev_feed" => Some(Action::PreviousFeed),
        "reload_feed" | "reload" => Some(Action::ReloadFeed),
        "open_in_browser" | "open" => Some(Action::OpenInBrowser),
        "toggle_playback" | "play_pause" => Some(Action::TogglePlayback),
        "next_track" => Some(Action::NextTrack),
        "previous_track" | "prev_track" => Some(Action::PreviousTrack),
        "login" => Some(Action::Login),
        "logout" => Some(Action::Logout),
        "show_help" | "help" => Some(Action::ShowHelp),
        _ => None,
    }
}

// ============================================================================
// Keybinding Registry
// ============================================================================

/// Registry of keybindings with context-aware lookup: a key bound in the
/// focused panel's context wins over the same key in `Global`.
pub struct KeybindingRegistry {
    lookup: HashMap<(Context, KeySpec), Action>,
    /// All bindings, in registration order, for the help overlay
    bindings: Vec<(Context, KeySpec, Action)>,
}

impl KeybindingRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            lookup: HashMap::new(),
            bindings: Vec::new(),
        };
        registry.register_defaults();
        registry
    }

    fn bind(&mut self, context: Context, key: KeySpec, action: Action) {
        self.lookup.insert((context, key), action);
        self.bindings.push((context, key, action));
    }

    fn register_defaults(&mut self) {
        use KeyCode::*;

        // === Global ===
        self.bind(Context::Global, KeySpec::plain(Char('q')), Action::Quit);
        self.bind(Context::Global, KeySpec::ctrl('c'), Action::Quit);
        self.bind(Context::Global, KeySpec::plain(Tab), Action::CycleFocus);
        self.bind(Context::Global, KeySpec::plain(Char('?')), Action::ShowHelp);
        self.bind(Context::Global, KeySpec::plain(Char(' ')), Action::TogglePlayback);
        self.bind(Context::Global, KeySpec::plain(Char('L')), Action::Login);
        self.bind(Context::Global, KeySpec::plain(Char('X')), Action::Logout);

        // === Feeds panel ===
        self.bind(Context::Feeds, KeySpec::plain(Char('j')), Action::NavDown);
        self.bind(Context::Feeds, KeySpec::plain(Down), Action::NavDown);
        self.bind(Context::Feeds, KeySpec::plain(Char('k')), Action::NavUp);
        self.bind(Context::Feeds, KeySpec::plain(Up), Action::NavUp);
        self.bind(Context::Feeds, KeySpec::plain(Char('l')), Action::NextFeed);
        self.bind(Context::Feeds, KeySpec::plain(Right), Action::NextFeed);
        self.bind(Context::Feeds, KeySpec::plain(Char('h')), Action::PreviousFeed);
        self.bind(Context::Feeds, KeySpec::plain(Left), Action::PreviousFeed);
        self.bind(Context::Feeds, KeySpec::plain(Char('r')), Action::ReloadFeed);
        self.bind(Context::Feeds, KeySpec::plain(Char('o')), Action::OpenInBrowser);
        self.bind(Context::Feeds, KeySpec::plain(Enter), Action::OpenInBrowser);

        // === Player panel ===
        self.bind(Context::Player, KeySpec::plain(Enter), Action::TogglePlayback);
        self.bind(Context::Player, KeySpec::plain(Char('l')), Action::NextTrack);
        self.bind(Context::Player, KeySpec::plain(Right), Action::NextTrack);
        self.bind(Context::Player, KeySpec::plain(Char('h')), Action::PreviousTrack);
        self.bind(Context::Player, KeySpec::plain(Left), Action::PreviousTrack);
    }

    /// Apply user overrides from the config `[keybindings]` table.
    ///
    /// Keys in the map are action names (e.g. "quit", "next_track"); values
    /// are key strings (e.g. "q", "Ctrl+q"). The new key replaces every
    /// existing binding for the action, in the same contexts.
    ///
    /// Returns warnings for unknown action names or unparseable keys.
    pub fn apply_overrides(&mut self, overrides: &HashMap<String, String>) -> Vec<String> {
        let mut warnings = Vec::new();

        for (action_name, key_str) in overrides {
            let Some(action) = parse_action_name(action_name) else {
                warnings.push(format!("Unknown action '{}', ignoring", action_name));
                continue;
            };
            let Some(key) = parse_key_string(key_str) else {
                warnings.push(format!(
                    "Cannot parse key '{}' for action '{}', ignoring",
                    key_str, action_name
                ));
                continue;
            };

            let mut contexts: Vec<Context> = self
                .bindings
                .iter()
                .filter(|(_, _, a)| *a == action)
                .map(|(c, _, _)| *c)
                .collect();
            contexts.dedup();

            self.lookup.retain(|_, a| *a != action);
            self.bindings.retain(|(_, _, a)| *a != action);
            for ctx in contexts {
                self.bind(ctx, key, action);
            }

            tracing::info!(action = %action_name, key = %key_str, "Applied keybinding override");
        }

        warnings
    }

    /// Look up the action for a key, trying `context` first and then Global.
    pub fn action_for_key(
        &self,
        code: KeyCode,
        modifiers: KeyModifiers,
        context: Context,
    ) -> Option<Action> {
        let key = KeySpec::new(code, modifiers);
        self.lookup
            .get(&(context, key))
            .or_else(|| self.lookup.get(&(Context::Global, key)))
            .copied()
    }

    /// (context, key, description) for every binding, in registration order.
    pub fn all_bindings(&self) -> Vec<(Context, String, &'static str)> {
        self.bindings
            .iter()
            .map(|(ctx, key, action)| (*ctx, format_key(key), action.describe()))
            .collect()
    }
}

impl Default for KeybindingRegistry {
    fn default() -> Self {
        Self::new()
    }
}
