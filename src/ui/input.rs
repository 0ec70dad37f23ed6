//! Keyboard input dispatch.

use crate::app::App;
use crate::keybindings::Action as KbAction;
use crate::util::validate_url_for_open;
use anyhow::Result;
use crossterm::event::{KeyCode, KeyModifiers};

use super::Action;

/// Route a key press to the focused panel or the global actions.
pub(super) async fn handle_input(
    app: &mut App,
    code: KeyCode,
    modifiers: KeyModifiers,
) -> Result<Action> {
    if app.show_help {
        if matches!(code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')) {
            app.show_help = false;
        }
        return Ok(Action::Continue);
    }

    let Some(action) = app
        .keybindings
        .action_for_key(code, modifiers, app.focus.context())
    else {
        return Ok(Action::Continue);
    };

    match action {
        KbAction::Quit => return Ok(Action::Quit),
        KbAction::CycleFocus => app.focus = app.focus.toggle(),
        KbAction::ShowHelp => app.show_help = true,

        KbAction::NavDown => app.feed.select_next_item(),
        KbAction::NavUp => app.feed.select_previous_item(),
        KbAction::NextFeed => app.feed.next_feed(),
        KbAction::PreviousFeed => app.feed.previous_feed(),
        KbAction::ReloadFeed => app.feed.reload(),
        KbAction::OpenInBrowser => open_selected_item(app),

        KbAction::TogglePlayback => app.player.toggle_playback(),
        KbAction::NextTrack => app.player.next(),
        KbAction::PreviousTrack => app.player.previous(),
        KbAction::Login => return start_login(app).await,
        KbAction::Logout => {
            app.player.logout().await;
            app.set_status("Logged out of Spotify");
        }
    }

    Ok(Action::Continue)
}

fn open_selected_item(app: &mut App) {
    let Some(link) = app.feed.selected_link().map(str::to_string) else {
        app.set_status("No item selected");
        return;
    };
    // SEC: Validate URL before open::that() so feed links cannot launch local handlers
    if let Err(e) = validate_url_for_open(&link) {
        app.set_status(e.to_string());
    } else if let Err(e) = open::that(&link) {
        app.set_status(format!("Failed to open browser: {}", e));
    }
}

/// Begin the Spotify login: open the authorization page and leave the event
/// loop so the browser can complete the redirect.
async fn start_login(app: &mut App) -> Result<Action> {
    if app.player.is_logged_in() {
        app.set_status("Already logged in");
        return Ok(Action::Continue);
    }

    match app.player.login().await {
        Ok(url) => {
            if let Err(e) = open::that(url.as_str()) {
                tracing::warn!(error = %e, "Failed to open browser for login");
            }
            app.pending_login = Some(url);
            Ok(Action::Quit)
        }
        Err(e) => {
            app.set_status(format!("Login unavailable: {}", e));
            Ok(Action::Continue)
        }
    }
}
