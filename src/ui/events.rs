//! Widget event handling.
//!
//! Background results are routed back to the widget that spawned them.

use crate::app::App;
use crate::widget::WidgetEvent;

pub(super) fn handle_widget_event(app: &mut App, event: WidgetEvent) {
    match event {
        WidgetEvent::FeedLoaded {
            generation,
            index,
            result,
        } => {
            app.feed.apply_loaded(generation, index, result);
        }
        WidgetEvent::PlaybackUpdated {
            epoch,
            snapshot,
            authenticated,
        } => {
            let was_logged_in = app.player.is_logged_in();
            app.player.apply_playback(epoch, snapshot, authenticated);
            if was_logged_in && !app.player.is_logged_in() {
                app.set_status("Spotify session expired; press L to log in again");
            }
        }
        WidgetEvent::ControlFailed {
            control,
            error,
            requires_login,
        } => {
            if let Some(status) = app.player.apply_control_failure(control, &error, requires_login) {
                app.set_status(status);
            }
        }
        WidgetEvent::TaskPanicked { task, error } => {
            app.set_status(format!("Internal error in {}: {}", task, error));
        }
    }
    app.needs_redraw = true;
}
