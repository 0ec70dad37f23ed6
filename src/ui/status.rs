use crate::app::{App, Focus};
use ratatui::{layout::Rect, widgets::Paragraph, Frame};
use std::borrow::Cow;

/// Render the status bar
pub fn render(f: &mut Frame, app: &App, area: Rect) {
    if area.width < 1 || area.height < 1 {
        return;
    }

    let text: Cow<'_, str> = if let Some((msg, _)) = &app.status_message {
        Cow::Borrowed(&**msg)
    } else {
        match app.focus {
            Focus::Feeds => Cow::Borrowed(
                "[h/l]feed [j/k]item [o]pen [r]eload [Space]play/pause [Tab]switch [?]help [q]uit",
            ),
            Focus::Player => Cow::Borrowed(
                "[Enter]play/pause [h/l]prev/next [L]ogin [X]logout [Tab]switch [?]help [q]uit",
            ),
        }
    };

    f.render_widget(Paragraph::new(text).style(app.palette.status_bar), area);
}
