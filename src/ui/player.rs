use crate::app::App;
use crate::music::format_time;
use crate::util::{strip_control_chars, truncate_to_width};
use crate::widget::PlayerView;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph, Wrap},
    Frame,
};

/// Render the now-playing panel.
pub fn render(f: &mut Frame, app: &App, area: Rect, focused: bool) {
    let palette = &app.palette;

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(if focused {
            palette.border_focused
        } else {
            palette.border
        })
        .title(Span::styled(" Spotify ", palette.title))
        .style(palette.panel);
    let inner = block.inner(area);
    f.render_widget(block, area);

    if inner.height < 1 {
        return;
    }

    let login_hint = |extra: Option<Line<'static>>| {
        let mut lines = vec![Line::from(Span::styled(
            "Press L to log in to Spotify",
            palette.accent,
        ))];
        if let Some(extra) = extra {
            lines.push(Line::from(""));
            lines.push(extra);
        }
        Paragraph::new(lines).wrap(Wrap { trim: true })
    };

    match app.player.view() {
        PlayerView::Unconfigured => {
            let warning = Line::from(Span::styled(
                "Client id not configured: set playback_client_id in config.toml",
                palette.error,
            ));
            f.render_widget(login_hint(Some(warning)), inner);
        }
        PlayerView::LoggedOut => f.render_widget(login_hint(None), inner),
        PlayerView::NoTrack => {
            f.render_widget(Paragraph::new("Nothing playing").style(palette.muted), inner);
        }
        PlayerView::NowPlaying(snapshot) => {
            let width = inner.width as usize;
            let track = &snapshot.track;
            let clean = |s: &str| truncate_to_width(&strip_control_chars(s), width).into_owned();

            let state = if snapshot.is_playing {
                "▶ Playing"
            } else {
                "⏸ Paused"
            };
            let lines = vec![
                Line::from(Span::styled(clean(&track.name), palette.title)),
                Line::from(Span::styled(clean(&track.artists), palette.text)),
                Line::from(Span::styled(clean(&track.album), palette.muted)),
                Line::from(""),
                Line::from(Span::styled(state, palette.accent)),
            ];

            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(0), Constraint::Length(1)])
                .split(inner);

            f.render_widget(Paragraph::new(lines), chunks[0]);

            let label = format!(
                "{} / {}",
                format_time(track.progress_ms),
                format_time(track.duration_ms)
            );
            let gauge = Gauge::default()
                .gauge_style(palette.gauge)
                .ratio(snapshot.progress_ratio())
                .label(label);
            f.render_widget(gauge, chunks[1]);
        }
    }
}
