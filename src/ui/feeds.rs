use crate::app::App;
use crate::feed::format_relative_time;
use crate::util::{strip_control_chars, truncate_to_width};
use crate::widget::FeedState;
use chrono::Utc;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

/// Render the feed panel: a selector line with the feed names, then the
/// items of the selected feed.
pub fn render(f: &mut Frame, app: &App, area: Rect, focused: bool) {
    let palette = &app.palette;
    let widget = &app.feed;

    let title = match widget.state() {
        FeedState::Loaded(snapshot) if !snapshot.title.is_empty() => {
            format!(" {} ", strip_control_chars(&snapshot.title))
        }
        _ => " Feeds ".to_string(),
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(if focused {
            palette.border_focused
        } else {
            palette.border
        })
        .title(Span::styled(title, palette.title))
        .style(palette.panel);
    let inner = block.inner(area);
    f.render_widget(block, area);

    if inner.height < 2 {
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(0)])
        .split(inner);

    render_selector(f, app, chunks[0]);

    let body = chunks[1];
    match widget.state() {
        FeedState::Empty => {
            let msg = Paragraph::new("No feeds configured. Add [[feeds]] entries to config.toml.")
                .style(palette.muted)
                .wrap(Wrap { trim: true });
            f.render_widget(msg, body);
        }
        FeedState::Loading => {
            f.render_widget(Paragraph::new("Loading...").style(palette.muted), body);
        }
        FeedState::Error(msg) => {
            let text = format!("Error loading feed: {}", strip_control_chars(msg));
            let para = Paragraph::new(text)
                .style(palette.error)
                .wrap(Wrap { trim: true });
            f.render_widget(para, body);
        }
        FeedState::Loaded(snapshot) if snapshot.is_error() => {
            let lines = vec![
                Line::from(Span::styled(snapshot.title.as_str(), palette.error)),
                Line::from(Span::styled(
                    strip_control_chars(&snapshot.description).into_owned(),
                    palette.muted,
                )),
            ];
            f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), body);
        }
        FeedState::Loaded(_) => render_items(f, app, body),
    }
}

fn render_selector(f: &mut Frame, app: &App, area: Rect) {
    let palette = &app.palette;
    let mut spans = Vec::new();
    for (i, source) in app.feed.feeds().iter().enumerate() {
        if i > 0 {
            spans.push(Span::styled(" | ", palette.muted));
        }
        let name = strip_control_chars(&source.name).into_owned();
        let style = if i == app.feed.selected_feed() {
            palette.selected
        } else {
            palette.muted
        };
        spans.push(Span::styled(name, style));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_items(f: &mut Frame, app: &App, area: Rect) {
    let palette = &app.palette;
    let items = app.feed.visible_items();

    if items.is_empty() {
        f.render_widget(
            Paragraph::new("No items in this feed").style(palette.muted),
            area,
        );
        return;
    }

    let now = Utc::now();
    // Room for " · 23h ago" plus borders
    let title_width = (area.width as usize).saturating_sub(14);

    let list_items: Vec<ListItem> = items
        .iter()
        .map(|item| {
            let title = strip_control_chars(&item.title);
            let title = truncate_to_width(&title, title_width).into_owned();
            let date = item
                .published_at
                .map(|d| format_relative_time(d, now))
                .unwrap_or_default();
            ListItem::new(Line::from(vec![
                Span::styled(title, palette.text),
                Span::styled(format!("  {}", date), palette.muted),
            ]))
        })
        .collect();

    let list = List::new(list_items).highlight_style(palette.selected);
    let mut state = ListState::default().with_selected(Some(app.feed.selected_item()));
    f.render_stateful_widget(list, area, &mut state);
}
