mod auth;
mod dashboard;
mod feedback;
mod layout;
mod markup;
mod nav_bar;
mod profile;
mod request;
mod status_bar;
mod team;
mod theme;

use crate::app::state::{AppState, Screen, TextInput};
use crate::query::QueryKey;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use ratatui::prelude::*;
use ratatui::widgets::block::Padding;
use ratatui::widgets::{Block, Borders, Paragraph};
use theme::Theme;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const SPINNER: [&str; 4] = ["|", "/", "-", "\\"];

pub fn render(frame: &mut Frame, state: &AppState) {
    let area = frame.area();
    frame.render_widget(Block::default().style(Theme::panel_bg()), area);
    let app_layout = layout::compute_layout(area);

    nav_bar::render(frame, app_layout.nav_bar, state);
    match state.screen {
        Screen::Auth => auth::render(frame, app_layout.content, state),
        Screen::Dashboard => dashboard::render(frame, app_layout.content, state),
        Screen::Feedback => feedback::render(frame, app_layout.content, state),
        Screen::RequestFeedback => request::render(frame, app_layout.content, state),
        Screen::Team => team::render(frame, app_layout.content, state),
        Screen::Profile => profile::render(frame, app_layout.content, state),
    }
    status_bar::render(frame, app_layout.status_bar, state);
}

fn panel(title: &str, focused: bool) -> Block<'static> {
    let (border_style, border_type) = if focused {
        (Theme::border_focused(), Theme::border_type_focused())
    } else {
        (Theme::border(), Theme::border_type())
    };
    Block::default()
        .title(format!(" {} ", title))
        .title_style(Theme::title())
        .borders(Borders::ALL)
        .border_type(border_type)
        .border_style(border_style)
        .padding(Padding::horizontal(1))
}

/// `[("Enter", "Open"), ...]` as a single hint line.
fn help_line(hints: &[(&str, &str)]) -> Line<'static> {
    let mut spans = Vec::with_capacity(hints.len() * 2);
    for (key, label) in hints {
        spans.push(Span::styled(format!(" {}", key), Theme::key_hint()));
        spans.push(Span::styled(format!(" {} ", label), Theme::secondary()));
    }
    Line::from(spans)
}

fn render_help(frame: &mut Frame, area: Rect, hints: &[(&str, &str)]) {
    if area.height == 0 {
        return;
    }
    let row = Rect::new(area.x, area.bottom() - 1, area.width, 1);
    frame.render_widget(Paragraph::new(help_line(hints)), row);
}

/// One labelled form row. A focused text row places the terminal cursor.
fn form_row(frame: &mut Frame, area: Rect, label: &str, value: Line<'static>, focused: bool) {
    let marker = if focused { "> " } else { "  " };
    let label_style = if focused { Theme::label() } else { Theme::secondary() };
    let mut spans = vec![Span::styled(format!("{}{:<14}", marker, label), label_style)];
    spans.extend(value.spans);
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

const FORM_LABEL_WIDTH: u16 = 16;

fn input_row(frame: &mut Frame, area: Rect, label: &str, input: &TextInput, focused: bool) {
    let text = input.display();
    let available = area.width.saturating_sub(FORM_LABEL_WIDTH) as usize;
    let visible = if focused {
        tail_to_width(&text, available.saturating_sub(1))
    } else {
        truncate(&text, available)
    };
    form_row(
        frame,
        area,
        label,
        Line::from(Span::styled(visible.clone(), Theme::text())),
        focused,
    );
    if focused {
        let column = input.cursor_column().min(visible.width()) as u16;
        let x = (area.x + FORM_LABEL_WIDTH + column).min(area.right().saturating_sub(1));
        frame.set_cursor_position((x, area.y));
    }
}

fn choice(text: impl Into<String>, focused: bool) -> Line<'static> {
    let text = text.into();
    if focused {
        Line::from(vec![
            Span::styled("< ", Theme::key_hint()),
            Span::styled(text, Theme::text()),
            Span::styled(" >", Theme::key_hint()),
        ])
    } else {
        Line::from(Span::styled(text, Theme::text()))
    }
}

fn checkbox(checked: bool) -> Line<'static> {
    let mark = if checked { "[x]" } else { "[ ]" };
    Line::from(Span::styled(mark, Theme::text()))
}

fn tag_spans(tags: &[String]) -> Vec<Span<'static>> {
    let mut spans = Vec::new();
    for tag in tags {
        spans.push(Span::styled(format!(" {} ", tag), Theme::tag()));
        spans.push(Span::raw(" "));
    }
    spans
}

fn loading_line(tick: u64) -> Line<'static> {
    Line::from(Span::styled(
        format!(" {} Loading...", spinner(tick)),
        Theme::muted(),
    ))
}

/// Title suffix saying how current the cached data for `key` is.
fn freshness(state: &AppState, key: &QueryKey) -> String {
    let Some(entry) = state.queries.entry(key) else {
        return String::new();
    };
    if entry.in_flight() && entry.data.is_some() {
        return format!(" {}", spinner(state.tick_count));
    }
    if entry.stale {
        return " · stale".to_string();
    }
    match entry.updated_at {
        Some(at) => format!(" · {}s ago", at.elapsed().as_secs()),
        None => String::new(),
    }
}

fn spinner(tick: u64) -> &'static str {
    SPINNER[(tick % SPINNER.len() as u64) as usize]
}

/// Backend timestamps are ISO-8601, with or without an offset.
pub fn format_date(raw: &str, format: &str) -> String {
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return dt.format(format).to_string();
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.format(format).to_string();
    }
    if let Ok(d) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return d.format(format).to_string();
    }
    raw.to_string()
}

/// Cut `text` to at most `width` terminal columns, marking the cut with `…`.
pub fn truncate(text: &str, width: usize) -> String {
    if text.width() <= width {
        return text.to_string();
    }
    if width == 0 {
        return String::new();
    }
    let mut out = String::new();
    let mut used = 0;
    for c in text.chars() {
        let w = c.width().unwrap_or(0);
        if used + w + 1 > width {
            break;
        }
        out.push(c);
        used += w;
    }
    out.push('…');
    out
}

/// The last `width` columns of `text`, so the end of a long input stays visible.
fn tail_to_width(text: &str, width: usize) -> String {
    let mut used = 0;
    let mut start = text.len();
    for (i, c) in text.char_indices().rev() {
        let w = c.width().unwrap_or(0);
        if used + w > width {
            break;
        }
        used += w;
        start = i;
    }
    text[start..].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_date_variants() {
        assert_eq!(format_date("2024-03-01T10:00:00", "%Y-%m-%d"), "2024-03-01");
        assert_eq!(format_date("2024-03-01T10:00:00.123456", "%d/%m/%Y"), "01/03/2024");
        assert_eq!(format_date("2024-03-01T10:00:00+00:00", "%b %d"), "Mar 01");
        assert_eq!(format_date("2024-03-01", "%d.%m."), "01.03.");
        assert_eq!(format_date("yesterday", "%Y"), "yesterday");
    }

    #[test]
    fn test_truncate_counts_columns() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefgh", 5), "abcd…");
        assert_eq!(truncate("日本語テキスト", 7), "日本語…");
        assert_eq!(truncate("abc", 0), "");
    }

    #[test]
    fn test_tail_to_width() {
        assert_eq!(tail_to_width("hello world", 5), "world");
        assert_eq!(tail_to_width("hi", 5), "hi");
    }

    #[test]
    fn test_help_line_pairs_keys_and_labels() {
        let line = help_line(&[("Enter", "Open"), ("Esc", "Back")]);
        assert_eq!(line.spans.len(), 4);
        assert_eq!(line.spans[0].content, " Enter");
        assert_eq!(line.spans[3].content, " Back ");
    }
}
