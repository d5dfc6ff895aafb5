use crate::app::state::*;
use crate::ui::theme::Theme;
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;
use unicode_width::UnicodeWidthStr;

pub fn render(frame: &mut Frame, area: Rect, state: &AppState) {
    let bar = Theme::status_bar();
    let mut parts: Vec<Span> = Vec::new();

    // Signed-in user
    if let Some(user) = state.current_user() {
        parts.push(Span::styled(
            format!(" [{} · {}] ", user.username, user.role),
            Style::default().fg(Theme::ACCENT_GREEN).bg(Theme::BG_ELEVATED),
        ));
    }

    if let Some(mutation) = state.pending_mutation {
        parts.push(Span::styled(
            format!(" {} {}... ", super::spinner(state.tick_count), mutation),
            Theme::warning().bg(Theme::BG_ELEVATED),
        ));
    } else if state.exporting.is_some() {
        parts.push(Span::styled(
            format!(" {} exporting... ", super::spinner(state.tick_count)),
            Theme::warning().bg(Theme::BG_ELEVATED),
        ));
    }

    match &state.status {
        Some(StatusMessage { text, kind: StatusKind::Error }) => {
            parts.push(Span::styled(format!(" {} ", text), Theme::error().bg(Theme::BG_ELEVATED)));
        }
        Some(StatusMessage { text, kind: StatusKind::Info }) => {
            parts.push(Span::styled(format!(" {} ", text), bar));
        }
        None => {}
    }

    // Backend health on the right
    let (health, health_style) = match &state.backend {
        BackendStatus::Unknown => ("backend ?".to_string(), Theme::muted()),
        BackendStatus::Healthy(h) => (format!("backend {}", h.status), Theme::info()),
        BackendStatus::Unreachable(_) => ("backend down".to_string(), Theme::error()),
    };
    let health = format!(" [{}] ", health);
    let used: usize = parts.iter().map(|s| s.content.width()).sum();
    let remaining = (area.width as usize).saturating_sub(used + health.width());
    parts.push(Span::styled(" ".repeat(remaining), bar));
    parts.push(Span::styled(health, health_style.bg(Theme::BG_ELEVATED)));

    let paragraph = Paragraph::new(Line::from(parts)).style(bar);
    frame.render_widget(paragraph, area);
}
