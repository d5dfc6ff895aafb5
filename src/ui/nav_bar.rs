use crate::app::state::*;
use crate::ui::theme::Theme;
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

pub fn render(frame: &mut Frame, area: Rect, state: &AppState) {
    let mut spans = vec![Span::styled(" peerfeed ", Theme::nav_active())];
    spans.push(Span::styled("│", Style::default().fg(Theme::BORDER_DIM).bg(Theme::BG_ELEVATED)));

    if state.session.is_authenticated() {
        for (i, screen) in Screen::NAV.iter().enumerate() {
            let style = if *screen == state.screen {
                Theme::nav_active().add_modifier(Modifier::UNDERLINED)
            } else {
                Theme::nav_inactive()
            };
            spans.push(Span::styled(format!(" F{} ", i + 1), Theme::nav_inactive()));
            spans.push(Span::styled(screen.title(), style));
            spans.push(Span::styled(" ", Theme::nav_bar()));
        }
    } else {
        spans.push(Span::styled(
            format!(" {} ", state.screen.title()),
            Theme::nav_active(),
        ));
    }

    let paragraph = Paragraph::new(Line::from(spans)).style(Theme::nav_bar());
    frame.render_widget(paragraph, area);
}
