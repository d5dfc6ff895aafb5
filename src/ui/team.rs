use super::{form_row, input_row, layout, loading_line, panel, render_help, truncate};
use crate::api::models::TeamMember;
use crate::app::state::*;
use crate::metrics;
use crate::query::QueryKey;
use crate::ui::theme::Theme;
use ratatui::prelude::*;
use ratatui::widgets::{Clear, List, ListItem, ListState, Paragraph};

pub fn render(frame: &mut Frame, area: Rect, state: &AppState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Stats
            Constraint::Min(5),    // Roster + detail
            Constraint::Length(1), // Help
        ])
        .split(area);

    let members = state.queries.roster();
    render_stats(frame, rows[0], members);

    let (list_area, detail_area) = layout::split_list_detail(rows[1], 45);
    render_roster(frame, list_area, state);
    render_detail(frame, detail_area, state);

    if let Some(form) = &state.team.notify {
        render_notify(frame, area, state, form);
        render_help(frame, rows[2], &[("Tab", "Next field"), ("Enter", "Send"), ("Esc", "Cancel")]);
    } else {
        render_help(
            frame,
            rows[2],
            &[
                ("↑↓", "Select"),
                ("Enter", "Details"),
                ("m", "Notify"),
                ("r", "Refresh"),
            ],
        );
    }
}

fn render_stats(frame: &mut Frame, area: Rect, members: &[TeamMember]) {
    let average = metrics::average_score(members)
        .map(|s| format!("{}%", s))
        .unwrap_or_else(|| "-".to_string());
    let line = Line::from(vec![
        Span::styled("Members ", Theme::secondary()),
        Span::styled(members.len().to_string(), Theme::label()),
        Span::styled("   Active ", Theme::secondary()),
        Span::styled(metrics::active_members(members).to_string(), Theme::label()),
        Span::styled("   High performers ", Theme::secondary()),
        Span::styled(metrics::high_performers(members).len().to_string(), Theme::label()),
        Span::styled("   Average score ", Theme::secondary()),
        Span::styled(average, Theme::label()),
    ]);
    frame.render_widget(Paragraph::new(line).block(panel("Team", false)), area);
}

fn render_roster(frame: &mut Frame, area: Rect, state: &AppState) {
    let block = panel("Roster", state.team.notify.is_none());
    let roster = state.team_roster();
    if roster.is_empty() {
        let body = if let Some(error) = state.queries.error(&QueryKey::Roster) {
            Line::from(Span::styled(error.to_string(), Theme::error()))
        } else if state.queries.is_loading(&QueryKey::Roster) {
            loading_line(state.tick_count)
        } else {
            Line::from(Span::styled("No team members", Theme::muted()))
        };
        frame.render_widget(Paragraph::new(body).block(block), area);
        return;
    }

    let groups = metrics::group_by_manager(state.queries.roster());
    let width = block.inner(area).width as usize;
    let mut items: Vec<ListItem> = Vec::new();
    let mut selected_row = None;
    let mut index = 0;
    for (manager, members) in &groups {
        items.push(ListItem::new(Span::styled(
            format!("── {} ", manager),
            Style::default().fg(Theme::BORDER_DIM),
        )));
        for member in members {
            if index == state.team.selected {
                selected_row = Some(items.len());
            }
            index += 1;
            let score = metrics::member_score(member);
            let score_text = score.map(|s| format!("{:>3}%", s)).unwrap_or_else(|| "   -".to_string());
            let star = if score.is_some_and(|s| s >= metrics::HIGH_PERFORMER_SCORE) {
                " ★ "
            } else {
                "   "
            };
            let name = truncate(&member.user.username, width.saturating_sub(12));
            items.push(ListItem::new(Line::from(vec![
                Span::styled(star, Theme::warning()),
                Span::styled(format!("{:<w$}", name, w = width.saturating_sub(12)), Theme::text()),
                Span::styled(score_text, Theme::secondary()),
            ])));
        }
    }

    let list = List::new(items).block(block).highlight_style(Theme::selected());
    let mut list_state = ListState::default().with_selected(selected_row);
    frame.render_stateful_widget(list, area, &mut list_state);
}

fn render_detail(frame: &mut Frame, area: Rect, state: &AppState) {
    let block = panel("Member", false);
    let Some(id) = state.team.detail else {
        let body = Line::from(Span::styled("Enter shows a member's details", Theme::muted()));
        frame.render_widget(Paragraph::new(body).block(block), area);
        return;
    };

    let key = QueryKey::User(id);
    let Some(user) = state.queries.user(&key) else {
        let body = match state.queries.error(&key) {
            Some(error) => Line::from(Span::styled(error.to_string(), Theme::error())),
            None => loading_line(state.tick_count),
        };
        frame.render_widget(Paragraph::new(body).block(block), area);
        return;
    };

    let date_format = &state.config.ui.date_format;
    let mut lines = vec![
        Line::from(Span::styled(user.username.clone(), Theme::title())),
        Line::from(vec![
            Span::styled("Email    ", Theme::secondary()),
            Span::styled(user.email.clone(), Theme::text()),
        ]),
        Line::from(vec![
            Span::styled("Role     ", Theme::secondary()),
            Span::styled(user.role.to_string(), Theme::text()),
        ]),
        Line::from(vec![
            Span::styled("Joined   ", Theme::secondary()),
            Span::styled(super::format_date(&user.created_at, date_format), Theme::text()),
        ]),
    ];

    if let Some(member) = state.queries.roster().iter().find(|m| m.user.id == id) {
        let received = &member.feedback_received;
        lines.push(Line::default());
        lines.push(Line::from(vec![
            Span::styled("Received ", Theme::secondary()),
            Span::styled(received.len().to_string(), Theme::text()),
        ]));
        if let Some(score) = metrics::member_score(member) {
            lines.push(Line::from(vec![
                Span::styled("Score    ", Theme::secondary()),
                Span::styled(format!("{}%", score), Theme::label()),
            ]));
        }
        let trend = metrics::feedback_trend(received);
        lines.push(Line::from(vec![
            Span::styled("Trend    ", Theme::secondary()),
            Span::styled(trend.to_string(), Theme::text()),
        ]));
    }

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_notify(frame: &mut Frame, area: Rect, state: &AppState, form: &NotifyForm) {
    let popup = layout::centered(area, 64, 6);
    frame.render_widget(Clear, popup);

    let recipient = state
        .queries
        .roster()
        .iter()
        .find(|m| m.user.id == form.user_id)
        .map(|m| m.user.username.as_str())
        .unwrap_or("member");
    let block = panel(&format!("Notify {}", recipient), true).style(Style::default().bg(Theme::BG_SURFACE));
    let inner = block.inner(popup);
    frame.render_widget(block, popup);

    let focus = form.focus % 2;
    input_row(frame, Rect::new(inner.x, inner.y, inner.width, 1), "Title", &form.title, focus == 0);
    if inner.height > 1 {
        input_row(
            frame,
            Rect::new(inner.x, inner.y + 1, inner.width, 1),
            "Message",
            &form.message,
            focus == 1,
        );
    }
    if inner.height > 3 {
        form_row(
            frame,
            Rect::new(inner.x, inner.y + 3, inner.width, 1),
            "",
            Line::from(Span::styled("Sent as a general notification", Theme::muted())),
            false,
        );
    }
}
