use super::{format_date, input_row, loading_line, panel, render_help};
use crate::app::state::*;
use crate::query::QueryKey;
use crate::ui::theme::Theme;
use ratatui::prelude::*;
use ratatui::widgets::{List, ListItem, Paragraph};

pub fn render(frame: &mut Frame, area: Rect, state: &AppState) {
    let show_reports = state.is_manager();
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(8),
            Constraint::Min(if show_reports { 3 } else { 0 }),
            Constraint::Length(1),
        ])
        .split(area);

    render_profile(frame, rows[0], state);
    if show_reports {
        render_reports(frame, rows[1], state);
    }

    let hints: &[(&str, &str)] = if state.profile.editing {
        &[("Tab", "Next field"), ("Enter", "Save"), ("Esc", "Cancel")]
    } else {
        &[("e", "Edit"), ("r", "Refresh"), ("Ctrl+L", "Sign out")]
    };
    render_help(frame, rows[2], hints);
}

fn render_profile(frame: &mut Frame, area: Rect, state: &AppState) {
    let block = panel("Profile", state.profile.editing);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let user = state
        .queries
        .user(&QueryKey::Profile)
        .or_else(|| state.current_user());
    let Some(user) = user else {
        frame.render_widget(Paragraph::new(loading_line(state.tick_count)), inner);
        return;
    };

    let row = |i: u16| Rect::new(inner.x, inner.y + i, inner.width, 1);
    if state.profile.editing {
        let focus = state.profile.focus % 2;
        input_row(frame, row(0), "Username", &state.profile.username, focus == 0);
        if inner.height > 1 {
            input_row(frame, row(1), "Email", &state.profile.email, focus == 1);
        }
        return;
    }

    let manager = user
        .manager_id
        .map(|id| format!("#{}", id))
        .unwrap_or_else(|| "-".to_string());
    let fields = [
        ("Username", user.username.clone()),
        ("Email", user.email.clone()),
        ("Role", user.role.to_string()),
        ("Manager", manager),
        (
            "Member since",
            format_date(&user.created_at, &state.config.ui.date_format),
        ),
    ];
    let lines: Vec<Line> = fields
        .into_iter()
        .map(|(label, value)| {
            Line::from(vec![
                Span::styled(format!("  {:<14}", label), Theme::secondary()),
                Span::styled(value, Theme::text()),
            ])
        })
        .collect();
    frame.render_widget(Paragraph::new(lines), inner);
}

fn render_reports(frame: &mut Frame, area: Rect, state: &AppState) {
    let reports = state.queries.users(&QueryKey::DirectReports);
    let block = panel(&format!("Direct Reports ({})", reports.len()), false);
    if reports.is_empty() {
        let body = if state.queries.is_loading(&QueryKey::DirectReports) {
            loading_line(state.tick_count)
        } else {
            Line::from(Span::styled("No direct reports", Theme::muted()))
        };
        frame.render_widget(Paragraph::new(body).block(block), area);
        return;
    }
    let items: Vec<ListItem> = reports
        .iter()
        .map(|u| {
            ListItem::new(Line::from(vec![
                Span::styled(format!("{:<20}", u.username), Theme::text()),
                Span::styled(u.email.clone(), Theme::secondary()),
            ]))
        })
        .collect();
    frame.render_widget(List::new(items).block(block), area);
}
