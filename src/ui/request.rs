use super::feedback::tags_rows;
use super::{checkbox, choice, form_row, format_date, input_row, layout, loading_line, panel, render_help, tag_spans};
use crate::app::state::*;
use crate::query::QueryKey;
use crate::ui::theme::Theme;
use ratatui::prelude::*;
use ratatui::widgets::{List, ListItem, Paragraph};

pub fn render(frame: &mut Frame, area: Rect, state: &AppState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(5), Constraint::Length(1)])
        .split(area);
    let (form_area, list_area) = layout::split_list_detail(rows[0], 55);

    render_form(frame, form_area, state);
    render_requests(frame, list_area, state);
    render_help(
        frame,
        rows[1],
        &[
            ("Tab", "Next field"),
            ("←→", "Change"),
            ("Ctrl+A", "Add tag"),
            ("Enter", "Send request"),
            ("Esc", "Clear"),
        ],
    );
}

fn render_form(frame: &mut Frame, area: Rect, state: &AppState) {
    let block = panel("Request Feedback", true);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let form = &state.request;
    let users = state.queries.team_members();
    let focused_field = form.focused();
    let mut y = inner.y;
    for field in RequestField::ALL {
        if y >= inner.bottom() {
            break;
        }
        let row = Rect::new(inner.x, y, inner.width, 1);
        let focused = field == focused_field;
        match field {
            RequestField::Receiver => {
                let name = match form.receiver_id {
                    Some(id) => users
                        .iter()
                        .find(|u| u.id == id)
                        .map(|u| u.username.clone())
                        .unwrap_or_else(|| format!("user {}", id)),
                    None => "choose with ←→".to_string(),
                };
                form_row(frame, row, "Ask", choice(name, focused), focused);
            }
            RequestField::Message => input_row(frame, row, "Message", &form.message, focused),
            RequestField::Tags => {
                tags_rows(frame, inner, &mut y, &form.tags, focused);
                continue;
            }
            RequestField::Anonymous => {
                form_row(frame, row, "Anonymous", checkbox(form.anonymous), focused)
            }
            RequestField::Priority => form_row(
                frame,
                row,
                "Priority",
                choice(form.priority.as_str(), focused),
                focused,
            ),
            RequestField::DueDate => {
                input_row(frame, row, "Due (Y-M-D)", &form.due_date, focused)
            }
        }
        y += 1;
    }
}

fn render_requests(frame: &mut Frame, area: Rect, state: &AppState) {
    let requests = state.queries.requests();
    let block = panel(&format!("Requests ({})", requests.len()), false);

    if requests.is_empty() {
        let body = if let Some(error) = state.queries.error(&QueryKey::FeedbackRequests) {
            Line::from(Span::styled(error.to_string(), Theme::error()))
        } else if state.queries.is_loading(&QueryKey::FeedbackRequests) {
            loading_line(state.tick_count)
        } else {
            Line::from(Span::styled("No requests", Theme::muted()))
        };
        frame.render_widget(Paragraph::new(body).block(block), area);
        return;
    }

    let date_format = &state.config.ui.date_format;
    let items: Vec<ListItem> = requests
        .iter()
        .map(|r| {
            let mut lines = vec![Line::from(vec![
                Span::styled(
                    format!(
                        "{} → {}",
                        r.requester_name,
                        r.receiver_name.as_deref().unwrap_or("?")
                    ),
                    Theme::title(),
                ),
                Span::styled(
                    format!("  {}", r.priority.as_deref().unwrap_or("normal")),
                    Theme::warning(),
                ),
            ])];
            let mut meta = vec![Span::styled(
                format!("  asked {}", format_date(&r.created_at, date_format)),
                Theme::muted(),
            )];
            if let Some(due) = &r.due_date {
                meta.push(Span::styled(
                    format!("  due {}", format_date(due, date_format)),
                    Theme::secondary(),
                ));
            }
            lines.push(Line::from(meta));
            if !r.message.is_empty() {
                lines.push(Line::from(Span::styled(format!("  {}", r.message), Theme::text())));
            }
            if !r.tags.is_empty() {
                let mut spans = vec![Span::raw("  ")];
                spans.extend(tag_spans(&r.tags));
                lines.push(Line::from(spans));
            }
            ListItem::new(lines)
        })
        .collect();
    frame.render_widget(List::new(items).block(block), area);
}
