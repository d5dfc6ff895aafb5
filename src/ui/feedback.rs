use super::{
    checkbox, choice, form_row, format_date, freshness, input_row, layout, loading_line, markup, panel,
    render_help, tag_spans, truncate,
};
use crate::api::models::{Feedback, User};
use crate::app::state::*;
use crate::ui::theme::Theme;
use ratatui::prelude::*;
use ratatui::widgets::{List, ListItem, ListState, Paragraph, Wrap};

pub fn render(frame: &mut Frame, area: Rect, state: &AppState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(5), Constraint::Length(1)])
        .split(area);
    let (list_area, detail_area) = layout::split_list_detail(rows[0], 40);

    render_list(frame, list_area, state);
    match state.feedback.mode {
        FeedbackMode::Compose => render_compose(frame, detail_area, state),
        FeedbackMode::Comment => {
            let parts = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(3), Constraint::Length(3)])
                .split(detail_area);
            render_detail(frame, parts[0], state);
            let block = panel("Comment", true);
            let inner = block.inner(parts[1]);
            frame.render_widget(block, parts[1]);
            input_row(frame, inner, "Comment", &state.feedback.comment, true);
        }
        FeedbackMode::Browse | FeedbackMode::Filter => render_detail(frame, detail_area, state),
    }

    let hints: &[(&str, &str)] = match state.feedback.mode {
        FeedbackMode::Browse => &[
            ("↑↓", "Select"),
            ("Enter", "Expand"),
            ("n", "New"),
            ("c", "Comment"),
            ("e", "Export"),
            ("/", "Filter tags"),
            ("r", "Refresh"),
        ],
        FeedbackMode::Compose => &[
            ("Tab", "Next field"),
            ("←→", "Change"),
            ("Ctrl+A", "Add tag"),
            ("Enter", "Submit"),
            ("Esc", "Cancel"),
        ],
        FeedbackMode::Comment => &[("Enter", "Post"), ("Esc", "Cancel")],
        FeedbackMode::Filter => &[("Enter", "Apply"), ("Esc", "Cancel")],
    };
    render_help(frame, rows[1], hints);
}

fn render_list(frame: &mut Frame, area: Rect, state: &AppState) {
    let view = &state.feedback;
    let key = view.list_key();
    let title = if view.filter.is_empty() {
        format!("Feedback{}", freshness(state, &key))
    } else {
        format!("Feedback [{}]{}", view.filter.join(", "), freshness(state, &key))
    };
    let block = panel(&title, view.mode == FeedbackMode::Browse || view.mode == FeedbackMode::Filter);
    let mut inner = block.inner(area);
    frame.render_widget(block, area);

    if view.mode == FeedbackMode::Filter {
        input_row(frame, Rect::new(inner.x, inner.y, inner.width, 1), "Tags", &view.filter_input, true);
        inner.y += 2;
        inner.height = inner.height.saturating_sub(2);
    }

    let items = state.feedback_list();
    if items.is_empty() {
        let body = if let Some(error) = state.queries.error(&key) {
            Line::from(Span::styled(error.to_string(), Theme::error()))
        } else if state.queries.is_loading(&key) {
            loading_line(state.tick_count)
        } else {
            Line::from(Span::styled("No feedback found", Theme::muted()))
        };
        frame.render_widget(Paragraph::new(body), inner);
        return;
    }

    let date_format = &state.config.ui.date_format;
    let width = inner.width as usize;
    let rows: Vec<ListItem> = items
        .iter()
        .map(|f| {
            let ack = if f.acknowledged { "✓ " } else { "  " };
            let head = format!("{} {}", ack, format_date(&f.created_at, date_format));
            let who = format!(
                " {} → {}",
                f.giver_name.as_deref().unwrap_or("Anonymous"),
                f.receiver_name.as_deref().unwrap_or("?")
            );
            let rest = width.saturating_sub(head.chars().count() + 2);
            ListItem::new(Line::from(vec![
                Span::styled(head, Theme::secondary()),
                Span::styled(" ●", Theme::sentiment(f.sentiment)),
                Span::styled(truncate(&who, rest), Theme::text()),
            ]))
        })
        .collect();

    let list = List::new(rows).highlight_style(Theme::selected());
    let mut list_state = ListState::default().with_selected(Some(view.selected));
    frame.render_stateful_widget(list, inner, &mut list_state);
}

fn render_detail(frame: &mut Frame, area: Rect, state: &AppState) {
    let block = panel("Details", false);
    let Some(item) = state.selected_feedback() else {
        let body = Line::from(Span::styled("Select a feedback entry", Theme::muted()));
        frame.render_widget(Paragraph::new(body).block(block), area);
        return;
    };

    let expanded = state.feedback.expanded == Some(item.id);
    let lines = detail_lines(item, expanded, &state.config.ui.date_format);
    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

fn detail_lines(item: &Feedback, expanded: bool, date_format: &str) -> Vec<Line<'static>> {
    let mut lines = vec![
        Line::from(vec![
            Span::styled(format!("#{}  ", item.id), Theme::muted()),
            Span::styled(
                format!(
                    "{} → {}",
                    item.giver_name.as_deref().unwrap_or("Anonymous"),
                    item.receiver_name.as_deref().unwrap_or("?")
                ),
                Theme::title(),
            ),
        ]),
        Line::from(vec![
            Span::styled(item.sentiment.label(), Theme::sentiment(item.sentiment)),
            Span::styled(
                format!("  {}", format_date(&item.created_at, date_format)),
                Theme::secondary(),
            ),
            Span::styled(
                if item.acknowledged { "  acknowledged" } else { "" },
                Theme::info(),
            ),
        ]),
    ];
    if !item.tags.is_empty() {
        lines.push(Line::from(tag_spans(&item.tags)));
    }
    lines.push(Line::default());

    lines.push(Line::from(Span::styled("Strengths", Theme::label())));
    if expanded {
        lines.extend(markup::feedback_lines(&item.strengths, Theme::text()));
    } else {
        lines.push(Line::from(Span::styled(first_line(&item.strengths), Theme::text())));
    }
    lines.push(Line::default());
    lines.push(Line::from(Span::styled("Areas to improve", Theme::label())));
    if expanded {
        lines.extend(markup::feedback_lines(&item.areas_to_improve, Theme::text()));
    } else {
        lines.push(Line::from(Span::styled(
            first_line(&item.areas_to_improve),
            Theme::text(),
        )));
        lines.push(Line::default());
        lines.push(Line::from(Span::styled(
            format!("Enter for full text and {} comment(s)", item.comments.len()),
            Theme::muted(),
        )));
        return lines;
    }

    lines.push(Line::default());
    lines.push(Line::from(Span::styled(
        format!("Comments ({})", item.comments.len()),
        Theme::label(),
    )));
    for comment in &item.comments {
        lines.push(Line::from(vec![
            Span::styled(
                comment.author_name.clone().unwrap_or_else(|| "Unknown".to_string()),
                Theme::title(),
            ),
            Span::styled(
                format!("  {}", format_date(&comment.created_at, date_format)),
                Theme::muted(),
            ),
        ]));
        lines.extend(markup::feedback_lines(&comment.content, Theme::secondary()));
    }
    lines
}

fn first_line(text: &str) -> String {
    text.lines().next().unwrap_or("").to_string()
}

fn user_name(users: &[User], id: Option<u64>) -> String {
    match id {
        Some(id) => users
            .iter()
            .find(|u| u.id == id)
            .map(|u| u.username.clone())
            .unwrap_or_else(|| format!("user {}", id)),
        None if users.is_empty() => "no team members loaded".to_string(),
        None => "choose with ←→".to_string(),
    }
}

fn render_compose(frame: &mut Frame, area: Rect, state: &AppState) {
    let block = panel("New Feedback", true);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let form = &state.feedback.form;
    let users = state.queries.team_members();
    let focused_field = form.focused();
    let mut y = inner.y;
    for field in FeedbackField::ALL {
        if y >= inner.bottom() {
            break;
        }
        let row = Rect::new(inner.x, y, inner.width, 1);
        let focused = field == focused_field;
        match field {
            FeedbackField::Receiver => form_row(
                frame,
                row,
                "Receiver",
                choice(user_name(users, form.receiver_id), focused),
                focused,
            ),
            FeedbackField::Strengths => input_row(frame, row, "Strengths", &form.strengths, focused),
            FeedbackField::Areas => input_row(frame, row, "Areas", &form.areas, focused),
            FeedbackField::Sentiment => {
                let mut line = choice(form.sentiment.label(), focused);
                for span in line.spans.iter_mut() {
                    if span.content == form.sentiment.label() {
                        span.style = Theme::sentiment(form.sentiment);
                    }
                }
                form_row(frame, row, "Sentiment", line, focused)
            }
            FeedbackField::Tags => {
                tags_rows(frame, inner, &mut y, &form.tags, focused);
                continue;
            }
            FeedbackField::Anonymous => {
                form_row(frame, row, "Anonymous", checkbox(form.anonymous), focused)
            }
        }
        y += 1;
    }
}

/// Tag input, the chosen tags and the suggestion picker. Advances `y`.
pub(super) fn tags_rows(frame: &mut Frame, inner: Rect, y: &mut u16, tags: &TagSet, focused: bool) {
    let row = |y: u16| Rect::new(inner.x, y, inner.width, 1);
    if *y < inner.bottom() {
        input_row(frame, row(*y), "Tags", &tags.input, focused);
        *y += 1;
    }
    if *y < inner.bottom() {
        let mut spans = vec![Span::raw(" ".repeat(16))];
        if tags.selected.is_empty() {
            spans.push(Span::styled("none", Theme::muted()));
        } else {
            spans.extend(tag_spans(&tags.selected));
        }
        frame.render_widget(Paragraph::new(Line::from(spans)), row(*y));
        *y += 1;
    }
    if focused && *y < inner.bottom() {
        let suggestion = tags.current_suggestion();
        let style = if tags.is_selected(suggestion) {
            Theme::muted().add_modifier(Modifier::CROSSED_OUT)
        } else {
            Theme::label()
        };
        let line = Line::from(vec![
            Span::raw(" ".repeat(16)),
            Span::styled("suggest < ", Theme::secondary()),
            Span::styled(suggestion, style),
            Span::styled(" >  Ctrl+A to add", Theme::secondary()),
        ]);
        frame.render_widget(Paragraph::new(line), row(*y));
        *y += 1;
    }
}
