use super::{format_date, freshness, loading_line, panel, render_help, truncate};
use crate::api::models::{DashboardData, Role, Sentiment};
use crate::app::state::*;
use crate::metrics;
use crate::query::QueryKey;
use crate::ui::theme::Theme;
use ratatui::prelude::*;
use ratatui::widgets::{Gauge, List, ListItem, ListState, Paragraph};

pub fn render(frame: &mut Frame, area: Rect, state: &AppState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4), // Stat tiles
            Constraint::Min(6),    // Metrics + lists
            Constraint::Length(1), // Help
        ])
        .split(area);

    let Some(data) = state.queries.dashboard() else {
        let block = panel("Dashboard", false);
        let body = match state.queries.error(&QueryKey::Dashboard) {
            Some(error) => Line::from(Span::styled(error.to_string(), Theme::error())),
            None => loading_line(state.tick_count),
        };
        frame.render_widget(Paragraph::new(body).block(block), rows[0].union(rows[1]));
        render_help(frame, rows[2], &[("F1-F5", "Screens"), ("r", "Refresh")]);
        return;
    };

    render_tiles(frame, rows[0], state, data);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .spacing(1)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(rows[1]);
    render_metrics(frame, columns[0], state, data);

    let lists = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(columns[1]);
    render_recent(frame, lists[0], state, data);
    render_notifications(frame, lists[1], state);

    render_help(
        frame,
        rows[2],
        &[
            ("↑↓", "Notification"),
            ("Enter", "Mark read"),
            ("r", "Refresh"),
            ("Ctrl+L", "Sign out"),
        ],
    );
}

fn render_tiles(frame: &mut Frame, area: Rect, state: &AppState, data: &DashboardData) {
    let is_manager = data.role == Some(Role::Manager) || state.is_manager();
    let second = if is_manager {
        ("Team Size", data.team_size.unwrap_or(0).to_string())
    } else {
        (
            "Acknowledged",
            data.acknowledged_count.unwrap_or(0).to_string(),
        )
    };
    let tiles = [
        ("Total Feedback", data.total_feedback.to_string()),
        second,
        ("Pending Requests", data.feedback_requests.len().to_string()),
        ("Positive", data.sentiment_counts.positive.to_string()),
    ];

    let cells = Layout::default()
        .direction(Direction::Horizontal)
        .spacing(1)
        .constraints([Constraint::Ratio(1, 4); 4])
        .split(area);
    for ((label, value), cell) in tiles.into_iter().zip(cells.iter()) {
        let body = vec![Line::from(Span::styled(value, Theme::label())).centered()];
        frame.render_widget(Paragraph::new(body).block(panel(label, false)), *cell);
    }
}

fn render_metrics(frame: &mut Frame, area: Rect, state: &AppState, data: &DashboardData) {
    let block = panel("Insights", false);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let total = data.total_feedback;
    let counts = &data.sentiment_counts;
    let mut lines = vec![Line::from(Span::styled("Sentiment", Theme::title()))];
    for (sentiment, count) in [
        (Sentiment::Positive, counts.positive),
        (Sentiment::Neutral, counts.neutral),
        (Sentiment::Negative, counts.negative),
    ] {
        lines.push(Line::from(vec![
            Span::styled(format!("  {:<9}", sentiment.label()), Theme::sentiment(sentiment)),
            Span::styled(
                format!("{:>3} ({:.0}%)", count, metrics::sentiment_share(count, total)),
                Theme::text(),
            ),
        ]));
    }
    lines.push(Line::default());

    let score = metrics::performance_score(counts, total);
    lines.push(Line::from(vec![
        Span::styled("Performance  ", Theme::secondary()),
        Span::styled(format!("{:.0}/100", score), Theme::label()),
    ]));
    let trend = metrics::feedback_trend(&data.recent_feedback);
    let trend_style = match trend {
        metrics::Trend::Improving => Theme::info(),
        metrics::Trend::Declining => Theme::warning(),
        metrics::Trend::Stable => Theme::secondary(),
    };
    lines.push(Line::from(vec![
        Span::styled("Trend        ", Theme::secondary()),
        Span::styled(trend.describe(), trend_style),
    ]));

    let show_ack = data.role != Some(Role::Manager) && !state.is_manager();
    let text_height = (lines.len() as u16).min(inner.height);
    frame.render_widget(
        Paragraph::new(lines),
        Rect::new(inner.x, inner.y, inner.width, text_height),
    );

    if show_ack && inner.height > text_height + 1 {
        let rate = metrics::acknowledgment_rate(data.acknowledged_count.unwrap_or(0), total);
        let gauge = Gauge::default()
            .gauge_style(Style::default().fg(Theme::ACCENT_TEAL).bg(Theme::BG_ELEVATED))
            .label(format!("Acknowledged {:.0}%", rate))
            .ratio((rate / 100.0).clamp(0.0, 1.0));
        frame.render_widget(
            gauge,
            Rect::new(inner.x, inner.y + text_height + 1, inner.width, 1),
        );
    }
}

fn render_recent(frame: &mut Frame, area: Rect, state: &AppState, data: &DashboardData) {
    let title = format!("Recent Feedback{}", freshness(state, &QueryKey::Dashboard));
    let block = panel(&title, false);
    let width = block.inner(area).width as usize;
    let date_format = &state.config.ui.date_format;

    let items: Vec<ListItem> = if data.recent_feedback.is_empty() {
        vec![ListItem::new(Span::styled("No feedback yet", Theme::muted()))]
    } else {
        data.recent_feedback
            .iter()
            .map(|f| {
                let from = f.giver_name.as_deref().unwrap_or("Anonymous");
                let to = f.receiver_name.as_deref().unwrap_or("?");
                let head = format!(
                    "{}  {} → {}  ",
                    format_date(&f.created_at, date_format),
                    from,
                    to
                );
                let rest = width.saturating_sub(head.chars().count());
                ListItem::new(Line::from(vec![
                    Span::styled(head, Theme::secondary()),
                    Span::styled(truncate(&f.strengths, rest), Theme::sentiment(f.sentiment)),
                ]))
            })
            .collect()
    };
    frame.render_widget(List::new(items).block(block), area);
}

fn render_notifications(frame: &mut Frame, area: Rect, state: &AppState) {
    let notes = state.latest_notifications();
    let title = format!("Notifications{}", freshness(state, &QueryKey::Notifications));
    let block = panel(&title, true);
    let width = block.inner(area).width as usize;

    if notes.is_empty() {
        let body = if state.queries.is_loading(&QueryKey::Notifications) {
            loading_line(state.tick_count)
        } else {
            Line::from(Span::styled("Nothing new", Theme::muted()))
        };
        frame.render_widget(Paragraph::new(body).block(block), area);
        return;
    }

    let items: Vec<ListItem> = notes
        .iter()
        .map(|n| {
            let (dot, style) = if n.read {
                ("  ", Theme::muted())
            } else {
                ("● ", Theme::text())
            };
            let text = format!("{}: {}", n.title, n.message);
            ListItem::new(Line::from(vec![
                Span::styled(dot, Theme::label()),
                Span::styled(truncate(&text, width.saturating_sub(2)), style),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(Theme::selected());
    let mut list_state = ListState::default().with_selected(Some(state.dashboard.selected_notification));
    frame.render_stateful_widget(list, area, &mut list_state);
}
