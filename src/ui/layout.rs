use ratatui::layout::{Constraint, Direction, Layout, Rect};

pub struct AppLayout {
    pub nav_bar: Rect,
    pub content: Rect,
    pub status_bar: Rect,
}

pub fn compute_layout(area: Rect) -> AppLayout {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Nav bar
            Constraint::Min(5),    // Screen content
            Constraint::Length(1), // Status bar
        ])
        .split(area);

    AppLayout {
        nav_bar: chunks[0],
        content: chunks[1],
        status_bar: chunks[2],
    }
}

/// Split `area` into a list pane and a detail pane side by side.
pub fn split_list_detail(area: Rect, list_percent: u16) -> (Rect, Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .spacing(1)
        .constraints([
            Constraint::Percentage(list_percent),
            Constraint::Min(20),
        ])
        .split(area);
    (chunks[0], chunks[1])
}

/// A rectangle of `width` x `height` centered in `area`, clamped to fit.
pub fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let w = width.min(area.width);
    let h = height.min(area.height);
    Rect::new(
        area.x + (area.width - w) / 2,
        area.y + (area.height - h) / 2,
        w,
        h,
    )
}
