use crate::api::models::Sentiment;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::BorderType;

pub struct Theme;

impl Theme {
    pub const BG_DARK: Color = Color::Rgb(22, 24, 30);
    pub const BG_SURFACE: Color = Color::Rgb(30, 33, 41);
    pub const BG_ELEVATED: Color = Color::Rgb(40, 44, 54);
    pub const BORDER_DIM: Color = Color::Rgb(70, 76, 90);
    pub const TEXT_PRIMARY: Color = Color::Rgb(220, 223, 228);
    pub const TEXT_SECONDARY: Color = Color::Rgb(150, 156, 170);
    pub const TEXT_MUTED: Color = Color::Rgb(100, 106, 120);
    pub const ACCENT_TEAL: Color = Color::Rgb(80, 200, 210);
    pub const ACCENT_GREEN: Color = Color::Rgb(90, 210, 130);
    pub const ACCENT_AMBER: Color = Color::Rgb(230, 180, 80);
    pub const ACCENT_RED: Color = Color::Rgb(230, 100, 100);

    pub fn border() -> Style {
        Style::default().fg(Self::BORDER_DIM)
    }

    pub fn border_focused() -> Style {
        Style::default().fg(Self::ACCENT_TEAL)
    }

    pub fn border_type() -> BorderType {
        BorderType::Rounded
    }

    pub fn border_type_focused() -> BorderType {
        BorderType::Thick
    }

    pub fn panel_bg() -> Style {
        Style::default().bg(Self::BG_DARK)
    }

    pub fn title() -> Style {
        Style::default()
            .fg(Self::TEXT_PRIMARY)
            .add_modifier(Modifier::BOLD)
    }

    pub fn text() -> Style {
        Style::default().fg(Self::TEXT_PRIMARY)
    }

    pub fn secondary() -> Style {
        Style::default().fg(Self::TEXT_SECONDARY)
    }

    pub fn muted() -> Style {
        Style::default().fg(Self::TEXT_MUTED)
    }

    pub fn label() -> Style {
        Style::default()
            .fg(Self::ACCENT_TEAL)
            .add_modifier(Modifier::BOLD)
    }

    pub fn key_hint() -> Style {
        Style::default()
            .fg(Self::ACCENT_AMBER)
            .add_modifier(Modifier::BOLD)
    }

    pub fn selected() -> Style {
        Style::default()
            .fg(Self::BG_DARK)
            .bg(Self::ACCENT_TEAL)
            .add_modifier(Modifier::BOLD)
    }

    pub fn info() -> Style {
        Style::default().fg(Self::ACCENT_GREEN)
    }

    pub fn error() -> Style {
        Style::default().fg(Self::ACCENT_RED)
    }

    pub fn warning() -> Style {
        Style::default().fg(Self::ACCENT_AMBER)
    }

    pub fn sentiment(sentiment: Sentiment) -> Style {
        let color = match sentiment {
            Sentiment::Positive => Self::ACCENT_GREEN,
            Sentiment::Neutral => Self::ACCENT_AMBER,
            Sentiment::Negative => Self::ACCENT_RED,
        };
        Style::default().fg(color)
    }

    pub fn tag() -> Style {
        Style::default().fg(Self::BG_DARK).bg(Self::TEXT_SECONDARY)
    }

    pub fn code() -> Style {
        Style::default().fg(Self::ACCENT_AMBER).bg(Self::BG_ELEVATED)
    }

    pub fn status_bar() -> Style {
        Style::default().fg(Self::TEXT_PRIMARY).bg(Self::BG_ELEVATED)
    }

    pub fn nav_bar() -> Style {
        Style::default().bg(Self::BG_ELEVATED)
    }

    pub fn nav_active() -> Style {
        Style::default()
            .fg(Self::ACCENT_TEAL)
            .bg(Self::BG_ELEVATED)
            .add_modifier(Modifier::BOLD)
    }

    pub fn nav_inactive() -> Style {
        Style::default()
            .fg(Self::TEXT_SECONDARY)
            .bg(Self::BG_ELEVATED)
    }
}
