//! Turns rendered feedback markdown into styled terminal lines.
//!
//! Only the tags `markdown::render` emits are recognised. Because its input
//! is escaped first, every literal `<` in the markup starts one of them.

use crate::markdown;
use crate::ui::theme::Theme;
use ratatui::prelude::*;

#[derive(Default, Clone, Copy)]
struct Marks {
    bold: bool,
    italic: bool,
    code: bool,
}

impl Marks {
    fn style(self, base: Style) -> Style {
        let mut style = if self.code { Theme::code() } else { base };
        if self.bold {
            style = style.add_modifier(Modifier::BOLD);
        }
        if self.italic {
            style = style.add_modifier(Modifier::ITALIC);
        }
        style
    }
}

/// Render `text` as markdown and convert the result to lines.
pub fn feedback_lines(text: &str, base: Style) -> Vec<Line<'static>> {
    to_lines(&markdown::render(text), base)
}

pub fn to_lines(html: &str, base: Style) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut marks = Marks::default();
    let mut rest = html;

    while !rest.is_empty() {
        let Some(open) = rest.find('<') else {
            push_text(&mut spans, rest, marks.style(base));
            break;
        };
        push_text(&mut spans, &rest[..open], marks.style(base));
        let Some(close) = rest[open..].find('>') else {
            push_text(&mut spans, &rest[open..], marks.style(base));
            break;
        };
        match &rest[open + 1..open + close] {
            "strong" => marks.bold = true,
            "/strong" => marks.bold = false,
            "em" => marks.italic = true,
            "/em" => marks.italic = false,
            "code" => marks.code = true,
            "/code" => marks.code = false,
            "br" => lines.push(Line::from(std::mem::take(&mut spans))),
            _ => {}
        }
        rest = &rest[open + close + 1..];
    }
    lines.push(Line::from(spans));
    lines
}

fn push_text(spans: &mut Vec<Span<'static>>, text: &str, style: Style) {
    if !text.is_empty() {
        spans.push(Span::styled(unescape(text), style));
    }
}

fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}
