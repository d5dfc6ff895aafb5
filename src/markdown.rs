//! Minimal markdown for feedback text.
//!
//! Input is escaped before any markup is produced, so the output only ever
//! contains the tags added here.

use regex::Regex;
use std::sync::OnceLock;

struct Rules {
    bold: Regex,
    italic: Regex,
    code: Regex,
}

fn rules() -> &'static Rules {
    static RULES: OnceLock<Rules> = OnceLock::new();
    RULES.get_or_init(|| Rules {
        bold: Regex::new(r"\*\*(.*?)\*\*").unwrap(),
        italic: Regex::new(r"\*(.*?)\*").unwrap(),
        code: Regex::new(r"`(.*?)`").unwrap(),
    })
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Bold, italic, inline code and line breaks, applied in that order with no
/// nesting.
pub fn render(text: &str) -> String {
    let rules = rules();
    let escaped = escape_html(text);
    let html = rules.bold.replace_all(&escaped, "<strong>$1</strong>");
    let html = rules.italic.replace_all(&html, "<em>$1</em>");
    let html = rules.code.replace_all(&html, "<code>$1</code>");
    html.replace('\n', "<br>")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_inline_markup() {
        assert_eq!(
            render("**a** *b* `c`"),
            "<strong>a</strong> <em>b</em> <code>c</code>"
        );
    }

    #[test]
    fn test_render_line_breaks() {
        assert_eq!(render("one\ntwo"), "one<br>two");
    }

    #[test]
    fn test_markup_in_input_is_escaped() {
        assert_eq!(
            render("<script>alert('x')</script> & **ok**"),
            "&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt; &amp; <strong>ok</strong>"
        );
    }

    #[test]
    fn test_single_marker_is_left_alone() {
        assert_eq!(render("2 * 3"), "2 * 3");
        assert_eq!(render("use `x"), "use `x");
    }
}
