//! HTML body sanitization
//!
//! Page bodies are plain HTML. Styles and scripts may only be attached
//! through the resource list, so the body must not contain `<script>`,
//! `<style>` or `<link>` tags, nor inline `style` attributes.
//!
//! This is a tag scanner, not a full HTML parser: it walks every `<...>`
//! construct and inspects tag names and attribute names. Comments get no
//! exemption; markup inside `<!-- ... -->` is checked like any other.

use serde::Serialize;
use std::fmt;

/// Tags that may never appear in a page body
const FORBIDDEN_TAGS: &[&str] = &["script", "style", "link"];

/// What was found
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ViolationKind {
    /// A forbidden element, opening or closing
    ForbiddenTag { tag: String },
    /// A `style="..."` attribute on any element
    InlineStyle { tag: String },
}

/// A single sanitization failure with its 1-based position
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    #[serde(flatten)]
    pub kind: ViolationKind,
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ViolationKind::ForbiddenTag { tag } => {
                write!(f, "<{}> tag at {}:{}", tag, self.line, self.column)
            }
            ViolationKind::InlineStyle { tag } => {
                write!(f, "inline style on <{}> at {}:{}", tag, self.line, self.column)
            }
        }
    }
}

/// Scans an HTML body and returns every violation found
pub fn check(html: &str) -> Vec<Violation> {
    let bytes = html.as_bytes();
    let mut violations = Vec::new();
    let mut pos = 0;

    while let Some(offset) = html[pos..].find('<') {
        let start = pos + offset;

        let mut cursor = start + 1;
        cursor = skip_whitespace(bytes, cursor);
        if cursor < bytes.len() && bytes[cursor] == b'/' {
            cursor = skip_whitespace(bytes, cursor + 1);
        }

        let name_end = scan_name(bytes, cursor);
        if name_end == cursor {
            // Bare `<` in text, e.g. `a < b`
            pos = start + 1;
            continue;
        }

        let tag = html[cursor..name_end].to_ascii_lowercase();
        let (line, column) = position(html, start);

        if FORBIDDEN_TAGS.contains(&tag.as_str()) {
            violations.push(Violation {
                kind: ViolationKind::ForbiddenTag { tag: tag.clone() },
                line,
                column,
            });
        }

        let (tag_end, has_style) = scan_attributes(bytes, name_end);
        if has_style {
            violations.push(Violation {
                kind: ViolationKind::InlineStyle { tag },
                line,
                column,
            });
        }

        pos = tag_end;
    }

    violations
}

/// Returns true if the body passes sanitization
pub fn is_clean(html: &str) -> bool {
    check(html).is_empty()
}

fn skip_whitespace(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    i
}

fn scan_name(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'-' || bytes[i] == b':') {
        i += 1;
    }
    i
}

/// Walks attributes until the closing `>`; returns the index after it and
/// whether a `style` attribute was seen
fn scan_attributes(bytes: &[u8], mut i: usize) -> (usize, bool) {
    let mut has_style = false;

    loop {
        i = skip_whitespace(bytes, i);
        if i >= bytes.len() {
            return (bytes.len(), has_style);
        }

        match bytes[i] {
            b'>' => return (i + 1, has_style),
            b'/' => {
                i += 1;
                continue;
            }
            _ => {}
        }

        let name_start = i;
        while i < bytes.len()
            && !bytes[i].is_ascii_whitespace()
            && !matches!(bytes[i], b'=' | b'>' | b'/' | b'"' | b'\'')
        {
            i += 1;
        }

        if i == name_start {
            // Stray quote; step over it so the scan always advances
            i += 1;
            continue;
        }

        if bytes[name_start..i].eq_ignore_ascii_case(b"style") {
            has_style = true;
        }

        i = skip_whitespace(bytes, i);
        if i < bytes.len() && bytes[i] == b'=' {
            i = skip_whitespace(bytes, i + 1);
            i = skip_value(bytes, i);
        }
    }
}

fn skip_value(bytes: &[u8], mut i: usize) -> usize {
    if i >= bytes.len() {
        return i;
    }

    match bytes[i] {
        quote @ (b'"' | b'\'') => {
            i += 1;
            while i < bytes.len() && bytes[i] != quote {
                i += 1;
            }
            (i + 1).min(bytes.len())
        }
        _ => {
            while i < bytes.len() && !bytes[i].is_ascii_whitespace() && bytes[i] != b'>' {
                i += 1;
            }
            i
        }
    }
}

fn position(text: &str, offset: usize) -> (usize, usize) {
    let before = &text[..offset];
    let line = before.matches('\n').count() + 1;
    let column = match before.rfind('\n') {
        Some(nl) => before[nl + 1..].chars().count() + 1,
        None => before.chars().count() + 1,
    };
    (line, column)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn tags(html: &str) -> Vec<String> {
        check(html)
            .into_iter()
            .map(|v| match v.kind {
                ViolationKind::ForbiddenTag { tag } => tag,
                ViolationKind::InlineStyle { tag } => format!("style@{}", tag),
            })
            .collect()
    }

    #[test]
    fn plain_html_is_clean() {
        let html = r#"<div class="page-content">
  <p class="mb-4 text-lg">Founded in 2010...</p>
  <span class="italic">"Innovation distinguishes between a leader and a follower."</span>
</div>"#;
        assert!(is_clean(html));
    }

    #[test]
    fn rejects_forbidden_tags() {
        assert_eq!(tags("<script>alert(1)</script>"), vec!["script", "script"]);
        assert_eq!(tags("<STYLE>p{}</STYLE>"), vec!["style", "style"]);
        assert_eq!(tags(r#"<link rel="stylesheet" href="a.css">"#), vec!["link"]);
    }

    #[test]
    fn whitespace_after_bracket_still_counts() {
        assert_eq!(tags("< script src=x>"), vec!["script"]);
        assert_eq!(tags("</ style >"), vec!["style"]);
    }

    #[test]
    fn rejects_inline_style_attribute() {
        assert_eq!(tags(r#"<p style="color:red">x</p>"#), vec!["style@p"]);
        assert_eq!(tags("<div STYLE = 'margin:0'>x</div>"), vec!["style@div"]);
        assert_eq!(tags("<div style=margin:0>x</div>"), vec!["style@div"]);
    }

    #[test]
    fn similar_names_are_allowed() {
        assert!(is_clean(r#"<div data-style="compact" class="styled">x</div>"#));
        assert!(is_clean("<scripted-widget></scripted-widget>"));
        assert!(is_clean("<p>a < b and c > d</p>"));
    }

    #[test]
    fn escaped_markup_and_attribute_values_are_allowed() {
        assert!(is_clean("<p>Do not use &lt;script&gt; here</p>"));
        assert!(is_clean(r#"<a title="<script>" href="/x">x</a>"#));
    }

    #[test]
    fn markup_inside_comments_is_checked() {
        assert_eq!(tags("<!-- <script>old</script> --><p>x</p>"), vec!["script", "script"]);
        assert_eq!(tags("<!-- unterminated <style>"), vec!["style"]);
        assert!(is_clean("<!-- layout notes --><p>x</p>"));
    }

    #[test]
    fn abruptly_closed_comments_do_not_hide_markup() {
        assert_eq!(tags("<!--><script>alert(1)</script>"), vec!["script", "script"]);
        assert_eq!(tags("<!---><style>p{}</style>"), vec!["style", "style"]);
    }

    #[test]
    fn reports_positions() {
        let html = "<p>ok</p>\n  <style>x</style>";
        let violations = check(html);

        assert_eq!(violations[0].line, 2);
        assert_eq!(violations[0].column, 3);
        assert_eq!(violations[0].to_string(), "<style> tag at 2:3");
    }

    proptest! {
        #[test]
        fn text_without_angle_brackets_is_clean(s in "[^<]*") {
            prop_assert!(is_clean(&s));
        }

        #[test]
        fn check_never_panics(s in ".*") {
            let _ = check(&s);
        }
    }
}
