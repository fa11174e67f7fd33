//! Inline spans and the formatter that resolves them from prose text.
//!
//! Scanning is left to right and never fails: a marker without a closer on
//! the same line is kept as literal text.

use std::fmt;

use serde::Serialize;

/// Inline content within a paragraph, list item or quote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Span {
    Text { value: String },
    Emphasis { value: String, strong: bool },
    InlineCode { value: String },
    Hyperlink { text: String, url: String },
}

impl Span {
    pub fn text(value: impl Into<String>) -> Self {
        Span::Text {
            value: value.into(),
        }
    }

    pub fn emphasis(value: impl Into<String>, strong: bool) -> Self {
        Span::Emphasis {
            value: value.into(),
            strong,
        }
    }

    pub fn code(value: impl Into<String>) -> Self {
        Span::InlineCode {
            value: value.into(),
        }
    }

    pub fn link(text: impl Into<String>, url: impl Into<String>) -> Self {
        Span::Hyperlink {
            text: text.into(),
            url: url.into(),
        }
    }

    /// The visible text of the span, without markup.
    pub fn plain_text(&self) -> &str {
        match self {
            Span::Text { value } | Span::Emphasis { value, .. } | Span::InlineCode { value } => {
                value
            }
            Span::Hyperlink { text, .. } => text,
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Span::Text { value } => write_literal(f, value, false),
            Span::Emphasis { value, strong } => {
                let delim = if *strong { "**" } else { "*" };
                write!(f, "{}{}{}", delim, value, delim)
            }
            Span::InlineCode { value } => {
                let fence = crate::block::fence_for(value, '`', 1);
                write!(f, "{}{}{}", fence, value, fence)
            }
            Span::Hyperlink { text, url } => write!(f, "[{}]({})", text, url),
        }
    }
}

/// Write `spans` as markdown. `at_line_start` marks that the first span
/// begins a line of a block, where `#`, `>` and list markers matter.
pub(crate) fn write_spans(
    f: &mut fmt::Formatter<'_>,
    spans: &[Span],
    at_line_start: bool,
) -> fmt::Result {
    for (n, span) in spans.iter().enumerate() {
        match span {
            Span::Text { value } => write_literal(f, value, at_line_start && n == 0)?,
            other => write!(f, "{}", other)?,
        }
    }
    Ok(())
}

/// Backslash-escape literal text so it reads back unchanged.
fn write_literal(f: &mut fmt::Formatter<'_>, value: &str, at_line_start: bool) -> fmt::Result {
    for (n, line) in value.split('\n').enumerate() {
        if n > 0 {
            f.write_str("\n")?;
        }
        let mut rest = line;
        if n > 0 || at_line_start {
            let digits = line.bytes().take_while(u8::is_ascii_digit).count();
            if digits > 0 && matches!(line.as_bytes().get(digits), Some(b'.' | b')')) {
                f.write_str(&line[..digits])?;
                f.write_str("\\")?;
                rest = &line[digits..];
            } else if line.starts_with(['#', '>', '-', '+', '~']) {
                f.write_str("\\")?;
            }
        }
        for (i, c) in rest.char_indices() {
            if is_special(c) {
                f.write_str("\\")?;
            }
            f.write_str(&rest[i..i + c.len_utf8()])?;
        }
    }
    Ok(())
}

/// Accumulates spans, merging adjacent literal text.
#[derive(Default)]
struct SpanBuf {
    spans: Vec<Span>,
    pending: String,
}

impl SpanBuf {
    fn push_str(&mut self, s: &str) {
        self.pending.push_str(s);
    }

    fn push(&mut self, span: Span) {
        self.flush();
        self.spans.push(span);
    }

    fn flush(&mut self) {
        if !self.pending.is_empty() {
            let value = std::mem::take(&mut self.pending);
            self.spans.push(Span::Text { value });
        }
    }

    fn finish(mut self) -> Vec<Span> {
        self.flush();
        self.spans
    }
}

fn is_special(c: char) -> bool {
    matches!(c, '\\' | '`' | '*' | '_' | '[' | '<')
}

/// Resolve the inline spans of a paragraph, list item or quote.
pub fn format_spans(text: &str) -> Vec<Span> {
    let bytes = text.as_bytes();
    let mut buf = SpanBuf::default();
    let mut i = 0;

    while i < text.len() {
        let next = text[i..].find(is_special).map_or(text.len(), |p| i + p);
        buf.push_str(&text[i..next]);
        i = next;
        if i >= text.len() {
            break;
        }

        let matched = match bytes[i] {
            b'\\' => match bytes.get(i + 1) {
                Some(b) if b.is_ascii_punctuation() => {
                    buf.push_str(&text[i + 1..i + 2]);
                    i += 2;
                    continue;
                }
                _ => None,
            },
            b'`' => code_span(text, i),
            b'*' | b'_' => emphasis(text, i),
            b'[' => hyperlink(text, i),
            b'<' => autolink(text, i),
            _ => None,
        };

        match matched {
            Some((span, end)) => {
                buf.push(span);
                i = end;
            }
            None => {
                // Unmatched markers stay literal, the whole run at once.
                let run = match bytes[i] {
                    b @ (b'`' | b'*' | b'_') => run_length(bytes, i, b),
                    _ => 1,
                };
                buf.push_str(&text[i..i + run]);
                i += run;
            }
        }
    }

    buf.finish()
}

fn run_length(bytes: &[u8], from: usize, b: u8) -> usize {
    bytes[from..].iter().take_while(|&&c| c == b).count()
}

fn line_end(text: &str, from: usize) -> usize {
    text[from..].find('\n').map_or(text.len(), |p| from + p)
}

fn char_before(text: &str, at: usize) -> Option<char> {
    text[..at].chars().next_back()
}

fn char_after(text: &str, at: usize) -> Option<char> {
    text[at..].chars().next()
}

/// A run of n backticks up to the next run of exactly n on the same line.
fn code_span(text: &str, start: usize) -> Option<(Span, usize)> {
    let bytes = text.as_bytes();
    let n = run_length(bytes, start, b'`');
    let end = line_end(text, start);
    let mut j = start + n;
    while j < end {
        match text[j..end].find('`') {
            Some(p) => {
                let at = j + p;
                let m = run_length(&bytes[..end], at, b'`');
                if m == n {
                    return Some((Span::code(&text[start + n..at]), at + m));
                }
                j = at + m;
            }
            None => break,
        }
    }
    None
}

/// `*x*`, `_x_`, `**x**` or `__x__` closed on the same line.
fn emphasis(text: &str, start: usize) -> Option<(Span, usize)> {
    let bytes = text.as_bytes();
    let marker = bytes[start];
    let run = run_length(bytes, start, marker);
    let len = if run >= 2 { 2 } else { 1 };
    let content_start = start + len;

    let first = char_after(text, content_start).filter(|c| !c.is_whitespace())?;
    if marker == b'_' && char_before(text, start).is_some_and(char::is_alphanumeric) {
        return None;
    }

    let end = line_end(text, start);
    let mut j = content_start + first.len_utf8();
    while j < end {
        let Some(p) = text[j..end].find(marker as char) else {
            break;
        };
        let at = j + p;
        let r = run_length(&bytes[..end], at, marker);
        let closes = r == len
            && !char_before(text, at).is_some_and(char::is_whitespace)
            && (marker != b'_' || !char_after(text, at + r).is_some_and(char::is_alphanumeric));
        if closes {
            let value = &text[content_start..at];
            return Some((Span::emphasis(value, len == 2), at + r));
        }
        j = at + r;
    }
    None
}

/// `[text](url)`; the text is taken literally.
fn hyperlink(text: &str, start: usize) -> Option<(Span, usize)> {
    let end = line_end(text, start);
    let close = start + 1 + text[start + 1..end].find(']')?;
    if text.as_bytes().get(close + 1) != Some(&b'(') {
        return None;
    }

    let dest_start = close + 2;
    let mut depth = 0usize;
    for (p, c) in text[dest_start..end].char_indices() {
        match c {
            '(' => depth += 1,
            ')' if depth == 0 => {
                let dest = text[dest_start..dest_start + p].trim();
                // Drop an optional `"title"` after the destination.
                let url = dest.split_whitespace().next().unwrap_or("");
                let url = url
                    .strip_prefix('<')
                    .and_then(|u| u.strip_suffix('>'))
                    .unwrap_or(url);
                let label = &text[start + 1..close];
                return Some((Span::link(label, url), dest_start + p + 1));
            }
            ')' => depth -= 1,
            _ => {}
        }
    }
    None
}

/// `<https://example.org>` style autolinks.
fn autolink(text: &str, start: usize) -> Option<(Span, usize)> {
    let end = line_end(text, start);
    let close = start + 1 + text[start + 1..end].find('>')?;
    let inner = &text[start + 1..close];
    let valid = !inner.is_empty()
        && !inner.contains(|c: char| c.is_whitespace() || c == '<')
        && (inner.contains("://") || inner.starts_with("mailto:"));
    valid.then(|| (Span::link(inner, inner), close + 1))
}
