use std::borrow::Cow;
use std::ops::Range;

use crate::parser::error::{ParseError, ParseErrorKind};
use crate::parser::lines::{Line, Lines, indentation};

/// The kind of a segmented block, before inline formatting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawKind {
    Heading { level: u8 },
    Paragraph,
    CodeFence { language: Option<String> },
    ListItem { ordered: bool, depth: u8, number: Option<u64> },
    Quote,
    Rule,
}

/// A block of body text tagged with its kind.
///
/// For code fences `text` is the verbatim content between the fence lines;
/// for prose blocks it is the content with block markers and line
/// indentation removed, lines joined by `\n`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBlock<'a> {
    pub kind: RawKind,
    pub text: Cow<'a, str>,
    /// Byte range in the original source.
    pub span: Range<usize>,
}

/// Lazy iterator over the blocks of an article body.
///
/// Cloning a fresh segmenter restarts the scan. The sequence ends after the
/// first error.
#[derive(Debug, Clone)]
pub struct Segmenter<'a> {
    body: &'a str,
    lines: Lines<'a>,
    offset: usize,
    file_id: usize,
    /// Indentation of the enclosing list items.
    list_indents: Vec<usize>,
    done: bool,
}

/// Split `body` into blocks. `offset` is the byte position of `body` in the
/// source file identified by `file_id`.
pub fn segment(body: &str, offset: usize, file_id: usize) -> Segmenter<'_> {
    Segmenter {
        body,
        lines: Lines::new(body, 0),
        offset,
        file_id,
        list_indents: Vec::new(),
        done: false,
    }
}

impl<'a> Iterator for Segmenter<'a> {
    type Item = Result<RawBlock<'a>, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let line = loop {
            let Some(line) = self.lines.next() else {
                self.done = true;
                return None;
            };
            if !line.is_blank() {
                break line;
            }
        };

        let trimmed = line.text.trim_start();
        let block = if let Some(fence) = Fence::open(trimmed) {
            match self.code_fence(line, fence) {
                Ok(block) => block,
                Err(err) => {
                    self.done = true;
                    return Some(Err(err));
                }
            }
        } else if let Some((level, text)) = heading(trimmed) {
            self.raw(RawKind::Heading { level }, Cow::Borrowed(text), line.start, line.text_end())
        } else if is_rule(trimmed) {
            self.raw(RawKind::Rule, Cow::Borrowed(""), line.start, line.text_end())
        } else if let Some(marker) = list_marker(trimmed) {
            self.list_item(line, marker)
        } else if let Some(content) = quote_content(trimmed) {
            self.quote(line, content)
        } else {
            self.paragraph(line)
        };

        if !matches!(block.kind, RawKind::ListItem { .. }) {
            self.list_indents.clear();
        }
        tracing::trace!(kind = ?block.kind, span = ?block.span, "segmented block");
        Some(Ok(block))
    }
}

impl<'a> Segmenter<'a> {
    fn raw(&self, kind: RawKind, text: Cow<'a, str>, start: usize, end: usize) -> RawBlock<'a> {
        RawBlock {
            kind,
            text,
            span: self.offset + start..self.offset + end,
        }
    }

    fn code_fence(&mut self, open: Line<'a>, fence: Fence<'a>) -> Result<RawBlock<'a>, ParseError> {
        let body = self.body;
        let content_start = open.end;
        while let Some(line) = self.lines.next() {
            if fence.closed_by(line.text) {
                let language = fence.language().map(str::to_string);
                return Ok(self.raw(
                    RawKind::CodeFence { language },
                    Cow::Borrowed(&body[content_start..line.start]),
                    open.start,
                    line.text_end(),
                ));
            }
        }

        let marker = fence.ch.to_string().repeat(fence.len);
        Err(ParseError::new(
            ParseErrorKind::UnterminatedFence {
                marker: marker.clone(),
            },
            self.offset + open.start..self.offset + open.text_end(),
            self.file_id,
        )
        .with_note(format!("close the block with a line of {} or longer", marker)))
    }

    fn list_item(&mut self, line: Line<'a>, marker: ListMarker<'a>) -> RawBlock<'a> {
        let indent = indentation(line.text);
        while self.list_indents.last().is_some_and(|&top| top >= indent) {
            self.list_indents.pop();
        }
        let depth = u8::try_from(self.list_indents.len()).unwrap_or(u8::MAX);
        self.list_indents.push(indent);

        let (text, end) = self.continuation(marker.content, line.text_end());
        self.raw(
            RawKind::ListItem {
                ordered: marker.number.is_some(),
                depth,
                number: marker.number,
            },
            text,
            line.start,
            end,
        )
    }

    fn quote(&mut self, first: Line<'a>, content: &'a str) -> RawBlock<'a> {
        let mut text = Cow::Borrowed(content);
        let mut end = first.text_end();
        while let Some(next) = self.lines.peek() {
            let Some(more) = quote_content(next.text.trim_start()) else {
                break;
            };
            self.lines.next();
            let owned = text.to_mut();
            owned.push('\n');
            owned.push_str(more);
            end = next.text_end();
        }
        self.raw(RawKind::Quote, text, first.start, end)
    }

    fn paragraph(&mut self, first: Line<'a>) -> RawBlock<'a> {
        let (text, end) = self.continuation(first.text.trim(), first.text_end());
        self.raw(RawKind::Paragraph, text, first.start, end)
    }

    /// Absorb following non-blank lines that do not start a block of their own.
    fn continuation(&mut self, first: &'a str, mut end: usize) -> (Cow<'a, str>, usize) {
        let mut text = Cow::Borrowed(first.trim_end());
        while let Some(next) = self.lines.peek() {
            if next.is_blank() || starts_block(next.text.trim_start()) {
                break;
            }
            self.lines.next();
            let owned = text.to_mut();
            owned.push('\n');
            owned.push_str(next.text.trim());
            end = next.text_end();
        }
        (text, end)
    }
}

/// An opening code fence line.
#[derive(Debug, Clone, Copy)]
struct Fence<'a> {
    ch: char,
    len: usize,
    info: &'a str,
}

impl<'a> Fence<'a> {
    fn open(trimmed: &'a str) -> Option<Self> {
        let ch = trimmed.chars().next().filter(|c| *c == '`' || *c == '~')?;
        let len = trimmed.chars().take_while(|c| *c == ch).count();
        if len < 3 {
            return None;
        }
        let info = trimmed[len..].trim();
        if ch == '`' && info.contains('`') {
            return None;
        }
        Some(Fence { ch, len, info })
    }

    /// A line of the same character, at least as long as the opener.
    fn closed_by(&self, text: &str) -> bool {
        let text = text.trim();
        text.len() >= self.len && text.chars().all(|c| c == self.ch)
    }

    fn language(&self) -> Option<&'a str> {
        self.info
            .split(|c: char| c.is_whitespace() || c == ',')
            .next()
            .filter(|lang| !lang.is_empty())
    }
}

fn heading(trimmed: &str) -> Option<(u8, &str)> {
    let level = trimmed.bytes().take_while(|b| *b == b'#').count();
    if !(1..=6).contains(&level) {
        return None;
    }
    let rest = &trimmed[level..];
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let text = rest.trim();
    // Optional closing sequence: `## Title ##`.
    let stripped = text.trim_end_matches('#');
    let text = if stripped.is_empty() || stripped.ends_with(char::is_whitespace) {
        stripped.trim_end()
    } else {
        text
    };
    Some((level as u8, text))
}

fn is_rule(trimmed: &str) -> bool {
    let Some(ch) = trimmed.chars().next().filter(|c| matches!(c, '-' | '*' | '_')) else {
        return false;
    };
    let mut count = 0;
    for c in trimmed.chars() {
        if c == ch {
            count += 1;
        } else if c != ' ' && c != '\t' {
            return false;
        }
    }
    count >= 3
}

#[derive(Debug, Clone, Copy)]
struct ListMarker<'a> {
    number: Option<u64>,
    content: &'a str,
}

fn list_marker(trimmed: &str) -> Option<ListMarker<'_>> {
    let bytes = trimmed.as_bytes();
    let (number, marker_len) = match bytes.first()? {
        b'-' | b'*' | b'+' => (None, 1),
        b'0'..=b'9' => {
            let digits = bytes.iter().take_while(|b| b.is_ascii_digit()).count();
            if digits > 9 || !matches!(bytes.get(digits), Some(b'.' | b')')) {
                return None;
            }
            (trimmed[..digits].parse().ok(), digits + 1)
        }
        _ => return None,
    };
    let rest = &trimmed[marker_len..];
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return None;
    }
    Some(ListMarker {
        number,
        content: rest.trim(),
    })
}

fn quote_content(trimmed: &str) -> Option<&str> {
    let rest = trimmed.strip_prefix('>')?;
    Some(rest.strip_prefix(' ').unwrap_or(rest).trim_end())
}

fn starts_block(trimmed: &str) -> bool {
    Fence::open(trimmed).is_some()
        || heading(trimmed).is_some()
        || is_rule(trimmed)
        || list_marker(trimmed).is_some()
        || quote_content(trimmed).is_some()
}
