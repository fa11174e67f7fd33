use std::fmt;

use serde::Serialize;

use crate::inline::{Span, write_spans};

/// A structural unit of an article body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Heading {
        /// 1 = `#` through 6 = `######`.
        level: u8,
        text: String,
    },
    Paragraph {
        spans: Vec<Span>,
    },
    /// Verbatim fenced code. `raw_text` is never reinterpreted as markdown.
    CodeFence {
        language: Option<String>,
        raw_text: String,
    },
    ListItem {
        ordered: bool,
        /// Nesting level, 0 for a top-level item.
        depth: u8,
        /// The literal ordinal of an ordered item.
        number: Option<u64>,
        spans: Vec<Span>,
    },
    Quote {
        spans: Vec<Span>,
    },
    /// A paragraph that consists of nothing but one link.
    Link {
        text: String,
        url: String,
    },
    Rule,
}

impl Block {
    /// Inline content of prose blocks; empty for the others.
    pub fn spans(&self) -> &[Span] {
        match self {
            Block::Paragraph { spans } | Block::ListItem { spans, .. } | Block::Quote { spans } => {
                spans.as_slice()
            }
            _ => &[],
        }
    }

    pub fn is_list_item(&self) -> bool {
        matches!(self, Block::ListItem { .. })
    }
}

/// Smallest fence of `ch` that cannot be confused with a run inside `text`.
pub(crate) fn fence_for(text: &str, ch: char, min: usize) -> String {
    let mut longest = 0;
    let mut run = 0;
    for c in text.chars() {
        if c == ch {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    ch.to_string().repeat(min.max(longest + 1))
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Block::Heading { level, text } => {
                writeln!(f, "{} {}", "#".repeat(*level as usize), text)
            }
            Block::Paragraph { spans } => {
                write_spans(f, spans, true)?;
                writeln!(f)
            }
            Block::CodeFence { language, raw_text } => {
                let fence = fence_for(raw_text, '`', 3);
                writeln!(f, "{}{}", fence, language.as_deref().unwrap_or(""))?;
                write!(f, "{}", raw_text)?;
                if !raw_text.is_empty() && !raw_text.ends_with('\n') {
                    writeln!(f)?;
                }
                writeln!(f, "{}", fence)
            }
            Block::ListItem {
                ordered,
                depth,
                number,
                spans,
            } => {
                write!(f, "{}", "  ".repeat(*depth as usize))?;
                if *ordered {
                    write!(f, "{}. ", number.unwrap_or(1))?;
                } else {
                    write!(f, "- ")?;
                }
                write_spans(f, spans, false)?;
                writeln!(f)
            }
            Block::Quote { spans } => {
                let text: String = spans.iter().map(|s| s.to_string()).collect();
                for line in text.lines() {
                    writeln!(f, "> {}", line)?;
                }
                Ok(())
            }
            Block::Link { text, url } => writeln!(f, "[{}]({})", text, url),
            Block::Rule => writeln!(f, "---"),
        }
    }
}
