use chrono::NaiveDate;

use crate::block::Block;
use crate::document::Document;
use crate::document::slug::is_valid_slug;
use crate::inline::{Span, format_spans};
use crate::parser::error::{ParseError, ParseErrorKind};
use crate::parser::frontmatter::FrontMatter;
use crate::parser::segmenter::{RawBlock, RawKind};

const KNOWN_KEYS: [&str; 4] = ["title", "slug", "date", "description"];

/// Combine front matter and segmented blocks into a [`Document`].
pub fn assemble<'a, I>(front: &FrontMatter<'a>, raw_blocks: I, file_id: usize) -> Result<Document, ParseError>
where
    I: IntoIterator<Item = Result<RawBlock<'a>, ParseError>>,
{
    let title = required(front, "title", file_id)?;
    let slug = required(front, "slug", file_id)?;
    let date = required(front, "date", file_id)?;

    if !is_valid_slug(&slug) {
        return Err(ParseError::new(
            ParseErrorKind::InvalidSlug { value: slug },
            front.key_span("slug"),
            file_id,
        ));
    }

    let date = parse_date(&date).ok_or_else(|| {
        ParseError::new(
            ParseErrorKind::InvalidDate {
                value: date.clone(),
            },
            front.key_span("date"),
            file_id,
        )
        .with_note("dates are written as `YYYY-MM-DD`, optionally followed by a time")
    })?;

    let extra: toml::Table = front
        .fields
        .iter()
        .filter(|(key, _)| !KNOWN_KEYS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    if !extra.is_empty() {
        tracing::debug!(
            keys = ?extra.keys().collect::<Vec<_>>(),
            "keeping unrecognized front matter keys"
        );
    }

    let blocks = raw_blocks
        .into_iter()
        .map(|raw| raw.map(to_block))
        .collect::<Result<Vec<_>, _>>()?;

    tracing::debug!(%slug, blocks = blocks.len(), "assembled document");

    Ok(Document {
        title,
        slug,
        date,
        description: front.get_str("description"),
        extra,
        blocks,
        source_id: file_id,
    })
}

fn required(front: &FrontMatter<'_>, key: &str, file_id: usize) -> Result<String, ParseError> {
    front.get_str(key).ok_or_else(|| missing(front, key, file_id))
}

fn missing(front: &FrontMatter<'_>, key: &str, file_id: usize) -> ParseError {
    let err = ParseError::new(
        ParseErrorKind::MissingMetadata {
            key: key.to_string(),
        },
        front.header_span.clone(),
        file_id,
    );
    if front.is_present() {
        err.with_note(format!("add `{} = \"...\"` to the front matter", key))
    } else {
        err.with_note("the document has no `+++` front matter block")
    }
}

/// `YYYY-MM-DD`, optionally followed by a `T` or space separated time.
fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    let date = value
        .split_once(['T', ' '])
        .map_or(value, |(date, _)| date);
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}

fn to_block(raw: RawBlock<'_>) -> Block {
    match raw.kind {
        RawKind::Heading { level } => Block::Heading {
            level,
            text: raw.text.into_owned(),
        },
        RawKind::Paragraph => {
            let spans = format_spans(&raw.text);
            if let [Span::Hyperlink { text, url }] = spans.as_slice() {
                Block::Link {
                    text: text.clone(),
                    url: url.clone(),
                }
            } else {
                Block::Paragraph { spans }
            }
        }
        RawKind::CodeFence { language } => Block::CodeFence {
            language,
            raw_text: raw.text.into_owned(),
        },
        RawKind::ListItem {
            ordered,
            depth,
            number,
        } => Block::ListItem {
            ordered,
            depth,
            number,
            spans: format_spans(&raw.text),
        },
        RawKind::Quote => Block::Quote {
            spans: format_spans(&raw.text),
        },
        RawKind::Rule => Block::Rule,
    }
}
