pub mod slug;

use std::collections::HashSet;
use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

use crate::block::Block;

/// A parsed article: front matter metadata plus its ordered body blocks.
///
/// Built once by [`crate::parser::Parser`] and immutable afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct Document {
    pub(crate) title: String,
    pub(crate) slug: String,
    pub(crate) date: NaiveDate,
    pub(crate) description: Option<String>,
    /// Header entries other than the recognized keys.
    pub(crate) extra: toml::Table,
    pub(crate) blocks: Vec<Block>,
    /// The source file ID (for error reporting with codespan-reporting).
    #[serde(skip)]
    pub(crate) source_id: usize,
}

/// A heading together with its unique in-page anchor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutlineEntry {
    pub level: u8,
    pub text: String,
    pub anchor: String,
}

impl Document {
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn extra(&self) -> &toml::Table {
        &self.extra
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn source_id(&self) -> usize {
        self.source_id
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Headings in document order, each with an anchor no other heading
    /// shares: the second "Results" heading becomes `results-1`.
    pub fn outline(&self) -> Vec<OutlineEntry> {
        let mut issued: HashSet<String> = HashSet::new();
        let mut entries = Vec::new();
        for block in &self.blocks {
            let Block::Heading { level, text } = block else {
                continue;
            };
            let mut base = slug::slugify(text);
            if base.is_empty() {
                base = "section".to_string();
            }
            let mut anchor = base.clone();
            let mut n = 1;
            while issued.contains(&anchor) {
                anchor = format!("{}-{}", base, n);
                n += 1;
            }
            issued.insert(anchor.clone());
            entries.push(OutlineEntry {
                level: *level,
                text: text.clone(),
                anchor,
            });
        }
        entries
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.title == other.title
            && self.slug == other.slug
            && self.date == other.date
            && self.description == other.description
            && self.extra == other.extra
            && self.blocks == other.blocks
    }
}

fn write_entry(f: &mut fmt::Formatter<'_>, key: &str, value: &str) -> fmt::Result {
    writeln!(f, "{} = {}", key, toml::Value::String(value.to_string()))
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "+++")?;
        write_entry(f, "title", &self.title)?;
        write_entry(f, "slug", &self.slug)?;
        write_entry(f, "date", &self.date.format("%Y-%m-%d").to_string())?;
        if let Some(description) = &self.description {
            write_entry(f, "description", description)?;
        }
        if !self.extra.is_empty() {
            let extra = toml::to_string(&self.extra).map_err(|_| fmt::Error)?;
            write!(f, "{}", extra)?;
        }
        writeln!(f, "+++")?;

        let mut prev: Option<&Block> = None;
        for block in &self.blocks {
            if let Some(prev) = prev {
                if !(prev.is_list_item() && block.is_list_item()) {
                    writeln!(f)?;
                }
            }
            write!(f, "{}", block)?;
            prev = Some(block);
        }
        Ok(())
    }
}
