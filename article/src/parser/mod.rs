pub mod assemble;
pub mod error;
pub mod frontmatter;
mod lines;
pub mod segmenter;

pub use error::{ParseError, ParseErrorKind};

use crate::document::Document;

/// Parser entry point.
pub struct Parser {
    source: String,
    file_id: usize,
}

impl Parser {
    pub fn new(source: String, file_id: usize) -> Self {
        Parser { source, file_id }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Parse the source text into a complete Document.
    ///
    /// Front matter is split off first, the body is segmented into blocks,
    /// and the assembler validates the metadata and formats inline spans.
    pub fn parse(&self) -> Result<Document, ParseError> {
        parse_str(&self.source, self.file_id)
    }
}

/// Parse borrowed source text into a Document.
pub fn parse_str(source: &str, file_id: usize) -> Result<Document, ParseError> {
    let front = frontmatter::split_front_matter(source, file_id)?;
    let blocks = segmenter::segment(front.body, front.body_offset, file_id);
    assemble::assemble(&front, blocks, file_id)
}
