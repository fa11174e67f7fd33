use std::ops::Range;

use codespan_reporting::diagnostic::{Diagnostic, Label, Severity};
use thiserror::Error;

/// Structural failures that abort parsing of one article.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    #[error("front matter opened with `+++` but never closed")]
    MalformedHeader,

    #[error("invalid front matter entry: {message}")]
    InvalidHeaderEntry { message: String },

    #[error("code fence opened with {marker} but never closed")]
    UnterminatedFence { marker: String },

    #[error("missing required front matter key `{key}`")]
    MissingMetadata { key: String },

    #[error("invalid slug {value:?}: must be non-empty and contain no whitespace")]
    InvalidSlug { value: String },

    #[error("invalid date {value:?}: expected YYYY-MM-DD")]
    InvalidDate { value: String },
}

/// Parse errors with source location information.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub span: Range<usize>,
    pub file_id: usize,
    pub notes: Vec<String>,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, span: Range<usize>, file_id: usize) -> Self {
        ParseError {
            kind,
            span,
            file_id,
            notes: Vec::new(),
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Convert to a codespan-reporting Diagnostic for display.
    pub fn to_diagnostic(&self) -> Diagnostic<usize> {
        Diagnostic::new(Severity::Error)
            .with_message(self.kind.to_string())
            .with_labels(vec![Label::primary(self.file_id, self.span.clone())])
            .with_notes(self.notes.clone())
    }
}
