//! Front-matter-aware markdown article parsing.
//!
//! An article is a `+++`-delimited TOML header followed by a markdown body.
//! [`parser::Parser`] turns the text into an immutable [`Document`] whose
//! blocks a renderer consumes in order.

pub mod block;
pub mod document;
pub mod inline;
pub mod parser;

pub use block::Block;
pub use document::slug::slugify;
pub use document::{Document, OutlineEntry};
pub use inline::Span;
pub use parser::{ParseError, ParseErrorKind, Parser};
