use std::ops::Range;

use crate::parser::error::{ParseError, ParseErrorKind};
use crate::parser::lines::{Line, Lines};

/// Line that opens and closes the metadata header.
pub const MARKER: &str = "+++";

/// The metadata header of an article, split from its body.
///
/// Purely syntactic: required keys are checked by the assembler.
#[derive(Debug, Clone, PartialEq)]
pub struct FrontMatter<'a> {
    /// Every `key = value` entry of the header.
    pub fields: toml::Table,
    /// Text following the closing marker (the whole input when there is no header).
    pub body: &'a str,
    /// Byte offset of `body` within the original source.
    pub body_offset: usize,
    /// Source range of the header including both markers; empty when absent.
    pub header_span: Range<usize>,
    header: &'a str,
    header_offset: usize,
}

impl<'a> FrontMatter<'a> {
    fn absent(source: &'a str, body_offset: usize) -> Self {
        FrontMatter {
            fields: toml::Table::new(),
            body: &source[body_offset..],
            body_offset,
            header_span: 0..0,
            header: "",
            header_offset: 0,
        }
    }

    pub fn is_present(&self) -> bool {
        !self.header_span.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&toml::Value> {
        self.fields.get(key)
    }

    /// Scalar value of `key` as a string. Unquoted TOML dates are rendered
    /// in their ISO form.
    pub fn get_str(&self, key: &str) -> Option<String> {
        match self.fields.get(key)? {
            toml::Value::String(s) => Some(s.clone()),
            toml::Value::Datetime(dt) => Some(dt.to_string()),
            other => Some(other.to_string()),
        }
    }

    /// Source range of the line defining `key`, falling back to the whole header.
    pub fn key_span(&self, key: &str) -> Range<usize> {
        Lines::new(self.header, 0)
            .find(|line| defines_key(line.text, key))
            .map(|line| self.header_offset + line.start..self.header_offset + line.start + line.text.len())
            .unwrap_or_else(|| self.header_span.clone())
    }
}

fn defines_key(text: &str, key: &str) -> bool {
    let text = text.trim_start();
    let text = text
        .strip_prefix('"')
        .and_then(|t| t.strip_prefix(key))
        .and_then(|t| t.strip_prefix('"'))
        .or_else(|| text.strip_prefix(key));
    matches!(text, Some(rest) if rest.trim_start().starts_with('='))
}

fn is_marker(line: &Line<'_>) -> bool {
    line.text.trim_end() == MARKER
}

/// Split `source` into its `+++`-delimited header and the remaining body.
///
/// Input without an opening marker has no header: the table is empty and the
/// body is the entire input.
pub fn split_front_matter(source: &str, file_id: usize) -> Result<FrontMatter<'_>, ParseError> {
    let bom = if source.starts_with('\u{feff}') {
        '\u{feff}'.len_utf8()
    } else {
        0
    };

    let mut lines = Lines::new(source, bom);
    let Some(open) = lines.next() else {
        return Ok(FrontMatter::absent(source, bom));
    };
    if !is_marker(&open) {
        return Ok(FrontMatter::absent(source, bom));
    }

    let Some(close) = lines.find(is_marker) else {
        return Err(ParseError::new(
            ParseErrorKind::MalformedHeader,
            open.start..open.text_end(),
            file_id,
        )
        .with_note(format!("add a closing `{}` line after the last entry", MARKER)));
    };

    let header = &source[open.end..close.start];
    let fields: toml::Table = toml::from_str(header).map_err(|e| {
        let span = e
            .span()
            .map(|s| open.end + s.start..open.end + s.end)
            .unwrap_or(open.start..close.text_end());
        ParseError::new(
            ParseErrorKind::InvalidHeaderEntry {
                message: e.message().trim().to_string(),
            },
            span,
            file_id,
        )
        .with_note("header entries take the form `key = \"value\"`")
        .with_note("backslashes in \"...\" start TOML escapes; use '...' for literal text")
    })?;

    tracing::trace!(keys = fields.len(), "parsed front matter");

    Ok(FrontMatter {
        fields,
        body: &source[close.end..],
        body_offset: close.end,
        header_span: open.start..close.text_end(),
        header,
        header_offset: open.end,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_header_from_body() {
        let src = "+++\ntitle = \"Hello\"\nslug = \"hello\"\n+++\n# Body\n";
        let fm = split_front_matter(src, 0).unwrap();
        assert_eq!(fm.get_str("title").as_deref(), Some("Hello"));
        assert_eq!(fm.get_str("slug").as_deref(), Some("hello"));
        assert_eq!(fm.body, "# Body\n");
        assert_eq!(&src[fm.body_offset..], fm.body);
        assert_eq!(&src[fm.header_span.clone()], "+++\ntitle = \"Hello\"\nslug = \"hello\"\n+++");
    }

    #[test]
    fn no_marker_means_whole_input_is_body() {
        let fm = split_front_matter("Just prose.\n", 0).unwrap();
        assert!(!fm.is_present());
        assert!(fm.fields.is_empty());
        assert_eq!(fm.body, "Just prose.\n");
    }

    #[test]
    fn empty_input_has_no_header() {
        let fm = split_front_matter("", 0).unwrap();
        assert!(fm.fields.is_empty());
        assert_eq!(fm.body, "");
    }

    #[test]
    fn unclosed_header_is_malformed() {
        let err = split_front_matter("+++\ntitle = \"x\"\n# Body\n", 3).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::MalformedHeader);
        assert_eq!(err.span, 0..3);
        assert_eq!(err.file_id, 3);
    }

    #[test]
    fn unquoted_dates_read_as_iso_strings() {
        let fm = split_front_matter("+++\ndate = 2024-08-20\n+++\n", 0).unwrap();
        assert_eq!(fm.get_str("date").as_deref(), Some("2024-08-20"));
    }

    #[test]
    fn unquoted_datetimes_keep_their_time() {
        let fm = split_front_matter("+++\ndate = 2024-08-20T10:30:00Z\n+++\n", 0).unwrap();
        assert_eq!(fm.get_str("date").as_deref(), Some("2024-08-20T10:30:00Z"));
    }

    #[test]
    fn unknown_escapes_need_literal_strings() {
        let err = split_front_matter("+++\ntitle = \"Regex \\d tricks\"\n+++\n", 0).unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::InvalidHeaderEntry { .. }));
        assert!(err.notes.iter().any(|n| n.contains("literal")));

        let fm = split_front_matter("+++\ntitle = 'Regex \\d tricks'\n+++\n", 0).unwrap();
        assert_eq!(fm.get_str("title").as_deref(), Some("Regex \\d tricks"));
    }

    #[test]
    fn tables_and_crlf_are_accepted() {
        let src = "+++\r\ntitle = \"T\"\r\n[taxonomies]\r\ntags = [\"hpx\"]\r\n+++\r\nbody";
        let fm = split_front_matter(src, 0).unwrap();
        assert!(fm.get("taxonomies").is_some_and(|v| v.is_table()));
        assert_eq!(fm.body, "body");
    }

    #[test]
    fn bad_entry_is_reported_inside_header() {
        let src = "+++\ntitle \"oops\"\n+++\n";
        let err = split_front_matter(src, 0).unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::InvalidHeaderEntry { .. }));
        assert!(err.span.start >= 4 && err.span.end <= src.len());
    }

    #[test]
    fn key_span_points_at_entry_line() {
        let src = "+++\ntitle = \"T\"\nslug = \"a b\"\n+++\n";
        let fm = split_front_matter(src, 0).unwrap();
        assert_eq!(&src[fm.key_span("slug")], "slug = \"a b\"");
        assert_eq!(fm.key_span("date"), fm.header_span);
    }
}
