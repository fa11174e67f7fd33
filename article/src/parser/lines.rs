/// One physical line of source text.
///
/// `text` excludes the line terminator (`\n` or `\r\n`); `start..end` covers
/// the line including its terminator, as byte offsets into the scanned text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Line<'a> {
    pub start: usize,
    pub end: usize,
    pub text: &'a str,
}

impl Line<'_> {
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Byte offset just past the last visible character.
    pub fn text_end(&self) -> usize {
        self.start + self.text.len()
    }
}

/// Iterator over the lines of a string, with byte offsets.
#[derive(Debug, Clone)]
pub(crate) struct Lines<'a> {
    source: &'a str,
    pos: usize,
}

impl<'a> Lines<'a> {
    pub fn new(source: &'a str, pos: usize) -> Self {
        Lines { source, pos }
    }

    /// Look at the next line without consuming it.
    pub fn peek(&self) -> Option<Line<'a>> {
        self.clone().next()
    }
}

impl<'a> Iterator for Lines<'a> {
    type Item = Line<'a>;

    fn next(&mut self) -> Option<Line<'a>> {
        if self.pos >= self.source.len() {
            return None;
        }
        let start = self.pos;
        let rest = &self.source[start..];
        let (raw, end) = match rest.find('\n') {
            Some(nl) => (&rest[..nl], start + nl + 1),
            None => (rest, self.source.len()),
        };
        self.pos = end;
        let text = raw.strip_suffix('\r').unwrap_or(raw);
        Some(Line { start, end, text })
    }
}

/// Number of leading space columns (tabs count as four).
pub(crate) fn indentation(text: &str) -> usize {
    let mut cols = 0;
    for c in text.chars() {
        match c {
            ' ' => cols += 1,
            '\t' => cols += 4 - cols % 4,
            _ => break,
        }
    }
    cols
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_cover_terminators() {
        let lines: Vec<_> = Lines::new("a\r\nbc\n\nd", 0).collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], Line { start: 0, end: 3, text: "a" });
        assert_eq!(lines[1], Line { start: 3, end: 6, text: "bc" });
        assert!(lines[2].is_blank());
        assert_eq!(lines[3], Line { start: 7, end: 8, text: "d" });
    }

    #[test]
    fn tabs_expand_to_next_stop() {
        assert_eq!(indentation("\tx"), 4);
        assert_eq!(indentation("  \tx"), 4);
        assert_eq!(indentation("     x"), 5);
    }
}
