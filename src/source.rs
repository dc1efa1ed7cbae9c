//! Source buffer and byte-offset to line/column mapping.

use std::borrow::Cow;

use crate::token::Span;

const BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// A devcmd source buffer with a precomputed line index.
///
/// Offsets everywhere in the crate index into the original bytes,
/// including a leading byte order mark if one was present.
#[derive(Debug, Clone)]
pub struct Source<'a> {
    bytes: &'a [u8],
    start: usize,
    line_starts: Vec<usize>,
}

impl<'a> Source<'a> {
    #[must_use]
    pub fn new(bytes: &'a [u8]) -> Self {
        let start = if bytes.starts_with(BOM) { BOM.len() } else { 0 };
        let mut line_starts = vec![start];
        line_starts.extend(
            bytes
                .iter()
                .enumerate()
                .skip(start)
                .filter(|(_, b)| **b == b'\n')
                .map(|(i, _)| i + 1),
        );
        Self {
            bytes,
            start,
            line_starts,
        }
    }

    #[must_use]
    pub const fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Offset of the first byte after an optional byte order mark.
    #[must_use]
    pub const fn start(&self) -> usize {
        self.start
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.bytes.len() <= self.start
    }

    #[must_use]
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Map a byte offset to a 1-based `(line, column)` pair. Columns count
    /// characters, not bytes.
    #[must_use]
    pub fn line_col(&self, offset: usize) -> (usize, usize) {
        let offset = offset.clamp(self.start, self.bytes.len().max(self.start));
        let line = match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i.saturating_sub(1),
        };
        let line_start = self.line_starts[line];
        let column = self.bytes[line_start..offset]
            .iter()
            .filter(|b| (**b & 0xC0) != 0x80)
            .count()
            + 1;
        (line + 1, column)
    }

    /// Build a span for `[start, end)`.
    #[must_use]
    pub fn span(&self, start: usize, end: usize) -> Span {
        let (line, column) = self.line_col(start);
        Span {
            start,
            end,
            line,
            column,
        }
    }

    /// Source text covered by `span`, with invalid UTF-8 replaced.
    #[must_use]
    pub fn slice(&self, span: &Span) -> Cow<'a, str> {
        self.bytes
            .get(span.start..span.end)
            .map_or(Cow::Borrowed(""), String::from_utf8_lossy)
    }

    /// Text of the 1-based `line`, without its line break.
    #[must_use]
    pub fn line_text(&self, line: usize) -> Cow<'a, str> {
        let Some(&start) = self.line_starts.get(line.wrapping_sub(1)) else {
            return Cow::Borrowed("");
        };
        let end = self
            .line_starts
            .get(line)
            .map_or(self.bytes.len(), |next| next - 1);
        let text = &self.bytes[start..end.max(start)];
        let text = text.strip_suffix(b"\r").unwrap_or(text);
        String::from_utf8_lossy(text)
    }
}
