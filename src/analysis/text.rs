//! Offsets, ranges and word boundaries over query text.
//!
//! Engine offsets are byte offsets into UTF-8 text and always sit on char
//! boundaries. Editors speak UTF-16 columns; the conversions live here.

use serde::Serialize;

/// A half-open range `[start, end)` of byte offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct CharRange {
    pub start: usize,
    pub end: usize,
}

impl CharRange {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "range start {} after end {}", start, end);
        Self { start, end }
    }

    /// An empty range at `offset` (pure insertion).
    pub fn at(offset: usize) -> Self {
        Self {
            start: offset,
            end: offset,
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Inclusive of `end`, so a cursor right after a word is inside it.
    pub fn touches(&self, offset: usize) -> bool {
        self.start <= offset && offset <= self.end
    }

    /// Whether the range is a valid sub-range of `text`.
    pub fn fits(&self, text: &str) -> bool {
        self.start <= self.end
            && self.end <= text.len()
            && text.is_char_boundary(self.start)
            && text.is_char_boundary(self.end)
    }

    pub fn slice<'a>(&self, text: &'a str) -> &'a str {
        &text[self.start..self.end]
    }
}

/// Clamp an offset into `text` and move it back onto a char boundary.
pub fn clamp_offset(text: &str, offset: usize) -> usize {
    let mut offset = offset.min(text.len());
    while !text.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}

/// Characters that can appear in metric and label identifiers.
pub fn is_ident_char(c: char) -> bool {
    c == '_' || c == ':' || c.is_ascii_alphanumeric()
}

/// Start of the identifier that ends at `cursor`.
pub fn word_start(text: &str, cursor: usize) -> usize {
    let cursor = clamp_offset(text, cursor);
    text[..cursor]
        .char_indices()
        .rev()
        .take_while(|(_, c)| is_ident_char(*c))
        .last()
        .map(|(i, _)| i)
        .unwrap_or(cursor)
}

/// The identifier being typed at `cursor` and its range.
pub fn word_before(text: &str, cursor: usize) -> (CharRange, &str) {
    let cursor = clamp_offset(text, cursor);
    let start = word_start(text, cursor);
    (CharRange::new(start, cursor), &text[start..cursor])
}

/// Byte bounds of the line containing `offset`.
pub fn line_bounds(text: &str, offset: usize) -> CharRange {
    let offset = clamp_offset(text, offset);
    let start = text[..offset].rfind('\n').map(|i| i + 1).unwrap_or(0);
    let end = text[offset..]
        .find('\n')
        .map(|i| offset + i)
        .unwrap_or(text.len());
    CharRange::new(start, end)
}

/// Convert a byte offset to a zero-based (line, UTF-16 column) pair.
pub fn offset_to_position(text: &str, offset: usize) -> (u32, u32) {
    let offset = clamp_offset(text, offset);
    let before = &text[..offset];
    let line = before.matches('\n').count();
    let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
    let column: usize = text[line_start..offset].chars().map(char::len_utf16).sum();
    (line as u32, column as u32)
}

/// Convert a zero-based (line, UTF-16 column) pair to a byte offset.
///
/// Positions past the end of a line clamp to the line end; lines past the
/// end of the text clamp to the text end.
pub fn position_to_offset(text: &str, line: u32, column: u32) -> usize {
    let mut line_start = 0;
    for _ in 0..line {
        match text[line_start..].find('\n') {
            Some(i) => line_start += i + 1,
            None => return text.len(),
        }
    }

    let line_text = match text[line_start..].find('\n') {
        Some(i) => &text[line_start..line_start + i],
        None => &text[line_start..],
    };

    let mut utf16_count = 0;
    for (byte_idx, ch) in line_text.char_indices() {
        if utf16_count >= column as usize {
            return line_start + byte_idx;
        }
        utf16_count += ch.len_utf16();
    }
    line_start + line_text.len()
}
