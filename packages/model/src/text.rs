//! UTF-16 offset helpers.
//!
//! Offsets into text nodes count UTF-16 code units so that positions line up
//! with what editing surfaces (DOM selections, IME events) report.

/// Length of `s` in UTF-16 code units
pub fn utf16_len(s: &str) -> usize {
    s.chars().map(char::len_utf16).sum()
}

/// Convert a UTF-16 offset into a byte index.
///
/// Returns `None` when the offset is past the end or falls between the two
/// halves of a surrogate pair.
pub fn byte_index(s: &str, offset: usize) -> Option<usize> {
    let mut units = 0;
    for (index, ch) in s.char_indices() {
        if units == offset {
            return Some(index);
        }
        if units > offset {
            return None;
        }
        units += ch.len_utf16();
    }
    (units == offset).then_some(s.len())
}

/// Slice `s` between two UTF-16 offsets
pub fn slice(s: &str, start: usize, end: usize) -> Option<&str> {
    let start = byte_index(s, start)?;
    let end = byte_index(s, end)?;
    s.get(start..end)
}
