//! Bounds-aware substring views for the template parser.
//!
//! [`SubStringRef`] is a borrowed window `(buffer, start, end)` into an
//! immutable template buffer, with search helpers that return offsets
//! relative to the window start and clamp hits past the window end to
//! "not found". All offsets are byte offsets; directive syntax is ASCII,
//! so scans only ever land on character boundaries.

/// A borrowed view into a template buffer.
///
/// Invariant: `start <= end <= buffer.len()`. Violations are programmer
/// errors caught by debug assertions, not recoverable conditions.
#[derive(Debug, Clone, Copy)]
pub struct SubStringRef<'a> {
    buffer: &'a str,
    start: usize,
    end: usize,
}

impl<'a> SubStringRef<'a> {
    /// View from `start` to the end of the buffer.
    #[must_use]
    pub fn new(buffer: &'a str, start: usize) -> Self {
        debug_assert!(start <= buffer.len());
        Self {
            buffer,
            start,
            end: buffer.len(),
        }
    }

    /// View over an explicit `[start, end)` range.
    #[must_use]
    pub fn with_end(buffer: &'a str, start: usize, end: usize) -> Self {
        debug_assert!(start <= end);
        debug_assert!(end <= buffer.len());
        Self { buffer, start, end }
    }

    /// Finds `needle` at or after `from` (relative to the view start).
    ///
    /// The search runs over the underlying buffer; a hit whose first byte
    /// lies at or past the view end counts as not found. The returned
    /// offset is relative to the view start.
    #[must_use]
    pub fn find(&self, needle: &str, from: usize) -> Option<usize> {
        let begin = (self.start + from).min(self.buffer.len());
        let hit = find_bytes(self.buffer.as_bytes(), needle.as_bytes(), begin)?;
        if hit >= self.end {
            None
        } else {
            Some(hit - self.start)
        }
    }

    /// Finds the first occurrence of any byte in `set`, same clamping
    /// discipline as [`find`](Self::find).
    #[must_use]
    pub fn find_first_of(&self, set: &str, from: usize) -> Option<usize> {
        let begin = (self.start + from).min(self.buffer.len());
        let bytes = self.buffer.as_bytes();
        let hit = (begin..bytes.len()).find(|&i| set.as_bytes().contains(&bytes[i]))?;
        if hit >= self.end {
            None
        } else {
            Some(hit - self.start)
        }
    }

    /// Byte-for-byte equality of the whole view against `literal`.
    ///
    /// The literal must terminate exactly where the view does; a literal
    /// that is a strict prefix (or extension) of the view does not match.
    #[must_use]
    pub fn match_equal(&self, literal: &str) -> bool {
        self.buffer.as_bytes()[self.start..self.end] == *literal.as_bytes()
    }

    /// Moves the view start, clamped to the buffer length and snapped
    /// forward to the next character boundary. Block skips advance by a
    /// fixed byte count past `@end`, which may land inside a multi-byte
    /// character; snapping forward swallows that whole character.
    pub fn set_start(&mut self, new_start: usize) {
        let mut start = new_start.min(self.buffer.len());
        while !self.buffer.is_char_boundary(start) {
            start += 1;
        }
        self.start = start;
    }

    /// Moves the view end, clamped to the buffer length.
    #[inline]
    pub fn set_end(&mut self, new_end: usize) {
        self.end = new_end.min(self.buffer.len());
    }

    #[inline]
    #[must_use]
    pub fn start(&self) -> usize {
        self.start
    }

    #[inline]
    #[must_use]
    pub fn end(&self) -> usize {
        self.end
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// The underlying buffer in full.
    #[inline]
    #[must_use]
    pub fn original(&self) -> &'a str {
        self.buffer
    }

    /// The viewed text.
    ///
    /// Offsets produced by directive scanning always sit on ASCII bytes;
    /// should arithmetic ever land inside a multi-byte character (e.g.
    /// the byte swallowed after `@end` is non-ASCII), the bounds are
    /// rounded down to the previous character boundary.
    #[must_use]
    pub fn as_str(&self) -> &'a str {
        let start = floor_char_boundary(self.buffer, self.start);
        let end = floor_char_boundary(self.buffer, self.end).max(start);
        &self.buffer[start..end]
    }

    /// 1-based line number of the view start within the buffer.
    #[must_use]
    pub fn line_number(&self) -> usize {
        let bytes = &self.buffer.as_bytes()[..self.start.min(self.buffer.len())];
        bytes.iter().filter(|&&b| b == b'\n').count() + 1
    }
}

fn find_bytes(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if needle.is_empty() {
        return (from <= haystack.len()).then_some(from);
    }
    if from >= haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|i| i + from)
}

pub(crate) fn floor_char_boundary(s: &str, mut index: usize) -> usize {
    index = index.min(s.len());
    while !s.is_char_boundary(index) {
        index -= 1;
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_is_relative_to_view_start() {
        let buffer = "abc @end xyz";
        let view = SubStringRef::new(buffer, 4);
        assert_eq!(view.find("@end", 0), Some(0));
        assert_eq!(view.find("xyz", 0), Some(5));
        assert_eq!(view.find("abc", 0), None);
    }

    #[test]
    fn find_clamps_past_view_end() {
        let buffer = "aaa needle";
        let view = SubStringRef::with_end(buffer, 0, 4);
        assert_eq!(view.find("needle", 0), None);
        assert_eq!(SubStringRef::new(buffer, 0).find("needle", 0), Some(4));
    }

    #[test]
    fn find_first_of_scans_byte_set() {
        let view = SubStringRef::new("@pset( a, 1 )", 0);
        assert_eq!(view.find_first_of(" \t(", 1), Some(5));
        assert_eq!(view.find_first_of("#", 0), None);
    }

    #[test]
    fn match_equal_requires_exact_termination() {
        let buffer = "@counter(x)";
        let view = SubStringRef::with_end(buffer, 1, 8);
        assert!(view.match_equal("counter"));
        assert!(!view.match_equal("count"));
        assert!(!view.match_equal("counters"));
    }

    #[test]
    fn setters_clamp_to_buffer() {
        let mut view = SubStringRef::new("short", 0);
        view.set_start(100);
        view.set_end(100);
        assert_eq!(view.start(), 5);
        assert_eq!(view.end(), 5);
        assert!(view.is_empty());
        assert_eq!(view.as_str(), "");
    }

    #[test]
    fn line_numbers_are_one_based() {
        let buffer = "line one\nline two\nline three";
        assert_eq!(SubStringRef::new(buffer, 0).line_number(), 1);
        assert_eq!(SubStringRef::new(buffer, 9).line_number(), 2);
        assert_eq!(SubStringRef::new(buffer, buffer.len()).line_number(), 3);
    }
}
