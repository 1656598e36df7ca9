//! Source location tracking for parsed blocks.
//!
//! Blocks and parse errors carry a `Span` locating them in the document
//! text, so callers can slice the source directly and report precise
//! positions.

/// A byte range in the source text.
///
/// Spans use byte offsets (not character offsets); `start` is inclusive,
/// `end` exclusive.
///
/// # Example
///
/// ```rust
/// use mdflow_core::span::Span;
///
/// let span = Span::new(3, 8);
/// assert_eq!(span.slice("ab cdefg hi"), "cdefg");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    /// Starting byte offset (inclusive).
    pub start: u32,
    /// Ending byte offset (exclusive).
    pub end: u32,
}

impl Span {
    /// Create a new span from byte offsets.
    #[inline]
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Slice the given source text to this span.
    ///
    /// # Panics
    ///
    /// Panics if the span does not lie on char boundaries of `source`.
    /// Spans produced by this crate always do.
    #[inline]
    pub fn slice<'a>(&self, source: &'a str) -> &'a str {
        &source[self.start as usize..self.end as usize]
    }
}
