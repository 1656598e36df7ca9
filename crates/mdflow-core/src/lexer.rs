//! Line-based lexer over the document text.
//!
//! The block parser works a line at a time: separators (`---`) and fences
//! (`===`) are line-level markers. Newline scanning uses `memchr` (SIMD on
//! supported platforms) and lines borrow directly from the input.

use crate::span::Span;
use memchr::memchr;

/// A single line from the input with its source span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Line<'a> {
    /// The line text (without trailing newline).
    pub text: &'a str,
    /// Byte span in the original input, excluding the newline.
    pub span: Span,
}

impl<'a> Line<'a> {
    /// Check if this line contains only whitespace.
    #[inline(always)]
    pub fn is_blank(&self) -> bool {
        self.text.bytes().all(|b| b == b' ' || b == b'\t')
    }

    /// Line text with leading/trailing whitespace removed.
    #[inline(always)]
    pub fn trimmed(&self) -> &'a str {
        self.text.trim()
    }
}

/// Consuming line reader for the block parser.
pub struct Lexer<'a> {
    input: &'a str,
    bytes: &'a [u8],
    /// Current byte offset into the input.
    offset: usize,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given input.
    #[inline]
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            bytes: input.as_bytes(),
            offset: 0,
        }
    }

    /// Resume reading from an absolute byte offset. Used after consuming
    /// a marker that ends mid-line.
    #[inline]
    pub fn seek(&mut self, offset: usize) {
        self.offset = offset.min(self.bytes.len());
    }

    /// Consume and return the next line.
    #[inline]
    pub fn next_line(&mut self) -> Option<Line<'a>> {
        if self.offset >= self.bytes.len() {
            return None;
        }

        let start = self.offset;
        let end = match memchr(b'\n', &self.bytes[start..]) {
            Some(pos) => start + pos,
            None => self.bytes.len(),
        };

        // CRLF input: drop the CR from the line text as well.
        let text_end = if end > start && self.bytes[end - 1] == b'\r' {
            end - 1
        } else {
            end
        };

        self.offset = if end < self.bytes.len() { end + 1 } else { end };

        Some(Line {
            text: &self.input[start..text_end],
            span: Span::new(start as u32, text_end as u32),
        })
    }
}
