//! Block-level document structure.
//!
//! Splits a document into an ordered sequence of typed blocks using three
//! structural markers, all escape-aware:
//!
//! - a line consisting solely of `---` separates blocks
//! - a line `===` opens a preserved-content fence closed by the next `===`
//!   line (`===text===` on a single line is the inline form)
//! - an unescaped `?[` opens an interaction block closed by the matching
//!   `]`
//!
//! Blocks are plain span records into the source text: slicing every
//! block's span (plus the separator gaps between them) reproduces the
//! input exactly.

use memchr::memchr;

use crate::error::ParseError;
use crate::escape;
use crate::lexer::Lexer;
use crate::span::Span;

/// The structural type of a block, decided once at block-parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    /// Ordinary content, subject to variable resolution.
    Content,
    /// A `?[...]` interaction specifier.
    Interaction,
    /// `===`-fenced content, emitted verbatim and never rewritten.
    Preserved,
}

/// One structurally-typed unit of a document.
///
/// Blocks carry no text of their own; they locate their content in the
/// source via spans, which keeps them `Copy` and trivially lossless.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    /// Position in document order, 0-based and stable across re-parses of
    /// unchanged text.
    pub index: usize,
    /// The block's structural type.
    pub kind: BlockKind,
    /// Full extent in the source, including fences or brackets.
    pub span: Span,
    /// Payload with structural markers stripped: the bracketed text of an
    /// interaction, the fenced text of preserved content, the trimmed text
    /// of a content block.
    pub inner: Span,
}

impl Block {
    /// The block's payload text (markers stripped).
    #[inline]
    pub fn raw_text<'a>(&self, source: &'a str) -> &'a str {
        self.inner.slice(source)
    }

    /// The block's full source text, markers included.
    #[inline]
    pub fn full_text<'a>(&self, source: &'a str) -> &'a str {
        self.span.slice(source)
    }
}

/// Split `input` into typed blocks.
///
/// Escaped markers do not split: `\---` on a line is literal text, as are
/// `\===` and `\?[`. Consecutive separators are not collapsed, but
/// zero-length content between them is dropped rather than emitted as an
/// empty block. An unclosed fence or interaction is a structural error,
/// not best-effort content.
pub fn parse_blocks(input: &str) -> Result<Vec<Block>, ParseError> {
    BlockParser::new(input).parse()
}

struct BlockParser<'a> {
    input: &'a str,
    lexer: Lexer<'a>,
    blocks: Vec<Block>,
    /// Trimmed extent of the content run being accumulated.
    content: Option<(u32, u32)>,
}

impl<'a> BlockParser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            lexer: Lexer::new(input),
            blocks: Vec::with_capacity(8),
            content: None,
        }
    }

    fn parse(mut self) -> Result<Vec<Block>, ParseError> {
        // Set after consuming an interaction that ends mid-line: the next
        // "line" is the remainder of a physical line, so the full-line
        // markers must not match against it.
        let mut partial = false;

        while let Some(line) = self.lexer.next_line() {
            let full_line = !std::mem::take(&mut partial);
            let trimmed = line.trimmed();

            if full_line && trimmed == "---" {
                self.flush_content();
                continue;
            }

            if full_line && trimmed == "===" {
                self.flush_content();
                self.parse_fence(line.span)?;
                continue;
            }

            if full_line && is_inline_preserved(trimmed) {
                self.flush_content();
                self.push_inline_preserved(line.span, line.text);
                continue;
            }

            if let Some(col) = escape::find_unescaped(line.text, "?[", 0) {
                let open = line.span.start as usize + col;
                self.extend_content_trimmed(line.span.start, &line.text[..col]);
                self.flush_content();

                let close = self.find_interaction_close(open)?;
                if let Some(link_end) = markdown_link_end(self.input, close) {
                    return Err(ParseError::malformed_interaction(
                        "Markdown link is not an interaction",
                        Some(Span::new(open as u32, link_end as u32)),
                    ));
                }
                self.push_block(
                    BlockKind::Interaction,
                    Span::new(open as u32, close as u32 + 1),
                    Span::new(open as u32 + 2, close as u32),
                );

                self.lexer.seek(close + 1);
                partial = true;
                continue;
            }

            if !line.is_blank() {
                self.extend_content_trimmed(line.span.start, line.text);
            }
        }

        self.flush_content();
        Ok(self.blocks)
    }

    /// Consume a multi-line `===` fence opened by the line at `open`.
    fn parse_fence(&mut self, open: Span) -> Result<(), ParseError> {
        let mut inner: Option<(u32, u32)> = None;

        while let Some(line) = self.lexer.next_line() {
            if line.trimmed() == "===" {
                let (start, end) = inner.unwrap_or((open.end, open.end));
                self.push_block(
                    BlockKind::Preserved,
                    Span::new(open.start, line.span.end),
                    Span::new(start, end),
                );
                return Ok(());
            }
            match &mut inner {
                Some((_, end)) => *end = line.span.end,
                None => inner = Some((line.span.start, line.span.end)),
            }
        }

        Err(ParseError::unterminated_fence(open))
    }

    /// Push the inline form `===text===`, fences stripped, inner trimmed.
    fn push_inline_preserved(&mut self, span: Span, text: &str) {
        let trimmed = text.trim();
        let inner = trimmed[3..trimmed.len() - 3].trim();
        let inner_start = span.start + substr_offset(text, inner) as u32;
        self.push_block(
            BlockKind::Preserved,
            span,
            Span::new(inner_start, inner_start + inner.len() as u32),
        );
    }

    /// Scan for the `]` matching the `?[` at `open`. Brackets nest;
    /// backslash-escaped characters never open or close. A block separator
    /// line or end of input before the match is a structural error.
    fn find_interaction_close(&self, open: usize) -> Result<usize, ParseError> {
        let bytes = self.input.as_bytes();
        let mut depth = 1usize;
        let mut i = open + 2;

        while i < bytes.len() {
            match bytes[i] {
                b'\\' => i += 2,
                b'[' => {
                    depth += 1;
                    i += 1;
                }
                b']' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(i);
                    }
                    i += 1;
                }
                b'\n' => {
                    if next_line_is_separator(self.input, i + 1) {
                        return Err(ParseError::unterminated_interaction(Span::new(
                            open as u32,
                            open as u32 + 2,
                        )));
                    }
                    i += 1;
                }
                _ => i += 1,
            }
        }

        Err(ParseError::unterminated_interaction(Span::new(
            open as u32,
            open as u32 + 2,
        )))
    }

    /// Extend the current content run with the trimmed extent of `text`,
    /// which starts at absolute offset `line_start`.
    fn extend_content_trimmed(&mut self, line_start: u32, text: &str) {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return;
        }
        let start = line_start + substr_offset(text, trimmed) as u32;
        let end = start + trimmed.len() as u32;
        match &mut self.content {
            Some((_, run_end)) => *run_end = end,
            None => self.content = Some((start, end)),
        }
    }

    fn flush_content(&mut self) {
        if let Some((start, end)) = self.content.take() {
            if start < end {
                let span = Span::new(start, end);
                self.push_block(BlockKind::Content, span, span);
            }
        }
    }

    fn push_block(&mut self, kind: BlockKind, span: Span, inner: Span) {
        let index = self.blocks.len();
        self.blocks.push(Block {
            index,
            kind,
            span,
            inner,
        });
    }
}

/// `===text===` on one line, with non-empty inner text containing no `=`.
fn is_inline_preserved(trimmed: &str) -> bool {
    if trimmed.len() <= 6 || !trimmed.starts_with("===") || !trimmed.ends_with("===") {
        return false;
    }
    let inner = &trimmed[3..trimmed.len() - 3];
    !inner.contains('=') && !inner.trim().is_empty()
}

/// `?[text](url)` is a Markdown link, not an interaction. Returns the
/// offset past the `)` when the `]` at `close` is followed by a
/// parenthesized, non-empty url on the same line.
fn markdown_link_end(input: &str, close: usize) -> Option<usize> {
    let bytes = input.as_bytes();
    if bytes.get(close + 1) != Some(&b'(') {
        return None;
    }
    let rest = &bytes[close + 2..];
    match memchr(b')', rest) {
        Some(0) => None,
        Some(pos) if memchr(b'\n', &rest[..pos]).is_none() => Some(close + 3 + pos),
        _ => None,
    }
}

/// Whether the line starting at `pos` consists solely of `---`.
fn next_line_is_separator(input: &str, pos: usize) -> bool {
    if pos >= input.len() {
        return false;
    }
    let bytes = input.as_bytes();
    let end = memchr(b'\n', &bytes[pos..]).map_or(input.len(), |p| pos + p);
    input[pos..end].trim() == "---"
}

/// Byte offset of `needle` within `haystack`, where `needle` is a
/// sub-slice of `haystack`.
#[inline]
fn substr_offset(haystack: &str, needle: &str) -> usize {
    needle.as_ptr() as usize - haystack.as_ptr() as usize
}
