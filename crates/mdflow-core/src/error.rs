use crate::span::Span;
use std::fmt;

/// Error kinds for categorizing parse failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// A `===` fence was opened but never closed.
    UnterminatedFence,
    /// A `?[` opener has no matching `]` before the next separator or EOF.
    UnterminatedInteraction,
    /// The inner grammar of a `?[...]` block is invalid (fallback not last,
    /// zero segments, a value containing an unescaped separator).
    MalformedInteraction,
    /// A block was requested at an index the document does not have.
    InvalidBlockIndex,
}

/// A parse error with its location in the source document.
///
/// Structural errors are fatal to the parse that raised them: the caller
/// receives the error instead of a best-effort block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// Human-readable error message.
    pub message: String,
    /// Source location where the error occurred, when known.
    pub span: Option<Span>,
    /// Error categorization.
    pub kind: ParseErrorKind,
}

impl ParseError {
    /// Create an error for an unclosed `===` fence.
    pub fn unterminated_fence(span: Span) -> Self {
        Self {
            message: "unterminated `===` fence".to_string(),
            span: Some(span),
            kind: ParseErrorKind::UnterminatedFence,
        }
    }

    /// Create an error for a `?[` opener with no matching `]`.
    pub fn unterminated_interaction(span: Span) -> Self {
        Self {
            message: "unterminated `?[` interaction".to_string(),
            span: Some(span),
            kind: ParseErrorKind::UnterminatedInteraction,
        }
    }

    /// Create an error for malformed interaction grammar.
    pub fn malformed_interaction(detail: &str, span: Option<Span>) -> Self {
        Self {
            message: format!("malformed interaction: {}", detail),
            span,
            kind: ParseErrorKind::MalformedInteraction,
        }
    }

    /// Create an error for an out-of-range block index.
    pub fn invalid_block_index(index: usize, count: usize) -> Self {
        Self {
            message: format!("block index {} out of range (document has {})", index, count),
            span: None,
            kind: ParseErrorKind::InvalidBlockIndex,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(span) = self.span {
            write!(f, " at bytes {}..{}", span.start, span.end)?;
        }
        Ok(())
    }
}

impl std::error::Error for ParseError {}
