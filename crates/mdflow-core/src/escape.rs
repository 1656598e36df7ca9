//! Backslash-escape resolution for the MarkdownFlow grammar.
//!
//! The dialect has three scanning contexts, each with its own set of
//! escape-sensitive markers:
//!
//! - `Document`: `---` (separator), `===` (fence), `?[` (interaction
//!   opener), plus the variable sigils `%{{` and `{{`
//! - `Interaction`: `%{{`, `{{`, `...`, `|`, `//`, and the brackets
//!   `[` / `]` that would otherwise nest or close the specifier
//! - `Variable`: `%{{`, `{{`
//!
//! A marker preceded by a backslash is escaped. Most escapes are *full*:
//! the marker becomes literal text and the backslash is dropped. The
//! compound marker `%{{` escapes *partially*: `\%{{name}}` renders a
//! literal `%` while `{{name}}` stays live and is re-scanned as an
//! ordinary replaceable variable. `\\` before a marker escapes the marker
//! and keeps one literal backslash; a bare `\\` renders a single backslash.
//!
//! Scanning is a single left-to-right pass per context span, no
//! backtracking.

use std::borrow::Cow;

use memchr::{memchr, memmem};

/// Opening marker of a replaceable variable.
pub const REPLACEABLE_OPEN: &str = "{{";
/// Opening marker of a preserved variable.
pub const PRESERVED_OPEN: &str = "%{{";
/// Closing marker of either variable form.
pub const VAR_CLOSE: &str = "}}";

/// Which marker set is escape-sensitive at the current scan position.
///
/// Contexts nest: the span between `?[` and its matching `]` is scanned in
/// `Interaction` context, and a variable placeholder inside it switches to
/// `Variable` context for the enclosed name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscapeContext {
    /// Top-level document structure.
    Document,
    /// Inside a `?[...]` interaction specifier.
    Interaction,
    /// Inside ordinary text where only variable markers are live.
    Variable,
}

impl EscapeContext {
    /// Markers recognized in this context, most specific first.
    ///
    /// Document context carries both the structural markers and the
    /// variable sigils: a content block's body is scanned in document
    /// context, where `\---` and `\{{name}}` are both meaningful.
    pub fn markers(self) -> &'static [&'static str] {
        match self {
            EscapeContext::Document => &["%{{", "{{", "?[", "===", "---"],
            EscapeContext::Interaction => &["%{{", "{{", "...", "//", "|", "[", "]"],
            EscapeContext::Variable => &["%{{", "{{"],
        }
    }
}

/// Classification of the escape sequence starting at a backslash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscapeKind {
    /// The backslash precedes no marker and is ordinary text.
    None,
    /// The whole marker is consumed and rendered as literal text.
    Full {
        /// The marker rendered literally.
        marker: &'static str,
        /// True for `\\marker`: one literal backslash precedes the marker.
        keep_backslash: bool,
        /// Bytes consumed starting at the backslash.
        consumed: usize,
    },
    /// `\%{{`: only the `%` is rendered literally; the `{{` that follows
    /// stays live and must be re-scanned by the caller.
    Partial {
        /// True for `\\%{{`.
        keep_backslash: bool,
        /// Bytes consumed starting at the backslash (through the `%`).
        consumed: usize,
    },
}

/// Classify the escape sequence at `pos`, which must point at a `\`.
///
/// Returns [`EscapeKind::None`] when the backslash precedes nothing the
/// current context treats as a marker.
pub fn classify(text: &str, pos: usize, ctx: EscapeContext) -> EscapeKind {
    debug_assert_eq!(text.as_bytes().get(pos), Some(&b'\\'));

    let after = &text[pos + 1..];

    // `\\marker` escapes the marker and keeps one literal backslash.
    if let Some(after2) = after.strip_prefix('\\') {
        if let Some(marker) = leading_marker(after2, ctx) {
            return escape_of(marker, true);
        }
        // Plain escaped backslash.
        return EscapeKind::Full {
            marker: "",
            keep_backslash: true,
            consumed: 2,
        };
    }

    match leading_marker(after, ctx) {
        Some(marker) => escape_of(marker, false),
        None => EscapeKind::None,
    }
}

/// Check whether the marker at `marker_pos` is escaped by a preceding
/// backslash.
#[inline]
pub fn is_escaped(text: &str, marker_pos: usize) -> bool {
    marker_pos > 0 && text.as_bytes()[marker_pos - 1] == b'\\'
}

/// Find the next occurrence of `marker` at or after `from` that is not
/// escaped by a preceding backslash. Returns an absolute byte offset.
pub fn find_unescaped(text: &str, marker: &str, from: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    for pos in memmem::find_iter(&bytes[from..], marker.as_bytes()) {
        let abs = from + pos;
        if !is_escaped(text, abs) {
            return Some(abs);
        }
    }
    None
}

/// Render every escape in `text` to its literal form for the given context.
///
/// Borrows the input unchanged when it contains no backslash. Partial
/// escapes render their `%` and leave the trailing `{{...}}` as plain text;
/// callers that need the live-variable semantics of a partial escape must
/// scan the text themselves via [`classify`].
pub fn unescape(text: &str, ctx: EscapeContext) -> Cow<'_, str> {
    let bytes = text.as_bytes();
    let Some(first) = memchr(b'\\', bytes) else {
        return Cow::Borrowed(text);
    };

    let mut out = String::with_capacity(text.len());
    out.push_str(&text[..first]);
    let mut pos = first;

    while pos < bytes.len() {
        if bytes[pos] != b'\\' {
            let next = memchr(b'\\', &bytes[pos..]).map_or(bytes.len(), |p| pos + p);
            out.push_str(&text[pos..next]);
            pos = next;
            continue;
        }

        match classify(text, pos, ctx) {
            EscapeKind::None => {
                out.push('\\');
                pos += 1;
            }
            EscapeKind::Full {
                marker,
                keep_backslash,
                consumed,
            } => {
                if keep_backslash {
                    out.push('\\');
                }
                out.push_str(marker);
                pos += consumed;
            }
            EscapeKind::Partial {
                keep_backslash,
                consumed,
            } => {
                if keep_backslash {
                    out.push('\\');
                }
                out.push('%');
                pos += consumed;
            }
        }
    }

    Cow::Owned(out)
}

/// The marker from `ctx` that `rest` starts with, if any.
fn leading_marker(rest: &str, ctx: EscapeContext) -> Option<&'static str> {
    ctx.markers()
        .iter()
        .copied()
        .find(|m| rest.starts_with(m))
}

fn escape_of(marker: &'static str, keep_backslash: bool) -> EscapeKind {
    let prefix = if keep_backslash { 2 } else { 1 };
    // `%{{` always escapes partially: the `%` goes literal, the `{{`
    // stays live.
    if marker == PRESERVED_OPEN {
        EscapeKind::Partial {
            keep_backslash,
            consumed: prefix + 1,
        }
    } else {
        EscapeKind::Full {
            marker,
            keep_backslash,
            consumed: prefix + marker.len(),
        }
    }
}
