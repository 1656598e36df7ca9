//! Variable extraction and escape-aware substitution.
//!
//! Two placeholder forms exist: `{{name}}` is *replaceable* and is
//! substituted from a caller-supplied binding set (or the literal
//! `"UNKNOWN"` when absent or empty), while `%{{name}}` is *preserved*
//! and passes through unchanged for the downstream model to interpret.
//!
//! Resolution never fails: unresolvable bindings degrade to the
//! `"UNKNOWN"` placeholder, and escaped placeholders are copied through
//! as their literal-text rendering.

use std::borrow::Cow;
use std::collections::{BTreeSet, HashMap};

use memchr::{memchr, memchr3};

use crate::escape::{self, EscapeContext, EscapeKind, PRESERVED_OPEN, REPLACEABLE_OPEN, VAR_CLOSE};

/// Literal substituted for a replaceable variable with no usable binding.
pub const UNKNOWN_VALUE: &str = "UNKNOWN";

/// Caller-supplied variable bindings.
pub type Bindings = HashMap<String, String>;

/// Whether a variable occurrence is substituted or passed through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum VarKind {
    /// `{{name}}`: substituted with a bound value or `"UNKNOWN"`.
    Replaceable,
    /// `%{{name}}`: never substituted, emitted as-is.
    Preserved,
}

/// A variable discovered in a document, with the blocks it occurs in.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Variable {
    /// The identifier between the braces.
    pub name: String,
    /// Replaceable or preserved.
    pub kind: VarKind,
    /// Indices of the blocks this variable occurs in.
    pub occurrences: BTreeSet<usize>,
}

/// Extract every live variable occurrence from `text`.
///
/// Escaped placeholders are skipped; the `{{name}}` half of a partially
/// escaped `\%{{name}}` is reported as replaceable. Occurrences are
/// returned in scan order and may repeat.
pub fn extract(text: &str) -> Vec<(String, VarKind)> {
    extract_in(text, EscapeContext::Document)
}

pub(crate) fn extract_in(text: &str, ctx: EscapeContext) -> Vec<(String, VarKind)> {
    let mut vars = Vec::new();
    let bytes = text.as_bytes();
    let mut pos = 0;

    while pos < bytes.len() {
        let Some(step) = memchr3(b'\\', b'%', b'{', &bytes[pos..]) else {
            break;
        };
        pos += step;

        match bytes[pos] {
            b'\\' => match escape::classify(text, pos, ctx) {
                EscapeKind::None => pos += 1,
                EscapeKind::Full { consumed, .. } | EscapeKind::Partial { consumed, .. } => {
                    // Full escapes neutralize the marker; partial escapes
                    // leave the `{{` live for the next iteration.
                    pos += consumed;
                }
            },
            b'%' => {
                if let Some((name, after)) = preserved_at(text, pos) {
                    vars.push((name.to_string(), VarKind::Preserved));
                    pos = after;
                } else {
                    pos += 1;
                }
            }
            _ => {
                if let Some((name, after)) = replaceable_at(text, pos) {
                    vars.push((name.to_string(), VarKind::Replaceable));
                    pos = after;
                } else {
                    pos += 1;
                }
            }
        }
    }

    vars
}

/// Substitute replaceable variables in `text` from `bindings`.
///
/// Preserved variables and escaped placeholders are copied through
/// unchanged; missing or empty bindings become [`UNKNOWN_VALUE`]. Borrows
/// the input when nothing needed rewriting.
pub fn resolve<'a>(text: &'a str, bindings: &Bindings) -> Cow<'a, str> {
    resolve_in(text, bindings, EscapeContext::Document, false)
}

/// Substitute both replaceable *and* preserved variables.
///
/// Intended for previewing a document with all placeholders filled in;
/// normal processing never substitutes preserved variables.
pub fn resolve_preview<'a>(text: &'a str, bindings: &Bindings) -> Cow<'a, str> {
    resolve_in(text, bindings, EscapeContext::Document, true)
}

pub(crate) fn resolve_in<'a>(
    text: &'a str,
    bindings: &Bindings,
    ctx: EscapeContext,
    substitute_preserved: bool,
) -> Cow<'a, str> {
    let bytes = text.as_bytes();

    // Fast path: nothing to escape and nothing to substitute.
    if memchr(b'\\', bytes).is_none() && !text.contains(REPLACEABLE_OPEN) {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len());
    let mut pos = 0;

    while pos < bytes.len() {
        let Some(step) = memchr3(b'\\', b'%', b'{', &bytes[pos..]) else {
            out.push_str(&text[pos..]);
            break;
        };
        out.push_str(&text[pos..pos + step]);
        pos += step;

        match bytes[pos] {
            b'\\' => match escape::classify(text, pos, ctx) {
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
            },
            b'%' => {
                if let Some((name, after)) = preserved_at(text, pos) {
                    if substitute_preserved {
                        out.push_str(binding_value(bindings, name));
                    } else {
                        out.push_str(&text[pos..after]);
                    }
                    pos = after;
                } else {
                    out.push('%');
                    pos += 1;
                }
            }
            _ => {
                if let Some((name, after)) = replaceable_at(text, pos) {
                    out.push_str(binding_value(bindings, name));
                    pos = after;
                } else {
                    out.push('{');
                    pos += 1;
                }
            }
        }
    }

    Cow::Owned(out)
}

#[inline]
fn binding_value<'b>(bindings: &'b Bindings, name: &str) -> &'b str {
    match bindings.get(name) {
        Some(value) if !value.is_empty() => value,
        _ => UNKNOWN_VALUE,
    }
}

/// Parse a `%{{name}}` placeholder at `pos`. Returns the identifier and
/// the offset just past the closing `}}`.
pub(crate) fn preserved_at(text: &str, pos: usize) -> Option<(&str, usize)> {
    if !text[pos..].starts_with(PRESERVED_OPEN) {
        return None;
    }
    ident_at(text, pos + PRESERVED_OPEN.len())
}

/// Parse a `{{name}}` placeholder at `pos`. Rejects positions where the
/// `{{` belongs to a `%{{` preserved marker.
pub(crate) fn replaceable_at(text: &str, pos: usize) -> Option<(&str, usize)> {
    if !text[pos..].starts_with(REPLACEABLE_OPEN) {
        return None;
    }
    if pos > 0 && text.as_bytes()[pos - 1] == b'%' && !escape::is_escaped(text, pos - 1) {
        return None;
    }
    ident_at(text, pos + REPLACEABLE_OPEN.len())
}

/// Parse an identifier starting at `start`, followed by `}}`.
///
/// Identifiers are ASCII letters, digits, and underscores, and must not
/// start with a digit. Anything else makes the braces plain text.
fn ident_at(text: &str, start: usize) -> Option<(&str, usize)> {
    let bytes = text.as_bytes();
    let mut end = start;

    while end < bytes.len() && is_ident_byte(bytes[end]) {
        end += 1;
    }

    if end == start || bytes[start].is_ascii_digit() {
        return None;
    }
    if !text[end..].starts_with(VAR_CLOSE) {
        return None;
    }

    Some((&text[start..end], end + VAR_CLOSE.len()))
}

#[inline]
const fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}
