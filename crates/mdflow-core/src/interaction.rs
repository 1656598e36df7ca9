//! Parser for the inner grammar of `?[...]` interaction blocks.
//!
//! Grammar, left to right: an optional leading `%{{name}}` declaring the
//! variable the answer binds to, then segments split on unescaped `|`.
//! A segment containing an unescaped `...` starts the free-text fallback:
//! everything after the `...` is the fallback prompt and ends the option
//! list. Every other segment is a button option, with `display//value`
//! separating the shown label from the bound value (`display == value`
//! when no `//` is present).
//!
//! `?[Continue|Cancel]` with no bound variable is a plain navigational
//! prompt that assigns nothing.

use crate::error::ParseError;
use crate::escape::{self, EscapeContext};
use crate::variable;

/// One button option of an interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonOption {
    /// Label shown to the user.
    pub display: String,
    /// Value bound when this button is chosen.
    pub value: String,
}

/// The parsed specifier of an interaction block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractionSpec {
    /// Variable the user's answer binds to, if any.
    pub bound_variable: Option<String>,
    /// Button options in declaration order.
    pub options: Vec<ButtonOption>,
    /// Free-text prompt following the `...` marker.
    ///
    /// Kept verbatim from the source: interaction-level escapes and
    /// variable placeholders inside it are rendered at process time, not
    /// here, so partial escapes keep their live `{{name}}` half.
    pub fallback_prompt: Option<String>,
    /// Whether input other than a listed option is accepted.
    pub accepts_free_text: bool,
}

/// Outcome of checking user input against an interaction specifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    /// Input matched; carries the value to bind.
    Valid(String),
    /// Input rejected, with the reason.
    Invalid(String),
}

impl InteractionSpec {
    /// Check `input` against this specifier.
    ///
    /// Input matching an option's display or value (case-sensitive) binds
    /// that option's value. Otherwise the input itself is accepted as free
    /// text when the specifier allows it.
    pub fn validate(&self, input: &str) -> Validation {
        for option in &self.options {
            if option.display == input || option.value == input {
                return Validation::Valid(option.value.clone());
            }
        }
        if self.accepts_free_text {
            return Validation::Valid(input.to_string());
        }
        let expected: Vec<&str> = self.options.iter().map(|o| o.display.as_str()).collect();
        Validation::Invalid(format!(
            "input does not match any option (expected one of: {})",
            expected.join(", ")
        ))
    }
}

/// Parse the inner text of a `?[...]` block (brackets already stripped).
pub fn parse_interaction(inner: &str) -> Result<InteractionSpec, ParseError> {
    let inner = inner.trim();

    // Optional leading bound variable. It declares the binding target and
    // is not itself substituted. An escaped `\%{{...}}` does not bind.
    let (bound_variable, rest) = match variable::preserved_at(inner, 0) {
        Some((name, after)) => (Some(name.to_string()), inner[after..].trim_start()),
        None => (None, inner),
    };

    // The first unescaped `...` always starts the fallback segment, even
    // when a partially escaped variable marker precedes it.
    let (buttons_part, fallback) = match escape::find_unescaped(rest, "...", 0) {
        Some(pos) => {
            let prompt = rest[pos + 3..].trim();
            if escape::find_unescaped(prompt, "|", 0).is_some() {
                return Err(ParseError::malformed_interaction(
                    "fallback segment must be last",
                    None,
                ));
            }
            (rest[..pos].trim_end(), Some(prompt.to_string()))
        }
        None => (rest, None),
    };

    let options = parse_options(buttons_part)?;

    if options.is_empty() && fallback.is_none() && bound_variable.is_none() {
        return Err(ParseError::malformed_interaction("empty specifier", None));
    }

    // A bound variable with neither options nor a fallback marker is a bare
    // free-text input.
    let accepts_free_text =
        fallback.is_some() || (bound_variable.is_some() && options.is_empty());

    Ok(InteractionSpec {
        bound_variable,
        options,
        fallback_prompt: fallback,
        accepts_free_text,
    })
}

/// Split `text` on unescaped `|` and parse each segment as a button.
fn parse_options(text: &str) -> Result<Vec<ButtonOption>, ParseError> {
    let mut options = Vec::new();

    for segment in split_unescaped(text, "|") {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }
        options.push(parse_button(segment)?);
    }

    Ok(options)
}

fn parse_button(segment: &str) -> Result<ButtonOption, ParseError> {
    match escape::find_unescaped(segment, "//", 0) {
        Some(pos) => {
            let display = segment[..pos].trim_end();
            let value = segment[pos + 2..].trim_start();
            if escape::find_unescaped(value, "//", 0).is_some() {
                return Err(ParseError::malformed_interaction(
                    "option value contains unescaped `//`",
                    None,
                ));
            }
            Ok(ButtonOption {
                display: render(display),
                value: render(value),
            })
        }
        None => {
            let text = render(segment);
            Ok(ButtonOption {
                display: text.clone(),
                value: text,
            })
        }
    }
}

/// Render interaction-level escapes to their literal text.
#[inline]
fn render(text: &str) -> String {
    escape::unescape(text, EscapeContext::Interaction).into_owned()
}

/// Iterator over the pieces of `text` between unescaped occurrences of
/// `sep`.
fn split_unescaped<'a>(text: &'a str, sep: &'a str) -> impl Iterator<Item = &'a str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    while let Some(pos) = escape::find_unescaped(text, sep, start) {
        pieces.push(&text[start..pos]);
        start = pos + sep.len();
    }
    pieces.push(&text[start..]);
    pieces.into_iter()
}
