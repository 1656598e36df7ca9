//! Inline-level processing of a single block.
//!
//! Dispatches on block kind: content blocks get variable resolution,
//! preserved blocks pass through verbatim, interaction blocks are parsed
//! into an [`InteractionSpec`] with variables resolved in the fallback
//! prompt only (button displays and values are never substituted).

use crate::error::ParseError;
use crate::escape::EscapeContext;
use crate::interaction::{self, InteractionSpec};
use crate::variable::{self, Bindings, VarKind};

/// The resolved view of one block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineResult {
    /// Resolved text: content with variables substituted, preserved text
    /// verbatim, or an interaction's resolved fallback prompt.
    pub resolved_text: String,
    /// Live variable occurrences in scan order.
    pub variables: Vec<(String, VarKind)>,
    /// The parsed specifier, for interaction blocks.
    pub interaction: Option<InteractionSpec>,
}

/// Resolve a content block.
pub fn process_content(text: &str, bindings: &Bindings) -> InlineResult {
    InlineResult {
        resolved_text: variable::resolve(text, bindings).into_owned(),
        variables: variable::extract(text),
        interaction: None,
    }
}

/// Pass a preserved block through verbatim.
///
/// Variables are still reported so document-wide extraction sees them,
/// but the text is never rewritten.
pub fn process_preserved(text: &str) -> InlineResult {
    InlineResult {
        resolved_text: text.to_string(),
        variables: variable::extract(text),
        interaction: None,
    }
}

/// Parse an interaction block's inner text and resolve its fallback
/// prompt against `bindings`.
///
/// The returned spec carries the *resolved* prompt; the raw form stays
/// available from a fresh [`interaction::parse_interaction`].
pub fn process_interaction(inner: &str, bindings: &Bindings) -> Result<InlineResult, ParseError> {
    let spec = interaction::parse_interaction(inner)?;
    let variables = interaction_variables(&spec);
    let (resolved_text, spec) = resolve_prompt(spec, bindings);
    Ok(InlineResult {
        resolved_text,
        variables,
        interaction: Some(spec),
    })
}

/// Replace the spec's raw fallback prompt with its resolved rendering.
pub(crate) fn resolve_prompt(
    mut spec: InteractionSpec,
    bindings: &Bindings,
) -> (String, InteractionSpec) {
    let resolved = spec.fallback_prompt.as_deref().map(|prompt| {
        variable::resolve_in(prompt, bindings, EscapeContext::Interaction, false).into_owned()
    });
    spec.fallback_prompt = resolved;
    (spec.fallback_prompt.clone().unwrap_or_default(), spec)
}

/// Variables an interaction contributes: the bound variable plus any live
/// placeholders in the raw fallback prompt. Button text never contributes.
pub(crate) fn interaction_variables(spec: &InteractionSpec) -> Vec<(String, VarKind)> {
    let mut vars = Vec::new();
    if let Some(name) = &spec.bound_variable {
        vars.push((name.clone(), VarKind::Preserved));
    }
    if let Some(prompt) = &spec.fallback_prompt {
        vars.extend(variable::extract_in(prompt, EscapeContext::Interaction));
    }
    vars
}
