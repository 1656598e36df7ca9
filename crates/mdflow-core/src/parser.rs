//! Unified parser coordinator.
//!
//! Runs the block parser once per document and the inline pass per block
//! on demand. Owns no mutable cross-call state beyond a read-through
//! parse cache keyed by document identity: a changed document is a new
//! identity, never patched in place. Cache entries are written once and
//! never mutated, so concurrent readers need no coordination beyond the
//! lock; two writers racing on the same key both compute the same result
//! and either insert is valid.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, PoisonError, RwLock};

use crate::block::{self, Block, BlockKind};
use crate::error::ParseError;
use crate::inline;
use crate::interaction::{self, InteractionSpec, Validation};
use crate::variable::{self, Bindings, VarKind, Variable};

/// How the caller intends to use the processed block.
///
/// The mode is opaque to the core: content and interaction resolution are
/// identical regardless of it. Dispatch to an actual model call is the
/// integration layer's concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessMode {
    /// Build the prompt without invoking a model.
    PromptOnly,
    /// Request a complete response.
    Complete,
    /// Request a streamed response.
    Stream,
}

/// The outcome of processing one block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessResult {
    /// The block that was processed.
    pub block: Block,
    /// The mode the caller requested, carried through unchanged.
    pub mode: ProcessMode,
    /// Resolved text: substituted content, verbatim preserved text, or
    /// the interaction's resolved fallback prompt.
    pub resolved_text: String,
    /// Variables of this block, with this block as their occurrence.
    pub variables: Vec<Variable>,
    /// The parsed specifier, for interaction blocks, with its fallback
    /// prompt resolved.
    pub interaction: Option<InteractionSpec>,
    /// Result of checking `user_input`, when one was supplied for an
    /// interaction block.
    pub validation: Option<Validation>,
}

/// Per-block data computed once at parse time.
#[derive(Debug, Clone)]
struct BlockDetail {
    /// Live variable occurrences in the block, scan order.
    variables: Vec<(String, VarKind)>,
    /// Parsed specifier for interaction blocks.
    spec: Option<InteractionSpec>,
}

/// One fully parsed document: source text, typed blocks, and the
/// document-wide variable set. Immutable after construction.
#[derive(Debug)]
pub struct ParsedDocument {
    source: String,
    blocks: Vec<Block>,
    details: Vec<BlockDetail>,
    variables: Vec<Variable>,
}

impl ParsedDocument {
    /// Parse `text` into blocks and extract its variables.
    ///
    /// Structural errors (unterminated fence or interaction, malformed
    /// interaction grammar) fail the whole parse; no partial document is
    /// produced.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let blocks = block::parse_blocks(text)?;

        let mut details = Vec::with_capacity(blocks.len());
        let mut union: BTreeMap<(String, VarKind), BTreeSet<usize>> = BTreeMap::new();

        for block in &blocks {
            let raw = block.raw_text(text);
            let detail = match block.kind {
                BlockKind::Content | BlockKind::Preserved => BlockDetail {
                    variables: variable::extract(raw),
                    spec: None,
                },
                BlockKind::Interaction => {
                    let spec = interaction::parse_interaction(raw).map_err(|e| ParseError {
                        span: Some(block.span),
                        ..e
                    })?;
                    BlockDetail {
                        variables: inline::interaction_variables(&spec),
                        spec: Some(spec),
                    }
                }
            };
            for (name, kind) in &detail.variables {
                union
                    .entry((name.clone(), *kind))
                    .or_default()
                    .insert(block.index);
            }
            details.push(detail);
        }

        let variables = union
            .into_iter()
            .map(|((name, kind), occurrences)| Variable {
                name,
                kind,
                occurrences,
            })
            .collect();

        Ok(Self {
            source: text.to_string(),
            blocks,
            details,
            variables,
        })
    }

    /// The document text this parse was produced from.
    #[inline]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The blocks in document order; indices are stable.
    #[inline]
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Document-wide variable set, sorted by name.
    #[inline]
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// Payload text of the block at `index`.
    pub fn block_text(&self, index: usize) -> Option<&str> {
        self.blocks.get(index).map(|b| b.raw_text(&self.source))
    }

    /// The parsed specifier of the interaction block at `index`, raw
    /// prompt included.
    pub fn interaction(&self, index: usize) -> Option<&InteractionSpec> {
        self.details.get(index).and_then(|d| d.spec.as_ref())
    }
}

/// Coordinator over block and inline parsing with a read-through cache.
///
/// Safe to share between threads; see the module docs for the cache's
/// write-once discipline.
#[derive(Debug, Default)]
pub struct FlowParser {
    cache: RwLock<HashMap<u64, Arc<ParsedDocument>>>,
}

impl FlowParser {
    /// Create a parser with an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `text`, reusing the cached parse when the same document was
    /// seen before.
    pub fn parse(&self, text: &str) -> Result<Arc<ParsedDocument>, ParseError> {
        let key = fingerprint(text);

        {
            let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(doc) = cache.get(&key) {
                if doc.source == text {
                    return Ok(Arc::clone(doc));
                }
            }
        }

        let doc = Arc::new(ParsedDocument::parse(text)?);

        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        let entry = cache.entry(key).or_insert_with(|| Arc::clone(&doc));
        // On a fingerprint collision keep serving the parse we just did;
        // the cache slot stays with the first document.
        if entry.source == text {
            Ok(Arc::clone(entry))
        } else {
            Ok(doc)
        }
    }

    /// All blocks of `text` in document order.
    pub fn get_all_blocks(&self, text: &str) -> Result<Vec<Block>, ParseError> {
        Ok(self.parse(text)?.blocks().to_vec())
    }

    /// Document-wide variable union of `text`.
    pub fn extract_variables(&self, text: &str) -> Result<Vec<Variable>, ParseError> {
        Ok(self.parse(text)?.variables().to_vec())
    }

    /// Process the block at `index`: resolve its content against
    /// `bindings` and, for interaction blocks, validate `user_input` when
    /// supplied.
    pub fn process_block(
        &self,
        text: &str,
        index: usize,
        mode: ProcessMode,
        bindings: &Bindings,
        user_input: Option<&str>,
    ) -> Result<ProcessResult, ParseError> {
        let doc = self.parse(text)?;

        let Some(&block) = doc.blocks.get(index) else {
            return Err(ParseError::invalid_block_index(index, doc.blocks.len()));
        };
        let detail = &doc.details[index];
        let raw = block.raw_text(&doc.source);

        let (resolved_text, spec) = match block.kind {
            BlockKind::Content => (variable::resolve(raw, bindings).into_owned(), None),
            BlockKind::Preserved => (raw.to_string(), None),
            BlockKind::Interaction => {
                // Every interaction block gets its specifier at parse time.
                let spec = detail.spec.clone().ok_or_else(|| {
                    ParseError::malformed_interaction(
                        "interaction block missing its specifier",
                        Some(block.span),
                    )
                })?;
                let (prompt, spec) = inline::resolve_prompt(spec, bindings);
                (prompt, Some(spec))
            }
        };

        let validation = match (&spec, user_input) {
            (Some(spec), Some(input)) => Some(spec.validate(input)),
            _ => None,
        };

        let variables = collect_variables(&detail.variables, index);

        Ok(ProcessResult {
            block,
            mode,
            resolved_text,
            variables,
            interaction: spec,
            validation,
        })
    }
}

/// Deduplicate scan-order occurrences into sorted `Variable`s owned by
/// one block.
fn collect_variables(occurrences: &[(String, VarKind)], index: usize) -> Vec<Variable> {
    let mut set: BTreeMap<(String, VarKind), BTreeSet<usize>> = BTreeMap::new();
    for (name, kind) in occurrences {
        set.entry((name.clone(), *kind)).or_default().insert(index);
    }
    set.into_iter()
        .map(|((name, kind), occurrences)| Variable {
            name,
            kind,
            occurrences,
        })
        .collect()
}

/// FNV-1a hash of the document text, used as its cache identity.
fn fingerprint(text: &str) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for &byte in text.as_bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}
