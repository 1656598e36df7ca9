//! # MarkdownFlow Core
//!
//! Parser for the MarkdownFlow dialect: multi-step, LLM-driven
//! conversational documents built from content blocks, preserved-output
//! blocks, and user-interaction blocks, with replaceable (`{{name}}`) and
//! preserved (`%{{name}}`) variable placeholders and a layered
//! backslash-escape grammar.
//!
//! ## Quick Start
//!
//! ```rust
//! use mdflow_core::{BlockKind, FlowParser};
//!
//! let input = "Hello {{name}}!\n---\n?[%{{level}} Beginner|Expert]";
//! let parser = FlowParser::new();
//! let doc = parser.parse(input).unwrap();
//!
//! assert_eq!(doc.blocks().len(), 2);
//! assert_eq!(doc.blocks()[1].kind, BlockKind::Interaction);
//! ```
//!
//! ## Variable resolution
//!
//! ```rust
//! use mdflow_core::{Bindings, FlowParser, ProcessMode};
//!
//! let parser = FlowParser::new();
//! let mut bindings = Bindings::new();
//! bindings.insert("name".to_string(), "Ada".to_string());
//!
//! let result = parser
//!     .process_block("Hello {{name}}!", 0, ProcessMode::PromptOnly, &bindings, None)
//!     .unwrap();
//! assert_eq!(result.resolved_text, "Hello Ada!");
//! ```
//!
//! Parsing is synchronous, pure, and CPU-bound; the only cross-call state
//! is [`FlowParser`]'s read-through parse cache.

pub mod block;
pub mod error;
pub mod escape;
pub mod inline;
pub mod interaction;
pub mod lexer;
pub mod parser;
pub mod span;
pub mod variable;

pub use block::{parse_blocks, Block, BlockKind};
pub use error::{ParseError, ParseErrorKind};
pub use escape::EscapeContext;
pub use interaction::{parse_interaction, ButtonOption, InteractionSpec, Validation};
pub use parser::{FlowParser, ParsedDocument, ProcessMode, ProcessResult};
pub use variable::{Bindings, VarKind, Variable, UNKNOWN_VALUE};
