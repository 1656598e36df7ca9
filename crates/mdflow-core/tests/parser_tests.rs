//! Integration tests for the MarkdownFlow parser

use std::borrow::Cow;
use std::sync::Arc;

use mdflow_core::escape::{self, EscapeContext};
use mdflow_core::variable::{self, extract, resolve, resolve_preview};
use mdflow_core::{
    inline, parse_blocks, parse_interaction, Bindings, BlockKind, FlowParser, ParseErrorKind,
    ProcessMode, Validation, VarKind, UNKNOWN_VALUE,
};

fn bindings(pairs: &[(&str, &str)]) -> Bindings {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

// ============================================================================
// Block Splitting Tests
// ============================================================================

#[test]
fn test_split_on_separator() {
    let input = "First block\n---\nSecond block";
    let blocks = parse_blocks(input).unwrap();
    assert_eq!(blocks.len(), 2);
    assert_eq!(blocks[0].kind, BlockKind::Content);
    assert_eq!(blocks[0].raw_text(input), "First block");
    assert_eq!(blocks[1].raw_text(input), "Second block");
}

#[test]
fn test_consecutive_separators_produce_no_empty_blocks() {
    let input = "A\n---\n---\n---\nB";
    let blocks = parse_blocks(input).unwrap();
    assert_eq!(blocks.len(), 2);
    assert_eq!(blocks[0].raw_text(input), "A");
    assert_eq!(blocks[1].raw_text(input), "B");
}

#[test]
fn test_leading_and_trailing_separators() {
    let input = "---\nOnly block\n---";
    let blocks = parse_blocks(input).unwrap();
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].raw_text(input), "Only block");
}

#[test]
fn test_blank_lines_do_not_split_blocks() {
    let input = "Para one\n\nPara two";
    let blocks = parse_blocks(input).unwrap();
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].raw_text(input), "Para one\n\nPara two");
}

#[test]
fn test_separator_requires_own_line() {
    let input = "dashes --- inline";
    let blocks = parse_blocks(input).unwrap();
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].raw_text(input), "dashes --- inline");
}

#[test]
fn test_indented_separator_still_splits() {
    let input = "A\n  ---  \nB";
    let blocks = parse_blocks(input).unwrap();
    assert_eq!(blocks.len(), 2);
}

#[test]
fn test_escaped_separator_is_content() {
    let input = "Line\n\\---\nMore";
    let blocks = parse_blocks(input).unwrap();
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].raw_text(input), "Line\n\\---\nMore");
}

#[test]
fn test_empty_document_has_no_blocks() {
    assert!(parse_blocks("").unwrap().is_empty());
    assert!(parse_blocks("\n\n  \n").unwrap().is_empty());
    assert!(parse_blocks("---\n---").unwrap().is_empty());
}

#[test]
fn test_block_indices_follow_document_order() {
    let input = "A\n---\n?[Go]\n---\n===\nB\n===";
    let blocks = parse_blocks(input).unwrap();
    assert_eq!(blocks.len(), 3);
    for (i, block) in blocks.iter().enumerate() {
        assert_eq!(block.index, i);
    }
    assert_eq!(blocks[0].kind, BlockKind::Content);
    assert_eq!(blocks[1].kind, BlockKind::Interaction);
    assert_eq!(blocks[2].kind, BlockKind::Preserved);
}

#[test]
fn test_crlf_input() {
    let input = "A\r\n---\r\nB\r\n";
    let blocks = parse_blocks(input).unwrap();
    assert_eq!(blocks.len(), 2);
    assert_eq!(blocks[0].raw_text(input), "A");
    assert_eq!(blocks[1].raw_text(input), "B");
}

// ============================================================================
// Losslessness Tests
// ============================================================================

#[test]
fn test_spans_reconstruct_the_input() {
    let input = "Intro text\n---\n===\nRaw {{x}}\n===\nPick: ?[A|B] tail\n---\nEnd";
    let blocks = parse_blocks(input).unwrap();

    let mut out = String::new();
    let mut pos = 0usize;
    for block in &blocks {
        assert!(block.span.start as usize >= pos, "blocks overlap");
        out.push_str(&input[pos..block.span.start as usize]);
        out.push_str(block.full_text(input));
        pos = block.span.end as usize;
    }
    out.push_str(&input[pos..]);
    assert_eq!(out, input);
}

#[test]
fn test_full_text_includes_structural_markers() {
    let input = "===\nkeep me\n===";
    let blocks = parse_blocks(input).unwrap();
    assert_eq!(blocks[0].full_text(input), "===\nkeep me\n===");
    assert_eq!(blocks[0].raw_text(input), "keep me");

    let input = "?[Yes|No]";
    let blocks = parse_blocks(input).unwrap();
    assert_eq!(blocks[0].full_text(input), "?[Yes|No]");
    assert_eq!(blocks[0].raw_text(input), "Yes|No");
}

// ============================================================================
// Preserved Fence Tests
// ============================================================================

#[test]
fn test_multiline_fence() {
    let input = "Intro\n===\nRaw {{x}}\n===\nOutro";
    let blocks = parse_blocks(input).unwrap();
    assert_eq!(blocks.len(), 3);
    assert_eq!(blocks[1].kind, BlockKind::Preserved);
    assert_eq!(blocks[1].raw_text(input), "Raw {{x}}");
}

#[test]
fn test_fence_interior_is_structurally_inert() {
    // Separators and interaction openers inside a fence are plain text.
    let input = "===\n---\n?[not an interaction]\n===";
    let blocks = parse_blocks(input).unwrap();
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].kind, BlockKind::Preserved);
    assert_eq!(blocks[0].raw_text(input), "---\n?[not an interaction]");
}

#[test]
fn test_empty_fence() {
    let input = "===\n===";
    let blocks = parse_blocks(input).unwrap();
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].kind, BlockKind::Preserved);
    assert_eq!(blocks[0].raw_text(input), "");
}

#[test]
fn test_inline_fence_form() {
    let input = "===The Golden Rule===";
    let blocks = parse_blocks(input).unwrap();
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].kind, BlockKind::Preserved);
    assert_eq!(blocks[0].raw_text(input), "The Golden Rule");
}

#[test]
fn test_inline_fence_rejects_empty_and_equals_inner() {
    // Too short / whitespace-only inner: not the inline form.
    let blocks = parse_blocks("======").unwrap();
    assert_eq!(blocks[0].kind, BlockKind::Content);

    let blocks = parse_blocks("===   ===").unwrap();
    assert_eq!(blocks[0].kind, BlockKind::Content);

    // `=` inside the inner text disqualifies it too.
    let blocks = parse_blocks("===a=b===").unwrap();
    assert_eq!(blocks[0].kind, BlockKind::Content);
}

#[test]
fn test_escaped_fence_is_content() {
    let input = "\\===\nstill content";
    let blocks = parse_blocks(input).unwrap();
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].kind, BlockKind::Content);
}

#[test]
fn test_unterminated_fence_is_an_error() {
    let err = parse_blocks("ok\n---\n===\nnever closed").unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::UnterminatedFence);
    assert!(err.span.is_some());
}

// ============================================================================
// Interaction Structure Tests
// ============================================================================

#[test]
fn test_midline_interaction_splits_surrounding_content() {
    let input = "Pick one: ?[A|B] then go";
    let blocks = parse_blocks(input).unwrap();
    assert_eq!(blocks.len(), 3);
    assert_eq!(blocks[0].raw_text(input), "Pick one:");
    assert_eq!(blocks[1].kind, BlockKind::Interaction);
    assert_eq!(blocks[1].raw_text(input), "A|B");
    assert_eq!(blocks[2].raw_text(input), "then go");
}

#[test]
fn test_two_interactions_on_one_line() {
    let input = "?[A]?[B]";
    let blocks = parse_blocks(input).unwrap();
    assert_eq!(blocks.len(), 2);
    assert_eq!(blocks[0].raw_text(input), "A");
    assert_eq!(blocks[1].raw_text(input), "B");
}

#[test]
fn test_interaction_spans_lines() {
    let input = "?[Yes|\nNo]";
    let blocks = parse_blocks(input).unwrap();
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].raw_text(input), "Yes|\nNo");

    let spec = parse_interaction(blocks[0].raw_text(input)).unwrap();
    assert_eq!(spec.options.len(), 2);
    assert_eq!(spec.options[0].display, "Yes");
    assert_eq!(spec.options[1].display, "No");
}

#[test]
fn test_interaction_brackets_nest() {
    let input = "?[See [docs]|Skip]";
    let blocks = parse_blocks(input).unwrap();
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].raw_text(input), "See [docs]|Skip");
}

#[test]
fn test_markdown_link_is_not_an_interaction() {
    let err = parse_blocks("see ?[the docs](https://example.com)").unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::MalformedInteraction);

    // Parenthesized text after the close is ordinary content, not a url.
    let input = "?[Continue] (optional)";
    let blocks = parse_blocks(input).unwrap();
    assert_eq!(blocks.len(), 2);
    assert_eq!(blocks[1].raw_text(input), "(optional)");
}

#[test]
fn test_escaped_opener_is_content() {
    let input = "literal \\?[not one]";
    let blocks = parse_blocks(input).unwrap();
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].kind, BlockKind::Content);
}

#[test]
fn test_unterminated_interaction_at_eof() {
    let err = parse_blocks("?[Choose").unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::UnterminatedInteraction);
}

#[test]
fn test_unterminated_interaction_at_separator() {
    let err = parse_blocks("?[Choose\n---\nNext").unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::UnterminatedInteraction);
}

// ============================================================================
// Interaction Grammar Tests
// ============================================================================

#[test]
fn test_buttons_with_bound_variable() {
    let spec = parse_interaction("%{{level}} Beginner|Intermediate|Expert").unwrap();
    assert_eq!(spec.bound_variable.as_deref(), Some("level"));
    assert_eq!(spec.options.len(), 3);
    assert_eq!(spec.options[0].display, "Beginner");
    assert_eq!(spec.options[0].value, "Beginner");
    assert!(!spec.accepts_free_text);
    assert!(spec.fallback_prompt.is_none());
}

#[test]
fn test_display_value_separator() {
    let spec = parse_interaction("%{{choice}} Yes//1|No//0").unwrap();
    assert_eq!(spec.options[0].display, "Yes");
    assert_eq!(spec.options[0].value, "1");
    assert_eq!(spec.options[1].display, "No");
    assert_eq!(spec.options[1].value, "0");
}

#[test]
fn test_escaped_pipe_inside_option() {
    let spec = parse_interaction("%{{v}} A\\|B|C").unwrap();
    assert_eq!(spec.options.len(), 2);
    assert_eq!(spec.options[0].display, "A|B");
    assert_eq!(spec.options[0].value, "A|B");
    assert_eq!(spec.options[1].display, "C");
}

#[test]
fn test_escaped_bracket_inside_option() {
    // `\]` keeps the bracket out of close matching, and rendering drops
    // the backslash it no longer needs.
    let input = "?[A\\]B|C]";
    let blocks = parse_blocks(input).unwrap();
    assert_eq!(blocks[0].raw_text(input), "A\\]B|C");

    let spec = parse_interaction(blocks[0].raw_text(input)).unwrap();
    assert_eq!(spec.options.len(), 2);
    assert_eq!(spec.options[0].display, "A]B");
    assert_eq!(spec.options[0].value, "A]B");
    assert_eq!(spec.options[1].display, "C");
}

#[test]
fn test_escaped_slashes_inside_value() {
    let spec = parse_interaction("A//b\\//c").unwrap();
    assert_eq!(spec.options[0].display, "A");
    assert_eq!(spec.options[0].value, "b//c");
}

#[test]
fn test_navigational_prompt_binds_nothing() {
    let spec = parse_interaction("Continue|Cancel").unwrap();
    assert!(spec.bound_variable.is_none());
    assert_eq!(spec.options.len(), 2);
    assert!(!spec.accepts_free_text);
}

#[test]
fn test_free_text_fallback() {
    let spec = parse_interaction("%{{name}}...What is your name?").unwrap();
    assert_eq!(spec.bound_variable.as_deref(), Some("name"));
    assert!(spec.options.is_empty());
    assert_eq!(spec.fallback_prompt.as_deref(), Some("What is your name?"));
    assert!(spec.accepts_free_text);
}

#[test]
fn test_buttons_with_fallback() {
    let spec = parse_interaction("%{{lang}} Rust|Go|...Name another language").unwrap();
    assert_eq!(spec.options.len(), 2);
    assert_eq!(spec.fallback_prompt.as_deref(), Some("Name another language"));
    assert!(spec.accepts_free_text);
}

#[test]
fn test_bare_bound_variable_accepts_free_text() {
    let spec = parse_interaction("%{{name}}").unwrap();
    assert_eq!(spec.bound_variable.as_deref(), Some("name"));
    assert!(spec.options.is_empty());
    assert!(spec.fallback_prompt.is_none());
    assert!(spec.accepts_free_text);
}

#[test]
fn test_empty_segments_between_pipes_are_dropped() {
    let spec = parse_interaction("A||B|").unwrap();
    assert_eq!(spec.options.len(), 2);
}

#[test]
fn test_empty_specifier_is_an_error() {
    let err = parse_interaction("").unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::MalformedInteraction);

    let err = parse_interaction("  | | ").unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::MalformedInteraction);
}

#[test]
fn test_fallback_must_be_last() {
    let err = parse_interaction("A|...prompt|B").unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::MalformedInteraction);
}

#[test]
fn test_double_slash_in_value_is_an_error() {
    let err = parse_interaction("A//b//c").unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::MalformedInteraction);
}

#[test]
fn test_escaped_variable_marker_does_not_bind() {
    // `\%{{x}}` renders a literal `%` and leaves `{{x}}` live, so the
    // segment is a button label, not a binding declaration; the first
    // unescaped `...` still starts the fallback.
    let spec = parse_interaction("\\%{{x}}...Enter name").unwrap();
    assert!(spec.bound_variable.is_none());
    assert_eq!(spec.options.len(), 1);
    assert_eq!(spec.options[0].display, "%{{x}}");
    assert_eq!(spec.fallback_prompt.as_deref(), Some("Enter name"));
    assert!(spec.accepts_free_text);
}

#[test]
fn test_malformed_interaction_fails_the_document_parse() {
    let parser = FlowParser::new();
    let err = parser.parse("Go\n---\n?[]").unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::MalformedInteraction);
    assert!(err.span.is_some());
}

// ============================================================================
// Input Validation Tests
// ============================================================================

#[test]
fn test_validate_matches_display_or_value() {
    let spec = parse_interaction("%{{lang}} Rust//rs|Go//go").unwrap();
    assert_eq!(spec.validate("Rust"), Validation::Valid("rs".to_string()));
    assert_eq!(spec.validate("go"), Validation::Valid("go".to_string()));
}

#[test]
fn test_validate_rejects_unlisted_input() {
    let spec = parse_interaction("%{{lang}} Rust|Go").unwrap();
    match spec.validate("Zig") {
        Validation::Invalid(reason) => assert!(reason.contains("Rust")),
        other => panic!("expected rejection, got {:?}", other),
    }
}

#[test]
fn test_validate_accepts_free_text_with_fallback() {
    let spec = parse_interaction("%{{name}}...Your name?").unwrap();
    assert_eq!(spec.validate("Ada"), Validation::Valid("Ada".to_string()));
}

#[test]
fn test_validate_is_case_sensitive() {
    let spec = parse_interaction("%{{lang}} Rust").unwrap();
    assert!(matches!(spec.validate("rust"), Validation::Invalid(_)));
}

// ============================================================================
// Variable Extraction Tests
// ============================================================================

#[test]
fn test_extract_both_variable_kinds() {
    let vars = extract("Hi {{name}}, meet %{{ctx}}");
    assert_eq!(
        vars,
        vec![
            ("name".to_string(), VarKind::Replaceable),
            ("ctx".to_string(), VarKind::Preserved),
        ]
    );
}

#[test]
fn test_invalid_identifiers_are_plain_text() {
    assert!(extract("{{9lives}}").is_empty());
    assert!(extract("{{a b}}").is_empty());
    assert!(extract("{{}}").is_empty());
    assert!(extract("{{ name }}").is_empty());
}

#[test]
fn test_escaped_placeholders_are_not_extracted() {
    assert!(extract("\\{{name}}").is_empty());
    // Partial escape: the `%` goes literal but `{{name}}` stays live.
    assert_eq!(
        extract("\\%{{name}}"),
        vec![("name".to_string(), VarKind::Replaceable)]
    );
}

#[test]
fn test_document_wide_variable_union() {
    let input = "Hi {{name}}\n---\n?[%{{level}} A|B]\n---\n===\n{{name}} and %{{topic}}\n===";
    let parser = FlowParser::new();
    let vars = parser.extract_variables(input).unwrap();

    assert_eq!(vars.len(), 3);
    assert_eq!(vars[0].name, "level");
    assert_eq!(vars[0].kind, VarKind::Preserved);
    assert!(vars[0].occurrences.contains(&1));

    assert_eq!(vars[1].name, "name");
    assert_eq!(vars[1].kind, VarKind::Replaceable);
    assert_eq!(vars[1].occurrences.iter().copied().collect::<Vec<_>>(), vec![0, 2]);

    assert_eq!(vars[2].name, "topic");
    assert_eq!(vars[2].kind, VarKind::Preserved);
    assert!(vars[2].occurrences.contains(&2));
}

#[test]
fn test_button_text_contributes_no_variables() {
    let parser = FlowParser::new();
    let vars = parser.extract_variables("?[%{{v}} {{x}}|B]").unwrap();
    assert_eq!(vars.len(), 1);
    assert_eq!(vars[0].name, "v");
}

// ============================================================================
// Variable Resolution Tests
// ============================================================================

#[test]
fn test_resolve_substitutes_bindings() {
    let b = bindings(&[("name", "Ada")]);
    assert_eq!(resolve("Hello {{name}}!", &b), "Hello Ada!");
}

#[test]
fn test_missing_or_empty_binding_becomes_unknown() {
    let b = bindings(&[("empty", "")]);
    assert_eq!(resolve("{{missing}}", &b), UNKNOWN_VALUE);
    assert_eq!(resolve("{{empty}}", &b), UNKNOWN_VALUE);
}

#[test]
fn test_preserved_variables_pass_through() {
    let b = bindings(&[("ctx", "ignored")]);
    assert_eq!(resolve("ask %{{ctx}} later", &b), "ask %{{ctx}} later");
}

#[test]
fn test_resolve_preview_substitutes_preserved_too() {
    let b = bindings(&[("ctx", "filled")]);
    assert_eq!(resolve_preview("ask %{{ctx}} later", &b), "ask filled later");
}

#[test]
fn test_resolve_borrows_when_nothing_changes() {
    let b = Bindings::new();
    assert!(matches!(resolve("plain text", &b), Cow::Borrowed(_)));
}

#[test]
fn test_resolve_renders_escapes() {
    let b = bindings(&[("name", "Ada")]);
    assert_eq!(resolve("\\{{name}}", &b), "{{name}}");
    assert_eq!(resolve("\\%{{name}}", &b), "%Ada");
    assert_eq!(resolve("\\---", &b), "---");
    assert_eq!(resolve("\\\\---", &b), "\\---");
    assert_eq!(resolve("a\\b", &b), "a\\b");
}

#[test]
fn test_resolve_is_idempotent_on_resolved_text() {
    let b = bindings(&[("name", "Ada")]);
    let once = resolve("Hello {{name}}, \\{{fine}}?", &b).into_owned();
    // Rendered escapes and substituted values contain no live markers,
    // but "{{fine}}" came back literal; a second pass must not touch it.
    assert_eq!(resolve(&once.replace("{{fine}}", "fine"), &b), "Hello Ada, fine?");
    assert_eq!(resolve("Hello Ada!", &b), "Hello Ada!");
}

// ============================================================================
// Escape Scanning Tests
// ============================================================================

#[test]
fn test_find_unescaped_skips_escaped_markers() {
    assert_eq!(escape::find_unescaped("a\\|b|c", "|", 0), Some(4));
    assert_eq!(escape::find_unescaped("a\\|b", "|", 0), None);
}

#[test]
fn test_unescape_borrows_without_backslashes() {
    let out = escape::unescape("no escapes here", EscapeContext::Interaction);
    assert!(matches!(out, Cow::Borrowed(_)));
}

#[test]
fn test_context_determines_live_markers() {
    // `...` is an interaction-level marker only.
    assert_eq!(escape::unescape("\\...", EscapeContext::Interaction), "...");
    assert_eq!(escape::unescape("\\...", EscapeContext::Document), "\\...");
}

// ============================================================================
// Coordinator Tests
// ============================================================================

#[test]
fn test_process_content_block() {
    let parser = FlowParser::new();
    let b = bindings(&[("name", "Ada")]);
    let result = parser
        .process_block("Hello {{name}}!", 0, ProcessMode::Complete, &b, None)
        .unwrap();
    assert_eq!(result.resolved_text, "Hello Ada!");
    assert_eq!(result.variables.len(), 1);
    assert_eq!(result.variables[0].name, "name");
    assert!(result.interaction.is_none());
    assert!(result.validation.is_none());
}

#[test]
fn test_process_preserved_block_is_verbatim() {
    let parser = FlowParser::new();
    let b = bindings(&[("x", "filled")]);
    let result = parser
        .process_block("===\n{{x}} stays\n===", 0, ProcessMode::Complete, &b, None)
        .unwrap();
    assert_eq!(result.resolved_text, "{{x}} stays");
}

#[test]
fn test_process_interaction_resolves_prompt_only() {
    let parser = FlowParser::new();
    let b = bindings(&[("user", "Ada")]);
    let input = "?[%{{name}} {{user}}//u|...Hello {{user}}, your name?]";
    let result = parser
        .process_block(input, 0, ProcessMode::PromptOnly, &b, None)
        .unwrap();

    let spec = result.interaction.unwrap();
    // Button text is never substituted; the fallback prompt is.
    assert_eq!(spec.options[0].display, "{{user}}");
    assert_eq!(spec.fallback_prompt.as_deref(), Some("Hello Ada, your name?"));
    assert_eq!(result.resolved_text, "Hello Ada, your name?");
}

#[test]
fn test_process_block_validates_user_input() {
    let parser = FlowParser::new();
    let b = Bindings::new();
    let input = "?[%{{lang}} Rust//rs|Go//go]";

    let result = parser
        .process_block(input, 0, ProcessMode::Complete, &b, Some("Rust"))
        .unwrap();
    assert_eq!(result.validation, Some(Validation::Valid("rs".to_string())));

    let result = parser
        .process_block(input, 0, ProcessMode::Complete, &b, Some("Zig"))
        .unwrap();
    assert!(matches!(result.validation, Some(Validation::Invalid(_))));
}

#[test]
fn test_process_block_index_out_of_range() {
    let parser = FlowParser::new();
    let err = parser
        .process_block("only one", 3, ProcessMode::Complete, &Bindings::new(), None)
        .unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::InvalidBlockIndex);
}

#[test]
fn test_mode_does_not_change_resolution() {
    let parser = FlowParser::new();
    let b = bindings(&[("name", "Ada")]);
    let input = "Hi {{name}}";

    let modes = [ProcessMode::PromptOnly, ProcessMode::Complete, ProcessMode::Stream];
    let texts: Vec<String> = modes
        .iter()
        .map(|&mode| {
            let result = parser.process_block(input, 0, mode, &b, None).unwrap();
            assert_eq!(result.mode, mode);
            result.resolved_text
        })
        .collect();
    assert!(texts.iter().all(|t| t == "Hi Ada"));
}

#[test]
fn test_parse_cache_reuses_identical_documents() {
    let parser = FlowParser::new();
    let first = parser.parse("A\n---\nB").unwrap();
    let second = parser.parse("A\n---\nB").unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    let third = parser.parse("A\n---\nC").unwrap();
    assert!(!Arc::ptr_eq(&first, &third));
}

#[test]
fn test_changed_document_restarts_indices_at_zero() {
    let parser = FlowParser::new();
    let doc = parser.parse("A\n---\nB").unwrap();
    assert_eq!(doc.blocks()[0].index, 0);

    let doc = parser.parse("X\n---\nA\n---\nB").unwrap();
    assert_eq!(doc.blocks()[0].index, 0);
    assert_eq!(doc.blocks().len(), 3);
}

#[test]
fn test_parsed_document_accessors() {
    let parser = FlowParser::new();
    let doc = parser.parse("Hi\n---\n?[%{{v}} A|B]").unwrap();
    assert_eq!(doc.source(), "Hi\n---\n?[%{{v}} A|B]");
    assert_eq!(doc.block_text(0), Some("Hi"));
    assert_eq!(doc.block_text(9), None);
    assert!(doc.interaction(0).is_none());
    assert_eq!(
        doc.interaction(1).unwrap().bound_variable.as_deref(),
        Some("v")
    );
}

#[test]
fn test_get_all_blocks() {
    let parser = FlowParser::new();
    let blocks = parser.get_all_blocks("A\n---\nB\n---\nC").unwrap();
    assert_eq!(blocks.len(), 3);
    assert_eq!(blocks[2].index, 2);
}

// ============================================================================
// Inline Pass Tests
// ============================================================================

#[test]
fn test_inline_content_pass() {
    let b = bindings(&[("name", "Ada")]);
    let result = inline::process_content("Hi {{name}} and %{{topic}}", &b);
    assert_eq!(result.resolved_text, "Hi Ada and %{{topic}}");
    assert_eq!(result.variables.len(), 2);
    assert!(result.interaction.is_none());
}

#[test]
fn test_inline_preserved_pass() {
    let result = inline::process_preserved("{{x}} as-is");
    assert_eq!(result.resolved_text, "{{x}} as-is");
    assert_eq!(result.variables, vec![("x".to_string(), VarKind::Replaceable)]);
}

#[test]
fn test_inline_interaction_pass() {
    let b = bindings(&[("user", "Ada")]);
    let result = inline::process_interaction("%{{name}}...Hi {{user}}", &b).unwrap();
    let spec = result.interaction.unwrap();
    assert_eq!(spec.fallback_prompt.as_deref(), Some("Hi Ada"));
    assert_eq!(
        result.variables,
        vec![
            ("name".to_string(), VarKind::Preserved),
            ("user".to_string(), VarKind::Replaceable),
        ]
    );
}

// ============================================================================
// End-to-End Document Tests
// ============================================================================

#[test]
fn test_full_conversational_document() {
    let input = "\
# Welcome, {{name}}!

Let's find your level.
---
?[%{{level}} Beginner|Intermediate|Expert|...Describe your experience]
---
===
The lesson plan below is fixed output for level %{{level}}.
===
---
Great choice. ?[Continue|Start over]";

    let parser = FlowParser::new();
    let doc = parser.parse(input).unwrap();

    let kinds: Vec<BlockKind> = doc.blocks().iter().map(|b| b.kind).collect();
    assert_eq!(
        kinds,
        vec![
            BlockKind::Content,
            BlockKind::Interaction,
            BlockKind::Preserved,
            BlockKind::Content,
            BlockKind::Interaction,
        ]
    );

    let b = bindings(&[("name", "Ada")]);
    let first = parser
        .process_block(input, 0, ProcessMode::Complete, &b, None)
        .unwrap();
    assert_eq!(
        first.resolved_text,
        "# Welcome, Ada!\n\nLet's find your level."
    );

    let spec = doc.interaction(1).unwrap();
    assert_eq!(spec.bound_variable.as_deref(), Some("level"));
    assert_eq!(spec.options.len(), 3);
    assert!(spec.accepts_free_text);

    let names: Vec<&str> = doc.variables().iter().map(|v| v.name.as_str()).collect();
    assert_eq!(names, vec!["level", "name"]);
}

#[test]
fn test_variable_values_are_not_rescanned() {
    // A bound value containing marker text is substituted literally.
    let b = bindings(&[("name", "{{inner}}")]);
    assert_eq!(variable::resolve("Hi {{name}}", &b), "Hi {{inner}}");
}
