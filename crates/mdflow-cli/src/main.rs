//! MarkdownFlow CLI - Parse, inspect, and process MarkdownFlow documents
//!
//! Usage:
//!   mfcli [OPTIONS] [COMMAND] <FILE>
//!
//! Commands:
//!   parse     Parse and display block structure (default)
//!   validate  Check document for structural errors
//!   vars      List the document's variables
//!   process   Resolve one block against bindings
//!   stats     Show document statistics

use std::env;
use std::fs;
use std::process;

use mdflow_core::{
    BlockKind, FlowParser, InteractionSpec, ParsedDocument, ProcessMode, Validation, VarKind,
};
use serde::Serialize;

fn main() {
    let args: Vec<String> = env::args().collect();

    match run(&args) {
        Ok(()) => {}
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    }
}

fn run(args: &[String]) -> Result<(), String> {
    let config = parse_args(args)?;

    let input = fs::read_to_string(&config.file)
        .map_err(|e| format!("failed to read '{}': {}", config.file, e))?;

    let parser = FlowParser::new();

    match config.command {
        Command::Parse => cmd_parse(&parser, &input, &config),
        Command::Validate => cmd_validate(&parser, &input, &config),
        Command::Vars => cmd_vars(&parser, &input, &config),
        Command::Process => cmd_process(&parser, &input, &config),
        Command::Stats => cmd_stats(&parser, &input),
    }
}

#[derive(Debug)]
struct Config {
    command: Command,
    file: String,
    format: OutputFormat,
    verbose: bool,
    /// Block index for `process`.
    index: usize,
    /// `name=value` bindings for `process`.
    bindings: Vec<(String, String)>,
    /// User input to validate against an interaction block.
    input: Option<String>,
}

#[derive(Debug, Clone, Copy)]
enum Command {
    Parse,
    Validate,
    Vars,
    Process,
    Stats,
}

#[derive(Debug, Clone, Copy)]
enum OutputFormat {
    Text,
    Json,
}

fn parse_args(args: &[String]) -> Result<Config, String> {
    let mut command = Command::Parse;
    let mut format = OutputFormat::Text;
    let mut verbose = false;
    let mut index = 0;
    let mut bindings = Vec::new();
    let mut input = None;
    let mut file = None;

    let mut i = 1;
    while i < args.len() {
        let arg = &args[i];
        match arg.as_str() {
            "-h" | "--help" => {
                print_help();
                process::exit(0);
            }
            "-V" | "--version" => {
                println!("mfcli {}", env!("CARGO_PKG_VERSION"));
                process::exit(0);
            }
            "-v" | "--verbose" => verbose = true,
            "-j" | "--json" => format = OutputFormat::Json,
            "-b" | "--block" => {
                i += 1;
                let value = args.get(i).ok_or("missing value for --block")?;
                index = value
                    .parse()
                    .map_err(|_| format!("invalid block index: {}", value))?;
            }
            "--var" => {
                i += 1;
                let value = args.get(i).ok_or("missing value for --var")?;
                let (name, val) = value
                    .split_once('=')
                    .ok_or_else(|| format!("expected name=value, got: {}", value))?;
                bindings.push((name.to_string(), val.to_string()));
            }
            "-i" | "--input" => {
                i += 1;
                let value = args.get(i).ok_or("missing value for --input")?;
                input = Some(value.clone());
            }
            "parse" => command = Command::Parse,
            "validate" => command = Command::Validate,
            "vars" => command = Command::Vars,
            "process" => command = Command::Process,
            "stats" => command = Command::Stats,
            _ if arg.starts_with('-') => {
                return Err(format!("unknown option: {}", arg));
            }
            _ => {
                if file.is_some() {
                    return Err("multiple files specified".to_string());
                }
                file = Some(arg.clone());
            }
        }
        i += 1;
    }

    let file = file.ok_or_else(|| "no input file specified".to_string())?;

    Ok(Config {
        command,
        file,
        format,
        verbose,
        index,
        bindings,
        input,
    })
}

fn print_help() {
    eprintln!(
        r#"mfcli - MarkdownFlow document parser and processor

USAGE:
    mfcli [OPTIONS] [COMMAND] <FILE>

COMMANDS:
    parse       Parse and display block structure (default)
    validate    Check document for structural errors
    vars        List the document's variables
    process     Resolve one block against bindings
    stats       Show document statistics

OPTIONS:
    -v, --verbose        Show spans and full interaction specifiers
    -j, --json           Output in JSON format
    -b, --block <N>      Block index for `process` (default 0)
        --var <K=V>      Variable binding for `process` (repeatable)
    -i, --input <TEXT>   User input to validate against an interaction
    -h, --help           Print help information
    -V, --version        Print version information

EXAMPLES:
    mfcli lesson.mdf                           Parse a MarkdownFlow file
    mfcli -j lesson.mdf                        Output blocks as JSON
    mfcli vars lesson.mdf                      List variables
    mfcli process -b 0 --var name=Ada lesson.mdf
    mfcli process -b 1 -i Expert lesson.mdf    Validate an answer
"#
    );
}

// =============================================================================
// Parse Command
// =============================================================================

fn cmd_parse(parser: &FlowParser, input: &str, config: &Config) -> Result<(), String> {
    let doc = parser.parse(input).map_err(|e| e.to_string())?;

    match config.format {
        OutputFormat::Json => print_json_document(&doc),
        OutputFormat::Text => print_document(&doc, config.verbose),
    }

    Ok(())
}

// =============================================================================
// Validate Command
// =============================================================================

fn cmd_validate(parser: &FlowParser, input: &str, config: &Config) -> Result<(), String> {
    match parser.parse(input) {
        Ok(doc) => {
            if matches!(config.format, OutputFormat::Json) {
                println!(
                    "{}",
                    serde_json::json!({"valid": true, "blocks": doc.blocks().len()})
                );
            } else {
                println!("Valid: {} block(s)", doc.blocks().len());
            }
            Ok(())
        }
        Err(e) => {
            if matches!(config.format, OutputFormat::Json) {
                println!(
                    "{}",
                    serde_json::json!({
                        "valid": false,
                        "error": e.message,
                        "span": e.span.map(|s| serde_json::json!({"start": s.start, "end": s.end})),
                    })
                );
            } else {
                eprintln!("Invalid: {}", e);
            }
            Err(e.to_string())
        }
    }
}

// =============================================================================
// Vars Command
// =============================================================================

fn cmd_vars(parser: &FlowParser, input: &str, config: &Config) -> Result<(), String> {
    let doc = parser.parse(input).map_err(|e| e.to_string())?;

    match config.format {
        OutputFormat::Json => {
            let vars: Vec<JsonVariable> = doc.variables().iter().map(JsonVariable::from).collect();
            println!("{}", serde_json::to_string_pretty(&vars).unwrap());
        }
        OutputFormat::Text => {
            println!("Variables: {}", doc.variables().len());
            for var in doc.variables() {
                let blocks: Vec<String> =
                    var.occurrences.iter().map(|i| i.to_string()).collect();
                println!(
                    "  {} ({}) in block(s) {}",
                    var.name,
                    var_kind_name(var.kind),
                    blocks.join(", ")
                );
            }
        }
    }

    Ok(())
}

// =============================================================================
// Process Command
// =============================================================================

fn cmd_process(parser: &FlowParser, input: &str, config: &Config) -> Result<(), String> {
    let bindings = config.bindings.iter().cloned().collect();

    let result = parser
        .process_block(
            input,
            config.index,
            ProcessMode::PromptOnly,
            &bindings,
            config.input.as_deref(),
        )
        .map_err(|e| e.to_string())?;

    match config.format {
        OutputFormat::Json => {
            let json = JsonProcessResult {
                block: config.index,
                kind: kind_name(result.block.kind),
                resolved_text: &result.resolved_text,
                interaction: result.interaction.as_ref().map(JsonInteraction::from),
                validation: result.validation.as_ref().map(|v| match v {
                    Validation::Valid(value) => {
                        serde_json::json!({"valid": true, "value": value})
                    }
                    Validation::Invalid(reason) => {
                        serde_json::json!({"valid": false, "reason": reason})
                    }
                }),
            };
            println!("{}", serde_json::to_string_pretty(&json).unwrap());
        }
        OutputFormat::Text => {
            println!("Block {} ({})", config.index, kind_name(result.block.kind));
            println!("{}", result.resolved_text);
            if let Some(spec) = &result.interaction {
                print_interaction(spec, 0);
            }
            match &result.validation {
                Some(Validation::Valid(value)) => println!("Input accepted: {}", value),
                Some(Validation::Invalid(reason)) => println!("Input rejected: {}", reason),
                None => {}
            }
        }
    }

    Ok(())
}

// =============================================================================
// Stats Command
// =============================================================================

fn cmd_stats(parser: &FlowParser, input: &str) -> Result<(), String> {
    let doc = parser.parse(input).map_err(|e| e.to_string())?;

    let mut content = 0;
    let mut interaction = 0;
    let mut preserved = 0;
    for block in doc.blocks() {
        match block.kind {
            BlockKind::Content => content += 1,
            BlockKind::Interaction => interaction += 1,
            BlockKind::Preserved => preserved += 1,
        }
    }

    let replaceable = doc
        .variables()
        .iter()
        .filter(|v| v.kind == VarKind::Replaceable)
        .count();

    println!("Document Statistics");
    println!("-------------------");
    println!("Blocks:");
    println!("  Total:          {}", doc.blocks().len());
    println!("  Content:        {}", content);
    println!("  Interaction:    {}", interaction);
    println!("  Preserved:      {}", preserved);
    println!();
    println!("Variables:");
    println!("  Total:          {}", doc.variables().len());
    println!("  Replaceable:    {}", replaceable);
    println!("  Preserved:      {}", doc.variables().len() - replaceable);
    println!();
    println!("Size:");
    println!("  Characters:     {}", input.len());
    println!("  Words (est.):   {}", input.split_whitespace().count());
    println!("  Lines:          {}", input.lines().count());

    Ok(())
}

// =============================================================================
// JSON Output
// =============================================================================

#[derive(Serialize)]
struct JsonDocument<'a> {
    blocks: Vec<JsonBlock<'a>>,
    variables: Vec<JsonVariable<'a>>,
}

#[derive(Serialize)]
struct JsonBlock<'a> {
    index: usize,
    kind: &'static str,
    span: JsonSpan,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    interaction: Option<JsonInteraction<'a>>,
}

#[derive(Serialize)]
struct JsonSpan {
    start: u32,
    end: u32,
}

#[derive(Serialize)]
struct JsonInteraction<'a> {
    variable: Option<&'a str>,
    options: Vec<JsonButton<'a>>,
    fallback_prompt: Option<&'a str>,
    accepts_free_text: bool,
}

#[derive(Serialize)]
struct JsonButton<'a> {
    display: &'a str,
    value: &'a str,
}

#[derive(Serialize)]
struct JsonVariable<'a> {
    name: &'a str,
    kind: &'static str,
    blocks: Vec<usize>,
}

#[derive(Serialize)]
struct JsonProcessResult<'a> {
    block: usize,
    kind: &'static str,
    resolved_text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    interaction: Option<JsonInteraction<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    validation: Option<serde_json::Value>,
}

impl<'a> From<&'a InteractionSpec> for JsonInteraction<'a> {
    fn from(spec: &'a InteractionSpec) -> Self {
        JsonInteraction {
            variable: spec.bound_variable.as_deref(),
            options: spec
                .options
                .iter()
                .map(|o| JsonButton {
                    display: &o.display,
                    value: &o.value,
                })
                .collect(),
            fallback_prompt: spec.fallback_prompt.as_deref(),
            accepts_free_text: spec.accepts_free_text,
        }
    }
}

impl<'a> From<&'a mdflow_core::Variable> for JsonVariable<'a> {
    fn from(var: &'a mdflow_core::Variable) -> Self {
        JsonVariable {
            name: &var.name,
            kind: var_kind_name(var.kind),
            blocks: var.occurrences.iter().copied().collect(),
        }
    }
}

fn print_json_document(doc: &ParsedDocument) {
    let json = JsonDocument {
        blocks: doc
            .blocks()
            .iter()
            .map(|block| JsonBlock {
                index: block.index,
                kind: kind_name(block.kind),
                span: JsonSpan {
                    start: block.span.start,
                    end: block.span.end,
                },
                text: block.raw_text(doc.source()),
                interaction: doc.interaction(block.index).map(JsonInteraction::from),
            })
            .collect(),
        variables: doc.variables().iter().map(JsonVariable::from).collect(),
    };
    println!("{}", serde_json::to_string_pretty(&json).unwrap());
}

// =============================================================================
// Text Output
// =============================================================================

fn print_document(doc: &ParsedDocument, verbose: bool) {
    println!("Blocks: {}", doc.blocks().len());

    for block in doc.blocks() {
        let text = block.raw_text(doc.source());
        println!(
            "  [{}] {}: {}",
            block.index,
            kind_name(block.kind),
            preview(text)
        );

        if verbose {
            println!("      span: {}..{}", block.span.start, block.span.end);
            if let Some(spec) = doc.interaction(block.index) {
                print_interaction(spec, 6);
            }
        }
    }
}

fn print_interaction(spec: &InteractionSpec, indent: usize) {
    let prefix = " ".repeat(indent);
    if let Some(name) = &spec.bound_variable {
        println!("{}binds: {}", prefix, name);
    }
    for option in &spec.options {
        if option.display == option.value {
            println!("{}option: {}", prefix, option.display);
        } else {
            println!("{}option: {} -> {}", prefix, option.display, option.value);
        }
    }
    if let Some(prompt) = &spec.fallback_prompt {
        println!("{}fallback: {}", prefix, prompt);
    }
}

fn preview(text: &str) -> String {
    let flat = text.replace('\n', "\\n");
    let truncated: String = flat.chars().take(60).collect();
    if flat.chars().count() > 60 {
        format!("{}...", truncated)
    } else {
        truncated
    }
}

fn kind_name(kind: BlockKind) -> &'static str {
    match kind {
        BlockKind::Content => "content",
        BlockKind::Interaction => "interaction",
        BlockKind::Preserved => "preserved",
    }
}

fn var_kind_name(kind: VarKind) -> &'static str {
    match kind {
        VarKind::Replaceable => "replaceable",
        VarKind::Preserved => "preserved",
    }
}
