//! Command-line interface for pegrex
//!
//! Usage:
//!   pegrex parse `<grammar>` `<input>` [--rule `<start>`] [--trace]  - Parse an input file
//!   pegrex check `<grammar>`                                     - Validate a grammar
//!
//! Grammars are rule trees in JSON or YAML (selected by file extension).
//! Parsing prints the capture tree as pretty JSON on success, or the failure
//! diagnostic on stderr with a nonzero exit code.

use std::path::Path;
use std::process;

use clap::{Arg, ArgAction, Command};

use pegrex::{Parser, RuleTree, Tracer, TreeReceiver};

fn main() {
    let matches = Command::new("pegrex")
        .version(env!("CARGO_PKG_VERSION"))
        .about("A PEG matching engine with regex terminals")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("parse")
                .about("Parse an input file with a grammar")
                .arg(
                    Arg::new("grammar")
                        .help("Path to the grammar rule tree (.json, .yaml or .yml)")
                        .required(true)
                        .index(1),
                )
                .arg(
                    Arg::new("input")
                        .help("Path to the input file to parse")
                        .required(true)
                        .index(2),
                )
                .arg(
                    Arg::new("rule")
                        .long("rule")
                        .short('r')
                        .help("Start rule (defaults to the grammar's designated top)"),
                )
                .arg(
                    Arg::new("trace")
                        .long("trace")
                        .action(ArgAction::SetTrue)
                        .help("Emit rule-attempt trace events on stderr"),
                ),
        )
        .subcommand(
            Command::new("check").about("Compile a grammar without parsing").arg(
                Arg::new("grammar")
                    .help("Path to the grammar rule tree")
                    .required(true)
                    .index(1),
            ),
        )
        .get_matches();

    match matches.subcommand() {
        Some(("parse", parse_matches)) => {
            let grammar = parse_matches.get_one::<String>("grammar").unwrap();
            let input = parse_matches.get_one::<String>("input").unwrap();
            let rule = parse_matches.get_one::<String>("rule");
            let trace = parse_matches.get_flag("trace");
            handle_parse_command(grammar, input, rule.map(String::as_str), trace);
        }
        Some(("check", check_matches)) => {
            let grammar = check_matches.get_one::<String>("grammar").unwrap();
            handle_check_command(grammar);
        }
        _ => unreachable!("subcommand is required"),
    }
}

/// Load a rule tree, selecting the deserializer by file extension.
fn load_grammar(path: &str) -> RuleTree {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("error: cannot read grammar '{}': {}", path, e);
            process::exit(2);
        }
    };
    let extension = Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("");
    let loaded = match extension {
        "yaml" | "yml" => RuleTree::from_yaml(&text),
        _ => RuleTree::from_json(&text),
    };
    match loaded {
        Ok(tree) => tree,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(2);
        }
    }
}

fn handle_parse_command(grammar_path: &str, input_path: &str, rule: Option<&str>, trace: bool) {
    let tree = load_grammar(grammar_path);
    let mut parser = Parser::new(tree, TreeReceiver);
    if trace {
        parser = parser.with_tracer(Tracer::new());
    }

    let input = Path::new(input_path);
    let result = match rule {
        Some(start) => parser.parse_rule(input, start),
        None => parser.parse(input),
    };

    match result {
        Ok(value) => match serde_json::to_string_pretty(&value) {
            Ok(rendered) => println!("{}", rendered),
            Err(e) => {
                eprintln!("error: cannot render result: {}", e);
                process::exit(2);
            }
        },
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    }
}

fn handle_check_command(grammar_path: &str) {
    let tree = load_grammar(grammar_path);
    let mut parser = Parser::new(tree, TreeReceiver);
    match parser.compile() {
        Ok(()) => println!("grammar ok"),
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    }
}
