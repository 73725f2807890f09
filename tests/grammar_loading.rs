//! Grammar loading from JSON and YAML
//!
//! The same rule tree expressed in both formats must compile and parse
//! identically, and malformed documents surface as grammar errors before
//! any matching happens.

use once_cell::sync::Lazy;
use pegrex::{ParseError, Parser, RuleTree, TreeReceiver};
use serde_json::json;

static JSON_GRAMMAR: Lazy<RuleTree> = Lazy::new(|| {
    RuleTree::from_json(
        r#"{
            "top": "pair",
            "rules": {
                "pair": {
                    "sequence": [
                        { "ref": "key" },
                        { "pattern": ":\\s*", "skip": true },
                        { "ref": "value" }
                    ]
                },
                "key": { "pattern": "([a-z]+)" },
                "value": {
                    "pattern": "([0-9])",
                    "min": 1,
                    "max": 0,
                    "separator": { "rule": { "pattern": "," }, "end_ok": false }
                },
                "version": "1"
            }
        }"#,
    )
    .expect("fixture grammar should deserialize")
});

static YAML_GRAMMAR: Lazy<RuleTree> = Lazy::new(|| {
    RuleTree::from_yaml(
        r#"
top: pair
rules:
  pair:
    sequence:
      - ref: key
      - pattern: ':\s*'
        skip: true
      - ref: value
  key:
    pattern: '([a-z]+)'
  value:
    pattern: '([0-9])'
    min: 1
    max: 0
    separator:
      rule:
        pattern: ','
      end_ok: false
  version: '1'
"#,
    )
    .expect("fixture grammar should deserialize")
});

#[test]
fn test_json_grammar_parses_end_to_end() {
    let mut parser = Parser::new(JSON_GRAMMAR.clone(), TreeReceiver);
    assert_eq!(
        parser.parse("port: 8,0").unwrap(),
        json!(["port", ["8", "0"]])
    );
}

#[test]
fn test_yaml_grammar_matches_the_json_form() {
    assert_eq!(*JSON_GRAMMAR, *YAML_GRAMMAR);
    let mut parser = Parser::new(YAML_GRAMMAR.clone(), TreeReceiver);
    assert_eq!(
        parser.parse("port: 8,0").unwrap(),
        json!(["port", ["8", "0"]])
    );
}

#[test]
fn test_literal_entries_become_constants() {
    let mut parser = Parser::new(JSON_GRAMMAR.clone(), TreeReceiver);
    parser.compile().unwrap();
    let grammar = parser.grammar().unwrap();
    assert_eq!(grammar.constants.get("version").map(String::as_str), Some("1"));
    assert!(!grammar.rules.contains_key("version"));
}

#[test]
fn test_top_constant_designates_the_start_rule() {
    let tree = RuleTree::from_json(
        r#"{
            "rules": {
                "top": "word",
                "word": { "pattern": "([a-z]+)" }
            }
        }"#,
    )
    .unwrap();
    let mut parser = Parser::new(tree, TreeReceiver);
    assert_eq!(parser.parse("abc").unwrap(), json!("abc"));
}

#[test]
fn test_malformed_json_is_a_grammar_error() {
    let err = RuleTree::from_json("{ not json").unwrap_err();
    assert!(matches!(err, ParseError::Grammar(ref msg) if msg.contains("JSON")));
}

#[test]
fn test_malformed_yaml_is_a_grammar_error() {
    let err = RuleTree::from_yaml(": not yaml {{").unwrap_err();
    assert!(matches!(err, ParseError::Grammar(ref msg) if msg.contains("YAML")));
}

#[test]
fn test_compile_rejects_bad_references_before_matching() {
    let tree = RuleTree::from_json(
        r#"{
            "top": "start",
            "rules": { "start": { "ref": "ghost" } }
        }"#,
    )
    .unwrap();
    let mut parser = Parser::new(tree, TreeReceiver);
    let err = parser.compile().unwrap_err();
    assert!(matches!(err, ParseError::Grammar(ref msg) if msg.contains("ghost")));
}
