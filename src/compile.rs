//! Grammar compiler: one-time transformation of a raw rule tree
//!
//! The pass runs once per parser instance and produces an immutable
//! [`CompiledGrammar`]:
//! 1. Node kind decided by a fixed priority scan over the raw kind fields
//!    (`ref`, `pattern`, `sequence`, `choice`, `error`, `code`)
//! 2. Quantifier and assertion defaults applied
//! 3. Sequence/choice children and separator nodes compiled recursively
//! 4. Terminal regexes compiled once, anchored to the start of the remaining
//!    buffer — matching never searches forward
//! 5. Receiver action bindings probed once per rule
//! 6. Every rule reference validated against the rule map, and a synthetic
//!    root node `Ref(start)` added as the driver's uniform entry point

use std::collections::HashMap;

use regex::Regex;

use crate::error::ParseError;
use crate::grammar::{
    CompiledGrammar, Expr, Node, Quantifier, RawNode, Rule, RuleEntry, RuleTree, Separator,
};
use crate::receiver::Receiver;

/// Compile `tree` with `start` as the designated start rule, resolving
/// action bindings against `receiver`.
pub fn compile<R: Receiver>(
    tree: &RuleTree,
    start: &str,
    receiver: &R,
) -> Result<CompiledGrammar, ParseError> {
    let mut rules = HashMap::new();
    let mut constants = HashMap::new();

    for (name, entry) in &tree.rules {
        match entry {
            RuleEntry::Literal(text) => {
                constants.insert(name.clone(), text.clone());
            }
            RuleEntry::Node(raw) => {
                let node = compile_node(raw)
                    .map_err(|e| ParseError::Grammar(format!("in rule '{}': {}", name, e)))?;
                let binding = receiver.binding(name);
                rules.insert(name.clone(), Rule { node, binding });
            }
        }
    }

    if !rules.contains_key(start) {
        return Err(ParseError::Grammar(format!(
            "start rule '{}' is not defined",
            start
        )));
    }

    for (name, rule) in &rules {
        validate_refs(&rule.node, &rules)
            .map_err(|e| ParseError::Grammar(format!("in rule '{}': {}", name, e)))?;
    }

    Ok(CompiledGrammar {
        rules,
        constants,
        start: start.to_string(),
        root: Node::entry_ref(start),
    })
}

/// Compile one raw node. Errors carry bare messages; the caller adds the
/// owning rule's name.
fn compile_node(raw: &RawNode) -> Result<Node, String> {
    // Fixed priority order; the first populated kind field wins.
    let expr = if let Some(name) = &raw.reference {
        Expr::Ref(name.clone())
    } else if let Some(source) = &raw.pattern {
        Expr::Pattern(compile_pattern(source)?)
    } else if let Some(children) = &raw.sequence {
        Expr::Sequence(compile_children(children)?)
    } else if let Some(children) = &raw.choice {
        Expr::Choice(compile_children(children)?)
    } else if let Some(message) = &raw.error {
        Expr::Error(message.clone())
    } else if let Some(body) = &raw.code {
        Expr::Code(body.clone())
    } else {
        return Err("node has no recognized kind field".to_string());
    };

    let separator = match &raw.separator {
        Some(sep) => Some(Separator {
            node: Box::new(compile_node(&sep.rule)?),
            end_ok: sep.end_ok,
        }),
        None => None,
    };

    Ok(Node {
        expr,
        quantifier: Quantifier::resolve(raw.min, raw.max),
        assertion: raw.assertion.unwrap_or_default(),
        skip: raw.skip,
        separator,
    })
}

fn compile_children(children: &[RawNode]) -> Result<Vec<Node>, String> {
    children.iter().map(compile_node).collect()
}

/// Compile a terminal source into an anchored matcher. The non-capturing
/// group keeps alternations in the source anchored as a whole, and the
/// anchor guarantees the matcher binds to the start of the remaining buffer
/// instead of searching forward.
fn compile_pattern(source: &str) -> Result<Regex, String> {
    Regex::new(&format!(r"\A(?:{})", source))
        .map_err(|e| format!("invalid pattern /{}/: {}", source, e))
}

/// Every `Ref` must name a defined rule; constants are not matchable.
fn validate_refs(node: &Node, rules: &HashMap<String, Rule>) -> Result<(), String> {
    match &node.expr {
        Expr::Ref(name) => {
            if !rules.contains_key(name) {
                return Err(format!("reference to undefined rule '{}'", name));
            }
        }
        Expr::Sequence(children) | Expr::Choice(children) => {
            for child in children {
                validate_refs(child, rules)?;
            }
        }
        Expr::Pattern(_) | Expr::Error(_) | Expr::Code(_) => {}
    }
    if let Some(sep) = &node.separator {
        validate_refs(&sep.node, rules)?;
    }
    Ok(())
}
