//! Grammar model: raw rule trees and compiled nodes
//!
//! The grammar is data, not code. A [`RuleTree`] maps rule names to raw
//! nodes (or bare literal constants) and can be deserialized from JSON/YAML
//! or assembled with the builder API. The compiler turns raw nodes into
//! [`Node`]s whose kind is an explicit tagged union decided exactly once —
//! the matcher dispatches with an exhaustive `match`, never by probing
//! fields at runtime.

use std::collections::{BTreeMap, HashMap};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ParseError;
use crate::receiver::Binding;

/// A raw rule tree: named rule entries plus an optional designated top rule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleTree {
    /// Designated start rule, if any. `parse` falls back to a literal entry
    /// named `top`, then to a rule literally named `TOP`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top: Option<String>,
    /// Rule definitions, keyed by rule name.
    #[serde(default)]
    pub rules: BTreeMap<String, RuleEntry>,
}

impl RuleTree {
    pub fn new() -> Self {
        RuleTree::default()
    }

    /// Builder: set the designated top rule.
    pub fn with_top(mut self, name: impl Into<String>) -> Self {
        self.top = Some(name.into());
        self
    }

    /// Builder: add a rule definition.
    pub fn rule(mut self, name: impl Into<String>, node: RawNode) -> Self {
        self.rules.insert(name.into(), RuleEntry::Node(node));
        self
    }

    /// Builder: add a pre-resolved literal constant entry. Constants pass
    /// through compilation unchanged and are not matchable rules.
    pub fn constant(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.rules.insert(name.into(), RuleEntry::Literal(value.into()));
        self
    }

    /// Resolve the designated start rule, if one can be inferred.
    pub fn designated_top(&self) -> Option<&str> {
        if let Some(top) = &self.top {
            return Some(top);
        }
        if let Some(RuleEntry::Literal(name)) = self.rules.get("top") {
            return Some(name);
        }
        if self.rules.contains_key("TOP") {
            return Some("TOP");
        }
        None
    }

    /// Deserialize a rule tree from JSON text.
    pub fn from_json(text: &str) -> Result<Self, ParseError> {
        serde_json::from_str(text)
            .map_err(|e| ParseError::Grammar(format!("invalid grammar JSON: {}", e)))
    }

    /// Deserialize a rule tree from YAML text.
    pub fn from_yaml(text: &str) -> Result<Self, ParseError> {
        serde_yaml::from_str(text)
            .map_err(|e| ParseError::Grammar(format!("invalid grammar YAML: {}", e)))
    }
}

/// One entry of a rule tree: a rule node, or a bare literal constant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleEntry {
    /// Pre-resolved constant (metadata such as the top rule name); passes
    /// through compilation unchanged.
    Literal(String),
    /// An actual rule definition.
    Node(RawNode),
}

/// A raw grammar node as consumed from a rule tree.
///
/// Exactly one kind field should be populated; the compiler scans them in
/// the fixed priority order `ref`, `pattern`, `sequence`, `choice`, `error`,
/// `code` and rejects nodes where none is present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawNode {
    /// Invoke another named rule.
    #[serde(default, rename = "ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    /// Terminal: regex source, compiled into an anchored matcher.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// All children must match, in order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<Vec<RawNode>>,
    /// First child that matches wins; no retry after a later sibling fails.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choice: Option<Vec<RawNode>>,
    /// Unconditional failure with a grammar-authored message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Reserved extension point; recognized but not executable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Minimum repetitions. Defaults: `(1,1)` when neither bound is given;
    /// `min` alone implies unbounded `max`; `max` alone implies `min = 0`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<u32>,
    /// Maximum repetitions; `0` means unbounded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<u32>,
    /// Lookahead mode; defaults to [`Assertion::None`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assertion: Option<Assertion>,
    /// A successful match contributes no data to its parent's capture.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub skip: bool,
    /// Repetition uses the separator algorithm instead of the plain loop.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub separator: Option<Box<RawSeparator>>,
}

impl RawNode {
    /// A reference to another named rule.
    pub fn reference(name: impl Into<String>) -> Self {
        RawNode {
            reference: Some(name.into()),
            ..RawNode::default()
        }
    }

    /// A regex terminal.
    pub fn pattern(source: impl Into<String>) -> Self {
        RawNode {
            pattern: Some(source.into()),
            ..RawNode::default()
        }
    }

    /// An ordered sequence of children.
    pub fn sequence(children: impl IntoIterator<Item = RawNode>) -> Self {
        RawNode {
            sequence: Some(children.into_iter().collect()),
            ..RawNode::default()
        }
    }

    /// A PEG ordered choice of children.
    pub fn choice(children: impl IntoIterator<Item = RawNode>) -> Self {
        RawNode {
            choice: Some(children.into_iter().collect()),
            ..RawNode::default()
        }
    }

    /// An error directive with a grammar-authored message.
    pub fn error_directive(message: impl Into<String>) -> Self {
        RawNode {
            error: Some(message.into()),
            ..RawNode::default()
        }
    }

    /// A reserved `code` directive.
    pub fn code_directive(body: impl Into<String>) -> Self {
        RawNode {
            code: Some(body.into()),
            ..RawNode::default()
        }
    }

    pub fn with_min(mut self, min: u32) -> Self {
        self.min = Some(min);
        self
    }

    pub fn with_max(mut self, max: u32) -> Self {
        self.max = Some(max);
        self
    }

    pub fn assert_positive(mut self) -> Self {
        self.assertion = Some(Assertion::Positive);
        self
    }

    pub fn assert_negative(mut self) -> Self {
        self.assertion = Some(Assertion::Negative);
        self
    }

    pub fn skipped(mut self) -> Self {
        self.skip = true;
        self
    }

    pub fn with_separator(mut self, separator: RawNode, end_ok: bool) -> Self {
        self.separator = Some(Box::new(RawSeparator {
            rule: separator,
            end_ok,
        }));
        self
    }
}

/// Separator declaration on a raw node: the separator rule plus the policy
/// on whether a trailing separator with no following item is permitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSeparator {
    pub rule: RawNode,
    #[serde(default)]
    pub end_ok: bool,
}

/// Lookahead mode of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Assertion {
    /// Ordinary consuming match.
    #[default]
    None,
    /// Zero-width: succeed iff the node matches; never consume.
    Positive,
    /// Zero-width: succeed iff the node fails; never consume.
    Negative,
}

/// Repetition bounds. `max == 0` means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quantifier {
    pub min: u32,
    pub max: u32,
}

impl Quantifier {
    /// Exactly once; the default when a node declares no bounds.
    pub const ONCE: Quantifier = Quantifier { min: 1, max: 1 };

    /// Apply the defaulting rules to optional raw bounds.
    pub fn resolve(min: Option<u32>, max: Option<u32>) -> Self {
        match (min, max) {
            (None, None) => Quantifier::ONCE,
            (Some(min), None) => Quantifier { min, max: 0 },
            (None, Some(max)) => Quantifier { min: 0, max },
            (Some(min), Some(max)) => Quantifier { min, max },
        }
    }
}

/// A compiled grammar node. Read-only after compilation.
#[derive(Debug, Clone)]
pub struct Node {
    pub expr: Expr,
    pub quantifier: Quantifier,
    pub assertion: Assertion,
    pub skip: bool,
    pub separator: Option<Separator>,
}

impl Node {
    /// A bare once-quantified reference node; the compiler uses this for the
    /// synthetic root, and the driver for start-rule overrides.
    pub fn entry_ref(name: impl Into<String>) -> Self {
        Node {
            expr: Expr::Ref(name.into()),
            quantifier: Quantifier::ONCE,
            assertion: Assertion::None,
            skip: false,
            separator: None,
        }
    }
}

/// Compiled node kind: an explicit tagged union, one payload each.
#[derive(Debug, Clone)]
pub enum Expr {
    /// Invoke another named rule.
    Ref(String),
    /// Anchored terminal matcher, compiled once.
    Pattern(Regex),
    /// All children in order.
    Sequence(Vec<Node>),
    /// First matching child wins.
    Choice(Vec<Node>),
    /// Unconditional parse failure with this message.
    Error(String),
    /// Reserved extension point; the matcher fails loudly on it.
    Code(String),
}

/// Compiled separator: node plus trailing-separator policy.
#[derive(Debug, Clone)]
pub struct Separator {
    pub node: Box<Node>,
    pub end_ok: bool,
}

/// A compiled named rule with its resolved action binding.
#[derive(Debug, Clone)]
pub struct Rule {
    pub node: Node,
    pub binding: Binding,
}

/// The grammar after its one-time compile pass: immutable rule map, constant
/// entries passed through unchanged, the start rule name, and the synthetic
/// root node `Ref(start)` giving the driver a uniform entry point.
#[derive(Debug, Clone)]
pub struct CompiledGrammar {
    pub rules: HashMap<String, Rule>,
    pub constants: HashMap<String, String>,
    pub start: String,
    pub root: Node,
}
