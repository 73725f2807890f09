//! # pegrex
//!
//! A PEG (Parsing Expression Grammar) matching engine with regex terminals.
//!
//! A grammar is data, not code: a tree of named rules where every leaf is an
//! anchored regex, compiled exactly once, and every interior node is a
//! sequence, ordered choice, rule reference or directive. Matching is the
//! classic PEG recursive attempt/backtrack algorithm with greedy quantifiers,
//! zero-width lookahead assertions, separator-aware repetition and
//! farthest-failure diagnostics.
//!
//! ## Pipeline
//!
//! 1. **Load**: deserialize a rule tree from JSON/YAML, or build one with the
//!    [`RawNode`] builder API
//! 2. **Compile**: one-time pass resolving node kinds, quantifier defaults,
//!    receiver action bindings and compiled regex terminals
//! 3. **Match**: recursive quantified attempts over the compiled nodes,
//!    producing a capture tree
//! 4. **Reduce**: user-supplied [`Receiver`] actions fold captures into
//!    semantic values
//!
//! ## Example
//!
//! ```rust,ignore
//! use pegrex::{Parser, RawNode, RuleTree, TreeReceiver};
//!
//! let tree = RuleTree::new()
//!     .with_top("start")
//!     .rule(
//!         "start",
//!         RawNode::sequence([
//!             RawNode::reference("word"),
//!             RawNode::pattern(" ").skipped(),
//!             RawNode::reference("word"),
//!         ]),
//!     )
//!     .rule("word", RawNode::pattern("([a-z]+)"));
//!
//! let mut parser = Parser::new(tree, TreeReceiver);
//! let value = parser.parse("foo bar")?;
//! ```

pub mod compile;
pub mod error;
pub mod grammar;
pub mod input;
pub mod matcher;
pub mod receiver;
pub mod trace;

pub use error::{Diagnostic, ErrorPolicy, ParseError};
pub use grammar::{
    Assertion, CompiledGrammar, Expr, Node, Quantifier, RawNode, RawSeparator, Rule, RuleEntry,
    RuleTree, Separator,
};
pub use input::Input;
pub use matcher::{MatchOutcome, Parser};
pub use receiver::{Binding, Receiver, RuleContext, TreeReceiver};
pub use trace::Tracer;

/// Capture and semantic value currency for the whole engine.
pub use serde_json::Value;
