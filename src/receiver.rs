//! Receiver interface: semantic actions and lifecycle hooks
//!
//! A receiver folds raw capture trees into semantic values. Instead of the
//! engine probing the receiver for capabilities on every attempt, the
//! compiler asks once per rule which action applies ([`Receiver::binding`])
//! and stores the resolved [`Binding`] on the compiled rule; the matcher then
//! dispatches directly.

use serde_json::Value;

/// Which action the compiler resolved for a rule. Probed exactly once, at
/// compile time, never per match attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Binding {
    /// No action: a successful match of the rule yields the no-data sentinel.
    #[default]
    None,
    /// The rule-specific action, [`Receiver::reduce`].
    Rule,
    /// The generic fallback action, [`Receiver::fallback`].
    Fallback,
}

/// The rule-invocation context passed to every action call: the matched
/// rule's name and the name of the rule whose body invoked it. Passing this
/// explicitly keeps the receiver free of back-pointers into the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleContext<'a> {
    /// Name of the rule whose action is being invoked.
    pub rule: &'a str,
    /// Name of the invoking rule; `None` at the top level.
    pub parent: Option<&'a str>,
}

/// Semantic-action callbacks and lifecycle hooks.
///
/// Actions return `Option<Value>`: `Some` becomes the rule's capture, `None`
/// is the no-data sentinel (the match succeeded but contributes nothing to
/// the enclosing capture).
pub trait Receiver {
    /// Which action applies to `rule`. The default binds nothing.
    fn binding(&self, _rule: &str) -> Binding {
        Binding::None
    }

    /// Called once before the top-level attempt begins.
    fn begin(&mut self) {}

    /// Called once with the root capture after a fully consumed match; the
    /// return value is the overall parse result.
    fn finish(&mut self, root: Value) -> Value {
        root
    }

    /// Rule-specific action; dispatch on `ctx.rule` as needed.
    fn reduce(&mut self, _ctx: &RuleContext, capture: Value) -> Option<Value> {
        Some(capture)
    }

    /// Generic fallback action for rules bound to [`Binding::Fallback`].
    fn fallback(&mut self, _ctx: &RuleContext, capture: Value) -> Option<Value> {
        Some(capture)
    }
}

/// A ready-made receiver that binds the fallback action to every rule and
/// passes captures through unchanged, so a parse yields the raw capture
/// tree. Used by the CLI and handy as a grammar-debugging default.
///
/// Rules that match without capturing anything (the capture is null) are
/// treated as no-data, so groupless helper rules stay out of the tree.
#[derive(Debug, Clone, Copy, Default)]
pub struct TreeReceiver;

impl Receiver for TreeReceiver {
    fn binding(&self, _rule: &str) -> Binding {
        Binding::Fallback
    }

    fn fallback(&mut self, _ctx: &RuleContext, capture: Value) -> Option<Value> {
        if capture.is_null() {
            None
        } else {
            Some(capture)
        }
    }
}
