//! Matcher engine: quantified attempts over compiled grammar nodes
//!
//! The engine is a small recursive state machine over shared parse state
//! (cursor, farthest-failure marker, buffer):
//! 1. Every node is evaluated through one quantified attempt loop that
//!    handles repetition bounds, capture accumulation, assertion semantics
//!    and cursor rollback
//! 2. Kind-specific primitives (sequence, choice, terminal, rule reference,
//!    directives) are each attempted once per loop iteration
//! 3. Nodes declaring a separator use the separator-aware repetition
//!    algorithm instead of the plain loop
//!
//! Backtracking failures are values ([`MatchOutcome::Fail`]), never errors;
//! `Err` unwinds only for a fatal error directive or a matched `code`
//! directive, and the top-level driver alone classifies the overall outcome.

use regex::Regex;
use serde_json::Value;

use crate::compile;
use crate::error::{Diagnostic, ErrorPolicy, ParseError};
use crate::grammar::{
    Assertion, CompiledGrammar, Expr, Node, Quantifier, RuleTree, Separator,
};
use crate::input::Input;
use crate::receiver::{Binding, Receiver, RuleContext};
use crate::trace::Tracer;

/// Result of one (quantified or single) attempt.
///
/// `NoData` is the "success but no data" sentinel: a rule reference with no
/// bound action, a skipped node, or an action declining to contribute. It
/// propagates without being concatenated as real content and is distinct
/// from `Data(vec![])`, an empty but real capture.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    Fail,
    NoData,
    Data(Vec<Value>),
}

/// Mutable parse state, exclusively owned by one in-progress parse.
#[derive(Debug)]
struct State {
    /// Cursor: current byte offset into the buffer, always on a character
    /// boundary and never past the end.
    position: usize,
    /// Farthest offset reached by any attempt, successful or not. Only used
    /// for diagnostics.
    farthest: usize,
    /// Full input text, materialized before matching starts.
    buffer: String,
}

impl State {
    fn new(buffer: String) -> Self {
        State {
            position: 0,
            farthest: 0,
            buffer,
        }
    }

    /// Move the cursor. The farthest marker only ever ratchets forward, so
    /// rollbacks keep it intact while every advance raises it.
    fn set_position(&mut self, position: usize) {
        self.position = position;
        if position > self.farthest {
            self.farthest = position;
        }
    }
}

/// The PEG parser: a rule tree, a receiver, and a one-time compiled grammar.
///
/// `parse` takes `&mut self`, so the type system enforces that parse state
/// is never shared between concurrent calls. One parser may run any number
/// of sequential parses; the grammar compiles on the first and is immutable
/// afterwards.
#[derive(Debug)]
pub struct Parser<R: Receiver> {
    tree: RuleTree,
    receiver: R,
    compiled: Option<CompiledGrammar>,
    policy: ErrorPolicy,
    tracer: Option<Tracer>,
    last_error: Option<Diagnostic>,
}

impl<R: Receiver> Parser<R> {
    pub fn new(tree: RuleTree, receiver: R) -> Self {
        Parser {
            tree,
            receiver,
            compiled: None,
            policy: ErrorPolicy::default(),
            tracer: None,
            last_error: None,
        }
    }

    /// Set the error-directive policy (default: [`ErrorPolicy::Fatal`]).
    pub fn with_policy(mut self, policy: ErrorPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Enable trace instrumentation.
    pub fn with_tracer(mut self, tracer: Tracer) -> Self {
        self.tracer = Some(tracer);
        self
    }

    pub fn receiver(&self) -> &R {
        &self.receiver
    }

    pub fn receiver_mut(&mut self) -> &mut R {
        &mut self.receiver
    }

    pub fn into_receiver(self) -> R {
        self.receiver
    }

    /// The most recent failure diagnostic, if any parse has failed (or an
    /// error directive fired under the reporting policy).
    pub fn last_error(&self) -> Option<&Diagnostic> {
        self.last_error.as_ref()
    }

    /// The compiled grammar, if compilation has run.
    pub fn grammar(&self) -> Option<&CompiledGrammar> {
        self.compiled.as_ref()
    }

    /// Compile the grammar now. Compilation runs exactly once per parser;
    /// calling this (or `parse`) again is a no-op.
    pub fn compile(&mut self) -> Result<(), ParseError> {
        self.ensure_compiled(None).map(|_| ())
    }

    /// Match the designated start rule against `input` and return the final
    /// semantic value.
    pub fn parse(&mut self, input: impl Into<Input>) -> Result<Value, ParseError> {
        self.parse_internal(input.into(), None)
    }

    /// Like `parse`, but starting from `start` instead of the designated top
    /// rule. Useful for recovery strategies that retry with another rule.
    pub fn parse_rule(&mut self, input: impl Into<Input>, start: &str) -> Result<Value, ParseError> {
        self.parse_internal(input.into(), Some(start))
    }

    /// Resolve the start rule and compile once. Returns the resolved start
    /// name so the driver can enter through an override as well.
    fn ensure_compiled(&mut self, start_override: Option<&str>) -> Result<String, ParseError> {
        let start = match start_override {
            Some(name) => name.to_string(),
            None => match self.tree.designated_top() {
                Some(name) => name.to_string(),
                None => return Err(ParseError::NoStartRule),
            },
        };
        if self.compiled.is_none() {
            self.compiled = Some(compile::compile(&self.tree, &start, &self.receiver)?);
        }
        Ok(start)
    }

    fn parse_internal(
        &mut self,
        input: Input,
        start_override: Option<&str>,
    ) -> Result<Value, ParseError> {
        let buffer = input.read()?;
        let start = self.ensure_compiled(start_override)?;
        let grammar = match self.compiled.as_ref() {
            Some(grammar) => grammar,
            None => return Err(ParseError::Grammar("grammar is not compiled".into())),
        };

        // Entry point: the synthetic root for the designated start, or a
        // transient reference node for a per-call override.
        let override_root;
        let root = if start == grammar.start {
            &grammar.root
        } else {
            if !grammar.rules.contains_key(&start) {
                return Err(ParseError::Grammar(format!(
                    "start rule '{}' is not defined",
                    start
                )));
            }
            override_root = Node::entry_ref(start.as_str());
            &override_root
        };

        let mut machine = Machine {
            grammar,
            receiver: &mut self.receiver,
            state: State::new(buffer),
            policy: self.policy,
            tracer: self.tracer.as_mut(),
            current: None,
            stored: None,
        };

        machine.receiver.begin();

        let outcome = match machine.attempt(root) {
            Ok(outcome) => outcome,
            Err(err) => {
                if let ParseError::Parse(diagnostic) = &err {
                    self.last_error = Some(diagnostic.clone());
                }
                return Err(err);
            }
        };

        let root_value = match outcome {
            MatchOutcome::NoData => Some(Value::Null),
            MatchOutcome::Data(values) => Some(values.into_iter().next().unwrap_or(Value::Null)),
            MatchOutcome::Fail => None,
        };

        let fully_consumed = machine.state.position >= machine.state.buffer.len();
        let root_value = match root_value {
            Some(value) if fully_consumed => value,
            matched => {
                let message = if matched.is_some() {
                    "document matched without consuming all input"
                } else {
                    "failed to match document"
                };
                let diagnostic = Diagnostic::at(
                    message,
                    &machine.state.buffer,
                    machine.state.farthest,
                    machine.state.position,
                );
                self.last_error = Some(diagnostic.clone());
                return Err(ParseError::Parse(diagnostic));
            }
        };

        let final_value = machine.receiver.finish(root_value);
        if let Some(diagnostic) = machine.stored.take() {
            self.last_error = Some(diagnostic);
        }
        Ok(final_value)
    }
}

/// One in-progress parse: compiled grammar, receiver, exclusive state.
struct Machine<'g, R: Receiver> {
    grammar: &'g CompiledGrammar,
    receiver: &'g mut R,
    state: State,
    policy: ErrorPolicy,
    tracer: Option<&'g mut Tracer>,
    /// Name of the rule whose body is currently being matched; becomes the
    /// `parent` of nested rule invocations.
    current: Option<&'g str>,
    /// Diagnostic recorded by an error directive under the reporting policy.
    stored: Option<Diagnostic>,
}

impl<'g, R: Receiver> Machine<'g, R> {
    /// The quantified attempt: evaluate `node` at the current cursor under
    /// its repetition bounds, assertion mode and skip flag.
    fn attempt(&mut self, node: &'g Node) -> Result<MatchOutcome, ParseError> {
        if let Some(separator) = &node.separator {
            return self.attempt_separated(node, separator);
        }

        // Rollback checkpoint: advances past each non-assertion success, so
        // a failed final iteration discards only its own consumption.
        let mut committed = self.state.position;
        let mut items: Vec<Value> = Vec::new();
        let mut count: u32 = 0;

        loop {
            match self.attempt_once(node)? {
                MatchOutcome::Fail => break,
                MatchOutcome::NoData => {}
                MatchOutcome::Data(values) => items.extend(values),
            }
            count += 1;
            if node.assertion == Assertion::None {
                committed = self.state.position;
            }
            if node.quantifier.max == 1 {
                break;
            }
        }

        let Quantifier { min, max } = node.quantifier;
        let mut matched = items;
        if max != 1 {
            // Repetition wraps the per-iteration captures as one additional
            // list level, and the cursor falls back to the last checkpoint.
            matched = vec![Value::Array(matched)];
            self.state.set_position(committed);
        }

        let within_bounds = count >= min && (max == 0 || count <= max);
        let result = within_bounds != (node.assertion == Assertion::Negative);

        // Assertions are zero-width: win or lose, the cursor never advances.
        if !result || node.assertion != Assertion::None {
            self.state.set_position(committed);
        }

        if !result {
            return Ok(MatchOutcome::Fail);
        }
        Ok(if node.skip {
            MatchOutcome::NoData
        } else {
            MatchOutcome::Data(matched)
        })
    }

    /// Separator-aware repetition: `X separated by Y`, with a policy on
    /// whether a trailing separator with no following item is permitted.
    fn attempt_separated(
        &mut self,
        node: &'g Node,
        separator: &'g Separator,
    ) -> Result<MatchOutcome, ParseError> {
        let mut checkpoint = self.state.position;
        let mut items: Vec<Value> = Vec::new();
        let mut count: u32 = 0;
        let mut scount: u32 = 0;

        loop {
            match self.attempt_once(node)? {
                MatchOutcome::Fail => break,
                MatchOutcome::NoData => {}
                MatchOutcome::Data(values) => items.extend(values),
            }
            // Checkpoint before the separator: if the loop ends on a matched
            // separator that trailing consumption may have to be undone.
            checkpoint = self.state.position;
            count += 1;

            match self.attempt(&separator.node)? {
                MatchOutcome::Fail => break,
                MatchOutcome::NoData => {}
                MatchOutcome::Data(values) => items.extend(values),
            }
            scount += 1;
        }

        let Quantifier { min, max } = node.quantifier;
        let mut matched = items;
        if max != 1 {
            matched = vec![Value::Array(matched)];
        }

        let result = count >= min && (max == 0 || count <= max);

        // Every repetition was followed by a separator: the final one is a
        // trailing separator, invalid unless explicitly allowed.
        if count == scount && !separator.end_ok {
            self.state.set_position(checkpoint);
        }

        if !result {
            return Ok(MatchOutcome::Fail);
        }
        Ok(if node.skip {
            MatchOutcome::NoData
        } else {
            MatchOutcome::Data(matched)
        })
    }

    /// Kind-specific single attempt, dispatched by exhaustive match on the
    /// compiled expression.
    fn attempt_once(&mut self, node: &'g Node) -> Result<MatchOutcome, ParseError> {
        match &node.expr {
            Expr::Ref(name) => self.attempt_ref(name, node),
            Expr::Pattern(regex) => Ok(self.attempt_pattern(regex)),
            Expr::Sequence(children) => self.attempt_sequence(children),
            Expr::Choice(children) => self.attempt_choice(children),
            Expr::Error(message) => self.error_directive(message),
            Expr::Code(_) => Err(ParseError::Grammar(
                "code directives are not executable".to_string(),
            )),
        }
    }

    /// Terminal: match the compiled anchored pattern at the cursor.
    fn attempt_pattern(&mut self, regex: &Regex) -> MatchOutcome {
        let start = self.state.position;
        let (consumed, mut values) = match regex.captures(&self.state.buffer[start..]) {
            Some(caps) => {
                let consumed = caps.get(0).map(|m| m.end()).unwrap_or(0);
                let values: Vec<Value> = caps
                    .iter()
                    .skip(1)
                    .map(|group| match group {
                        Some(m) => Value::String(m.as_str().to_string()),
                        None => Value::Null,
                    })
                    .collect();
                (consumed, values)
            }
            None => return MatchOutcome::Fail,
        };
        if values.len() > 1 {
            values = vec![Value::Array(values)];
        }
        self.state.set_position(start + consumed);
        MatchOutcome::Data(values)
    }

    /// Sequence: every child must match in order; fails atomically.
    fn attempt_sequence(&mut self, children: &'g [Node]) -> Result<MatchOutcome, ParseError> {
        let start = self.state.position;
        let mut set: Vec<Value> = Vec::new();
        let mut contributing = 0usize;

        for child in children {
            match self.attempt(child)? {
                MatchOutcome::Fail => {
                    self.state.set_position(start);
                    return Ok(MatchOutcome::Fail);
                }
                outcome => {
                    if child.assertion == Assertion::None && !child.skip {
                        if let MatchOutcome::Data(values) = outcome {
                            set.extend(values);
                        }
                        contributing += 1;
                    }
                }
            }
        }

        // Flatten to the single contributing child's value; wrap as a list
        // only when more than one child contributes.
        if contributing > 1 {
            set = vec![Value::Array(set)];
        }
        Ok(MatchOutcome::Data(set))
    }

    /// Ordered choice: first success wins, later siblings are never tried.
    fn attempt_choice(&mut self, children: &'g [Node]) -> Result<MatchOutcome, ParseError> {
        for child in children {
            match self.attempt(child)? {
                MatchOutcome::Fail => continue,
                outcome => return Ok(outcome),
            }
        }
        Ok(MatchOutcome::Fail)
    }

    /// Rule reference: attempt the referenced rule, then apply its resolved
    /// action binding to the capture.
    fn attempt_ref(&mut self, name: &'g str, site: &'g Node) -> Result<MatchOutcome, ParseError> {
        let grammar = self.grammar;
        let rule = match grammar.rules.get(name) {
            Some(rule) => rule,
            None => {
                return Err(ParseError::Grammar(format!(
                    "reference to undefined rule '{}'",
                    name
                )))
            }
        };

        // Lookahead attempts are noise; only trace real progress.
        let traced = self.tracer.is_some() && site.assertion == Assertion::None;
        if traced {
            let position = self.state.position;
            if let Some(tracer) = self.tracer.as_mut() {
                tracer.enter(name, &self.state.buffer[position..]);
            }
        }

        let parent = self.current;
        self.current = Some(name);
        let attempted = self.attempt(&rule.node);
        self.current = parent;

        let outcome = match attempted {
            Ok(outcome) => outcome,
            Err(err) => {
                if traced {
                    if let Some(tracer) = self.tracer.as_mut() {
                        tracer.exit(name, false);
                    }
                }
                return Err(err);
            }
        };

        if traced {
            if let Some(tracer) = self.tracer.as_mut() {
                tracer.exit(name, outcome != MatchOutcome::Fail);
            }
        }

        if outcome == MatchOutcome::Fail {
            return Ok(MatchOutcome::Fail);
        }

        match rule.binding {
            Binding::None => Ok(MatchOutcome::NoData),
            Binding::Rule | Binding::Fallback => {
                let capture = match outcome {
                    MatchOutcome::Data(values) => {
                        values.into_iter().next().unwrap_or(Value::Null)
                    }
                    _ => Value::Null,
                };
                let ctx = RuleContext { rule: name, parent };
                let reduced = if rule.binding == Binding::Rule {
                    self.receiver.reduce(&ctx, capture)
                } else {
                    self.receiver.fallback(&ctx, capture)
                };
                Ok(match reduced {
                    Some(value) => MatchOutcome::Data(vec![value]),
                    None => MatchOutcome::NoData,
                })
            }
        }
    }

    /// Error directive: fatal policy aborts the whole parse; reporting
    /// policy records the diagnostic and fails locally so enclosing choices
    /// can still try alternatives.
    fn error_directive(&mut self, message: &str) -> Result<MatchOutcome, ParseError> {
        let diagnostic = Diagnostic::at(
            message,
            &self.state.buffer,
            self.state.farthest,
            self.state.position,
        );
        match self.policy {
            ErrorPolicy::Fatal => Err(ParseError::Parse(diagnostic)),
            ErrorPolicy::Report => {
                self.stored = Some(diagnostic);
                Ok(MatchOutcome::Fail)
            }
        }
    }
}
