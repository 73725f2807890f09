//! Trace instrumentation for rule-reference attempts
//!
//! Optional structured debug log: `try_<rule>` on entry with a snippet of
//! the upcoming input, `got_<rule>` / `not_<rule>` on exit, indented by call
//! depth. The matcher suppresses events for references made under a
//! lookahead assertion, since their outcome is not real progress.

use std::io::{self, Write};

/// How much upcoming input to show next to each entry event.
const SNIPPET_LIMIT: usize = 30;

/// Sink for rule-attempt trace events. Defaults to stderr; any `io::Write`
/// can be substituted so tests can capture the log.
pub struct Tracer {
    out: Box<dyn Write>,
    depth: usize,
}

impl Tracer {
    /// A tracer writing to stderr.
    pub fn new() -> Self {
        Tracer::with_writer(Box::new(io::stderr()))
    }

    /// A tracer writing to an arbitrary sink.
    pub fn with_writer(out: Box<dyn Write>) -> Self {
        Tracer { out, depth: 0 }
    }

    /// Entry event: about to attempt `rule` with `upcoming` input ahead.
    pub fn enter(&mut self, rule: &str, upcoming: &str) {
        let event = format!("try_{}", rule);
        let indent = " ".repeat(self.depth);
        let _ = writeln!(
            self.out,
            "{}{:<30} >{}<",
            indent,
            event,
            snippet(upcoming)
        );
        self.depth += 1;
    }

    /// Exit event: the attempt of `rule` succeeded or failed.
    pub fn exit(&mut self, rule: &str, matched: bool) {
        self.depth = self.depth.saturating_sub(1);
        let tag = if matched { "got" } else { "not" };
        let indent = " ".repeat(self.depth);
        let _ = writeln!(self.out, "{}{}_{}", indent, tag, rule);
    }
}

impl Default for Tracer {
    fn default() -> Self {
        Tracer::new()
    }
}

impl std::fmt::Debug for Tracer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tracer").field("depth", &self.depth).finish()
    }
}

/// Truncated, newline-escaped view of the upcoming input.
fn snippet(upcoming: &str) -> String {
    let mut text: String = upcoming.chars().take(SNIPPET_LIMIT).collect();
    if upcoming.chars().count() > SNIPPET_LIMIT {
        text.push_str("...");
    }
    text.replace('\n', "\\n")
}
