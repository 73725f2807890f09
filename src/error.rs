//! Error taxonomy and failure diagnostics
//!
//! Two tiers, kept strictly apart:
//! - Backtracking inside the matcher is ordinary control flow
//!   ([`MatchOutcome::Fail`](crate::MatchOutcome)) and never surfaces here.
//! - Only the single top-level outcome of a parse, a malformed grammar, or a
//!   fatal error directive becomes a [`ParseError`].
//!
//! A [`Diagnostic`] pins a failure to the farthest position any attempt
//! reached, not the rolled-back cursor, and renders a single-line context
//! window with a caret under the failure point.

use std::fmt;

/// How the engine reacts when an `error` directive fires during matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Abort the whole parse immediately with the directive's diagnostic.
    #[default]
    Fatal,
    /// Record the diagnostic and fail the directive locally, so enclosing
    /// choices can still try other alternatives. The recorded diagnostic is
    /// retrievable via [`Parser::last_error`](crate::Parser::last_error).
    Report,
}

/// Errors produced by grammar compilation and parsing.
#[derive(Debug, Clone)]
pub enum ParseError {
    /// The grammar is malformed: a node with no recognized kind field, an
    /// invalid regex terminal, a reference to an undefined rule, or a `code`
    /// directive reached by the matcher.
    Grammar(String),
    /// No start rule was designated and none could be inferred.
    NoStartRule,
    /// The input provider failed to produce a buffer.
    Io(String),
    /// The start rule failed to match, matched without consuming the whole
    /// input, or an error directive fired under the fatal policy.
    Parse(Diagnostic),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Grammar(msg) => write!(f, "grammar error: {}", msg),
            ParseError::NoStartRule => write!(f, "no start rule designated for parse"),
            ParseError::Io(msg) => write!(f, "input error: {}", msg),
            ParseError::Parse(diagnostic) => diagnostic.fmt(f),
        }
    }
}

impl std::error::Error for ParseError {}

/// Width of the context window shown on each side of the failure point.
const CONTEXT_WINDOW: usize = 50;

/// A structured parse-failure report anchored at the farthest position any
/// attempt reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// The failure message (engine-generated or grammar-authored).
    pub message: String,
    /// 1-based line number of the failure point.
    pub line: usize,
    /// 1-based column within that line.
    pub column: usize,
    /// Single-line context window around the failure point; text after the
    /// failure has embedded newlines escaped as `\n`.
    pub context: String,
    /// Caret offset in characters from the start of `context`.
    pub marker: usize,
    /// Farthest byte offset reached by any attempt.
    pub position: usize,
    /// The (possibly smaller) rolled-back cursor offset at failure time.
    pub cursor: usize,
}

impl Diagnostic {
    /// Build a diagnostic for `buffer` anchored at the `farthest` offset.
    ///
    /// `cursor` is the current (post-rollback) cursor, reported alongside the
    /// farthest offset for reference. Both offsets are byte offsets and are
    /// expected to lie on character boundaries, which the matcher guarantees
    /// since the cursor only ever advances by whole regex matches.
    pub fn at(message: impl Into<String>, buffer: &str, farthest: usize, cursor: usize) -> Self {
        let at = farthest.min(buffer.len());
        let before = &buffer[..at];

        let line = before.matches('\n').count() + 1;
        let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
        let column = before[line_start..].chars().count() + 1;

        // Context window: up to CONTEXT_WINDOW chars of the current line
        // before the failure, and up to CONTEXT_WINDOW chars after it with
        // newlines escaped so the window stays on one display line.
        let pretext = tail_chars(&before[line_start..], CONTEXT_WINDOW);
        let posttext: String = buffer[at..]
            .chars()
            .take(CONTEXT_WINDOW)
            .collect::<String>()
            .replace('\n', "\\n");
        let marker = pretext.chars().count();

        Diagnostic {
            message: message.into(),
            line,
            column,
            context: format!("{}{}", pretext, posttext),
            marker,
            position: farthest,
            cursor,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "failed to parse document:")?;
        writeln!(f, "  msg:      {}", self.message)?;
        writeln!(f, "  line:     {}", self.line)?;
        writeln!(f, "  column:   {}", self.column)?;
        writeln!(f, "  context:  {}", self.context)?;
        // The caret line mirrors the "  context:  " prefix width so the caret
        // lands directly under the failure point.
        writeln!(f, "  {}^", " ".repeat(self.marker + 10))?;
        write!(
            f,
            "  position: {} ({} pre-lookahead)",
            self.position, self.cursor
        )
    }
}

/// Last `limit` characters of `text`, preserving character boundaries.
fn tail_chars(text: &str, limit: usize) -> &str {
    let count = text.chars().count();
    if count <= limit {
        return text;
    }
    let skip = count - limit;
    match text.char_indices().nth(skip) {
        Some((offset, _)) => &text[offset..],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_and_column_on_first_line() {
        let diag = Diagnostic::at("boom", "hello world", 6, 6);
        assert_eq!(diag.line, 1);
        assert_eq!(diag.column, 7);
        assert_eq!(diag.context, "hello world");
        assert_eq!(diag.marker, 6);
    }

    #[test]
    fn test_line_and_column_after_newlines() {
        let buffer = "one\ntwo\nthree";
        // Failure at the 'h' of "three" (offset 9).
        let diag = Diagnostic::at("boom", buffer, 9, 9);
        assert_eq!(diag.line, 3);
        assert_eq!(diag.column, 2);
        assert_eq!(diag.context, "three");
        assert_eq!(diag.marker, 1);
    }

    #[test]
    fn test_failure_at_start_of_buffer() {
        let diag = Diagnostic::at("boom", "abc", 0, 0);
        assert_eq!(diag.line, 1);
        assert_eq!(diag.column, 1);
        assert_eq!(diag.marker, 0);
    }

    #[test]
    fn test_context_escapes_following_newlines() {
        let diag = Diagnostic::at("boom", "ab\ncd", 1, 1);
        assert_eq!(diag.context, "ab\\ncd");
    }

    #[test]
    fn test_context_window_is_bounded() {
        let long = "x".repeat(200);
        let diag = Diagnostic::at("boom", &long, 100, 100);
        assert_eq!(diag.context.chars().count(), 100);
        assert_eq!(diag.marker, 50);
    }

    #[test]
    fn test_caret_alignment_in_rendered_output() {
        let diag = Diagnostic::at("boom", "foo  bar", 4, 4);
        let rendered = diag.to_string();
        let lines: Vec<&str> = rendered.lines().collect();
        let context_line = lines.iter().find(|l| l.contains("context:")).unwrap();
        let caret_line = lines.iter().find(|l| l.trim_end().ends_with('^')).unwrap();
        let context_col = context_line.find("foo").unwrap();
        let caret_col = caret_line.find('^').unwrap();
        assert_eq!(caret_col, context_col + 4);
    }

    #[test]
    fn test_multibyte_pretext_is_boundary_safe() {
        let buffer = "é".repeat(80);
        let at = "é".len() * 60;
        let diag = Diagnostic::at("boom", &buffer, at, at);
        assert_eq!(diag.marker, 50);
        assert_eq!(diag.line, 1);
        assert_eq!(diag.column, 61);
    }
}
