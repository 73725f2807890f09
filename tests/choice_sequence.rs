//! Ordered-choice commitment and sequence atomicity
//!
//! A choice commits to its first matching alternative for good; a sequence
//! either matches every child in order or restores the cursor to where it
//! started. Capture shapes follow the contribution rule: one contributing
//! child passes its value through, several are wrapped as a list.

use pegrex::{Parser, RawNode, RuleTree, TreeReceiver};
use serde_json::json;

fn parser_for(tree: RuleTree) -> Parser<TreeReceiver> {
    Parser::new(tree, TreeReceiver)
}

#[test]
fn test_choice_takes_the_first_matching_alternative() {
    let tree = RuleTree::new().with_top("start").rule(
        "start",
        RawNode::choice([RawNode::pattern("(x)"), RawNode::pattern("(ab)")]),
    );
    assert_eq!(parser_for(tree).parse("ab").unwrap(), json!("ab"));
}

#[test]
fn test_choice_never_retries_a_committed_alternative() {
    // The first alternative matches "a", so the choice commits to it even
    // though only the second could have consumed the whole input. The parse
    // then fails the full-consumption check on the leftover "b".
    let tree = RuleTree::new().with_top("start").rule(
        "start",
        RawNode::choice([RawNode::pattern("(a)"), RawNode::pattern("(ab)")]),
    );
    assert!(parser_for(tree).parse("ab").is_err());
}

#[test]
fn test_failed_sequence_restores_the_cursor() {
    // The first alternative consumes "a" before its second child fails; the
    // second alternative must start from the original cursor to match "ax".
    let tree = RuleTree::new().with_top("start").rule(
        "start",
        RawNode::choice([
            RawNode::sequence([RawNode::pattern("a"), RawNode::pattern("b")]),
            RawNode::pattern("(ax)"),
        ]),
    );
    assert_eq!(parser_for(tree).parse("ax").unwrap(), json!("ax"));
}

#[test]
fn test_sequence_requires_every_child() {
    let tree = RuleTree::new().with_top("start").rule(
        "start",
        RawNode::sequence([RawNode::pattern("(a)"), RawNode::pattern("(b)")]),
    );
    let mut parser = parser_for(tree);
    assert_eq!(parser.parse("ab").unwrap(), json!(["a", "b"]));
    assert!(parser.parse("a").is_err());
}

#[test]
fn test_single_contributing_child_passes_through_unwrapped() {
    let tree = RuleTree::new().with_top("start").rule(
        "start",
        RawNode::sequence([
            RawNode::pattern("(a)"),
            RawNode::pattern("b").skipped(),
        ]),
    );
    assert_eq!(parser_for(tree).parse("ab").unwrap(), json!("a"));
}

#[test]
fn test_groupless_terminal_contributes_no_values() {
    // A terminal without capture groups consumes input but adds nothing to
    // the capture list; it still counts as a contributing child, so the
    // sequence result stays a (shorter) list.
    let tree = RuleTree::new().with_top("start").rule(
        "start",
        RawNode::sequence([RawNode::pattern("a+"), RawNode::pattern("(b)")]),
    );
    assert_eq!(parser_for(tree).parse("aab").unwrap(), json!(["b"]));
}

#[test]
fn test_multi_group_terminal_captures_as_one_list() {
    let tree = RuleTree::new()
        .with_top("start")
        .rule("start", RawNode::pattern("([a-z]+)-([0-9]+)"));
    assert_eq!(
        parser_for(tree).parse("ab-12").unwrap(),
        json!(["ab", "12"])
    );
}

#[test]
fn test_unmatched_optional_group_captures_null() {
    let tree = RuleTree::new()
        .with_top("start")
        .rule("start", RawNode::pattern("([a-z]+)(!)?"));
    let mut parser = parser_for(tree);
    assert_eq!(parser.parse("hey!").unwrap(), json!(["hey", "!"]));
    assert_eq!(parser.parse("hey").unwrap(), json!(["hey", null]));
}

#[test]
fn test_nested_choice_inside_sequence() {
    let tree = RuleTree::new()
        .with_top("start")
        .rule(
            "start",
            RawNode::sequence([
                RawNode::reference("keyword"),
                RawNode::pattern(" ").skipped(),
                RawNode::pattern("([a-z]+)"),
            ]),
        )
        .rule(
            "keyword",
            RawNode::choice([RawNode::pattern("(let)"), RawNode::pattern("(const)")]),
        );
    let mut parser = parser_for(tree);
    assert_eq!(parser.parse("let foo").unwrap(), json!(["let", "foo"]));
    assert_eq!(parser.parse("const foo").unwrap(), json!(["const", "foo"]));
    assert!(parser.parse("var foo").is_err());
}
