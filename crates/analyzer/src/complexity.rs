//! Branching-based complexity scores computed over tree-sitter subtrees.
//!
//! Both metrics share one branching construct set. Cyclomatic complexity is
//! flat: base 1 plus one per construct and per short-circuit operator.
//! Cognitive complexity weights each control-flow construct by its nesting
//! depth (`1 + depth`) while short-circuit operators always add a flat 1 and
//! never increase depth. Nested functions contribute to their own scores
//! only, never to the enclosing scope's.

use tree_sitter::Node;

const BRANCH_KINDS: &[&str] = &[
    "if_statement",
    "for_statement",
    "for_in_statement",
    "while_statement",
    "do_statement",
    "switch_case",
    "catch_clause",
    "ternary_expression",
];

const FUNCTION_KINDS: &[&str] = &[
    "function_declaration",
    "function_expression",
    "generator_function",
    "generator_function_declaration",
    "arrow_function",
    "method_definition",
];

pub fn is_function_like(kind: &str) -> bool {
    FUNCTION_KINDS.contains(&kind)
}

fn is_branch(kind: &str) -> bool {
    BRANCH_KINDS.contains(&kind)
}

fn is_short_circuit(node: Node, source: &[u8]) -> bool {
    node.kind() == "binary_expression"
        && node
            .child_by_field_name("operator")
            .and_then(|op| op.utf8_text(source).ok())
            .is_some_and(|op| op == "&&" || op == "||")
}

/// Cyclomatic complexity of one declaration's subtree. Base 1.
pub fn cyclomatic(node: Node, source: &[u8]) -> u32 {
    1 + cyclomatic_increments(node, source, true)
}

fn cyclomatic_increments(node: Node, source: &[u8], is_root: bool) -> u32 {
    if !is_root && is_function_like(node.kind()) {
        return 0;
    }
    let mut count = 0;
    if !is_root {
        if is_branch(node.kind()) {
            count += 1;
        }
        if is_short_circuit(node, source) {
            count += 1;
        }
    }
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        count += cyclomatic_increments(child, source, false);
    }
    count
}

/// Cognitive complexity of one declaration's subtree. Base 0.
pub fn cognitive(node: Node, source: &[u8]) -> u32 {
    cognitive_increments(node, source, 0, true)
}

fn cognitive_increments(node: Node, source: &[u8], depth: u32, is_root: bool) -> u32 {
    if !is_root && is_function_like(node.kind()) {
        return 0;
    }

    let mut count = 0;
    let mut child_depth = depth;
    if !is_root {
        if is_branch(node.kind()) {
            count += 1 + depth;
            child_depth += 1;
        } else if is_short_circuit(node, source) {
            count += 1;
        }
    }

    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        count += cognitive_increments(child, source, child_depth, false);
    }
    count
}
