//! Block parser for KLE scripts.
//!
//! Builds the tree with an explicit stack of open blocks. The top of the stack
//! is the insertion parent; a block is attached to its parent when it closes.

use super::ast::{canonical_name, Node};
use super::error::ParseError;
use super::token::{LineKind, SourceLine};

pub struct Parser {
    lines: Vec<SourceLine>,
}

impl Parser {
    pub fn new(lines: Vec<SourceLine>) -> Self {
        Self { lines }
    }

    pub fn parse(self) -> Result<Node, ParseError> {
        let mut stack = vec![Node::root()];

        for SourceLine { kind, line } in self.lines {
            let node = match kind {
                LineKind::Tick(text) => Node::new("tick", vec![text], line),
                LineKind::CurveAssign { curve, values } => Node::new(curve.as_str(), values, line),
                LineKind::Statement(mut tokens) => {
                    let name = tokens.remove(0);
                    Node::new(name, tokens, line)
                }
            };

            match node.name.as_str() {
                "end" => close_block(&mut stack, &node)?,
                "else" => {
                    let open_if = stack
                        .pop_if_kind(|top| top.name == "if" || top.name == "else")
                        .ok_or(ParseError::UnexpectedElse { line })?;
                    attach(&mut stack, open_if);
                    stack.push(node);
                }
                _ if node.is_block() => stack.push(node),
                _ => attach(&mut stack, node),
            }
        }

        if stack.len() > 1 {
            let open = &stack[stack.len() - 1];
            return Err(ParseError::UnterminatedBlock {
                kind: open.name.clone(),
                line: open.line,
            });
        }

        Ok(stack.pop().unwrap_or_else(Node::root))
    }
}

trait BlockStack {
    fn pop_if_kind(&mut self, pred: impl FnOnce(&Node) -> bool) -> Option<Node>;
}

impl BlockStack for Vec<Node> {
    /// Pop the innermost open block (never the root) if it matches.
    fn pop_if_kind(&mut self, pred: impl FnOnce(&Node) -> bool) -> Option<Node> {
        if self.len() > 1 && self.last().is_some_and(pred) {
            self.pop()
        } else {
            None
        }
    }
}

fn attach(stack: &mut [Node], node: Node) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
    }
}

fn close_block(stack: &mut Vec<Node>, end: &Node) -> Result<(), ParseError> {
    let label = end.args.first().map(|l| canonical_name(l));
    let block = stack
        .pop_if_kind(|_| true)
        .ok_or_else(|| ParseError::UnmatchedEnd {
            line: end.line,
            detail: "no open block".into(),
        })?;

    if let Some(label) = label {
        let expected = if label == "else" { "if" } else { label.as_str() };
        if expected != block.block_label() {
            return Err(ParseError::UnmatchedEnd {
                line: end.line,
                detail: format!(
                    "`end {label}` closes `{}` opened on line {}",
                    block.name, block.line
                ),
            });
        }
    }

    attach(stack, block);
    Ok(())
}
