//! Script syntax tree.
//!
//! The language has a single node shape: a named statement with string
//! arguments and, for blocks, children. Names are canonical (lowercased, with
//! aliases resolved) so the evaluator can match on them directly.

use std::fmt::Write as _;

/// Name of the synthetic root node.
pub const ROOT: &str = "script";

const ALIASES: &[(&str, &str)] = &[("define", "command"), ("include", "import"), ("line", "tick")];

/// Statements that open a block closed by `end`.
pub const BLOCKS: &[&str] = &["command", "if", "else", "while", "repeat"];

/// Lowercase a statement name and resolve aliases.
pub fn canonical_name(raw: &str) -> String {
    let lower = raw.to_lowercase();
    ALIASES
        .iter()
        .find(|(alias, _)| *alias == lower)
        .map(|(_, target)| target.to_string())
        .unwrap_or(lower)
}

/// A statement in the script tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Canonical statement name.
    pub name: String,
    /// Name as written in the source.
    pub raw_name: String,
    pub args: Vec<String>,
    pub children: Vec<Node>,
    /// 1-based source line.
    pub line: usize,
}

impl Node {
    pub fn new(raw_name: impl Into<String>, args: Vec<String>, line: usize) -> Self {
        let raw_name = raw_name.into();
        Self {
            name: canonical_name(&raw_name),
            raw_name,
            args,
            children: Vec::new(),
            line,
        }
    }

    pub fn root() -> Self {
        Self::new(ROOT, Vec::new(), 0)
    }

    /// Whether this statement opens a block.
    pub fn is_block(&self) -> bool {
        BLOCKS.contains(&self.name.as_str())
    }

    /// The label an `end` must carry to close this block (`else` closes as `if`).
    pub fn block_label(&self) -> &str {
        match self.name.as_str() {
            "else" => "if",
            name => name,
        }
    }

    /// First descendant with the given name, depth first.
    pub fn find_descendant(&self, name: &str) -> Option<&Node> {
        self.children.iter().find_map(|child| {
            if child.name == name {
                Some(child)
            } else {
                child.find_descendant(name)
            }
        })
    }

    /// Indented tree dump for debug logging.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        self.dump_into(&mut out, 0);
        out
    }

    fn dump_into(&self, out: &mut String, depth: usize) {
        let _ = writeln!(out, "{:indent$}{} {}", "", self.name, self.args.join(" "), indent = depth * 2);
        for child in &self.children {
            child.dump_into(out, depth + 1);
        }
    }
}
