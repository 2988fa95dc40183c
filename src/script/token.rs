//! Classified script source lines.

use crate::zoom::CurveName;

/// One non-blank script line after comment stripping.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceLine {
    pub kind: LineKind,
    /// 1-based line number in the source.
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LineKind {
    /// `;name args...`, already split into tokens (name first).
    Statement(Vec<String>),
    /// A lane row or `@`; advances the macro's line counter.
    Tick(String),
    /// `curve = values...`, shorthand for a curve-edit statement.
    CurveAssign { curve: CurveName, values: Vec<String> },
}
