//! Line lexer for KLE scripts.
//!
//! Scripts are line oriented: every non-blank line is either a `;` statement,
//! a tick marker (`@` or a chart lane row), or a curve assignment.

use super::error::ParseError;
use super::token::{LineKind, SourceLine};
use crate::chart::line::is_lane_line;
use crate::zoom::CurveName;

pub struct Lexer<'a> {
    source: &'a str,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self { source }
    }

    pub fn tokenize(&self) -> Result<Vec<SourceLine>, ParseError> {
        let mut lines = Vec::new();
        for (index, raw) in self.source.lines().enumerate() {
            let line = index + 1;
            let text = normalize_line(raw);
            if text.is_empty() {
                continue;
            }
            let kind = classify(&text, line)?;
            lines.push(SourceLine { kind, line });
        }
        Ok(lines)
    }
}

fn classify(text: &str, line: usize) -> Result<LineKind, ParseError> {
    if let Some(statement) = text.strip_prefix(';') {
        let tokens = split_balanced(statement.trim()).ok_or_else(|| ParseError::UnmatchedParens {
            line,
            text: text.to_string(),
        })?;
        if tokens.is_empty() {
            return Err(ParseError::MissingCommand { line });
        }
        return Ok(LineKind::Statement(tokens));
    }

    if text == "@" || is_lane_line(text) {
        return Ok(LineKind::Tick(text.to_string()));
    }

    if let Some((name, rhs)) = text.split_once('=') {
        if let Ok(curve) = name.trim().parse::<CurveName>() {
            let values = split_balanced(rhs.trim()).ok_or_else(|| ParseError::UnmatchedParens {
                line,
                text: text.to_string(),
            })?;
            return Ok(LineKind::CurveAssign { curve, values });
        }
    }

    Err(ParseError::UnknownStatement {
        line,
        text: text.to_string(),
    })
}

/// Collapse whitespace, drop `//` and `#` comments and trim.
pub fn normalize_line(raw: &str) -> String {
    let code = match (raw.find("//"), raw.find('#')) {
        (Some(a), Some(b)) => &raw[..a.min(b)],
        (Some(a), None) => &raw[..a],
        (None, Some(b)) => &raw[..b],
        (None, None) => raw,
    };
    code.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split on spaces outside `()`, `{}` and `[]` groups.
///
/// Returns `None` when the brackets do not balance.
pub fn split_balanced(text: &str) -> Option<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut open: Vec<char> = Vec::new();

    for c in text.chars() {
        match c {
            '(' => open.push(')'),
            '{' => open.push('}'),
            '[' => open.push(']'),
            ')' | '}' | ']' => {
                if open.pop() != Some(c) {
                    return None;
                }
            }
            c if c.is_whitespace() && open.is_empty() => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
                continue;
            }
            _ => {}
        }
        current.push(c);
    }

    if !open.is_empty() {
        return None;
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    Some(tokens)
}
