//! Errors for script parsing and loading.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Structural errors found while parsing one script source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("line {line}: unbalanced brackets in `{text}`")]
    UnmatchedParens { line: usize, text: String },

    #[error("line {line}: `;` without a statement name")]
    MissingCommand { line: usize },

    #[error("line {line}: unknown statement `{text}`")]
    UnknownStatement { line: usize, text: String },

    #[error("line {line}: unmatched `end` ({detail})")]
    UnmatchedEnd { line: usize, detail: String },

    #[error("line {line}: `else` without an open `if`")]
    UnexpectedElse { line: usize },

    #[error("line {line}: `{kind}` block is never closed")]
    UnterminatedBlock { kind: String, line: usize },
}

impl ParseError {
    /// Source line the error points at.
    pub fn line(&self) -> usize {
        match self {
            Self::UnmatchedParens { line, .. }
            | Self::MissingCommand { line }
            | Self::UnknownStatement { line, .. }
            | Self::UnmatchedEnd { line, .. }
            | Self::UnexpectedElse { line }
            | Self::UnterminatedBlock { line, .. } => *line,
        }
    }
}

/// Errors in command definitions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionError {
    #[error("line {line}: `command` needs a name")]
    MissingName { line: usize },

    #[error("line {line}: `{name}` is reserved and cannot be redefined")]
    ReservedName { name: String, line: usize },

    #[error("line {line}: parameter `{param}` of `{command}` must start with `$`")]
    InvalidParameter {
        command: String,
        param: String,
        line: usize,
    },

    #[error("line {line}: `import` needs a path")]
    MissingImportPath { line: usize },

    #[error("line {line}: `{statement}` is only allowed at the top level")]
    NestedDefinition { statement: String, line: usize },
}

/// Failures while loading a script and its imports.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("{origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: ParseError,
    },

    #[error("{origin}: {source}")]
    Definition {
        origin: String,
        #[source]
        source: DefinitionError,
    },

    #[error("cannot read script {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("import cycle through {}", path.display())]
    ImportCycle { path: PathBuf },
}
