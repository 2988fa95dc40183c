//! Runtime errors raised while running script commands.

use thiserror::Error;

use crate::zoom::CurveError;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("invalid expression `{expr}`: {reason}")]
    InvalidExpression { expr: String, reason: String },

    #[error("line {line}: condition `{guard}` is not a number or boolean")]
    InvalidGuard { guard: String, line: usize },

    #[error("line {line}: `set` takes a `$variable` and one value")]
    InvalidSet { line: usize },

    #[error("line {line}: invalid repeat count `{text}`")]
    InvalidRepeat { text: String, line: usize },

    #[error("line {line}: repeat total {total} is not a multiple of {chunk}")]
    IndivisibleRepeat { chunk: u64, total: u64, line: usize },

    #[error("line {line}: loop exceeded {limit} iterations")]
    IterationLimitExceeded { limit: u64, line: usize },

    #[error("line {line}: `{name}` is not allowed here")]
    UnexpectedNode { name: String, line: usize },

    #[error("line {line}: `call` needs a command name")]
    MissingCallTarget { line: usize },

    #[error("missing value for parameter `{param}`")]
    MissingArgument { param: String },

    #[error("effect length `{value}` is not a non-negative number")]
    InvalidEffectLength { value: String },

    #[error("effect length {length} cannot be split across {lines} line(s)")]
    LengthLineCountMismatch { length: String, lines: usize },

    #[error("unknown command `{name}`")]
    UnknownCommand { name: String },

    #[error("{message}")]
    UserError { message: String },

    #[error(transparent)]
    Curve(#[from] CurveError),
}
