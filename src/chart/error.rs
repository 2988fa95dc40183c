//! Errors raised while reading or reshaping a chart.

use thiserror::Error;

use super::tick::Tick;

/// Structural chart errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChartError {
    /// A measure's length cannot be split evenly between its lines.
    #[error("measure {measure}: length {length} cannot be split across {lines} line(s)")]
    MeasureGridMismatch {
        measure: usize,
        length: u64,
        lines: usize,
    },

    /// A `beat=` directive that does not describe a whole number of ticks.
    #[error("measure {measure}: invalid beat directive `{directive}`")]
    InvalidBeat { measure: usize, directive: String },

    /// No measure starts at or before the requested tick.
    #[error("no measure encloses tick {tick}")]
    NoEnclosingMeasure { tick: Tick },

    /// Subdivision could not produce a line at the requested tick.
    #[error("cannot place a line at tick {tick}")]
    UnresolvableTick { tick: Tick },
}
