//! Chart time measured in integer ticks.
//!
//! A 4/4 measure spans [`TICKS_PER_MEASURE`] ticks, the native resolution of
//! the KSH format. All timeline arithmetic is integral; conversion to
//! milliseconds only happens in the flattened export.

use std::fmt;
use std::ops::{Add, Sub};

/// Ticks in one 4/4 measure.
pub const TICKS_PER_MEASURE: u64 = 192;

/// Ticks per quarter note.
pub const TICKS_PER_BEAT: u64 = TICKS_PER_MEASURE / 4;

/// A position on the chart timeline.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Tick {
    ticks: u64,
}

impl Tick {
    /// The start of the chart.
    pub const ZERO: Tick = Tick { ticks: 0 };

    /// Create a `Tick` from a raw tick count.
    pub fn from_ticks(ticks: u64) -> Self {
        Self { ticks }
    }

    /// Create a `Tick` from a fraction of a whole measure (`1/4` is one beat).
    ///
    /// Returns `None` when the denominator is zero or the result is not a
    /// whole number of ticks.
    pub fn from_fraction(num: u64, den: u64) -> Option<Self> {
        let scaled = num.checked_mul(TICKS_PER_MEASURE)?;
        if den == 0 || scaled % den != 0 {
            return None;
        }
        Some(Self::from_ticks(scaled / den))
    }

    /// Return the raw tick count.
    pub fn ticks(self) -> u64 {
        self.ticks
    }

    /// `self + rhs`, or `None` past the end of the representable timeline.
    pub fn checked_add(self, rhs: Tick) -> Option<Tick> {
        self.ticks.checked_add(rhs.ticks).map(Self::from_ticks)
    }

    /// Milliseconds spanned by `ticks` at the given tempo.
    pub fn span_millis(ticks: u64, bpm: f64) -> f64 {
        ticks as f64 * 60_000.0 / (TICKS_PER_BEAT as f64 * bpm)
    }
}

/// Parse a `num/den` pair as written in `beat=3/4` or `{1/8}`.
pub fn parse_fraction(text: &str) -> Option<(u64, u64)> {
    let (num, den) = text.split_once('/')?;
    let num = num.trim().parse().ok()?;
    let den: u64 = den.trim().parse().ok()?;
    (den != 0).then_some((num, den))
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.ticks)
    }
}

impl Add for Tick {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            ticks: self.ticks.saturating_add(rhs.ticks),
        }
    }
}

impl Sub for Tick {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self {
            ticks: self.ticks.saturating_sub(rhs.ticks),
        }
    }
}
