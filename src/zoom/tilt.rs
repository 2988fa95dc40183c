//! Symbolic tilt spans.
//!
//! `tilt=normal`, `tilt=keep_bigger` and friends select a preset instead of a
//! numeric angle. While such a span is active, numeric tilt keyframes are not
//! written; the symbol is.

use std::fmt;
use std::str::FromStr;

use crate::chart::Tick;

/// Preset tilt modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TiltSymbol {
    Normal,
    Bigger,
    Biggest,
    KeepNormal,
    KeepBigger,
    KeepBiggest,
    Zero,
    Big,
    Keep,
}

impl TiltSymbol {
    pub const ALL: [TiltSymbol; 9] = [
        TiltSymbol::Normal,
        TiltSymbol::Bigger,
        TiltSymbol::Biggest,
        TiltSymbol::KeepNormal,
        TiltSymbol::KeepBigger,
        TiltSymbol::KeepBiggest,
        TiltSymbol::Zero,
        TiltSymbol::Big,
        TiltSymbol::Keep,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Bigger => "bigger",
            Self::Biggest => "biggest",
            Self::KeepNormal => "keep_normal",
            Self::KeepBigger => "keep_bigger",
            Self::KeepBiggest => "keep_biggest",
            Self::Zero => "zero",
            Self::Big => "big",
            Self::Keep => "keep",
        }
    }
}

impl fmt::Display for TiltSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TiltSymbol {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, ()> {
        Self::ALL.into_iter().find(|t| t.as_str() == s).ok_or(())
    }
}

/// Start (`Some`) or end (`None`) of a symbolic span.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TiltMarker {
    pub tick: Tick,
    pub symbol: Option<TiltSymbol>,
}

/// Span boundaries in tick order.
///
/// Charts start in the implicit `normal` preset, so the timeline begins
/// inside a span without a marker.
#[derive(Debug, Clone, PartialEq)]
pub struct TiltSpans {
    markers: Vec<TiltMarker>,
    in_span: bool,
}

impl Default for TiltSpans {
    fn default() -> Self {
        Self {
            markers: Vec::new(),
            in_span: true,
        }
    }
}

impl TiltSpans {
    /// Record the tilt state of a chart line carrying tilt values.
    pub fn observe(&mut self, tick: Tick, symbol: Option<TiltSymbol>) {
        match symbol {
            Some(symbol) => {
                self.markers.push(TiltMarker {
                    tick,
                    symbol: Some(symbol),
                });
                self.in_span = true;
            }
            None if self.in_span => {
                self.markers.push(TiltMarker { tick, symbol: None });
                self.in_span = false;
            }
            None => {}
        }
    }

    pub fn markers(&self) -> &[TiltMarker] {
        &self.markers
    }

    /// Ticks where a span opens.
    pub fn openings(&self) -> impl Iterator<Item = (Tick, TiltSymbol)> + '_ {
        self.markers
            .iter()
            .filter_map(|m| m.symbol.map(|s| (m.tick, s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbols_round_trip_names() {
        for symbol in TiltSymbol::ALL {
            assert_eq!(symbol.as_str().parse(), Ok(symbol));
        }
        assert_eq!("5".parse::<TiltSymbol>(), Err(()));
    }

    #[test]
    fn numeric_values_close_the_open_span() {
        let mut spans = TiltSpans::default();
        spans.observe(Tick::from_ticks(0), None);
        spans.observe(Tick::from_ticks(48), None);
        spans.observe(Tick::from_ticks(96), Some(TiltSymbol::Bigger));
        spans.observe(Tick::from_ticks(144), None);

        assert_eq!(
            spans.markers(),
            &[
                TiltMarker { tick: Tick::from_ticks(0), symbol: None },
                TiltMarker { tick: Tick::from_ticks(96), symbol: Some(TiltSymbol::Bigger) },
                TiltMarker { tick: Tick::from_ticks(144), symbol: None },
            ]
        );
        let openings: Vec<_> = spans.openings().collect();
        assert_eq!(openings, vec![(Tick::from_ticks(96), TiltSymbol::Bigger)]);
    }
}
