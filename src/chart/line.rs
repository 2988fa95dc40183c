//! Chart lines and lane-state helpers.
//!
//! A lane string looks like `1020|01|0o`: four BT lanes, two FX lanes and two
//! laser lanes, optionally followed by a spin or effect suffix.

use super::tick::Tick;

/// Character columns of the four BT lanes.
pub const BT_COLUMNS: [usize; 4] = [0, 1, 2, 3];
/// Character columns of the two FX lanes.
pub const FX_COLUMNS: [usize; 2] = [5, 6];
/// Character columns of the two laser lanes.
pub const LASER_COLUMNS: [usize; 2] = [8, 9];

const LANE_WIDTH: usize = 10;

/// Stable handle of a line in the chart's line arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LineId(pub(crate) usize);

/// One row of the chart grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    tick: Tick,
    measure: usize,
    /// Raw lane state, e.g. `0000|00|--`.
    pub lanes: String,
    /// Annotations written above the lane string, in order.
    pub annotations: Vec<String>,
}

impl Line {
    pub(crate) fn new(tick: Tick, measure: usize, lanes: String, annotations: Vec<String>) -> Self {
        Self {
            tick,
            measure,
            lanes,
            annotations,
        }
    }

    /// Absolute tick of this line.
    pub fn tick(&self) -> Tick {
        self.tick
    }

    /// Index of the measure owning this line.
    pub fn measure_index(&self) -> usize {
        self.measure
    }

    /// Lane characters (without the suffix), padded with `-` when short.
    pub fn lane_chars(&self) -> [char; LANE_WIDTH] {
        let mut chars = ['-'; LANE_WIDTH];
        for (slot, c) in chars.iter_mut().zip(self.lanes.chars()) {
            *slot = c;
        }
        chars
    }

    /// Values of all `key=value` annotations for the given key, in order.
    pub fn modifier_values<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.annotations
            .iter()
            .filter_map(move |a| a.strip_prefix(key).and_then(|rest| rest.strip_prefix('=')))
    }

    /// Remove every `key=...` annotation.
    pub fn remove_modifier(&mut self, key: &str) {
        self.annotations
            .retain(|a| !a.strip_prefix(key).is_some_and(|rest| rest.starts_with('=')));
    }

    /// Append a `key=value` annotation.
    pub fn push_modifier(&mut self, key: &str, value: impl std::fmt::Display) {
        self.annotations.push(format!("{key}={value}"));
    }
}

/// Whether a chart line is a lane row (`DDDD|DD|xx...`).
pub fn is_lane_line(text: &str) -> bool {
    let chars: Vec<char> = text.chars().take(LANE_WIDTH).collect();
    chars.len() == LANE_WIDTH
        && chars[..4].iter().all(|c| c.is_ascii_digit())
        && chars[4] == '|'
        && chars[5..7].iter().all(|c| c.is_ascii_digit())
        && chars[7] == '|'
}

/// Lane state for a line synthesized between `prev` and `next`.
///
/// Chips are not duplicated, holds running through `prev` keep going, and a
/// laser continues only when it is active on both sides. The suffix is
/// dropped.
pub fn interpolate_lanes(prev: &str, next: Option<&str>) -> String {
    let prev: Vec<char> = prev.chars().collect();
    let next: Option<Vec<char>> = next
        .filter(|n| is_lane_line(n))
        .map(|n| n.chars().collect());
    let lane = |column: usize| prev.get(column).copied().unwrap_or('0');

    let mut out = String::with_capacity(LANE_WIDTH);
    for column in BT_COLUMNS {
        out.push(if lane(column) == '2' { '2' } else { '0' });
    }
    out.push('|');
    for column in FX_COLUMNS {
        out.push(if lane(column) == '1' { '1' } else { '0' });
    }
    out.push('|');
    for column in LASER_COLUMNS {
        let before = prev.get(column).is_some_and(|&c| c != '-');
        let after = next
            .as_ref()
            .and_then(|n| n.get(column))
            .is_some_and(|&c| c != '-');
        out.push(if before && after { ':' } else { '-' });
    }
    out
}
