//! KSH chart timeline model.
//!
//! A [`Chart`] keeps every line of the source file in an arena and indexes it
//! by absolute [`Tick`]. Lines are only ever added: [`Chart::ensure_line`]
//! refines a measure's grid so a tick can carry annotations, and
//! serialization reproduces the original layout around the new lines.

pub mod error;
pub mod export;
pub mod line;
pub mod measure;
pub mod tick;

use std::collections::BTreeMap;
use std::fmt;

use gcd::Gcd;

pub use error::ChartError;
pub use line::{Line, LineId};
pub use measure::Measure;
pub use tick::{Tick, TICKS_PER_MEASURE};

use line::interpolate_lanes;
use measure::RawMeasure;

const BOM: char = '\u{feff}';
const SEPARATOR: &str = "--";

/// A parsed chart.
#[derive(Debug, Clone, PartialEq)]
pub struct Chart {
    bom: bool,
    header: Vec<String>,
    separated: bool,
    measures: Vec<Measure>,
    lines: Vec<Line>,
    index: BTreeMap<Tick, LineId>,
    trailer: Vec<String>,
    tail: Vec<String>,
}

impl Chart {
    /// Parse chart text.
    pub fn parse(source: &str) -> Result<Self, ChartError> {
        let (bom, body) = match source.strip_prefix(BOM) {
            Some(rest) => (true, rest),
            None => (false, source),
        };

        let mut chart = Self {
            bom,
            header: Vec::new(),
            separated: false,
            measures: Vec::new(),
            lines: Vec::new(),
            index: BTreeMap::new(),
            trailer: Vec::new(),
            tail: Vec::new(),
        };

        let mut buffer: Vec<String> = Vec::new();
        let mut length = TICKS_PER_MEASURE;
        let mut next_tick = Tick::ZERO;

        for raw in body.split('\n') {
            let line = raw.trim();
            if line.starts_with('#') {
                chart.trailer.push(line.to_string());
            } else if line == SEPARATOR {
                if chart.separated {
                    let measure = RawMeasure::parse(chart.measures.len(), length, &buffer)?;
                    length = measure.length;
                    next_tick = chart.push_measure(measure, next_tick);
                    buffer.clear();
                } else {
                    chart.separated = true;
                }
            } else if chart.separated {
                buffer.push(line.to_string());
            } else {
                chart.header.push(line.to_string());
            }
        }
        chart.tail = buffer;

        log::debug!(
            "parsed chart: {} measure(s), {} line(s)",
            chart.measures.len(),
            chart.lines.len()
        );
        Ok(chart)
    }

    fn push_measure(&mut self, raw: RawMeasure, start: Tick) -> Tick {
        let measure_index = self.measures.len();
        let spacing = raw.length / raw.rows.len() as u64;
        let mut ids = Vec::with_capacity(raw.rows.len());
        let mut tick = start;

        for (annotations, lanes) in raw.rows {
            let id = LineId(self.lines.len());
            self.lines
                .push(Line::new(tick, measure_index, lanes, annotations));
            self.index.insert(tick, id);
            ids.push(id);
            tick = tick + Tick::from_ticks(spacing);
        }

        self.measures.push(Measure {
            length: raw.length,
            lines: ids,
            trailing: raw.trailing,
        });
        tick
    }

    /// Header lines (everything before the first `--`).
    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// First value of a header `key=value` modifier.
    pub fn header_value(&self, key: &str) -> Option<&str> {
        self.header
            .iter()
            .find_map(|h| h.strip_prefix(key).and_then(|rest| rest.strip_prefix('=')))
    }

    /// Measures in chart order.
    pub fn measures(&self) -> &[Measure] {
        &self.measures
    }

    /// Look up a line by handle.
    pub fn line(&self, id: LineId) -> &Line {
        &self.lines[id.0]
    }

    /// Line at an exact tick.
    pub fn line_at(&self, tick: Tick) -> Option<&Line> {
        self.index.get(&tick).map(|id| &self.lines[id.0])
    }

    /// Mutable line at an exact tick.
    pub fn line_at_mut(&mut self, tick: Tick) -> Option<&mut Line> {
        let id = *self.index.get(&tick)?;
        self.lines.get_mut(id.0)
    }

    /// All lines in tick order.
    pub fn lines(&self) -> impl Iterator<Item = &Line> + '_ {
        self.index.values().map(|id| &self.lines[id.0])
    }

    /// Number of lines in the chart.
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Make sure a line exists at `tick`, refining the enclosing measure's
    /// grid if needed.
    ///
    /// Returns `Ok(false)` when the tick cannot be reached by subdivision,
    /// which happens past the end of the chart.
    pub fn ensure_line(&mut self, tick: Tick) -> Result<bool, ChartError> {
        if self.index.contains_key(&tick) {
            return Ok(true);
        }

        let measure_index = self
            .measures
            .iter()
            .rposition(|m| m.lines.first().is_some_and(|id| self.lines[id.0].tick() <= tick))
            .ok_or(ChartError::NoEnclosingMeasure { tick })?;

        self.subdivide(measure_index, tick);
        Ok(self.index.contains_key(&tick))
    }

    fn subdivide(&mut self, measure_index: usize, tick: Tick) {
        let measure = &self.measures[measure_index];
        let spacing = measure.spacing();
        let length = measure.length;
        let Some(&first) = measure.lines.first() else {
            return;
        };
        if spacing == 0 {
            return;
        }

        let start = self.lines[first.0].tick().ticks();
        let offset = (tick.ticks() - start) % length;
        let fine = offset.gcd(spacing);
        if fine == spacing {
            return;
        }

        let old = measure.lines.clone();
        let following = self.index.get(&Tick::from_ticks(start + length)).copied();
        let mut ids = Vec::with_capacity((length / fine) as usize);
        let mut next_old = 0;
        let mut prev = first;

        for t in (start..start + length).step_by(fine as usize) {
            let at = Tick::from_ticks(t);
            if let Some(&id) = old.get(next_old).filter(|id| self.lines[id.0].tick() == at) {
                prev = id;
                next_old += 1;
                ids.push(id);
                continue;
            }

            let next = old.get(next_old).copied().or(following);
            let lanes = interpolate_lanes(
                &self.lines[prev.0].lanes,
                next.map(|id| self.lines[id.0].lanes.as_str()),
            );
            let id = LineId(self.lines.len());
            self.lines
                .push(Line::new(at, measure_index, lanes, Vec::new()));
            self.index.insert(at, id);
            ids.push(id);
        }

        log::debug!(
            "measure {measure_index}: refined spacing {spacing} -> {fine} for tick {tick}"
        );
        self.measures[measure_index].lines = ids;
    }

    fn output_lines(&self) -> Vec<&str> {
        let mut out: Vec<&str> = self.header.iter().map(String::as_str).collect();
        if self.separated {
            out.push(SEPARATOR);
        }
        for measure in &self.measures {
            for id in &measure.lines {
                let line = &self.lines[id.0];
                out.extend(line.annotations.iter().map(String::as_str));
                out.push(&line.lanes);
            }
            out.extend(measure.trailing.iter().map(String::as_str));
            out.push(SEPARATOR);
        }
        out.extend(self.trailer.iter().map(String::as_str));
        out.extend(self.tail.iter().map(String::as_str));
        out
    }
}

impl fmt::Display for Chart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.bom {
            write!(f, "{BOM}")?;
        }
        f.write_str(&self.output_lines().join("\r\n"))
    }
}
