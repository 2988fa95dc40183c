//! Keyframe curves over the chart timeline.
//!
//! The [`CurveEngine`] reads the chart's existing `zoom_*`, `center_split`
//! and `tilt` modifiers into curves, collects relative edits from script
//! commands, merges them, and finally writes changed curves back into line
//! annotations.

pub mod curve;
pub mod key;
pub mod tilt;

use thiserror::Error;

use crate::chart::{Chart, ChartError, Line, Tick};

pub use curve::{Curve, CurveName};
pub use key::{KeyValue, Keyframe};
pub use tilt::{TiltSpans, TiltSymbol};

use key::round_half_up;

/// Largest magnitude accepted for an edit value.
pub const EDIT_RANGE: f64 = 10_000.0;

/// Invalid curve edits.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CurveError {
    #[error("{curve} edit at t={tick}: value `{value}` is not a number within ±10000")]
    InvalidEditRange {
        curve: CurveName,
        tick: Tick,
        value: String,
    },

    #[error("{curve} edit at t={tick}: expected 1 or 2 values, got {count}")]
    InvalidEditArity {
        curve: CurveName,
        tick: Tick,
        count: usize,
    },

    #[error("{curve} edit at t={tick} comes after an edit at t={last}")]
    InvalidEditOrder {
        curve: CurveName,
        tick: Tick,
        last: Tick,
    },
}

/// All curves of a chart.
#[derive(Debug, Clone, Default)]
pub struct CurveEngine {
    curves: [Curve; 5],
    dirty: [bool; 5],
    tilt: TiltSpans,
}

impl CurveEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read curve modifiers from every chart line.
    pub fn load(chart: &Chart) -> Self {
        let mut engine = Self::new();
        for line in chart.lines() {
            for name in CurveName::ALL {
                engine.load_line(line, name);
            }
        }
        engine
    }

    fn load_line(&mut self, line: &Line, name: CurveName) {
        let raw: Vec<&str> = line.modifier_values(name.as_str()).collect();
        if raw.is_empty() {
            return;
        }

        let mut numeric = raw.as_slice();
        if name == CurveName::Tilt {
            let symbol = raw
                .iter()
                .enumerate()
                .find_map(|(i, v)| v.parse::<TiltSymbol>().ok().map(|s| (i, s)));
            if let Some((i, _)) = symbol {
                numeric = &raw[..i];
            }
            self.tilt.observe(line.tick(), symbol.map(|(_, s)| s));
        }

        let values: Vec<f64> = numeric
            .iter()
            .filter_map(|v| match v.trim().parse::<f64>() {
                Ok(x) if x.is_finite() => Some(x),
                _ => {
                    log::warn!("t={}: ignoring non-numeric {name}={v}", line.tick());
                    None
                }
            })
            .collect();
        if let Some(value) = KeyValue::from_values(&values) {
            self.curves[name as usize]
                .keys
                .push(Keyframe::new(line.tick(), value));
        }
    }

    /// Curve by name.
    pub fn curve(&self, name: CurveName) -> &Curve {
        &self.curves[name as usize]
    }

    /// Symbolic tilt spans read from the chart.
    pub fn tilt_spans(&self) -> &TiltSpans {
        &self.tilt
    }

    /// Buffer a relative edit. Edits for one curve must arrive in tick order;
    /// a second edit at the same tick folds into the first.
    pub fn add_edit(&mut self, name: CurveName, tick: Tick, values: &[f64]) -> Result<(), CurveError> {
        if let Some(bad) = values.iter().find(|v| !(v.abs() <= EDIT_RANGE)) {
            return Err(CurveError::InvalidEditRange {
                curve: name,
                tick,
                value: bad.to_string(),
            });
        }
        let value = match *values {
            [v] => KeyValue::Point(v),
            [a, b] => KeyValue::Jump(a, b),
            _ => {
                return Err(CurveError::InvalidEditArity {
                    curve: name,
                    tick,
                    count: values.len(),
                })
            }
        };

        let edits = &mut self.curves[name as usize].edits;
        match edits.last_mut() {
            Some(last) if last.tick == tick => last.value.merge(value),
            Some(last) if last.tick > tick => {
                return Err(CurveError::InvalidEditOrder {
                    curve: name,
                    tick,
                    last: last.tick,
                })
            }
            _ => edits.push(Keyframe::new(tick, value)),
        }
        Ok(())
    }

    /// Merge every curve's pending edits.
    pub fn apply_edits(&mut self) {
        for (curve, dirty) in self.curves.iter_mut().zip(self.dirty.iter_mut()) {
            if curve.has_pending_edits() {
                curve.apply_edits();
                *dirty = true;
            }
        }
    }

    /// Write edited curves into the chart, creating lines as needed.
    pub fn write_back(&mut self, chart: &mut Chart) -> Result<(), ChartError> {
        self.apply_edits();
        for name in CurveName::ALL {
            if !self.dirty[name as usize] {
                continue;
            }
            if name == CurveName::Tilt {
                self.write_tilt(chart)?;
                continue;
            }
            log::debug!("writing {} {name} keyframe(s)", self.curve(name).keys().len());
            for key in self.curve(name).keys() {
                let line = resolve_line(chart, key.tick)?;
                write_value(line, name, key.value);
            }
        }
        Ok(())
    }

    fn write_tilt(&self, chart: &mut Chart) -> Result<(), ChartError> {
        let name = CurveName::Tilt;
        let keys = self.curve(name).keys();

        let touched = keys.iter().map(|k| k.tick).chain(self.tilt.openings().map(|(t, _)| t));
        for tick in touched {
            if let Some(line) = chart.line_at_mut(tick) {
                line.remove_modifier(name.as_str());
            }
        }

        let mut markers = self.tilt.markers().iter().peekable();
        let mut in_span = true;
        for key in keys {
            let mut write = !in_span;
            let mut symbol_here = None;
            while let Some(marker) = markers.next_if(|m| m.tick <= key.tick) {
                match marker.symbol {
                    Some(symbol) if marker.tick == key.tick => {
                        write = true;
                        in_span = true;
                        symbol_here = Some(symbol);
                    }
                    Some(symbol) => {
                        write = false;
                        in_span = true;
                        resolve_line(chart, marker.tick)?.push_modifier(name.as_str(), symbol);
                    }
                    None => {
                        write = true;
                        in_span = false;
                    }
                }
            }
            if !write {
                log::debug!("t={}: tilt keyframe hidden by a preset span", key.tick);
                continue;
            }
            let line = resolve_line(chart, key.tick)?;
            write_value(line, name, key.value);
            if let Some(symbol) = symbol_here {
                line.push_modifier(name.as_str(), symbol);
            }
        }

        for marker in markers {
            if let Some(symbol) = marker.symbol {
                resolve_line(chart, marker.tick)?.push_modifier(name.as_str(), symbol);
            }
        }
        Ok(())
    }
}

fn resolve_line(chart: &mut Chart, tick: Tick) -> Result<&mut Line, ChartError> {
    if !chart.ensure_line(tick)? {
        return Err(ChartError::UnresolvableTick { tick });
    }
    chart
        .line_at_mut(tick)
        .ok_or(ChartError::UnresolvableTick { tick })
}

fn write_value(line: &mut Line, name: CurveName, value: KeyValue) {
    line.remove_modifier(name.as_str());
    for v in value.values() {
        line.push_modifier(name.as_str(), round_half_up(v));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tick(t: u64) -> Tick {
        Tick::from_ticks(t)
    }

    fn annotations(chart: &Chart, t: u64) -> Vec<String> {
        chart.line_at(tick(t)).unwrap().annotations.clone()
    }

    const CHART: &str = "t=120\n--\nzoom_top=0\n0000|00|--\nzoom_top=10\nzoom_top=-10\n0000|00|--\nzoom_side=abc\n0000|00|--\nzoom_top=0\n0000|00|--\n--\n0000|00|--\n--\n";

    #[test]
    fn load_reads_points_and_jumps() {
        let chart = Chart::parse(CHART).unwrap();
        let engine = CurveEngine::load(&chart);
        assert_eq!(
            engine.curve(CurveName::ZoomTop).keys(),
            &[
                Keyframe::new(tick(0), KeyValue::Point(0.0)),
                Keyframe::new(tick(48), KeyValue::Jump(10.0, -10.0)),
                Keyframe::new(tick(144), KeyValue::Point(0.0)),
            ]
        );
        assert!(engine.curve(CurveName::ZoomSide).keys().is_empty());
    }

    #[test]
    fn add_edit_validates() {
        let mut engine = CurveEngine::new();
        let name = CurveName::ZoomBottom;
        assert!(matches!(
            engine.add_edit(name, tick(0), &[10_001.0]),
            Err(CurveError::InvalidEditRange { .. })
        ));
        assert!(matches!(
            engine.add_edit(name, tick(0), &[f64::NAN]),
            Err(CurveError::InvalidEditRange { .. })
        ));
        assert_eq!(
            engine.add_edit(name, tick(0), &[1.0, 2.0, 3.0]),
            Err(CurveError::InvalidEditArity {
                curve: name,
                tick: tick(0),
                count: 3
            })
        );
        engine.add_edit(name, tick(48), &[-10_000.0]).unwrap();
        assert_eq!(
            engine.add_edit(name, tick(24), &[1.0]),
            Err(CurveError::InvalidEditOrder {
                curve: name,
                tick: tick(24),
                last: tick(48)
            })
        );
    }

    #[test]
    fn same_tick_edits_merge() {
        let mut engine = CurveEngine::new();
        engine.add_edit(CurveName::ZoomTop, tick(0), &[0.0]).unwrap();
        engine.add_edit(CurveName::ZoomTop, tick(96), &[40.0]).unwrap();
        engine.add_edit(CurveName::ZoomTop, tick(96), &[0.0]).unwrap();
        engine.apply_edits();
        assert_eq!(
            engine.curve(CurveName::ZoomTop).keys(),
            &[
                Keyframe::new(tick(0), KeyValue::Point(0.0)),
                Keyframe::new(tick(96), KeyValue::Point(40.0)),
            ]
        );
    }

    #[test]
    fn write_back_rewrites_edited_curves_only() {
        let mut chart = Chart::parse(CHART).unwrap();
        let mut engine = CurveEngine::load(&chart);
        engine.add_edit(CurveName::ZoomTop, tick(0), &[0.0]).unwrap();
        engine.add_edit(CurveName::ZoomTop, tick(72), &[20.0]).unwrap();
        engine.add_edit(CurveName::ZoomTop, tick(144), &[0.0]).unwrap();
        engine.write_back(&mut chart).unwrap();

        assert_eq!(annotations(&chart, 0), vec!["zoom_top=0"]);
        // The delta at 48 is two thirds of the peak; 72 adds the peak onto the
        // existing curve value there.
        assert_eq!(annotations(&chart, 48), vec!["zoom_top=23", "zoom_top=3"]);
        assert_eq!(annotations(&chart, 72), vec!["zoom_top=13"]);
        assert_eq!(annotations(&chart, 96), vec!["zoom_side=abc"]);
        assert_eq!(annotations(&chart, 144), vec!["zoom_top=0"]);
    }

    #[test]
    fn write_back_past_chart_end_fails() {
        let mut chart = Chart::parse("--\n0000|00|--\n--\n").unwrap();
        let mut engine = CurveEngine::load(&chart);
        engine.add_edit(CurveName::ZoomTop, tick(0), &[0.0]).unwrap();
        engine.add_edit(CurveName::ZoomTop, tick(192), &[5.0]).unwrap();
        assert_eq!(
            engine.write_back(&mut chart),
            Err(ChartError::UnresolvableTick { tick: tick(192) })
        );
    }

    #[test]
    fn tilt_presets_hide_numeric_keys() {
        let source = "--\n0000|00|--\ntilt=10\n0000|00|--\ntilt=bigger\n0000|00|--\ntilt=0\n0000|00|--\n--\n0000|00|--\n--\n";
        let mut chart = Chart::parse(source).unwrap();
        let mut engine = CurveEngine::load(&chart);
        assert_eq!(engine.tilt_spans().openings().count(), 1);

        engine.add_edit(CurveName::Tilt, tick(48), &[0.0]).unwrap();
        engine.add_edit(CurveName::Tilt, tick(120), &[5.0]).unwrap();
        engine.add_edit(CurveName::Tilt, tick(192), &[0.0]).unwrap();
        engine.write_back(&mut chart).unwrap();

        assert_eq!(annotations(&chart, 48), vec!["tilt=10"]);
        assert_eq!(annotations(&chart, 96), vec!["tilt=bigger"]);
        assert!(chart.line_at(tick(120)).is_none());
        assert_eq!(annotations(&chart, 144), vec!["tilt=3"]);
        assert_eq!(annotations(&chart, 192), vec!["tilt=0"]);
    }

    #[test]
    fn implicit_normal_span_hides_leading_keys() {
        let mut chart = Chart::parse("--\n0000|00|--\n0000|00|--\n--\n").unwrap();
        let mut engine = CurveEngine::load(&chart);
        engine.add_edit(CurveName::Tilt, tick(0), &[0.0]).unwrap();
        engine.add_edit(CurveName::Tilt, tick(96), &[5.0, 0.0]).unwrap();
        engine.write_back(&mut chart).unwrap();
        assert!(annotations(&chart, 0).is_empty());
        assert!(annotations(&chart, 96).is_empty());
    }
}
