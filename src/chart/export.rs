//! Flattened note/laser event lists for playback engines.
//!
//! The export walks the final timeline once with a running millisecond
//! clock. It can be written as a Lua table file or as YAML.

use std::fmt::Write as _;

use serde::Serialize;

use super::line::{Line, BT_COLUMNS, FX_COLUMNS, LASER_COLUMNS};
use super::tick::{Tick, TICKS_PER_MEASURE};
use super::Chart;

/// Laser position changes this close to a segment's start become slams.
pub const SLAM_THRESHOLD: u64 = TICKS_PER_MEASURE / 32;

const DEFAULT_BPM: f64 = 120.0;
const LASER_POSITIONS: &str = "0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmno";

/// A button note. Instant notes have zero duration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NoteEvent {
    /// 0-3 for BT-A..D, 4-5 for FX-L/R.
    pub lane: u8,
    pub start_ms: f64,
    pub duration_ms: f64,
}

/// A laser segment. Slams have zero duration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LaserEvent {
    pub lane: u8,
    pub start_ms: f64,
    pub start_pos: f64,
    pub end_pos: f64,
    pub duration_ms: f64,
}

/// The flattened chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Export {
    pub offset_ms: f64,
    pub measure_times: Vec<f64>,
    pub notes: Vec<NoteEvent>,
    pub lasers: Vec<LaserEvent>,
}

impl Export {
    /// Flatten a chart.
    pub fn from_chart(chart: &Chart) -> Self {
        let offset_ms = chart
            .header_value("o")
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(0.0);
        let mut bpm = chart
            .header_value("t")
            .and_then(parse_tempo)
            .unwrap_or(DEFAULT_BPM);

        let mut clock = offset_ms;
        let mut measure_times = Vec::with_capacity(chart.measures().len());
        let mut notes = NoteTracker::default();
        let mut lasers = LaserTracker::default();

        for measure in chart.measures() {
            measure_times.push(clock);
            let spacing = measure.spacing();
            for id in measure.line_ids() {
                let line = chart.line(*id);
                if let Some(tempo) = line.modifier_values("t").find_map(parse_tempo) {
                    bpm = tempo;
                }
                notes.step(line, clock);
                lasers.step(line, clock);
                clock += Tick::span_millis(spacing, bpm);
            }
        }

        Self {
            offset_ms,
            measure_times,
            notes: notes.finish(clock),
            lasers: lasers.events,
        }
    }

    /// Render as Lua assignments.
    pub fn to_lua(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "-- Timing --");
        let _ = writeln!(out, "chart_offset = {:.0}", self.offset_ms);
        let times: Vec<String> = self.measure_times.iter().map(|t| format!("{t:.0}")).collect();
        let _ = writeln!(out, "chart_measure_times = {{{}}}", times.join(", "));

        let _ = writeln!(out, "\n-- Notes --");
        let _ = writeln!(out, "chart_notes = {{");
        for n in &self.notes {
            let _ = writeln!(
                out,
                "\t{{lane={}, t={:.0}, len={:.0}}},",
                n.lane, n.start_ms, n.duration_ms
            );
        }
        let _ = writeln!(out, "}}");

        let _ = writeln!(out, "\n-- Lasers --");
        let _ = writeln!(out, "chart_lasers = {{");
        for l in &self.lasers {
            let _ = writeln!(
                out,
                "\t{{lane={}, t={:.0}, from={:.3}, to={:.3}, len={:.0}}},",
                l.lane, l.start_ms, l.start_pos, l.end_pos, l.duration_ms
            );
        }
        let _ = writeln!(out, "}}");
        out
    }

    /// Render as YAML.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }
}

/// First number of a tempo value such as `120` or `120-180`.
fn parse_tempo(value: &str) -> Option<f64> {
    value
        .split('-')
        .next()
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|bpm| *bpm > 0.0)
}

fn laser_position(c: char) -> Option<f64> {
    LASER_POSITIONS
        .find(c)
        .map(|i| i as f64 / (LASER_POSITIONS.len() - 1) as f64)
}

#[derive(Default)]
struct NoteTracker {
    open: [Option<f64>; 6],
    events: Vec<NoteEvent>,
}

impl NoteTracker {
    fn step(&mut self, line: &Line, now: f64) {
        let chars = line.lane_chars();
        let columns = BT_COLUMNS.iter().chain(FX_COLUMNS.iter());
        for (lane, &column) in columns.enumerate() {
            // BT: 1 chip, 2 hold. FX: 2 chip, 1 hold.
            let (chip, hold) = if lane < BT_COLUMNS.len() { ('1', '2') } else { ('2', '1') };
            let c = chars[column];
            if c == hold {
                self.open[lane].get_or_insert(now);
                continue;
            }
            if let Some(start) = self.open[lane].take() {
                self.push(lane, start, now - start);
            }
            if c == chip {
                self.push(lane, now, 0.0);
            }
        }
    }

    fn push(&mut self, lane: usize, start_ms: f64, duration_ms: f64) {
        self.events.push(NoteEvent {
            lane: lane as u8,
            start_ms,
            duration_ms,
        });
    }

    fn finish(mut self, end: f64) -> Vec<NoteEvent> {
        for lane in 0..self.open.len() {
            if let Some(start) = self.open[lane].take() {
                self.push(lane, start, end - start);
            }
        }
        self.events
            .sort_by(|a, b| a.start_ms.total_cmp(&b.start_ms).then(a.lane.cmp(&b.lane)));
        self.events
    }
}

#[derive(Clone, Copy)]
struct LaserAnchor {
    tick: Tick,
    time: f64,
    pos: f64,
}

#[derive(Default)]
struct LaserTracker {
    anchors: [Option<LaserAnchor>; 2],
    events: Vec<LaserEvent>,
}

impl LaserTracker {
    fn step(&mut self, line: &Line, now: f64) {
        let chars = line.lane_chars();
        for (lane, &column) in LASER_COLUMNS.iter().enumerate() {
            match chars[column] {
                '-' => self.anchors[lane] = None,
                ':' => {}
                c => {
                    let Some(pos) = laser_position(c) else { continue };
                    if let Some(anchor) = self.anchors[lane] {
                        let slam = (line.tick() - anchor.tick).ticks() <= SLAM_THRESHOLD;
                        let duration_ms = if slam { 0.0 } else { now - anchor.time };
                        if anchor.pos != pos || duration_ms != 0.0 {
                            self.events.push(LaserEvent {
                                lane: lane as u8,
                                start_ms: anchor.time,
                                start_pos: anchor.pos,
                                end_pos: pos,
                                duration_ms,
                            });
                        }
                    }
                    self.anchors[lane] = Some(LaserAnchor {
                        tick: line.tick(),
                        time: now,
                        pos,
                    });
                }
            }
        }
    }
}
