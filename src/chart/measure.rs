//! Measures and the raw measure blocks they are built from.

use super::error::ChartError;
use super::line::{is_lane_line, LineId};
use super::tick::{parse_fraction, Tick};

/// A fixed-length span of the timeline split evenly between its lines.
#[derive(Debug, Clone, PartialEq)]
pub struct Measure {
    pub(crate) length: u64,
    pub(crate) lines: Vec<LineId>,
    pub(crate) trailing: Vec<String>,
}

impl Measure {
    /// Length in ticks.
    pub fn length(&self) -> u64 {
        self.length
    }

    /// Line handles in tick order.
    pub fn line_ids(&self) -> &[LineId] {
        &self.lines
    }

    /// Annotations after the last line, written just before the closing `--`.
    pub fn trailing(&self) -> &[String] {
        &self.trailing
    }

    /// Ticks between consecutive lines.
    pub fn spacing(&self) -> u64 {
        match self.lines.len() as u64 {
            0 => 0,
            count => self.length / count,
        }
    }
}

/// A measure block as read from the text, before ticks are assigned.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RawMeasure {
    pub length: u64,
    /// `(annotations, lane string)` per line.
    pub rows: Vec<(Vec<String>, String)>,
    pub trailing: Vec<String>,
}

impl RawMeasure {
    /// Build a measure from the lines between two `--` separators.
    ///
    /// `inherited` is the previous measure's length.
    pub fn parse(index: usize, inherited: u64, text: &[String]) -> Result<Self, ChartError> {
        let mut length = inherited;
        let mut rows = Vec::new();
        let mut pending = Vec::new();

        for line in text {
            if is_lane_line(line) {
                rows.push((std::mem::take(&mut pending), line.clone()));
                continue;
            }
            if rows.is_empty() {
                if let Some(directive) = line.strip_prefix("beat=") {
                    length = parse_fraction(directive)
                        .and_then(|(num, den)| Tick::from_fraction(num, den))
                        .map(Tick::ticks)
                        .ok_or_else(|| ChartError::InvalidBeat {
                            measure: index,
                            directive: directive.to_string(),
                        })?;
                }
            }
            pending.push(line.clone());
        }

        if rows.is_empty() || length % rows.len() as u64 != 0 {
            return Err(ChartError::MeasureGridMismatch {
                measure: index,
                length,
                lines: rows.len(),
            });
        }

        Ok(Self {
            length,
            rows,
            trailing: pending,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(text: &[&str]) -> Vec<String> {
        text.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn annotations_attach_to_next_line() {
        let raw = RawMeasure::parse(
            0,
            192,
            &lines(&["t=120", "0000|00|--", "zoom_top=5", ";shake 48", "1000|00|--"]),
        )
        .unwrap();
        assert_eq!(raw.length, 192);
        assert_eq!(raw.rows.len(), 2);
        assert_eq!(raw.rows[0].0, lines(&["t=120"]));
        assert_eq!(raw.rows[1].0, lines(&["zoom_top=5", ";shake 48"]));
        assert!(raw.trailing.is_empty());
    }

    #[test]
    fn trailing_annotations_are_kept() {
        let raw = RawMeasure::parse(0, 192, &lines(&["0000|00|--", "zoom_top=5"])).unwrap();
        assert_eq!(raw.trailing, lines(&["zoom_top=5"]));
    }

    #[test]
    fn beat_directive_overrides_length() {
        let raw = RawMeasure::parse(2, 192, &lines(&["beat=3/4", "0000|00|--", "0000|00|--", "0000|00|--"]))
            .unwrap();
        assert_eq!(raw.length, 144);
        assert_eq!(raw.rows[0].0, lines(&["beat=3/4"]));
    }

    #[test]
    fn beat_after_first_line_is_ignored() {
        let raw = RawMeasure::parse(0, 96, &lines(&["0000|00|--", "beat=4/4", "0000|00|--"])).unwrap();
        assert_eq!(raw.length, 96);
    }

    #[test]
    fn fractional_beat_is_rejected() {
        let err = RawMeasure::parse(1, 192, &lines(&["beat=1/5", "0000|00|--"])).unwrap_err();
        assert_eq!(
            err,
            ChartError::InvalidBeat {
                measure: 1,
                directive: "1/5".into()
            }
        );
    }

    #[test]
    fn grid_mismatch() {
        let err = RawMeasure::parse(0, 192, &lines(&["0000|00|--"; 5])).unwrap_err();
        assert!(matches!(err, ChartError::MeasureGridMismatch { lines: 5, .. }));

        let err = RawMeasure::parse(3, 192, &lines(&["t=120"])).unwrap_err();
        assert!(matches!(err, ChartError::MeasureGridMismatch { measure: 3, lines: 0, .. }));
    }
}
