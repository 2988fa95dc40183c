//! Named curves and the edit merge.
//!
//! Edits are relative: a script describes a perturbation that starts and ends
//! at zero, and [`Curve::apply_edits`] adds it onto whatever the chart already
//! has, interpolating on both sides so existing keyframes and new ones agree.

use std::fmt;
use std::str::FromStr;

use super::key::{interpolate, KeyValue, Keyframe};

/// Chart modifiers driven as curves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CurveName {
    ZoomTop,
    ZoomBottom,
    ZoomSide,
    CenterSplit,
    Tilt,
}

impl CurveName {
    /// All curves, in write-back order.
    pub const ALL: [CurveName; 5] = [
        CurveName::ZoomTop,
        CurveName::ZoomBottom,
        CurveName::ZoomSide,
        CurveName::CenterSplit,
        CurveName::Tilt,
    ];

    /// Modifier key as written in charts and scripts.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ZoomTop => "zoom_top",
            Self::ZoomBottom => "zoom_bottom",
            Self::ZoomSide => "zoom_side",
            Self::CenterSplit => "center_split",
            Self::Tilt => "tilt",
        }
    }
}

impl fmt::Display for CurveName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CurveName {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, ()> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
            .ok_or(())
    }
}

/// Keyframes of one curve plus its pending edits.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Curve {
    pub(crate) keys: Vec<Keyframe>,
    pub(crate) edits: Vec<Keyframe>,
}

impl Curve {
    /// Keyframes in tick order.
    pub fn keys(&self) -> &[Keyframe] {
        &self.keys
    }

    /// Whether edits are waiting for [`Curve::apply_edits`].
    pub fn has_pending_edits(&self) -> bool {
        !self.edits.is_empty()
    }

    /// Merge pending edits into the keyframes and clear them.
    pub fn apply_edits(&mut self) {
        let mut edits = std::mem::take(&mut self.edits);
        let Some(first) = edits.first_mut() else {
            return;
        };
        first.value = KeyValue::Jump(0.0, first.value.after());
        if let Some(last) = edits.last_mut() {
            last.value = KeyValue::Jump(last.value.before(), 0.0);
        }
        for edit in &mut edits {
            edit.value = edit.value.simplify();
        }

        if self.keys.is_empty() {
            self.keys = edits;
            return;
        }

        for patch in self.patches(&edits) {
            self.splice(patch);
        }
    }

    /// Keyframes to write for a normalized edit run.
    fn patches(&self, edits: &[Keyframe]) -> Vec<Keyframe> {
        let keys = &self.keys;
        let mut patches = Vec::with_capacity(edits.len());
        // Last existing keyframe at or before the edit being placed.
        let mut current = keys.iter().rposition(|k| k.tick <= edits[0].tick);

        for (i, edit) in edits.iter().enumerate() {
            let prev_edit = i.checked_sub(1).map(|p| &edits[p]);

            // Existing keyframes up to this edit pick up the interpolated delta.
            while let Some(key) = keys.get(current.map_or(0, |c| c + 1)) {
                if key.tick > edit.tick {
                    break;
                }
                current = Some(current.map_or(0, |c| c + 1));
                if key.tick == edit.tick {
                    break;
                }
                let delta = interpolate(prev_edit, Some(edit), key.tick);
                patches.push(Keyframe::new(key.tick, key.value.offset(delta)));
            }

            let value = match current.map(|c| &keys[c]) {
                Some(key) if key.tick == edit.tick => edit.value.offset_key(key.value),
                before => {
                    let after = keys.get(current.map_or(0, |c| c + 1));
                    edit.value.offset(interpolate(before, after, edit.tick))
                }
            };
            patches.push(Keyframe::new(edit.tick, value));
        }
        patches
    }

    fn splice(&mut self, patch: Keyframe) {
        match self.keys.binary_search_by(|k| k.tick.cmp(&patch.tick)) {
            Ok(i) => self.keys[i] = patch,
            Err(i) => self.keys.insert(i, patch),
        }
    }
}
