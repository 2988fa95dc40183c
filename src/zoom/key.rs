//! Keyframe values: continuous points and discontinuities.

use crate::chart::Tick;

/// Value of a curve at a keyframe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KeyValue {
    /// The curve passes through `v`.
    Point(f64),
    /// The curve arrives at `before` and leaves from `after`.
    Jump(f64, f64),
}

impl KeyValue {
    /// Build from written values: one value is a point, more is a jump from
    /// the first to the last.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        match values {
            [] => None,
            [v] => Some(Self::Point(*v)),
            [first, .., last] => Some(Self::Jump(*first, *last)),
        }
    }

    /// Value arriving at the keyframe.
    pub fn before(self) -> f64 {
        match self {
            Self::Point(v) | Self::Jump(v, _) => v,
        }
    }

    /// Value leaving the keyframe.
    pub fn after(self) -> f64 {
        match self {
            Self::Point(v) | Self::Jump(_, v) => v,
        }
    }

    /// Values in written order.
    pub fn values(self) -> Vec<f64> {
        match self {
            Self::Point(v) => vec![v],
            Self::Jump(a, b) => vec![a, b],
        }
    }

    /// Collapse a jump with equal sides into a point.
    pub fn simplify(self) -> Self {
        match self {
            Self::Jump(a, b) if a == b => Self::Point(a),
            other => other,
        }
    }

    /// Shift every value by `delta`.
    pub fn offset(self, delta: f64) -> Self {
        match self {
            Self::Point(v) => Self::Point(v + delta),
            Self::Jump(a, b) => Self::Jump(a + delta, b + delta),
        }
    }

    /// Add a delta keyframe (`self`) onto an existing keyframe at the same
    /// tick, keeping either side's discontinuity.
    pub fn offset_key(self, base: Self) -> Self {
        match (self, base) {
            (Self::Jump(a0, a1), Self::Jump(b0, b1)) => Self::Jump(a0 + b0, a1 + b1).simplify(),
            (Self::Point(d), Self::Jump(b0, b1)) => Self::Jump(d + b0, d + b1),
            (delta, base) => delta.offset(base.before()),
        }
    }

    /// Fold a later edit at the same tick into this one.
    pub fn merge(&mut self, incoming: Self) {
        if self.before() != incoming.after() {
            *self = Self::Jump(self.before(), incoming.after());
        }
    }
}

/// A value anchored to a tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keyframe {
    pub tick: Tick,
    pub value: KeyValue,
}

impl Keyframe {
    pub fn new(tick: Tick, value: KeyValue) -> Self {
        Self { tick, value }
    }
}

/// Linear interpolation between two keyframes at `tick`.
///
/// With only one side known, the curve holds that side's value.
pub fn interpolate(before: Option<&Keyframe>, after: Option<&Keyframe>, tick: Tick) -> f64 {
    match (before, after) {
        (None, None) => 0.0,
        (None, Some(a)) => a.value.before(),
        (Some(b), None) => b.value.after(),
        (Some(b), Some(a)) => {
            let from = b.value.after();
            let to = a.value.before();
            if a.tick <= b.tick {
                return from;
            }
            let span = (a.tick - b.tick).ticks() as f64;
            let elapsed = (tick - b.tick).ticks() as f64;
            from + (to - from) * (elapsed / span)
        }
    }
}

/// Round half up, as chart values are written.
pub fn round_half_up(v: f64) -> i64 {
    (v + 0.5).floor() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn key(t: u64, value: KeyValue) -> Keyframe {
        Keyframe::new(Tick::from_ticks(t), value)
    }

    #[test]
    fn from_values_uses_first_and_last() {
        assert_eq!(KeyValue::from_values(&[]), None);
        assert_eq!(KeyValue::from_values(&[3.0]), Some(KeyValue::Point(3.0)));
        assert_eq!(KeyValue::from_values(&[1.0, 2.0, 3.0]), Some(KeyValue::Jump(1.0, 3.0)));
    }

    #[test]
    fn simplify_collapses_flat_jumps() {
        assert_eq!(KeyValue::Jump(4.0, 4.0).simplify(), KeyValue::Point(4.0));
        assert_eq!(KeyValue::Jump(4.0, 5.0).simplify(), KeyValue::Jump(4.0, 5.0));
    }

    #[test]
    fn offset_key_cases() {
        use KeyValue::*;
        assert_eq!(Jump(1.0, 2.0).offset_key(Jump(10.0, 20.0)), Jump(11.0, 22.0));
        assert_eq!(Jump(1.0, -9.0).offset_key(Jump(10.0, 20.0)), Point(11.0));
        assert_eq!(Point(5.0).offset_key(Jump(10.0, 20.0)), Jump(15.0, 25.0));
        assert_eq!(Point(5.0).offset_key(Point(10.0)), Point(15.0));
        assert_eq!(Jump(1.0, 2.0).offset_key(Point(10.0)), Jump(11.0, 12.0));
    }

    #[test]
    fn merge_widens_to_jump() {
        let mut v = KeyValue::Point(0.0);
        v.merge(KeyValue::Point(0.0));
        assert_eq!(v, KeyValue::Point(0.0));

        v.merge(KeyValue::Point(7.0));
        assert_eq!(v, KeyValue::Jump(0.0, 7.0));

        v.merge(KeyValue::Jump(3.0, 9.0));
        assert_eq!(v, KeyValue::Jump(0.0, 9.0));
    }

    #[test]
    fn interpolation() {
        let a = key(0, KeyValue::Jump(5.0, 0.0));
        let b = key(100, KeyValue::Jump(50.0, 0.0));
        assert_approx_eq!(interpolate(Some(&a), Some(&b), Tick::from_ticks(25)), 12.5);
        assert_approx_eq!(interpolate(None, Some(&b), Tick::from_ticks(25)), 50.0);
        assert_approx_eq!(interpolate(Some(&b), None, Tick::from_ticks(200)), 0.0);
        assert_approx_eq!(interpolate(None, None, Tick::ZERO), 0.0);
    }

    #[test]
    fn rounding_is_half_up() {
        assert_eq!(round_half_up(2.5), 3);
        assert_eq!(round_half_up(-2.5), -2);
        assert_eq!(round_half_up(-2.6), -3);
        assert_eq!(round_half_up(49.999999), 50);
    }
}
