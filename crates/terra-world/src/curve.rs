//! Height response curve.

use serde::{Deserialize, Serialize};

/// A keyframe of a [`HeightCurve`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurveKey {
    /// Input height in `[0, 1]`
    pub time: f32,
    /// Output value in `[0, 1]`
    pub value: f32,
}

impl CurveKey {
    /// Creates a keyframe.
    #[must_use]
    pub const fn new(time: f32, value: f32) -> Self {
        Self { time, value }
    }
}

/// Piecewise-linear mapping `[0, 1] -> [0, 1]` applied to heights before
/// they are scaled into mesh space.
///
/// Cloning is cheap; mesh jobs take their own copy. Serialized as a plain
/// list of keys; deserializing goes through [`HeightCurve::from_keys`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<CurveKey>", into = "Vec<CurveKey>")]
pub struct HeightCurve {
    keys: Vec<CurveKey>,
}

impl Default for HeightCurve {
    fn default() -> Self {
        Self::linear()
    }
}

impl From<Vec<CurveKey>> for HeightCurve {
    fn from(keys: Vec<CurveKey>) -> Self {
        Self::from_keys(keys)
    }
}

impl From<HeightCurve> for Vec<CurveKey> {
    fn from(curve: HeightCurve) -> Self {
        curve.keys
    }
}

impl HeightCurve {
    /// Identity curve.
    #[must_use]
    pub fn linear() -> Self {
        Self {
            keys: vec![CurveKey::new(0.0, 0.0), CurveKey::new(1.0, 1.0)],
        }
    }

    /// Builds a curve from keyframes in any order.
    #[must_use]
    pub fn from_keys(mut keys: Vec<CurveKey>) -> Self {
        keys.sort_by(|a, b| a.time.total_cmp(&b.time));
        Self { keys }
    }

    /// Index and key of the first keyframe with a non-finite time or value.
    #[must_use]
    pub fn first_non_finite(&self) -> Option<(usize, CurveKey)> {
        self.keys
            .iter()
            .position(|k| !k.time.is_finite() || !k.value.is_finite())
            .map(|index| (index, self.keys[index]))
    }

    /// Keyframes sorted by time.
    #[must_use]
    pub fn keys(&self) -> &[CurveKey] {
        &self.keys
    }

    /// Evaluates the curve. Inputs outside the key range take the value of
    /// the nearest end key; an empty curve is the identity.
    #[must_use]
    pub fn evaluate(&self, t: f32) -> f32 {
        let (first, last) = match (self.keys.first(), self.keys.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return t.clamp(0.0, 1.0),
        };
        if t <= first.time {
            return first.value;
        }
        if t >= last.time {
            return last.value;
        }

        // First key strictly after t; exists because t < last.time.
        let upper = self.keys.partition_point(|k| k.time <= t);
        let a = self.keys[upper - 1];
        let b = self.keys[upper];
        let span = b.time - a.time;
        if span <= 0.0 {
            return b.value;
        }
        a.value + (b.value - a.value) * ((t - a.time) / span)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_is_identity() {
        let curve = HeightCurve::linear();
        for t in [0.0, 0.25, 0.5, 0.9, 1.0] {
            assert!((curve.evaluate(t) - t).abs() < 1e-6);
        }
    }

    #[test]
    fn test_flattened_lowlands() {
        let curve = HeightCurve::from_keys(vec![
            CurveKey::new(1.0, 1.0),
            CurveKey::new(0.0, 0.0),
            CurveKey::new(0.4, 0.0),
        ]);
        assert_eq!(curve.evaluate(0.2), 0.0);
        assert!((curve.evaluate(0.7) - 0.5).abs() < 1e-6);
        assert_eq!(curve.evaluate(1.0), 1.0);
    }

    #[test]
    fn test_out_of_range_clamps_to_end_keys() {
        let curve = HeightCurve::from_keys(vec![CurveKey::new(0.2, 0.1), CurveKey::new(0.8, 0.9)]);
        assert_eq!(curve.evaluate(-1.0), 0.1);
        assert_eq!(curve.evaluate(0.0), 0.1);
        assert_eq!(curve.evaluate(2.0), 0.9);
    }

    #[test]
    fn test_deserialize_sorts_keys() {
        #[derive(Deserialize)]
        struct Wrapper {
            curve: HeightCurve,
        }

        let wrapper: Wrapper = toml::from_str(
            r"
            [[curve]]
            time = 1.0
            value = 1.0

            [[curve]]
            time = 0.0
            value = 0.0
            ",
        )
        .expect("parse");
        assert_eq!(wrapper.curve.keys()[0], CurveKey::new(0.0, 0.0));
        assert!((wrapper.curve.evaluate(0.25) - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_non_finite_key_detected() {
        let curve = HeightCurve::from_keys(vec![
            CurveKey::new(0.0, 0.0),
            CurveKey::new(f32::NAN, 0.5),
            CurveKey::new(1.0, 1.0),
        ]);
        // total_cmp sorts positive NaN last
        let (index, key) = curve.first_non_finite().expect("NaN key");
        assert_eq!(index, 2);
        assert!(key.time.is_nan());
        assert!(HeightCurve::linear().first_non_finite().is_none());
    }

    #[test]
    fn test_empty_curve_is_identity() {
        let curve = HeightCurve::from_keys(Vec::new());
        assert_eq!(curve.evaluate(0.3), 0.3);
    }

    #[test]
    fn test_monotonic_for_monotonic_keys() {
        let curve = HeightCurve::from_keys(vec![
            CurveKey::new(0.0, 0.0),
            CurveKey::new(0.3, 0.05),
            CurveKey::new(0.6, 0.4),
            CurveKey::new(1.0, 1.0),
        ]);
        let mut previous = curve.evaluate(0.0);
        for i in 1..=100 {
            let v = curve.evaluate(i as f32 / 100.0);
            assert!(v >= previous);
            previous = v;
        }
    }
}
