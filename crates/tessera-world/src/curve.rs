//! Keyframed height response curve.
//!
//! [`HeightCurve`] is the shareable definition held by settings. Evaluation goes through a
//! [`CurveEvaluator`], which caches the last segment it hit and is therefore `!Sync`; each
//! generation job makes its own with [`HeightCurve::evaluator`].

use std::cell::Cell;
use std::sync::Arc;

use serde::Deserialize;

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq)]
pub struct Keyframe {
    pub time: f32,
    pub value: f32,
    #[serde(default)]
    pub in_tangent: f32,
    #[serde(default)]
    pub out_tangent: f32,
}

impl Keyframe {
    pub const fn new(time: f32, value: f32, in_tangent: f32, out_tangent: f32) -> Self {
        Self {
            time,
            value,
            in_tangent,
            out_tangent,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct HeightCurve {
    keys: Arc<[Keyframe]>,
}

impl Default for HeightCurve {
    fn default() -> Self {
        Self::linear()
    }
}

impl HeightCurve {
    /// Builds a curve from keys in any order; they are sorted by time.
    pub fn new(mut keys: Vec<Keyframe>) -> Self {
        keys.retain(|k| k.time.is_finite() && k.value.is_finite());
        keys.sort_by(|a, b| a.time.total_cmp(&b.time));
        Self { keys: keys.into() }
    }

    /// Identity over [0, 1].
    pub fn linear() -> Self {
        Self::new(vec![
            Keyframe::new(0.0, 0.0, 1.0, 1.0),
            Keyframe::new(1.0, 1.0, 1.0, 1.0),
        ])
    }

    pub fn constant(value: f32) -> Self {
        Self::new(vec![Keyframe::new(0.0, value, 0.0, 0.0)])
    }

    /// Piecewise-linear curve through `(time, value)` points.
    pub fn piecewise_linear(points: &[(f32, f32)]) -> Self {
        let mut sorted: Vec<(f32, f32)> = points.to_vec();
        sorted.sort_by(|a, b| a.0.total_cmp(&b.0));
        let mut keys: Vec<Keyframe> = sorted
            .iter()
            .map(|&(t, v)| Keyframe::new(t, v, 0.0, 0.0))
            .collect();
        for i in 1..keys.len() {
            let dt = keys[i].time - keys[i - 1].time;
            let slope = if dt > 0.0 {
                (keys[i].value - keys[i - 1].value) / dt
            } else {
                0.0
            };
            keys[i - 1].out_tangent = slope;
            keys[i].in_tangent = slope;
        }
        Self::new(keys)
    }

    pub fn keys(&self) -> &[Keyframe] {
        &self.keys
    }

    pub fn evaluator(&self) -> CurveEvaluator {
        CurveEvaluator {
            keys: Arc::clone(&self.keys),
            cursor: Cell::new(0),
        }
    }

    /// One-off evaluation. Hot loops should hold an evaluator instead.
    pub fn evaluate(&self, t: f32) -> f32 {
        self.evaluator().evaluate(t)
    }
}

#[derive(Clone, Debug)]
pub struct CurveEvaluator {
    keys: Arc<[Keyframe]>,
    cursor: Cell<usize>,
}

impl CurveEvaluator {
    pub fn evaluate(&self, t: f32) -> f32 {
        let keys = &*self.keys;
        match keys {
            [] => 0.0,
            [only] => only.value,
            [first, .., last] => {
                if t <= first.time {
                    return first.value;
                }
                if t >= last.time {
                    return last.value;
                }
                let seg = self.segment_for(t);
                hermite(&keys[seg], &keys[seg + 1], t)
            }
        }
    }

    // Index `i` such that keys[i].time <= t < keys[i + 1].time. Caller guarantees t is
    // strictly inside the key range.
    fn segment_for(&self, t: f32) -> usize {
        let keys = &*self.keys;
        let cached = self.cursor.get();
        if cached + 1 < keys.len() && keys[cached].time <= t && t < keys[cached + 1].time {
            return cached;
        }
        let upper = keys.partition_point(|k| k.time <= t);
        let seg = upper.saturating_sub(1).min(keys.len() - 2);
        self.cursor.set(seg);
        seg
    }
}

fn hermite(k0: &Keyframe, k1: &Keyframe, t: f32) -> f32 {
    let dt = k1.time - k0.time;
    if dt <= 0.0 {
        return k1.value;
    }
    let s = (t - k0.time) / dt;
    let s2 = s * s;
    let s3 = s2 * s;
    let h00 = 2.0 * s3 - 3.0 * s2 + 1.0;
    let h10 = s3 - 2.0 * s2 + s;
    let h01 = -2.0 * s3 + 3.0 * s2;
    let h11 = s3 - s2;
    h00 * k0.value + h10 * dt * k0.out_tangent + h01 * k1.value + h11 * dt * k1.in_tangent
}
