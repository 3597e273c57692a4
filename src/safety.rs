// src/safety.rs - Hard numeric envelope applied before anything reaches hardware

/// Bounds `value` to `[lo, hi]`. NaN maps to `lo`.
pub fn clamp(value: f64, lo: f64, hi: f64) -> f64 {
    if value.is_nan() {
        return lo;
    }
    value.max(lo).min(hi)
}

/// Per-segment angle limits, `center ± limit` degrees.
///
/// This is the second safety layer: parameters are already bounded, but a
/// combination of in-range parameters can still produce a large angle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AngleEnvelope {
    center: f64,
    limit: f64,
}

impl AngleEnvelope {
    pub fn new(center: f64, limit: f64) -> Self {
        Self {
            center,
            limit: limit.abs(),
        }
    }

    pub fn center(&self) -> f64 {
        self.center
    }

    pub fn min(&self) -> f64 {
        self.center - self.limit
    }

    pub fn max(&self) -> f64 {
        self.center + self.limit
    }

    /// Clamps an angle into the envelope. NaN maps to the center.
    pub fn clamp(&self, angle: f64) -> f64 {
        if angle.is_nan() {
            return self.center;
        }
        clamp(angle, self.min(), self.max())
    }
}
