// src/smoothing.rs - Exponential smoothing of parameter targets
use crate::params::{MotionParameters, ParamField};

/// Exponential moving average applied per parameter field.
///
/// `smoothed = previous * alpha + target * (1 - alpha)`. Each call moves the
/// value by at most `(1 - alpha)` of the remaining gap.
#[derive(Debug, Clone)]
pub struct SmoothingFilter {
    alpha: f64,
    previous: MotionParameters,
}

impl SmoothingFilter {
    /// `seed` is the neutral value each field blends from on its first update.
    pub fn new(alpha: f64, seed: MotionParameters) -> Self {
        Self {
            alpha,
            previous: seed,
        }
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Blends `target` into the field's history and returns the smoothed value.
    pub fn blend(&mut self, field: ParamField, target: f64) -> f64 {
        let previous = self.previous.get(field);
        let smoothed = previous * self.alpha + target * (1.0 - self.alpha);
        self.previous.set(field, smoothed);
        smoothed
    }

    /// Overwrites a field's history, used when the stored value was clamped so
    /// the next blend starts from what is actually in effect.
    pub fn settle(&mut self, field: ParamField, value: f64) {
        self.previous.set(field, value);
    }
}

/// Messages needed for a constant target to come within `epsilon` of the
/// target, starting `gap` away: `ceil(ln(epsilon / |gap|) / ln(alpha))`.
///
/// `None` when the count is undefined: `alpha` outside `(0, 1)`, a
/// non-positive `epsilon`, or a non-finite input.
pub fn messages_to_converge(alpha: f64, gap: f64, epsilon: f64) -> Option<u32> {
    let defined = alpha > 0.0 && alpha < 1.0 && epsilon > 0.0 && epsilon.is_finite() && gap.is_finite();
    if !defined {
        return None;
    }
    if gap.abs() <= epsilon {
        return Some(0);
    }
    Some(((epsilon / gap.abs()).ln() / alpha.ln()).ceil() as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_update_ramps_from_seed() {
        let mut filter = SmoothingFilter::new(0.8, MotionParameters::default());
        let smoothed = filter.blend(ParamField::Amplitude, 45.0);
        // 25 * 0.8 + 45 * 0.2
        assert!((smoothed - 29.0).abs() < 1e-9);
    }

    #[test]
    fn test_smoothed_lies_between_previous_and_target() {
        let mut filter = SmoothingFilter::new(0.8, MotionParameters::default());
        let mut previous = MotionParameters::default().frequency;
        for target in [2.0, 0.2, 1.5, 0.3, 1.9] {
            let smoothed = filter.blend(ParamField::Frequency, target);
            let (lo, hi) = if previous < target { (previous, target) } else { (target, previous) };
            assert!(smoothed > lo && smoothed < hi, "{} not in ({}, {})", smoothed, lo, hi);
            previous = smoothed;
        }
    }

    #[test]
    fn test_converges_in_predicted_number_of_messages() {
        let alpha = 0.8;
        let seed = MotionParameters::default();
        let target = 45.0;
        let epsilon = 0.01;
        let k = messages_to_converge(alpha, target - seed.amplitude, epsilon).unwrap();
        assert_eq!(k, 35);
        let mut filter = SmoothingFilter::new(alpha, seed);
        let mut value = seed.amplitude;
        for _ in 0..k {
            value = filter.blend(ParamField::Amplitude, target);
        }
        assert!((value - target).abs() <= epsilon);
        let mut filter = SmoothingFilter::new(alpha, seed);
        let mut value = seed.amplitude;
        for _ in 0..k - 1 {
            value = filter.blend(ParamField::Amplitude, target);
        }
        assert!((value - target).abs() > epsilon);
    }

    #[test]
    fn test_convergence_count_edge_cases() {
        assert_eq!(messages_to_converge(0.8, 0.005, 0.01), Some(0));
        assert_eq!(messages_to_converge(0.8, 0.0, 0.01), Some(0));
        // a zero or negative tolerance is never reached
        assert_eq!(messages_to_converge(0.8, 20.0, 0.0), None);
        assert_eq!(messages_to_converge(0.8, 0.0, -1.0), None);
        assert_eq!(messages_to_converge(1.0, 20.0, 0.01), None);
        assert_eq!(messages_to_converge(0.8, f64::NAN, 0.01), None);
    }

    #[test]
    fn test_fields_are_independent() {
        let mut filter = SmoothingFilter::new(0.5, MotionParameters::default());
        filter.blend(ParamField::Steering, 20.0);
        let amplitude = filter.blend(ParamField::Amplitude, 25.0);
        assert_eq!(amplitude, 25.0);
        assert_eq!(filter.blend(ParamField::Steering, 20.0), 15.0);
    }

    #[test]
    fn test_settle_overrides_history() {
        let mut filter = SmoothingFilter::new(0.5, MotionParameters::default());
        filter.settle(ParamField::Amplitude, 50.0);
        assert_eq!(filter.blend(ParamField::Amplitude, 50.0), 50.0);
    }
}
