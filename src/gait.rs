// src/gait.rs - Phase-offset oscillator bank
//! Traveling-wave gait generation.
//!
//! Every segment shares one clock and one angular frequency; segment `i` lags
//! its neighbour by a fixed phase. The only state that advances is the shared
//! clock, so the generator itself is stateless and can be restarted at any `t`.
//!
//! ```text
//! ω = 2π·f
//! angle[0] = center + S                          (HeadMode::Steering)
//! angle[i] = center + A·sin(ω·t + i·radians(Δφ))
//! ```

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::params::MotionParameters;

/// What the first segment does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HeadMode {
    /// Segment 0 holds `center + steering` and does not oscillate.
    #[default]
    Steering,
    /// Every segment oscillates, including segment 0. Steering is not applied
    /// by the generator; the joystick mapping turns `x` into frequency and `y`
    /// into phase shift instead.
    Oscillate,
}

#[derive(Debug, Clone)]
pub struct GaitGenerator {
    segments: usize,
    center: f64,
    head: HeadMode,
}

impl GaitGenerator {
    pub fn new(segments: usize, center: f64, head: HeadMode) -> Self {
        Self {
            segments,
            center,
            head,
        }
    }

    pub fn segments(&self) -> usize {
        self.segments
    }

    pub fn center(&self) -> f64 {
        self.center
    }

    pub fn head_mode(&self) -> HeadMode {
        self.head
    }

    /// Unclamped target angle for one segment at elapsed time `t` seconds.
    pub fn angle(&self, segment: usize, t: f64, params: &MotionParameters) -> f64 {
        if segment == 0 && self.head == HeadMode::Steering {
            return self.center + params.steering;
        }
        let omega = 2.0 * PI * params.frequency;
        let lag = segment as f64 * params.phase_shift.to_radians();
        self.center + params.amplitude * (omega * t + lag).sin()
    }

    /// Writes all segment angles for time `t` into `out`, replacing its contents.
    pub fn angles_into(&self, t: f64, params: &MotionParameters, out: &mut Vec<f64>) {
        out.clear();
        out.extend((0..self.segments).map(|i| self.angle(i, t, params)));
    }

    pub fn angles(&self, t: f64, params: &MotionParameters) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.segments);
        self.angles_into(t, params, &mut out);
        out
    }

    /// Every segment at the center angle.
    pub fn neutral_into(&self, out: &mut Vec<f64>) {
        out.clear();
        out.resize(self.segments, self.center);
    }
}
