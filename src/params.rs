// src/params.rs - Motion parameters and their safe bounds
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::safety;

/// The four tunable gait parameters.
///
/// Amplitude, phase shift and steering are in degrees, frequency in Hz.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct MotionParameters {
    #[serde(default = "default_amplitude")]
    pub amplitude: f64,
    #[serde(default = "default_frequency")]
    pub frequency: f64,
    #[serde(default = "default_phase_shift")]
    pub phase_shift: f64,
    #[serde(default = "default_steering")]
    pub steering: f64,
}

impl Default for MotionParameters {
    fn default() -> Self {
        Self {
            amplitude: default_amplitude(),
            frequency: default_frequency(),
            phase_shift: default_phase_shift(),
            steering: default_steering(),
        }
    }
}

impl MotionParameters {
    pub fn get(&self, field: ParamField) -> f64 {
        match field {
            ParamField::Amplitude => self.amplitude,
            ParamField::Frequency => self.frequency,
            ParamField::PhaseShift => self.phase_shift,
            ParamField::Steering => self.steering,
        }
    }

    pub fn set(&mut self, field: ParamField, value: f64) {
        match field {
            ParamField::Amplitude => self.amplitude = value,
            ParamField::Frequency => self.frequency = value,
            ParamField::PhaseShift => self.phase_shift = value,
            ParamField::Steering => self.steering = value,
        }
    }
}

/// Names one of the [`MotionParameters`] fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamField {
    Amplitude,
    Frequency,
    PhaseShift,
    Steering,
}

impl ParamField {
    pub const ALL: [ParamField; 4] = [
        ParamField::Amplitude,
        ParamField::Frequency,
        ParamField::PhaseShift,
        ParamField::Steering,
    ];

    /// Short name used by the serial line protocol.
    pub fn wire_name(self) -> &'static str {
        match self {
            ParamField::Amplitude => "AMP",
            ParamField::Frequency => "FREQ",
            ParamField::PhaseShift => "PHASE",
            ParamField::Steering => "STEER",
        }
    }
}

impl fmt::Display for ParamField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParamField::Amplitude => "amplitude",
            ParamField::Frequency => "frequency",
            ParamField::PhaseShift => "phaseShift",
            ParamField::Steering => "steering",
        };
        f.write_str(name)
    }
}

/// Inclusive `[min, max]` range.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

impl Bounds {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn clamp(&self, value: f64) -> f64 {
        safety::clamp(value, self.min, self.max)
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Safe range for every parameter field.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct ParameterBounds {
    #[serde(default = "default_amplitude_bounds")]
    pub amplitude: Bounds,
    #[serde(default = "default_frequency_bounds")]
    pub frequency: Bounds,
    #[serde(default = "default_phase_shift_bounds")]
    pub phase_shift: Bounds,
    #[serde(default = "default_steering_bounds")]
    pub steering: Bounds,
}

impl Default for ParameterBounds {
    fn default() -> Self {
        Self {
            amplitude: default_amplitude_bounds(),
            frequency: default_frequency_bounds(),
            phase_shift: default_phase_shift_bounds(),
            steering: default_steering_bounds(),
        }
    }
}

impl ParameterBounds {
    pub fn for_field(&self, field: ParamField) -> Bounds {
        match field {
            ParamField::Amplitude => self.amplitude,
            ParamField::Frequency => self.frequency,
            ParamField::PhaseShift => self.phase_shift,
            ParamField::Steering => self.steering,
        }
    }
}

/// Holds the parameters the gait generator reads each tick.
///
/// Every write goes through the bounds, so readers never observe an
/// out-of-range value.
#[derive(Debug, Clone)]
pub struct ParameterStore {
    current: MotionParameters,
    bounds: ParameterBounds,
}

impl ParameterStore {
    pub fn new(initial: MotionParameters, bounds: ParameterBounds) -> Self {
        let mut store = Self {
            current: initial,
            bounds,
        };
        for field in ParamField::ALL {
            store.write(field, initial.get(field));
        }
        store
    }

    /// Clamps `value` into the field's bounds and stores it. Returns the stored value.
    pub fn write(&mut self, field: ParamField, value: f64) -> f64 {
        let bounded = self.bounds.for_field(field).clamp(value);
        if bounded != value {
            tracing::debug!("{} {} clamped to {}", field, value, bounded);
        }
        self.current.set(field, bounded);
        bounded
    }

    pub fn current(&self) -> MotionParameters {
        self.current
    }

    pub fn bounds(&self) -> &ParameterBounds {
        &self.bounds
    }
}

fn default_amplitude() -> f64 { 25.0 }
fn default_frequency() -> f64 { 0.8 }
fn default_phase_shift() -> f64 { 60.0 }
fn default_steering() -> f64 { 0.0 }
fn default_amplitude_bounds() -> Bounds { Bounds::new(5.0, 50.0) }
fn default_frequency_bounds() -> Bounds { Bounds::new(0.2, 2.0) }
fn default_phase_shift_bounds() -> Bounds { Bounds::new(30.0, 90.0) }
fn default_steering_bounds() -> Bounds { Bounds::new(-30.0, 30.0) }
