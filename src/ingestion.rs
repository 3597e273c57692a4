// src/ingestion.rs - Control message validation and input mapping
//! Turns one inbound control message into parameter targets.
//!
//! Transports reduce whatever they receive (a serial line, a JSON object on a
//! socket, an HTTP body) to a [`ControlMessage`]; everything from here on is
//! transport independent. A message is either applied in full or rejected in
//! full, never partially.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::gait::HeadMode;
use crate::params::{Bounds, ParamField};
use crate::safety;

#[derive(Debug, Error, PartialEq)]
pub enum IngestError {
    #[error("missing required field '{0}'")]
    MissingField(&'static str),
    #[error("field '{field}' is not a finite number ({value})")]
    NonFinite { field: &'static str, value: f64 },
    #[error("message carries no recognised fields")]
    Empty,
    #[error("malformed message: {0}")]
    Malformed(String),
}

/// One inbound message: named numeric fields, all optional on the wire.
///
/// Unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amplitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase_shift: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steering: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
}

impl ControlMessage {
    fn fields(&self) -> [(&'static str, Option<f64>); 7] {
        [
            ("x", self.x),
            ("y", self.y),
            ("amplitude", self.amplitude),
            ("frequency", self.frequency),
            ("phaseShift", self.phase_shift),
            ("steering", self.steering),
            ("distance", self.distance),
        ]
    }

    pub fn is_empty(&self) -> bool {
        self.fields().iter().all(|(_, value)| value.is_none())
    }

    /// Rejects the message if any present field is NaN or infinite.
    pub fn check_finite(&self) -> Result<(), IngestError> {
        for (field, value) in self.fields() {
            if let Some(value) = value {
                if !value.is_finite() {
                    return Err(IngestError::NonFinite { field, value });
                }
            }
        }
        Ok(())
    }

    pub fn parameter(&self, field: ParamField) -> Option<f64> {
        match field {
            ParamField::Amplitude => self.amplitude,
            ParamField::Frequency => self.frequency,
            ParamField::PhaseShift => self.phase_shift,
            ParamField::Steering => self.steering,
        }
    }
}

/// How raw message fields become parameter targets. One policy per deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MappingPolicy {
    /// `amplitude`, `frequency`, `phaseShift` and `steering` are targets as-is.
    #[default]
    Passthrough,
    /// Targets derived from joystick `x`/`y` and a `distance` reading. What
    /// each axis drives depends on the gait's [`HeadMode`]: with a steering
    /// head `x` steers and `y` sets frequency; with an oscillating head `x`
    /// sets frequency and `y` sets phase shift.
    Joystick,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MappingConfig {
    #[serde(default)]
    pub policy: MappingPolicy,
    /// Degrees of heading per unit of joystick `x`.
    #[serde(default = "default_heading_scale")]
    pub heading_scale: f64,
    /// Steering degrees per degree of heading.
    #[serde(default = "default_steering_gain")]
    pub steering_gain: f64,
    /// Range the joystick axes travel over.
    #[serde(default = "default_joystick_range")]
    pub joystick_range: Bounds,
    /// Frequency the `y` axis sweeps across.
    #[serde(default = "default_frequency_range")]
    pub frequency_range: Bounds,
    /// Frequency the `x` axis sweeps across when the head oscillates.
    #[serde(default = "default_oscillate_frequency_range")]
    pub oscillate_frequency_range: Bounds,
    /// Phase shift the `y` axis sweeps across when the head oscillates.
    #[serde(default = "default_phase_shift_range")]
    pub phase_shift_range: Bounds,
    /// Distance readings (m) mapped onto amplitude.
    #[serde(default = "default_distance_range")]
    pub distance_range: Bounds,
    /// Amplitude at the near end of `distance_range`.
    #[serde(default = "default_near_amplitude")]
    pub near_amplitude: f64,
    /// Amplitude at the far end of `distance_range`.
    #[serde(default = "default_far_amplitude")]
    pub far_amplitude: f64,
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            policy: MappingPolicy::default(),
            heading_scale: default_heading_scale(),
            steering_gain: default_steering_gain(),
            joystick_range: default_joystick_range(),
            frequency_range: default_frequency_range(),
            oscillate_frequency_range: default_oscillate_frequency_range(),
            phase_shift_range: default_phase_shift_range(),
            distance_range: default_distance_range(),
            near_amplitude: default_near_amplitude(),
            far_amplitude: default_far_amplitude(),
        }
    }
}

fn default_heading_scale() -> f64 { 60.0 }
fn default_steering_gain() -> f64 { 1.5 }
fn default_joystick_range() -> Bounds { Bounds::new(-0.5, 0.5) }
fn default_frequency_range() -> Bounds { Bounds::new(0.2, 2.0) }
fn default_oscillate_frequency_range() -> Bounds { Bounds::new(0.5, 2.0) }
fn default_phase_shift_range() -> Bounds { Bounds::new(30.0, 90.0) }
fn default_distance_range() -> Bounds { Bounds::new(0.0, 1.0) }
fn default_near_amplitude() -> f64 { 40.0 }
fn default_far_amplitude() -> f64 { 5.0 }

/// Parameter targets extracted from one message.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MotionTargets {
    pub amplitude: Option<f64>,
    pub frequency: Option<f64>,
    pub phase_shift: Option<f64>,
    pub steering: Option<f64>,
    /// Heading derived from joystick `x`, echoed back to the controller.
    pub heading: Option<f64>,
}

impl MotionTargets {
    pub fn get(&self, field: ParamField) -> Option<f64> {
        match field {
            ParamField::Amplitude => self.amplitude,
            ParamField::Frequency => self.frequency,
            ParamField::PhaseShift => self.phase_shift,
            ParamField::Steering => self.steering,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (ParamField, f64)> + '_ {
        ParamField::ALL
            .into_iter()
            .filter_map(|field| self.get(field).map(|value| (field, value)))
    }
}

/// Linear map of `value` from `[in_lo, in_hi]` onto `[out_lo, out_hi]`, held
/// inside the output range. `out_lo > out_hi` gives an inverse mapping.
pub fn remap(value: f64, in_lo: f64, in_hi: f64, out_lo: f64, out_hi: f64) -> f64 {
    let span = in_hi - in_lo;
    if span == 0.0 {
        return out_lo;
    }
    let mapped = out_lo + (value - in_lo) * (out_hi - out_lo) / span;
    safety::clamp(mapped, out_lo.min(out_hi), out_lo.max(out_hi))
}

/// Applies the deployment's [`MappingPolicy`] to validated messages.
#[derive(Debug, Clone)]
pub struct CommandMapper {
    config: MappingConfig,
    head: HeadMode,
}

impl CommandMapper {
    pub fn new(config: MappingConfig, head: HeadMode) -> Self {
        Self { config, head }
    }

    pub fn policy(&self) -> MappingPolicy {
        self.config.policy
    }

    /// Validates `message` and returns the targets it asks for.
    pub fn map(&self, message: &ControlMessage) -> Result<MotionTargets, IngestError> {
        message.check_finite()?;
        match self.config.policy {
            MappingPolicy::Passthrough => self.passthrough(message),
            MappingPolicy::Joystick => self.joystick(message),
        }
    }

    fn passthrough(&self, message: &ControlMessage) -> Result<MotionTargets, IngestError> {
        let targets = MotionTargets {
            amplitude: message.amplitude,
            frequency: message.frequency,
            phase_shift: message.phase_shift,
            steering: message.steering,
            heading: None,
        };
        if targets.iter().next().is_none() {
            return Err(IngestError::Empty);
        }
        Ok(targets)
    }

    fn joystick(&self, message: &ControlMessage) -> Result<MotionTargets, IngestError> {
        let x = message.x.ok_or(IngestError::MissingField("x"))?;
        let y = message.y.ok_or(IngestError::MissingField("y"))?;
        let cfg = &self.config;

        let axis = |value: f64, out: Bounds| {
            remap(value, cfg.joystick_range.min, cfg.joystick_range.max, out.min, out.max)
        };

        let heading = x * cfg.heading_scale;
        // An oscillating head cannot hold a steering offset, so `x` turns by
        // changing frequency and `y` reshapes the wave instead.
        let (frequency, phase_shift, steering) = match self.head {
            HeadMode::Steering => (axis(y, cfg.frequency_range), None, Some(heading * cfg.steering_gain)),
            HeadMode::Oscillate => (
                axis(x, cfg.oscillate_frequency_range),
                Some(axis(y, cfg.phase_shift_range)),
                None,
            ),
        };
        let amplitude = match message.distance {
            Some(distance) if distance > 0.0 => Some(remap(
                distance,
                cfg.distance_range.min,
                cfg.distance_range.max,
                cfg.near_amplitude,
                cfg.far_amplitude,
            )),
            _ => None,
        };

        Ok(MotionTargets {
            amplitude: message.amplitude.or(amplitude),
            frequency: Some(message.frequency.unwrap_or(frequency)),
            phase_shift: message.phase_shift.or(phase_shift),
            steering: message.steering.or(steering),
            heading: Some(heading),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn joystick_mapper() -> CommandMapper {
        CommandMapper::new(
            MappingConfig {
                policy: MappingPolicy::Joystick,
                ..MappingConfig::default()
            },
            HeadMode::Steering,
        )
    }

    #[test]
    fn test_json_field_names() {
        let message: ControlMessage =
            serde_json::from_str(r#"{"x": 0.1, "phaseShift": 45, "theta": 12.0}"#).unwrap();
        assert_eq!(message.x, Some(0.1));
        assert_eq!(message.phase_shift, Some(45.0));
        assert_eq!(message.y, None);
    }

    #[test]
    fn test_passthrough_takes_named_fields() {
        let mapper = CommandMapper::new(MappingConfig::default(), HeadMode::Steering);
        let message = ControlMessage {
            amplitude: Some(30.0),
            steering: Some(-5.0),
            x: Some(0.4),
            ..Default::default()
        };
        let targets = mapper.map(&message).unwrap();
        assert_eq!(targets.amplitude, Some(30.0));
        assert_eq!(targets.steering, Some(-5.0));
        assert_eq!(targets.frequency, None);
        assert_eq!(targets.iter().count(), 2);
    }

    #[test]
    fn test_passthrough_rejects_message_without_parameters() {
        let mapper = CommandMapper::new(MappingConfig::default(), HeadMode::Steering);
        let message = ControlMessage {
            x: Some(0.1),
            y: Some(0.1),
            ..Default::default()
        };
        assert_eq!(mapper.map(&message), Err(IngestError::Empty));
    }

    #[test]
    fn test_non_finite_rejects_whole_message() {
        let mapper = CommandMapper::new(MappingConfig::default(), HeadMode::Steering);
        let message = ControlMessage {
            amplitude: Some(30.0),
            frequency: Some(f64::NAN),
            ..Default::default()
        };
        assert!(matches!(
            mapper.map(&message),
            Err(IngestError::NonFinite { field: "frequency", .. })
        ));
    }

    #[test]
    fn test_joystick_requires_both_axes() {
        let mapper = joystick_mapper();
        let message = ControlMessage {
            x: Some(0.1),
            ..Default::default()
        };
        assert_eq!(mapper.map(&message), Err(IngestError::MissingField("y")));
    }

    #[test]
    fn test_joystick_derivation() {
        let mapper = joystick_mapper();
        let message = ControlMessage {
            x: Some(0.25),
            y: Some(0.0),
            distance: Some(0.5),
            ..Default::default()
        };
        let targets = mapper.map(&message).unwrap();
        assert_eq!(targets.heading, Some(15.0));
        assert_eq!(targets.steering, Some(22.5));
        assert!((targets.frequency.unwrap() - 1.1).abs() < 1e-9);
        assert!((targets.amplitude.unwrap() - 22.5).abs() < 1e-9);
        assert_eq!(targets.phase_shift, None);
    }

    #[test]
    fn test_joystick_explicit_fields_override() {
        let mapper = joystick_mapper();
        let message = ControlMessage {
            x: Some(0.0),
            y: Some(0.5),
            distance: Some(0.2),
            amplitude: Some(12.0),
            frequency: Some(0.6),
            phase_shift: Some(75.0),
            ..Default::default()
        };
        let targets = mapper.map(&message).unwrap();
        assert_eq!(targets.amplitude, Some(12.0));
        assert_eq!(targets.frequency, Some(0.6));
        assert_eq!(targets.phase_shift, Some(75.0));
    }

    #[test]
    fn test_joystick_without_distance_leaves_amplitude() {
        let mapper = joystick_mapper();
        let message = ControlMessage {
            x: Some(0.0),
            y: Some(2.0),
            distance: Some(0.0),
            ..Default::default()
        };
        let targets = mapper.map(&message).unwrap();
        assert_eq!(targets.amplitude, None);
        // y past the joystick range saturates at the top of the frequency range
        assert_eq!(targets.frequency, Some(2.0));
    }

    #[test]
    fn test_joystick_oscillating_head_drives_frequency_and_phase() {
        let mapper = CommandMapper::new(
            MappingConfig {
                policy: MappingPolicy::Joystick,
                ..MappingConfig::default()
            },
            HeadMode::Oscillate,
        );
        let message = ControlMessage {
            x: Some(-0.5),
            y: Some(0.0),
            ..Default::default()
        };
        let targets = mapper.map(&message).unwrap();
        assert_eq!(targets.frequency, Some(0.5));
        assert_eq!(targets.phase_shift, Some(60.0));
        assert_eq!(targets.steering, None);
        assert_eq!(targets.heading, Some(-30.0));

        let message = ControlMessage {
            x: Some(0.5),
            y: Some(0.5),
            ..Default::default()
        };
        let targets = mapper.map(&message).unwrap();
        assert_eq!(targets.frequency, Some(2.0));
        assert_eq!(targets.phase_shift, Some(90.0));
    }

    #[test]
    fn test_remap_inverse() {
        assert_eq!(remap(0.0, 0.0, 1.0, 40.0, 5.0), 40.0);
        assert_eq!(remap(1.0, 0.0, 1.0, 40.0, 5.0), 5.0);
        assert_eq!(remap(3.0, 0.0, 1.0, 40.0, 5.0), 5.0);
        assert_eq!(remap(0.5, 1.0, 1.0, 40.0, 5.0), 40.0);
    }
}
