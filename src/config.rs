//! # Snake Host Configuration
//!
//! Everything tunable about a deployment lives in one TOML file. Every field
//! has a default, so an empty file describes the stock five-segment snake.
//!
//! ## Example: TOML Configuration
//!
//! ```toml
//! [gait]
//! segments = 5
//! head = "steering"
//! tick_ms = 10
//!
//! [limits]
//! amplitude = { min = 5.0, max = 50.0 }
//!
//! [smoothing]
//! alpha = 0.8
//!
//! [watchdog]
//! timeout_ms = 1000
//!
//! [mapping]
//! policy = "joystick"
//!
//! [transport]
//! kind = "http"
//! bind = "0.0.0.0:8080"
//! ```
//!
//! Call [`Config::validate`] after loading; `load_config` does this for you.

// src/config.rs - Single configuration file
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::gait::HeadMode;
use crate::ingestion::MappingConfig;
use crate::params::{Bounds, MotionParameters, ParamField, ParameterBounds};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration struct.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub gait: GaitConfig,
    #[serde(default)]
    pub limits: ParameterBounds,
    #[serde(default)]
    pub defaults: MotionParameters,
    #[serde(default)]
    pub smoothing: SmoothingConfig,
    #[serde(default)]
    pub watchdog: WatchdogConfig,
    #[serde(default)]
    pub mapping: MappingConfig,
    #[serde(default)]
    pub transport: TransportConfig,
    #[serde(default)]
    pub actuator: ActuatorConfig,
}

/// Segment chain geometry and loop timing.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GaitConfig {
    #[serde(default = "default_segments")]
    pub segments: usize,
    /// Neutral servo angle in degrees.
    #[serde(default = "default_center")]
    pub center: f64,
    #[serde(default)]
    pub head: HeadMode,
    /// Hard per-segment envelope, `center ± angle_limit`.
    #[serde(default = "default_angle_limit")]
    pub angle_limit: f64,
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
    /// How often the control loop wakes to look for input.
    #[serde(default = "default_poll_ms")]
    pub poll_ms: u64,
}

impl Default for GaitConfig {
    fn default() -> Self {
        Self {
            segments: default_segments(),
            center: default_center(),
            head: HeadMode::default(),
            angle_limit: default_angle_limit(),
            tick_ms: default_tick_ms(),
            poll_ms: default_poll_ms(),
        }
    }
}

impl GaitConfig {
    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn poll_period(&self) -> Duration {
        Duration::from_millis(self.poll_ms)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SmoothingConfig {
    /// Weight given to the previous value, strictly between 0 and 1.
    #[serde(default = "default_alpha")]
    pub alpha: f64,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self { alpha: default_alpha() }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WatchdogConfig {
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_heartbeat_ms")]
    pub heartbeat_ms: u64,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            heartbeat_ms: default_heartbeat_ms(),
        }
    }
}

impl WatchdogConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn heartbeat(&self) -> Duration {
        Duration::from_millis(self.heartbeat_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// `PARAM:VALUE` lines over a serial port.
    #[default]
    Serial,
    /// Newline-delimited JSON objects over TCP.
    Tcp,
    /// JSON over HTTP POST.
    Http,
}

/// Where control messages come from.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TransportConfig {
    #[serde(default)]
    pub kind: TransportKind,
    #[serde(default = "default_transport_serial")]
    pub serial: String,
    #[serde(default = "default_baud")]
    pub baud: u32,
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            kind: TransportKind::default(),
            serial: default_transport_serial(),
            baud: default_baud(),
            bind: default_bind(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActuatorKind {
    /// Dry run: angles go to the trace log only.
    #[default]
    Log,
    /// Angle lines written to a servo controller board over serial.
    Serial,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ActuatorConfig {
    #[serde(default)]
    pub kind: ActuatorKind,
    #[serde(default = "default_actuator_serial")]
    pub serial: String,
    #[serde(default = "default_baud")]
    pub baud: u32,
}

impl Default for ActuatorConfig {
    fn default() -> Self {
        Self {
            kind: ActuatorKind::default(),
            serial: default_actuator_serial(),
            baud: default_baud(),
        }
    }
}

impl Config {
    /// Reject values the control core cannot run with safely.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if self.gait.segments == 0 {
            return invalid("gait.segments must be at least 1".to_string());
        }
        if self.gait.tick_ms == 0 {
            return invalid("gait.tick_ms must be > 0".to_string());
        }
        if self.gait.poll_ms == 0 {
            return invalid("gait.poll_ms must be > 0".to_string());
        }
        if !self.gait.center.is_finite() {
            return invalid(format!("gait.center must be a finite angle, got {}", self.gait.center));
        }
        if !(self.gait.angle_limit.is_finite() && self.gait.angle_limit >= 0.0) {
            return invalid("gait.angle_limit must be a non-negative number".to_string());
        }
        if !(self.smoothing.alpha > 0.0 && self.smoothing.alpha < 1.0) {
            return invalid(format!(
                "smoothing.alpha must be strictly between 0 and 1, got {}",
                self.smoothing.alpha
            ));
        }
        if self.watchdog.timeout_ms == 0 {
            return invalid("watchdog.timeout_ms must be > 0".to_string());
        }
        for field in ParamField::ALL {
            let bounds: Bounds = self.limits.for_field(field);
            if !(bounds.min.is_finite() && bounds.max.is_finite()) || bounds.min > bounds.max {
                return invalid(format!(
                    "limits.{}: min {} must not exceed max {}",
                    field, bounds.min, bounds.max
                ));
            }
            let neutral = self.defaults.get(field);
            if !bounds.contains(neutral) {
                return invalid(format!(
                    "defaults.{} = {} lies outside [{}, {}]",
                    field, neutral, bounds.min, bounds.max
                ));
            }
        }
        Ok(())
    }
}

// Default value functions
fn default_segments() -> usize { 5 }
fn default_center() -> f64 { 90.0 }
fn default_angle_limit() -> f64 { 30.0 }
fn default_tick_ms() -> u64 { 10 }
fn default_poll_ms() -> u64 { 1 }
fn default_alpha() -> f64 { 0.8 }
fn default_timeout_ms() -> u64 { 1000 }
fn default_heartbeat_ms() -> u64 { 5000 }
fn default_transport_serial() -> String { "/dev/ttyACM0".to_string() }
fn default_actuator_serial() -> String { "/dev/ttyUSB0".to_string() }
fn default_baud() -> u32 { 115200 }
fn default_bind() -> String { "0.0.0.0:8080".to_string() }

/// Load and validate configuration from a TOML file at the given path.
pub fn load_config(path: &str) -> Result<Config, ConfigError> {
    let config: Config = match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str(&contents) {
            Ok(config) => config,
            Err(e) => {
                tracing::error!("Failed to parse config TOML: {}", e);
                return Err(ConfigError::Toml(e));
            }
        },
        Err(e) => {
            tracing::error!("Failed to read config file '{}': {}", path, e);
            return Err(ConfigError::Io(e));
        }
    };
    config.validate()?;
    Ok(config)
}
