// src/snake.rs - The control core: ingestion, smoothing, watchdog and gait in one owner
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

use crate::config::{Config, ConfigError};
use crate::gait::GaitGenerator;
use crate::hardware::Actuator;
use crate::ingestion::{CommandMapper, ControlMessage, IngestError};
use crate::params::{MotionParameters, ParamField, ParameterStore};
use crate::safety::AngleEnvelope;
use crate::scheduler::{ClockState, TickScheduler};
use crate::smoothing::SmoothingFilter;
use crate::telemetry::{Heartbeat, StatusReport};
use crate::transport::TransportError;
use crate::watchdog::{ActivityState, Transition, Watchdog};

#[derive(Debug, Error)]
pub enum SnakeError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("Actuator error: {0}")]
    Actuator(#[from] std::io::Error),
}

/// Raw joystick inputs from the last accepted message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RawInputs {
    pub x: f64,
    pub y: f64,
    pub distance: f64,
    pub heading: f64,
}

/// What one accepted message changed.
#[derive(Debug, Clone, PartialEq)]
pub struct Acknowledgement {
    pub msg_count: u64,
    /// Fields the message touched, with the value now in effect.
    pub applied: Vec<(ParamField, f64)>,
    pub parameters: MotionParameters,
    pub inputs: RawInputs,
    pub state: ActivityState,
}

/// Owns every piece of mutable control state.
///
/// There is exactly one writer: whoever holds `&mut Snake`. Transports never
/// touch it directly; they hand messages to the control loop, which calls
/// [`Snake::ingest`] and [`Snake::step`] from a single task.
#[derive(Debug)]
pub struct Snake {
    store: ParameterStore,
    filter: SmoothingFilter,
    mapper: CommandMapper,
    generator: GaitGenerator,
    envelope: AngleEnvelope,
    watchdog: Watchdog,
    scheduler: TickScheduler,
    clock: ClockState,
    heartbeat: Heartbeat,
    poll_period: Duration,
    msg_count: u64,
    inputs: RawInputs,
    pose: Vec<f64>,
}

impl Snake {
    /// Build the core from an already validated config.
    pub fn new(config: &Config) -> Self {
        let gait = &config.gait;
        Self {
            store: ParameterStore::new(config.defaults, config.limits),
            filter: SmoothingFilter::new(config.smoothing.alpha, config.defaults),
            mapper: CommandMapper::new(config.mapping.clone(), gait.head),
            generator: GaitGenerator::new(gait.segments, gait.center, gait.head),
            envelope: AngleEnvelope::new(gait.center, gait.angle_limit),
            watchdog: Watchdog::new(config.watchdog.timeout()),
            scheduler: TickScheduler::new(gait.tick_period()),
            clock: ClockState::default(),
            heartbeat: Heartbeat::new(config.watchdog.heartbeat()),
            poll_period: gait.poll_period(),
            msg_count: 0,
            inputs: RawInputs::default(),
            pose: Vec::with_capacity(gait.segments),
        }
    }

    /// Apply one control message received at `now`.
    ///
    /// Invalid messages leave every piece of state untouched, including the
    /// watchdog.
    pub fn ingest(&mut self, message: &ControlMessage, now: Instant) -> Result<Acknowledgement, IngestError> {
        let targets = self.mapper.map(message)?;

        if let Some(Transition::Activated) = self.watchdog.feed(now) {
            tracing::info!("First data received - snake activated");
        }

        let mut applied = Vec::with_capacity(4);
        for (field, target) in targets.iter() {
            let smoothed = self.filter.blend(field, target);
            let stored = self.store.write(field, smoothed);
            self.filter.settle(field, stored);
            applied.push((field, stored));
        }

        self.msg_count += 1;
        if let Some(x) = message.x {
            self.inputs.x = x;
        }
        if let Some(y) = message.y {
            self.inputs.y = y;
        }
        if let Some(distance) = message.distance {
            self.inputs.distance = distance;
        }
        if let Some(heading) = targets.heading {
            self.inputs.heading = heading;
        }

        if self.msg_count % 10 == 0 {
            tracing::debug!("MSG #{}: {:?}", self.msg_count, message);
        }

        Ok(Acknowledgement {
            msg_count: self.msg_count,
            applied,
            parameters: self.store.current(),
            inputs: self.inputs,
            state: self.watchdog.state(),
        })
    }

    /// One pass of the tick cadence. Returns the pose written to `actuator`
    /// when a tick was due, `None` otherwise.
    pub fn step(&mut self, now: Instant, actuator: &mut dyn Actuator) -> Option<&[f64]> {
        if self.heartbeat.due(now) {
            self.status().log();
        }
        if !self.scheduler.poll(now) {
            return None;
        }

        if let Some(Transition::TimedOut { silent_for }) = self.watchdog.check(now) {
            tracing::warn!(
                "Data timeout after {} ms - holding neutral pose",
                silent_for.as_millis()
            );
        }

        if self.watchdog.is_active() {
            self.clock.advance(self.scheduler.period());
            let params = self.store.current();
            self.generator.angles_into(self.clock.elapsed(), &params, &mut self.pose);
        } else {
            self.generator.neutral_into(&mut self.pose);
        }

        self.write_pose(actuator);
        Some(self.pose.as_slice())
    }

    /// Write the neutral pose immediately, independent of the tick cadence.
    pub fn hold_neutral(&mut self, actuator: &mut dyn Actuator) {
        self.generator.neutral_into(&mut self.pose);
        self.write_pose(actuator);
    }

    fn write_pose(&mut self, actuator: &mut dyn Actuator) {
        for (segment, angle) in self.pose.iter_mut().enumerate() {
            *angle = self.envelope.clamp(*angle);
            actuator.set_angle(segment, *angle);
        }
        actuator.flush();
        tracing::trace!("pose {:?}", self.pose);
    }

    pub fn status(&self) -> StatusReport {
        let params = self.store.current();
        StatusReport {
            state: self.watchdog.state(),
            msg_count: self.msg_count,
            amplitude: params.amplitude,
            frequency: params.frequency,
            phase_shift: params.phase_shift,
            steering: params.steering,
            elapsed_s: self.clock.elapsed(),
            segments: self.generator.segments(),
        }
    }

    pub fn state(&self) -> ActivityState {
        self.watchdog.state()
    }

    pub fn parameters(&self) -> MotionParameters {
        self.store.current()
    }

    pub fn elapsed(&self) -> f64 {
        self.clock.elapsed()
    }

    pub fn msg_count(&self) -> u64 {
        self.msg_count
    }

    pub fn poll_period(&self) -> Duration {
        self.poll_period
    }

    pub fn envelope(&self) -> AngleEnvelope {
        self.envelope
    }
}
