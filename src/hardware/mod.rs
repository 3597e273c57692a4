// src/hardware/mod.rs - Actuator interface and the built-in actuators
pub mod serial;

use std::sync::{Arc, Mutex};

pub use serial::SerialServoBus;

/// Consumer of per-segment target angles.
///
/// Calls are fire-and-forget: an implementation must never block the control
/// loop. Hardware-level range limits remain the implementation's business.
pub trait Actuator: Send {
    fn set_angle(&mut self, segment: usize, degrees: f64);

    /// Called once after every segment of a tick has been set.
    fn flush(&mut self) {}
}

impl<A: Actuator + ?Sized> Actuator for Box<A> {
    fn set_angle(&mut self, segment: usize, degrees: f64) {
        (**self).set_angle(segment, degrees);
    }

    fn flush(&mut self) {
        (**self).flush();
    }
}

/// Dry-run actuator: angles only go to the trace log.
#[derive(Debug, Default)]
pub struct LogActuator;

impl Actuator for LogActuator {
    fn set_angle(&mut self, segment: usize, degrees: f64) {
        tracing::trace!("servo {} -> {:.1}°", segment, degrees);
    }
}

#[derive(Debug, Default)]
struct Recording {
    pending: Vec<f64>,
    frames: Vec<Vec<f64>>,
}

/// Keeps every pose it is sent. Clones share the same recording, so a test can
/// hand one clone to the control loop and inspect another.
#[derive(Debug, Clone, Default)]
pub struct RecordingActuator {
    inner: Arc<Mutex<Recording>>,
}

impl RecordingActuator {
    pub fn new() -> Self {
        Self::default()
    }

    /// All completed frames, oldest first.
    pub fn frames(&self) -> Vec<Vec<f64>> {
        match self.inner.lock() {
            Ok(recording) => recording.frames.clone(),
            Err(poisoned) => poisoned.into_inner().frames.clone(),
        }
    }

    pub fn last_frame(&self) -> Option<Vec<f64>> {
        self.frames().pop()
    }

    pub fn frame_count(&self) -> usize {
        match self.inner.lock() {
            Ok(recording) => recording.frames.len(),
            Err(poisoned) => poisoned.into_inner().frames.len(),
        }
    }
}

impl Actuator for RecordingActuator {
    fn set_angle(&mut self, segment: usize, degrees: f64) {
        let Ok(mut recording) = self.inner.lock() else { return };
        if recording.pending.len() <= segment {
            recording.pending.resize(segment + 1, f64::NAN);
        }
        recording.pending[segment] = degrees;
    }

    fn flush(&mut self) {
        let Ok(mut recording) = self.inner.lock() else { return };
        let frame = std::mem::take(&mut recording.pending);
        recording.frames.push(frame);
    }
}
