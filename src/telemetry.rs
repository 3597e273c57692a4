// src/telemetry.rs - Status reports and the periodic heartbeat
use serde::Serialize;
use std::time::Duration;
use tokio::time::Instant;

use crate::watchdog::ActivityState;

/// Snapshot of the control core, for humans and dashboards only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusReport {
    pub state: ActivityState,
    pub msg_count: u64,
    pub amplitude: f64,
    pub frequency: f64,
    #[serde(rename = "phaseShift")]
    pub phase_shift: f64,
    pub steering: f64,
    pub elapsed_s: f64,
    pub segments: usize,
}

impl StatusReport {
    pub fn log(&self) {
        let motors = match self.state {
            ActivityState::Active => "active",
            ActivityState::Idle => "disabled, waiting for data",
        };
        tracing::info!(
            state = %self.state,
            msg_count = self.msg_count,
            "Snake heartbeat - motors {}", motors
        );
        if self.state == ActivityState::Active {
            tracing::info!(
                "Current settings - amplitude: {:.2}, frequency: {:.2}, phase shift: {:.2}, steering: {:.2}",
                self.amplitude,
                self.frequency,
                self.phase_shift,
                self.steering
            );
        }
    }
}

/// Fires once per period, the first time one full period after it is started.
#[derive(Debug, Clone)]
pub struct Heartbeat {
    period: Duration,
    last: Option<Instant>,
}

impl Heartbeat {
    pub fn new(period: Duration) -> Self {
        Self { period, last: None }
    }

    pub fn due(&mut self, now: Instant) -> bool {
        match self.last {
            None => {
                self.last = Some(now);
                false
            }
            Some(last) if now.saturating_duration_since(last) >= self.period => {
                self.last = Some(now);
                true
            }
            Some(_) => false,
        }
    }
}
