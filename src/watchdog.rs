// src/watchdog.rs - Control-link liveness monitor
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

/// Whether the gait is allowed to drive the actuators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ActivityState {
    #[default]
    Idle,
    Active,
}

impl fmt::Display for ActivityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActivityState::Idle => f.write_str("IDLE"),
            ActivityState::Active => f.write_str("ACTIVE"),
        }
    }
}

/// A state change reported by the watchdog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Activated,
    TimedOut { silent_for: Duration },
}

/// Tracks the last valid control message and drops to `Idle` once the link has
/// been silent for longer than the timeout.
#[derive(Debug, Clone)]
pub struct Watchdog {
    timeout: Duration,
    state: ActivityState,
    last_valid: Option<Instant>,
}

impl Watchdog {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            state: ActivityState::Idle,
            last_valid: None,
        }
    }

    pub fn state(&self) -> ActivityState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == ActivityState::Active
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn last_valid(&self) -> Option<Instant> {
        self.last_valid
    }

    /// Feed the watchdog with a structurally valid message received at `now`.
    pub fn feed(&mut self, now: Instant) -> Option<Transition> {
        self.last_valid = Some(now);
        match self.state {
            ActivityState::Idle => {
                self.state = ActivityState::Active;
                Some(Transition::Activated)
            }
            ActivityState::Active => None,
        }
    }

    /// Called once per tick. Drops to `Idle` when `now - last_valid > timeout`.
    pub fn check(&mut self, now: Instant) -> Option<Transition> {
        if self.state != ActivityState::Active {
            return None;
        }
        let last = self.last_valid?;
        let silent_for = now.saturating_duration_since(last);
        if silent_for > self.timeout {
            self.state = ActivityState::Idle;
            return Some(Transition::TimedOut { silent_for });
        }
        None
    }
}
