// src/scheduler.rs - Fixed-interval tick driver and gait time base
use std::time::Duration;
use tokio::time::Instant;

/// Elapsed gait time in seconds. Only the tick scheduler advances it and it is
/// never reset, so reactivation resumes the wave where it stopped.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ClockState {
    elapsed: f64,
}

impl ClockState {
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn advance(&mut self, dt: Duration) {
        self.elapsed += dt.as_secs_f64();
    }
}

/// Non-blocking tick gate: `poll` is called as often as the loop likes and
/// reports `true` at most once per period.
///
/// Missed ticks are dropped rather than replayed in a burst; the gait clock
/// always advances by exactly one period per reported tick.
#[derive(Debug, Clone)]
pub struct TickScheduler {
    period: Duration,
    last_tick: Option<Instant>,
    ticks: u64,
}

impl TickScheduler {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            last_tick: None,
            ticks: 0,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn poll(&mut self, now: Instant) -> bool {
        let due = match self.last_tick {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.period,
        };
        if due {
            self.last_tick = Some(now);
            self.ticks += 1;
        }
        due
    }
}
