// src/control.rs - The single control loop
use tokio::sync::broadcast;
use tokio::time::{Instant, MissedTickBehavior};

use crate::hardware::Actuator;
use crate::snake::Snake;
use crate::transport::{ControlRequest, MessageSource};

/// Service one request against the core. Rejections are logged and reported
/// back to the transport; they never change state.
pub fn handle_request(snake: &mut Snake, request: ControlRequest, now: Instant) {
    match request {
        ControlRequest::Update { message, respond_to } => {
            let result = snake.ingest(&message, now);
            if let Err(e) = &result {
                tracing::warn!("Discarding control message: {}", e);
            }
            if let Some(respond_to) = respond_to {
                let _ = respond_to.send(result);
            }
        }
        ControlRequest::Status { respond_to } => {
            let _ = respond_to.send(snake.status());
        }
    }
}

/// One loop iteration: at most one pending request, then the tick cadence.
///
/// Ingestion runs first so a tick always reflects the latest accepted message.
pub fn run_iteration<S, A>(snake: &mut Snake, source: &mut S, actuator: &mut A, now: Instant)
where
    S: MessageSource + ?Sized,
    A: Actuator,
{
    if let Some(request) = source.try_receive() {
        handle_request(snake, request, now);
    }
    snake.step(now, actuator);
}

/// Drive the core until `shutdown` fires, then leave the actuators neutral.
///
/// Returns the core so callers can inspect its final state.
pub async fn run_control_loop<S, A>(
    mut snake: Snake,
    mut source: S,
    mut actuator: A,
    mut shutdown: broadcast::Receiver<()>,
) -> Snake
where
    S: MessageSource,
    A: Actuator,
{
    tracing::info!("Control loop started - motors disabled until data received");
    snake.hold_neutral(&mut actuator);

    let mut interval = tokio::time::interval(snake.poll_period());
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                tracing::info!("Control loop shutting down");
                break;
            }
            _ = interval.tick() => {
                run_iteration(&mut snake, &mut source, &mut actuator, Instant::now());
            }
        }
    }

    snake.hold_neutral(&mut actuator);
    snake
}
