//! Contains the data models for API requests and responses.

use serde::Serialize;

use crate::snake::Acknowledgement;

/// Echo returned for every accepted control message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControlResponse {
    pub status: &'static str,
    pub msg_count: u64,
    pub x: f64,
    pub y: f64,
    pub heading: f64,
    pub distance: f64,
    pub amplitude: f64,
    pub frequency: f64,
    #[serde(rename = "phaseShift")]
    pub phase_shift: f64,
    pub steering: f64,
}

impl From<&Acknowledgement> for ControlResponse {
    fn from(ack: &Acknowledgement) -> Self {
        Self {
            status: "ok",
            msg_count: ack.msg_count,
            x: ack.inputs.x,
            y: ack.inputs.y,
            heading: ack.inputs.heading,
            distance: ack.inputs.distance,
            amplitude: ack.parameters.amplitude,
            frequency: ack.parameters.frequency,
            phase_shift: ack.parameters.phase_shift,
            steering: ack.parameters.steering,
        }
    }
}

/// Body of every failed request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorResponse {
    pub status: &'static str,
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl ToString) -> Self {
        Self {
            status: "error",
            error: error.to_string(),
        }
    }
}
