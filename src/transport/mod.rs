//! Control-message transports.
//!
//! Every transport runs in its own task, reduces its input to a
//! [`ControlMessage`], and hands it to the control loop as a
//! [`ControlRequest`]. The loop polls with [`MessageSource::try_receive`] and
//! never waits on a transport.

pub mod serial;
pub mod tcp;

use std::collections::VecDeque;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use crate::ingestion::{ControlMessage, IngestError};
use crate::snake::Acknowledgement;
use crate::telemetry::StatusReport;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("control loop is not running")]
    ChannelClosed,
    #[error("rejected: {0}")]
    Rejected(#[from] IngestError),
}

/// Represents a request sent from a transport task to the control loop.
#[derive(Debug)]
pub enum ControlRequest {
    /// Apply a control message.
    Update {
        message: ControlMessage,
        /// Where to send the outcome, if the transport answers its peer.
        respond_to: Option<oneshot::Sender<Result<Acknowledgement, IngestError>>>,
    },
    /// Report current state without changing it.
    Status {
        respond_to: oneshot::Sender<StatusReport>,
    },
}

pub type RequestSender = mpsc::Sender<ControlRequest>;
pub type RequestReceiver = mpsc::Receiver<ControlRequest>;

/// Bounded channel between transports and the control loop.
pub fn control_channel(capacity: usize) -> (RequestSender, RequestReceiver) {
    mpsc::channel(capacity)
}

/// Non-blocking source of control requests.
pub trait MessageSource {
    /// Returns the next pending request, or `None` right away if there is none.
    fn try_receive(&mut self) -> Option<ControlRequest>;
}

impl MessageSource for RequestReceiver {
    fn try_receive(&mut self) -> Option<ControlRequest> {
        self.try_recv().ok()
    }
}

impl MessageSource for VecDeque<ControlRequest> {
    fn try_receive(&mut self) -> Option<ControlRequest> {
        self.pop_front()
    }
}

/// Send `message` to the control loop and wait for the outcome.
pub async fn submit(
    requests: &RequestSender,
    message: ControlMessage,
) -> Result<Acknowledgement, TransportError> {
    let (respond_to, response) = oneshot::channel();
    requests
        .send(ControlRequest::Update {
            message,
            respond_to: Some(respond_to),
        })
        .await
        .map_err(|_| TransportError::ChannelClosed)?;
    match response.await {
        Ok(result) => Ok(result?),
        Err(_) => Err(TransportError::ChannelClosed),
    }
}

/// Ask the control loop for a status report.
pub async fn query_status(requests: &RequestSender) -> Result<StatusReport, TransportError> {
    let (respond_to, response) = oneshot::channel();
    requests
        .send(ControlRequest::Status { respond_to })
        .await
        .map_err(|_| TransportError::ChannelClosed)?;
    response.await.map_err(|_| TransportError::ChannelClosed)
}
