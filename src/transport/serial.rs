// src/transport/serial.rs - PARAM:VALUE line protocol over a serial port
//! Line-oriented control protocol.
//!
//! ```text
//! host  <- STATUS:READY                    sent once when the port opens
//! ctrl  -> HELLO                           -> HELLO:OK
//! ctrl  -> AMP:30,FREQ:1.2                 -> AMP:26.00 / FREQ:0.88
//! ctrl  -> STATUS                          -> STATUS:OK / STATUS_DETAILS:{...}
//! ctrl  -> AMP:abc                         -> ERROR:malformed message: ...
//! ```
//!
//! Recognised keys: `AMP`, `FREQ`, `PHASE`, `STEER`, `X`, `Y`, `DIST`. Several
//! pairs on one line form one message.

use serial2_tokio::SerialPort;
use std::sync::Arc;

use super::{RequestSender, TransportError, query_status, submit};
use crate::ingestion::{ControlMessage, IngestError};

/// Longest line accepted before the buffer is discarded.
pub const MAX_LINE_LEN: usize = 256;

/// A parsed protocol line.
#[derive(Debug, Clone, PartialEq)]
pub enum LineCommand {
    Hello,
    Status,
    Update(ControlMessage),
}

/// Parse one line (without its terminator).
pub fn parse_line(line: &str) -> Result<LineCommand, IngestError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(IngestError::Malformed("empty line".to_string()));
    }
    let upper = line.to_ascii_uppercase();
    if upper.starts_with("STATUS") {
        return Ok(LineCommand::Status);
    }
    if upper.starts_with("HELLO") {
        return Ok(LineCommand::Hello);
    }

    let mut message = ControlMessage::default();
    for pair in line.split(',') {
        let (key, value) = pair
            .split_once(':')
            .ok_or_else(|| IngestError::Malformed(format!("expected PARAM:VALUE, got '{}'", pair.trim())))?;
        let value: f64 = value
            .trim()
            .parse()
            .map_err(|_| IngestError::Malformed(format!("'{}' is not a number", value.trim())))?;
        let slot = match key.trim().to_ascii_uppercase().as_str() {
            "AMP" | "AMPLITUDE" => &mut message.amplitude,
            "FREQ" | "FREQUENCY" => &mut message.frequency,
            "PHASE" | "PHASESHIFT" => &mut message.phase_shift,
            "STEER" | "STEERING" => &mut message.steering,
            "X" => &mut message.x,
            "Y" => &mut message.y,
            "DIST" | "DISTANCE" => &mut message.distance,
            other => return Err(IngestError::Malformed(format!("unknown parameter '{}'", other))),
        };
        *slot = Some(value);
    }
    Ok(LineCommand::Update(message))
}

/// Produce the reply lines for one inbound line.
pub async fn respond_to_line(line: &str, requests: &RequestSender) -> Result<Vec<String>, TransportError> {
    let command = match parse_line(line) {
        Ok(command) => command,
        Err(e) => {
            tracing::warn!("Serial RX rejected '{}': {}", line.trim(), e);
            return Ok(vec![format!("ERROR:{}", e)]);
        }
    };
    match command {
        LineCommand::Hello => Ok(vec!["HELLO:OK".to_string()]),
        LineCommand::Status => {
            let report = query_status(requests).await?;
            let details = serde_json::to_string(&report)
                .map_err(|e| TransportError::Io(std::io::Error::other(e)))?;
            Ok(vec!["STATUS:OK".to_string(), format!("STATUS_DETAILS:{}", details)])
        }
        LineCommand::Update(message) => match submit(requests, message).await {
            Ok(ack) => Ok(ack
                .applied
                .iter()
                .map(|(field, value)| format!("{}:{:.2}", field.wire_name(), value))
                .collect()),
            Err(TransportError::Rejected(e)) => Ok(vec![format!("ERROR:{}", e)]),
            Err(e) => Err(e),
        },
    }
}

/// Accumulates raw bytes and splits them into lines.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buffer: Vec<u8>,
    overflowed: bool,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed bytes, returning every line they complete. Lines longer than
    /// [`MAX_LINE_LEN`] are dropped whole.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for &byte in bytes {
            match byte {
                b'\n' => {
                    if self.overflowed {
                        tracing::warn!("Dropped control line longer than {} bytes", MAX_LINE_LEN);
                    } else {
                        let line = String::from_utf8_lossy(&self.buffer);
                        let line = line.trim_end_matches('\r');
                        if !line.is_empty() {
                            lines.push(line.to_string());
                        }
                    }
                    self.buffer.clear();
                    self.overflowed = false;
                }
                _ if self.overflowed => {}
                _ if self.buffer.len() >= MAX_LINE_LEN => {
                    self.buffer.clear();
                    self.overflowed = true;
                }
                _ => self.buffer.push(byte),
            }
        }
        lines
    }
}

/// The serial control link.
pub struct SerialLink {
    port: Arc<SerialPort>,
    port_name: String,
}

impl SerialLink {
    /// Open the port. Failure here is fatal to startup.
    pub fn open(port_name: &str, baud_rate: u32) -> Result<Self, TransportError> {
        tracing::info!("Opening control link on {} at {} baud", port_name, baud_rate);
        let port = SerialPort::open(port_name, baud_rate)?;
        Ok(Self {
            port: Arc::new(port),
            port_name: port_name.to_string(),
        })
    }

    async fn write_line(&self, line: &str) -> Result<(), TransportError> {
        tracing::debug!("Serial TX: {}", line);
        self.port.write_all(format!("{}\n", line).as_bytes()).await?;
        Ok(())
    }

    /// Serve the link until the port fails or the control loop goes away.
    pub async fn run(self, requests: RequestSender) -> Result<(), TransportError> {
        self.write_line("STATUS:READY").await?;
        let mut framer = LineBuffer::new();
        let mut chunk = [0u8; 256];
        loop {
            let n = self.port.read(&mut chunk).await?;
            if n == 0 {
                tracing::info!("Serial connection {} closed by remote", self.port_name);
                return Ok(());
            }
            for line in framer.push(&chunk[..n]) {
                tracing::debug!("Serial RX: {}", line);
                for reply in respond_to_line(&line, &requests).await? {
                    self.write_line(&reply).await?;
                }
            }
        }
    }
}

impl std::fmt::Debug for SerialLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialLink")
            .field("port_name", &self.port_name)
            .finish()
    }
}
