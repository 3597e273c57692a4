// src/hardware/serial.rs - Servo controller board on a serial line
use serial2_tokio::SerialPort;
use std::fmt::Write as _;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;

use super::Actuator;

/// Counters shared with the writer task.
#[derive(Debug, Default)]
pub struct ServoBusStats {
    pub frames_sent: AtomicU64,
    pub bytes_sent: AtomicU64,
    pub write_errors: AtomicU64,
}

/// Forwards each tick's pose to a servo controller board as text lines:
///
/// ```text
/// S0:90.0
/// S1:104.7
/// ```
///
/// The control loop only formats and publishes; a background task owns the
/// port and does the writing, so a slow or stalled board never blocks a tick.
/// Only the newest frame is kept: a board that recovers from a stall gets the
/// current pose, never a backlog of stale ones.
pub struct SerialServoBus {
    frame: String,
    frame_tx: watch::Sender<String>,
    stats: Arc<ServoBusStats>,
    port_name: String,
}

impl SerialServoBus {
    /// Open `port_name` and start the writer task. Failure here is fatal to startup.
    pub fn open(port_name: &str, baud_rate: u32) -> Result<Self, std::io::Error> {
        tracing::info!("Opening servo bus on {} at {} baud", port_name, baud_rate);
        let port = Arc::new(SerialPort::open(port_name, baud_rate)?);
        let (frame_tx, frame_rx) = watch::channel(String::new());
        let stats = Arc::new(ServoBusStats::default());

        tokio::spawn(write_frames(port, frame_rx, stats.clone()));

        Ok(Self::with_sender(port_name, frame_tx, stats))
    }

    fn with_sender(
        port_name: &str,
        frame_tx: watch::Sender<String>,
        stats: Arc<ServoBusStats>,
    ) -> Self {
        Self {
            frame: String::with_capacity(128),
            frame_tx,
            stats,
            port_name: port_name.to_string(),
        }
    }

    pub fn stats(&self) -> Arc<ServoBusStats> {
        self.stats.clone()
    }
}

async fn write_frames(
    port: Arc<SerialPort>,
    mut frame_rx: watch::Receiver<String>,
    stats: Arc<ServoBusStats>,
) {
    while frame_rx.changed().await.is_ok() {
        let frame = frame_rx.borrow_and_update().clone();
        match port.write_all(frame.as_bytes()).await {
            Ok(()) => {
                stats.frames_sent.fetch_add(1, Ordering::Relaxed);
                stats.bytes_sent.fetch_add(frame.len() as u64, Ordering::Relaxed);
            }
            Err(e) => {
                // The next frame supersedes this one.
                stats.write_errors.fetch_add(1, Ordering::Relaxed);
                tracing::warn!("Servo bus write error: {}", e);
            }
        }
    }
    tracing::info!("Servo bus writer task terminated");
}

impl Actuator for SerialServoBus {
    fn set_angle(&mut self, segment: usize, degrees: f64) {
        let _ = writeln!(self.frame, "S{}:{:.1}", segment, degrees);
    }

    fn flush(&mut self) {
        if self.frame.is_empty() {
            return;
        }
        let frame = std::mem::replace(&mut self.frame, String::with_capacity(128));
        if self.frame_tx.send(frame).is_err() {
            tracing::error!("Servo bus writer for {} is gone; dropping frame", self.port_name);
        }
    }
}

impl std::fmt::Debug for SerialServoBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialServoBus")
            .field("port_name", &self.port_name)
            .finish()
    }
}
