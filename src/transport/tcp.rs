// src/transport/tcp.rs - Newline-delimited JSON control over TCP
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use super::serial::LineBuffer;
use super::{RequestSender, TransportError, submit};
use crate::ingestion::{ControlMessage, IngestError};
use crate::web::models::ControlResponse;

/// Accept connections until the control loop goes away.
///
/// Each client gets its own task; a misbehaving client only ever affects its
/// own connection.
pub async fn serve_tcp(listener: TcpListener, requests: RequestSender) -> Result<(), TransportError> {
    tracing::info!("TCP control listening on {}", listener.local_addr()?);
    loop {
        let (stream, peer) = listener.accept().await?;
        if requests.is_closed() {
            return Err(TransportError::ChannelClosed);
        }
        tracing::info!("Controller connected from {}", peer);
        let requests = requests.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, requests).await {
                tracing::warn!("Connection {} ended with error: {}", peer, e);
            } else {
                tracing::info!("Controller {} disconnected", peer);
            }
        });
    }
}

/// Lines share the serial link's framing, including its length cap.
async fn handle_connection(stream: TcpStream, requests: RequestSender) -> Result<(), TransportError> {
    let (mut reader, mut writer) = stream.into_split();
    let mut framer = LineBuffer::new();
    let mut chunk = [0u8; 512];
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        for line in framer.push(&chunk[..n]) {
            if line.trim().is_empty() {
                continue;
            }
            let reply = respond_to_json(&line, &requests).await?;
            write_line(&mut writer, &reply).await?;
        }
    }
}

/// Produce the JSON reply for one inbound line.
pub async fn respond_to_json(line: &str, requests: &RequestSender) -> Result<String, TransportError> {
    let message: ControlMessage = match serde_json::from_str(line) {
        Ok(message) => message,
        Err(e) => {
            let e = IngestError::Malformed(e.to_string());
            tracing::warn!("TCP RX rejected: {}", e);
            return Ok(error_line(&e));
        }
    };
    match submit(requests, message).await {
        Ok(ack) => serde_json::to_string(&ControlResponse::from(&ack))
            .map_err(|e| TransportError::Io(std::io::Error::other(e))),
        Err(TransportError::Rejected(e)) => Ok(error_line(&e)),
        Err(e) => Err(e),
    }
}

fn error_line(error: &IngestError) -> String {
    json!({ "status": "error", "error": error.to_string() }).to_string()
}

async fn write_line<W: AsyncWrite + Unpin>(writer: &mut W, line: &str) -> std::io::Result<()> {
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\n").await
}
