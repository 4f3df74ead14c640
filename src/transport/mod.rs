pub mod mqtt;
pub mod simulator;

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use log::warn;

use crate::buffer::IngestionBuffer;
use crate::config::{AppConfig, TransportKind};
use crate::decoder::{decode_frame, DecodeError};
use crate::types::StatusCell;
use crate::utils::now_millis;

/// Link failures. None of these is fatal: the transport loop logs them,
/// marks the link down and tries again after the fixed backoff.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("device not found within {timeout_secs}s")]
    DeviceNotFound { timeout_secs: u64 },
    #[error("connection dropped: {0}")]
    ConnectionDropped(String),
    #[error("data channel unavailable: {0}")]
    ChannelUnavailable(String),
    #[error("client error: {0}")]
    Client(String),
    #[error("failed to start transport runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

/// Everything a transport needs to hand samples to the core.
#[derive(Clone)]
pub struct TransportContext {
    pub buffer: Arc<IngestionBuffer>,
    pub status: StatusCell,
    pub shutdown: Arc<AtomicBool>,
}

/// Decode one inbound frame and hand it to the buffer.
///
/// A frame that fails to decode is dropped; the buffer and status are left
/// as they were.
pub fn ingest_frame(
    payload: &[u8],
    buffer: &IngestionBuffer,
    status: &StatusCell,
) -> Result<(), DecodeError> {
    let sample = decode_frame(payload, now_millis())?;
    buffer.push(sample);
    status.touch();
    Ok(())
}

/// Same as `ingest_frame`, logging and discarding decode failures.
pub(crate) fn ingest_or_warn(payload: &[u8], ctx: &TransportContext) {
    if let Err(e) = ingest_frame(payload, &ctx.buffer, &ctx.status) {
        warn!("Dropped frame: {}", e);
    }
}

/// Run the configured transport on the current thread until shutdown.
pub fn run_transport(config: &AppConfig, ctx: TransportContext) -> Result<(), TransportError> {
    match config.transport.kind {
        TransportKind::Mqtt => mqtt::run_mqtt_transport(&config.mqtt, &config.transport, ctx),
        TransportKind::Simulated => {
            simulator::run_simulated_transport(&config.simulator, ctx);
            Ok(())
        }
    }
}
