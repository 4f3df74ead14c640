use std::sync::{Arc, PoisonError, RwLock};
use chrono::{DateTime, Utc};

/// Link state as seen by the transport.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ConnectionStatus {
    pub connected: bool,
    /// Arrival time of the last accepted frame
    pub last_update: Option<DateTime<Utc>>,
}

impl ConnectionStatus {
    /// Seconds since the last accepted frame, if any frame has arrived.
    pub fn seconds_since_update(&self, now: DateTime<Utc>) -> Option<f64> {
        self.last_update
            .map(|t| (now - t).num_milliseconds() as f64 / 1000.0)
    }
}

/// Shared `ConnectionStatus`.
///
/// Written only from the transport thread; every other holder reads copies.
#[derive(Clone, Debug, Default)]
pub struct StatusCell {
    inner: Arc<RwLock<ConnectionStatus>>,
}

impl StatusCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> ConnectionStatus {
        *self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_connected(&self, connected: bool) {
        self.inner.write().unwrap_or_else(PoisonError::into_inner).connected = connected;
    }

    /// Record that a frame was accepted just now.
    pub fn touch(&self) {
        self.touch_at(Utc::now());
    }

    pub fn touch_at(&self, at: DateTime<Utc>) {
        self.inner.write().unwrap_or_else(PoisonError::into_inner).last_update = Some(at);
    }
}
