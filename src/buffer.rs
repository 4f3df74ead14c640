use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::types::InertialSample;

/// Latest-wins handoff between the transport thread and the consumer tick.
///
/// Holds at most `capacity` unconsumed samples. When full, the oldest one is
/// dropped so the consumer never falls behind the sensor. The lock is only
/// held for the push or the drain itself.
#[derive(Debug)]
pub struct IngestionBuffer {
    slots: Mutex<VecDeque<InertialSample>>,
    capacity: usize,
    overwritten: AtomicU64,
}

impl IngestionBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            overwritten: AtomicU64::new(0),
        }
    }

    /// Single-slot buffer.
    pub fn single() -> Self {
        Self::new(1)
    }

    fn slots(&self) -> MutexGuard<'_, VecDeque<InertialSample>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, sample: InertialSample) {
        let mut slots = self.slots();
        while slots.len() >= self.capacity {
            slots.pop_front();
            self.overwritten.fetch_add(1, Ordering::Relaxed);
        }
        slots.push_back(sample);
    }

    /// Take the newest sample and empty the buffer.
    pub fn drain_latest(&self) -> Option<InertialSample> {
        let mut slots = self.slots();
        let latest = slots.pop_back();
        slots.clear();
        latest
    }

    pub fn len(&self) -> usize {
        self.slots().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Samples discarded by `push` before anyone drained them.
    pub fn overwritten(&self) -> u64 {
        self.overwritten.load(Ordering::Relaxed)
    }
}

impl Default for IngestionBuffer {
    fn default() -> Self {
        Self::single()
    }
}
