use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{select, tick, unbounded, Receiver, Sender};
use log::{debug, info, warn};

use crate::buffer::IngestionBuffer;
use crate::config::ConsumerConfig;
use crate::estimator::{DeadReckoner, Update};
use crate::trajectory::TrajectorySink;
use crate::types::{ConnectionStatus, InertialSample, StatusCell, TrajectoryPoint};

/// Control messages for the consumer thread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerCommand {
    Reset,
    Shutdown,
}

/// Latest processed sample together with the link state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatestReading {
    pub sample: Option<InertialSample>,
    pub status: ConnectionStatus,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumerStats {
    /// Samples accepted by the estimator
    pub processed: u64,
    /// Samples the estimator rejected
    pub skipped: u64,
    /// Samples replaced in the ingestion buffer before a tick drained them
    pub overwritten: u64,
}

#[derive(Debug, Default)]
struct Shared {
    latest: Mutex<Option<InertialSample>>,
    history: Mutex<VecDeque<InertialSample>>,
    paused: AtomicBool,
    processed: AtomicU64,
    skipped: AtomicU64,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Renderer-side view of the pipeline. Cheap to clone, never blocks the
/// consumer for longer than a copy.
#[derive(Clone)]
pub struct ConsumerHandle {
    shared: Arc<Shared>,
    commands: Sender<ConsumerCommand>,
    sink: TrajectorySink,
    status: StatusCell,
    buffer: Arc<IngestionBuffer>,
}

impl ConsumerHandle {
    pub fn latest(&self) -> LatestReading {
        LatestReading {
            sample: *lock(&self.shared.latest),
            status: self.status.get(),
        }
    }

    /// Recently processed samples, oldest first.
    pub fn recent_samples(&self) -> Vec<InertialSample> {
        lock(&self.shared.history).iter().copied().collect()
    }

    pub fn trajectory_snapshot(&self) -> Vec<TrajectoryPoint> {
        self.sink.snapshot()
    }

    pub fn trajectory_window(&self, n: usize) -> Vec<TrajectoryPoint> {
        self.sink.window(n)
    }

    pub fn trajectory_len(&self) -> usize {
        self.sink.len()
    }

    pub fn is_paused(&self) -> bool {
        self.shared.paused.load(Ordering::Relaxed)
    }

    pub fn set_paused(&self, paused: bool) {
        self.shared.paused.store(paused, Ordering::Relaxed);
        info!("Consumer {}", if paused { "paused" } else { "resumed" });
    }

    /// Flip pause state, returns the new state.
    pub fn toggle_pause(&self) -> bool {
        let paused = !self.shared.paused.fetch_xor(true, Ordering::Relaxed);
        info!("Consumer {}", if paused { "paused" } else { "resumed" });
        paused
    }

    pub fn reset(&self) {
        if self.commands.send(ConsumerCommand::Reset).is_err() {
            warn!("Consumer is gone, reset ignored");
        }
    }

    pub fn shutdown(&self) {
        // a closed channel means the consumer already exited
        self.commands.send(ConsumerCommand::Shutdown).ok();
    }

    pub fn stats(&self) -> ConsumerStats {
        ConsumerStats {
            processed: self.shared.processed.load(Ordering::Relaxed),
            skipped: self.shared.skipped.load(Ordering::Relaxed),
            overwritten: self.buffer.overwritten(),
        }
    }
}

/// Owns the estimator; drains the buffer once per tick.
pub struct Consumer {
    estimator: DeadReckoner,
    buffer: Arc<IngestionBuffer>,
    shared: Arc<Shared>,
    commands: Receiver<ConsumerCommand>,
    history_capacity: usize,
}

impl Consumer {
    pub fn new(
        config: &ConsumerConfig,
        estimator: DeadReckoner,
        buffer: Arc<IngestionBuffer>,
        status: StatusCell,
    ) -> (Self, ConsumerHandle) {
        let (command_tx, command_rx) = unbounded();
        let shared = Arc::new(Shared::default());
        shared.paused.store(config.start_paused, Ordering::Relaxed);

        let handle = ConsumerHandle {
            shared: Arc::clone(&shared),
            commands: command_tx,
            sink: estimator.sink().clone(),
            status,
            buffer: Arc::clone(&buffer),
        };

        let consumer = Self {
            estimator,
            buffer,
            shared,
            commands: command_rx,
            history_capacity: config.history_capacity,
        };

        (consumer, handle)
    }

    /// One timer tick: drain the newest sample and feed it to the estimator.
    pub fn tick(&mut self) {
        if self.shared.paused.load(Ordering::Relaxed) {
            return;
        }

        let Some(sample) = self.buffer.drain_latest() else {
            return;
        };

        match self.estimator.update(&sample) {
            Ok(update) => {
                self.shared.processed.fetch_add(1, Ordering::Relaxed);
                self.publish(sample);
                if let Update::Moved(point) = update {
                    debug!(
                        "Trajectory point #{} at ({:.3}, {:.3}, {:.3})",
                        self.estimator.sink().len(),
                        point.x(),
                        point.y(),
                        point.z()
                    );
                }
            }
            Err(e) => {
                self.shared.skipped.fetch_add(1, Ordering::Relaxed);
                warn!("Skipped sample: {}", e);
            }
        }
    }

    fn publish(&self, sample: InertialSample) {
        *lock(&self.shared.latest) = Some(sample);

        if self.history_capacity == 0 {
            return;
        }
        let mut history = lock(&self.shared.history);
        if history.len() >= self.history_capacity {
            history.pop_front();
        }
        history.push_back(sample);
    }

    /// Returns false when the loop should stop.
    fn handle_command(&mut self, command: ConsumerCommand) -> bool {
        match command {
            ConsumerCommand::Reset => {
                self.estimator.reset();
                *lock(&self.shared.latest) = None;
                lock(&self.shared.history).clear();
                info!("Session reset");
                true
            }
            ConsumerCommand::Shutdown => false,
        }
    }

    /// Tick every `interval` until `Shutdown` arrives or every handle is dropped.
    pub fn run(mut self, interval: Duration) {
        let ticker = tick(interval);
        let commands = self.commands.clone();
        info!(
            "Consumer ticking every {}ms, axis limit ±{}",
            interval.as_millis(),
            self.estimator.params().axis_limit
        );

        loop {
            select! {
                recv(commands) -> command => match command {
                    Ok(command) => {
                        if !self.handle_command(command) {
                            break;
                        }
                    }
                    Err(_) => break,
                },
                recv(ticker) -> _ => self.tick(),
            }
        }

        info!("Consumer stopped");
    }

    pub fn spawn(self, interval: Duration) -> std::io::Result<thread::JoinHandle<()>> {
        thread::Builder::new()
            .name("consumer".into())
            .spawn(move || self.run(interval))
    }
}
