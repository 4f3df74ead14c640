use std::f64::consts::TAU;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::{Duration, Instant};

use log::{info, warn};
use rand::rngs::ThreadRng;
use rand::Rng;
use serde_json::json;

use super::{ingest_or_warn, TransportContext};
use crate::config::SimulatorConfig;

const GRAVITY: f64 = 9.81;

/// Fake sensor that mostly sits still and periodically gets pushed along x.
///
/// Frames are produced as JSON text so they take the same decode path as
/// real telemetry.
pub struct SimulatedDevice {
    config: SimulatorConfig,
    rng: ThreadRng,
}

impl SimulatedDevice {
    pub fn new(config: SimulatorConfig) -> Self {
        Self { config, rng: rand::rng() }
    }

    fn noise(&mut self, amplitude: f64) -> f64 {
        if amplitude > 0.0 {
            self.rng.random_range(-amplitude..amplitude)
        } else {
            0.0
        }
    }

    /// Burst envelope at `elapsed_ms`: one full sine period (push then
    /// brake) per burst, zero between bursts.
    pub fn burst_level(&self, elapsed_ms: u64) -> f64 {
        let period = self.config.burst_period_secs;
        let duration = self.config.burst_duration_secs;
        if period <= 0.0 || duration <= 0.0 {
            return 0.0;
        }

        let t = (elapsed_ms as f64 / 1000.0) % period;
        if t < duration {
            (TAU * t / duration).sin()
        } else {
            0.0
        }
    }

    pub fn frame_at(&mut self, elapsed_ms: u64) -> String {
        let level = self.burst_level(elapsed_ms);
        let (an, gn) = (self.config.accel_noise, self.config.gyro_noise);

        let accel_x = level * self.config.burst_accel + self.noise(an);
        let accel_y = self.noise(an);
        let accel_z = GRAVITY + self.noise(an);
        let gyro_x = self.noise(gn);
        let gyro_y = self.noise(gn);
        let gyro_z = level.abs() * 0.2 + self.noise(gn);

        json!({
            "accel": { "x": accel_x, "y": accel_y, "z": accel_z },
            "gyro": { "x": gyro_x, "y": gyro_y, "z": gyro_z },
            "time": elapsed_ms,
        })
        .to_string()
    }
}

/// Run the simulated sensor until shutdown is signalled.
pub fn run_simulated_transport(config: &SimulatorConfig, ctx: TransportContext) {
    let interval = config.interval().unwrap_or_else(|| {
        warn!("Simulator rate {} Hz is out of range, falling back to 1 Hz", config.rate_hz);
        Duration::from_secs(1)
    });
    let mut device = SimulatedDevice::new(config.clone());
    let started = Instant::now();

    ctx.status.set_connected(true);
    info!("Simulated sensor running at {:.1} Hz", config.rate_hz);

    while !ctx.shutdown.load(Ordering::Relaxed) {
        let elapsed_ms = started.elapsed().as_millis() as u64;
        let frame = device.frame_at(elapsed_ms);
        ingest_or_warn(frame.as_bytes(), &ctx);
        thread::sleep(interval);
    }

    ctx.status.set_connected(false);
    info!("Simulated sensor stopped");
}
