//! Dead reckoning from body-frame IMU samples.
//!
//! Gyro rates are integrated into a rotation matrix (body -> world) and the
//! gated, gravity-compensated acceleration is rotated into the world frame
//! and integrated into position. There is no filtering beyond the per-axis
//! deadzones and the motion gate, and the orientation is never
//! re-orthonormalized, so it drifts under sustained gyro bias.

pub mod rotation;

use log::{debug, trace};
use nalgebra::{Matrix3, Vector3};

use crate::config::{EstimatorConfig, VelocityPolicy};
use crate::trajectory::TrajectorySink;
use crate::types::{InertialSample, TrajectoryPoint};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum EstimationError {
    #[error("non-finite {quantity} for sample at t={time}ms")]
    NonFinite { quantity: &'static str, time: u64 },
}

/// Everything the estimator integrates.
#[derive(Clone, Debug, PartialEq)]
pub struct EstimatorState {
    /// World frame (m)
    pub position: Vector3<f64>,
    /// World frame (m/s). Only carried across ticks with `VelocityPolicy::Persist`.
    pub velocity: Vector3<f64>,
    /// Body -> world
    pub orientation: Matrix3<f64>,
    /// Time of the newest sample seen (ms); `None` until the first sample
    pub last_time: Option<u64>,
}

impl Default for EstimatorState {
    fn default() -> Self {
        Self {
            position: Vector3::zeros(),
            velocity: Vector3::zeros(),
            orientation: Matrix3::identity(),
            last_time: None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// No sample seen yet
    Idle,
    Tracking,
}

/// Outcome of one `DeadReckoner::update`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Update {
    /// First sample after creation or reset: timing reference only.
    Initialized,
    /// Below the motion gate. Orientation advanced, position untouched.
    Rest,
    /// A new point was appended to the trajectory.
    Moved(TrajectoryPoint),
}

/// Seconds between two device timestamps, never negative.
pub fn elapsed_secs(last_time: u64, time: u64) -> f64 {
    time.saturating_sub(last_time) as f64 / 1000.0
}

fn ensure_finite<const R: usize, const C: usize>(
    m: &nalgebra::SMatrix<f64, R, C>,
    quantity: &'static str,
    time: u64,
) -> Result<(), EstimationError> {
    if m.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(EstimationError::NonFinite { quantity, time })
    }
}

pub struct DeadReckoner {
    params: EstimatorConfig,
    state: EstimatorState,
    sink: TrajectorySink,
}

impl DeadReckoner {
    pub fn new(params: EstimatorConfig, sink: TrajectorySink) -> Self {
        Self {
            params,
            state: EstimatorState::default(),
            sink,
        }
    }

    pub fn state(&self) -> &EstimatorState {
        &self.state
    }

    pub fn params(&self) -> &EstimatorConfig {
        &self.params
    }

    pub fn sink(&self) -> &TrajectorySink {
        &self.sink
    }

    pub fn phase(&self) -> Phase {
        if self.state.last_time.is_some() {
            Phase::Tracking
        } else {
            Phase::Idle
        }
    }

    /// Back to identity orientation at the origin, trajectory cleared.
    pub fn reset(&mut self) {
        self.state = EstimatorState::default();
        self.sink.reset();
        debug!("Estimator reset");
    }

    /// Deadzone on x/y, then remove gravity from z.
    fn compensate(&self, accel: &Vector3<f64>) -> Vector3<f64> {
        let mut a = *accel;
        if a.x.abs() < self.params.threshold_x {
            a.x = 0.0;
        }
        if a.y.abs() < self.params.threshold_y {
            a.y = 0.0;
        }
        a.z -= self.params.gravity;
        a
    }

    /// Advance the estimate by one sample.
    ///
    /// Nothing is committed unless every intermediate value is finite, so an
    /// `Err` leaves the state and the trajectory as they were.
    pub fn update(&mut self, sample: &InertialSample) -> Result<Update, EstimationError> {
        let time = sample.time;
        if !sample.is_finite() {
            return Err(EstimationError::NonFinite { quantity: "sample", time });
        }

        let Some(last_time) = self.state.last_time else {
            self.state.last_time = Some(time);
            debug!("First sample at t={}ms, tracking started", time);
            return Ok(Update::Initialized);
        };

        let dt = elapsed_secs(last_time, time);
        let accel = self.compensate(&sample.accel);

        let delta = rotation::rodrigues(&(sample.gyro * dt));
        let orientation = self.state.orientation * delta;
        ensure_finite(&orientation, "orientation", time)?;

        let world_accel = orientation * accel;
        ensure_finite(&world_accel, "world acceleration", time)?;

        // last_time never moves backwards
        let next_time = last_time.max(time);

        if world_accel.norm() < self.params.motion_threshold {
            self.state.orientation = orientation;
            self.state.last_time = Some(next_time);
            if self.params.velocity_policy == VelocityPolicy::ResetEachTick {
                self.state.velocity = Vector3::zeros();
            }
            trace!("Rest at t={}ms, |a|={:.3}", time, world_accel.norm());
            return Ok(Update::Rest);
        }

        let velocity = match self.params.velocity_policy {
            VelocityPolicy::ResetEachTick => world_accel * dt,
            VelocityPolicy::Persist => self.state.velocity + world_accel * dt,
        };
        ensure_finite(&velocity, "velocity", time)?;

        // checked before clamping, which would turn inf/NaN into a boundary value
        let step = self.state.position + velocity * dt;
        ensure_finite(&step, "position", time)?;
        let limit = self.params.axis_limit;
        let position = step.map(|c| c.max(-limit).min(limit));

        self.state.orientation = orientation;
        self.state.velocity = velocity;
        self.state.position = position;
        self.state.last_time = Some(next_time);

        let point = TrajectoryPoint::new(position, time);
        self.sink.append(point);
        trace!(
            "Moved at t={}ms to ({:.3}, {:.3}, {:.3})",
            time, position.x, position.y, position.z
        );
        Ok(Update::Moved(point))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn reckoner() -> DeadReckoner {
        DeadReckoner::new(EstimatorConfig::default(), TrajectorySink::new())
    }

    fn sample(accel: [f64; 3], gyro: [f64; 3], time: u64) -> InertialSample {
        InertialSample::new(Vector3::from(accel), Vector3::from(gyro), time)
    }

    const REST: [f64; 3] = [0.0, 0.0, 9.81];

    #[test]
    fn test_elapsed_never_negative() {
        assert_eq!(elapsed_secs(1000, 1100), 0.1);
        assert_eq!(elapsed_secs(1000, 1000), 0.0);
        assert_eq!(elapsed_secs(1000, 10), 0.0);
    }

    #[test]
    fn test_first_sample_only_initializes() {
        let mut r = reckoner();
        assert_eq!(r.phase(), Phase::Idle);

        // Large enough to move if it were integrated
        let update = r.update(&sample([50.0, 50.0, 50.0], [1.0, 1.0, 1.0], 500)).unwrap();

        assert_eq!(update, Update::Initialized);
        assert_eq!(r.phase(), Phase::Tracking);
        assert_eq!(r.state().last_time, Some(500));
        assert_eq!(r.state().orientation, Matrix3::identity());
        assert!(r.sink().is_empty());
    }

    #[test]
    fn test_device_at_rest_produces_no_point() {
        let mut r = reckoner();
        r.update(&sample(REST, [0.0; 3], 0)).unwrap();
        let update = r.update(&sample(REST, [0.0; 3], 100)).unwrap();

        assert_eq!(update, Update::Rest);
        assert!(r.sink().is_empty());
        assert_eq!(r.state().orientation, Matrix3::identity());
        assert_eq!(r.state().position, Vector3::zeros());
        assert_eq!(r.state().last_time, Some(100));
    }

    #[test]
    fn test_motion_appends_one_point() {
        let mut r = reckoner();
        r.update(&sample(REST, [0.0; 3], 0)).unwrap();
        let update = r.update(&sample([5.0, 5.0, 15.0], [0.0; 3], 100)).unwrap();

        // world accel (5, 5, 5.19), dt = 0.1 -> p = a * dt * dt
        let expected = Vector3::new(0.05, 0.05, 0.0519);
        let Update::Moved(point) = update else {
            panic!("expected a new point, got {:?}", update);
        };
        assert!((point.position - expected).norm() < 1e-9, "got {}", point.position);
        assert_eq!(point.time, 100);
        assert_eq!(r.sink().len(), 1);
        assert_eq!(r.state().position, point.position);
    }

    #[test]
    fn test_deadzone_zeroes_small_horizontal_accel() {
        let mut r = reckoner();
        r.update(&sample(REST, [0.0; 3], 0)).unwrap();
        // 0.4 < threshold on x and y; z alone carries the motion
        let update = r.update(&sample([0.4, -0.4, 12.81], [0.0; 3], 1000)).unwrap();

        let Update::Moved(point) = update else {
            panic!("expected a new point, got {:?}", update);
        };
        assert_eq!(point.position.x, 0.0);
        assert_eq!(point.position.y, 0.0);
        assert!((point.position.z - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_small_world_accel_is_rest() {
        let mut r = reckoner();
        r.update(&sample(REST, [0.0; 3], 0)).unwrap();
        // passes the deadzone but stays under the 1.0 motion gate
        let update = r.update(&sample([0.6, 0.6, 9.81], [0.0; 3], 100)).unwrap();
        assert_eq!(update, Update::Rest);
        assert!(r.sink().is_empty());
    }

    #[test]
    fn test_gyro_rotates_orientation() {
        let mut r = reckoner();
        r.update(&sample(REST, [0.0; 3], 0)).unwrap();
        // pi/2 rad/s about z for one second
        r.update(&sample(REST, [0.0, 0.0, std::f64::consts::FRAC_PI_2], 1000)).unwrap();

        let x_world = r.state().orientation * Vector3::x();
        assert!((x_world - Vector3::y()).norm() < 1e-9, "got {}", x_world);
    }

    #[test]
    fn test_rotated_body_accel_lands_in_world_frame() {
        let mut r = reckoner();
        r.update(&sample(REST, [0.0; 3], 0)).unwrap();
        r.update(&sample(REST, [0.0, 0.0, std::f64::consts::FRAC_PI_2], 1000)).unwrap();

        // body x is now world y
        let update = r.update(&sample([4.0, 0.0, 9.81], [0.0; 3], 1500)).unwrap();
        let Update::Moved(point) = update else {
            panic!("expected a new point, got {:?}", update);
        };
        assert!(point.position.x.abs() < 1e-9);
        assert!((point.position.y - 4.0 * 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_out_of_order_sample_does_not_integrate_backwards() {
        let mut r = reckoner();
        r.update(&sample(REST, [0.0; 3], 1000)).unwrap();
        r.update(&sample([5.0, 5.0, 15.0], [0.0; 3], 1100)).unwrap();
        let before = r.state().position;

        let update = r.update(&sample([5.0, 5.0, 15.0], [3.0, 3.0, 3.0], 900)).unwrap();

        // dt = 0: a point is recorded but nothing moves or turns
        assert!(matches!(update, Update::Moved(_)));
        assert_eq!(r.state().position, before);
        assert_eq!(r.state().orientation, Matrix3::identity());
        assert_eq!(r.state().last_time, Some(1100));
    }

    #[test]
    fn test_non_finite_sample_is_skipped() {
        let mut r = reckoner();
        r.update(&sample(REST, [0.0; 3], 0)).unwrap();
        r.update(&sample([5.0, 5.0, 15.0], [0.0; 3], 100)).unwrap();
        let before = r.state().clone();

        let err = r.update(&sample([f64::NAN, 0.0, 9.81], [0.0; 3], 200)).unwrap_err();
        assert_eq!(err, EstimationError::NonFinite { quantity: "sample", time: 200 });

        let err = r.update(&sample(REST, [f64::INFINITY, 0.0, 0.0], 300));
        assert!(err.is_err());

        assert_eq!(r.state(), &before);
        assert_eq!(r.sink().len(), 1);
    }

    #[test]
    fn test_overflowing_result_is_skipped() {
        let mut r = reckoner();
        r.update(&sample(REST, [0.0; 3], 0)).unwrap();
        let before = r.state().clone();

        // finite rates whose rotation angle overflows
        let huge = f64::MAX;
        let result = r.update(&sample(REST, [huge, huge, huge], 100));
        assert!(matches!(result, Err(EstimationError::NonFinite { quantity: "orientation", .. })));
        assert_eq!(r.state(), &before);
        assert!(r.sink().is_empty());
    }

    #[test]
    fn test_overflowing_displacement_is_skipped_not_clamped() {
        let mut r = reckoner();
        r.update(&sample(REST, [0.0; 3], 0)).unwrap();
        let before = r.state().clone();

        // velocity 1e306 is finite, velocity * dt is not
        let result = r.update(&sample([1e300, 0.0, 9.81], [0.0; 3], 1_000_000_000));
        assert_eq!(
            result,
            Err(EstimationError::NonFinite { quantity: "position", time: 1_000_000_000 })
        );
        assert_eq!(r.state(), &before);
        assert!(r.sink().is_empty());
    }

    #[test]
    fn test_reset_returns_to_idle() {
        let mut r = reckoner();
        r.update(&sample(REST, [0.0; 3], 0)).unwrap();
        r.update(&sample([5.0, 5.0, 15.0], [0.2, 0.0, 0.0], 100)).unwrap();
        assert!(!r.sink().is_empty());

        r.reset();
        assert_eq!(r.phase(), Phase::Idle);
        assert_eq!(r.state(), &EstimatorState::default());
        assert!(r.sink().is_empty());

        assert_eq!(r.update(&sample([5.0, 5.0, 15.0], [0.0; 3], 200)).unwrap(), Update::Initialized);
    }

    #[test]
    fn test_velocity_policies() {
        let step = |policy| {
            let params = EstimatorConfig { velocity_policy: policy, ..EstimatorConfig::default() };
            let mut r = DeadReckoner::new(params, TrajectorySink::new());
            r.update(&sample(REST, [0.0; 3], 0)).unwrap();
            r.update(&sample([2.0, 0.0, 9.81], [0.0; 3], 1000)).unwrap();
            r.update(&sample([2.0, 0.0, 9.81], [0.0; 3], 2000)).unwrap();
            r.state().clone()
        };

        let reset = step(VelocityPolicy::ResetEachTick);
        assert!((reset.velocity.x - 2.0).abs() < 1e-9);
        assert!((reset.position.x - 4.0).abs() < 1e-9);

        let persist = step(VelocityPolicy::Persist);
        assert!((persist.velocity.x - 4.0).abs() < 1e-9);
        assert!((persist.position.x - 5.0).abs() < 1e-9); // 2 + 4, clamped to 5
    }

    #[test]
    fn test_rest_clears_velocity_when_resetting_each_tick() {
        let mut r = reckoner();
        r.update(&sample(REST, [0.0; 3], 0)).unwrap();
        r.update(&sample([2.0, 0.0, 9.81], [0.0; 3], 1000)).unwrap();
        r.update(&sample(REST, [0.0; 3], 2000)).unwrap();
        assert_eq!(r.state().velocity, Vector3::zeros());
    }

    #[test]
    fn test_position_clamped_under_random_input() {
        let mut rng = rand::rng();
        let params = EstimatorConfig { axis_limit: 2.0, ..EstimatorConfig::default() };

        for policy in [VelocityPolicy::ResetEachTick, VelocityPolicy::Persist] {
            let params = EstimatorConfig { velocity_policy: policy, ..params.clone() };
            let mut r = DeadReckoner::new(params, TrajectorySink::new());
            let mut time: u64 = 0;

            for _ in 0..5000 {
                // mostly forward in time, sometimes backwards
                time = if rng.random_bool(0.1) {
                    time.saturating_sub(rng.random_range(0..500))
                } else {
                    time + rng.random_range(0..2000)
                };
                let accel = [
                    rng.random_range(-200.0..200.0),
                    rng.random_range(-200.0..200.0),
                    rng.random_range(-200.0..200.0),
                ];
                let gyro = [
                    rng.random_range(-20.0..20.0),
                    rng.random_range(-20.0..20.0),
                    rng.random_range(-20.0..20.0),
                ];
                let _ = r.update(&sample(accel, gyro, time));

                assert!(r.state().position.iter().all(|c| c.abs() <= 2.0), "{}", r.state().position);
            }

            assert!(r
                .sink()
                .snapshot()
                .iter()
                .all(|p| p.position.iter().all(|c| c.abs() <= 2.0)));
        }
    }
}
