use nalgebra::Vector3;

/// One decoded IMU reading.
///
/// `accel` is in m/s² and `gyro` in rad/s, both in the device (body) frame.
/// `time` is milliseconds, monotonic per device.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InertialSample {
    pub accel: Vector3<f64>,
    pub gyro: Vector3<f64>,
    pub time: u64,
}

impl InertialSample {
    pub fn new(accel: Vector3<f64>, gyro: Vector3<f64>, time: u64) -> Self {
        Self { accel, gyro, time }
    }

    pub fn is_finite(&self) -> bool {
        self.accel.iter().all(|v| v.is_finite()) && self.gyro.iter().all(|v| v.is_finite())
    }
}
