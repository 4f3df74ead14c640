use nalgebra::Vector3;

/// A world-frame position produced by the estimator.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrajectoryPoint {
    pub position: Vector3<f64>,
    /// Time of the sample that produced this point (ms)
    pub time: u64,
}

impl TrajectoryPoint {
    pub fn new(position: Vector3<f64>, time: u64) -> Self {
        Self { position, time }
    }

    pub fn x(&self) -> f64 {
        self.position.x
    }

    pub fn y(&self) -> f64 {
        self.position.y
    }

    pub fn z(&self) -> f64 {
        self.position.z
    }
}
