pub mod sample;
pub mod trajectory_point;
pub mod connection_status;

pub use sample::InertialSample;
pub use trajectory_point::TrajectoryPoint;
pub use connection_status::{ConnectionStatus, StatusCell};
