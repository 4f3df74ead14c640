pub mod app_core;
pub mod ui;

pub use app_core::TrajectoryApp;
