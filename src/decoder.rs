use nalgebra::Vector3;
use serde::Deserialize;

use crate::types::InertialSample;

/// Why a frame was dropped. Decoding is never retried.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("Invalid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),
    #[error("JSON parsing error: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[derive(Deserialize)]
struct Axes {
    x: f64,
    y: f64,
    z: f64,
}

impl From<Axes> for Vector3<f64> {
    fn from(a: Axes) -> Self {
        Vector3::new(a.x, a.y, a.z)
    }
}

#[derive(Deserialize)]
struct Frame {
    accel: Axes,
    gyro: Axes,
    #[serde(default)]
    time: Option<u64>,
}

/// Decode one telemetry frame.
///
/// The frame must be a UTF-8 JSON object carrying `accel.{x,y,z}` and
/// `gyro.{x,y,z}`. A missing `time` is replaced by `arrival_ms`.
pub fn decode_frame(payload: &[u8], arrival_ms: u64) -> Result<InertialSample, DecodeError> {
    let payload_str = std::str::from_utf8(payload)?;
    let frame: Frame = serde_json::from_str(payload_str.trim())?;

    Ok(InertialSample::new(
        frame.accel.into(),
        frame.gyro.into(),
        frame.time.unwrap_or(arrival_ms),
    ))
}
