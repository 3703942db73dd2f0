//! Sensor port abstraction and the sensor error taxonomy.

use std::fmt;

use async_trait::async_trait;

/// Errors a sensor port can report for a single read attempt.
///
/// `NotReady` is the transient class: the sensor exists but could not
/// produce a reading right now (unsettled CRC, busy bus) and a retry after a
/// short backoff is expected to succeed without operator intervention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SensorError {
    /// Sensor present but not ready to produce a reading yet.
    NotReady,
    /// Sensor produced data that could not be interpreted as a temperature.
    InvalidData(String),
    /// The underlying device could not be accessed at all.
    Unavailable(String),
}

impl SensorError {
    /// Whether a retry after backoff is expected to resolve this error.
    pub fn is_transient(&self) -> bool {
        matches!(self, SensorError::NotReady)
    }
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorError::NotReady => write!(f, "sensor not ready"),
            SensorError::InvalidData(detail) => write!(f, "invalid sensor data: {detail}"),
            SensorError::Unavailable(detail) => write!(f, "sensor unavailable: {detail}"),
        }
    }
}

impl std::error::Error for SensorError {}

/// Port for reading the regulated temperature, in degrees Celsius.
///
/// Implementations perform exactly one read attempt per call; retry policy
/// lives in [`SensorReader`](crate::sensor_reader::SensorReader).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SensorPort: Send + Sync {
    async fn read(&self) -> Result<f32, SensorError>;

    async fn sensor_name(&self) -> Option<String> {
        None
    }
}
