//! Bounded-retry sensor acquisition.
//!
//! Transient hardware flakiness is absorbed here: the control loop only ever
//! sees a valid temperature or a typed [`SensorFailure`], never a crash and
//! never a default reading.

use std::fmt;
use std::time::Duration;

use log::{debug, warn};
use tokio::time::sleep;

use crate::sensors::{SensorError, SensorPort};

/// Retry budget exhausted without a valid reading.
///
/// Distinct from a temperature at the type level so that "no reading" can
/// never be confused with a genuine 0.00 degC sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorFailure {
    pub attempts: u32,
    pub last_error: SensorError,
}

impl fmt::Display for SensorFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "no valid reading after {} attempts: {}",
            self.attempts, self.last_error
        )
    }
}

impl std::error::Error for SensorFailure {}

/// Wraps a [`SensorPort`] with a fixed retry budget and backoff.
pub struct SensorReader {
    port: Box<dyn SensorPort>,
    attempts: u32,
    backoff: Duration,
}

impl SensorReader {
    /// `attempts` must be at least 1 (enforced by config validation).
    pub fn new(port: Box<dyn SensorPort>, attempts: u32, backoff: Duration) -> Self {
        Self {
            port,
            attempts,
            backoff,
        }
    }

    /// Attempts to obtain one valid temperature reading.
    ///
    /// A successful read short-circuits immediately. Every failed read
    /// consumes one attempt; the backoff is slept only after transient
    /// errors and never after the final attempt.
    pub async fn acquire(&self) -> Result<f32, SensorFailure> {
        let mut last_error = SensorError::NotReady;

        for attempt in 1..=self.attempts {
            match self.port.read().await {
                Ok(temperature) => {
                    if attempt > 1 {
                        debug!("sensor recovered on attempt {attempt}/{}", self.attempts);
                    }
                    return Ok(temperature);
                }
                Err(e) => {
                    warn!(
                        "sensor read failed (attempt {attempt}/{}): {e}",
                        self.attempts
                    );
                    let transient = e.is_transient();
                    last_error = e;
                    if transient && attempt < self.attempts {
                        sleep(self.backoff).await;
                    }
                }
            }
        }

        Err(SensorFailure {
            attempts: self.attempts,
            last_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::MockSensorPort;
    use pretty_assertions::assert_eq;
    use tokio::time::Instant;

    const BACKOFF: Duration = Duration::from_secs(2);

    #[tokio::test]
    async fn successful_read_short_circuits() {
        let mut port = MockSensorPort::new();
        port.expect_read().times(1).returning(|| Ok(21.5));

        let reader = SensorReader::new(Box::new(port), 5, BACKOFF);
        assert_eq!(reader.acquire().await, Ok(21.5));
    }

    #[tokio::test(start_paused = true)]
    async fn exhaustion_makes_exactly_the_budgeted_attempts() {
        let mut port = MockSensorPort::new();
        port.expect_read()
            .times(5)
            .returning(|| Err(SensorError::NotReady));

        let reader = SensorReader::new(Box::new(port), 5, BACKOFF);
        let failure = reader.acquire().await.unwrap_err();

        assert_eq!(failure.attempts, 5);
        assert_eq!(failure.last_error, SensorError::NotReady);
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_within_budget() {
        let mut port = MockSensorPort::new();
        let mut calls = 0u32;
        port.expect_read().times(3).returning(move || {
            calls += 1;
            if calls < 3 {
                Err(SensorError::NotReady)
            } else {
                Ok(33.25)
            }
        });

        let reader = SensorReader::new(Box::new(port), 5, BACKOFF);
        assert_eq!(reader.acquire().await, Ok(33.25));
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_applies_between_transient_failures_only() {
        let mut port = MockSensorPort::new();
        port.expect_read()
            .times(5)
            .returning(|| Err(SensorError::NotReady));

        let reader = SensorReader::new(Box::new(port), 5, BACKOFF);
        let start = Instant::now();
        reader.acquire().await.unwrap_err();
        // 4 sleeps between 5 attempts; the paused clock advances exactly by them.
        assert_eq!(start.elapsed(), BACKOFF * 4);

        let mut port = MockSensorPort::new();
        port.expect_read()
            .times(5)
            .returning(|| Err(SensorError::Unavailable("gone".into())));

        let reader = SensorReader::new(Box::new(port), 5, BACKOFF);
        let start = Instant::now();
        let failure = reader.acquire().await.unwrap_err();
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(failure.last_error, SensorError::Unavailable("gone".into()));
    }

    #[tokio::test]
    async fn failure_message_names_attempts_and_cause() {
        let mut port = MockSensorPort::new();
        port.expect_read()
            .times(2)
            .returning(|| Err(SensorError::InvalidData("t= missing".into())));

        let reader = SensorReader::new(Box::new(port), 2, BACKOFF);
        let failure = reader.acquire().await.unwrap_err();
        assert_eq!(
            failure.to_string(),
            "no valid reading after 2 attempts: invalid sensor data: t= missing"
        );
    }
}
