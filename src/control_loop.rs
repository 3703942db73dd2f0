//! The poll-act-log control loop.
//!
//! One task owns the sensor reader, every zone controller, the relay port,
//! and the log sink. A tick runs to completion before the next begins; the
//! only suspension points are the inter-tick sleep and the sensor retry
//! backoff, so relay state and the log cursor have a single writer by
//! construction.

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Local;
use log::{error, info};
use tokio::time::interval;
use tokio_util::sync::CancellationToken;

use crate::relays::RelayPort;
use crate::sensor_reader::SensorReader;
use crate::temperature_log::TemperatureLog;
use crate::zone::ZoneController;

pub struct ControlLoop {
    reader: SensorReader,
    zones: Vec<ZoneController>,
    relays: Box<dyn RelayPort>,
    sink: Box<dyn TemperatureLog>,
    poll_interval: Duration,
}

impl ControlLoop {
    pub fn new(
        reader: SensorReader,
        zones: Vec<ZoneController>,
        relays: Box<dyn RelayPort>,
        sink: Box<dyn TemperatureLog>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            reader,
            zones,
            relays,
            sink,
            poll_interval,
        }
    }

    /// Drives the loop until `cancel` fires.
    ///
    /// Every relay channel is forced OFF once before the first poll and
    /// again before this returns, regardless of how the loop ended. The
    /// relay port is released when the loop is dropped.
    pub async fn run(mut self, cancel: CancellationToken) -> Result<()> {
        let outcome = match self.apply_safe_state().await {
            Ok(()) => self.poll_until_cancelled(&cancel).await,
            Err(e) => Err(e.context("failed to reach initial safe state")),
        };

        let safe = self
            .apply_safe_state()
            .await
            .context("failed to force relays off during shutdown");

        outcome.and(safe)
    }

    async fn poll_until_cancelled(&mut self, cancel: &CancellationToken) -> Result<()> {
        let mut ticks = interval(self.poll_interval);

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    info!("control loop cancelled");
                    return Ok(());
                }
                _instant = ticks.tick() => {
                    if let Err(e) = self.tick().await {
                        error!("{e:#}");
                    }
                }
            }
        }
    }

    /// One poll-act-log cycle.
    ///
    /// A failed acquisition skips zone transitions and logging for this tick
    /// and leaves the last commanded relay state latched. Actuator faults
    /// are reported per channel and never abort the remaining channels.
    async fn tick(&mut self) -> Result<()> {
        let temperature = self
            .reader
            .acquire()
            .await
            .context("could not read temperature, keeping relay state unchanged")?;

        info!("temperature {temperature:.2}C");

        for zone in &mut self.zones {
            for command in zone.evaluate(temperature) {
                if let Err(e) = self.relays.set(command.channel, command.state).await {
                    error!(
                        "zone '{}': failed to drive relay channel {}: {e:#}",
                        zone.name(),
                        command.channel
                    );
                }
            }
        }

        self.sink
            .append(Local::now(), temperature)
            .await
            .context("failed to append temperature record")?;

        Ok(())
    }

    /// Drives every channel of every zone OFF.
    ///
    /// All channels are attempted even when one write fails; the first
    /// error is returned.
    async fn apply_safe_state(&self) -> Result<()> {
        let mut outcome = Ok(());

        for command in self.zones.iter().flat_map(ZoneController::safe_commands) {
            let result = self.relays.set(command.channel, command.state).await;
            if let Err(e) = &result {
                error!(
                    "failed to force relay channel {} off: {e:#}",
                    command.channel
                );
            }
            outcome = outcome.and(result);
        }

        outcome
    }
}
