//! Application entry point and builder pattern implementation.

use std::time::Duration;

use anyhow::{Context, Result, bail};
use log::info;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use crate::{
    config::{Config, ConfigManager},
    control_loop::ControlLoop,
    drivers,
    sensor_reader::SensorReader,
    temperature_log::CsvTemperatureLog,
    temperature_sensors,
    zone::ZoneController,
};

/// How long a cancelled control loop may take to reach the safe state
/// before shutdown is considered failed.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Main application structure that owns the daemon lifecycle.
///
/// Assembles the hardware ports from configuration, runs the control loop
/// as a task, and translates the interrupt signal into a cooperative
/// cancellation followed by a bounded wait for the safe-state pass.
///
/// # Example
///
/// ```no_run
/// use thermod::application::Application;
/// use thermod::config;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config_manager = config::ConfigManager::load(None).await?;
/// let app = Application::builder()
///     .with_config_manager(config_manager)
///     .build()
///     .await?;
///
/// app.run().await?;
/// # Ok(())
/// # }
/// ```
pub struct Application {
    config_manager: ConfigManager,
}

impl Application {
    /// Creates a new ApplicationBuilder for constructing Application instances.
    pub fn builder() -> ApplicationBuilder {
        ApplicationBuilder::new()
    }

    /// Runs the daemon until interrupted.
    pub async fn run(self) -> Result<()> {
        let config = self.config_manager.clone_config().await;
        let control_loop = build_control_loop(&config).await?;

        info!(
            "thermod starting: {} zone(s), polling every {}s",
            config.zones.len(),
            config.poll_seconds
        );

        let cancel = CancellationToken::new();
        let mut handle = tokio::spawn(control_loop.run(cancel.child_token()));

        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal.context("failed to listen for shutdown signal")?;
                info!("interrupt received, initiating graceful shutdown");
                cancel.cancel();

                match timeout(SHUTDOWN_TIMEOUT, &mut handle).await {
                    Ok(joined) => joined.context("control loop panicked")??,
                    Err(_) => bail!("control loop did not reach the safe state within shutdown timeout"),
                }
            }
            joined = &mut handle => {
                // The loop only returns on cancellation; anything else is fatal.
                // Its safe-state pass has already run on this path.
                joined.context("control loop panicked")??;
                bail!("control loop stopped unexpectedly");
            }
        }

        info!("shutdown complete");
        Ok(())
    }
}

/// Assembles the control loop and its hardware ports from configuration.
async fn build_control_loop(config: &Config) -> Result<ControlLoop> {
    let sensor = temperature_sensors::from_cfg(&config.sensor)
        .context("failed to initialize temperature sensor")?;
    if let Some(name) = sensor.sensor_name().await {
        info!("using temperature sensor {name}");
    }

    let channels: Vec<u8> = config
        .zones
        .iter()
        .flat_map(|zone| [zone.heater_channel, zone.fan_channel])
        .collect();
    let relays = drivers::from_cfg(&config.relays, &channels)
        .context("failed to initialize relay bank")?;

    let zones: Vec<ZoneController> = config.zones.iter().map(ZoneController::new).collect();
    for zone in &zones {
        info!("zone '{}' configured", zone.name());
    }

    let reader = SensorReader::new(
        sensor,
        config.retry.attempts,
        Duration::from_secs(config.retry.backoff_seconds),
    );
    let sink = Box::new(CsvTemperatureLog::new(config.log_file.clone()));

    Ok(ControlLoop::new(
        reader,
        zones,
        relays,
        sink,
        Duration::from_secs(u64::from(config.poll_seconds)),
    ))
}

/// Builder pattern for creating Application instances.
pub struct ApplicationBuilder {
    config_manager: Option<ConfigManager>,
}

impl ApplicationBuilder {
    fn new() -> Self {
        Self {
            config_manager: None,
        }
    }

    /// Sets the configuration manager for the application.
    pub fn with_config_manager(mut self, config_manager: ConfigManager) -> Self {
        self.config_manager = Some(config_manager);
        self
    }

    /// Builds the Application instance with the provided configuration.
    pub async fn build(self) -> Result<Application> {
        let config_manager = self
            .config_manager
            .ok_or_else(|| anyhow::anyhow!("Configuration manager is required"))?;

        config_manager
            .get()
            .await
            .validate()
            .context("refusing to start with invalid configuration")?;

        Ok(Application { config_manager })
    }
}
