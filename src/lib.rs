//! # thermod
//!
//! A Linux daemon that keeps an enclosure inside a temperature band by
//! switching heater/fan relay pairs.
//!
//! ## Features
//!
//! - **Hysteresis Control**: dead-band state machine per zone, no relay
//!   chatter at the thresholds
//! - **Bounded Sensor Retry**: transient sensor faults are absorbed locally
//!   with a fixed retry budget and backoff
//! - **Fail-Closed Lifecycle**: every relay is forced OFF before the first
//!   poll and on every exit path, including errors
//! - **Temperature Logging**: one CSV record per successful reading
//! - **Pluggable Hardware**: 1-Wire and hwmon sensor sources, sysfs GPIO
//!   relays, all behind trait ports
//!
//! ## Architecture
//!
//! One control-loop task owns all hardware ports:
//! - [`SensorReader`](sensor_reader::SensorReader) - retrying sensor acquisition
//! - [`ZoneController`](zone::ZoneController) - per-zone hysteresis decisions
//! - [`ControlLoop`](control_loop::ControlLoop) - poll cadence, relay fan-out,
//!   logging, safe shutdown
//! - [`Application`](application::Application) - lifecycle and signal wiring
//!
//! ## Example
//!
//! ```no_run
//! use thermod::{application::Application, config::ConfigManager};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config_manager = ConfigManager::load(None).await?;
//! Application::builder()
//!     .with_config_manager(config_manager)
//!     .build()
//!     .await?
//!     .run()
//!     .await
//! # }
//! ```

pub mod application;
pub mod cli;
pub mod config;
pub mod control_loop;
pub mod drivers;
pub mod relays;
pub mod sensor_reader;
pub mod sensors;
pub mod temperature_log;
pub mod temperature_sensors;
pub mod zone;
