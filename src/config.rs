//! Configuration management for the thermod daemon.
//!
//! Handles loading, parsing, and validation of YAML configuration files
//! that define zones, threshold bands, hardware bindings, and polling
//! behavior. Configuration is static: it is loaded once at startup and
//! never changes for the process lifetime.

use anyhow::{Context, Result};
use log::info;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashSet,
    env, fs,
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::sync::RwLock;

use crate::zone::{FanMode, ThresholdBand};

/// Main configuration structure for the thermod daemon.
///
/// # Example
///
/// ```yaml
/// version: 1
/// poll_seconds: 30
/// log_file: /var/log/thermod/temperature_log.csv
///
/// sensor:
///   kind: w1-therm
///   device: 28-0316a2797b3c
///
/// retry:
///   attempts: 5
///   backoff_seconds: 2
///
/// relays:
///   kind: sysfs-gpio
///   active_low: true
///
/// zones:
///   - name: primary
///     heater_channel: 23
///     fan_channel: 18
///     band: { lower: 30.0, upper: 40.0 }
///   - name: secondary
///     heater_channel: 24
///     fan_channel: 25
///     band: { lower: 30.0, upper: 40.0 }
///     fan_mode: heater-linked
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Configuration version for compatibility checking.
    pub version: u8,

    /// Polling interval between control ticks, in seconds.
    #[serde(default = "defaults::poll_seconds")]
    pub poll_seconds: u16,

    /// Sensor retry policy.
    #[serde(default)]
    pub retry: RetryCfg,

    /// Path of the append-only temperature log.
    #[serde(default = "defaults::log_file")]
    pub log_file: PathBuf,

    /// Temperature sensor to regulate on.
    #[serde(default)]
    pub sensor: SensorCfg,

    /// Relay bank driving all zone channels.
    #[serde(default)]
    pub relays: RelayBankCfg,

    /// Regulated zones; each owns one heater and one fan relay channel.
    #[serde(default)]
    pub zones: Vec<ZoneCfg>,
}

/// Bounded-retry policy for sensor acquisition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryCfg {
    /// Read attempts per tick before giving up.
    #[serde(default = "defaults::retry_attempts")]
    pub attempts: u32,

    /// Backoff between transient failures, in seconds.
    #[serde(default = "defaults::backoff_seconds")]
    pub backoff_seconds: u64,
}

impl Default for RetryCfg {
    fn default() -> Self {
        Self {
            attempts: defaults::retry_attempts(),
            backoff_seconds: defaults::backoff_seconds(),
        }
    }
}

/// Temperature sensor source variants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum SensorCfg {
    /// DS18B20-style sensor on the kernel 1-Wire bus.
    W1Therm {
        /// Device id under `/sys/bus/w1/devices` (e.g. "28-0316a2797b3c").
        /// The first `28-*` device is used when omitted.
        #[serde(default)]
        device: Option<String>,
    },
    /// Linux hwmon temperature input.
    Hwmon {
        /// Device name as reported by the hwmon `name` attribute.
        device: String,
        /// Input to read, e.g. "temp1".
        #[serde(default = "defaults::hwmon_input")]
        input: String,
    },
}

impl Default for SensorCfg {
    fn default() -> Self {
        SensorCfg::W1Therm { device: None }
    }
}

/// Relay bank hardware variants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum RelayBankCfg {
    /// GPIO pins driven through `/sys/class/gpio`.
    SysfsGpio {
        /// Relay boards that energize on a low pin level (the common case).
        #[serde(default = "defaults::active_low")]
        active_low: bool,
    },
}

impl Default for RelayBankCfg {
    fn default() -> Self {
        RelayBankCfg::SysfsGpio {
            active_low: defaults::active_low(),
        }
    }
}

/// One regulated zone: a heater/fan relay pair and its threshold band.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneCfg {
    /// Human-readable name, used in log output.
    pub name: String,

    /// Relay channel (BCM pin) switching the heater.
    pub heater_channel: u8,

    /// Relay channel (BCM pin) switching the fan.
    pub fan_channel: u8,

    /// Hysteresis dead-band for this zone.
    pub band: ThresholdBand,

    /// Fan behavior while not heating.
    #[serde(default)]
    pub fan_mode: FanMode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: 1,
            poll_seconds: defaults::poll_seconds(),
            retry: RetryCfg::default(),
            log_file: defaults::log_file(),
            sensor: SensorCfg::default(),
            relays: RelayBankCfg::default(),
            zones: Vec::new(),
        }
    }
}

impl Config {
    /// Validates the configuration for consistency.
    ///
    /// Checks the band invariant of every zone, exclusive channel
    /// ownership, and that polling and retry budgets are workable.
    pub fn validate(&self) -> Result<()> {
        if self.zones.is_empty() {
            anyhow::bail!("at least one zone must be configured");
        }
        if self.poll_seconds == 0 {
            anyhow::bail!("poll_seconds must be at least 1");
        }
        if self.retry.attempts == 0 {
            anyhow::bail!("retry.attempts must be at least 1");
        }

        let mut owned_channels = HashSet::new();
        for zone in &self.zones {
            if !zone.band.lower.is_finite() || !zone.band.upper.is_finite() {
                anyhow::bail!("zone '{}' has a non-finite threshold band", zone.name);
            }
            if zone.band.lower >= zone.band.upper {
                anyhow::bail!(
                    "zone '{}' band is inverted: lower ({}) must be below upper ({})",
                    zone.name,
                    zone.band.lower,
                    zone.band.upper
                );
            }
            for channel in [zone.heater_channel, zone.fan_channel] {
                if !owned_channels.insert(channel) {
                    anyhow::bail!(
                        "relay channel {} is assigned more than once (zone '{}')",
                        channel,
                        zone.name
                    );
                }
            }
        }

        Ok(())
    }
}

mod defaults {
    use std::path::PathBuf;

    /// Default polling interval in seconds.
    pub fn poll_seconds() -> u16 {
        30
    }

    /// Default sensor read attempts per tick.
    pub fn retry_attempts() -> u32 {
        5
    }

    /// Default backoff between transient sensor failures, in seconds.
    pub fn backoff_seconds() -> u64 {
        2
    }

    /// Default temperature log location.
    pub fn log_file() -> PathBuf {
        PathBuf::from("/var/log/thermod/temperature_log.csv")
    }

    /// Default hwmon input name.
    pub fn hwmon_input() -> String {
        "temp1".to_string()
    }

    /// Relay boards are commonly active-low.
    pub fn active_low() -> bool {
        true
    }
}

fn locate_config() -> Result<PathBuf> {
    // 1) ENV
    if let Ok(env_path) = env::var("THERMOD_CONFIG") {
        return Ok(PathBuf::from(env_path));
    }

    // 2) XDG_CONFIG_HOME or $HOME/.config
    if let Some(mut cfg_dir) = env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| env::var_os("HOME").map(|h| Path::new(&h).join(".config")))
    {
        cfg_dir.push("thermod/config.yml");
        if cfg_dir.exists() {
            return Ok(cfg_dir);
        }
    }

    // 3) /etc
    let etc = Path::new("/etc/thermod/config.yml");
    if etc.exists() {
        return Ok(etc.to_path_buf());
    }

    anyhow::bail!("Configuration file not found in any standard location")
}

/// Configuration manager that handles config data and file loading.
///
/// # Example
///
/// ```no_run
/// use thermod::config::ConfigManager;
/// use std::path::PathBuf;
///
/// # async fn example() -> anyhow::Result<()> {
/// // Load from specific path
/// let config_manager = ConfigManager::load(Some(PathBuf::from("config.yml"))).await?;
///
/// // Load from standard locations
/// let config_manager = ConfigManager::load(None).await?;
///
/// let poll_seconds = config_manager.get().await.poll_seconds;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: Arc<RwLock<Config>>,
    path: PathBuf,
}

impl ConfigManager {
    /// Creates a new ConfigManager with the given config and path.
    pub fn new(config: Config, path: PathBuf) -> Self {
        Self {
            config: Arc::new(RwLock::new(config)),
            path,
        }
    }

    /// Loads configuration from file or standard locations.
    ///
    /// Searches for configuration in the following order:
    /// 1. Provided path parameter
    /// 2. THERMOD_CONFIG environment variable
    /// 3. XDG_CONFIG_HOME/thermod/config.yml or ~/.config/thermod/config.yml
    /// 4. /etc/thermod/config.yml
    pub async fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p,
            None => locate_config().context("No configuration file found")?,
        };

        info!("Loading config from: {}", config_path.display());
        let config = Self::load_config_from_path(&config_path)?;

        Ok(Self::new(config, config_path))
    }

    /// Gets a read-only reference to the current configuration.
    pub async fn get(&self) -> tokio::sync::RwLockReadGuard<'_, Config> {
        self.config.read().await
    }

    /// Returns the path the configuration was loaded from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Clones the current configuration.
    pub async fn clone_config(&self) -> Config {
        self.config.read().await.clone()
    }

    fn load_config_from_path(path: &Path) -> Result<Config> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse YAML in: {}", path.display()))?;

        if config.version != 1 {
            anyhow::bail!(
                "Unsupported config version {} in file: {}",
                config.version,
                path.display()
            );
        }

        config
            .validate()
            .with_context(|| format!("Configuration validation failed for: {}", path.display()))?;

        Ok(config)
    }
}
