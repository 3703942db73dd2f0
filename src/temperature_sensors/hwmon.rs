//! Linux hwmon temperature input.
//!
//! Resolves a device by the `name` attribute under `/sys/class/hwmon` and
//! reads the configured `temp<n>_input`, which reports millidegrees Celsius.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;

use crate::sensors::{SensorError, SensorPort};

const HWMON_BASE: &str = "/sys/class/hwmon";

pub struct HwmonSource {
    key: String,
    input_path: PathBuf,
}

impl HwmonSource {
    /// Opens the `input` (e.g. "temp1") of the hwmon device named `device`.
    pub fn open(device: &str, input: &str) -> Result<Self> {
        Self::open_at(Path::new(HWMON_BASE), device, input)
    }

    fn open_at(base: &Path, device: &str, input: &str) -> Result<Self> {
        let device_dir = find_hwmon_by_name(base, device)?;
        let input_path = device_dir.join(format!("{input}_input"));
        if !input_path.exists() {
            anyhow::bail!(
                "hwmon device '{device}' has no input {}",
                input_path.display()
            );
        }

        Ok(Self {
            key: format!("{device}/{input}"),
            input_path,
        })
    }
}

fn find_hwmon_by_name(base: &Path, device_name: &str) -> Result<PathBuf> {
    let entries = fs::read_dir(base).with_context(|| format!("failed to read {}", base.display()))?;

    let mut found = None;
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let Ok(contents) = fs::read_to_string(path.join("name")) else {
            continue;
        };
        if contents.trim() == device_name {
            if found.is_some() {
                anyhow::bail!("multiple hwmon devices named '{device_name}'");
            }
            found = Some(path);
        }
    }

    found.ok_or_else(|| anyhow!("no hwmon device named '{device_name}' under {}", base.display()))
}

fn parse_millidegrees(raw: &str) -> Result<f32, SensorError> {
    let millidegrees: i32 = raw
        .trim()
        .parse()
        .map_err(|_| SensorError::InvalidData(format!("unparseable hwmon value '{}'", raw.trim())))?;
    Ok(millidegrees as f32 / 1000.0)
}

#[async_trait]
impl SensorPort for HwmonSource {
    async fn read(&self) -> Result<f32, SensorError> {
        let raw = fs::read_to_string(&self.input_path)
            .map_err(|e| SensorError::Unavailable(format!("{}: {e}", self.input_path.display())))?;
        parse_millidegrees(&raw)
    }

    async fn sensor_name(&self) -> Option<String> {
        Some(format!("hwmon:{}", self.key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn fake_hwmon(base: &Path, dir: &str, name: &str, input: &str, value: &str) {
        let device_dir = base.join(dir);
        fs::create_dir_all(&device_dir).unwrap();
        fs::write(device_dir.join("name"), format!("{name}\n")).unwrap();
        fs::write(device_dir.join(format!("{input}_input")), value).unwrap();
    }

    #[tokio::test]
    async fn reads_millidegrees_from_named_device() {
        let base = tempdir().unwrap();
        fake_hwmon(base.path(), "hwmon0", "acpitz", "temp1", "27800\n");
        fake_hwmon(base.path(), "hwmon1", "k10temp", "temp1", "42500\n");

        let sensor = HwmonSource::open_at(base.path(), "k10temp", "temp1").unwrap();
        assert_eq!(sensor.read().await, Ok(42.5));
        assert_eq!(sensor.sensor_name().await.as_deref(), Some("hwmon:k10temp/temp1"));
    }

    #[test]
    fn unknown_device_name_is_an_error() {
        let base = tempdir().unwrap();
        fake_hwmon(base.path(), "hwmon0", "acpitz", "temp1", "27800\n");

        assert!(HwmonSource::open_at(base.path(), "k10temp", "temp1").is_err());
    }

    #[test]
    fn missing_input_is_an_error() {
        let base = tempdir().unwrap();
        fake_hwmon(base.path(), "hwmon0", "k10temp", "temp1", "42500\n");

        assert!(HwmonSource::open_at(base.path(), "k10temp", "temp7").is_err());
    }

    #[tokio::test]
    async fn garbage_input_is_invalid_data() {
        let base = tempdir().unwrap();
        fake_hwmon(base.path(), "hwmon0", "k10temp", "temp1", "not-a-number\n");

        let sensor = HwmonSource::open_at(base.path(), "k10temp", "temp1").unwrap();
        assert!(matches!(
            sensor.read().await,
            Err(SensorError::InvalidData(_))
        ));
    }
}
