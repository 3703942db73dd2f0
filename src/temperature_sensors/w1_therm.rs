//! DS18B20-style sensor on the kernel 1-Wire bus.
//!
//! The kernel exposes each probe as `/sys/bus/w1/devices/<id>/w1_slave`:
//!
//! ```text
//! 6e 01 4b 46 7f ff 02 10 71 : crc=71 YES
//! 6e 01 4b 46 7f ff 02 10 71 t=22875
//! ```
//!
//! A CRC line not ending in `YES` means the conversion has not settled yet;
//! that is the transient not-ready fault the reader retries on.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;

use crate::sensors::{SensorError, SensorPort};

const W1_DEVICES_DIR: &str = "/sys/bus/w1/devices";

/// DS18B20 family code prefix on the 1-Wire bus.
const THERM_FAMILY_PREFIX: &str = "28-";

pub struct W1ThermSource {
    key: String,
    slave_path: PathBuf,
}

impl W1ThermSource {
    /// Opens the given device id, or the first DS18B20 on the bus when
    /// `device` is `None`.
    pub fn open(device: Option<&str>) -> Result<Self> {
        Self::open_at(Path::new(W1_DEVICES_DIR), device)
    }

    fn open_at(devices_dir: &Path, device: Option<&str>) -> Result<Self> {
        let id = match device {
            Some(id) => id.to_string(),
            None => discover_first(devices_dir)?,
        };

        let slave_path = devices_dir.join(&id).join("w1_slave");
        if !slave_path.exists() {
            anyhow::bail!(
                "1-Wire device '{id}' not found at {}",
                slave_path.display()
            );
        }

        Ok(Self {
            key: id,
            slave_path,
        })
    }
}

fn discover_first(devices_dir: &Path) -> Result<String> {
    let mut ids: Vec<String> = fs::read_dir(devices_dir)
        .with_context(|| format!("failed to scan {}", devices_dir.display()))?
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| name.starts_with(THERM_FAMILY_PREFIX))
        .collect();
    ids.sort();

    ids.into_iter()
        .next()
        .ok_or_else(|| anyhow!("no 1-Wire thermal device under {}", devices_dir.display()))
}

fn parse_w1_payload(raw: &str) -> Result<f32, SensorError> {
    let mut lines = raw.lines();

    let crc_line = lines
        .next()
        .ok_or_else(|| SensorError::InvalidData("empty w1_slave payload".to_string()))?;
    if !crc_line.trim_end().ends_with("YES") {
        return Err(SensorError::NotReady);
    }

    let data_line = lines
        .next()
        .ok_or_else(|| SensorError::InvalidData("missing w1_slave data line".to_string()))?;
    let (_, raw_temp) = data_line
        .rsplit_once("t=")
        .ok_or_else(|| SensorError::InvalidData(format!("no t= field in '{data_line}'")))?;
    let millidegrees: i32 = raw_temp
        .trim()
        .parse()
        .map_err(|_| SensorError::InvalidData(format!("unparseable t= value '{}'", raw_temp.trim())))?;

    Ok(millidegrees as f32 / 1000.0)
}

#[async_trait]
impl SensorPort for W1ThermSource {
    async fn read(&self) -> Result<f32, SensorError> {
        let raw = fs::read_to_string(&self.slave_path)
            .map_err(|e| SensorError::Unavailable(format!("{}: {e}", self.slave_path.display())))?;
        parse_w1_payload(&raw)
    }

    async fn sensor_name(&self) -> Option<String> {
        Some(format!("w1:{}", self.key))
    }
}
