//! Temperature sensor sources.

pub mod hwmon;
pub mod w1_therm;

use anyhow::Result;

use crate::{config::SensorCfg, sensors::SensorPort};

/// Builds the configured sensor source.
pub fn from_cfg(cfg: &SensorCfg) -> Result<Box<dyn SensorPort>> {
    match cfg {
        SensorCfg::W1Therm { device } => Ok(Box::new(w1_therm::W1ThermSource::open(
            device.as_deref(),
        )?)),
        SensorCfg::Hwmon { device, input } => {
            Ok(Box::new(hwmon::HwmonSource::open(device, input)?))
        }
    }
}
