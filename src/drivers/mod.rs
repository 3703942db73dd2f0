//! Relay hardware drivers.

pub mod sysfs_relay;

use anyhow::Result;

use crate::{config::RelayBankCfg, relays::RelayPort};

/// Builds the configured relay bank, claiming every given channel.
pub fn from_cfg(cfg: &RelayBankCfg, channels: &[u8]) -> Result<Box<dyn RelayPort>> {
    match cfg {
        RelayBankCfg::SysfsGpio { active_low } => Ok(Box::new(
            sysfs_relay::SysfsRelayBank::open(channels, *active_low)?,
        )),
    }
}
