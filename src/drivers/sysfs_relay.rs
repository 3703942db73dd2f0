//! Relay bank driven through the `/sys/class/gpio` interface.
//!
//! Each configured channel is exported and set to output on open. Dropping
//! the bank drives every channel to its OFF level and unexports it, so the
//! hardware is released de-energized on every exit path, panics included.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::warn;

use crate::relays::{RelayPort, RelayState};

const GPIO_BASE: &str = "/sys/class/gpio";

pub struct SysfsRelayBank {
    base: PathBuf,
    channels: Vec<u8>,
    active_low: bool,
}

impl SysfsRelayBank {
    /// Claims the given GPIO channels and drives them all to OFF.
    pub fn open(channels: &[u8], active_low: bool) -> Result<Self> {
        Self::open_at(PathBuf::from(GPIO_BASE), channels, active_low)
    }

    fn open_at(base: PathBuf, channels: &[u8], active_low: bool) -> Result<Self> {
        let bank = Self {
            base,
            channels: channels.to_vec(),
            active_low,
        };

        for &channel in &bank.channels {
            bank.export(channel)?;
            fs::write(bank.attr_path(channel, "direction"), "out")
                .with_context(|| format!("failed to set direction of gpio{channel}"))?;
            bank.write_value(channel, RelayState::Off)?;
        }

        Ok(bank)
    }

    fn export(&self, channel: u8) -> Result<()> {
        if self.channel_dir(channel).exists() {
            // Already exported, e.g. left over from an unclean stop.
            return Ok(());
        }
        fs::write(self.base.join("export"), channel.to_string())
            .with_context(|| format!("failed to export gpio{channel}"))
    }

    fn channel_dir(&self, channel: u8) -> PathBuf {
        self.base.join(format!("gpio{channel}"))
    }

    fn attr_path(&self, channel: u8, attr: &str) -> PathBuf {
        self.channel_dir(channel).join(attr)
    }

    fn write_value(&self, channel: u8, state: RelayState) -> Result<()> {
        fs::write(self.attr_path(channel, "value"), self.level(state))
            .with_context(|| format!("failed to write gpio{channel} value"))
    }

    /// Pin level for a relay state; active-low boards energize on "0".
    fn level(&self, state: RelayState) -> &'static str {
        match (state, self.active_low) {
            (RelayState::On, true) | (RelayState::Off, false) => "0",
            (RelayState::On, false) | (RelayState::Off, true) => "1",
        }
    }
}

#[async_trait]
impl RelayPort for SysfsRelayBank {
    async fn set(&self, channel: u8, state: RelayState) -> Result<()> {
        if !self.channels.contains(&channel) {
            anyhow::bail!("relay channel {channel} is not part of this bank");
        }
        self.write_value(channel, state)
    }
}

impl Drop for SysfsRelayBank {
    fn drop(&mut self) {
        for &channel in &self.channels {
            if let Err(e) = self.write_value(channel, RelayState::Off) {
                warn!("failed to de-energize gpio{channel} on release: {e:#}");
            }
            if let Err(e) = fs::write(self.base.join("unexport"), channel.to_string()) {
                warn!("failed to unexport gpio{channel}: {e:#}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::Path;
    use tempfile::tempdir;

    fn fake_gpio_base(channels: &[u8]) -> tempfile::TempDir {
        let base = tempdir().unwrap();
        for channel in channels {
            fs::create_dir_all(base.path().join(format!("gpio{channel}"))).unwrap();
        }
        base
    }

    fn value(base: &Path, channel: u8) -> String {
        fs::read_to_string(base.join(format!("gpio{channel}/value"))).unwrap()
    }

    #[test]
    fn open_configures_outputs_and_drives_them_off() {
        let base = fake_gpio_base(&[23, 18]);
        let _bank = SysfsRelayBank::open_at(base.path().to_path_buf(), &[23, 18], true).unwrap();

        for channel in [23, 18] {
            assert_eq!(
                fs::read_to_string(base.path().join(format!("gpio{channel}/direction"))).unwrap(),
                "out"
            );
            assert_eq!(value(base.path(), channel), "1"); // active-low OFF
        }
    }

    #[tokio::test]
    async fn set_maps_states_through_active_low() {
        let base = fake_gpio_base(&[23]);
        let bank = SysfsRelayBank::open_at(base.path().to_path_buf(), &[23], true).unwrap();

        bank.set(23, RelayState::On).await.unwrap();
        assert_eq!(value(base.path(), 23), "0");
        bank.set(23, RelayState::Off).await.unwrap();
        assert_eq!(value(base.path(), 23), "1");
    }

    #[tokio::test]
    async fn set_maps_states_directly_when_active_high() {
        let base = fake_gpio_base(&[23]);
        let bank = SysfsRelayBank::open_at(base.path().to_path_buf(), &[23], false).unwrap();

        bank.set(23, RelayState::On).await.unwrap();
        assert_eq!(value(base.path(), 23), "1");
    }

    #[tokio::test]
    async fn unowned_channel_is_rejected() {
        let base = fake_gpio_base(&[23]);
        let bank = SysfsRelayBank::open_at(base.path().to_path_buf(), &[23], true).unwrap();

        assert!(bank.set(99, RelayState::On).await.is_err());
    }

    #[tokio::test]
    async fn drop_forces_channels_off_and_unexports() {
        let base = fake_gpio_base(&[23, 18]);
        let bank = SysfsRelayBank::open_at(base.path().to_path_buf(), &[23, 18], true).unwrap();
        bank.set(23, RelayState::On).await.unwrap();
        bank.set(18, RelayState::On).await.unwrap();

        drop(bank);

        assert_eq!(value(base.path(), 23), "1");
        assert_eq!(value(base.path(), 18), "1");
        assert!(base.path().join("unexport").exists());
    }
}
