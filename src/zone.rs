//! Hysteresis state machine mapping a temperature to relay commands for one
//! heater/fan zone.
//!
//! The closed interval `[lower, upper]` is the dead-band: readings inside it
//! produce no transition and no relay commands, which is what keeps the
//! relays from chattering around a single threshold.

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::config::ZoneCfg;
use crate::relays::{RelayCommand, RelayState};

/// Temperature band for one zone, in degrees Celsius.
///
/// Invariant `lower < upper`, checked at config validation; immutable for the
/// zone's lifetime.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ThresholdBand {
    pub lower: f32,
    pub upper: f32,
}

impl ThresholdBand {
    /// Whether `t` falls inside the closed dead-band.
    pub fn contains(&self, t: f32) -> bool {
        self.lower <= t && t <= self.upper
    }
}

/// Fan behavior while the zone is not heating.
///
/// The hardware this daemon grew up on keeps the fan running whenever the
/// controller has made any out-of-band decision, so that is the default;
/// `HeaterLinked` switches the fan strictly together with the heater.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum FanMode {
    /// Fan asserted ON on every out-of-band decision, heating or venting.
    #[default]
    Continuous,
    /// Fan mirrors the heater relay.
    HeaterLinked,
}

/// Bistable state of a zone's heater.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneState {
    Idle,
    Heating,
}

/// Hysteresis controller for one heater/fan relay pair.
///
/// Pure decision logic: [`evaluate`](Self::evaluate) returns the relay
/// commands implied by a reading and the caller applies them. The retained
/// state is the last commanded state and survives ticks where no valid
/// reading was available.
#[derive(Debug, Clone)]
pub struct ZoneController {
    name: String,
    band: ThresholdBand,
    heater_channel: u8,
    fan_channel: u8,
    fan_mode: FanMode,
    state: ZoneState,
}

impl ZoneController {
    /// Builds a controller from validated zone configuration.
    ///
    /// Starts in `Idle`; the owning loop is expected to drive all channels
    /// OFF once before the first reading (fail-safe startup).
    pub fn new(cfg: &ZoneCfg) -> Self {
        Self {
            name: cfg.name.clone(),
            band: cfg.band,
            heater_channel: cfg.heater_channel,
            fan_channel: cfg.fan_channel,
            fan_mode: cfg.fan_mode,
            state: ZoneState::Idle,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> ZoneState {
        self.state
    }

    /// Commands that put every channel of this zone into the safe state.
    pub fn safe_commands(&self) -> [RelayCommand; 2] {
        [
            RelayCommand::new(self.heater_channel, RelayState::Off),
            RelayCommand::new(self.fan_channel, RelayState::Off),
        ]
    }

    /// Applies one valid reading to the state machine and returns the relay
    /// commands to issue for it.
    ///
    /// Inside the dead-band the current state is retained exactly and no
    /// commands are emitted. Out-of-band decisions re-emit their commands on
    /// every tick; the relay port is idempotent so re-assertion is harmless.
    pub fn evaluate(&mut self, temperature: f32) -> Vec<RelayCommand> {
        if temperature > self.band.upper {
            info!(
                "zone '{}': {temperature:.2}C above upper limit ({:.2}C), heater OFF",
                self.name, self.band.upper
            );
            self.state = ZoneState::Idle;
            let fan = match self.fan_mode {
                FanMode::Continuous => RelayState::On,
                FanMode::HeaterLinked => RelayState::Off,
            };
            vec![
                RelayCommand::new(self.heater_channel, RelayState::Off),
                RelayCommand::new(self.fan_channel, fan),
            ]
        } else if temperature < self.band.lower {
            info!(
                "zone '{}': {temperature:.2}C below lower limit ({:.2}C), heater ON",
                self.name, self.band.lower
            );
            self.state = ZoneState::Heating;
            vec![
                RelayCommand::new(self.heater_channel, RelayState::On),
                RelayCommand::new(self.fan_channel, RelayState::On),
            ]
        } else {
            debug!(
                "zone '{}': {temperature:.2}C within limits ({:.2}C - {:.2}C), keeping current state",
                self.name, self.band.lower, self.band.upper
            );
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn test_zone(lower: f32, upper: f32, fan_mode: FanMode) -> ZoneController {
        ZoneController::new(&ZoneCfg {
            name: "test".to_string(),
            heater_channel: 23,
            fan_channel: 18,
            band: ThresholdBand { lower, upper },
            fan_mode,
        })
    }

    #[test]
    fn starts_idle() {
        let zone = test_zone(30.0, 40.0, FanMode::Continuous);
        assert_eq!(zone.state(), ZoneState::Idle);
    }

    #[test]
    fn below_lower_turns_heater_and_fan_on() {
        let mut zone = test_zone(30.0, 40.0, FanMode::Continuous);
        let commands = zone.evaluate(29.0);

        assert_eq!(zone.state(), ZoneState::Heating);
        assert_eq!(
            commands,
            vec![
                RelayCommand::new(23, RelayState::On),
                RelayCommand::new(18, RelayState::On),
            ]
        );
    }

    #[test]
    fn above_upper_turns_heater_off_and_keeps_fan_on() {
        let mut zone = test_zone(30.0, 40.0, FanMode::Continuous);
        zone.evaluate(29.0);
        let commands = zone.evaluate(41.0);

        assert_eq!(zone.state(), ZoneState::Idle);
        assert_eq!(
            commands,
            vec![
                RelayCommand::new(23, RelayState::Off),
                RelayCommand::new(18, RelayState::On),
            ]
        );
    }

    #[test]
    fn heater_linked_fan_follows_heater_off() {
        let mut zone = test_zone(30.0, 40.0, FanMode::HeaterLinked);
        zone.evaluate(29.0);
        let commands = zone.evaluate(41.0);

        assert_eq!(
            commands,
            vec![
                RelayCommand::new(23, RelayState::Off),
                RelayCommand::new(18, RelayState::Off),
            ]
        );
    }

    #[test]
    fn inside_band_holds_state_and_issues_nothing() {
        let mut zone = test_zone(30.0, 40.0, FanMode::Continuous);
        assert!(zone.evaluate(35.0).is_empty());
        assert_eq!(zone.state(), ZoneState::Idle);

        zone.evaluate(29.0);
        assert!(zone.evaluate(35.0).is_empty());
        assert_eq!(zone.state(), ZoneState::Heating);
    }

    #[test]
    fn exact_boundary_readings_are_inside_the_band() {
        let mut zone = test_zone(30.0, 40.0, FanMode::Continuous);
        zone.evaluate(29.0);

        assert!(zone.evaluate(30.0).is_empty());
        assert!(zone.evaluate(40.0).is_empty());
        assert_eq!(zone.state(), ZoneState::Heating);
    }

    #[test]
    fn crossing_down_through_band_ends_heating() {
        let mut zone = test_zone(30.0, 40.0, FanMode::Continuous);

        zone.evaluate(41.0);
        assert_eq!(zone.state(), ZoneState::Idle);
        zone.evaluate(39.5);
        assert_eq!(zone.state(), ZoneState::Idle);
        zone.evaluate(29.0);
        assert_eq!(zone.state(), ZoneState::Heating);
    }

    #[test]
    fn crossing_up_through_band_ends_idle() {
        let mut zone = test_zone(30.0, 40.0, FanMode::Continuous);

        zone.evaluate(29.0);
        assert_eq!(zone.state(), ZoneState::Heating);
        zone.evaluate(30.5);
        assert_eq!(zone.state(), ZoneState::Heating);
        zone.evaluate(41.0);
        assert_eq!(zone.state(), ZoneState::Idle);
    }

    #[test]
    fn reference_reading_sequence_produces_expected_states() {
        let mut zone = test_zone(30.0, 40.0, FanMode::Continuous);
        let mut states = vec![zone.state()];

        for t in [35.0, 41.0, 35.0, 29.0, 35.0] {
            zone.evaluate(t);
            states.push(zone.state());
        }

        assert_eq!(
            states,
            vec![
                ZoneState::Idle,
                ZoneState::Idle,
                ZoneState::Idle,
                ZoneState::Idle,
                ZoneState::Heating,
                ZoneState::Heating,
            ]
        );
    }

    #[test]
    fn safe_commands_drive_both_channels_off() {
        let mut zone = test_zone(30.0, 40.0, FanMode::Continuous);
        zone.evaluate(29.0);

        assert_eq!(
            zone.safe_commands(),
            [
                RelayCommand::new(23, RelayState::Off),
                RelayCommand::new(18, RelayState::Off),
            ]
        );
    }

    proptest! {
        #[test]
        fn in_band_sequences_never_change_state_or_outputs(
            lower in -20.0f32..60.0,
            width in 1.0f32..30.0,
            fractions in proptest::collection::vec(0.0f32..1.0, 1..40),
            start_heating in any::<bool>(),
        ) {
            let upper = lower + width;
            let mut zone = test_zone(lower, upper, FanMode::Continuous);
            if start_heating {
                zone.evaluate(lower - 1.0);
            }
            let state_before = zone.state();

            for fraction in fractions {
                let t = lower + width * fraction;
                prop_assume!(zone.band.contains(t));
                prop_assert!(zone.evaluate(t).is_empty());
                prop_assert_eq!(zone.state(), state_before);
            }
        }
    }
}
