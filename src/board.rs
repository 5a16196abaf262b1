// Board collaborators the host-facing controller drives
//
// LED rendering, analog reference and amplifier switches, sensor sampling and
// the supply monitor all live outside the control core. Platforms implement
// `Board`; `bench::LoggingBoard` stands in when no hardware is attached.

use serde::{Deserialize, Serialize};

use crate::protocol::messages::LED_NUM_LEDS;
use crate::protocol::{LedMode, Rgb, SensorReadings};

/// Patterns the LED renderer knows how to draw
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedPattern {
    Clear,
    Battery,
    Ball,
    Error,
    Emergency,
    Busy,
    Custom([Rgb; LED_NUM_LEDS]),
    /// Drawn every tick while the charger is active
    ChargeStatus,
    /// Shown when the machine interface takes over
    MachineInterface,
    /// Shown when control returns to the local user interface
    UserInterface,
}

impl LedPattern {
    /// Pattern requested by a command's LED mode, if it asks for one.
    ///
    /// Custom colours are only drawn when a colour block came with the
    /// frame; `None` keeps whatever is showing.
    pub fn from_command(mode: LedMode, leds: Option<&[Rgb; LED_NUM_LEDS]>) -> Option<Self> {
        match mode {
            LedMode::Clear => Some(LedPattern::Clear),
            LedMode::Battery => Some(LedPattern::Battery),
            LedMode::Ball => Some(LedPattern::Ball),
            LedMode::Error => Some(LedPattern::Error),
            LedMode::Emergency => Some(LedPattern::Emergency),
            LedMode::Busy => Some(LedPattern::Busy),
            LedMode::None | LedMode::Custom => leds.map(|colors| LedPattern::Custom(*colors)),
            LedMode::Exit | LedMode::Unknown(_) => None,
        }
    }
}

pub trait Board {
    fn show_leds(&mut self, pattern: &LedPattern);
    fn set_vref(&mut self, on: bool);
    fn set_amplifier(&mut self, on: bool);
    /// Latest reading of every sensor peripheral
    fn read_sensors(&mut self) -> SensorReadings;
    /// Supply monitor reports healthy
    fn monitor_ok(&self) -> bool;
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Board that records every call
    #[derive(Debug, Default)]
    pub(crate) struct RecordingBoard {
        pub patterns: Vec<LedPattern>,
        pub vref: Option<bool>,
        pub amplifier: Option<bool>,
        pub sensors: SensorReadings,
        pub monitor: bool,
    }

    impl RecordingBoard {
        pub fn last_pattern(&self) -> Option<&LedPattern> {
            self.patterns.last()
        }
    }

    impl Board for RecordingBoard {
        fn show_leds(&mut self, pattern: &LedPattern) {
            self.patterns.push(*pattern);
        }

        fn set_vref(&mut self, on: bool) {
            self.vref = Some(on);
        }

        fn set_amplifier(&mut self, on: bool) {
            self.amplifier = Some(on);
        }

        fn read_sensors(&mut self) -> SensorReadings {
            self.sensors
        }

        fn monitor_ok(&self) -> bool {
            self.monitor
        }
    }

    #[test]
    fn test_pattern_from_command() {
        assert_eq!(
            LedPattern::from_command(LedMode::Clear, None),
            Some(LedPattern::Clear)
        );
        assert_eq!(
            LedPattern::from_command(LedMode::Emergency, None),
            Some(LedPattern::Emergency)
        );
        assert_eq!(LedPattern::from_command(LedMode::Unknown(9), None), None);
        assert_eq!(LedPattern::from_command(LedMode::Exit, None), None);
    }

    #[test]
    fn test_custom_needs_colors() {
        assert_eq!(LedPattern::from_command(LedMode::Custom, None), None);
        assert_eq!(LedPattern::from_command(LedMode::None, None), None);

        let colors = [Rgb::new(1, 2, 3); LED_NUM_LEDS];
        assert_eq!(
            LedPattern::from_command(LedMode::Custom, Some(&colors)),
            Some(LedPattern::Custom(colors))
        );
    }
}
