// Direction-aware duty actuation of one H-bridge
//
// A signed duty in [-127, 127] drives one of two PWM channels. Reversing
// direction costs one tick with both channels and both low-side switches off,
// so the two halves of the bridge never conduct at the same time.

use crate::config::MOTOR_MAX_PWM;

/// Narrow capability interface onto the power stage, implemented per platform
pub trait HBridge {
    /// Compare values of the forward (A) and reverse (B) PWM channels
    fn set_duty(&mut self, a: u8, b: u8);
    /// Low-side switches of each half bridge
    fn set_low_side(&mut self, low_a: bool, low_b: bool);
    /// Driver enable line
    fn set_enable(&mut self, on: bool);
}

// 0..=127 onto the 8-bit compare register, full scale pinned to 255
fn compare_value(magnitude: u8) -> u8 {
    if magnitude >= MOTOR_MAX_PWM as u8 {
        255
    } else {
        2 * magnitude
    }
}

fn is_forward(speed: i8) -> bool {
    speed >= 0
}

pub struct DutyActuator<B> {
    bridge: B,
    last_speed: i8,
}

impl<B: HBridge> DutyActuator<B> {
    /// Takes the bridge with both channels off and the driver enabled
    pub fn new(mut bridge: B) -> Self {
        bridge.set_duty(0, 0);
        bridge.set_low_side(false, false);
        bridge.set_enable(true);
        Self {
            bridge,
            last_speed: 0,
        }
    }

    pub fn bridge(&self) -> &B {
        &self.bridge
    }

    /// Apply a signed duty; returns the duty actually driven this tick
    pub fn set_speed(&mut self, speed: i8) -> i8 {
        let speed = speed.max(-MOTOR_MAX_PWM);
        let reversing = is_forward(speed) != is_forward(self.last_speed);
        self.last_speed = speed;

        if reversing {
            self.bridge.set_duty(0, 0);
            self.bridge.set_low_side(false, false);
            return 0;
        }

        let magnitude = compare_value(speed.unsigned_abs());
        match speed {
            s if s > 0 => {
                self.bridge.set_duty(magnitude, 0);
                self.bridge.set_low_side(false, true);
            }
            s if s < 0 => {
                self.bridge.set_duty(0, magnitude);
                self.bridge.set_low_side(true, false);
            }
            _ => {
                self.bridge.set_duty(0, 0);
                self.bridge.set_low_side(false, false);
            }
        }
        speed
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Bridge that remembers the last values written
    #[derive(Debug, Default)]
    pub(crate) struct RecordingBridge {
        pub duty: (u8, u8),
        pub low_side: (bool, bool),
        pub enabled: bool,
    }

    impl HBridge for RecordingBridge {
        fn set_duty(&mut self, a: u8, b: u8) {
            self.duty = (a, b);
        }

        fn set_low_side(&mut self, low_a: bool, low_b: bool) {
            self.low_side = (low_a, low_b);
        }

        fn set_enable(&mut self, on: bool) {
            self.enabled = on;
        }
    }

    #[test]
    fn test_forward_duty() {
        let mut act = DutyActuator::new(RecordingBridge::default());
        assert!(act.bridge().enabled);

        assert_eq!(act.set_speed(50), 50);
        assert_eq!(act.bridge().duty, (100, 0));
        assert_eq!(act.bridge().low_side, (false, true));

        act.set_speed(127);
        assert_eq!(act.bridge().duty, (255, 0));
    }

    #[test]
    fn test_reversal_forces_dead_tick() {
        let mut act = DutyActuator::new(RecordingBridge::default());
        act.set_speed(60);

        assert_eq!(act.set_speed(-60), 0);
        assert_eq!(act.bridge().duty, (0, 0));
        assert_eq!(act.bridge().low_side, (false, false));

        assert_eq!(act.set_speed(-60), -60);
        assert_eq!(act.bridge().duty, (0, 120));
        assert_eq!(act.bridge().low_side, (true, false));

        // And back again
        assert_eq!(act.set_speed(10), 0);
        assert_eq!(act.set_speed(10), 10);
    }

    #[test]
    fn test_zero_counts_as_forward() {
        let mut act = DutyActuator::new(RecordingBridge::default());
        assert_eq!(act.set_speed(0), 0);
        assert_eq!(act.bridge().duty, (0, 0));
        assert_eq!(act.set_speed(30), 30);
    }

    #[test]
    fn test_full_reverse_clamped() {
        let mut act = DutyActuator::new(RecordingBridge::default());
        act.set_speed(-1);
        assert_eq!(act.set_speed(-128), -127);
        assert_eq!(act.bridge().duty, (0, 255));
    }
}
