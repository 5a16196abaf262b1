// Omniwheel inverse kinematics for the 3-wheel holonomic base
// Converts body-frame velocities (x, y, theta) to per-wheel velocities in fixed point.

use crate::config::{MOTOR_MAX_SPEED, NUM_MOTORS};

/// Wheel mounting angles (degrees from the reference axis)
pub const WHEEL_ANGLES_DEG: [i32; NUM_MOTORS] = [100, 220, 340];

/// Fixed-point scale of the wheel gains
pub const GAIN_SCALE: i32 = 1024;

/// Per-wheel gains, scaled by 1024
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WheelGains {
    /// cos(90 + angle)
    pub x: i32,
    /// -sin(90 + angle), y axis points left
    pub y: i32,
    /// 1.07, rotation contributes equally to every wheel
    pub theta: i32,
}

impl WheelGains {
    const fn new(x: i32, y: i32, theta: i32) -> Self {
        Self { x, y, theta }
    }
}

pub const WHEEL_GAINS: [WheelGains; NUM_MOTORS] = [
    WheelGains::new(-1008, 178, 1096),
    WheelGains::new(658, 784, 1096),
    WheelGains::new(350, -962, 1096),
];

/// Convert body-frame velocities to wheel velocities.
///
/// If any wheel exceeds `MOTOR_MAX_SPEED`, all three are scaled by the same
/// ratio so the fastest one lands on the limit and direction is preserved.
pub fn xytheta_to_wheels(x: i8, y: i8, theta: i8) -> [i8; NUM_MOTORS] {
    let (x, y, theta) = (x as i32, y as i32, theta as i32);

    let mut wheels =
        WHEEL_GAINS.map(|g| (x * g.x + y * g.y + theta * g.theta) / GAIN_SCALE);

    let max = wheels.iter().map(|w| w.abs()).max().unwrap_or(0);
    let limit = MOTOR_MAX_SPEED as i32;
    if max > limit {
        for w in &mut wheels {
            *w = *w * limit / max;
        }
    }

    wheels.map(|w| w as i8)
}

///
/// These tests are used to verify the correctness of the kinematics module.
/// They are run using the `cargo test` command.
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_velocity() {
        assert_eq!(xytheta_to_wheels(0, 0, 0), [0, 0, 0]);
    }

    #[test]
    fn test_gains_match_mounting_angles() {
        for (angle, gains) in WHEEL_ANGLES_DEG.iter().zip(WHEEL_GAINS.iter()) {
            let rad = ((90 + angle) as f64).to_radians();
            let x = (rad.cos() * GAIN_SCALE as f64).round() as i32;
            let y = (-rad.sin() * GAIN_SCALE as f64).round() as i32;
            assert!((gains.x - x).abs() <= 1, "x gain for {}°", angle);
            assert!((gains.y - y).abs() <= 1, "y gain for {}°", angle);
            assert_eq!(gains.theta, (1.07 * GAIN_SCALE as f64).round() as i32);
        }
    }

    #[test]
    fn test_rotation_only() {
        // Pure rotation spins all wheels the same way: 20 * 1096 / 1024 = 21
        assert_eq!(xytheta_to_wheels(0, 0, 20), [21, 21, 21]);
        assert_eq!(xytheta_to_wheels(0, 0, -20), [-21, -21, -21]);
    }

    #[test]
    fn test_forward_motion() {
        // 50 along x: -1008*50/1024, 658*50/1024, 350*50/1024 (truncating)
        assert_eq!(xytheta_to_wheels(50, 0, 0), [-49, 32, 17]);
    }

    #[test]
    fn test_saturation_preserves_ratios() {
        let raw: Vec<i32> = WHEEL_GAINS
            .iter()
            .map(|g| (127 * g.x + 127 * g.y + 127 * g.theta) / GAIN_SCALE)
            .collect();
        let wheels = xytheta_to_wheels(127, 127, 127);

        let max_out = wheels.iter().map(|w| (*w as i32).abs()).max().unwrap();
        assert_eq!(max_out, MOTOR_MAX_SPEED as i32);

        let max_raw = raw.iter().map(|w| w.abs()).max().unwrap();
        for (out, raw) in wheels.iter().zip(raw.iter()) {
            assert_eq!(*out as i32, raw * 100 / max_raw);
            // Same sign as the unsaturated value
            assert!((*out as i32) * raw >= 0);
        }
    }

    #[test]
    fn test_full_negative_input_saturates() {
        let wheels = xytheta_to_wheels(-128, 0, -128);
        for w in wheels {
            assert!((-100..=100).contains(&w));
        }
        assert!(wheels.iter().any(|w| w.abs() == 100));
    }
}
