// Slew-rate limiter for the three wheel setpoints
//
// Speeds are interpolated in 16.16 fixed point. The step count is the largest
// per-wheel change times MOTOR_SLEW_RATE, so the wheel with the biggest change
// moves one unit per tick and the others move proportionally. The final tick
// snaps every wheel to its exact target.

use crate::config::{MOTOR_MAX_SPEED, MOTOR_SLEW_RATE, NUM_MOTORS};

const FRAC_BITS: u32 = 16;

pub(crate) fn clamp_speed(speed: i8) -> i8 {
    speed.clamp(-MOTOR_MAX_SPEED, MOTOR_MAX_SPEED)
}

/// Setpoint state of one wheel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WheelSetpoint {
    /// Value currently sent to the motor controller
    pub current_speed: i8,
    /// Slew target
    pub final_speed: i8,
    /// current speed in 16.16 fixed point
    speed_accum: i32,
    /// Per-tick change in 16.16 fixed point
    slew_increment: i32,
}

/// Slew progress shared by all three wheels
#[derive(Debug, Clone, Default)]
pub struct Slew {
    wheels: [WheelSetpoint; NUM_MOTORS],
    steps_total: u32,
    steps_done: u32,
}

impl Slew {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_speeds(&self) -> [i8; NUM_MOTORS] {
        self.wheels.map(|w| w.current_speed)
    }

    pub fn final_speeds(&self) -> [i8; NUM_MOTORS] {
        self.wheels.map(|w| w.final_speed)
    }

    pub fn steps_total(&self) -> u32 {
        self.steps_total
    }

    pub fn steps_done(&self) -> u32 {
        self.steps_done
    }

    pub fn is_slewing(&self) -> bool {
        self.steps_done < self.steps_total
    }

    /// Begin slewing toward `targets` (clamped to the speed limit).
    ///
    /// Returns the number of ticks the slew will take; 0 if the wheels are
    /// already at the targets.
    pub fn start(&mut self, targets: [i8; NUM_MOTORS]) -> u32 {
        let targets = targets.map(clamp_speed);

        let max_delta = self
            .wheels
            .iter()
            .zip(targets.iter())
            .map(|(w, &t)| (t as i32 - w.current_speed as i32).unsigned_abs())
            .max()
            .unwrap_or(0);
        let steps = max_delta * MOTOR_SLEW_RATE;

        for (w, &target) in self.wheels.iter_mut().zip(targets.iter()) {
            w.final_speed = target;
            w.speed_accum = (w.current_speed as i32) << FRAC_BITS;
            w.slew_increment = if steps == 0 {
                0
            } else {
                ((target as i32 - w.current_speed as i32) << FRAC_BITS) / steps as i32
            };
        }

        self.steps_total = steps;
        self.steps_done = 0;
        steps
    }

    /// Set speeds immediately, abandoning any slew in progress
    pub fn set_immediate(&mut self, speeds: [i8; NUM_MOTORS]) {
        for (w, &speed) in self.wheels.iter_mut().zip(speeds.iter()) {
            let speed = clamp_speed(speed);
            w.current_speed = speed;
            w.final_speed = speed;
            w.speed_accum = (speed as i32) << FRAC_BITS;
            w.slew_increment = 0;
        }
        self.steps_total = 0;
        self.steps_done = 0;
    }

    /// Advance one control tick
    pub fn tick(&mut self) {
        if self.steps_done >= self.steps_total {
            return;
        }

        self.steps_done += 1;
        let arrived = self.steps_done == self.steps_total;

        for w in &mut self.wheels {
            if arrived {
                w.current_speed = w.final_speed;
            } else {
                w.speed_accum += w.slew_increment;
                w.current_speed = (w.speed_accum >> FRAC_BITS) as i8;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_to_completion(slew: &mut Slew, start: [i8; 3], targets: [i8; 3]) {
        let steps = slew.start(targets);
        assert_eq!(steps, slew.steps_total());

        let mut previous = start;
        for tick in 1..=steps {
            slew.tick();
            let now = slew.current_speeds();
            for i in 0..3 {
                let target = clamp_speed(targets[i]);
                let (lo, hi) = if start[i] <= target {
                    (start[i], target)
                } else {
                    (target, start[i])
                };
                assert!((lo..=hi).contains(&now[i]), "wheel {} overshoot", i);
                if start[i] <= target {
                    assert!(now[i] >= previous[i], "wheel {} not monotonic", i);
                } else {
                    assert!(now[i] <= previous[i], "wheel {} not monotonic", i);
                }
            }
            assert_eq!(slew.steps_done(), tick);
            previous = now;
        }

        assert_eq!(slew.current_speeds(), targets.map(clamp_speed));
        assert!(!slew.is_slewing());
    }

    #[test]
    fn test_slew_arrives_in_exact_steps() {
        let cases: [([i8; 3], [i8; 3]); 5] = [
            ([0, 0, 0], [50, -50, 0]),
            ([50, -50, 0], [-3, 7, 100]),
            ([-100, 100, 1], [100, -100, -1]),
            ([10, 10, 10], [11, 13, 12]),
            ([0, 0, 0], [127, -128, 5]),
        ];
        for (start, targets) in cases {
            let mut slew = Slew::new();
            slew.set_immediate(start);
            run_to_completion(&mut slew, start, targets);
        }
    }

    #[test]
    fn test_step_count_is_largest_change() {
        let mut slew = Slew::new();
        assert_eq!(slew.start([50, -50, 0]), 50);
        assert_eq!(slew.final_speeds(), [50, -50, 0]);
        assert_eq!(slew.current_speeds(), [0, 0, 0]);

        slew.tick();
        assert_eq!(slew.current_speeds(), [1, -1, 0]);
    }

    #[test]
    fn test_no_change_is_noop() {
        let mut slew = Slew::new();
        slew.set_immediate([20, 30, 40]);
        assert_eq!(slew.start([20, 30, 40]), 0);
        slew.tick();
        assert_eq!(slew.current_speeds(), [20, 30, 40]);
        assert_eq!(slew.steps_done(), 0);
    }

    #[test]
    fn test_retarget_mid_slew_starts_from_current() {
        let mut slew = Slew::new();
        slew.start([100, 0, 0]);
        for _ in 0..10 {
            slew.tick();
        }
        assert_eq!(slew.current_speeds(), [10, 0, 0]);

        assert_eq!(slew.start([0, 0, 0]), 10);
        assert_eq!(slew.steps_done(), 0);
        for _ in 0..10 {
            slew.tick();
        }
        assert_eq!(slew.current_speeds(), [0, 0, 0]);
    }

    #[test]
    fn test_targets_are_clamped() {
        let mut slew = Slew::new();
        slew.start([127, -128, 0]);
        assert_eq!(slew.final_speeds(), [100, -100, 0]);
        assert_eq!(slew.steps_total(), 100);
    }
}
