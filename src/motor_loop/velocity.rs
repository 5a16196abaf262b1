// Velocity control laws
//
// Error is (setpoint << 2) - clicks. Both laws accumulate into a high-resolution
// output clamped to +/-HIRES_LIMIT and shifted right by HIRES_SHIFT to a duty.

use clap::ValueEnum;

use crate::config::MOTOR_MAX_SPEED;

pub const KP: i32 = 3;
pub const KD: i32 = 4;

pub const KPS: i32 = 8;
pub const KIS: i32 = 8;
pub const KDS: i32 = 16;

pub const HIRES_LIMIT: i32 = 8128;
pub const HIRES_SHIFT: u32 = 6;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum VelocityLaw {
    /// Incremental proportional-derivative
    #[default]
    Pd,
    /// Positional PID with a leaky integral
    Pid,
}

#[derive(Debug, Clone, Default)]
pub struct VelocityController {
    law: VelocityLaw,
    error: i32,
    integral: i32,
    hires: i32,
}

impl VelocityController {
    pub fn new(law: VelocityLaw) -> Self {
        Self {
            law,
            ..Self::default()
        }
    }

    pub fn error(&self) -> i32 {
        self.error
    }

    pub fn integral(&self) -> i32 {
        self.integral
    }

    pub fn hires(&self) -> i32 {
        self.hires
    }

    /// Fold a current-limit correction into the integral term
    pub fn absorb(&mut self, correction: i16) {
        self.integral = self.integral.saturating_add(correction as i32);
    }

    /// Duty for this tick; 0 for a zero or out-of-range setpoint
    pub fn compute(&mut self, setpoint: i8, clicks: i8) -> i8 {
        if setpoint == 0 || setpoint.unsigned_abs() > MOTOR_MAX_SPEED as u8 {
            return 0;
        }

        let last_error = self.error;
        self.error = ((setpoint as i32) << 2) - clicks as i32;
        let d_error = self.error - last_error;

        self.hires = match self.law {
            VelocityLaw::Pd => self.hires + self.error * KP + d_error * KD,
            VelocityLaw::Pid => {
                self.integral = self.integral * 63 / 64 + self.error;
                self.error * KPS + self.integral * KIS + d_error * KDS
            }
        };
        self.hires = self.hires.clamp(-HIRES_LIMIT, HIRES_LIMIT);

        (self.hires >> HIRES_SHIFT) as i8
    }
}
