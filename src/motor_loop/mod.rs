// Per-motor control loop (motor controller side)
//
// Each tick: velocity law (or raw duty) -> current limit -> power limit ->
// direction-aware actuation. Bus packets from the host latch the mode,
// setpoint and bus voltage, and are answered with the last measurements.

pub mod actuator;
pub mod current_limit;
pub mod power_limit;
pub mod velocity;

use tracing::trace;

use crate::config::MOTOR_MAX_PWM;
use crate::motion::bus::{
    DriveMode, MOTOR_NUM_BYTES, MOTOR_PACKET_HEADER, MOTOR_PWM_HEADER, MotorReply,
};
use crate::protocol::MotorStatus;

pub use actuator::{DutyActuator, HBridge};
pub use current_limit::CurrentLimiter;
pub use power_limit::PowerLimiter;
pub use velocity::{VelocityController, VelocityLaw};

/// Out-of-range setpoint the loop starts with, so the motor stays idle
/// until the host sends a real one
pub const NEUTRAL_SETPOINT: i8 = 101;

/// Bus voltage assumed until the host reports one
const DEFAULT_BUS_VOLTAGE: u8 = 255;

/// Sampled once per tick by the platform
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Measurements {
    /// Encoder clicks since the previous tick
    pub clicks: i8,
    pub current: u8,
    pub temperature: u8,
}

pub struct MotorLoop<B> {
    actuator: DutyActuator<B>,
    current_limit: CurrentLimiter,
    power_limit: PowerLimiter,
    velocity: VelocityController,
    mode: DriveMode,
    setpoint: i8,
    bus_voltage: u8,
    duty: i8,
    last: Measurements,
}

impl<B: HBridge> MotorLoop<B> {
    pub fn new(bridge: B, law: VelocityLaw) -> Self {
        Self {
            actuator: DutyActuator::new(bridge),
            current_limit: CurrentLimiter::new(),
            power_limit: PowerLimiter::new(),
            velocity: VelocityController::new(law),
            mode: DriveMode::Velocity,
            setpoint: NEUTRAL_SETPOINT,
            bus_voltage: DEFAULT_BUS_VOLTAGE,
            duty: 0,
            last: Measurements::default(),
        }
    }

    pub fn mode(&self) -> DriveMode {
        self.mode
    }

    pub fn setpoint(&self) -> i8 {
        self.setpoint
    }

    pub fn bus_voltage(&self) -> u8 {
        self.bus_voltage
    }

    /// Duty driven on the last tick
    pub fn duty(&self) -> i8 {
        self.duty
    }

    pub fn bridge(&self) -> &B {
        self.actuator.bridge()
    }

    pub fn power_limiter(&self) -> &PowerLimiter {
        &self.power_limit
    }

    pub fn tick(&mut self, measured: Measurements) -> i8 {
        self.last = measured;

        let speed = match self.mode {
            DriveMode::Velocity => self.velocity.compute(self.setpoint, measured.clicks),
            DriveMode::Voltage => self.setpoint.max(-MOTOR_MAX_PWM),
        };

        let limited = self.current_limit.apply(speed, measured.current);
        self.velocity.absorb(limited.folded);

        let speed = self
            .power_limit
            .apply(limited.setpoint, measured.current, self.bus_voltage);

        self.duty = self.actuator.set_speed(speed);
        self.duty
    }

    /// Reply clocked out during the next exchange
    pub fn reply(&self) -> [u8; MOTOR_NUM_BYTES] {
        MotorReply::from_status(MotorStatus {
            voltage: self.duty,
            clicks: self.last.clicks,
            current: self.last.current,
            temperature: self.last.temperature,
        })
        .0
    }

    /// Handle one packet from the host, returning the bytes clocked back
    pub fn on_packet(&mut self, packet: &[u8; MOTOR_NUM_BYTES]) -> [u8; MOTOR_NUM_BYTES] {
        let reply = self.reply();

        self.mode = match packet[0] {
            MOTOR_PACKET_HEADER => DriveMode::Velocity,
            MOTOR_PWM_HEADER => DriveMode::Voltage,
            other => {
                trace!("Ignoring motor packet with header 0x{:02X}", other);
                return reply;
            }
        };
        self.setpoint = packet[1] as i8;
        self.bus_voltage = packet[2];

        reply
    }
}
