// Motion control engine: wheel setpoints, slewing, command watchdog and bus traffic
//
// Once per control tick:
// 1. stop the wheels if no command arrived for MOTOR_TIMEOUT ticks
// 2. advance the slew
// 3. send the power packet, then one packet per motor
// 4. check the power controller's reply alignment

use tracing::{debug, warn};

use super::bus::{
    BusDevice, BusReplies, ControllerBus, DriveMode, MOTOR_NUM_BYTES, MOTOR_PWR_BYTES, MotorReply,
    PowerReply, motor_packet, power_packet,
};
use super::kinematics::xytheta_to_wheels;
use super::slew::{Slew, clamp_speed};
use crate::config::{MOTOR_TIMEOUT, NUM_MOTORS};
use crate::error::BusError;
use crate::protocol::{MotorStatus, PowerStatus};

pub struct MotionEngine {
    slew: Slew,
    mode: DriveMode,
    timeout_count: u32,
    stale: bool,
    drive_enabled: bool,
    charging_enabled: bool,
    replies: BusReplies,
}

impl Default for MotionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MotionEngine {
    pub fn new() -> Self {
        Self {
            slew: Slew::new(),
            mode: DriveMode::Velocity,
            timeout_count: 0,
            stale: false,
            drive_enabled: true,
            // Avoid accidental charging when the robot is reset on the dock
            charging_enabled: false,
            replies: BusReplies::default(),
        }
    }

    fn on_command(&mut self) {
        self.timeout_count = 0;
        self.stale = false;
    }

    /// Slew all wheels toward new velocities, within +/-MOTOR_MAX_SPEED
    pub fn set_speed_slew(&mut self, targets: [i8; NUM_MOTORS]) {
        self.on_command();

        let targets = targets.map(clamp_speed);
        if self.mode == DriveMode::Velocity && targets == self.slew.final_speeds() {
            return;
        }

        self.mode = DriveMode::Velocity;
        let steps = self.slew.start(targets);
        debug!("Slewing to {:?} over {} ticks", targets, steps);
    }

    /// Slew toward body-frame velocities
    pub fn set_speed_xytheta(&mut self, x: i8, y: i8, theta: i8) {
        self.set_speed_slew(xytheta_to_wheels(x, y, theta));
    }

    /// Raw duty for every wheel, applied on the next tick without slewing
    pub fn set_voltage(&mut self, duty: [i8; NUM_MOTORS]) {
        self.on_command();
        self.mode = DriveMode::Voltage;
        self.slew.set_immediate(duty);
    }

    /// Zero every wheel at once. Does not count as a command for the watchdog.
    pub fn stop(&mut self) {
        self.mode = DriveMode::Voltage;
        self.slew.set_immediate([0; NUM_MOTORS]);
    }

    /// Advance one control tick and exchange packets with every controller.
    ///
    /// A misaligned power controller reply is returned for the caller to record;
    /// the tick itself always completes.
    pub fn tick(&mut self, bus: &mut impl ControllerBus) -> Result<(), BusError> {
        // Stop moving if we haven't received a command for a while
        self.timeout_count += 1;
        if self.timeout_count >= MOTOR_TIMEOUT {
            if !self.stale {
                warn!(
                    "No command for {} ticks, stopping wheels",
                    self.timeout_count
                );
            }
            match self.mode {
                DriveMode::Velocity => self.set_speed_slew([0; NUM_MOTORS]),
                DriveMode::Voltage => self.set_voltage([0; NUM_MOTORS]),
            }
            self.stale = true;
        }

        self.slew.tick();

        // Both come from the previous cycle's power reply
        let volt = self.replies.power.voltage();
        let paralyzed = !self.drive_enabled || self.replies.power.is_charging();

        let tx = power_packet(self.charging_enabled);
        let mut rx = [0u8; MOTOR_PWR_BYTES];
        bus.exchange(BusDevice::Power, &tx, &mut rx);
        self.replies.power = PowerReply(rx);

        let speeds = self.slew.current_speeds();
        for (i, &speed) in speeds.iter().enumerate() {
            let speed = if paralyzed { 0 } else { speed };
            let tx = motor_packet(self.mode, speed, volt);
            let mut rx = [0u8; MOTOR_NUM_BYTES];
            bus.exchange(BusDevice::Motor(i), &tx, &mut rx);
            self.replies.motors[i] = MotorReply(rx);
        }

        self.replies.power.check_alignment()
    }

    pub fn mode(&self) -> DriveMode {
        self.mode
    }

    pub fn slew(&self) -> &Slew {
        &self.slew
    }

    /// Speeds being sent to the motor controllers
    pub fn wheel_speeds(&self) -> [i8; NUM_MOTORS] {
        self.slew.current_speeds()
    }

    pub fn final_speeds(&self) -> [i8; NUM_MOTORS] {
        self.slew.final_speeds()
    }

    pub fn timeout_count(&self) -> u32 {
        self.timeout_count
    }

    /// The watchdog stopped the wheels and no command has arrived since
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn motor_status(&self, motor: usize) -> MotorStatus {
        self.replies
            .motors
            .get(motor)
            .map(MotorReply::status)
            .unwrap_or_default()
    }

    pub fn power_status(&self) -> PowerStatus {
        self.replies.power.status()
    }

    /// Plugged in and charging; the wheels are held still
    pub fn is_charging(&self) -> bool {
        self.replies.power.is_charging()
    }

    /// Returns whether drive was already enabled
    pub fn enable_drive(&mut self) -> bool {
        std::mem::replace(&mut self.drive_enabled, true)
    }

    pub fn disable_drive(&mut self) -> bool {
        std::mem::replace(&mut self.drive_enabled, false)
    }

    /// Returns whether charging was already enabled
    pub fn enable_charging(&mut self) -> bool {
        std::mem::replace(&mut self.charging_enabled, true)
    }

    pub fn disable_charging(&mut self) -> bool {
        std::mem::replace(&mut self.charging_enabled, false)
    }

    pub fn is_drive_enabled(&self) -> bool {
        self.drive_enabled
    }

    pub fn is_charging_enabled(&self) -> bool {
        self.charging_enabled
    }
}
