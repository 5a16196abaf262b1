// Packets exchanged with the motor and power controllers over the synchronous serial bus
//
// Motor packet: [header, speed, bus_voltage, 0, 0]
//   reply:      [padding, clicks, current, temperature, voltage]
// Power packet: [header, charging_disabled, 0, 0, 0, 0]
//   reply:      [padding, voltage, charge_state, bat40, bat160, bat280]

use crate::config::NUM_MOTORS;
use crate::error::BusError;
use crate::protocol::{MotorStatus, PowerStatus};

/// Bytes in a motor packet (including header)
pub const MOTOR_NUM_BYTES: usize = 5;
/// Bytes in a power packet (including header)
pub const MOTOR_PWR_BYTES: usize = 6;

/// Motor controller runs its velocity loop on the setpoint
pub const MOTOR_PACKET_HEADER: u8 = 0x7A;
/// Motor controller applies the setpoint as a raw duty
pub const MOTOR_PWM_HEADER: u8 = 0x7B;
/// First byte of every well-aligned reply
pub const MOTOR_SPI_PADDING: u8 = 0x7D;

/// Power packet flag asking the power controller not to charge
pub const POWER_CHARGING_DISABLED: u8 = 0x01;

// Charge states reported by the power controller
pub const POWER_CHARGE_NOT_CHARGING: u8 = 0;
pub const POWER_CHARGE_COMPLETE: u8 = 5;
pub const POWER_CHARGE_ERROR: u8 = 200;

/// Addressable devices on the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusDevice {
    Power,
    Motor(usize),
}

/// Synchronous full-duplex exchange with one device.
///
/// `rx` receives the device's reply; both buffers are borrowed for the whole
/// exchange, so neither can be touched while a transfer is in flight.
pub trait ControllerBus {
    fn exchange(&mut self, device: BusDevice, tx: &[u8], rx: &mut [u8]);
}

/// Whether the wheels run closed-loop velocity control or raw duty
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DriveMode {
    #[default]
    Velocity,
    Voltage,
}

impl DriveMode {
    pub fn header(self) -> u8 {
        match self {
            DriveMode::Velocity => MOTOR_PACKET_HEADER,
            DriveMode::Voltage => MOTOR_PWM_HEADER,
        }
    }
}

pub fn motor_packet(mode: DriveMode, speed: i8, bus_voltage: u8) -> [u8; MOTOR_NUM_BYTES] {
    [mode.header(), speed as u8, bus_voltage, 0, 0]
}

pub fn power_packet(charging_enabled: bool) -> [u8; MOTOR_PWR_BYTES] {
    let flag = if charging_enabled {
        0
    } else {
        POWER_CHARGING_DISABLED
    };
    [MOTOR_PACKET_HEADER, flag, 0, 0, 0, 0]
}

/// Last reply from the power controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerReply(pub [u8; MOTOR_PWR_BYTES]);

impl Default for PowerReply {
    fn default() -> Self {
        Self([MOTOR_SPI_PADDING, 0, POWER_CHARGE_NOT_CHARGING, 0, 0, 0])
    }
}

impl PowerReply {
    /// Bus voltage in 1/10 V.
    ///
    /// 0 is not a valid reading and may mean the power controller is not
    /// talking; report the highest value so motor voltage scaling stays safe.
    pub fn voltage(&self) -> u8 {
        match self.0[1] {
            0 => 255,
            v => v,
        }
    }

    pub fn charge_state(&self) -> u8 {
        self.0[2]
    }

    /// Plugged in and neither idle nor finished
    pub fn is_charging(&self) -> bool {
        let state = self.charge_state();
        state != POWER_CHARGE_NOT_CHARGING && state != POWER_CHARGE_COMPLETE
    }

    pub fn check_alignment(&self) -> Result<(), BusError> {
        if self.0[0] == MOTOR_SPI_PADDING {
            Ok(())
        } else {
            Err(BusError::PowerAlignment {
                expected: MOTOR_SPI_PADDING,
                got: self.0[0],
            })
        }
    }

    pub fn status(&self) -> PowerStatus {
        PowerStatus {
            voltage: self.voltage(),
            charge_state: self.charge_state(),
            bat40: self.0[3],
            bat160: self.0[4],
            bat280: self.0[5],
        }
    }
}

/// Last reply from one motor controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotorReply(pub [u8; MOTOR_NUM_BYTES]);

impl Default for MotorReply {
    fn default() -> Self {
        Self([MOTOR_SPI_PADDING, 0, 0, 0, 0])
    }
}

impl MotorReply {
    pub fn from_status(status: MotorStatus) -> Self {
        Self([
            MOTOR_SPI_PADDING,
            status.clicks as u8,
            status.current,
            status.temperature,
            status.voltage as u8,
        ])
    }

    pub fn status(&self) -> MotorStatus {
        MotorStatus {
            clicks: self.0[1] as i8,
            current: self.0[2],
            temperature: self.0[3],
            voltage: self.0[4] as i8,
        }
    }
}

/// Replies from every device, refreshed each tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BusReplies {
    pub power: PowerReply,
    pub motors: [MotorReply; NUM_MOTORS],
}
