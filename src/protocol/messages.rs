// Wire constants and decoded command types for the host link
//
// Inbound frame: [H1, H2, H3, H4, motor_mode, m1, m2, m3, led_mode, (16 x RGB if led_mode == CUSTOM)]

use serde::{Deserialize, Serialize};

/// Frame header, shared by command and telemetry frames
pub const HEADER: [u8; 4] = [0xDE, 0xAD, 0xBE, 0xEF];

/// Number of LEDs addressable in custom mode
pub const LED_NUM_LEDS: usize = 16;

/// Bytes following the header: motor_mode, m1, m2, m3, led_mode
pub const MOTOR_DATA_LEN: usize = 5;

/// Bytes of custom LED data (16 x RGB)
pub const LED_DATA_LEN: usize = 3 * LED_NUM_LEDS;

// Motor mode bytes
pub const WHEEL_SPACE: u8 = 0x00;
pub const XYTHETA_SPACE: u8 = 0x01;
pub const WHEEL_VOLTAGE: u8 = 0x02;
pub const MOTOR_EXIT: u8 = 0x68;
pub const MOTOR_ENABLE_CHARGING: u8 = 0x69;
pub const MOTOR_DISABLE_CHARGING: u8 = 0x6A;
pub const MOTOR_ENABLE_VREF: u8 = 0x6B;
pub const MOTOR_DISABLE_VREF: u8 = 0x6C;
pub const MOTOR_ENABLE_AMP: u8 = 0x6D;
pub const MOTOR_DISABLE_AMP: u8 = 0x6E;

// LED mode bytes
pub const CNONE: u8 = 0;
pub const CCLEAR: u8 = 1;
pub const CBATTERY: u8 = 2;
pub const CBALL: u8 = 3;
pub const CERROR: u8 = 4;
pub const CEMERGENCY: u8 = 5;
pub const CBUSY: u8 = 6;
pub const CCUSTOM: u8 = 7;
/// Must accompany MOTOR_EXIT for the exit to be honored
pub const LED_EXIT: u8 = 0x2C;

/// How m1, m2, m3 are interpreted, plus subsystem toggles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotorMode {
    /// Per-wheel velocities, slewed
    WheelSpace,
    /// Body-frame x, y, theta velocities, slewed
    XyThetaSpace,
    /// Per-wheel duty, applied immediately
    WheelVoltage,
    Exit,
    EnableCharging,
    DisableCharging,
    EnableVref,
    DisableVref,
    EnableAmp,
    DisableAmp,
    Unknown(u8),
}

impl From<u8> for MotorMode {
    fn from(byte: u8) -> Self {
        match byte {
            WHEEL_SPACE => MotorMode::WheelSpace,
            XYTHETA_SPACE => MotorMode::XyThetaSpace,
            WHEEL_VOLTAGE => MotorMode::WheelVoltage,
            MOTOR_EXIT => MotorMode::Exit,
            MOTOR_ENABLE_CHARGING => MotorMode::EnableCharging,
            MOTOR_DISABLE_CHARGING => MotorMode::DisableCharging,
            MOTOR_ENABLE_VREF => MotorMode::EnableVref,
            MOTOR_DISABLE_VREF => MotorMode::DisableVref,
            MOTOR_ENABLE_AMP => MotorMode::EnableAmp,
            MOTOR_DISABLE_AMP => MotorMode::DisableAmp,
            other => MotorMode::Unknown(other),
        }
    }
}

impl From<MotorMode> for u8 {
    fn from(mode: MotorMode) -> Self {
        match mode {
            MotorMode::WheelSpace => WHEEL_SPACE,
            MotorMode::XyThetaSpace => XYTHETA_SPACE,
            MotorMode::WheelVoltage => WHEEL_VOLTAGE,
            MotorMode::Exit => MOTOR_EXIT,
            MotorMode::EnableCharging => MOTOR_ENABLE_CHARGING,
            MotorMode::DisableCharging => MOTOR_DISABLE_CHARGING,
            MotorMode::EnableVref => MOTOR_ENABLE_VREF,
            MotorMode::DisableVref => MOTOR_DISABLE_VREF,
            MotorMode::EnableAmp => MOTOR_ENABLE_AMP,
            MotorMode::DisableAmp => MOTOR_DISABLE_AMP,
            MotorMode::Unknown(byte) => byte,
        }
    }
}

/// Lighting mode, dispatched independently of the motor mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedMode {
    None,
    Clear,
    Battery,
    Ball,
    Error,
    Emergency,
    Busy,
    Custom,
    Exit,
    Unknown(u8),
}

impl From<u8> for LedMode {
    fn from(byte: u8) -> Self {
        match byte {
            CNONE => LedMode::None,
            CCLEAR => LedMode::Clear,
            CBATTERY => LedMode::Battery,
            CBALL => LedMode::Ball,
            CERROR => LedMode::Error,
            CEMERGENCY => LedMode::Emergency,
            CBUSY => LedMode::Busy,
            CCUSTOM => LedMode::Custom,
            LED_EXIT => LedMode::Exit,
            other => LedMode::Unknown(other),
        }
    }
}

impl From<LedMode> for u8 {
    fn from(mode: LedMode) -> Self {
        match mode {
            LedMode::None => CNONE,
            LedMode::Clear => CCLEAR,
            LedMode::Battery => CBATTERY,
            LedMode::Ball => CBALL,
            LedMode::Error => CERROR,
            LedMode::Emergency => CEMERGENCY,
            LedMode::Busy => CBUSY,
            LedMode::Custom => CCUSTOM,
            LedMode::Exit => LED_EXIT,
            LedMode::Unknown(byte) => byte,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// One decoded command; overwritten by the next, never queued
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandFrame {
    pub motor_mode: MotorMode,
    pub led_mode: LedMode,
    pub m1: i8,
    pub m2: i8,
    pub m3: i8,
    /// Present only when `led_mode` is `Custom`
    pub leds: Option<[Rgb; LED_NUM_LEDS]>,
}

impl CommandFrame {
    pub fn new(motor_mode: MotorMode, m1: i8, m2: i8, m3: i8, led_mode: LedMode) -> Self {
        Self {
            motor_mode,
            led_mode,
            m1,
            m2,
            m3,
            leds: None,
        }
    }

    /// Custom lighting frame; the motor fields still apply
    pub fn with_leds(mut self, leds: [Rgb; LED_NUM_LEDS]) -> Self {
        self.led_mode = LedMode::Custom;
        self.leds = Some(leds);
        self
    }

    pub fn motion(&self) -> [i8; 3] {
        [self.m1, self.m2, self.m3]
    }

    /// Serialize as the host would send it
    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(HEADER.len() + MOTOR_DATA_LEN + LED_DATA_LEN);
        bytes.extend_from_slice(&HEADER);
        bytes.push(self.motor_mode.into());
        bytes.push(self.m1 as u8);
        bytes.push(self.m2 as u8);
        bytes.push(self.m3 as u8);
        bytes.push(self.led_mode.into());

        if self.led_mode == LedMode::Custom {
            let leds = self.leds.unwrap_or([Rgb::default(); LED_NUM_LEDS]);
            for led in &leds {
                bytes.extend_from_slice(&[led.r, led.g, led.b]);
            }
        }
        bytes
    }
}
