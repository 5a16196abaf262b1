// Tick rate, timeouts, limits, topics and runtime configuration
use std::time::Duration;

use crate::motor_loop::VelocityLaw;

// Control loop frequency (one motion tick + one telemetry frame per cycle)
pub const LOOP_HZ: u64 = 100;

// Number of wheels / motor controllers on the bus
pub const NUM_MOTORS: usize = 3;

// Limits the value a wheel can be set to, also scales incoming commands
pub const MOTOR_MAX_SPEED: i8 = 100;

// Largest raw duty value accepted by the motor controllers
pub const MOTOR_MAX_PWM: i8 = 127;

// Slew ticks per unit of speed change (one step per cycle)
pub const MOTOR_SLEW_RATE: u32 = 1;

// Ticks without a command before the wheels are stopped
pub const MOTOR_TIMEOUT: u32 = 50;

// Capacity of the serial receive staging buffer, also bounds bytes decoded per tick
pub const SER_RX_BUF_SIZE: usize = 1024;

// Serial link to the host
pub const SERIAL_PORT: &str = "/dev/ttyUSB0";
pub const SERIAL_BAUDRATE: u32 = 115_200;
pub const SERIAL_TIMEOUT: Duration = Duration::from_millis(5);

// Zenoh topics
pub const TOPIC_TELEMETRY: &str = "critterbot/state/telemetry"; // decoded telemetry
pub const TOPIC_HEALTH: &str = "critterbot/state/health"; // health status

/// Settings the runtime is started with
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub port: String,
    pub baudrate: u32,
    pub loop_hz: u64,
    /// Publish telemetry and health over zenoh
    pub publish: bool,
    /// Control law run by the bench motor controllers
    pub law: VelocityLaw,
}

impl RuntimeConfig {
    pub fn tick_period(&self) -> Duration {
        Duration::from_micros(1_000_000 / self.loop_hz.max(1))
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            port: SERIAL_PORT.to_string(),
            baudrate: SERIAL_BAUDRATE,
            loop_hz: LOOP_HZ,
            publish: true,
            law: VelocityLaw::default(),
        }
    }
}
