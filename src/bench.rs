// In-process stand-ins for the controller bus and the board
//
// `BenchBus` hosts the three motor control loops, each driving a crude wheel
// model, plus a power controller that always reports a healthy pack.
// `LoggingBoard` logs what the board would have done.

use tracing::{debug, info, trace};

use crate::board::{Board, LedPattern};
use crate::config::NUM_MOTORS;
use crate::motion::bus::{
    MOTOR_NUM_BYTES, MOTOR_SPI_PADDING, POWER_CHARGE_NOT_CHARGING, POWER_CHARGING_DISABLED,
};
use crate::motion::{BusDevice, ControllerBus};
use crate::motor_loop::{HBridge, Measurements, MotorLoop, VelocityLaw};
use crate::protocol::SensorReadings;

/// Simulated pack voltage, 1/10 V
const BENCH_VOLTAGE: u8 = 120;
const BENCH_TEMPERATURE: u8 = 200;

/// H-bridge that only remembers the signed duty it was given
#[derive(Debug, Default)]
pub struct SimBridge {
    duty: (u8, u8),
    enabled: bool,
}

impl SimBridge {
    /// Net duty in compare units, forward positive
    pub fn net_duty(&self) -> i16 {
        if !self.enabled {
            return 0;
        }
        self.duty.0 as i16 - self.duty.1 as i16
    }
}

impl HBridge for SimBridge {
    fn set_duty(&mut self, a: u8, b: u8) {
        self.duty = (a, b);
    }

    fn set_low_side(&mut self, _low_a: bool, _low_b: bool) {}

    fn set_enable(&mut self, on: bool) {
        self.enabled = on;
    }
}

/// First-order wheel: speed lags the applied duty
#[derive(Debug, Default, Clone, Copy)]
struct WheelModel {
    clicks: i16,
}

impl WheelModel {
    fn step(&mut self, net_duty: i16) {
        self.clicks += (net_duty / 2 - self.clicks) / 4;
    }

    fn measure(&self, net_duty: i16) -> Measurements {
        Measurements {
            clicks: self.clicks.clamp(i8::MIN as i16, i8::MAX as i16) as i8,
            current: (net_duty.unsigned_abs() / 20) as u8 + 2,
            temperature: BENCH_TEMPERATURE,
        }
    }
}

pub struct BenchBus {
    motors: [MotorLoop<SimBridge>; NUM_MOTORS],
    wheels: [WheelModel; NUM_MOTORS],
    charging_disabled: bool,
}

impl BenchBus {
    pub fn new(law: VelocityLaw) -> Self {
        Self {
            motors: std::array::from_fn(|_| MotorLoop::new(SimBridge::default(), law)),
            wheels: [WheelModel::default(); NUM_MOTORS],
            charging_disabled: true,
        }
    }

    pub fn motor(&self, index: usize) -> &MotorLoop<SimBridge> {
        &self.motors[index]
    }

    /// Last power packet asked the charger to stay off
    pub fn charging_disabled(&self) -> bool {
        self.charging_disabled
    }

    fn run_motor(&mut self, index: usize) {
        let motor = &mut self.motors[index];
        let wheel = &mut self.wheels[index];

        let measured = wheel.measure(motor.bridge().net_duty());
        motor.tick(measured);
        wheel.step(motor.bridge().net_duty());
    }
}

impl ControllerBus for BenchBus {
    fn exchange(&mut self, device: BusDevice, tx: &[u8], rx: &mut [u8]) {
        match device {
            BusDevice::Power => {
                self.charging_disabled = tx.get(1).is_some_and(|b| b & POWER_CHARGING_DISABLED != 0);
                let reply = [
                    MOTOR_SPI_PADDING,
                    BENCH_VOLTAGE,
                    POWER_CHARGE_NOT_CHARGING,
                    BENCH_VOLTAGE / 3,
                    BENCH_VOLTAGE / 3,
                    BENCH_VOLTAGE / 3,
                ];
                let n = rx.len().min(reply.len());
                rx[..n].copy_from_slice(&reply[..n]);
            }
            BusDevice::Motor(index) if index < NUM_MOTORS => {
                let Ok(packet) = <&[u8; MOTOR_NUM_BYTES]>::try_from(tx) else {
                    trace!("Dropping {}-byte packet for motor {}", tx.len(), index);
                    rx.fill(0);
                    return;
                };
                let reply = self.motors[index].on_packet(packet);
                let n = rx.len().min(reply.len());
                rx[..n].copy_from_slice(&reply[..n]);

                // One control period of the motor controller per exchange
                self.run_motor(index);
            }
            BusDevice::Motor(index) => {
                trace!("No motor {} on the bench bus", index);
                rx.fill(0);
            }
        }
    }
}

/// Board that logs instead of driving hardware
#[derive(Debug, Default)]
pub struct LoggingBoard {
    pattern: Option<LedPattern>,
    vref: bool,
    amplifier: bool,
}

impl LoggingBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pattern(&self) -> Option<&LedPattern> {
        self.pattern.as_ref()
    }
}

impl Board for LoggingBoard {
    fn show_leds(&mut self, pattern: &LedPattern) {
        if self.pattern.as_ref() != Some(pattern) {
            debug!("LEDs: {:?}", pattern);
            self.pattern = Some(*pattern);
        }
    }

    fn set_vref(&mut self, on: bool) {
        if self.vref != on {
            info!("Analog reference {}", if on { "enabled" } else { "disabled" });
        }
        self.vref = on;
    }

    fn set_amplifier(&mut self, on: bool) {
        if self.amplifier != on {
            info!("Amplifier {}", if on { "enabled" } else { "disabled" });
        }
        self.amplifier = on;
    }

    fn read_sensors(&mut self) -> SensorReadings {
        SensorReadings::default()
    }

    fn monitor_ok(&self) -> bool {
        true
    }
}
