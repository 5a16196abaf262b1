// Host-facing controller (machine interface)
//
// Per cycle the runtime feeds received bytes to `process_input`, advances the
// wheels with `control_tick`, then sends `status_frame`. Producing a status
// frame clears the error register.

use tracing::{info, warn};

use crate::board::{Board, LedPattern};
use crate::error::ErrorRegister;
use crate::motion::{ControllerBus, MotionEngine};
use crate::protocol::{
    CommandFrame, LedMode, MotorMode, Parser, StatusFlags, TELEMETRY_FRAME_LEN, TelemetrySample,
    encode_status,
};

const CLEAR_ALL: u32 = 0xFFFF_FFFF;

pub struct HostController<B, D> {
    bus: B,
    board: D,
    parser: Parser,
    engine: MotionEngine,
    errors: ErrorRegister,
    commands_disabled: bool,
    command_read: bool,
    running: bool,
}

impl<B: ControllerBus, D: Board> HostController<B, D> {
    pub fn new(bus: B, board: D) -> Self {
        Self {
            bus,
            board,
            parser: Parser::new(),
            engine: MotionEngine::new(),
            errors: ErrorRegister::new(),
            commands_disabled: false,
            command_read: false,
            running: false,
        }
    }

    /// Take over from the local user interface
    pub fn start(&mut self) {
        self.board.show_leds(&LedPattern::MachineInterface);
        self.errors.clear(CLEAR_ALL);
        self.engine.enable_drive();
        self.running = true;
    }

    /// Hand control back to the local user interface. The wheels are zeroed
    /// and held until the next `start`.
    pub fn stop(&mut self) {
        self.engine.stop();
        self.engine.disable_drive();
        self.board.show_leds(&LedPattern::UserInterface);
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Ignore motion and charge-inhibit commands from the host
    pub fn disable_commands(&mut self) {
        self.commands_disabled = true;
    }

    pub fn enable_commands(&mut self) {
        self.commands_disabled = false;
    }

    pub fn commands_disabled(&self) -> bool {
        self.commands_disabled
    }

    /// Decode received bytes and apply the newest complete command.
    ///
    /// Returns how many bytes were consumed; the caller drops them from the
    /// front of its buffer and keeps the rest for the next cycle.
    pub fn process_input(&mut self, input: &[u8]) -> usize {
        let decoded = self.parser.decode_available(input);
        self.command_read = decoded.frame.is_some();
        if let Some(frame) = decoded.frame {
            self.apply(&frame);
        }
        decoded.consumed
    }

    /// Apply one decoded command. Ignored entirely while stopped.
    pub fn apply(&mut self, frame: &CommandFrame) {
        if !self.running {
            return;
        }
        let enabled = !self.commands_disabled;
        let [m1, m2, m3] = frame.motion();

        match frame.motor_mode {
            MotorMode::WheelSpace if enabled => self.engine.set_speed_slew([m1, m2, m3]),
            MotorMode::XyThetaSpace if enabled => self.engine.set_speed_xytheta(m1, m2, m3),
            MotorMode::WheelVoltage if enabled => self.engine.set_voltage([m1, m2, m3]),
            MotorMode::Exit => {
                if frame.led_mode == LedMode::Exit {
                    info!("Exit requested by host");
                    self.stop();
                }
            }
            MotorMode::EnableCharging => {
                self.engine.enable_charging();
            }
            MotorMode::DisableCharging if enabled => {
                self.engine.disable_charging();
            }
            MotorMode::EnableVref => self.board.set_vref(true),
            MotorMode::DisableVref => self.board.set_vref(false),
            MotorMode::EnableAmp => self.board.set_amplifier(true),
            MotorMode::DisableAmp => self.board.set_amplifier(false),
            MotorMode::Unknown(byte) if enabled => {
                warn!("Unknown motor mode 0x{:02X}, stopping wheels", byte);
                self.engine.stop();
            }
            // Gated while commands are disabled
            _ => {}
        }

        if enabled {
            if let Some(pattern) = LedPattern::from_command(frame.led_mode, frame.leds.as_ref()) {
                self.board.show_leds(&pattern);
            }
        }
    }

    /// One motion tick: watchdog, slew, bus exchange
    pub fn control_tick(&mut self) {
        if let Err(e) = self.engine.tick(&mut self.bus) {
            warn!("{}", e);
            self.errors.set(e.flag());
        }

        if self.engine.is_charging() {
            self.board.show_leds(&LedPattern::ChargeStatus);
        }
    }

    /// Assemble this cycle's telemetry and clear the error register
    pub fn status_sample(&mut self) -> TelemetrySample {
        let sample = TelemetrySample {
            power: self.engine.power_status(),
            motors: std::array::from_fn(|i| self.engine.motor_status(i)),
            sensors: self.board.read_sensors(),
            error_flags: self.errors.bits(),
            command_read: self.command_read,
            status: StatusFlags {
                charging_enabled: self.engine.is_charging_enabled(),
                drive_enabled: self.engine.is_drive_enabled(),
                monitor_ok: self.board.monitor_ok(),
            },
        };

        self.errors.clear(CLEAR_ALL);
        sample
    }

    /// `status_sample` serialized and CRC-stamped
    pub fn status_frame(&mut self) -> [u8; TELEMETRY_FRAME_LEN] {
        encode_status(&self.status_sample())
    }

    /// Record faults found outside the controller (e.g. receive overflow)
    pub fn record_error(&mut self, flags: u32) {
        self.errors.set(flags);
    }

    pub fn errors(&self) -> &ErrorRegister {
        &self.errors
    }

    pub fn engine(&self) -> &MotionEngine {
        &self.engine
    }

    pub fn board(&self) -> &D {
        &self.board
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }
}
