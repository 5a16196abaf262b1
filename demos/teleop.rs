// Keyboard teleop over the serial command link: WASD move, Z/X rotate, R/F speed, Q quit
//
// Usage: cargo run --example teleop -- [port]
//
// Sends an XYTHETA command frame every 20ms and prints a line of decoded
// telemetry once a second. Quitting sends the exit command.
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use serialport::SerialPort;
use std::io::Write;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use critter_drive::config::{SERIAL_BAUDRATE, SERIAL_PORT, SERIAL_TIMEOUT};
use critter_drive::protocol::{
    CommandFrame, HEADER, LedMode, MotorMode, TELEMETRY_FRAME_LEN, TelemetrySample, decode_status,
};

const SPEEDS: [i8; 3] = [15, 40, 80]; // x/y command units
const THETA_SPEEDS: [i8; 3] = [10, 25, 50]; // theta command units
const INPUT_TIMEOUT_MS: u64 = 100; // Reset velocities after this much time with no input
const REPORT_EVERY: u32 = 50; // Frames between telemetry lines

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let port_name = std::env::args()
        .nth(1)
        .unwrap_or_else(|| SERIAL_PORT.to_string());

    info!("Opening serial port {}...", port_name);
    let mut port = serialport::new(&port_name, SERIAL_BAUDRATE)
        .timeout(SERIAL_TIMEOUT)
        .open()?;

    info!("Controls: WASD=move, Z/X=rotate, R/F=speed, Q=quit");
    info!("Speed: LOW");

    enable_raw_mode()?;
    let result = run_teleop(port.as_mut());
    disable_raw_mode()?;

    // Hand the robot back to its local interface
    let exit = CommandFrame::new(MotorMode::Exit, 0, 0, 0, LedMode::Exit);
    port.write_all(&exit.encode())?;

    result
}

fn run_teleop(port: &mut dyn SerialPort) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut speed_idx: usize = 0;

    // Persistent velocity state
    let mut x_vel: i8 = 0;
    let mut y_vel: i8 = 0;
    let mut theta_vel: i8 = 0;
    let mut last_movement_input = Instant::now();

    let mut telemetry = TelemetryReader::default();
    let mut frames: u32 = 0;

    loop {
        // Poll for key with 20ms timeout (50Hz effective rate)
        if event::poll(Duration::from_millis(20))? {
            if let Event::Key(KeyEvent { code, kind, .. }) = event::read()? {
                let pressed = kind == KeyEventKind::Press || kind == KeyEventKind::Repeat;

                match code {
                    // Movement - update velocity and refresh timestamp
                    KeyCode::Char('w') if pressed => {
                        x_vel = SPEEDS[speed_idx];
                        last_movement_input = Instant::now();
                    }
                    KeyCode::Char('s') if pressed => {
                        x_vel = -SPEEDS[speed_idx];
                        last_movement_input = Instant::now();
                    }
                    KeyCode::Char('a') if pressed => {
                        y_vel = SPEEDS[speed_idx];
                        last_movement_input = Instant::now();
                    }
                    KeyCode::Char('d') if pressed => {
                        y_vel = -SPEEDS[speed_idx];
                        last_movement_input = Instant::now();
                    }

                    // Rotation
                    KeyCode::Char('z') if pressed => {
                        theta_vel = THETA_SPEEDS[speed_idx];
                        last_movement_input = Instant::now();
                    }
                    KeyCode::Char('x') if pressed => {
                        theta_vel = -THETA_SPEEDS[speed_idx];
                        last_movement_input = Instant::now();
                    }

                    // Speed control
                    KeyCode::Char('r') if pressed => {
                        speed_idx = (speed_idx + 1).min(2);
                        print_speed(speed_idx);
                    }
                    KeyCode::Char('f') if pressed => {
                        speed_idx = speed_idx.saturating_sub(1);
                        print_speed(speed_idx);
                    }

                    // Quit
                    KeyCode::Char('q') | KeyCode::Esc if pressed => break,

                    _ => {}
                }
            }
        }

        // Reset velocities if no movement input for INPUT_TIMEOUT_MS
        if last_movement_input.elapsed() > Duration::from_millis(INPUT_TIMEOUT_MS) {
            x_vel = 0;
            y_vel = 0;
            theta_vel = 0;
        }

        // Always send at ~50Hz so the robot's watchdog stays fed
        let cmd = CommandFrame::new(MotorMode::XyThetaSpace, x_vel, y_vel, theta_vel, LedMode::None);
        port.write_all(&cmd.encode())?;

        // Drain telemetry
        let available = port.bytes_to_read()? as usize;
        if available > 0 {
            let mut chunk = vec![0u8; available];
            port.read_exact(&mut chunk)?;
            for sample in telemetry.push(&chunk) {
                frames += 1;
                if frames % REPORT_EVERY == 0 {
                    print_sample(&sample);
                }
            }
        }
    }

    Ok(())
}

/// Splits the telemetry stream into frames
#[derive(Default)]
struct TelemetryReader {
    buf: Vec<u8>,
}

impl TelemetryReader {
    fn push(&mut self, bytes: &[u8]) -> Vec<TelemetrySample> {
        self.buf.extend_from_slice(bytes);
        let mut samples = Vec::new();

        loop {
            let Some(start) = self.buf.windows(HEADER.len()).position(|w| w == HEADER) else {
                // Keep a possible partial header
                let keep = self.buf.len().min(HEADER.len() - 1);
                self.buf.drain(..self.buf.len() - keep);
                break;
            };
            if self.buf.len() < start + TELEMETRY_FRAME_LEN {
                self.buf.drain(..start);
                break;
            }

            match decode_status(&self.buf[start..start + TELEMETRY_FRAME_LEN]) {
                Ok(sample) => {
                    samples.push(sample);
                    self.buf.drain(..start + TELEMETRY_FRAME_LEN);
                }
                Err(e) => {
                    warn!("Dropping telemetry: {}", e);
                    self.buf.drain(..start + 1);
                }
            }
        }
        samples
    }
}

fn print_sample(sample: &TelemetrySample) {
    let clicks: Vec<i8> = sample.motors.iter().map(|m| m.clicks).collect();
    let current: Vec<u8> = sample.motors.iter().map(|m| m.current).collect();
    info!(
        "Battery {:.1}V, clicks {:?}, current {:?}, errors 0x{:06X}",
        sample.power.voltage as f32 / 10.0,
        clicks,
        current,
        sample.error_flags
    );
}

fn print_speed(idx: usize) {
    let label = ["LOW", "MED", "HIGH"][idx];
    info!("Speed: {}", label);
}
