// Periodic machine-interface loop
//
// Every tick: drain the serial link into the staging buffer, decode and apply
// commands, run one motion tick, send the telemetry frame back down the link,
// and (optionally) publish telemetry and health over zenoh.
// The loop ends when the host sends the exit command.

use serde::{Deserialize, Serialize};
use serialport::SerialPort;
use std::io::Write;
use tokio::time::interval;
use tracing::{info, warn};

use crate::bench::{BenchBus, LoggingBoard};
use crate::board::Board;
use crate::config::{RuntimeConfig, SER_RX_BUF_SIZE, SERIAL_TIMEOUT, TOPIC_HEALTH, TOPIC_TELEMETRY};
use crate::controller::HostController;
use crate::error::{ERR_RX_OVERFLOW, RuntimeError};
use crate::motion::ControllerBus;
use crate::protocol::{TELEMETRY_FRAME_LEN, TelemetrySample, encode_status};

/// Health status published by the runtime
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeHealth {
    Ok,
    CmdStale,
}

/// What one cycle produced
pub struct Cycle {
    pub sample: TelemetrySample,
    pub frame: [u8; TELEMETRY_FRAME_LEN],
}

pub struct Runtime<B, D> {
    controller: HostController<B, D>,
    rx_buf: Vec<u8>,
    commanded: bool,
    health: RuntimeHealth,
}

impl<B: ControllerBus, D: Board> Runtime<B, D> {
    /// Starts the controller; health is stale until the first command
    pub fn new(mut controller: HostController<B, D>) -> Self {
        controller.start();
        Self {
            controller,
            rx_buf: Vec::with_capacity(SER_RX_BUF_SIZE),
            commanded: false,
            health: RuntimeHealth::CmdStale,
        }
    }

    pub fn controller(&self) -> &HostController<B, D> {
        &self.controller
    }

    pub fn health(&self) -> RuntimeHealth {
        self.health
    }

    pub fn is_running(&self) -> bool {
        self.controller.is_running()
    }

    /// Bytes received but not yet consumed by the decoder
    pub fn pending(&self) -> usize {
        self.rx_buf.len()
    }

    /// Stage received bytes. Whatever does not fit in the staging buffer is
    /// dropped and flagged as a receive overflow.
    pub fn receive(&mut self, bytes: &[u8]) {
        let free = SER_RX_BUF_SIZE - self.rx_buf.len();
        if bytes.len() > free {
            warn!("Receive buffer full, dropping {} bytes", bytes.len() - free);
            self.controller.record_error(ERR_RX_OVERFLOW);
        }
        let take = bytes.len().min(free);
        self.rx_buf.extend_from_slice(&bytes[..take]);
    }

    pub fn cycle(&mut self) -> Cycle {
        // 1. Decode staged bytes, keep partial frames for the next cycle
        let consumed = self.controller.process_input(&self.rx_buf);
        self.rx_buf.drain(..consumed);

        // 2. Motion tick (includes watchdog logic)
        self.controller.control_tick();

        // 3. Telemetry for this cycle, clears the error register
        let sample = self.controller.status_sample();
        self.commanded |= sample.command_read;
        self.health = if self.commanded && !self.controller.engine().is_stale() {
            RuntimeHealth::Ok
        } else {
            RuntimeHealth::CmdStale
        };

        Cycle {
            sample,
            frame: encode_status(&sample),
        }
    }
}

/// Move everything the serial driver has buffered into the runtime
fn read_serial<B: ControllerBus, D: Board>(
    port: &mut dyn SerialPort,
    runtime: &mut Runtime<B, D>,
) -> Result<(), RuntimeError> {
    let available = port.bytes_to_read()? as usize;
    if available == 0 {
        return Ok(());
    }
    let mut chunk = vec![0u8; available];
    port.read_exact(&mut chunk)?;
    runtime.receive(&chunk);
    Ok(())
}

fn to_json<T: Serialize>(value: &T) -> Result<String, RuntimeError> {
    Ok(serde_json::to_string(value)?)
}

pub async fn run(config: RuntimeConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    info!("Opening serial port {} at {} baud...", config.port, config.baudrate);
    let mut port = serialport::new(&config.port, config.baudrate)
        .timeout(SERIAL_TIMEOUT)
        .open()
        .map_err(RuntimeError::from)?;

    let session = if config.publish {
        info!("Opening Zenoh session...");
        Some(zenoh::open(zenoh::Config::default()).await?)
    } else {
        None
    };
    let publishers = match &session {
        Some(session) => Some((
            session.declare_publisher(TOPIC_TELEMETRY).await?,
            session.declare_publisher(TOPIC_HEALTH).await?,
        )),
        None => None,
    };

    let controller = HostController::new(BenchBus::new(config.law), LoggingBoard::new());
    let mut runtime = Runtime::new(controller);
    let mut tick = interval(config.tick_period());

    info!(
        "Runtime started: {}Hz loop, {:?} velocity law",
        config.loop_hz, config.law
    );
    if publishers.is_some() {
        info!("Publishing to: {}, {}", TOPIC_TELEMETRY, TOPIC_HEALTH);
    }

    loop {
        tick.tick().await;

        // 1. Drain the serial link (non-blocking)
        read_serial(port.as_mut(), &mut runtime)?;

        // 2. Decode, tick, build telemetry
        let cycle = runtime.cycle();

        // 3. Telemetry back to the host
        port.write_all(&cycle.frame).map_err(RuntimeError::from)?;

        // 4. Publish telemetry and health
        if let Some((pub_telemetry, pub_health)) = &publishers {
            pub_telemetry.put(to_json(&cycle.sample)?).await?;
            pub_health.put(to_json(&runtime.health())?).await?;
        }

        if !runtime.is_running() {
            info!("Host requested exit, stopping runtime");
            break;
        }
    }

    Ok(())
}
