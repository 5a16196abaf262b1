use clap::Parser;
use tracing_subscriber::EnvFilter;

use critter_drive::config::{LOOP_HZ, RuntimeConfig, SERIAL_BAUDRATE, SERIAL_PORT};
use critter_drive::motor_loop::VelocityLaw;

/// Machine-interface runtime: serial command link in, telemetry out
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Serial port the host is connected to
    #[arg(short, long, default_value = SERIAL_PORT)]
    port: String,

    #[arg(short, long, default_value_t = SERIAL_BAUDRATE)]
    baudrate: u32,

    /// Control loop rate in Hz
    #[arg(long, default_value_t = LOOP_HZ)]
    loop_hz: u64,

    /// Don't publish telemetry and health over zenoh
    #[arg(long)]
    no_publish: bool,

    /// Velocity law run by the bench motor controllers
    #[arg(long, value_enum, default_value_t = VelocityLaw::Pd)]
    law: VelocityLaw,
}

impl From<Args> for RuntimeConfig {
    fn from(args: Args) -> Self {
        Self {
            port: args.port,
            baudrate: args.baudrate,
            loop_hz: args.loop_hz,
            publish: !args.no_publish,
            law: args.law,
        }
    }
}

#[tokio::main]
async fn main() {
    // Setup logging (set RUST_LOG=info or debug)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init(); // installs the subscriber globally

    let config = RuntimeConfig::from(Args::parse());
    if let Err(e) = critter_drive::runtime::run(config).await {
        eprintln!("Runtime error: {}", e);
        std::process::exit(1);
    }
}
