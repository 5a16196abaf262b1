// Host link protocol
//
// Provides:
// - Command frame types and wire constants
// - Resynchronizing command decoder
// - CRC-stamped telemetry encoder (and host-side decoder)

pub mod messages;
pub mod parser;
pub mod telemetry;

pub use messages::{CommandFrame, HEADER, LedMode, MotorMode, Rgb};
pub use parser::{Decoded, Parser};
pub use telemetry::{
    MotorStatus, PowerStatus, SensorReadings, StatusFlags, TELEMETRY_FRAME_LEN, TelemetrySample,
    decode_status, encode_status,
};
