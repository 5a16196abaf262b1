// Outbound telemetry frame: header, fixed-order fields, CRC (high byte first)
//
// Every byte from the first header byte on is folded into the CRC. 10-bit ADC
// readings go out as their top 8 bits, with the low 2 bits of each group packed
// into trailing bytes (MSB-first).

use serde::{Deserialize, Serialize};

use super::messages::HEADER;
use crate::config::NUM_MOTORS;
use crate::crc::{self, Crc16};
use crate::error::ProtocolError;

/// Fields after the header, before the CRC
pub const TELEMETRY_PAYLOAD_LEN: usize = 77;

/// Complete frame on the wire
pub const TELEMETRY_FRAME_LEN: usize = HEADER.len() + TELEMETRY_PAYLOAD_LEN + 2;

/// Power controller readings, in 1/10 V where applicable
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerStatus {
    pub voltage: u8,
    pub charge_state: u8,
    pub bat40: u8,
    pub bat160: u8,
    pub bat280: u8,
}

/// Per-motor readings returned by the motor controllers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MotorStatus {
    pub voltage: i8,
    /// Encoder clicks during the last control cycle
    pub clicks: i8,
    pub current: u8,
    /// Inversely related to housing temperature
    pub temperature: u8,
}

/// Raw sensor peripheral readings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorReadings {
    /// 12-bit accelerometer axes
    pub accel: [u16; 3],
    /// 10-bit magnetometer axes
    pub mag: [u16; 3],
    /// 10-bit gyroscope
    pub gyro: u16,
    /// 10-bit IR distance sensors
    pub ir_distance: [u16; 10],
    /// 10-bit ambient light sensors
    pub light: [u16; 4],
    pub thermal: [u16; 8],
    /// 10-bit IR light sensors
    pub ir_light: [u16; 8],
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusFlags {
    pub charging_enabled: bool,
    pub drive_enabled: bool,
    pub monitor_ok: bool,
}

impl StatusFlags {
    fn to_byte(self) -> u8 {
        (self.charging_enabled as u8) << 7 | (self.drive_enabled as u8) << 6 | self.monitor_ok as u8
    }

    fn from_byte(byte: u8) -> Self {
        Self {
            charging_enabled: byte & 0x80 != 0,
            drive_enabled: byte & 0x40 != 0,
            monitor_ok: byte & 0x01 != 0,
        }
    }
}

/// One tick's worth of telemetry, assembled fresh every tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetrySample {
    pub power: PowerStatus,
    pub motors: [MotorStatus; NUM_MOTORS],
    pub sensors: SensorReadings,
    /// Only the low 24 bits travel; the top byte slot carries the charge state
    pub error_flags: u32,
    /// A command frame was decoded this tick
    pub command_read: bool,
    pub status: StatusFlags,
}

// Low 2 bits of up to four readings, first reading in the top bits
fn pack_low_bits(values: &[u16]) -> u8 {
    values
        .iter()
        .enumerate()
        .fold(0, |acc, (i, &v)| acc | ((v & 0x03) as u8) << (6 - 2 * i))
}

fn unpack_low_bits(packed: u8, index: usize) -> u16 {
    ((packed >> (6 - 2 * index)) & 0x03) as u16
}

struct FrameWriter {
    bytes: [u8; TELEMETRY_FRAME_LEN],
    len: usize,
    crc: Crc16,
}

impl FrameWriter {
    fn new() -> Self {
        Self {
            bytes: [0; TELEMETRY_FRAME_LEN],
            len: 0,
            crc: Crc16::new(),
        }
    }

    fn put(&mut self, byte: u8) {
        self.crc.push(byte);
        self.bytes[self.len] = byte;
        self.len += 1;
    }

    fn put_high_bits(&mut self, values: &[u16]) {
        for &v in values {
            self.put((v >> 2) as u8);
        }
    }

    fn finish(mut self) -> [u8; TELEMETRY_FRAME_LEN] {
        debug_assert_eq!(self.len, TELEMETRY_FRAME_LEN - 2);
        let [hi, lo] = self.crc.to_be_bytes();
        self.bytes[self.len] = hi;
        self.bytes[self.len + 1] = lo;
        self.bytes
    }
}

/// Serialize a sample into a CRC-stamped frame. Cannot fail.
pub fn encode_status(sample: &TelemetrySample) -> [u8; TELEMETRY_FRAME_LEN] {
    let mut w = FrameWriter::new();
    for &b in &HEADER {
        w.put(b);
    }

    let p = &sample.power;
    for b in [p.voltage, p.charge_state, p.bat40, p.bat160, p.bat280] {
        w.put(b);
    }

    for m in &sample.motors {
        w.put(m.voltage as u8);
        w.put(m.clicks as u8);
        w.put(m.current);
        w.put(m.temperature);
    }

    let s = &sample.sensors;

    // Accelerometer: top 8 of 12 bits, then the low nibbles
    for &a in &s.accel {
        w.put((a >> 4) as u8);
    }
    w.put(((s.accel[0] & 0x0F) << 4 | (s.accel[1] & 0x0F)) as u8);
    w.put(((s.accel[2] & 0x0F) << 4) as u8);

    // Magnetometer and gyroscope (gyro centered on zero)
    w.put_high_bits(&s.mag);
    w.put(((s.gyro >> 2) as u8).wrapping_sub(128));
    w.put(pack_low_bits(&[s.mag[0], s.mag[1], s.mag[2], s.gyro]));

    w.put_high_bits(&s.ir_distance);
    for group in s.ir_distance.chunks(4) {
        w.put(pack_low_bits(group));
    }

    w.put_high_bits(&s.light);
    w.put(pack_low_bits(&s.light));

    for &t in &s.thermal {
        for b in t.to_le_bytes() {
            w.put(b);
        }
    }

    w.put_high_bits(&s.ir_light);
    for group in s.ir_light.chunks(4) {
        w.put(pack_low_bits(group));
    }

    // The unused top byte of the error word repeats the charge state
    w.put(p.charge_state);
    for b in &sample.error_flags.to_be_bytes()[1..] {
        w.put(*b);
    }

    w.put(sample.command_read as u8);
    w.put(sample.status.to_byte());

    w.finish()
}

struct FrameReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> FrameReader<'a> {
    fn byte(&mut self) -> u8 {
        let b = self.bytes[self.pos];
        self.pos += 1;
        b
    }

    fn high_bits<const N: usize>(&mut self) -> [u16; N] {
        std::array::from_fn(|_| (self.byte() as u16) << 2)
    }
}

/// Validate and unpack a telemetry frame (host side).
pub fn decode_status(frame: &[u8]) -> Result<TelemetrySample, ProtocolError> {
    if frame.len() != TELEMETRY_FRAME_LEN {
        return Err(ProtocolError::Length {
            expected: TELEMETRY_FRAME_LEN,
            got: frame.len(),
        });
    }

    let header = [frame[0], frame[1], frame[2], frame[3]];
    if header != HEADER {
        return Err(ProtocolError::Header(header));
    }

    let (body, trailer) = frame.split_at(TELEMETRY_FRAME_LEN - 2);
    let computed = crc::checksum(body);
    let received = u16::from_be_bytes([trailer[0], trailer[1]]);
    if computed != received {
        return Err(ProtocolError::Crc { computed, received });
    }

    let mut r = FrameReader {
        bytes: body,
        pos: HEADER.len(),
    };

    let power = PowerStatus {
        voltage: r.byte(),
        charge_state: r.byte(),
        bat40: r.byte(),
        bat160: r.byte(),
        bat280: r.byte(),
    };

    let motors = std::array::from_fn(|_| MotorStatus {
        voltage: r.byte() as i8,
        clicks: r.byte() as i8,
        current: r.byte(),
        temperature: r.byte(),
    });

    let mut s = SensorReadings::default();

    for a in s.accel.iter_mut() {
        *a = (r.byte() as u16) << 4;
    }
    let nibbles = r.byte();
    s.accel[0] |= (nibbles >> 4) as u16;
    s.accel[1] |= (nibbles & 0x0F) as u16;
    s.accel[2] |= (r.byte() >> 4) as u16;

    s.mag = r.high_bits();
    s.gyro = (r.byte().wrapping_add(128) as u16) << 2;
    let packed = r.byte();
    for (i, m) in s.mag.iter_mut().enumerate() {
        *m |= unpack_low_bits(packed, i);
    }
    s.gyro |= unpack_low_bits(packed, 3);

    s.ir_distance = r.high_bits();
    for group in s.ir_distance.chunks_mut(4) {
        let packed = r.byte();
        for (i, v) in group.iter_mut().enumerate() {
            *v |= unpack_low_bits(packed, i);
        }
    }

    s.light = r.high_bits();
    let packed = r.byte();
    for (i, v) in s.light.iter_mut().enumerate() {
        *v |= unpack_low_bits(packed, i);
    }

    for t in s.thermal.iter_mut() {
        *t = u16::from_le_bytes([r.byte(), r.byte()]);
    }

    s.ir_light = r.high_bits();
    for group in s.ir_light.chunks_mut(4) {
        let packed = r.byte();
        for (i, v) in group.iter_mut().enumerate() {
            *v |= unpack_low_bits(packed, i);
        }
    }

    let _charge_state_repeat = r.byte();
    let error_flags = u32::from_be_bytes([0, r.byte(), r.byte(), r.byte()]);
    let command_read = r.byte() != 0;
    let status = StatusFlags::from_byte(r.byte());

    Ok(TelemetrySample {
        power,
        motors,
        sensors: s,
        error_flags,
        command_read,
        status,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TelemetrySample {
        TelemetrySample {
            power: PowerStatus {
                voltage: 126,
                charge_state: 3,
                bat40: 120,
                bat160: 121,
                bat280: 122,
            },
            motors: [
                MotorStatus {
                    voltage: -40,
                    clicks: 12,
                    current: 30,
                    temperature: 200,
                },
                MotorStatus {
                    voltage: 0,
                    clicks: -7,
                    current: 1,
                    temperature: 180,
                },
                MotorStatus {
                    voltage: 127,
                    clicks: 0,
                    current: 255,
                    temperature: 0,
                },
            ],
            sensors: SensorReadings {
                accel: [0xABC, 0x123, 0xFFF],
                mag: [0x3FF, 0x001, 0x202],
                gyro: 0x1FE,
                ir_distance: [1, 2, 3, 0x3FF, 512, 700, 5, 6, 1023, 0x102],
                light: [100, 201, 302, 403],
                thermal: [0x1234, 0, 0xFFFF, 300, 301, 302, 303, 0x8001],
                ir_light: [0, 1, 2, 3, 1020, 1021, 1022, 1023],
            },
            error_flags: 0x00A5_0F01,
            command_read: true,
            status: StatusFlags {
                charging_enabled: true,
                drive_enabled: false,
                monitor_ok: true,
            },
        }
    }

    #[test]
    fn test_frame_length_and_header() {
        let frame = encode_status(&TelemetrySample::default());
        assert_eq!(frame.len(), 83);
        assert_eq!(&frame[..4], &HEADER);
    }

    #[test]
    fn test_crc_covers_whole_frame() {
        for s in [TelemetrySample::default(), sample()] {
            let frame = encode_status(&s);
            let body = &frame[..frame.len() - 2];
            let crc = crc::checksum(body);
            assert_eq!(&frame[frame.len() - 2..], &crc.to_be_bytes());

            // Independent bitwise CRC-16/XMODEM
            let bitwise = body.iter().fold(0u16, |mut acc, &b| {
                acc ^= (b as u16) << 8;
                for _ in 0..8 {
                    acc = if acc & 0x8000 != 0 { (acc << 1) ^ 0x1021 } else { acc << 1 };
                }
                acc
            });
            assert_eq!(crc, bitwise);
        }
    }

    #[test]
    fn test_field_positions() {
        let frame = encode_status(&sample());
        let payload = &frame[4..];

        assert_eq!(&payload[..5], &[126, 3, 120, 121, 122]);
        // Motor 0: voltage, clicks, current, temperature
        assert_eq!(&payload[5..9], &[(-40i8) as u8, 12, 30, 200]);
        // Accelerometer high bytes and nibbles
        assert_eq!(&payload[17..22], &[0xAB, 0x12, 0xFF, 0xC3, 0xF0]);
        // Gyro 0x1FE >> 2 = 0x7F, minus 128
        assert_eq!(payload[25], 0xFF);
        // Thermal[0] little-endian
        assert_eq!(&payload[45..47], &[0x34, 0x12]);
        // Error word: charge state, then low 24 bits
        assert_eq!(&payload[71..75], &[3, 0xA5, 0x0F, 0x01]);
        assert_eq!(payload[75], 1);
        assert_eq!(payload[76], 0b1000_0001);
    }

    #[test]
    fn test_decode_recovers_sample() {
        let s = sample();
        let decoded = decode_status(&encode_status(&s)).expect("valid frame");
        assert_eq!(decoded, s);
    }

    #[test]
    fn test_decode_rejects_corruption() {
        let mut frame = encode_status(&sample());
        frame[30] ^= 0x01;
        assert!(matches!(
            decode_status(&frame),
            Err(ProtocolError::Crc { .. })
        ));

        let mut frame = encode_status(&sample());
        frame[0] = 0x00;
        assert!(matches!(
            decode_status(&frame),
            Err(ProtocolError::Header(_))
        ));

        assert_eq!(
            decode_status(&frame[..10]),
            Err(ProtocolError::Length {
                expected: TELEMETRY_FRAME_LEN,
                got: 10
            })
        );
    }

    #[test]
    fn test_pack_low_bits() {
        assert_eq!(pack_low_bits(&[1, 2, 3, 0]), 0b01_10_11_00);
        assert_eq!(pack_low_bits(&[3, 3]), 0b11_11_00_00);
        assert_eq!(unpack_low_bits(0b01_10_11_00, 2), 3);
    }
}
