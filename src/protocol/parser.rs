// Resynchronizing decoder for inbound command frames
//
// HEADER1 -> HEADER2 -> HEADER3 -> HEADER4 -> MOTORDATA -> (LEDDATA | HEADER1)
//
// A mismatched header byte drops back to scanning for HEADER1, so a corrupted
// byte costs one byte of input rather than the rest of the stream. A state only
// consumes input once all of its bytes are available.

use tracing::{debug, trace};

use super::messages::{
    CommandFrame, HEADER, LED_DATA_LEN, LED_NUM_LEDS, LedMode, MOTOR_DATA_LEN, Rgb,
};
use crate::config::SER_RX_BUF_SIZE;

/// Decoder position within a frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum State {
    Header1,
    Header2,
    Header3,
    Header4,
    MotorData,
    /// Motor fields already decoded, waiting for the custom LED block
    LedData(CommandFrame),
}

impl State {
    /// Bytes this state consumes in one step
    pub fn bytes_needed(&self) -> usize {
        match self {
            State::Header1 | State::Header2 | State::Header3 | State::Header4 => 1,
            State::MotorData => MOTOR_DATA_LEN,
            State::LedData(_) => LED_DATA_LEN,
        }
    }
}

/// Result of feeding one chunk to `transition`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub next: State,
    pub frame: Option<CommandFrame>,
    /// A partially matched header was abandoned
    pub desync: bool,
}

impl Step {
    fn to(next: State) -> Self {
        Self {
            next,
            frame: None,
            desync: false,
        }
    }
}

// A byte that breaks a partial header may itself start the next one
fn resync(byte: u8) -> Step {
    let next = if byte == HEADER[0] {
        State::Header2
    } else {
        State::Header1
    };
    Step {
        next,
        frame: None,
        desync: true,
    }
}

fn expect_header(byte: u8, index: usize, next: State) -> Step {
    if byte == HEADER[index] {
        Step::to(next)
    } else {
        resync(byte)
    }
}

/// Pure state transition; `chunk` must hold exactly `state.bytes_needed()` bytes.
pub fn transition(state: State, chunk: &[u8]) -> Step {
    debug_assert_eq!(chunk.len(), state.bytes_needed());

    match state {
        State::Header1 => {
            if chunk[0] == HEADER[0] {
                Step::to(State::Header2)
            } else {
                Step::to(State::Header1)
            }
        }
        State::Header2 => expect_header(chunk[0], 1, State::Header3),
        State::Header3 => expect_header(chunk[0], 2, State::Header4),
        State::Header4 => expect_header(chunk[0], 3, State::MotorData),
        State::MotorData => {
            let frame = CommandFrame::new(
                chunk[0].into(),
                chunk[1] as i8,
                chunk[2] as i8,
                chunk[3] as i8,
                chunk[4].into(),
            );
            if frame.led_mode == LedMode::Custom {
                Step::to(State::LedData(frame))
            } else {
                Step {
                    next: State::Header1,
                    frame: Some(frame),
                    desync: false,
                }
            }
        }
        State::LedData(mut frame) => {
            let mut leds = [Rgb::default(); LED_NUM_LEDS];
            for (led, rgb) in leds.iter_mut().zip(chunk.chunks_exact(3)) {
                *led = Rgb::new(rgb[0], rgb[1], rgb[2]);
            }
            frame.leds = Some(leds);
            Step {
                next: State::Header1,
                frame: Some(frame),
                desync: false,
            }
        }
    }
}

/// Outcome of one `decode_available` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    /// Last frame completed in this call; earlier ones are overwritten
    pub frame: Option<CommandFrame>,
    /// Bytes the caller must drop from the front of its buffer
    pub consumed: usize,
}

/// Command frame decoder, keeps its position across calls
#[derive(Debug, Clone)]
pub struct Parser {
    state: State,
    max_bytes_per_call: usize,
    desyncs: u64,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    pub fn new() -> Self {
        Self::with_limit(SER_RX_BUF_SIZE)
    }

    /// Parser that consumes at most `max_bytes_per_call` bytes per call
    pub fn with_limit(max_bytes_per_call: usize) -> Self {
        Self {
            state: State::Header1,
            max_bytes_per_call: max_bytes_per_call.max(LED_DATA_LEN),
            desyncs: 0,
        }
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    /// Partial headers abandoned so far
    pub fn desyncs(&self) -> u64 {
        self.desyncs
    }

    /// Decode as much of `input` as whole states allow, up to the per-call bound.
    pub fn decode_available(&mut self, input: &[u8]) -> Decoded {
        let mut consumed = 0;
        let mut frame = None;

        loop {
            let needed = self.state.bytes_needed();
            if input.len() - consumed < needed || consumed + needed > self.max_bytes_per_call {
                break;
            }

            let state = std::mem::replace(&mut self.state, State::Header1);
            let step = transition(state, &input[consumed..consumed + needed]);
            consumed += needed;
            self.state = step.next;

            if step.desync {
                self.desyncs += 1;
                trace!("Header desync at offset {}", consumed - 1);
            }
            if let Some(decoded) = step.frame {
                debug!("Decoded command frame: {:?}", decoded);
                frame = Some(decoded);
            }
        }

        Decoded { frame, consumed }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::messages::{CCLEAR, MotorMode, WHEEL_SPACE};

    fn wheel_frame(m1: i8, m2: i8, m3: i8) -> Vec<u8> {
        CommandFrame::new(MotorMode::WheelSpace, m1, m2, m3, LedMode::Clear).encode()
    }

    #[test]
    fn test_decode_single_frame() {
        let mut parser = Parser::new();
        let input = [0xDE, 0xAD, 0xBE, 0xEF, WHEEL_SPACE, 50, 0xCE, 0, CCLEAR];
        let decoded = parser.decode_available(&input);

        assert_eq!(decoded.consumed, input.len());
        let frame = decoded.frame.expect("frame decoded");
        assert_eq!(frame.motor_mode, MotorMode::WheelSpace);
        assert_eq!(frame.motion(), [50, -50, 0]);
        assert_eq!(frame.led_mode, LedMode::Clear);
        assert_eq!(frame.leds, None);
        assert_eq!(*parser.state(), State::Header1);
    }

    #[test]
    fn test_resync_after_noise() {
        let noise_sets: [&[u8]; 4] = [
            &[0x00, 0x11, 0x22],
            &[0xDE, 0xAD, 0x00],
            &[0xDE, 0xAD, 0xBE, 0x01, 0xDE],
            &[0xDE, 0xDE, 0xAD, 0xDE],
        ];
        for noise in noise_sets {
            let mut input = noise.to_vec();
            input.extend(wheel_frame(10, 20, 30));

            let mut parser = Parser::new();
            let decoded = parser.decode_available(&input);
            assert_eq!(decoded.consumed, input.len(), "noise {:02X?}", noise);
            assert_eq!(
                decoded.frame.map(|f| f.motion()),
                Some([10, 20, 30]),
                "noise {:02X?}",
                noise
            );
        }
    }

    #[test]
    fn test_partial_motor_data_not_consumed() {
        let mut parser = Parser::new();
        let frame = wheel_frame(1, 2, 3);

        // Header plus 3 of the 5 motor bytes
        let decoded = parser.decode_available(&frame[..7]);
        assert_eq!(decoded.consumed, 4);
        assert_eq!(decoded.frame, None);
        assert_eq!(*parser.state(), State::MotorData);

        let decoded = parser.decode_available(&frame[4..]);
        assert_eq!(decoded.consumed, 5);
        assert_eq!(decoded.frame.map(|f| f.motion()), Some([1, 2, 3]));
    }

    #[test]
    fn test_custom_leds_wait_for_full_block() {
        let mut leds = [Rgb::default(); LED_NUM_LEDS];
        leds[3] = Rgb::new(9, 8, 7);
        let bytes = CommandFrame::new(MotorMode::WheelSpace, 5, 5, 5, LedMode::Custom)
            .with_leds(leds)
            .encode();

        let mut parser = Parser::new();
        let decoded = parser.decode_available(&bytes[..bytes.len() - 1]);
        assert_eq!(decoded.consumed, 9);
        assert_eq!(decoded.frame, None);
        assert!(matches!(parser.state(), State::LedData(_)));

        let decoded = parser.decode_available(&bytes[9..]);
        assert_eq!(decoded.consumed, LED_DATA_LEN);
        let frame = decoded.frame.expect("frame decoded");
        assert_eq!(frame.leds.map(|l| l[3]), Some(Rgb::new(9, 8, 7)));
        assert_eq!(frame.motion(), [5, 5, 5]);
    }

    #[test]
    fn test_later_frame_overwrites_earlier() {
        let mut input = wheel_frame(1, 1, 1);
        input.extend(wheel_frame(2, 2, 2));

        let decoded = Parser::new().decode_available(&input);
        assert_eq!(decoded.consumed, input.len());
        assert_eq!(decoded.frame.map(|f| f.motion()), Some([2, 2, 2]));
    }

    #[test]
    fn test_bounded_consumption_on_garbage() {
        let garbage = vec![0x55u8; 5000];
        let mut parser = Parser::with_limit(100);
        let decoded = parser.decode_available(&garbage);
        assert_eq!(decoded.consumed, 100);
        assert_eq!(decoded.frame, None);
    }

    #[test]
    fn test_desync_counter() {
        let mut parser = Parser::new();
        parser.decode_available(&[0xDE, 0xAD, 0x00, 0xDE, 0x01]);
        assert_eq!(parser.desyncs(), 2);
        assert_eq!(*parser.state(), State::Header1);
    }

    #[test]
    fn test_transition_is_pure() {
        let step = transition(State::Header4, &[0xEF]);
        assert_eq!(step.next, State::MotorData);
        assert!(!step.desync);

        let step = transition(State::Header3, &[0xDE]);
        assert_eq!(step.next, State::Header2);
        assert!(step.desync);
    }
}
