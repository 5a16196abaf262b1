// Power limiter
//
// Average current over the last I_HIST_SIZE ticks times the bus voltage
// estimates power. Past 4 x P_LIMIT the output is forced to zero and held
// there for a full decay window.
//
// The limiter is on/off with decay only: there is no proportional back-off
// between P_LIMIT and 4 x P_LIMIT. Every setpoint is limited, including
// |setpoint| > 100; there is no bypass for large setpoints.

use tracing::debug;

/// Nominal power limit (current counts x 1/10 V)
pub const P_LIMIT: u32 = 500;
/// Current samples averaged
pub const I_HIST_SIZE: usize = 100;
/// Ticks of forced zero output after a trip
pub const DECAY_TICKS: u8 = 255;

#[derive(Debug, Clone)]
pub struct PowerLimiter {
    history: [u8; I_HIST_SIZE],
    next: usize,
    decay: u8,
    power: u32,
}

impl Default for PowerLimiter {
    fn default() -> Self {
        Self {
            history: [0; I_HIST_SIZE],
            next: 0,
            decay: 0,
            power: 0,
        }
    }
}

impl PowerLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Power estimate from the last tick
    pub fn power(&self) -> u32 {
        self.power
    }

    pub fn decay(&self) -> u8 {
        self.decay
    }

    pub fn is_tripped(&self) -> bool {
        self.decay > 0
    }

    pub fn apply(&mut self, setpoint: i8, current: u8, bus_voltage: u8) -> i8 {
        self.history[self.next] = current;
        self.next = (self.next + 1) % I_HIST_SIZE;

        let sum: u32 = self.history.iter().map(|&c| c as u32).sum();
        let average = sum / I_HIST_SIZE as u32;
        self.power = average * bus_voltage as u32;

        if self.power > 4 * P_LIMIT {
            if self.decay == 0 {
                debug!(
                    "Power limit tripped: {} (avg current {}, bus {})",
                    self.power, average, bus_voltage
                );
            }
            self.decay = DECAY_TICKS;
            return 0;
        }

        if self.decay > 0 {
            self.decay -= 1;
            return 0;
        }

        setpoint
    }
}
