// Current limiter
//
// Over-current accumulates a negative correction that pulls the setpoint
// toward zero. The correction never exceeds the setpoint itself (scaled by
// I_LIMIT_SCALE), and it bleeds back to zero once current is under the limit.

/// Current (ADC counts) the limiter regulates to
pub const I_LIMIT: i16 = 25;
/// Correction units per unit of setpoint
pub const I_LIMIT_SCALE: i16 = 32;

/// Setpoint after limiting, plus the signed amount folded into it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limited {
    pub setpoint: i8,
    pub folded: i16,
}

#[derive(Debug, Clone, Default)]
pub struct CurrentLimiter {
    correction: i16,
}

impl CurrentLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn correction(&self) -> i16 {
        self.correction
    }

    pub fn apply(&mut self, setpoint: i8, current: u8) -> Limited {
        let error = I_LIMIT - current as i16;

        self.correction = self.correction.saturating_add(error);
        if error < 0 {
            let floor = -(setpoint as i16).abs() * I_LIMIT_SCALE;
            self.correction = self.correction.max(floor);
        } else {
            self.correction = self.correction.min(0);
        }

        let sign = if setpoint >= 0 { 1 } else { -1 };
        let folded = (self.correction / I_LIMIT_SCALE) * sign;
        let setpoint = (setpoint as i16 + folded).clamp(i8::MIN as i16, i8::MAX as i16) as i8;

        Limited { setpoint, folded }
    }
}
