// Error types and the shared 32-bit error register reported in telemetry

/// Errors decoding a telemetry frame on the host side
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("Frame length {got} does not match expected {expected}")]
    Length { expected: usize, got: usize },

    #[error("Invalid frame header: {0:02X?}")]
    Header([u8; 4]),

    #[error("CRC mismatch: computed 0x{computed:04X}, received 0x{received:04X}")]
    Crc { computed: u16, received: u16 },
}

/// Faults on the bus between the host-facing controller and the motor/power controllers
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BusError {
    #[error("Power controller reply misaligned: expected padding 0x{expected:02X}, got 0x{got:02X}")]
    PowerAlignment { expected: u8, got: u8 },
}

impl BusError {
    /// Error register bit this fault is recorded under
    pub fn flag(&self) -> u32 {
        match self {
            BusError::PowerAlignment { .. } => ERR_POWER_ALIGN,
        }
    }
}

/// Errors that end the runtime loop
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// Error register bits
pub const ERR_POWER_ALIGN: u32 = 1 << 0;
pub const ERR_RX_OVERFLOW: u32 = 1 << 1;

/// 32-bit latched error flags, cleared by mask
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ErrorRegister(u32);

impl ErrorRegister {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, flags: u32) {
        self.0 |= flags;
    }

    pub fn clear(&mut self, mask: u32) {
        self.0 &= !mask;
    }

    pub fn is_set(&self, flags: u32) -> bool {
        self.0 & flags == flags
    }

    pub fn bits(&self) -> u32 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_set_and_clear_mask() {
        let mut reg = ErrorRegister::new();
        reg.set(ERR_POWER_ALIGN);
        reg.set(ERR_RX_OVERFLOW);
        assert!(reg.is_set(ERR_POWER_ALIGN | ERR_RX_OVERFLOW));
        assert!(!reg.is_set(1 << 31));

        reg.clear(ERR_POWER_ALIGN);
        assert_eq!(reg.bits(), ERR_RX_OVERFLOW);

        reg.clear(0xFFFF_FFFF);
        assert_eq!(reg.bits(), 0);
    }

    #[test]
    fn test_bus_error_flag() {
        let err = BusError::PowerAlignment {
            expected: 0x7D,
            got: 0x00,
        };
        assert_eq!(err.flag(), ERR_POWER_ALIGN);
        assert_eq!(
            err.to_string(),
            "Power controller reply misaligned: expected padding 0x7D, got 0x00"
        );
    }
}
