//! 8-bit register cell with bit-level accessors.
//!
//! Every memory-mapped APU register is a plain byte; the meaning of
//! each bit is channel-specific and interpreted by the state machines,
//! never by the register itself.

use serde::{Deserialize, Serialize};

/// An 8-bit storage cell.
///
/// All 256 values are representable; no validation is applied. A
/// register holds exactly the last byte stored via [`set`](Self::set)
/// or mutated through an explicit [`set_bit`](Self::set_bit).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ByteRegister {
    value: u8,
}

impl ByteRegister {
    /// Create a register holding `value`.
    pub const fn new(value: u8) -> Self {
        Self { value }
    }

    /// Read the whole byte.
    pub const fn value(&self) -> u8 {
        self.value
    }

    /// Overwrite the whole byte.
    pub fn set(&mut self, value: u8) {
        self.value = value;
    }

    /// Test bit `n` (0-7).
    pub const fn bit(&self, n: u8) -> bool {
        (self.value >> n) & 1 != 0
    }

    /// Set bit `n` (0-7) to `on`.
    pub fn set_bit(&mut self, n: u8, on: bool) {
        if on {
            self.value |= 1 << n;
        } else {
            self.value &= !(1 << n);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_round_trips_any_byte() {
        let mut reg = ByteRegister::default();
        for value in 0..=255u8 {
            reg.set(value);
            assert_eq!(reg.value(), value);
        }
    }

    #[test]
    fn bit_test_matches_value() {
        let reg = ByteRegister::new(0b1010_0101);
        assert!(reg.bit(0));
        assert!(!reg.bit(1));
        assert!(reg.bit(2));
        assert!(reg.bit(5));
        assert!(reg.bit(7));
        assert!(!reg.bit(6));
    }

    #[test]
    fn set_bit_touches_only_one_bit() {
        let mut reg = ByteRegister::new(0x00);
        reg.set_bit(6, true);
        assert_eq!(reg.value(), 0x40);
        reg.set_bit(6, true);
        assert_eq!(reg.value(), 0x40);
        reg.set_bit(6, false);
        assert_eq!(reg.value(), 0x00);
    }

    #[test]
    fn clearing_a_clear_bit_is_a_no_op() {
        let mut reg = ByteRegister::new(0xBF);
        reg.set_bit(6, false);
        assert_eq!(reg.value(), 0xBF);
    }
}
