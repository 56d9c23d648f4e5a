//! Frequency sweep unit for the first square channel.
//!
//! The sweep register (NR10) packs the configuration into one byte:
//! bits 6-4 hold the sweep period, bit 3 selects subtract vs. add, and
//! bits 2-0 hold the shift amount. The unit works on an 11-bit shadow
//! copy of the channel frequency; a successful sweep step hands the
//! new frequency back to the owner, which commits it to the live
//! frequency registers.

use serde::{Deserialize, Serialize};

/// Largest representable 11-bit frequency. A sweep result above this
/// value is an overflow and silences the channel.
pub const MAX_FREQUENCY: u16 = 2047;

/// Sweep state for one channel.
///
/// Owns the private period countdown, the internal enable flag and
/// the shadow frequency. The configured period/direction/shift are
/// read from the register byte on every clock.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SweepUnit {
    timer: u8,
    enabled: bool,
    shadow: u16,
}

impl SweepUnit {
    pub const fn new() -> Self {
        Self {
            timer: 0,
            enabled: false,
            shadow: 0,
        }
    }

    /// Clock the sweep (called at 128 Hz).
    ///
    /// `reg` is the raw sweep register byte. Only takes action when
    /// the countdown, reloaded at trigger time, reaches zero after
    /// decrementing. Returns `Some(frequency)` when a new frequency
    /// was committed to the shadow register and must also be written
    /// to the live frequency registers; on overflow the internal
    /// enable flag clears instead and the live registers stay
    /// untouched.
    pub fn clock(&mut self, reg: u8) -> Option<u16> {
        if self.timer == 0 {
            return None;
        }
        self.timer -= 1;
        if self.timer != 0 {
            return None;
        }

        let shift = reg & 0x07;
        let period = (reg >> 4) & 0x07;

        // A period field of 0 reloads the countdown as 8
        self.timer = if period == 0 { 8 } else { period };
        self.enabled = period != 0 || shift != 0;

        if !self.enabled || period == 0 {
            return None;
        }

        let candidate = self.next_frequency(reg);
        let mut committed = None;

        if candidate <= MAX_FREQUENCY && shift != 0 {
            self.shadow = candidate;
            committed = Some(candidate);
        } else if candidate > MAX_FREQUENCY {
            self.enabled = false;
        }

        // The hardware runs the overflow check a second time, against
        // the possibly updated shadow frequency
        if self.next_frequency(reg) > MAX_FREQUENCY {
            self.enabled = false;
        }

        committed
    }

    /// Restart the sweep for a channel trigger.
    ///
    /// Reloads the shadow register from the live 11-bit `frequency`,
    /// reloads the countdown, recomputes the enable flag, and when the
    /// shift is non-zero immediately runs the overflow check so a
    /// trigger with an already-overflowing frequency silences the
    /// channel at once.
    pub fn trigger(&mut self, reg: u8, frequency: u16) {
        let shift = reg & 0x07;
        let period = (reg >> 4) & 0x07;

        self.shadow = frequency & MAX_FREQUENCY;
        self.timer = if period == 0 { 8 } else { period };
        self.enabled = period != 0 || shift != 0;

        if shift != 0 && self.next_frequency(reg) > MAX_FREQUENCY {
            self.enabled = false;
        }
    }

    /// Internal enable flag. Cleared on overflow; the owning
    /// channel-enable logic consults this to silence the channel.
    pub const fn enabled(&self) -> bool {
        self.enabled
    }

    /// Current shadow frequency.
    pub const fn shadow_frequency(&self) -> u16 {
        self.shadow
    }

    /// `shadow +/- (shadow >> shift)` per the direction bit.
    fn next_frequency(&self, reg: u8) -> u16 {
        let delta = self.shadow >> (reg & 0x07);
        if reg & 0x08 != 0 {
            self.shadow - delta
        } else {
            self.shadow + delta
        }
    }
}
