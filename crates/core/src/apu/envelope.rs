//! Volume envelope generator for the square and noise channels.
//!
//! The envelope register (NRx2) packs the configuration into one byte:
//! bits 7-4 hold the current 4-bit volume, bit 3 selects amplify vs.
//! attenuate, and bits 2-0 hold the countdown period. The volume lives
//! in the register itself, so a step produces a rewritten register
//! byte for the owner to store back.

use serde::{Deserialize, Serialize};

const MAX_VOL: u8 = 15;
const MIN_VOL: u8 = 0;

/// Per-channel envelope countdown.
///
/// Owns only the private 3-bit period timer; the configured period,
/// direction and volume are read from the register byte on every
/// clock, so a register write between ticks takes effect immediately.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VolumeEnvelope {
    timer: u8,
}

impl VolumeEnvelope {
    pub const fn new() -> Self {
        Self { timer: 0 }
    }

    /// Clock the envelope (called at 64 Hz).
    ///
    /// `reg` is the channel's raw envelope register byte. Returns the
    /// rewritten byte when the volume stepped, `None` otherwise.
    ///
    /// A period of 0 freezes the envelope entirely: no countdown
    /// happens and the volume never changes. A step that would leave
    /// the 0-15 range is skipped with the volume unchanged.
    pub fn clock(&mut self, reg: u8) -> Option<u8> {
        let period = reg & 0x07;
        if period == 0 {
            return None;
        }

        // A fresh countdown is primed from the period so the first
        // volume step lands after exactly `period` firings.
        if self.timer == 0 {
            self.timer = period;
        }

        self.timer -= 1;
        if self.timer != 0 {
            return None;
        }
        self.timer = period;

        let volume = reg >> 4;
        let amplify = reg & 0x08 != 0;

        let new_volume = if amplify {
            if volume >= MAX_VOL {
                return None;
            }
            volume + 1
        } else {
            if volume <= MIN_VOL {
                return None;
            }
            volume - 1
        };

        Some((reg & 0x0F) | (new_volume << 4))
    }

    /// Reload the countdown from the register's period field.
    ///
    /// Invoked by the trigger protocol when the channel restarts.
    pub fn trigger(&mut self, reg: u8) {
        self.timer = reg & 0x07;
    }

    /// Current countdown value.
    pub const fn timer(&self) -> u8 {
        self.timer
    }
}
