//! Length counter used by all four channels.
//!
//! The length counter provides automatic note duration: it counts down
//! at 256 Hz and reports expiry so the owner can clear the channel's
//! length-enable bit. The live value is held here rather than being
//! recomputed from the length register, whose byte stays exactly as
//! written.

use serde::{Deserialize, Serialize};

/// Reload value for the square and noise channels.
pub const SQUARE_MAX_LENGTH: u16 = 63;
/// Reload value for the wave channel, whose length field is a full byte.
pub const WAVE_MAX_LENGTH: u16 = 256;

/// Note-duration countdown for one channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LengthCounter {
    value: u16,
    max: u16,
}

impl LengthCounter {
    /// Create a counter reloading to `max` on trigger.
    pub const fn new(max: u16) -> Self {
        Self { value: 0, max }
    }

    /// Sync the live value from a length-field register write.
    pub fn load(&mut self, value: u16) {
        self.value = value;
    }

    /// Clock the counter (called at 256 Hz while length is enabled).
    ///
    /// Returns `true` exactly when the decrement reaches zero; the
    /// owner then clears the channel's length-enable bit. Further
    /// clocks at zero are no-ops.
    pub fn clock(&mut self) -> bool {
        if self.value == 0 {
            return false;
        }
        self.value -= 1;
        self.value == 0
    }

    /// Restart for a channel trigger: an exhausted counter reloads to
    /// the channel maximum, a running one is left alone.
    pub fn trigger(&mut self) {
        if self.value == 0 {
            self.value = self.max;
        }
    }

    /// Current countdown value.
    pub const fn value(&self) -> u16 {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_decrements_and_reports_expiry_once() {
        let mut len = LengthCounter::new(SQUARE_MAX_LENGTH);
        len.load(3);
        assert!(!len.clock());
        assert!(!len.clock());
        assert!(len.clock());
        assert_eq!(len.value(), 0);

        // Exhausted: further clocks are no-ops
        assert!(!len.clock());
        assert_eq!(len.value(), 0);
    }

    #[test]
    fn trigger_reloads_only_an_exhausted_counter() {
        let mut len = LengthCounter::new(SQUARE_MAX_LENGTH);
        len.trigger();
        assert_eq!(len.value(), 63);

        len.load(10);
        len.trigger();
        assert_eq!(len.value(), 10);
    }

    #[test]
    fn wave_counter_reloads_to_256() {
        let mut len = LengthCounter::new(WAVE_MAX_LENGTH);
        len.trigger();
        assert_eq!(len.value(), 256);
    }

    #[test]
    fn full_note_runs_down_from_reload() {
        let mut len = LengthCounter::new(SQUARE_MAX_LENGTH);
        len.trigger();
        let mut expired = 0;
        for _ in 0..63 {
            if len.clock() {
                expired += 1;
            }
        }
        assert_eq!(expired, 1);
        assert_eq!(len.value(), 0);
    }
}
