//! APU clock rates and cycle accounting.
//!
//! The Game Boy APU derives four sub-clocks from the 4.194304 MHz
//! master clock: the 512 Hz frame sequencer, the 256 Hz length
//! counter, the 128 Hz frequency sweep and the 64 Hz volume envelope.
//! Each sub-clock is tracked by an independent [`SubClock`]; the four
//! periods have no useful common divisor, so they are never merged
//! into a single shared timer.

use serde::{Deserialize, Serialize};

/// LR35902 master clock rate in Hz
pub const CLOCK_RATE: u32 = 4_194_304;

/// Frame sequencer rate (steps per second)
pub const FRAME_SEQUENCER_RATE: u32 = 512;
/// Length counter rate
pub const LENGTH_CTR_RATE: u32 = 256;
/// Frequency sweep rate
pub const SWEEP_RATE: u32 = 128;
/// Volume envelope rate
pub const VOL_ENVELOPE_RATE: u32 = 64;

/// CPU cycles per frame sequencer step (8192)
pub const FRAME_SEQUENCER_CYCLES: u32 = CLOCK_RATE / FRAME_SEQUENCER_RATE;
/// CPU cycles per length counter tick (16384)
pub const LENGTH_CTR_CYCLES: u32 = CLOCK_RATE / LENGTH_CTR_RATE;
/// CPU cycles per sweep tick (32768)
pub const SWEEP_CYCLES: u32 = CLOCK_RATE / SWEEP_RATE;
/// CPU cycles per volume envelope tick (65536)
pub const VOL_ENVELOPE_CYCLES: u32 = CLOCK_RATE / VOL_ENVELOPE_RATE;

/// Cycle accumulator dividing the CPU clock down to one sub-clock.
///
/// `advance` adds elapsed cycles and reports how many period
/// boundaries were crossed. The counter is reduced modulo the period
/// rather than reset to zero, so when the caller hands in cycle counts
/// that are not an exact multiple of the period (the common case,
/// since CPU instructions take variable cycle counts) no accounting
/// error accumulates across calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubClock {
    counter: u32,
    period: u32,
}

impl SubClock {
    /// Create a sub-clock firing every `period` CPU cycles.
    ///
    /// `period` must be non-zero.
    pub const fn new(period: u32) -> Self {
        assert!(period > 0, "sub-clock period must be non-zero");
        Self { counter: 0, period }
    }

    /// Accumulate `cycles` elapsed CPU cycles.
    ///
    /// Returns the number of period boundaries crossed, which may be
    /// zero or, for a single call spanning several periods, more than
    /// one. Afterwards the counter always reads `< period`.
    pub fn advance(&mut self, cycles: u32) -> u32 {
        self.counter += cycles;
        let fired = self.counter / self.period;
        self.counter %= self.period;
        fired
    }

    /// Current sub-period remainder in CPU cycles.
    pub const fn counter(&self) -> u32 {
        self.counter
    }

    /// Restore the remainder (used when loading a saved state).
    pub fn set_counter(&mut self, counter: u32) {
        self.counter = counter % self.period;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_periods_match_hardware() {
        assert_eq!(FRAME_SEQUENCER_CYCLES, 8192);
        assert_eq!(LENGTH_CTR_CYCLES, 16384);
        assert_eq!(SWEEP_CYCLES, 32768);
        assert_eq!(VOL_ENVELOPE_CYCLES, 65536);
    }

    #[test]
    fn subclock_fires_exactly_on_the_boundary() {
        let mut clock = SubClock::new(100);
        assert_eq!(clock.advance(99), 0);
        assert_eq!(clock.counter(), 99);
        assert_eq!(clock.advance(1), 1);
        assert_eq!(clock.counter(), 0);
    }

    #[test]
    fn subclock_preserves_the_remainder() {
        let mut clock = SubClock::new(100);
        assert_eq!(clock.advance(123), 1);
        assert_eq!(clock.counter(), 23);

        // The carried remainder makes the next boundary arrive early
        assert_eq!(clock.advance(77), 1);
        assert_eq!(clock.counter(), 0);
    }

    #[test]
    fn subclock_reports_multiple_crossings_in_one_call() {
        let mut clock = SubClock::new(100);
        assert_eq!(clock.advance(350), 3);
        assert_eq!(clock.counter(), 50);
    }

    #[test]
    fn subclock_counter_never_reaches_period() {
        let mut clock = SubClock::new(37);
        let mut total = 0u32;
        for cycles in [1, 5, 36, 37, 38, 111, 2, 73] {
            total += cycles;
            clock.advance(cycles);
            assert!(clock.counter() < 37);
            assert_eq!(clock.counter(), total % 37);
        }
    }

    #[test]
    fn split_ticks_summing_to_one_period_fire_once() {
        let mut clock = SubClock::new(64);
        let mut fired = 0;
        for cycles in [16, 16, 16, 16] {
            fired += clock.advance(cycles);
        }
        assert_eq!(fired, 1);
        assert_eq!(clock.counter(), 0);
    }

    #[test]
    fn zero_cycles_is_a_no_op() {
        let mut clock = SubClock::new(100);
        clock.advance(42);
        assert_eq!(clock.advance(0), 0);
        assert_eq!(clock.counter(), 42);
    }
}
