//! Frame sequencer step counter.
//!
//! The frame sequencer is the APU's top-level divider: it advances one
//! step per 512 Hz tick and wraps modulo 8. The envelope, sweep and
//! length machines each run off their own independent sub-clock at
//! their authentic rates, so the step is kept purely as observable
//! state rather than as a gate.

use serde::{Deserialize, Serialize};

/// Modulo-8 step counter advanced once per 512 Hz firing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrameSequencer {
    step: u8,
}

impl FrameSequencer {
    pub const fn new() -> Self {
        Self { step: 0 }
    }

    /// Advance to the next step and return it.
    pub fn advance(&mut self) -> u8 {
        self.step = (self.step + 1) & 7;
        self.step
    }

    /// Current step (0-7).
    pub const fn step(&self) -> u8 {
        self.step
    }

    /// Restore the step (used when loading a saved state).
    pub fn set_step(&mut self, step: u8) {
        self.step = step & 7;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequencer_counts_and_wraps_modulo_eight() {
        let mut seq = FrameSequencer::new();
        assert_eq!(seq.step(), 0);
        for expected in [1, 2, 3, 4, 5, 6, 7, 0, 1] {
            assert_eq!(seq.advance(), expected);
        }
    }

    #[test]
    fn step_never_leaves_range() {
        let mut seq = FrameSequencer::new();
        for _ in 0..1000 {
            assert!(seq.advance() < 8);
        }
    }
}
