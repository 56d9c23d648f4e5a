//! Game Boy APU (sound) subsystem
//!
//! This crate emulates the register/timing half of the Game Boy's
//! audio hardware: the memory-mapped NRxx register bank, the wave
//! pattern RAM, and the internally clocked state machines (frequency
//! sweep, volume envelope, length counters, frame sequencer) that run
//! off the 4.194304 MHz CPU clock. Waveform synthesis and audio-device
//! output are downstream concerns and live outside this crate.
//!
//! # Register Map
//!
//! ```text
//! $FF10 (NR10)  Channel 1 sweep
//! $FF11 (NR11)  Channel 1 duty/length
//! $FF12 (NR12)  Channel 1 envelope
//! $FF13 (NR13)  Channel 1 frequency low
//! $FF14 (NR14)  Channel 1 frequency high/control (bit 7 trigger)
//! $FF16 (NR21)  Channel 2 duty/length
//! $FF17 (NR22)  Channel 2 envelope
//! $FF18 (NR23)  Channel 2 frequency low
//! $FF19 (NR24)  Channel 2 frequency high/control (bit 7 trigger)
//! $FF1A (NR30)  Channel 3 on/off
//! $FF1B (NR31)  Channel 3 length
//! $FF1C (NR32)  Channel 3 output level
//! $FF1D (NR33)  Channel 3 frequency low
//! $FF1E (NR34)  Channel 3 frequency high/control
//! $FF20 (NR41)  Channel 4 length
//! $FF21 (NR42)  Channel 4 envelope
//! $FF22 (NR43)  Channel 4 polynomial counter
//! $FF23 (NR44)  Channel 4 control/init (bit 7 trigger)
//! $FF24 (NR50)  Master channel control
//! $FF25 (NR51)  Output terminal selection
//! $FF26 (NR52)  Sound on/off
//! ```
//!
//! Wave pattern RAM is accessed through separate offset-relative
//! [`Apu::read`]/[`Apu::write`] entry points with bounds checking.
//!
//! # Driving the APU
//!
//! The owning machine calls [`Apu::tick`] once per CPU step with the
//! cycles the last instruction consumed; register reads and writes are
//! routed in by the machine's memory bus. Everything is synchronous
//! and single-threaded; ordering between register writes and state
//! machine firings is exactly the call order.

pub mod apu;

pub use apu::{Apu, Channel, AUDIO_RAM_SIZE};

/// Interrupt lines of the machine's interrupt controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    VBlank,
    LcdStat,
    Timer,
    Serial,
    Joypad,
}

/// Capability to raise an interrupt line on the owning machine.
///
/// Passed to the APU at construction instead of a back-reference into
/// the machine's object graph, so the APU stays testable in isolation.
pub trait InterruptLine {
    fn request(&mut self, interrupt: Interrupt);
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ApuError {
    /// Out-of-range audio RAM access. A wrong offset indicates a bug
    /// upstream in the caller's address decoding, so this fails loudly
    /// rather than clamping.
    #[error("audio RAM access out of bounds: offset {offset:#04X} (size {size:#04X})")]
    AudioRamOutOfBounds { offset: u16, size: u16 },
}
