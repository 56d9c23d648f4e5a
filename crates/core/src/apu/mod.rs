//! Core APU (Audio Processing Unit) components.
//!
//! This module provides the reusable sound state machines of a
//! memory-mapped audio subsystem. The components are designed around
//! the Game Boy APU but keep no knowledge of its address map: each one
//! owns only its private countdown state and takes the relevant raw
//! register byte as input, so the system crate stays the single owner
//! of the register bank.
//!
//! ## Components
//!
//! - **SubClock**: Cycle accumulator that divides the CPU clock into a
//!   fixed sub-clock rate, preserving fractional overshoot
//! - **Frame Sequencer**: Modulo-8 step counter advanced at 512 Hz
//! - **Volume Envelope**: Automatic amplitude ramp for the square and
//!   noise channels
//! - **Sweep Unit**: Frequency shifter with shadow register and
//!   overflow-driven disablement (square 1 only)
//! - **Length Counter**: Note-duration countdown that expires a channel

pub mod envelope;
pub mod frame_sequencer;
pub mod length_counter;
pub mod sweep;
pub mod timing;

pub use envelope::VolumeEnvelope;
pub use frame_sequencer::FrameSequencer;
pub use length_counter::LengthCounter;
pub use sweep::SweepUnit;
pub use timing::SubClock;
