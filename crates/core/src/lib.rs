//! Core audio-subsystem primitives shared across systems.
//!
//! This crate holds the system-agnostic pieces of an emulated APU:
//! the [`register::ByteRegister`] storage cell, the sound state
//! machines and cycle bookkeeping under [`apu`], and the [`logging`]
//! infrastructure. System crates (e.g. the Game Boy APU) wire these
//! components to their own memory-mapped register banks.

pub mod apu;
pub mod logging;
pub mod register;

pub use register::ByteRegister;
