//! Centralized logging configuration for the audio subsystem.
//!
//! Provides a structured logging system shared by every crate in the
//! workspace instead of ad-hoc `eprintln!` calls scattered through the
//! register dispatch paths.
//!
//! # Architecture
//!
//! - **LogConfig**: Thread-safe global configuration using atomic operations
//! - **LogLevel**: Hierarchical log levels (Off < Error < Warn < Info < Debug < Trace)
//! - **LogCategory**: Different logging categories (APU, Bus, Stubs)
//! - **log()**: Common logging function for all output
//!
//! # Performance
//!
//! Messages are lazily evaluated via a closure, so there is zero
//! formatting overhead when logging is disabled. Writes are
//! synchronous; the subsystem emits a handful of messages per second
//! at most (trigger events, unimplemented-register reports), never a
//! per-instruction trace stream.
//!
//! # Usage
//!
//! ```rust
//! use apu_core::logging::{log, LogLevel, LogCategory};
//!
//! log(LogCategory::Apu, LogLevel::Debug, || {
//!     format!("APU: channel 1 trigger at frequency {:04X}", 0x07FF)
//! });
//! ```

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Mutex;

/// Log level for controlling verbosity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    Off = 0,
    Error = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
    Trace = 5,
}

impl LogLevel {
    /// Parse log level from string (case-insensitive)
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "off" | "0" => Some(LogLevel::Off),
            "error" | "err" | "1" => Some(LogLevel::Error),
            "warn" | "warning" | "2" => Some(LogLevel::Warn),
            "info" | "3" => Some(LogLevel::Info),
            "debug" | "4" => Some(LogLevel::Debug),
            "trace" | "5" => Some(LogLevel::Trace),
            _ => None,
        }
    }

    fn to_u8(self) -> u8 {
        self as u8
    }

    fn from_u8(val: u8) -> Self {
        match val {
            0 => LogLevel::Off,
            1 => LogLevel::Error,
            2 => LogLevel::Warn,
            3 => LogLevel::Info,
            4 => LogLevel::Debug,
            5 => LogLevel::Trace,
            _ => LogLevel::Off,
        }
    }
}

/// Log category for different subsystem components
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogCategory {
    /// APU state machines (triggers, sweep, envelope, length)
    Apu,
    /// Register/memory access
    Bus,
    /// Unimplemented features/stubs
    Stubs,
}

/// Global logging configuration
pub struct LogConfig {
    /// Global log level (applies to all categories unless overridden)
    global_level: AtomicU8,
    /// APU-specific log level
    apu_level: AtomicU8,
    /// Bus-specific log level
    bus_level: AtomicU8,
    /// Stub/unimplemented feature log level
    stub_level: AtomicU8,
    /// Optional log file, written synchronously
    log_file: Mutex<Option<File>>,
}

impl LogConfig {
    /// Create a new LogConfig with all logging disabled
    fn new() -> Self {
        Self {
            global_level: AtomicU8::new(LogLevel::Off as u8),
            apu_level: AtomicU8::new(LogLevel::Off as u8),
            bus_level: AtomicU8::new(LogLevel::Off as u8),
            stub_level: AtomicU8::new(LogLevel::Off as u8),
            log_file: Mutex::new(None),
        }
    }

    /// Get the global singleton instance
    pub fn global() -> &'static Self {
        use std::sync::OnceLock;
        static INSTANCE: OnceLock<LogConfig> = OnceLock::new();
        INSTANCE.get_or_init(LogConfig::new)
    }

    /// Set the global log level (applies to all categories unless overridden)
    pub fn set_global_level(&self, level: LogLevel) {
        self.global_level.store(level.to_u8(), Ordering::Relaxed);
    }

    /// Get the global log level
    pub fn get_global_level(&self) -> LogLevel {
        LogLevel::from_u8(self.global_level.load(Ordering::Relaxed))
    }

    /// Set log level for a specific category
    pub fn set_level(&self, category: LogCategory, level: LogLevel) {
        self.category_atomic(category)
            .store(level.to_u8(), Ordering::Relaxed);
    }

    /// Get log level for a specific category
    pub fn get_level(&self, category: LogCategory) -> LogLevel {
        LogLevel::from_u8(self.category_atomic(category).load(Ordering::Relaxed))
    }

    fn category_atomic(&self, category: LogCategory) -> &AtomicU8 {
        match category {
            LogCategory::Apu => &self.apu_level,
            LogCategory::Bus => &self.bus_level,
            LogCategory::Stubs => &self.stub_level,
        }
    }

    /// Check if a message should be logged for the given category and level
    ///
    /// Returns true if:
    /// 1. The category-specific level is set and >= the message level, OR
    /// 2. The category-specific level is Off AND the global level >= the message level
    pub fn should_log(&self, category: LogCategory, level: LogLevel) -> bool {
        let category_level = self.get_level(category);
        if category_level != LogLevel::Off {
            level <= category_level
        } else {
            level <= self.get_global_level()
        }
    }

    /// Reset all logging to Off
    pub fn reset(&self) {
        self.set_global_level(LogLevel::Off);
        self.set_level(LogCategory::Apu, LogLevel::Off);
        self.set_level(LogCategory::Bus, LogLevel::Off);
        self.set_level(LogCategory::Stubs, LogLevel::Off);
    }

    /// Set the log file path
    ///
    /// Returns Ok(()) if successful, or an error if the file cannot be opened.
    pub fn set_log_file(&self, path: PathBuf) -> std::io::Result<()> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let mut log_file = self.log_file.lock().unwrap();
        *log_file = Some(file);
        Ok(())
    }

    /// Close the log file and fall back to stderr output
    pub fn clear_log_file(&self) {
        let mut log_file = self.log_file.lock().unwrap();
        *log_file = None;
    }

    /// Write a message to the configured output (file or stderr)
    fn write_message(&self, message: &str) {
        let mut log_file = self.log_file.lock().unwrap();
        if let Some(ref mut file) = *log_file {
            // Logging must never crash the emulator; fall back to stderr
            if writeln!(file, "{}", message).is_err() {
                eprintln!("{}", message);
            }
        } else {
            eprintln!("{}", message);
        }
    }
}

/// Log a message with the specified category and level
///
/// This is the primary logging function that should be used throughout
/// the workspace. The message is lazily evaluated via a closure, so
/// formatting only occurs when logging is actually enabled for the
/// given category and level.
///
/// # Arguments
///
/// * `category` - The logging category (Apu, Bus, Stubs)
/// * `level` - The log level (Error, Warn, Info, Debug, Trace)
/// * `message_fn` - A closure that produces the message string
///
/// # Examples
///
/// ```rust
/// use apu_core::logging::{log, LogCategory, LogLevel};
///
/// log(LogCategory::Stubs, LogLevel::Warn, || {
///     format!("unhandled register write at {:04X}", 0xFF27)
/// });
/// ```
pub fn log<F>(category: LogCategory, level: LogLevel, message_fn: F)
where
    F: FnOnce() -> String,
{
    let config = LogConfig::global();
    if config.should_log(category, level) {
        let message = message_fn();
        config.write_message(&message);
    }
}
