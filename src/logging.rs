//! Verbosity-gated logging macros for rollouts.
//!
//! Nothing is formatted unless the configured verbosity reaches the
//! macro's level, so silent rollouts pay only an integer comparison.
//!
//! - 0: SILENT
//! - 1: STEPS (one line per rollout iteration)
//! - 2: SLOTS (per-instance actions and rewards)
//! - 3: DEBUG (beam ranking internals)

/// Verbosity level constants.
pub const VERBOSITY_SILENT: u8 = 0;
pub const VERBOSITY_STEPS: u8 = 1;
pub const VERBOSITY_SLOTS: u8 = 2;
pub const VERBOSITY_DEBUG: u8 = 3;

/// Log at STEPS level (verbosity >= 1).
#[macro_export]
macro_rules! log_steps {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $crate::logging::VERBOSITY_STEPS {
            eprintln!($($arg)*);
        }
    };
}

/// Log at SLOTS level (verbosity >= 2).
#[macro_export]
macro_rules! log_slots {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $crate::logging::VERBOSITY_SLOTS {
            eprintln!($($arg)*);
        }
    };
}

/// Log at DEBUG level (verbosity >= 3).
#[macro_export]
macro_rules! log_debug {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $crate::logging::VERBOSITY_DEBUG {
            eprintln!($($arg)*);
        }
    };
}
