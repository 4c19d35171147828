/*!
Logging configuration for the engine.

Mirrors the shape of a typical `log`-facade setup: a small config struct
naming a verbosity level, and an `init_log` entry point an embedding binary
or test harness calls once at startup.
*/

use serde_derive::{Deserialize, Serialize};

/// Verbosity level for engine-internal logging.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel::Info
    }
}

/// Installs an `env_logger` backend at the given level.
///
/// Safe to call more than once; subsequent calls are no-ops (matches
/// `env_logger::Builder::try_init` semantics).
pub fn init_log(level: LogLevel) {
    let _ = env_logger::Builder::new()
        .filter_level(level.into())
        .is_test(cfg!(test))
        .try_init();
}
