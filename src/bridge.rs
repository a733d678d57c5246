//! `log` crate facade bridge.
//!
//! Routes records emitted with `log::info!` and friends (by this program or
//! by its dependencies) into a [`Logger`]. The record target becomes the
//! tag, so per-module overrides work with `registry.set_level("my_crate::net", ..)`.
//!
//! # Rules
//!
//! - Sinks must not log through the facade themselves (the dispatch lock is
//!   not reentrant).
//! - Level filtering is done by the registry; the facade max level is left
//!   at `Trace`.

use std::sync::Mutex;

use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};

use crate::level::Level;
use crate::logger::Logger;

/// `log::Log` implementation over a shared [`Logger`].
pub struct LogBridge {
    logger: Mutex<Logger>,
}

impl LogBridge {
    pub fn new(logger: Logger) -> Self {
        Self {
            logger: Mutex::new(logger),
        }
    }

    /// Run `f` with exclusive access to the logger (configuration, direct logging).
    ///
    /// Returns `None` if a sink panicked during an earlier dispatch.
    pub fn with_logger<R>(&self, f: impl FnOnce(&mut Logger) -> R) -> Option<R> {
        self.logger.lock().ok().map(|mut logger| f(&mut logger))
    }
}

impl Log for LogBridge {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        self.logger
            .lock()
            .map(|logger| logger.enabled(metadata.target(), metadata.level().into()))
            .unwrap_or(false)
    }

    fn log(&self, record: &Record<'_>) {
        if let Ok(mut logger) = self.logger.lock() {
            let level: Level = record.level().into();
            logger.log(record.target(), level, *record.args());
        }
    }

    // Sinks write through on every record.
    fn flush(&self) {}
}

/// Install `logger` as the process-wide `log` backend.
///
/// The bridge lives for the rest of the program; keep the returned reference
/// to reconfigure the registry later. Fails if a logger is already set.
pub fn install(logger: Logger) -> Result<&'static LogBridge, SetLoggerError> {
    let bridge: &'static LogBridge = Box::leak(Box::new(LogBridge::new(logger)));
    log::set_logger(bridge)?;
    log::set_max_level(LevelFilter::Trace);
    Ok(bridge)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;

    fn bridge_with_sink() -> (LogBridge, MemorySink) {
        let mem = MemorySink::new();
        let mut logger = Logger::new();
        logger.registry_mut().add_global_sink(Box::new(mem.clone()));
        (LogBridge::new(logger), mem)
    }

    #[test]
    fn test_record_target_becomes_tag() {
        let (bridge, mem) = bridge_with_sink();
        bridge.log(
            &Record::builder()
                .level(log::Level::Warn)
                .target("wifi")
                .args(format_args!("rssi {}", -70))
                .build(),
        );

        assert_eq!(mem.text(), "W (00000) [wifi] rssi -70\r\n");
        assert_eq!(mem.writes()[0].level, Level::Warning);
    }

    #[test]
    fn test_enabled_follows_registry() {
        let (bridge, _mem) = bridge_with_sink();
        bridge.with_logger(|l| {
            l.registry_mut().set_global_level(Level::Info);
            l.registry_mut().set_level("chatty", Level::Trace);
        });

        let meta = |target, level| Metadata::builder().target(target).level(level).build();
        assert!(bridge.enabled(&meta("app", log::Level::Info)));
        assert!(!bridge.enabled(&meta("app", log::Level::Debug)));
        assert!(bridge.enabled(&meta("chatty", log::Level::Trace)));
    }
}
