//! Call-site logging macros.
//!
//! Thin sugar over [`Logger::log`](crate::Logger::log): the message is only
//! formatted if the level is enabled for the tag.
//!
//! ```ignore
//! log_info!(logger, "NET", "link up after {} ms", elapsed);
//! log_error!(logger, ROOT_TAG, "flash write failed: {:?}", err);
//! ```

/// Log at an explicit level.
#[macro_export]
macro_rules! log_at {
    ($logger:expr, $tag:expr, $level:expr, $($arg:tt)*) => {
        $logger.log($tag, $level, format_args!($($arg)*))
    };
}

/// Error log.
#[macro_export]
macro_rules! log_error {
    ($logger:expr, $tag:expr, $($arg:tt)*) => {
        $crate::log_at!($logger, $tag, $crate::Level::Error, $($arg)*)
    };
}

/// Warning log.
#[macro_export]
macro_rules! log_warn {
    ($logger:expr, $tag:expr, $($arg:tt)*) => {
        $crate::log_at!($logger, $tag, $crate::Level::Warning, $($arg)*)
    };
}

/// Info log.
#[macro_export]
macro_rules! log_info {
    ($logger:expr, $tag:expr, $($arg:tt)*) => {
        $crate::log_at!($logger, $tag, $crate::Level::Info, $($arg)*)
    };
}

/// Debug log.
#[macro_export]
macro_rules! log_debug {
    ($logger:expr, $tag:expr, $($arg:tt)*) => {
        $crate::log_at!($logger, $tag, $crate::Level::Debug, $($arg)*)
    };
}

/// Trace log (maximum verbosity).
#[macro_export]
macro_rules! log_trace {
    ($logger:expr, $tag:expr, $($arg:tt)*) => {
        $crate::log_at!($logger, $tag, $crate::Level::Trace, $($arg)*)
    };
}
