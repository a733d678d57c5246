//! Log severity levels.
//!
//! Lower ordinal means more severe. A record passes the filter when
//! `record <= effective`, so `None` disables everything and `All` lets
//! everything through.

use core::fmt;
use core::str::FromStr;

/// Log level.
///
/// Defaults to `All` (fully verbose).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Level {
    None = 0,
    Error = 1,
    Warning = 2,
    Info = 3,
    Debug = 4,
    Trace = 5,
    #[default]
    All = 6,
}

impl Level {
    /// Every level, most severe first.
    pub const ALL_LEVELS: [Level; 7] = [
        Level::None,
        Level::Error,
        Level::Warning,
        Level::Info,
        Level::Debug,
        Level::Trace,
        Level::All,
    ];

    /// Single character used in the record prefix.
    pub fn as_char(self) -> char {
        match self {
            Level::Error => 'E',
            Level::Warning => 'W',
            Level::Info => 'I',
            Level::Debug => 'D',
            Level::Trace => 'T',
            Level::None | Level::All => '?',
        }
    }

    /// Lowercase name, as accepted by [`FromStr`].
    pub fn as_str(self) -> &'static str {
        match self {
            Level::None => "none",
            Level::Error => "error",
            Level::Warning => "warning",
            Level::Info => "info",
            Level::Debug => "debug",
            Level::Trace => "trace",
            Level::All => "all",
        }
    }

    /// Convert from raw u8 value.
    ///
    /// Returns `None` for out-of-range values (corrupt queue header).
    pub fn from_u8(value: u8) -> Option<Self> {
        Self::ALL_LEVELS.get(value as usize).copied()
    }

    /// True if a record at `record` passes a filter set to `self`.
    ///
    /// `None` is not a record severity: it never passes, so a `None` filter
    /// delivers nothing.
    #[inline]
    pub fn allows(self, record: Level) -> bool {
        record != Level::None && record <= self
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown level name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown log level `{0}`")]
pub struct ParseLevelError(pub String);

impl FromStr for Level {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let level = match s.trim().to_ascii_lowercase().as_str() {
            "none" | "off" => Level::None,
            "error" | "e" => Level::Error,
            "warning" | "warn" | "w" => Level::Warning,
            "info" | "i" => Level::Info,
            "debug" | "d" => Level::Debug,
            "trace" | "t" => Level::Trace,
            "all" => Level::All,
            _ => return Err(ParseLevelError(s.to_string())),
        };
        Ok(level)
    }
}

impl From<log::Level> for Level {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Error => Level::Error,
            log::Level::Warn => Level::Warning,
            log::Level::Info => Level::Info,
            log::Level::Debug => Level::Debug,
            log::Level::Trace => Level::Trace,
        }
    }
}

impl From<Level> for log::LevelFilter {
    fn from(level: Level) -> Self {
        match level {
            Level::None => log::LevelFilter::Off,
            Level::Error => log::LevelFilter::Error,
            Level::Warning => log::LevelFilter::Warn,
            Level::Info => log::LevelFilter::Info,
            Level::Debug => log::LevelFilter::Debug,
            Level::Trace | Level::All => log::LevelFilter::Trace,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_ordering() {
        assert!(Level::None < Level::Error);
        assert!(Level::Error < Level::Warning);
        assert!(Level::Warning < Level::Info);
        assert!(Level::Info < Level::Debug);
        assert!(Level::Debug < Level::Trace);
        assert!(Level::Trace < Level::All);
    }

    #[test]
    fn test_allows_boundaries() {
        assert!(Level::Info.allows(Level::Info));
        assert!(Level::Info.allows(Level::Error));
        assert!(!Level::Info.allows(Level::Debug));

        for level in &Level::ALL_LEVELS[1..] {
            assert!(Level::All.allows(*level));
        }
        for level in Level::ALL_LEVELS {
            assert!(!Level::None.allows(level));
            assert!(!level.allows(Level::None));
        }
    }

    #[test]
    fn test_level_chars() {
        assert_eq!(Level::Error.as_char(), 'E');
        assert_eq!(Level::Warning.as_char(), 'W');
        assert_eq!(Level::Info.as_char(), 'I');
        assert_eq!(Level::Debug.as_char(), 'D');
        assert_eq!(Level::Trace.as_char(), 'T');
        assert_eq!(Level::None.as_char(), '?');
        assert_eq!(Level::All.as_char(), '?');
    }

    #[test]
    fn test_from_u8() {
        for level in Level::ALL_LEVELS {
            assert_eq!(Level::from_u8(level as u8), Some(level));
        }
        assert_eq!(Level::from_u8(7), None);
        assert_eq!(Level::from_u8(0xFF), None);
    }

    #[test]
    fn test_parse() {
        assert_eq!("warn".parse::<Level>(), Ok(Level::Warning));
        assert_eq!("DEBUG".parse::<Level>(), Ok(Level::Debug));
        assert_eq!(" t ".parse::<Level>(), Ok(Level::Trace));
        assert_eq!("off".parse::<Level>(), Ok(Level::None));
        assert!("loud".parse::<Level>().is_err());
    }

    #[test]
    fn test_log_crate_mapping() {
        assert_eq!(Level::from(log::Level::Warn), Level::Warning);
        assert_eq!(log::LevelFilter::from(Level::None), log::LevelFilter::Off);
        assert_eq!(log::LevelFilter::from(Level::All), log::LevelFilter::Trace);
    }
}
