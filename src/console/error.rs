//! Console error types

/// Console error with code and message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleError {
    /// E01: Unknown command
    UnknownCommand,
    /// E02: Level name or directive string the registry cannot apply
    InvalidValue,
    /// E03: Missing required argument
    MissingArg,
}

impl ConsoleError {
    /// Get error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownCommand => "E01",
            Self::InvalidValue => "E02",
            Self::MissingArg => "E03",
        }
    }

    /// Get error message
    pub fn message(&self) -> &'static str {
        match self {
            Self::UnknownCommand => "unknown command",
            Self::InvalidValue => "invalid value",
            Self::MissingArg => "missing argument",
        }
    }
}

impl core::fmt::Display for ConsoleError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

impl From<crate::level::ParseLevelError> for ConsoleError {
    fn from(_: crate::level::ParseLevelError) -> Self {
        Self::InvalidValue
    }
}

impl From<crate::registry::DirectiveError> for ConsoleError {
    fn from(_: crate::registry::DirectiveError) -> Self {
        Self::InvalidValue
    }
}
