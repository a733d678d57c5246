//! Command line parser
//!
//! Split on whitespace: command name plus at most [`MAX_ARGS`] arguments.

/// Arguments kept per line; extra tokens are ignored.
pub const MAX_ARGS: usize = 3;

/// Parsed command line, borrowing from the input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand<'a> {
    /// The command name (first token), empty for a blank line
    pub command: &'a str,
    pub args: [Option<&'a str>; MAX_ARGS],
}

impl<'a> ParsedCommand<'a> {
    /// Blank line
    pub const fn empty() -> Self {
        Self {
            command: "",
            args: [None; MAX_ARGS],
        }
    }

    /// Argument by index (0-based)
    pub fn arg(&self, idx: usize) -> Option<&'a str> {
        self.args.get(idx).copied().flatten()
    }

    /// Number of arguments present
    pub fn arg_count(&self) -> usize {
        self.args.iter().take_while(|a| a.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.command.is_empty()
    }
}

/// Parse a command line into command and arguments
pub fn parse_line(line: &str) -> ParsedCommand<'_> {
    let mut parts = line.split_whitespace();
    let mut cmd = ParsedCommand::empty();

    cmd.command = parts.next().unwrap_or("");
    for (slot, arg) in cmd.args.iter_mut().zip(parts) {
        *slot = Some(arg);
    }
    cmd
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arg_count() {
        assert_eq!(parse_line("tags").arg_count(), 0);
        assert_eq!(parse_line("level NET debug").arg_count(), 2);
        assert_eq!(parse_line("a b c d e").arg_count(), MAX_ARGS);
    }

    #[test]
    fn test_blank_line() {
        assert!(parse_line("   \t ").is_empty());
        assert_eq!(parse_line(""), ParsedCommand::empty());
    }
}
