//! Text command surface for the logger configuration.
//!
//! Feed it lines from whatever the host has (UART, stdin, a socket):
//!
//! ```ignore
//! let cmd = console::parse_line("level NET debug");
//! if let Err(e) = console::execute(&cmd, logger.registry_mut(), &mut out) {
//!     writeln!(out, "{}", e)?;
//! }
//! ```

pub mod commands;
pub mod error;
pub mod parser;

pub use commands::{command_names, execute, COMMANDS};
pub use error::ConsoleError;
pub use parser::{parse_line, ParsedCommand};
