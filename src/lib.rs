//! # sinklog
//!
//! Tagged, leveled logging with pluggable sinks and an interrupt-safe
//! asynchronous sink adapter.
//!
//! ## Architecture
//!
//! ```text
//! producer ──▶ Logger ──▶ Registry::resolve(tag) ──▶ [sink, sink, ...]
//!  (task/ISR)   format                                   │
//!                                                        ▼
//!                                          AsyncSink ──▶ buffer ──▶ consumer thread ──▶ real sink
//! ```
//!
//! - Each tag may override the level and/or the sink list; missing fields
//!   fall back to the globals at resolve time.
//! - Any synchronous [`Sink`] can be wrapped in an [`AsyncSink`], making it
//!   callable from interrupt handlers. Overload drops whole records and the
//!   consumer reports the count.
//! - [`bridge::install`] routes the `log` crate facade into a [`Logger`].

pub mod async_sink;
pub mod bridge;
mod channel;
pub mod console;
pub mod context;
pub mod format;
pub mod level;
pub mod logger;
mod macros;
pub mod registry;
pub mod sink;
#[cfg(target_os = "espidf")]
pub mod uart_sink;

pub use async_sink::{message_len, AsyncSink, AsyncSinkConfig, AsyncSinkError};
pub use bridge::LogBridge;
pub use context::{DefaultContext, ExecutionContext, TaskContext};
pub use level::{Level, ParseLevelError};
pub use logger::{Logger, TimeSource, ROOT_TAG};
pub use registry::{DirectiveError, EffectiveConfig, Registry};
pub use sink::{BoxedSink, ColorSink, MemorySink, SharedSink, Sink, WriterSink};
#[cfg(target_os = "espidf")]
pub use uart_sink::{UartSink, UartSinkConfig};

/// Crate version with git hash, stamped by the build script.
pub const VERSION: &str = env!("VERSION_STRING");
