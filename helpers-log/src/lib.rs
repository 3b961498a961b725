//! # helpers-log
//!
//! Structured logging built on `tracing`, with output Cloud Logging
//! understands.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use helpers_log::{LogConfig, Logger};
//!
//! let config = LogConfig { verbose: true, ..Default::default() };
//! let (logger, _guard) = Logger::init(&config)?;
//!
//! logger.info(format_args!("listening on {}", 8080));
//! logger.verbose(format_args!("connection pool ready"));
//! # Ok::<(), helpers_error::Error>(())
//! ```
//!
//! ERROR events go to stderr. Lower levels go to stderr too, or to stdout
//! with `log_debug_stdout`. Both streams are written from background threads;
//! keep the returned guard alive until exit.

mod config;
mod format;
mod logger;
mod request;

#[cfg(test)]
mod testing;

pub use config::LogConfig;
pub use format::{severity, StackdriverJson};
pub use logger::{FlushGuard, Logger};
pub use request::{HttpPayload, InFlight, RequestLogger};
