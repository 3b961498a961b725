//! Logging configuration

use serde::Deserialize;

/// How a [`Logger`](crate::Logger) is built. Everything is off by default:
/// INFO and above, machine readable, everything on stderr.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Enable debug events.
    pub debug: bool,

    /// Enable verbose events, emitted at INFO.
    pub verbose: bool,

    /// Colored console output instead of one JSON object per line.
    pub human: bool,

    /// Send events below ERROR to stdout instead of stderr.
    pub log_debug_stdout: bool,

    /// An `EnvFilter` directive, e.g. `info,helpers_config=debug`. Overrides
    /// the level picked by `debug`.
    pub filter: Option<String>,
}
