//! The logging handle
//!
//! A [`Logger`] owns a `tracing` dispatcher built from a [`LogConfig`]. It is
//! passed around explicitly; nothing is installed globally unless the caller
//! asks for it with [`Logger::install_global`].

use crate::{LogConfig, StackdriverJson};
use helpers_error::{pool, Error, Ferror, Field, Result};
use std::fmt;
use tracing::dispatcher::{self, DefaultGuard, Dispatch};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// Keeps the background writers alive. Pending events are flushed when the
/// guard is dropped.
#[must_use = "dropping the guard stops the log writers"]
pub struct FlushGuard {
    _guards: Vec<WorkerGuard>,
}

impl FlushGuard {
    /// Flush pending events and stop the writers.
    pub fn flush(self) {
        drop(self);
    }
}

/// A configured logging handle. Cloning is cheap.
#[derive(Clone)]
pub struct Logger {
    dispatch: Dispatch,
    verbose: bool,
}

impl Logger {
    /// Build a logger writing ERROR events to stderr, and everything below
    /// to stderr or stdout depending on `log_debug_stdout`.
    pub fn init(config: &LogConfig) -> Result<(Logger, FlushGuard)> {
        let (errors, errors_guard) = tracing_appender::non_blocking(std::io::stderr());
        let (debugging, debugging_guard) = if config.log_debug_stdout {
            tracing_appender::non_blocking(std::io::stdout())
        } else {
            tracing_appender::non_blocking(std::io::stderr())
        };

        let logger = Self::with_writers(config, errors, debugging)?;
        Ok((
            logger,
            FlushGuard {
                _guards: vec![errors_guard, debugging_guard],
            },
        ))
    }

    /// Build a logger over caller-supplied writers: `errors` receives ERROR
    /// events, `debugging` receives the rest.
    pub fn with_writers<E, D>(config: &LogConfig, errors: E, debugging: D) -> Result<Logger>
    where
        E: for<'w> MakeWriter<'w> + Send + Sync + 'static,
        D: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    {
        let filter = build_filter(config)?;
        let writer = errors
            .with_max_level(Level::ERROR)
            .and(debugging.with_min_level(Level::WARN));

        let layer: Box<dyn Layer<Registry> + Send + Sync> = if config.human {
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(true)
                .boxed()
        } else {
            tracing_subscriber::fmt::layer()
                .event_format(StackdriverJson)
                .with_writer(writer)
                .boxed()
        };

        let subscriber = tracing_subscriber::registry().with(layer).with(filter);

        Ok(Logger {
            dispatch: Dispatch::new(subscriber),
            verbose: config.verbose,
        })
    }

    /// A logger that drops everything.
    pub fn disabled() -> Logger {
        Logger {
            dispatch: Dispatch::none(),
            verbose: false,
        }
    }

    /// Route `tracing` events from this thread to this logger until the guard
    /// is dropped.
    pub fn install(&self) -> DefaultGuard {
        dispatcher::set_default(&self.dispatch)
    }

    /// Make this logger the process-wide default. Can only succeed once.
    pub fn install_global(&self) -> Result<()> {
        dispatcher::set_global_default(self.dispatch.clone()).map_err(|e| {
            Error::failed_precondition(
                format!("unable to install global logger: {}", e),
                vec![Field::new("logger", "a global logger is already installed")],
            )
        })
    }

    /// Run `f` with this logger as the current default.
    pub fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
        dispatcher::with_default(&self.dispatch, f)
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    pub fn debug(&self, args: fmt::Arguments<'_>) {
        self.in_scope(|| tracing::debug!("{}", args));
    }

    pub fn info(&self, args: fmt::Arguments<'_>) {
        self.in_scope(|| tracing::info!("{}", args));
    }

    pub fn warn(&self, args: fmt::Arguments<'_>) {
        self.in_scope(|| tracing::warn!("{}", args));
    }

    pub fn error(&self, args: fmt::Arguments<'_>) {
        self.in_scope(|| tracing::error!("{}", args));
    }

    /// Logged at INFO, and only when the logger is verbose.
    pub fn verbose(&self, args: fmt::Arguments<'_>) {
        if self.verbose {
            self.info(args);
        }
    }

    /// Log an error at ERROR with its code and verbose rendering.
    pub fn log_error(&self, err: &dyn Ferror) {
        let code = err.code();
        pool::render_verbose(err, |rendered| {
            self.in_scope(|| tracing::error!(code = %code, "{}", rendered))
        });
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("verbose", &self.verbose)
            .finish_non_exhaustive()
    }
}

fn build_filter(config: &LogConfig) -> Result<EnvFilter> {
    match &config.filter {
        Some(directive) => EnvFilter::try_new(directive).map_err(|e| {
            Error::invalid_argument(
                format!("invalid log filter '{}'", directive),
                vec![Field::new("filter", e.to_string())],
            )
        }),
        None if config.debug => Ok(EnvFilter::new("debug")),
        None => Ok(EnvFilter::new("info")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Capture;
    use helpers_error::ErrorCode;

    fn capture(config: &LogConfig) -> (Logger, Capture, Capture) {
        let errors = Capture::default();
        let debugging = Capture::default();
        let logger = Logger::with_writers(config, errors.clone(), debugging.clone()).unwrap();
        (logger, errors, debugging)
    }

    #[test]
    fn test_levels_split_between_writers() {
        let (logger, errors, debugging) = capture(&LogConfig::default());

        logger.info(format_args!("started"));
        logger.warn(format_args!("slow"));
        logger.error(format_args!("failed"));

        let errors = errors.json_lines();
        let debugging = debugging.json_lines();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0]["message"], "failed");
        assert_eq!(debugging.len(), 2);
        assert_eq!(debugging[0]["severity"], "INFO");
        assert_eq!(debugging[1]["severity"], "WARNING");
    }

    #[test]
    fn test_debug_needs_debug_flag() {
        let (logger, _, debugging) = capture(&LogConfig::default());
        logger.debug(format_args!("hidden"));
        assert!(debugging.json_lines().is_empty());

        let config = LogConfig {
            debug: true,
            ..Default::default()
        };
        let (logger, _, debugging) = capture(&config);
        logger.debug(format_args!("shown {}", 1));
        let lines = debugging.json_lines();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["message"], "shown 1");
    }

    #[test]
    fn test_verbose_needs_verbose_flag() {
        let (logger, _, debugging) = capture(&LogConfig::default());
        logger.verbose(format_args!("hidden"));
        assert!(debugging.json_lines().is_empty());

        let config = LogConfig {
            verbose: true,
            ..Default::default()
        };
        let (logger, _, debugging) = capture(&config);
        logger.verbose(format_args!("connected"));
        let lines = debugging.json_lines();
        assert_eq!(lines[0]["severity"], "INFO");
        assert_eq!(lines[0]["message"], "connected");
    }

    #[test]
    fn test_filter_overrides_debug() {
        let config = LogConfig {
            debug: true,
            filter: Some("warn".to_string()),
            ..Default::default()
        };
        let (logger, _, debugging) = capture(&config);
        logger.info(format_args!("hidden"));
        logger.warn(format_args!("shown"));
        assert_eq!(debugging.json_lines().len(), 1);
    }

    #[test]
    fn test_invalid_filter() {
        let config = LogConfig {
            filter: Some("helpers=notalevel".to_string()),
            ..Default::default()
        };
        let err = Logger::with_writers(&config, Capture::default(), Capture::default()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidArgument);
        assert_eq!(err.fields()[0].name, "filter");
    }

    #[test]
    fn test_log_error_renders_verbose() {
        let (logger, errors, _) = capture(&LogConfig::default());
        let err = Error::not_found("user 42").wrap("load profile");

        logger.log_error(&err);

        let lines = errors.json_lines();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["code"], "NotFound");
        let message = lines[0]["message"].as_str().unwrap();
        assert!(message.starts_with("load profile: (NotFound) user 42\n"));
    }

    #[test]
    fn test_disabled_drops_everything() {
        let logger = Logger::disabled();
        logger.error(format_args!("nowhere"));
        assert!(!logger.is_verbose());
    }

    #[test]
    fn test_install_scopes_plain_macros() {
        let (logger, _, debugging) = capture(&LogConfig::default());
        {
            let _guard = logger.install();
            tracing::info!(request_id = "abc", "handled");
        }
        tracing::info!("after the guard");

        let lines = debugging.json_lines();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["request_id"], "abc");
    }

    #[test]
    fn test_human_format() {
        let config = LogConfig {
            human: true,
            ..Default::default()
        };
        let (logger, _, debugging) = capture(&config);
        logger.info(format_args!("readable"));
        let output = debugging.contents();
        assert!(output.contains("readable"));
        assert!(serde_json::from_str::<serde_json::Value>(output.trim()).is_err());
    }
}
