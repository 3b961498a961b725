//! Error reporting sinks

use helpers_error::{Error, Report};
use helpers_log::Logger;

/// Receives the errors and panics a [`Recovery`](crate::Recovery) decides to
/// report. Implementations forward them to an error-tracking service.
pub trait Reporter: Send + Sync {
    fn capture_error(&self, err: &Error);
    fn capture_panic(&self, message: &str);
}

/// Reports through a [`Logger`], one ERROR entry per capture with the error
/// snapshot under `report`.
#[derive(Debug, Clone)]
pub struct LogReporter {
    logger: Logger,
}

impl LogReporter {
    pub fn new(logger: Logger) -> Self {
        Self { logger }
    }
}

impl Reporter for LogReporter {
    fn capture_error(&self, err: &Error) {
        let report = serde_json::to_string(&Report::new(err)).unwrap_or_default();
        self.logger.in_scope(|| {
            tracing::error!(code = %err.code(), report = %report, "captured error: {}", err)
        });
    }

    fn capture_panic(&self, message: &str) {
        self.logger
            .in_scope(|| tracing::error!(panic = %message, "captured panic"));
    }
}

/// The text of a panic payload.
pub fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "(non-string panic)".to_string()
    }
}
