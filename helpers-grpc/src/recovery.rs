//! Panic recovery and error reporting around RPC handlers

use crate::reporter::panic_message;
use crate::{RecoveryOptions, Reporter};
use futures_util::FutureExt;
use helpers_error::{pool, Error, Ferror};
use helpers_log::Logger;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tonic::Status;

/// Wraps handler futures: panics are caught and reported, errors matching
/// the report policy are reported, and every error leaves as its wire
/// status.
///
/// ```rust
/// use helpers_error::Error;
/// use helpers_grpc::{LogReporter, Recovery, RecoveryOptions};
/// use helpers_log::Logger;
///
/// # futures_util::FutureExt::now_or_never(async {
/// let logger = Logger::disabled();
/// let recovery = Recovery::new(
///     LogReporter::new(logger.clone()),
///     logger,
///     RecoveryOptions::default(),
/// );
///
/// let status = recovery
///     .unary(async { Err::<(), _>(Error::not_found("account 42")) })
///     .await
///     .unwrap_err();
/// assert_eq!(status.code(), tonic::Code::NotFound);
/// # });
/// ```
#[derive(Clone)]
pub struct Recovery {
    reporter: Arc<dyn Reporter>,
    logger: Logger,
    options: RecoveryOptions,
}

impl Recovery {
    pub fn new(reporter: impl Reporter + 'static, logger: Logger, options: RecoveryOptions) -> Self {
        Self {
            reporter: Arc::new(reporter),
            logger,
            options,
        }
    }

    pub fn options(&self) -> &RecoveryOptions {
        &self.options
    }

    /// Run a unary handler.
    ///
    /// # Panics
    /// Resumes a handler panic after reporting it when `repanic` is set.
    pub async fn unary<F, T>(&self, handler: F) -> Result<T, Status>
    where
        F: Future<Output = helpers_error::Result<T>>,
    {
        match AssertUnwindSafe(handler).catch_unwind().await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => {
                self.observe(&err);
                Err(err.to_status())
            }
            Err(payload) => Err(self.recover(payload)),
        }
    }

    /// Run a streaming handler. Behaves like [`Recovery::unary`].
    pub async fn stream<F>(&self, handler: F) -> Result<(), Status>
    where
        F: Future<Output = helpers_error::Result<()>>,
    {
        self.unary(handler).await
    }

    fn observe(&self, err: &Error) {
        if !self.options.report_on.should_report(err) {
            return;
        }
        if self.options.relog {
            pool::render_verbose(err, |rendered| {
                self.logger.error(format_args!("sentry.relog: {}", rendered))
            });
        }
        self.reporter.capture_error(err);
    }

    fn recover(&self, payload: Box<dyn Any + Send>) -> Status {
        let message = panic_message(&*payload);
        self.reporter.capture_panic(&message);

        if self.options.repanic {
            std::panic::resume_unwind(payload);
        }

        self.logger
            .in_scope(|| tracing::error!(panic = %message, "recovered from handler panic"));
        Status::internal("internal error")
    }
}
