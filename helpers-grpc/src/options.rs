//! Recovery options and report policies

use helpers_error::{Error, ErrorCode};

/// Codes reported by [`ReportOn::DefaultCodes`]: the ones that point at a
/// defect on the server rather than at the caller.
pub const DEFAULT_CODES: [ErrorCode; 3] =
    [ErrorCode::Internal, ErrorCode::Unimplemented, ErrorCode::Unknown];

/// Decides whether a handler error is reported.
#[derive(Debug, Clone, Default)]
pub enum ReportOn {
    /// Report [`DEFAULT_CODES`].
    #[default]
    DefaultCodes,

    /// Report every error.
    Always,

    /// Report errors with one of these codes.
    Codes(Vec<ErrorCode>),

    /// Report when the function returns true.
    Custom(fn(&Error) -> bool),
}

impl ReportOn {
    pub fn should_report(&self, err: &Error) -> bool {
        match self {
            ReportOn::DefaultCodes => DEFAULT_CODES.contains(&err.code()),
            ReportOn::Always => true,
            ReportOn::Codes(codes) => codes.contains(&err.code()),
            ReportOn::Custom(report) => report(err),
        }
    }
}

/// How a [`Recovery`](crate::Recovery) behaves.
#[derive(Debug, Clone)]
pub struct RecoveryOptions {
    /// Resume the panic after reporting it. Use this when another panic
    /// handler sits further up.
    pub repanic: bool,

    /// Also log reported errors as `sentry.relog: <verbose error>`.
    pub relog: bool,

    pub report_on: ReportOn,
}

impl Default for RecoveryOptions {
    fn default() -> Self {
        Self {
            repanic: true,
            relog: false,
            report_on: ReportOn::DefaultCodes,
        }
    }
}

impl RecoveryOptions {
    pub fn with_repanic(mut self, repanic: bool) -> Self {
        self.repanic = repanic;
        self
    }

    pub fn with_relog(mut self, relog: bool) -> Self {
        self.relog = relog;
        self
    }

    pub fn with_report_on(mut self, report_on: ReportOn) -> Self {
        self.report_on = report_on;
        self
    }
}
