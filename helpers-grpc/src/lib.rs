//! # helpers-grpc
//!
//! Panic recovery and error reporting for gRPC handlers.
//!
//! A [`Recovery`] runs each handler future. Handler panics are reported and
//! either resumed or turned into `Internal`. Handler errors are reported when
//! the [`ReportOn`] policy matches (by default `Internal`, `Unimplemented`
//! and `Unknown`) and returned as their `tonic::Status`.

mod options;
mod recovery;
mod reporter;

pub use options::{RecoveryOptions, ReportOn, DEFAULT_CODES};
pub use recovery::Recovery;
pub use reporter::{panic_message, LogReporter, Reporter};
