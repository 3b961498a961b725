//! Error codes shared by every error shape

use crate::Error;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// The classification of a failure.
///
/// Numeric values are the canonical gRPC status codes, so a code crosses the
/// RPC boundary unchanged. Codes compare by equality only; there is no
/// ordering or hierarchy between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u32)]
pub enum ErrorCode {
    /// Unknown error. Default code when nothing more specific is known.
    Unknown = 2,

    /// The client specified an invalid argument, regardless of the state of
    /// the system (e.g., a malformed file name).
    InvalidArgument = 3,

    /// Some requested entity (e.g., file or directory) was not found.
    NotFound = 5,

    /// An attempt to create an entity failed because one already exists.
    AlreadyExists = 6,

    /// The caller does not have permission to execute the operation.
    PermissionDenied = 7,

    /// The operation was rejected because the system is not in a state
    /// required for its execution.
    FailedPrecondition = 9,

    /// The operation was attempted past the valid range.
    ///
    /// Unlike `InvalidArgument`, this may be fixed if the system state
    /// changes (reading past the current end of a file).
    OutOfRange = 11,

    /// The operation is not implemented or not enabled in this service.
    Unimplemented = 12,

    /// Some invariant expected by the underlying system has been broken.
    Internal = 13,

    /// The service is currently unavailable. Most likely transient.
    Unavailable = 14,

    /// The request does not have valid authentication credentials.
    Unauthenticated = 16,
}

impl ErrorCode {
    /// Every code, in numeric order.
    pub const ALL: [ErrorCode; 11] = [
        ErrorCode::Unknown,
        ErrorCode::InvalidArgument,
        ErrorCode::NotFound,
        ErrorCode::AlreadyExists,
        ErrorCode::PermissionDenied,
        ErrorCode::FailedPrecondition,
        ErrorCode::OutOfRange,
        ErrorCode::Unimplemented,
        ErrorCode::Internal,
        ErrorCode::Unavailable,
        ErrorCode::Unauthenticated,
    ];

    /// Returns the code name as a static string
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Unknown => "Unknown",
            ErrorCode::InvalidArgument => "InvalidArgument",
            ErrorCode::NotFound => "NotFound",
            ErrorCode::AlreadyExists => "AlreadyExists",
            ErrorCode::PermissionDenied => "PermissionDenied",
            ErrorCode::FailedPrecondition => "FailedPrecondition",
            ErrorCode::OutOfRange => "OutOfRange",
            ErrorCode::Unimplemented => "Unimplemented",
            ErrorCode::Internal => "Internal",
            ErrorCode::Unavailable => "Unavailable",
            ErrorCode::Unauthenticated => "Unauthenticated",
        }
    }

    /// The numeric gRPC code
    pub fn as_u32(&self) -> u32 {
        *self as u32
    }

    /// Map a gRPC code onto the domain set. Codes outside it become `Unknown`.
    pub fn from_grpc(code: tonic::Code) -> Self {
        match code {
            tonic::Code::InvalidArgument => ErrorCode::InvalidArgument,
            tonic::Code::NotFound => ErrorCode::NotFound,
            tonic::Code::AlreadyExists => ErrorCode::AlreadyExists,
            tonic::Code::PermissionDenied => ErrorCode::PermissionDenied,
            tonic::Code::FailedPrecondition => ErrorCode::FailedPrecondition,
            tonic::Code::OutOfRange => ErrorCode::OutOfRange,
            tonic::Code::Unimplemented => ErrorCode::Unimplemented,
            tonic::Code::Internal => ErrorCode::Internal,
            tonic::Code::Unavailable => ErrorCode::Unavailable,
            tonic::Code::Unauthenticated => ErrorCode::Unauthenticated,
            _ => ErrorCode::Unknown,
        }
    }
}

impl From<ErrorCode> for tonic::Code {
    fn from(code: ErrorCode) -> Self {
        match code {
            ErrorCode::Unknown => tonic::Code::Unknown,
            ErrorCode::InvalidArgument => tonic::Code::InvalidArgument,
            ErrorCode::NotFound => tonic::Code::NotFound,
            ErrorCode::AlreadyExists => tonic::Code::AlreadyExists,
            ErrorCode::PermissionDenied => tonic::Code::PermissionDenied,
            ErrorCode::FailedPrecondition => tonic::Code::FailedPrecondition,
            ErrorCode::OutOfRange => tonic::Code::OutOfRange,
            ErrorCode::Unimplemented => tonic::Code::Unimplemented,
            ErrorCode::Internal => tonic::Code::Internal,
            ErrorCode::Unavailable => tonic::Code::Unavailable,
            ErrorCode::Unauthenticated => tonic::Code::Unauthenticated,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Accepts `NotFound`, `not_found` and `not-found`, ignoring case.
impl FromStr for ErrorCode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_ascii_lowercase();

        ErrorCode::ALL
            .iter()
            .find(|code| code.as_str().to_ascii_lowercase() == wanted)
            .copied()
            .ok_or_else(|| {
                Error::invalid_argument(
                    format!("unknown error code '{}'", s),
                    vec![crate::Field::new("code", "must name a known error code")],
                )
            })
    }
}
