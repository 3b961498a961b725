//! Rendering errors into gRPC statuses
//!
//! Only the root cause is visible on the wire: wrap messages and stacks are
//! for logs, codes, fields and details are for clients.

use crate::{ErrorCode, ErrorDetail, Field};
use std::error::Error as StdError;
use tonic::Status;
use tonic_types::{
    BadRequest, ErrorDetail as WireDetail, FieldViolation, PreconditionFailure,
    PreconditionViolation, StatusExt,
};

/// Build the status of a root error.
///
/// `fields` is `Some` for the fields-carrying shape; the fields are rendered
/// as a `BadRequest` for `InvalidArgument` and as a `PreconditionFailure` for
/// `FailedPrecondition`. Any other code only carries the detail, if one is
/// attached.
pub(crate) fn root_status(
    code: ErrorCode,
    message: &str,
    detail: Option<&ErrorDetail>,
    fields: Option<&[Field]>,
) -> Status {
    let mut details = Vec::new();

    match (code, fields) {
        (ErrorCode::InvalidArgument, Some(fields)) => {
            let violations: Vec<FieldViolation> = fields
                .iter()
                .map(|f| FieldViolation::new(f.name.clone(), f.description.clone()))
                .collect();
            details.push(WireDetail::BadRequest(BadRequest::new(violations)));
        }
        (ErrorCode::FailedPrecondition, Some(fields)) => {
            let violations: Vec<PreconditionViolation> = fields
                .iter()
                .map(|f| PreconditionViolation::new("", f.name.clone(), f.description.clone()))
                .collect();
            details.push(WireDetail::PreconditionFailure(PreconditionFailure::new(
                violations,
            )));
        }
        _ => {}
    }

    if let Some(detail) = detail {
        details.push(WireDetail::ErrorInfo(detail.to_error_info()));
    }

    if details.is_empty() {
        return Status::new(code.into(), message);
    }

    let expected = details.len();
    let status = Status::with_error_details_vec(code.into(), message, details);

    // Unreachable with tonic-types: the three detail kinds above always
    // decode back. A failure here means a new detail kind was wired wrong.
    match status.check_error_details_vec() {
        Ok(attached) if attached.len() == expected => status,
        Ok(attached) => panic!(
            "unable to attach metadata: {} of {} details attached",
            attached.len(),
            expected
        ),
        Err(err) => panic!("unable to attach metadata: {}", err),
    }
}

/// The status of a foreign error: a carried `Status` is passed through,
/// anything else is `Unknown` with its display string.
pub(crate) fn foreign_status(err: &(dyn StdError + Send + Sync + 'static)) -> Status {
    match err.downcast_ref::<Status>() {
        Some(status) => status.clone(),
        None => Status::unknown(err.to_string()),
    }
}
