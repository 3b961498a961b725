//! # helpers-error
//!
//! Coded, stack-carrying errors for services that speak gRPC.
//!
//! ## Design Philosophy
//!
//! - **ErrorCode**: Classify the failure with a canonical gRPC code
//! - **Shapes**: A root cause is a `Fundamental` or a `WithFields`; context
//!   added on the way up is a `Wrapped` that never changes the root's code
//! - **Stacks**: Every creation and wrap point records a call-stack
//! - **Wire status**: Only the root travels to clients, as a `tonic::Status`
//!   with `BadRequest`, `PreconditionFailure` and `ErrorInfo` details
//!
//! ## Usage
//!
//! ```rust
//! use helpers_error::{Error, ErrorCode, Ferror, Field, ResultExt};
//!
//! fn validate(email: &str) -> helpers_error::Result<()> {
//!     if email.is_empty() {
//!         return Err(Error::invalid_argument(
//!             "invalid signup",
//!             vec![Field::new("email", "required")],
//!         ));
//!     }
//!     Ok(())
//! }
//!
//! let err = validate("").wrap_err("create account").unwrap_err();
//! assert_eq!(err.code(), ErrorCode::InvalidArgument);
//! assert_eq!(err.to_status().message(), "invalid signup");
//! ```
//!
//! ## Principles
//!
//! - All functions return `Result<T, helpers_error::Error>`
//! - Wrap with context instead of creating a new error for the same failure
//! - `{}` renders messages, fields and detail; `{:?}` adds every stack

mod code;
mod detail;
mod error;
mod ext;
pub mod pool;
mod report;
mod stack;
mod status;

pub use code::ErrorCode;
pub use detail::{ErrorDetail, Field};
pub use error::{BoxError, Causer, Coded, Error, Ferror, Fundamental, Shape, WithFields, Wrapped};
pub use ext::ResultExt;
pub use report::Report;
pub use stack::{CapturedStack, Frame};

use std::error::Error as StdError;

/// Result type alias using the helpers Error
pub type Result<T> = std::result::Result<T, Error>;

// =============================================================================
// Free functions
// =============================================================================

/// Create an `Unknown` error
#[track_caller]
pub fn new(message: impl Into<String>) -> Error {
    Error::new(message)
}

/// Wrap an optional error with a context message. `None` stays `None`.
#[track_caller]
pub fn wrap<E: Into<BoxError>>(err: Option<E>, message: impl Into<String>) -> Option<Error> {
    match err {
        Some(err) => Some(Error::wrap_std(err, message)),
        None => None,
    }
}

/// Record a stack on an optional error. `None` stays `None`.
#[track_caller]
pub fn add_stack<E: Into<BoxError>>(err: Option<E>) -> Option<Error> {
    match err {
        Some(err) => Some(Error::from_std(err)),
        None => None,
    }
}

/// The underlying cause of an error.
///
/// Unwraps every layer that exposes a cause and stops at the first that
/// doesn't: a root shape or a foreign error.
pub fn cause<'a>(
    err: Option<&'a (dyn StdError + 'static)>,
) -> Option<&'a (dyn StdError + 'static)> {
    let mut err = err?;
    loop {
        let next = if let Some(e) = err.downcast_ref::<Error>() {
            Causer::cause(e)
        } else if let Some(w) = err.downcast_ref::<Wrapped>() {
            Causer::cause(w)
        } else {
            return Some(err);
        };

        match next {
            Some(next) => err = next,
            None => return Some(err),
        }
    }
}

/// The code of any error. Errors from outside this crate are `Unknown`.
pub fn code(err: &(dyn StdError + 'static)) -> ErrorCode {
    if let Some(e) = err.downcast_ref::<Error>() {
        e.code()
    } else if let Some(f) = err.downcast_ref::<Fundamental>() {
        f.code()
    } else if let Some(w) = err.downcast_ref::<WithFields>() {
        w.code()
    } else if let Some(w) = err.downcast_ref::<Wrapped>() {
        w.code()
    } else {
        ErrorCode::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(err: &(dyn StdError + 'static)) -> *const () {
        err as *const dyn StdError as *const ()
    }

    #[test]
    fn test_cause_survives_wrap() {
        let err = Error::not_found("x");
        let root = addr(cause(Some(&err)).unwrap());

        let err = err.wrap("a").add_stack().wrap("b");
        let wrapped_root = cause(Some(&err)).unwrap();
        assert_eq!(addr(wrapped_root), root);
        assert!(wrapped_root.downcast_ref::<Fundamental>().is_some());
    }

    #[test]
    fn test_cause_of_fields_root() {
        let err = Error::invalid_argument("bad", vec![Field::new("email", "required")]).wrap("ctx");
        let root = cause(Some(&err)).unwrap();
        let fields = root.downcast_ref::<WithFields>().unwrap();
        assert_eq!(fields.fields()[0].name, "email");
    }

    #[test]
    fn test_cause_of_foreign() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "eof");
        assert_eq!(cause(Some(&io)).unwrap().to_string(), "eof");

        let err = Error::wrap_std(std::io::Error::new(std::io::ErrorKind::Other, "eof"), "read");
        let root = cause(Some(&err)).unwrap();
        assert!(root.downcast_ref::<std::io::Error>().is_some());

        assert!(cause(None).is_none());
    }

    #[test]
    fn test_wrap_nothing_is_nothing() {
        assert!(wrap(None::<Error>, "m").is_none());
        assert!(add_stack(None::<std::io::Error>).is_none());
    }

    #[test]
    fn test_wrap_some() {
        let err = wrap(Some(Error::not_found("x")), "ctx").unwrap();
        assert_eq!(code(&err), ErrorCode::NotFound);
        assert_eq!(err.to_string(), "ctx: (NotFound) x");

        let err = add_stack(Some(std::io::Error::new(std::io::ErrorKind::Other, "eof"))).unwrap();
        assert_eq!(err.to_string(), "eof");
    }

    #[test]
    fn test_code_of_any_error() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "eof");
        assert_eq!(code(&io), ErrorCode::Unknown);

        let err = Error::permission_denied("nope").wrap("ctx");
        assert_eq!(code(&err), ErrorCode::PermissionDenied);
        assert_eq!(code(cause(Some(&err)).unwrap()), ErrorCode::PermissionDenied);

        match err.shape() {
            Shape::Wrapped(w) => assert_eq!(code(w), ErrorCode::PermissionDenied),
            other => panic!("expected a wrap, got {:?}", other),
        }
    }

    #[test]
    fn test_new_is_unknown() {
        let err = new("boom");
        assert_eq!(err.code(), ErrorCode::Unknown);
    }

    #[test]
    fn test_n_wraps() {
        let mut err = Error::internal("x");
        for i in 0..3 {
            err = err.wrap(i.to_string());
        }
        match err.shape() {
            Shape::Wrapped(w) => {
                assert_eq!(w.messages().len(), 3);
                assert_eq!(w.wrap_stacks().len(), 3);
            }
            other => panic!("expected a wrap, got {:?}", other),
        }
    }

    #[test]
    fn test_free_functions_stack_at_caller() {
        let err = wrap(Some(new("boom")), "ctx").unwrap();
        let err = add_stack(Some(err)).unwrap();

        let stacks = err.stacks();
        assert_eq!(stacks.len(), 3);
        for stack in stacks {
            if let Some(first) = stack.frames().first() {
                assert!(
                    first.function.ends_with("test_free_functions_stack_at_caller"),
                    "first frame: {}",
                    first.function
                );
            }
        }
    }
}
