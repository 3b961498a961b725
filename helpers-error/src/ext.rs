//! Wrapping helpers for `Result` chains

use crate::Error;
use std::error::Error as StdError;

/// Wrap the error side of a `Result`, capturing a stack at the caller.
///
/// `Ok` values pass through untouched. Works for [`Error`] itself (wraps
/// accumulate) and for any foreign error.
pub trait ResultExt<T> {
    /// Add a context message.
    fn wrap_err(self, message: impl Into<String>) -> Result<T, Error>;

    /// Add a context message built only on the error path.
    fn wrap_err_with<M, F>(self, message: F) -> Result<T, Error>
    where
        M: Into<String>,
        F: FnOnce() -> M;

    /// Add a stack without a message.
    fn add_stack(self) -> Result<T, Error>;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
    E: StdError + Send + Sync + 'static,
{
    #[track_caller]
    fn wrap_err(self, message: impl Into<String>) -> Result<T, Error> {
        match self {
            Ok(value) => Ok(value),
            Err(err) => Err(Error::wrap_std(err, message)),
        }
    }

    #[track_caller]
    fn wrap_err_with<M, F>(self, message: F) -> Result<T, Error>
    where
        M: Into<String>,
        F: FnOnce() -> M,
    {
        match self {
            Ok(value) => Ok(value),
            Err(err) => Err(Error::wrap_std(err, message())),
        }
    }

    #[track_caller]
    fn add_stack(self) -> Result<T, Error> {
        match self {
            Ok(value) => Ok(value),
            Err(err) => Err(Error::from_std(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ErrorCode, Ferror, Shape};

    #[test]
    fn test_ok_passes_through() {
        let ok: Result<u32, std::io::Error> = Ok(7);
        assert_eq!(ok.wrap_err("never").unwrap(), 7);

        let mut called = false;
        let ok: Result<u32, Error> = Ok(1);
        let _ = ok.wrap_err_with(|| {
            called = true;
            "never"
        });
        assert!(!called);
    }

    #[test]
    fn test_wrap_own_error_accumulates() {
        let res: Result<(), Error> = Err(Error::not_found("user"));
        let err = res.wrap_err("load").wrap_err("handle").unwrap_err();

        assert_eq!(err.code(), ErrorCode::NotFound);
        assert_eq!(err.to_string(), "load: handle: (NotFound) user");
        match err.shape() {
            Shape::Wrapped(w) => assert_eq!(w.messages().len(), 2),
            other => panic!("expected a wrap, got {:?}", other),
        }
    }

    #[test]
    fn test_wrap_foreign_error() {
        let res: Result<u32, std::num::ParseIntError> = "x".parse::<u32>();
        let err = res.wrap_err_with(|| format!("parse {}", "port")).unwrap_err();

        assert_eq!(err.code(), ErrorCode::Unknown);
        assert!(err.to_string().starts_with("parse port: "));
    }

    #[test]
    fn test_add_stack_location() {
        let res: Result<(), Error> = Err(Error::internal("x"));
        let line = line!() + 1;
        let err = res.add_stack().unwrap_err();

        let stacks = err.stacks();
        assert_eq!(stacks.len(), 2);
        assert_eq!(stacks[1].location().line(), line);
        assert_eq!(err.to_string(), "(Internal) x");
    }

    #[test]
    fn test_stacks_start_at_caller() {
        let io: Result<(), std::io::Error> =
            Err(std::io::Error::new(std::io::ErrorKind::Other, "eof"));
        let err = io.wrap_err_with(|| "read").add_stack().unwrap_err();

        let stacks = err.stacks();
        assert_eq!(stacks.len(), 2);
        for stack in stacks {
            if let Some(first) = stack.frames().first() {
                assert!(
                    first.function.ends_with("test_stacks_start_at_caller"),
                    "first frame: {}",
                    first.function
                );
            }
        }
    }
}
