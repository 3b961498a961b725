//! The error shapes and the `Error` handle

use crate::{status, CapturedStack, ErrorCode, ErrorDetail, Field};
use std::error::Error as StdError;
use std::fmt;

/// Separator after each wrap message.
const SEPARATOR: &str = ": ";

/// Line separator for details and the fields header.
const LINE_SEPARATOR: &str = "\n-  ";

/// Line separator for each field.
const NESTED_LINE_SEPARATOR: &str = "\n\t-  ";

/// Any foreign error that can be carried as the cause of a wrap.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

// =============================================================================
// Capabilities
// =============================================================================

/// An error that exposes a classification code.
pub trait Coded {
    fn code(&self) -> ErrorCode;
}

/// An error that exposes the error it wraps.
pub trait Causer {
    fn cause(&self) -> Option<&(dyn StdError + 'static)>;
}

/// The contract every error shape implements.
///
/// Layers above this crate (RPC interceptors, HTTP handlers, reporters) work
/// against this trait and never against a concrete shape.
pub trait Ferror: StdError + Coded + Send + Sync + 'static {
    /// Every stack captured for this error, oldest first.
    fn stacks(&self) -> Vec<&CapturedStack>;

    /// The RPC status for this error.
    ///
    /// # Panics
    /// Panics if the status library rejects an attached detail. That can only
    /// come from a coding defect, never from runtime data.
    fn to_status(&self) -> tonic::Status;

    /// The display rendering followed by every captured stack.
    fn write_verbose(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        write!(out, "{}", self)?;
        for stack in self.stacks() {
            write!(out, "{}", stack)?;
        }
        Ok(())
    }
}

// =============================================================================
// Fundamental
// =============================================================================

/// A root-cause error: code, message, optional detail and the stack at
/// creation.
pub struct Fundamental {
    code: ErrorCode,
    message: String,
    detail: Option<ErrorDetail>,
    stack: CapturedStack,
}

impl Fundamental {
    #[track_caller]
    fn new(code: ErrorCode, message: String) -> Self {
        Self {
            code,
            message,
            detail: None,
            stack: CapturedStack::capture(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn detail(&self) -> Option<&ErrorDetail> {
        self.detail.as_ref()
    }

    pub fn stack(&self) -> &CapturedStack {
        &self.stack
    }
}

impl Coded for Fundamental {
    fn code(&self) -> ErrorCode {
        self.code
    }
}

impl Ferror for Fundamental {
    fn stacks(&self) -> Vec<&CapturedStack> {
        vec![&self.stack]
    }

    fn to_status(&self) -> tonic::Status {
        status::root_status(self.code, &self.message, self.detail.as_ref(), None)
    }
}

impl fmt::Display for Fundamental {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}) {}", self.code, self.message)?;
        if let Some(detail) = &self.detail {
            write!(f, "{}{}", LINE_SEPARATOR, detail)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Fundamental {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_verbose(f)
    }
}

impl StdError for Fundamental {}

// =============================================================================
// WithFields
// =============================================================================

/// A root-cause error carrying the fields that caused it, for validation
/// style failures with several violations.
pub struct WithFields {
    base: Fundamental,
    fields: Vec<Field>,
}

impl WithFields {
    pub fn message(&self) -> &str {
        &self.base.message
    }

    pub fn detail(&self) -> Option<&ErrorDetail> {
        self.base.detail.as_ref()
    }

    /// The violations, in the order they were supplied.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn stack(&self) -> &CapturedStack {
        &self.base.stack
    }
}

impl Coded for WithFields {
    fn code(&self) -> ErrorCode {
        self.base.code
    }
}

impl Ferror for WithFields {
    fn stacks(&self) -> Vec<&CapturedStack> {
        vec![&self.base.stack]
    }

    fn to_status(&self) -> tonic::Status {
        status::root_status(
            self.base.code,
            &self.base.message,
            self.base.detail.as_ref(),
            Some(&self.fields),
        )
    }
}

impl fmt::Display for WithFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base)?;

        if !self.fields.is_empty() {
            write!(f, "{}error fields:", LINE_SEPARATOR)?;
        }

        for field in &self.fields {
            write!(
                f,
                "{}{}{}{}",
                NESTED_LINE_SEPARATOR, field.name, SEPARATOR, field.description
            )?;
        }

        Ok(())
    }
}

impl fmt::Debug for WithFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_verbose(f)
    }
}

impl StdError for WithFields {}

// =============================================================================
// Wrapped
// =============================================================================

enum Cause {
    Fundamental(Box<Fundamental>),
    WithFields(Box<WithFields>),
    Foreign(BoxError),
}

impl Cause {
    fn as_error(&self) -> &(dyn StdError + 'static) {
        match self {
            Cause::Fundamental(f) => f.as_ref(),
            Cause::WithFields(w) => w.as_ref(),
            Cause::Foreign(e) => e.as_ref(),
        }
    }
}

/// Context messages and stacks added on top of an existing error.
///
/// A wrap never changes the code or fields of its cause. Wrapping a value
/// that is already wrapped accumulates onto it instead of nesting.
pub struct Wrapped {
    cause: Cause,
    messages: Vec<String>,
    stacks: Vec<CapturedStack>,
}

impl Wrapped {
    fn new(cause: Cause) -> Self {
        Self {
            cause,
            messages: Vec::new(),
            stacks: Vec::new(),
        }
    }

    /// The context messages, oldest first.
    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    /// The stacks captured at each wrap point, oldest first.
    pub fn wrap_stacks(&self) -> &[CapturedStack] {
        &self.stacks
    }
}

impl Coded for Wrapped {
    fn code(&self) -> ErrorCode {
        match &self.cause {
            Cause::Fundamental(f) => f.code(),
            Cause::WithFields(w) => w.code(),
            Cause::Foreign(_) => ErrorCode::Unknown,
        }
    }
}

impl Causer for Wrapped {
    fn cause(&self) -> Option<&(dyn StdError + 'static)> {
        Some(self.cause.as_error())
    }
}

impl Ferror for Wrapped {
    fn stacks(&self) -> Vec<&CapturedStack> {
        let mut stacks = match &self.cause {
            Cause::Fundamental(f) => f.stacks(),
            Cause::WithFields(w) => w.stacks(),
            Cause::Foreign(_) => Vec::new(),
        };
        stacks.extend(self.stacks.iter());
        stacks
    }

    fn to_status(&self) -> tonic::Status {
        match &self.cause {
            Cause::Fundamental(f) => f.to_status(),
            Cause::WithFields(w) => w.to_status(),
            Cause::Foreign(e) => status::foreign_status(e.as_ref()),
        }
    }
}

impl fmt::Display for Wrapped {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for message in &self.messages {
            write!(f, "{}{}", message, SEPARATOR)?;
        }
        write!(f, "{}", self.cause.as_error())
    }
}

impl fmt::Debug for Wrapped {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_verbose(f)
    }
}

impl StdError for Wrapped {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(self.cause.as_error())
    }
}

// =============================================================================
// Error handle
// =============================================================================

/// The error type returned by every helpers crate.
///
/// An `Error` holds exactly one shape: a [`Fundamental`], a [`WithFields`]
/// or a [`Wrapped`]. Constructors produce the root shapes; [`Error::wrap`]
/// and [`Error::add_stack`] produce or extend a `Wrapped`.
///
/// # Example
///
/// ```rust
/// use helpers_error::{Error, ErrorCode, Field};
///
/// let err = Error::invalid_argument("bad signup", vec![Field::new("email", "required")])
///     .wrap("create account");
///
/// assert_eq!(err.code(), ErrorCode::InvalidArgument);
/// assert!(err.to_string().starts_with("create account: (InvalidArgument) bad signup"));
/// ```
pub struct Error {
    repr: Repr,
}

enum Repr {
    Fundamental(Box<Fundamental>),
    WithFields(Box<WithFields>),
    Wrapped(Box<Wrapped>),
}

/// A borrowed view of the shape held by an [`Error`].
#[derive(Debug, Clone, Copy)]
pub enum Shape<'a> {
    Fundamental(&'a Fundamental),
    WithFields(&'a WithFields),
    Wrapped(&'a Wrapped),
}

impl Error {
    /// Create an `Unknown` error with the given message
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        Self::with_code(ErrorCode::Unknown, message, None)
    }

    /// Create an error with the given code and an optional detail
    #[track_caller]
    pub fn with_code(
        code: ErrorCode,
        message: impl Into<String>,
        detail: Option<ErrorDetail>,
    ) -> Self {
        let mut fundamental = Fundamental::new(code, message.into());
        fundamental.detail = detail;
        Self {
            repr: Repr::Fundamental(Box::new(fundamental)),
        }
    }

    /// Create an error carrying the fields that caused it
    #[track_caller]
    pub fn with_fields(
        code: ErrorCode,
        message: impl Into<String>,
        fields: impl IntoIterator<Item = Field>,
    ) -> Self {
        Self {
            repr: Repr::WithFields(Box::new(WithFields {
                base: Fundamental::new(code, message.into()),
                fields: fields.into_iter().collect(),
            })),
        }
    }

    /// Attach a detail, replacing any previous one.
    ///
    /// On a wrapped error the detail goes to the root cause, since that is
    /// what the wire status is built from. A foreign root has no detail slot
    /// and the error is returned unchanged.
    pub fn with_detail(mut self, detail: ErrorDetail) -> Self {
        match &mut self.repr {
            Repr::Fundamental(f) => f.detail = Some(detail),
            Repr::WithFields(w) => w.base.detail = Some(detail),
            Repr::Wrapped(w) => match &mut w.cause {
                Cause::Fundamental(f) => f.detail = Some(detail),
                Cause::WithFields(w) => w.base.detail = Some(detail),
                Cause::Foreign(_) => {}
            },
        }
        self
    }

    // =========================================================================
    // Wrapping
    // =========================================================================

    /// Add a context message and a stack.
    #[track_caller]
    pub fn wrap(self, message: impl Into<String>) -> Self {
        let mut wrapped = self.into_wrapped();
        wrapped.messages.push(message.into());
        wrapped.stacks.push(CapturedStack::capture());
        Self {
            repr: Repr::Wrapped(wrapped),
        }
    }

    /// Add a stack without a message.
    #[track_caller]
    pub fn add_stack(self) -> Self {
        let mut wrapped = self.into_wrapped();
        wrapped.stacks.push(CapturedStack::capture());
        Self {
            repr: Repr::Wrapped(wrapped),
        }
    }

    /// Carry a foreign error, recording a stack.
    ///
    /// A boxed `Error` is recognised and accumulated onto rather than
    /// nested.
    #[track_caller]
    pub fn from_std(err: impl Into<BoxError>) -> Self {
        let boxed: BoxError = err.into();
        match boxed.downcast::<Error>() {
            Ok(err) => (*err).add_stack(),
            Err(foreign) => Self {
                repr: Repr::Wrapped(Box::new(Wrapped {
                    cause: Cause::Foreign(foreign),
                    messages: Vec::new(),
                    stacks: vec![CapturedStack::capture()],
                })),
            },
        }
    }

    /// Carry a foreign error with a context message.
    #[track_caller]
    pub fn wrap_std(err: impl Into<BoxError>, message: impl Into<String>) -> Self {
        let boxed: BoxError = err.into();
        match boxed.downcast::<Error>() {
            Ok(err) => (*err).wrap(message),
            Err(foreign) => Self {
                repr: Repr::Wrapped(Box::new(Wrapped {
                    cause: Cause::Foreign(foreign),
                    messages: vec![message.into()],
                    stacks: vec![CapturedStack::capture()],
                })),
            },
        }
    }

    fn into_wrapped(self) -> Box<Wrapped> {
        match self.repr {
            Repr::Wrapped(w) => w,
            Repr::Fundamental(f) => Box::new(Wrapped::new(Cause::Fundamental(f))),
            Repr::WithFields(w) => Box::new(Wrapped::new(Cause::WithFields(w))),
        }
    }

    // =========================================================================
    // Getters
    // =========================================================================

    /// The classification of this error. Wraps report their cause's code.
    pub fn code(&self) -> ErrorCode {
        Coded::code(self)
    }

    /// The shape this error holds.
    pub fn shape(&self) -> Shape<'_> {
        match &self.repr {
            Repr::Fundamental(f) => Shape::Fundamental(f),
            Repr::WithFields(w) => Shape::WithFields(w),
            Repr::Wrapped(w) => Shape::Wrapped(w),
        }
    }

    /// The message given at the root cause, without wrap context.
    ///
    /// A foreign root reports its display string.
    pub fn root_message(&self) -> String {
        match &self.repr {
            Repr::Fundamental(f) => f.message.clone(),
            Repr::WithFields(w) => w.base.message.clone(),
            Repr::Wrapped(w) => match &w.cause {
                Cause::Fundamental(f) => f.message.clone(),
                Cause::WithFields(w) => w.base.message.clone(),
                Cause::Foreign(e) => e.to_string(),
            },
        }
    }

    /// The detail attached to the root cause, if any.
    pub fn detail(&self) -> Option<&ErrorDetail> {
        match &self.repr {
            Repr::Fundamental(f) => f.detail(),
            Repr::WithFields(w) => w.detail(),
            Repr::Wrapped(w) => match &w.cause {
                Cause::Fundamental(f) => f.detail(),
                Cause::WithFields(w) => w.detail(),
                Cause::Foreign(_) => None,
            },
        }
    }

    /// The fields of the root cause. Empty unless the root carries fields.
    pub fn fields(&self) -> &[Field] {
        match &self.repr {
            Repr::WithFields(w) => w.fields(),
            Repr::Wrapped(w) => match &w.cause {
                Cause::WithFields(w) => w.fields(),
                _ => &[],
            },
            Repr::Fundamental(_) => &[],
        }
    }

    fn as_ferror(&self) -> &dyn Ferror {
        match &self.repr {
            Repr::Fundamental(f) => f.as_ref(),
            Repr::WithFields(w) => w.as_ref(),
            Repr::Wrapped(w) => w.as_ref(),
        }
    }
}

impl Coded for Error {
    fn code(&self) -> ErrorCode {
        self.as_ferror().code()
    }
}

/// The handle is transparent: its cause is the shape it holds, or for a wrap
/// the wrapped cause. Unwrapping therefore always lands on a root shape or a
/// foreign error.
impl Causer for Error {
    fn cause(&self) -> Option<&(dyn StdError + 'static)> {
        match &self.repr {
            Repr::Fundamental(f) => Some(f.as_ref()),
            Repr::WithFields(w) => Some(w.as_ref()),
            Repr::Wrapped(w) => Causer::cause(w.as_ref()),
        }
    }
}

impl Ferror for Error {
    fn stacks(&self) -> Vec<&CapturedStack> {
        self.as_ferror().stacks()
    }

    fn to_status(&self) -> tonic::Status {
        self.as_ferror().to_status()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.as_ferror(), f)
    }
}

/// Verbose: the display rendering followed by every captured stack.
impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_verbose(f)
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match &self.repr {
            Repr::Wrapped(w) => w.source(),
            _ => None,
        }
    }
}

impl From<Error> for tonic::Status {
    fn from(err: Error) -> Self {
        err.to_status()
    }
}

// =============================================================================
// Convenient From implementations
// =============================================================================

impl From<std::io::Error> for Error {
    #[track_caller]
    fn from(err: std::io::Error) -> Self {
        let code = match err.kind() {
            std::io::ErrorKind::NotFound => ErrorCode::NotFound,
            std::io::ErrorKind::PermissionDenied => ErrorCode::PermissionDenied,
            std::io::ErrorKind::AlreadyExists => ErrorCode::AlreadyExists,
            std::io::ErrorKind::InvalidInput | std::io::ErrorKind::InvalidData => {
                ErrorCode::InvalidArgument
            }
            std::io::ErrorKind::TimedOut | std::io::ErrorKind::ConnectionRefused => {
                ErrorCode::Unavailable
            }
            _ => ErrorCode::Internal,
        };
        Error::with_code(code, err.to_string(), None)
    }
}

// =============================================================================
// Convenience constructors
// =============================================================================

impl Error {
    /// Create an InvalidArgument error with the offending fields
    #[track_caller]
    pub fn invalid_argument(
        message: impl Into<String>,
        fields: impl IntoIterator<Item = Field>,
    ) -> Self {
        Self::with_fields(ErrorCode::InvalidArgument, message, fields)
    }

    /// Create an AlreadyExists error with the conflicting fields
    #[track_caller]
    pub fn already_exists(
        message: impl Into<String>,
        fields: impl IntoIterator<Item = Field>,
    ) -> Self {
        Self::with_fields(ErrorCode::AlreadyExists, message, fields)
    }

    /// Create an OutOfRange error with the offending fields
    #[track_caller]
    pub fn out_of_range(
        message: impl Into<String>,
        fields: impl IntoIterator<Item = Field>,
    ) -> Self {
        Self::with_fields(ErrorCode::OutOfRange, message, fields)
    }

    /// Create a FailedPrecondition error; each field is a violated subject
    #[track_caller]
    pub fn failed_precondition(
        message: impl Into<String>,
        fields: impl IntoIterator<Item = Field>,
    ) -> Self {
        Self::with_fields(ErrorCode::FailedPrecondition, message, fields)
    }

    /// Create a PermissionDenied error
    #[track_caller]
    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::with_code(ErrorCode::PermissionDenied, message, None)
    }

    /// Create an Unauthenticated error
    #[track_caller]
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::with_code(ErrorCode::Unauthenticated, message, None)
    }

    /// Create a NotFound error
    #[track_caller]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::with_code(ErrorCode::NotFound, message, None)
    }

    /// Create an Internal error
    #[track_caller]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::with_code(ErrorCode::Internal, message, None)
    }

    /// Create an Unimplemented error
    #[track_caller]
    pub fn unimplemented(message: impl Into<String>) -> Self {
        Self::with_code(ErrorCode::Unimplemented, message, None)
    }

    /// Create an Unavailable error
    #[track_caller]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::with_code(ErrorCode::Unavailable, message, None)
    }
}
