//! Call-stack capture
//!
//! A [`CapturedStack`] is taken whenever an error is created or wrapped. The
//! raw instruction pointers are recorded eagerly; symbol resolution is
//! deferred until the stack is first rendered and then cached.

use serde::Serialize;
use std::fmt;
use std::panic::Location;
use std::sync::OnceLock;

/// Used when a frame's function or file cannot be determined.
const UNKNOWN: &str = "unknown";

/// Leading frames in these modules belong to stack capture or to the
/// constructors and wrappers that call it.
const CAPTURE_MODULES: [&str; 4] = [
    "backtrace::",
    "helpers_error::stack::",
    "helpers_error::error::",
    "helpers_error::ext::",
];

/// The free functions in the crate root that create or wrap errors.
const CAPTURE_FUNCTIONS: [&str; 3] = [
    "helpers_error::new",
    "helpers_error::wrap",
    "helpers_error::add_stack",
];

/// A single resolved call-site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Frame {
    pub function: String,
    pub file: String,
    pub line: u32,
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\n\t{}:{}", self.function, self.file, self.line)
    }
}

/// An immutable call-stack captured at an error's creation or wrap point.
pub struct CapturedStack {
    location: &'static Location<'static>,
    raw: backtrace::Backtrace,
    frames: OnceLock<Vec<Frame>>,
}

impl CapturedStack {
    /// Capture the current stack. The caller location is the first
    /// non-`#[track_caller]` function up the chain.
    #[track_caller]
    #[inline(never)]
    pub fn capture() -> Self {
        Self {
            location: Location::caller(),
            raw: backtrace::Backtrace::new_unresolved(),
            frames: OnceLock::new(),
        }
    }

    /// Where the error was created or wrapped.
    pub fn location(&self) -> &'static Location<'static> {
        self.location
    }

    /// The frames of this stack, innermost first.
    pub fn frames(&self) -> &[Frame] {
        self.frames.get_or_init(|| resolve(&self.raw))
    }
}

fn resolve(raw: &backtrace::Backtrace) -> Vec<Frame> {
    let mut resolved = raw.clone();
    resolved.resolve();

    let frames = resolved.frames().iter().flat_map(|frame| {
        frame.symbols().iter().map(|symbol| Frame {
            function: symbol
                .name()
                .map(|name| format!("{:#}", name))
                .unwrap_or_else(|| UNKNOWN.to_string()),
            file: symbol
                .filename()
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| UNKNOWN.to_string()),
            line: symbol.lineno().unwrap_or(0),
        })
    });

    frames
        .skip_while(|frame| is_capture_frame(&frame.function))
        .collect()
}

/// Whether `function` is part of capturing a stack rather than the code that
/// created or wrapped the error. Trait impls render as `<Type as Trait>::f`,
/// so module paths are matched anywhere in the name.
fn is_capture_frame(function: &str) -> bool {
    if function.contains("::tests::") {
        return false;
    }
    CAPTURE_MODULES.iter().any(|module| function.contains(module))
        || CAPTURE_FUNCTIONS.iter().any(|name| {
            function
                .strip_prefix(name)
                .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
        })
}

impl fmt::Display for CapturedStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let frames = self.frames();
        if frames.is_empty() {
            // no symbols available, the caller location is all we know
            return write!(f, "\n{}:{}", self.location.file(), self.location.line());
        }
        for frame in frames {
            write!(f, "\n{}", frame)?;
        }
        Ok(())
    }
}

impl fmt::Debug for CapturedStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapturedStack")
            .field("location", &self.location)
            .field("frames", &self.frames().len())
            .finish()
    }
}
