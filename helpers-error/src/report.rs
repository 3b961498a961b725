//! Serializable snapshot of an error, for error reporters and JSON output

use crate::{ErrorCode, Ferror, Frame};
use serde::Serialize;

/// An error flattened into plain data.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub code: ErrorCode,
    /// The display rendering.
    pub message: String,
    /// One entry per captured stack, oldest first.
    pub stacks: Vec<Vec<Frame>>,
}

impl Report {
    pub fn new(err: &dyn Ferror) -> Self {
        Self {
            code: err.code(),
            message: err.to_string(),
            stacks: err
                .stacks()
                .into_iter()
                .map(|stack| stack.frames().to_vec())
                .collect(),
        }
    }
}
