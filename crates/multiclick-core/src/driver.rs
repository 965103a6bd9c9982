//! Backend driver abstraction.
//!
//! Every pointer action runs through a child process tool behind this trait;
//! there is no in-process injection anywhere in the system.

use crate::{ClickButton, Point};
use thiserror::Error;

/// Errors from backend tool invocations.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The tool binary is not installed or not on PATH.
    #[error("`{tool}` is not installed or not on PATH")]
    ToolMissing { tool: &'static str },
    /// The tool could not be spawned.
    #[error("failed to run `{tool}`: {source}")]
    Spawn {
        tool: &'static str,
        #[source]
        source: std::io::Error,
    },
    /// The tool ran but exited unsuccessfully.
    #[error("`{tool}` failed: {detail}")]
    CommandFailed { tool: &'static str, detail: String },
    /// The tool produced output we could not parse.
    #[error("unexpected output from `{tool}`: {output:?}")]
    UnexpectedOutput { tool: &'static str, output: String },
}

/// Capability surface for pointer injection (implemented by
/// multiclick-platform).
pub trait PointerDriver: Send + Sync {
    /// Move the pointer to an absolute position.
    fn move_to(&self, point: Point) -> Result<(), BackendError>;
    /// Click a button at the current pointer position.
    fn click(&self, button: ClickButton) -> Result<(), BackendError>;
    /// Query the current pointer position.
    fn pointer_position(&self) -> Result<Point, BackendError>;
    /// Whether the backing tool is usable right now.
    fn is_available(&self) -> bool;
}
