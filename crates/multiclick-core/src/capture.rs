//! Point capture: a single-shot armed latch fed by one of two source shapes.

use crate::Point;
use crossbeam_channel::Receiver;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Pointer button as seen by capture sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointerButton {
    Primary,
    Middle,
    Secondary,
    /// Extra buttons we don't map.
    Other,
}

/// A pointer event from a global listener, position already stamped on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PointerEvent {
    pub x: i32,
    pub y: i32,
    pub button: PointerButton,
    /// true for press, false for release.
    pub pressed: bool,
}

/// Errors from a capture attempt.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("`{tool}` is not installed or not on PATH")]
    ToolMissing { tool: &'static str },
    #[error("failed to run `{tool}`: {detail}")]
    ToolFailed { tool: &'static str, detail: String },
    #[error("capture cancelled")]
    Cancelled,
    #[error("no point captured")]
    NoPoint,
    #[error("capture output invalid: {0:?}")]
    InvalidOutput(String),
    #[error("capture source disconnected")]
    SourceClosed,
}

/// A blocking one-shot picker (e.g. slurp): one call, one user selection.
pub trait PointPicker: Send + Sync {
    fn pick(&self) -> Result<Point, CaptureError>;
}

/// Where captured points come from.
pub enum CaptureSource {
    /// Continuous stream of stamped pointer events from a global listener.
    Events(Receiver<PointerEvent>),
    /// Blocking one-shot picker, run on a transient thread per capture.
    Picker(Arc<dyn PointPicker>),
}

/// Single-shot capture latch.
///
/// While armed, the first press of the trigger button is consumed as the
/// captured point and the latch disarms. Releases, other buttons, and any
/// event seen while disarmed are ignored.
#[derive(Debug)]
pub struct CaptureLatch {
    armed: bool,
    trigger: PointerButton,
}

impl Default for CaptureLatch {
    fn default() -> Self {
        Self::new(PointerButton::Primary)
    }
}

impl CaptureLatch {
    pub fn new(trigger: PointerButton) -> Self {
        Self {
            armed: false,
            trigger,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Arm the latch. Returns false when it was already armed.
    pub fn arm(&mut self) -> bool {
        if self.armed {
            return false;
        }
        self.armed = true;
        debug!("capture latch armed");
        true
    }

    /// Feed one event from the stream shape. A qualifying press consumes the
    /// event, disarms the latch, and yields the point.
    pub fn observe(&mut self, event: &PointerEvent) -> Option<Point> {
        if !self.armed || !event.pressed || event.button != self.trigger {
            return None;
        }
        self.armed = false;
        debug!(x = event.x, y = event.y, "capture latch consumed press");
        Some(Point {
            x: event.x,
            y: event.y,
        })
    }

    /// Settle the latch with a one-shot result (picker outcome or source
    /// failure). Both success and failure disarm; results arriving after the
    /// latch was already disarmed are dropped.
    pub fn settle(
        &mut self,
        result: Result<Point, CaptureError>,
    ) -> Option<Result<Point, CaptureError>> {
        if !self.armed {
            return None;
        }
        self.armed = false;
        Some(result)
    }
}
