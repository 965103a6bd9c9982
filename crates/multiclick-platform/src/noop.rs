//! No-op driver for dry runs and tests.

use multiclick_core::{BackendError, ClickButton, Point, PointerDriver};
use tracing::debug;

/// Driver that logs every action and succeeds without touching the pointer.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopDriver;

impl NoopDriver {
    pub fn new() -> Self {
        Self
    }
}

impl PointerDriver for NoopDriver {
    fn move_to(&self, point: Point) -> Result<(), BackendError> {
        debug!(x = point.x, y = point.y, "noop move");
        Ok(())
    }

    fn click(&self, button: ClickButton) -> Result<(), BackendError> {
        debug!(?button, "noop click");
        Ok(())
    }

    fn pointer_position(&self) -> Result<Point, BackendError> {
        Ok(Point { x: 0, y: 0 })
    }

    fn is_available(&self) -> bool {
        true
    }
}
