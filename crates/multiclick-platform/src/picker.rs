//! One-shot point capture for Wayland via `slurp`.

use multiclick_core::{CaptureError, Point, PointPicker};
use std::io::ErrorKind;
use std::process::Command;
use tracing::debug;

/// Blocking picker: `slurp -p` waits for one click and prints the position.
#[derive(Debug, Default, Clone, Copy)]
pub struct SlurpPicker;

impl SlurpPicker {
    pub fn new() -> Self {
        Self
    }
}

impl PointPicker for SlurpPicker {
    fn pick(&self) -> Result<Point, CaptureError> {
        debug!("starting slurp point selection");
        let output = Command::new("slurp")
            .args(["-p", "-f", "%x %y"])
            .output()
            .map_err(|e| {
                if e.kind() == ErrorKind::NotFound {
                    CaptureError::ToolMissing { tool: "slurp" }
                } else {
                    CaptureError::ToolFailed {
                        tool: "slurp",
                        detail: e.to_string(),
                    }
                }
            })?;

        // slurp exits non-zero when the selection is dismissed (Escape).
        if !output.status.success() {
            return Err(CaptureError::Cancelled);
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_slurp_point(&stdout)
    }
}

/// Parse `slurp -f "%x %y"` output. Coordinates may print as floats; they
/// truncate to integers.
fn parse_slurp_point(output: &str) -> Result<Point, CaptureError> {
    let trimmed = output.trim();
    if trimmed.is_empty() {
        return Err(CaptureError::NoPoint);
    }
    let mut parts = trimmed.split_whitespace();
    let x = parts.next().and_then(parse_coord);
    let y = parts.next().and_then(parse_coord);
    match (x, y) {
        (Some(x), Some(y)) => Ok(Point { x, y }),
        _ => Err(CaptureError::InvalidOutput(trimmed.to_string())),
    }
}

fn parse_coord(raw: &str) -> Option<i32> {
    raw.parse::<f64>().ok().map(|value| value as i32)
}
