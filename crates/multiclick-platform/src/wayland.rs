//! Wayland backend: drives the pointer through `ydotool`.
//!
//! `ydotool` needs its daemon (`ydotoold`) running; without it every call
//! fails with the tool's own error, which surfaces as a command failure.

use crate::proc::{button_code, run_tool, tool_on_path};
use multiclick_core::{BackendError, ClickButton, Point, PointerDriver};

/// Pointer driver backed by `ydotool`.
#[derive(Debug, Default, Clone, Copy)]
pub struct WaylandDriver;

impl WaylandDriver {
    pub fn new() -> Self {
        Self
    }
}

impl PointerDriver for WaylandDriver {
    fn move_to(&self, point: Point) -> Result<(), BackendError> {
        run_tool(
            "ydotool",
            &[
                "mousemove",
                "--absolute",
                &point.x.to_string(),
                &point.y.to_string(),
            ],
        )
        .map(|_| ())
    }

    fn click(&self, button: ClickButton) -> Result<(), BackendError> {
        run_tool("ydotool", &["click", button_code(button)]).map(|_| ())
    }

    fn pointer_position(&self) -> Result<Point, BackendError> {
        let output = run_tool("ydotool", &["getmouselocation", "--shell"])?;
        parse_shell_location(&output)
    }

    fn is_available(&self) -> bool {
        tool_on_path("ydotool")
    }
}

/// Parse `ydotool getmouselocation --shell` output: one `KEY=value` pair per
/// line, with `X` and `Y` carrying the coordinates.
fn parse_shell_location(output: &str) -> Result<Point, BackendError> {
    let mut x = None;
    let mut y = None;
    for line in output.lines() {
        if let Some((key, value)) = line.trim().split_once('=') {
            match key {
                "X" => x = value.parse().ok(),
                "Y" => y = value.parse().ok(),
                _ => {}
            }
        }
    }
    match (x, y) {
        (Some(x), Some(y)) => Ok(Point { x, y }),
        _ => Err(BackendError::UnexpectedOutput {
            tool: "ydotool",
            output: output.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_shell_location() {
        let point = parse_shell_location("X=512\nY=384\nSCREEN=0\n").unwrap();
        assert_eq!(point, Point { x: 512, y: 384 });
    }

    #[test]
    fn test_parse_shell_location_tolerates_whitespace() {
        let point = parse_shell_location("  X=1\n  Y=2  \n").unwrap();
        assert_eq!(point, Point { x: 1, y: 2 });
    }

    #[test]
    fn test_parse_shell_location_rejects_junk() {
        assert!(parse_shell_location("").is_err());
        assert!(parse_shell_location("X=1").is_err());
        assert!(parse_shell_location("x=1\ny=2").is_err());
    }
}
