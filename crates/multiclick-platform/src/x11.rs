//! X11 backend: drives the pointer through `xdotool`.

use crate::proc::{button_code, run_tool};
use multiclick_core::{BackendError, ClickButton, Point, PointerDriver};

/// Pointer driver backed by `xdotool`. Stateless; every call is one child
/// process.
#[derive(Debug, Default, Clone, Copy)]
pub struct X11Driver;

impl X11Driver {
    pub fn new() -> Self {
        Self
    }
}

impl PointerDriver for X11Driver {
    fn move_to(&self, point: Point) -> Result<(), BackendError> {
        run_tool(
            "xdotool",
            &[
                "mousemove",
                "--sync",
                &point.x.to_string(),
                &point.y.to_string(),
            ],
        )
        .map(|_| ())
    }

    fn click(&self, button: ClickButton) -> Result<(), BackendError> {
        run_tool("xdotool", &["click", button_code(button)]).map(|_| ())
    }

    fn pointer_position(&self) -> Result<Point, BackendError> {
        let output = run_tool("xdotool", &["getmouselocation"])?;
        parse_mouse_location(&output)
    }

    fn is_available(&self) -> bool {
        run_tool("xdotool", &["--version"]).is_ok()
    }
}

/// Parse `xdotool getmouselocation` output, e.g.
/// `x:512 y:384 screen:0 window:77594631`.
fn parse_mouse_location(output: &str) -> Result<Point, BackendError> {
    let mut x = None;
    let mut y = None;
    for part in output.split_whitespace() {
        if let Some((key, value)) = part.split_once(':') {
            match key {
                "x" => x = value.parse().ok(),
                "y" => y = value.parse().ok(),
                _ => {}
            }
        }
    }
    match (x, y) {
        (Some(x), Some(y)) => Ok(Point { x, y }),
        _ => Err(BackendError::UnexpectedOutput {
            tool: "xdotool",
            output: output.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mouse_location() {
        let point = parse_mouse_location("x:512 y:384 screen:0 window:77594631").unwrap();
        assert_eq!(point, Point { x: 512, y: 384 });
    }

    #[test]
    fn test_parse_mouse_location_key_order_does_not_matter() {
        let point = parse_mouse_location("screen:0 y:10 x:20 window:1").unwrap();
        assert_eq!(point, Point { x: 20, y: 10 });
    }

    #[test]
    fn test_parse_mouse_location_rejects_junk() {
        assert!(parse_mouse_location("").is_err());
        assert!(parse_mouse_location("no coordinates here").is_err());
        assert!(parse_mouse_location("x:12 screen:0").is_err());
        assert!(parse_mouse_location("x:twelve y:ten").is_err());
    }
}
