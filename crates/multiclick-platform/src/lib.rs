//! multiclick-platform: pointer drivers and capture sources for Linux
//! display servers.
//!
//! Everything here shells out to the platform tools (`xdotool`, `ydotool`,
//! `slurp`); there is no direct display-server programming. The listener is
//! the one exception: it reads global input through rdev to stamp capture
//! clicks with a position.

mod listener;
mod noop;
mod picker;
mod probe;
mod proc;
mod wayland;
mod x11;

pub use listener::{start_pointer_listener, PointerListenerHandle};
pub use noop::NoopDriver;
pub use picker::SlurpPicker;
pub use probe::{
    detect_display_server, missing_tools, probe, required_tools, DisplayServer, ProbeReport,
    ToolStatus,
};
pub use wayland::WaylandDriver;
pub use x11::X11Driver;
