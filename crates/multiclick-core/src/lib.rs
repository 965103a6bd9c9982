//! multiclick-core: click sequence domain + scheduling primitives.
//!
//! Design goal: keep this crate UI-agnostic and platform-agnostic.
//! Pointer I/O (injection, capture sources, probing) lives in
//! `multiclick-platform`; everything here talks to it through the
//! `PointerDriver` and `PointPicker` traits.

mod capture;
mod driver;
mod engine;
mod points;
mod session;

pub use capture::{
    CaptureError, CaptureLatch, CaptureSource, PointPicker, PointerButton, PointerEvent,
};
pub use driver::{BackendError, PointerDriver};
pub use engine::StopSignal;
pub use points::PointList;
pub use session::{Direction, RunState, Session, SessionEvent, StartError};

use serde::{Deserialize, Serialize};
use std::fmt;

/// An absolute screen coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.x, self.y)
    }
}

/// Button clicked at each point of a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClickButton {
    Primary,
    Middle,
    Secondary,
}

impl Default for ClickButton {
    fn default() -> Self {
        Self::Primary
    }
}

/// Settings for one playback run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Button clicked at every point.
    pub button: ClickButton,
    /// Sleep after each point action, in milliseconds.
    pub interval_ms: u64,
    /// Delay before the first cycle, in milliseconds.
    pub start_delay_ms: u64,
    /// Number of cycles; 0 repeats until stopped.
    pub repeat: u32,
    /// Move the pointer back to its pre-pass position after each cycle.
    pub restore_pointer: bool,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            button: ClickButton::Primary,
            interval_ms: 200,
            start_delay_ms: 0,
            repeat: 0,
            restore_pointer: true,
        }
    }
}
