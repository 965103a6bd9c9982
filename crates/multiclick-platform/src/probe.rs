//! Display server detection and tool availability.

use crate::proc::tool_on_path;
use serde::Serialize;
use std::fmt;

/// Which display server the session runs under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayServer {
    X11,
    Wayland,
}

impl fmt::Display for DisplayServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayServer::X11 => write!(f, "x11"),
            DisplayServer::Wayland => write!(f, "wayland"),
        }
    }
}

/// Tools a backend needs on PATH.
pub fn required_tools(server: DisplayServer) -> &'static [&'static str] {
    match server {
        DisplayServer::X11 => &["xdotool"],
        DisplayServer::Wayland => &["ydotool", "slurp"],
    }
}

/// Which of the backend's required tools are missing from PATH.
pub fn missing_tools(server: DisplayServer) -> Vec<&'static str> {
    required_tools(server)
        .iter()
        .copied()
        .filter(|tool| !tool_on_path(tool))
        .collect()
}

/// Detect the display server from the session environment.
pub fn detect_display_server() -> Option<DisplayServer> {
    detect_from(
        std::env::var("XDG_SESSION_TYPE").ok().as_deref(),
        std::env::var("WAYLAND_DISPLAY").ok().as_deref(),
        std::env::var("DISPLAY").ok().as_deref(),
    )
}

/// Wayland wins when both look plausible: an XWayland session usually sets
/// DISPLAY as well.
fn detect_from(
    session_type: Option<&str>,
    wayland_display: Option<&str>,
    x11_display: Option<&str>,
) -> Option<DisplayServer> {
    if session_type == Some("wayland") || wayland_display.map_or(false, |v| !v.is_empty()) {
        return Some(DisplayServer::Wayland);
    }
    if session_type == Some("x11") || x11_display.map_or(false, |v| !v.is_empty()) {
        return Some(DisplayServer::X11);
    }
    None
}

/// Availability of one required tool.
#[derive(Debug, Clone, Serialize)]
pub struct ToolStatus {
    pub name: &'static str,
    pub found: bool,
}

/// Summary of what the environment supports, for the check command.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeReport {
    pub display_server: Option<DisplayServer>,
    pub tools: Vec<ToolStatus>,
}

/// Probe the environment: the detected server plus tool availability for it.
/// With no detected server, both backends' tools are listed.
pub fn probe() -> ProbeReport {
    let display_server = detect_display_server();
    let servers: &[DisplayServer] = match display_server {
        Some(DisplayServer::X11) => &[DisplayServer::X11],
        Some(DisplayServer::Wayland) => &[DisplayServer::Wayland],
        None => &[DisplayServer::X11, DisplayServer::Wayland],
    };

    let mut tools = Vec::new();
    for &server in servers {
        for &tool in required_tools(server) {
            tools.push(ToolStatus {
                name: tool,
                found: tool_on_path(tool),
            });
        }
    }
    ProbeReport {
        display_server,
        tools,
    }
}
