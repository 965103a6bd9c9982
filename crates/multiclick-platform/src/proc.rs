//! Child process plumbing shared by the drivers.

use multiclick_core::{BackendError, ClickButton};
use std::io::ErrorKind;
use std::process::{Command, Stdio};
use tracing::debug;

/// Run a tool with an argument vector, capturing output. Returns trimmed
/// stdout on success.
pub(crate) fn run_tool(tool: &'static str, args: &[&str]) -> Result<String, BackendError> {
    debug!(tool, ?args, "running tool");
    let output = Command::new(tool).args(args).output().map_err(|e| {
        if e.kind() == ErrorKind::NotFound {
            BackendError::ToolMissing { tool }
        } else {
            BackendError::Spawn { tool, source: e }
        }
    })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let detail = match output.status.code() {
            Some(code) => format!("exit {}: {}", code, stderr.trim()),
            None => format!("killed by signal: {}", stderr.trim()),
        };
        return Err(BackendError::CommandFailed { tool, detail });
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Whether a tool resolves on PATH.
pub(crate) fn tool_on_path(tool: &str) -> bool {
    Command::new("which")
        .arg(tool)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

/// Numeric button code understood by both injection tools.
pub(crate) fn button_code(button: ClickButton) -> &'static str {
    match button {
        ClickButton::Primary => "1",
        ClickButton::Middle => "2",
        ClickButton::Secondary => "3",
    }
}
