//! multiclick: point-list auto clicker for X11 and Wayland.

mod console;

use anyhow::{anyhow, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use multiclick_core::{
    CaptureSource, ClickButton, PlaybackConfig, Point, PointerDriver, RunState, Session,
    SessionEvent,
};
use multiclick_platform::{
    detect_display_server, missing_tools, probe, start_pointer_listener, DisplayServer,
    NoopDriver, PointerListenerHandle, SlurpPicker, WaylandDriver, X11Driver,
};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::warn;

#[derive(Parser)]
#[command(name = "multiclick", version, about = "Point-list auto clicker for X11 and Wayland")]
struct Cli {
    /// Backend override; detected from the environment by default.
    #[arg(long, value_enum, default_value = "auto", global = true)]
    backend: BackendArg,
    /// Log actions without driving the pointer.
    #[arg(long, global = true)]
    dry_run: bool,
    /// Emit notifications as JSON lines.
    #[arg(long, global = true)]
    json: bool,
    /// Verbose logging (same as RUST_LOG=debug for the multiclick crates).
    #[arg(long, global = true)]
    debug: bool,
    #[command(subcommand)]
    command: Option<CliCommand>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum BackendArg {
    Auto,
    X11,
    Wayland,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ButtonArg {
    Left,
    Middle,
    Right,
}

impl From<ButtonArg> for ClickButton {
    fn from(arg: ButtonArg) -> Self {
        match arg {
            ButtonArg::Left => ClickButton::Primary,
            ButtonArg::Middle => ClickButton::Middle,
            ButtonArg::Right => ClickButton::Secondary,
        }
    }
}

#[derive(Subcommand)]
enum CliCommand {
    /// Report the detected display server and tool availability.
    Check,
    /// Click through a fixed point list without the interactive console.
    Run(RunArgs),
    /// Interactive console (the default).
    Console,
}

#[derive(Args)]
struct RunArgs {
    /// Point to click, as X,Y. Repeat for more points, in order.
    #[arg(long = "point", value_parser = parse_point, required = true)]
    points: Vec<Point>,
    /// Button to click.
    #[arg(long, value_enum, default_value = "left")]
    button: ButtonArg,
    /// Sleep after each click, in milliseconds.
    #[arg(long, default_value_t = 200)]
    interval_ms: u64,
    /// Delay before the first cycle, in milliseconds.
    #[arg(long, default_value_t = 0)]
    delay_ms: u64,
    /// Number of cycles; 0 repeats until interrupted.
    #[arg(long, default_value_t = 1)]
    repeat: u32,
    /// Leave the pointer wherever the last click put it.
    #[arg(long)]
    no_restore: bool,
}

/// Global options shared by the subcommands.
pub(crate) struct Options {
    backend: BackendArg,
    dry_run: bool,
    pub(crate) json: bool,
}

fn parse_point(raw: &str) -> Result<Point, String> {
    let (x, y) = raw
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y, got {raw:?}"))?;
    let x = x
        .trim()
        .parse::<i32>()
        .map_err(|e| format!("bad X in {raw:?}: {e}"))?;
    let y = y
        .trim()
        .parse::<i32>()
        .map_err(|e| format!("bad Y in {raw:?}: {e}"))?;
    Ok(Point { x, y })
}

fn init_logging(debug: bool) {
    let default = if debug {
        "multiclick_cli=debug,multiclick_core=debug,multiclick_platform=debug"
    } else {
        "multiclick_cli=info,multiclick_core=info,multiclick_platform=info"
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.debug);

    let opts = Options {
        backend: cli.backend,
        dry_run: cli.dry_run,
        json: cli.json,
    };

    match cli.command.unwrap_or(CliCommand::Console) {
        CliCommand::Check => check(&opts),
        CliCommand::Run(args) => run(&opts, args),
        CliCommand::Console => console::run(&opts),
    }
}

/// Pick the backend from the flag or the environment.
fn select_backend(opts: &Options) -> Result<DisplayServer> {
    match opts.backend {
        BackendArg::X11 => Ok(DisplayServer::X11),
        BackendArg::Wayland => Ok(DisplayServer::Wayland),
        BackendArg::Auto => detect_display_server()
            .ok_or_else(|| anyhow!("could not detect a display server; pass --backend")),
    }
}

/// Build a session for the selected backend: driver plus capture source.
/// The listener handle, when present, has to outlive the session.
pub(crate) fn build_session(opts: &Options) -> Result<(Session, Option<PointerListenerHandle>)> {
    let server = select_backend(opts)?;

    let driver: Arc<dyn PointerDriver> = if opts.dry_run {
        Arc::new(NoopDriver::new())
    } else {
        let driver: Arc<dyn PointerDriver> = match server {
            DisplayServer::X11 => Arc::new(X11Driver::new()),
            DisplayServer::Wayland => Arc::new(WaylandDriver::new()),
        };
        let missing = missing_tools(server);
        if !missing.is_empty() {
            warn!(?missing, %server, "required tools missing; the affected operations will fail");
        } else if !driver.is_available() {
            warn!(%server, "backend tool found but not responding; pointer actions may fail");
        }
        driver
    };

    let (capture, listener) = match server {
        DisplayServer::X11 => {
            let listener = start_pointer_listener();
            (CaptureSource::Events(listener.events()), Some(listener))
        }
        DisplayServer::Wayland => (CaptureSource::Picker(Arc::new(SlurpPicker::new())), None),
    };

    Ok((Session::new(driver, capture), listener))
}

pub(crate) fn check(opts: &Options) -> Result<()> {
    let report = probe();
    if opts.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    match report.display_server {
        Some(server) => println!("display server: {server}"),
        None => println!("display server: not detected"),
    }
    for tool in &report.tools {
        println!(
            "  {:<8} {}",
            tool.name,
            if tool.found { "found" } else { "MISSING" }
        );
    }
    Ok(())
}

fn run(opts: &Options, args: RunArgs) -> Result<()> {
    let (mut session, _listener) = build_session(opts)?;

    for point in &args.points {
        session.add_point(*point);
    }

    let config = PlaybackConfig {
        button: args.button.into(),
        interval_ms: args.interval_ms,
        start_delay_ms: args.delay_ms,
        repeat: args.repeat,
        restore_pointer: !args.no_restore,
    };
    session.start(config)?;

    loop {
        session.poll();
        for event in session.drain_events() {
            print_event(opts, &event);
        }
        if session.state() == RunState::Idle {
            // The final notifications land just after the transition.
            thread::sleep(Duration::from_millis(50));
            for event in session.drain_events() {
                print_event(opts, &event);
            }
            return Ok(());
        }
        thread::sleep(Duration::from_millis(50));
    }
}

pub(crate) fn print_event(opts: &Options, event: &SessionEvent) {
    if opts.json {
        match serde_json::to_string(event) {
            Ok(line) => println!("{line}"),
            Err(e) => warn!("Failed to serialize event: {}", e),
        }
        return;
    }
    match event {
        SessionEvent::PointCaptured { x, y } => println!("captured: {x}, {y}"),
        SessionEvent::CaptureFailed { reason } => println!("capture failed: {reason}"),
        SessionEvent::StatusChanged { text } => println!("{text}"),
        SessionEvent::RunStateChanged { state } => println!("state: {state:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_point() {
        assert_eq!(parse_point("100,200"), Ok(Point { x: 100, y: 200 }));
        assert_eq!(parse_point(" 100 , -200 "), Ok(Point { x: 100, y: -200 }));
    }

    #[test]
    fn test_parse_point_rejects_junk() {
        assert!(parse_point("100").is_err());
        assert!(parse_point("a,b").is_err());
        assert!(parse_point("1,2,3").is_err());
    }

    #[test]
    fn test_cli_shape() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
