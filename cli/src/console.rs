//! Interactive console: a line-command front end over the session.
//!
//! Stdin is read on a helper thread so the main loop can keep polling the
//! capture source and draining notifications between commands.

use crate::Options;
use anyhow::Result;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError};
use multiclick_core::{ClickButton, Direction, PlaybackConfig, Point, RunState, Session};
use std::io::{self, BufRead};
use std::thread;
use std::time::Duration;

const TICK: Duration = Duration::from_millis(50);

const HELP: &str = "\
commands:
  add X,Y        append a point
  capture        arm capture; the next click (or slurp pick) appends a point
  list           show the stored points
  rm I [I..]     remove points by index
  up I / down I  move a point one slot
  clear          remove all points
  set K V        set interval|delay|repeat|button|restore
  show           show the playback config
  start          start clicking through the list
  stop           stop the running playback
  toggle         start or stop, whichever applies
  status         show state and point count
  check          show backend and tool availability
  help           this text
  quit           exit";

pub(crate) fn run(opts: &Options) -> Result<()> {
    let (mut session, _listener) = crate::build_session(opts)?;
    let mut config = PlaybackConfig::default();

    println!("multiclick console; type help for commands.");
    let lines = spawn_stdin_reader();

    loop {
        match lines.recv_timeout(TICK) {
            Ok(line) => {
                if !handle_line(&mut session, &mut config, line.trim(), opts)? {
                    break;
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
        session.poll();
        for event in session.drain_events() {
            crate::print_event(opts, &event);
        }
    }

    session.stop();
    for event in session.drain_events() {
        crate::print_event(opts, &event);
    }
    Ok(())
}

/// Forward stdin lines over a channel. The thread ends at EOF or once the
/// receiver is gone.
fn spawn_stdin_reader() -> Receiver<String> {
    let (tx, rx) = bounded(32);
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// Execute one command line. Returns false when the console should exit.
fn handle_line(
    session: &mut Session,
    config: &mut PlaybackConfig,
    line: &str,
    opts: &Options,
) -> Result<bool> {
    let mut parts = line.split_whitespace();
    let Some(command) = parts.next() else {
        return Ok(true);
    };
    let rest: Vec<&str> = parts.collect();

    match command {
        "help" | "?" => println!("{HELP}"),
        "quit" | "exit" => return Ok(false),
        "add" => match parse_xy(&rest) {
            Ok(point) => session.add_point(point),
            Err(message) => println!("{message}"),
        },
        "capture" | "cap" => session.arm_capture(),
        "list" | "ls" => {
            let points = session.points();
            if points.is_empty() {
                println!("no points");
            }
            for (index, point) in points.iter().enumerate() {
                println!("{index:>3}: {point}");
            }
        }
        "rm" => match rest
            .iter()
            .map(|part| part.parse::<usize>())
            .collect::<Result<Vec<_>, _>>()
        {
            Ok(indices) if !indices.is_empty() => session.remove_points(&indices),
            _ => println!("usage: rm INDEX [INDEX..]"),
        },
        "up" | "down" => match rest.first().and_then(|part| part.parse::<usize>().ok()) {
            Some(index) => {
                let direction = if command == "up" {
                    Direction::Up
                } else {
                    Direction::Down
                };
                if !session.reorder(index, direction) {
                    println!("nothing to move");
                }
            }
            None => println!("usage: {command} INDEX"),
        },
        "clear" => session.clear_points(),
        "set" => set_config(config, &rest),
        "show" => show_config(config),
        "start" => {
            if let Err(e) = session.start(config.clone()) {
                println!("{e}");
            }
        }
        "stop" => session.stop(),
        "toggle" | "t" => {
            // Start with the console config, not the session's remembered one.
            if session.state() == RunState::Running {
                session.stop();
            } else if let Err(e) = session.start(config.clone()) {
                println!("{e}");
            }
        }
        "status" => println!(
            "state: {:?}, points: {}, capture armed: {}",
            session.state(),
            session.points().len(),
            session.capture_armed()
        ),
        "check" => crate::check(opts)?,
        _ => println!("unknown command: {command} (help lists commands)"),
    }
    Ok(true)
}

/// Accepts "X,Y" as well as "X Y".
fn parse_xy(args: &[&str]) -> Result<Point, String> {
    let joined = args.join(" ");
    let raw = joined.trim();
    if raw.is_empty() {
        return Err("usage: add X,Y".to_string());
    }
    let (x, y) = raw
        .split_once(',')
        .or_else(|| raw.split_once(' '))
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

fn set_config(config: &mut PlaybackConfig, args: &[&str]) {
    let (Some(key), Some(value)) = (args.first(), args.get(1)) else {
        println!("usage: set interval|delay|repeat|button|restore VALUE");
        return;
    };
    match *key {
        "interval" => match value.parse::<u64>() {
            Ok(ms) => config.interval_ms = ms,
            Err(_) => println!("interval wants milliseconds"),
        },
        "delay" => match value.parse::<u64>() {
            Ok(ms) => config.start_delay_ms = ms,
            Err(_) => println!("delay wants milliseconds"),
        },
        "repeat" => match value.parse::<u32>() {
            Ok(count) => config.repeat = count,
            Err(_) => println!("repeat wants a count (0 = forever)"),
        },
        "button" => match *value {
            "left" => config.button = ClickButton::Primary,
            "middle" => config.button = ClickButton::Middle,
            "right" => config.button = ClickButton::Secondary,
            _ => println!("button wants left, middle, or right"),
        },
        "restore" => match *value {
            "on" => config.restore_pointer = true,
            "off" => config.restore_pointer = false,
            _ => println!("restore wants on or off"),
        },
        _ => println!("unknown setting: {key}"),
    }
}

fn show_config(config: &PlaybackConfig) {
    let button = match config.button {
        ClickButton::Primary => "left",
        ClickButton::Middle => "middle",
        ClickButton::Secondary => "right",
    };
    let repeat = if config.repeat == 0 {
        "forever".to_string()
    } else {
        config.repeat.to_string()
    };
    println!(
        "button: {button}, interval: {} ms, delay: {} ms, repeat: {repeat}, restore: {}",
        config.interval_ms,
        config.start_delay_ms,
        if config.restore_pointer { "on" } else { "off" },
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_xy_forms() {
        assert_eq!(parse_xy(&["100,200"]), Ok(Point { x: 100, y: 200 }));
        assert_eq!(parse_xy(&["100", "200"]), Ok(Point { x: 100, y: 200 }));
        assert_eq!(parse_xy(&["100", ",", "200"]), Ok(Point { x: 100, y: 200 }));
        assert_eq!(parse_xy(&["-5,8"]), Ok(Point { x: -5, y: 8 }));
    }

    #[test]
    fn test_parse_xy_rejects_junk() {
        assert!(parse_xy(&[]).is_err());
        assert!(parse_xy(&["100"]).is_err());
        assert!(parse_xy(&["a", "b"]).is_err());
    }

    #[test]
    fn test_set_config_updates_fields() {
        let mut config = PlaybackConfig::default();
        set_config(&mut config, &["interval", "50"]);
        set_config(&mut config, &["delay", "1500"]);
        set_config(&mut config, &["repeat", "3"]);
        set_config(&mut config, &["button", "right"]);
        set_config(&mut config, &["restore", "off"]);

        assert_eq!(config.interval_ms, 50);
        assert_eq!(config.start_delay_ms, 1_500);
        assert_eq!(config.repeat, 3);
        assert_eq!(config.button, ClickButton::Secondary);
        assert!(!config.restore_pointer);
    }

    #[test]
    fn test_set_config_ignores_junk() {
        let mut config = PlaybackConfig::default();
        set_config(&mut config, &["interval", "fast"]);
        set_config(&mut config, &["button", "trigger"]);

        assert_eq!(config.interval_ms, PlaybackConfig::default().interval_ms);
        assert_eq!(config.button, ClickButton::Primary);
    }
}
