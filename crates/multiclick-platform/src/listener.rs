//! Global pointer listener: the event-stream capture source for X11.
//!
//! rdev only reports coordinates on move events, so the listener tracks the
//! last observed position and stamps it onto the button events it forwards.
//! Move events themselves are not forwarded.

use crossbeam_channel::{bounded, Receiver, Sender};
use multiclick_core::{PointerButton, PointerEvent};
use rdev::{listen, Event, EventType};
use std::cell::Cell;
use std::thread::{self, JoinHandle};
use tracing::{error, info, warn};

fn map_button(button: rdev::Button) -> PointerButton {
    match button {
        rdev::Button::Left => PointerButton::Primary,
        rdev::Button::Middle => PointerButton::Middle,
        rdev::Button::Right => PointerButton::Secondary,
        _ => PointerButton::Other,
    }
}

/// Handle to the listener thread.
///
/// There is no stop control: the rdev listener blocks for the life of the
/// process and cannot be interrupted gracefully.
pub struct PointerListenerHandle {
    event_rx: Receiver<PointerEvent>,
    thread: Option<JoinHandle<()>>,
}

impl PointerListenerHandle {
    /// The stream of stamped button events.
    pub fn events(&self) -> Receiver<PointerEvent> {
        self.event_rx.clone()
    }

    /// Whether the listener thread is still alive.
    pub fn is_running(&self) -> bool {
        self.thread.as_ref().map_or(false, |t| !t.is_finished())
    }
}

/// Start the global pointer listener.
pub fn start_pointer_listener() -> PointerListenerHandle {
    let (event_tx, event_rx) = bounded(1024);

    let thread = thread::spawn(move || {
        run_listener(event_tx);
    });

    PointerListenerHandle {
        event_rx,
        thread: Some(thread),
    }
}

fn run_listener(event_tx: Sender<PointerEvent>) {
    info!("Pointer listener thread started (rdev)");

    let last = Cell::new((0i32, 0i32));
    let callback = move |event: Event| {
        let stamped = match event.event_type {
            EventType::MouseMove { x, y } => {
                last.set((x as i32, y as i32));
                None
            }
            EventType::ButtonPress(button) => {
                let (x, y) = last.get();
                Some(PointerEvent {
                    x,
                    y,
                    button: map_button(button),
                    pressed: true,
                })
            }
            EventType::ButtonRelease(button) => {
                let (x, y) = last.get();
                Some(PointerEvent {
                    x,
                    y,
                    button: map_button(button),
                    pressed: false,
                })
            }
            _ => None,
        };

        if let Some(event) = stamped {
            if let Err(e) = event_tx.try_send(event) {
                warn!("Failed to send pointer event: {}", e);
            }
        }
    };

    if let Err(err) = listen(callback) {
        error!(?err, "Pointer listener error");
    }

    info!("Pointer listener thread exiting");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_button_mapping() {
        assert_eq!(map_button(rdev::Button::Left), PointerButton::Primary);
        assert_eq!(map_button(rdev::Button::Middle), PointerButton::Middle);
        assert_eq!(map_button(rdev::Button::Right), PointerButton::Secondary);
        assert_eq!(map_button(rdev::Button::Unknown(8)), PointerButton::Other);
    }
}
