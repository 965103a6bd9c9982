//! Session controller: the Idle/Running state machine plus the wiring that
//! makes the store, latch, and engine usable from a front end.

use crate::capture::{CaptureError, CaptureLatch, CaptureSource};
use crate::engine::{self, RunOutcome, StopSignal};
use crate::{PlaybackConfig, Point, PointList, PointerDriver};
use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Session state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    /// Idle, ready to start.
    Idle,
    /// A playback worker is running.
    Running,
}

impl Default for RunState {
    fn default() -> Self {
        Self::Idle
    }
}

/// Notifications published to the front end, in FIFO order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SessionEvent {
    /// A capture completed and the point was appended.
    PointCaptured { x: i32, y: i32 },
    /// A capture attempt failed; the latch is disarmed again.
    CaptureFailed { reason: String },
    /// Human-readable status line.
    StatusChanged { text: String },
    /// State transition.
    RunStateChanged { state: RunState },
}

/// Direction for the reorder command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
}

/// Why a start was refused.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StartError {
    #[error("already running")]
    AlreadyRunning,
    #[error("no points to click")]
    EmptyPointList,
}

const EVENT_CAPACITY: usize = 256;
const PICK_CAPACITY: usize = 4;

/// Current state plus the serial of the run occupying it.
///
/// A worker can outlive its own stop while draining a blocking driver call;
/// its epilogue may only transition the slot while its serial still matches,
/// so a stale worker cannot flip a newer run back to Idle.
#[derive(Debug, Default)]
struct RunSlot {
    state: RunState,
    run: u64,
}

/// One auto-click session: a point store, a capture latch over one source,
/// and at most one playback worker at a time.
///
/// All methods are called from the controlling thread; the worker and
/// capture threads only touch the shared store, the state cell, and the
/// notification channel.
pub struct Session {
    driver: Arc<dyn PointerDriver>,
    points: Arc<Mutex<PointList>>,
    state: Arc<Mutex<RunSlot>>,
    capture: CaptureSource,
    latch: CaptureLatch,
    event_tx: Sender<SessionEvent>,
    event_rx: Receiver<SessionEvent>,
    pick_tx: Sender<Result<Point, CaptureError>>,
    pick_rx: Receiver<Result<Point, CaptureError>>,
    stop: Option<StopSignal>,
    worker: Option<JoinHandle<()>>,
    last_config: Option<PlaybackConfig>,
}

impl Session {
    pub fn new(driver: Arc<dyn PointerDriver>, capture: CaptureSource) -> Self {
        let (event_tx, event_rx) = bounded(EVENT_CAPACITY);
        let (pick_tx, pick_rx) = bounded(PICK_CAPACITY);
        Self {
            driver,
            points: Arc::new(Mutex::new(PointList::new())),
            state: Arc::new(Mutex::new(RunSlot::default())),
            capture,
            latch: CaptureLatch::default(),
            event_tx,
            event_rx,
            pick_tx,
            pick_rx,
            stop: None,
            worker: None,
            last_config: None,
        }
    }

    /// Current state.
    pub fn state(&self) -> RunState {
        self.state.lock().unwrap().state
    }

    /// Receive all pending notifications.
    pub fn drain_events(&self) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.event_rx.try_recv() {
            events.push(event);
        }
        events
    }

    /// Start a playback worker with `config`.
    pub fn start(&mut self, config: PlaybackConfig) -> Result<(), StartError> {
        if self.state() == RunState::Running {
            return Err(StartError::AlreadyRunning);
        }
        if self.points.lock().unwrap().is_empty() {
            return Err(StartError::EmptyPointList);
        }

        // Reap the previous worker if it is done. Never wait on one that is
        // still draining a sleep chunk or a blocking driver call; its run was
        // stopped, and its serial-scoped epilogue cannot touch the state set
        // below.
        if let Some(handle) = self.worker.take() {
            if handle.is_finished() {
                let _ = handle.join();
            }
        }

        self.last_config = Some(config.clone());
        let stop = StopSignal::new();
        self.stop = Some(stop.clone());

        let run = {
            let mut slot = self.state.lock().unwrap();
            slot.state = RunState::Running;
            slot.run += 1;
            slot.run
        };
        info!(run, ?config, "playback starting");
        self.emit(SessionEvent::RunStateChanged {
            state: RunState::Running,
        });

        let driver = self.driver.clone();
        let points = self.points.clone();
        let state = self.state.clone();
        let events = self.event_tx.clone();
        self.worker = Some(thread::spawn(move || {
            let outcome = engine::run_playback(driver.as_ref(), &points, &config, &stop, &events);
            finish(outcome, run, &state, &events);
        }));
        Ok(())
    }

    /// Request the running worker to stop. Never blocks; a no-op when idle.
    pub fn stop(&mut self) {
        if let Some(stop) = &self.stop {
            stop.set();
        }
        if transition(&self.state, RunState::Running, RunState::Idle) {
            info!("playback stopped by request");
            self.emit(SessionEvent::StatusChanged {
                text: "Stopped.".into(),
            });
            self.emit(SessionEvent::RunStateChanged {
                state: RunState::Idle,
            });
        }
    }

    /// Running: stop. Idle: start with the last config, or defaults when
    /// nothing ran yet. This is the hotkey surface.
    pub fn toggle(&mut self) -> Result<(), StartError> {
        if self.state() == RunState::Running {
            self.stop();
            Ok(())
        } else {
            let config = self.last_config.clone().unwrap_or_default();
            self.start(config)
        }
    }

    /// Arm the capture latch. A no-op when already armed.
    pub fn arm_capture(&mut self) {
        match &self.capture {
            CaptureSource::Events(rx) => {
                if !self.latch.arm() {
                    return;
                }
                // Presses from before the arm must not satisfy the capture.
                // Flushing only on the arming call keeps a redundant arm from
                // discarding a press that is already queued for this capture.
                while rx.try_recv().is_ok() {}
            }
            CaptureSource::Picker(picker) => {
                if !self.latch.arm() {
                    return;
                }
                let picker = picker.clone();
                let tx = self.pick_tx.clone();
                thread::spawn(move || {
                    let _ = tx.send(picker.pick());
                });
            }
        }
        self.emit(SessionEvent::StatusChanged {
            text: "Capture mode: click anywhere to add a point.".into(),
        });
    }

    /// Whether a capture is pending.
    pub fn capture_armed(&self) -> bool {
        self.latch.is_armed()
    }

    /// Drain capture inputs and route the results. Call regularly from the
    /// front-end loop.
    pub fn poll(&mut self) {
        let mut settled = Vec::new();
        while let Ok(result) = self.pick_rx.try_recv() {
            settled.push(result);
        }
        for result in settled {
            if let Some(result) = self.latch.settle(result) {
                self.finish_capture(result);
            }
        }

        let mut captured = Vec::new();
        let mut source_closed = false;
        if let CaptureSource::Events(rx) = &self.capture {
            loop {
                match rx.try_recv() {
                    Ok(event) => {
                        if let Some(point) = self.latch.observe(&event) {
                            captured.push(point);
                        }
                    }
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        source_closed = true;
                        break;
                    }
                }
            }
        }
        for point in captured {
            self.finish_capture(Ok(point));
        }
        if source_closed {
            if let Some(result) = self.latch.settle(Err(CaptureError::SourceClosed)) {
                self.finish_capture(result);
            }
        }
    }

    /// Append a point by hand (no capture involved).
    pub fn add_point(&mut self, point: Point) {
        self.points.lock().unwrap().append(point);
        self.emit(SessionEvent::StatusChanged {
            text: format!("Added point: {point}"),
        });
    }

    /// Remove a set of indices. Out-of-range and duplicates are ignored.
    pub fn remove_points(&mut self, indices: &[usize]) {
        let removed = self.points.lock().unwrap().remove_at(indices);
        if removed > 0 {
            self.emit(SessionEvent::StatusChanged {
                text: format!("Removed {removed} point(s)."),
            });
        }
    }

    /// Move a point one slot. Returns whether anything moved.
    pub fn reorder(&mut self, index: usize, direction: Direction) -> bool {
        let mut points = self.points.lock().unwrap();
        match direction {
            Direction::Up => points.move_up(index),
            Direction::Down => points.move_down(index),
        }
    }

    /// Drop all points.
    pub fn clear_points(&mut self) {
        self.points.lock().unwrap().clear();
        self.emit(SessionEvent::StatusChanged {
            text: "Cleared all points.".into(),
        });
    }

    /// Snapshot of the stored points, for display.
    pub fn points(&self) -> Vec<Point> {
        self.points.lock().unwrap().snapshot()
    }

    /// Config of the most recent start, if any.
    pub fn last_config(&self) -> Option<&PlaybackConfig> {
        self.last_config.as_ref()
    }

    fn finish_capture(&mut self, result: Result<Point, CaptureError>) {
        match result {
            Ok(point) => {
                self.points.lock().unwrap().append(point);
                info!(x = point.x, y = point.y, "point captured");
                self.emit(SessionEvent::PointCaptured {
                    x: point.x,
                    y: point.y,
                });
                self.emit(SessionEvent::StatusChanged {
                    text: format!("Added point: {point}"),
                });
            }
            Err(error) => {
                warn!(error = %error, "capture failed");
                self.emit(SessionEvent::CaptureFailed {
                    reason: error.to_string(),
                });
            }
        }
    }

    fn emit(&self, event: SessionEvent) {
        emit(&self.event_tx, event);
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(stop) = &self.stop {
            stop.set();
        }
        // The worker is detached; it observes the signal within one sleep
        // chunk and exits on its own.
        let _ = self.worker.take();
    }
}

/// Worker-side epilogue: publish the final transition exactly once.
///
/// A stop request may already have moved the state to Idle and published the
/// notifications, and a worker draining a blocking driver call can get here
/// after a newer run has started. Only the worker whose serial still owns
/// the slot publishes.
fn finish(outcome: RunOutcome, run: u64, state: &Mutex<RunSlot>, events: &Sender<SessionEvent>) {
    let text = match &outcome {
        RunOutcome::Exhausted { cycles } => format!("Finished {cycles} cycle(s)."),
        RunOutcome::Cancelled => "Stopped.".to_string(),
        RunOutcome::Failed(error) => error.to_string(),
    };
    let owned = {
        let mut slot = state.lock().unwrap();
        if slot.run == run && slot.state == RunState::Running {
            slot.state = RunState::Idle;
            true
        } else {
            false
        }
    };
    if owned {
        info!(?outcome, "playback finished");
        emit(events, SessionEvent::StatusChanged { text });
        emit(
            events,
            SessionEvent::RunStateChanged {
                state: RunState::Idle,
            },
        );
    } else {
        debug!(run, ?outcome, "final transition already published for this run");
    }
}

/// Compare-and-swap transition; true when this call performed it.
fn transition(state: &Mutex<RunSlot>, from: RunState, to: RunState) -> bool {
    let mut slot = state.lock().unwrap();
    if slot.state == from {
        slot.state = to;
        true
    } else {
        false
    }
}

pub(crate) fn emit(events: &Sender<SessionEvent>, event: SessionEvent) {
    if let Err(e) = events.try_send(event) {
        warn!("Failed to emit event: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{PointPicker, PointerButton, PointerEvent};
    use crate::{BackendError, ClickButton};
    use std::time::{Duration, Instant};

    struct OkDriver;

    impl PointerDriver for OkDriver {
        fn move_to(&self, _point: Point) -> Result<(), BackendError> {
            Ok(())
        }

        fn click(&self, _button: ClickButton) -> Result<(), BackendError> {
            Ok(())
        }

        fn pointer_position(&self) -> Result<Point, BackendError> {
            Ok(Point { x: 0, y: 0 })
        }

        fn is_available(&self) -> bool {
            true
        }
    }

    fn event_session() -> (Session, Sender<PointerEvent>) {
        let (tx, rx) = bounded(64);
        let session = Session::new(Arc::new(OkDriver), CaptureSource::Events(rx));
        (session, tx)
    }

    fn press(x: i32, y: i32) -> PointerEvent {
        PointerEvent {
            x,
            y,
            button: PointerButton::Primary,
            pressed: true,
        }
    }

    fn wait_for_idle(session: &Session, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if session.state() == RunState::Idle {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        false
    }

    fn quick_config() -> PlaybackConfig {
        PlaybackConfig {
            interval_ms: 0,
            repeat: 1,
            restore_pointer: false,
            ..Default::default()
        }
    }

    #[test]
    fn test_start_requires_points() {
        let (mut session, _tx) = event_session();
        assert_eq!(session.start(quick_config()), Err(StartError::EmptyPointList));
        assert_eq!(session.state(), RunState::Idle);
    }

    #[test]
    fn test_double_start_is_refused() {
        let (mut session, _tx) = event_session();
        session.add_point(Point { x: 1, y: 2 });

        let slow = PlaybackConfig {
            interval_ms: 1_000,
            repeat: 0,
            restore_pointer: false,
            ..Default::default()
        };
        assert_eq!(session.start(slow.clone()), Ok(()));
        assert_eq!(session.state(), RunState::Running);
        assert_eq!(session.start(slow), Err(StartError::AlreadyRunning));

        session.stop();
        assert_eq!(session.state(), RunState::Idle);
    }

    #[test]
    fn test_stop_publishes_exactly_once() {
        let (mut session, _tx) = event_session();
        session.add_point(Point { x: 1, y: 2 });

        session
            .start(PlaybackConfig {
                interval_ms: 50,
                repeat: 0,
                restore_pointer: false,
                ..Default::default()
            })
            .unwrap();
        thread::sleep(Duration::from_millis(30));
        session.stop();

        // Give the worker time to finish and (wrongly) publish a duplicate.
        thread::sleep(Duration::from_millis(200));
        let events = session.drain_events();
        let idle_count = events
            .iter()
            .filter(|event| {
                matches!(
                    event,
                    SessionEvent::RunStateChanged {
                        state: RunState::Idle
                    }
                )
            })
            .count();
        assert_eq!(idle_count, 1);
        assert!(events.iter().any(|event| matches!(
            event,
            SessionEvent::StatusChanged { text } if text == "Stopped."
        )));
    }

    struct SlowDriver;

    impl PointerDriver for SlowDriver {
        fn move_to(&self, _point: Point) -> Result<(), BackendError> {
            thread::sleep(Duration::from_millis(200));
            Ok(())
        }

        fn click(&self, _button: ClickButton) -> Result<(), BackendError> {
            Ok(())
        }

        fn pointer_position(&self) -> Result<Point, BackendError> {
            Ok(Point { x: 0, y: 0 })
        }

        fn is_available(&self) -> bool {
            true
        }
    }

    #[test]
    fn test_restart_survives_prior_worker_epilogue() {
        let (_tx, rx) = bounded(64);
        let mut session = Session::new(Arc::new(SlowDriver), CaptureSource::Events(rx));
        session.add_point(Point { x: 1, y: 2 });

        let config = PlaybackConfig {
            interval_ms: 300,
            repeat: 0,
            restore_pointer: false,
            ..Default::default()
        };
        session.start(config.clone()).unwrap();

        // Let the first worker get into its blocking move, then stop and
        // restart while it is still draining that call.
        thread::sleep(Duration::from_millis(50));
        session.stop();
        assert_eq!(session.state(), RunState::Idle);
        session.start(config.clone()).unwrap();

        // The first worker finishes its move, observes its own stop signal,
        // and runs its epilogue in this window. That epilogue belongs to the
        // stopped run and must not push the new run back to Idle.
        thread::sleep(Duration::from_millis(400));
        assert_eq!(session.state(), RunState::Running);
        assert_eq!(session.start(config), Err(StartError::AlreadyRunning));

        session.stop();
        assert_eq!(session.state(), RunState::Idle);

        // One Idle notification per stop; the stale epilogue adds none.
        thread::sleep(Duration::from_millis(300));
        let idle_count = session
            .drain_events()
            .iter()
            .filter(|event| {
                matches!(
                    event,
                    SessionEvent::RunStateChanged {
                        state: RunState::Idle
                    }
                )
            })
            .count();
        assert_eq!(idle_count, 2);
    }

    #[test]
    fn test_natural_finish_lands_idle() {
        let (mut session, _tx) = event_session();
        session.add_point(Point { x: 1, y: 2 });

        session.start(quick_config()).unwrap();
        assert!(wait_for_idle(&session, Duration::from_secs(2)));

        // Let the final notifications land after the transition.
        thread::sleep(Duration::from_millis(50));
        let events = session.drain_events();
        let idle_count = events
            .iter()
            .filter(|event| {
                matches!(
                    event,
                    SessionEvent::RunStateChanged {
                        state: RunState::Idle
                    }
                )
            })
            .count();
        assert_eq!(idle_count, 1);
        assert!(events.iter().any(|event| matches!(
            event,
            SessionEvent::StatusChanged { text } if text == "Finished 1 cycle(s)."
        )));
    }

    struct FailingDriver;

    impl PointerDriver for FailingDriver {
        fn move_to(&self, _point: Point) -> Result<(), BackendError> {
            Err(BackendError::CommandFailed {
                tool: "mock",
                detail: "no display".into(),
            })
        }

        fn click(&self, _button: ClickButton) -> Result<(), BackendError> {
            Ok(())
        }

        fn pointer_position(&self) -> Result<Point, BackendError> {
            Ok(Point { x: 0, y: 0 })
        }

        fn is_available(&self) -> bool {
            false
        }
    }

    #[test]
    fn test_driver_failure_lands_idle_once() {
        let (_tx, rx) = bounded(64);
        let mut session = Session::new(Arc::new(FailingDriver), CaptureSource::Events(rx));
        session.add_point(Point { x: 1, y: 2 });

        session.start(quick_config()).unwrap();
        assert!(wait_for_idle(&session, Duration::from_secs(2)));

        thread::sleep(Duration::from_millis(50));
        let events = session.drain_events();
        let idle_count = events
            .iter()
            .filter(|event| {
                matches!(
                    event,
                    SessionEvent::RunStateChanged {
                        state: RunState::Idle
                    }
                )
            })
            .count();
        assert_eq!(idle_count, 1);
        assert!(events.iter().any(|event| matches!(
            event,
            SessionEvent::StatusChanged { text } if text == "`mock` failed: no display"
        )));

        // The session is usable again right away.
        assert_eq!(session.start(quick_config()), Ok(()));
    }

    #[test]
    fn test_toggle_round_trip() {
        let (mut session, _tx) = event_session();
        session.add_point(Point { x: 1, y: 2 });

        // No config seen yet: toggle starts with the defaults (forever).
        session.toggle().unwrap();
        assert_eq!(session.state(), RunState::Running);

        session.toggle().unwrap();
        assert_eq!(session.state(), RunState::Idle);
    }

    #[test]
    fn test_capture_event_flow() {
        let (mut session, tx) = event_session();

        session.arm_capture();
        assert!(session.capture_armed());
        tx.send(press(10, 20)).unwrap();
        session.poll();

        assert_eq!(session.points(), vec![Point { x: 10, y: 20 }]);
        assert!(!session.capture_armed());
        let events = session.drain_events();
        assert!(events
            .iter()
            .any(|event| matches!(event, SessionEvent::PointCaptured { x: 10, y: 20 })));

        // Disarmed now: further presses are ignored.
        tx.send(press(30, 40)).unwrap();
        session.poll();
        assert_eq!(session.points().len(), 1);
    }

    #[test]
    fn test_press_before_arm_is_discarded() {
        let (mut session, tx) = event_session();

        tx.send(press(10, 20)).unwrap();
        session.arm_capture();
        session.poll();

        assert!(session.points().is_empty());
        assert!(session.capture_armed());
    }

    #[test]
    fn test_arm_capture_is_idempotent() {
        let (mut session, _tx) = event_session();
        session.arm_capture();
        session.arm_capture();

        let capture_statuses = session
            .drain_events()
            .into_iter()
            .filter(|event| matches!(
                event,
                SessionEvent::StatusChanged { text } if text.starts_with("Capture mode")
            ))
            .count();
        assert_eq!(capture_statuses, 1);
    }

    #[test]
    fn test_rearm_keeps_queued_press() {
        let (mut session, tx) = event_session();

        session.arm_capture();
        tx.send(press(10, 20)).unwrap();
        // A redundant arm while a qualifying press is queued must not
        // discard that press.
        session.arm_capture();
        session.poll();

        assert_eq!(session.points(), vec![Point { x: 10, y: 20 }]);
        assert!(!session.capture_armed());
    }

    struct FixedPicker(Point);

    impl PointPicker for FixedPicker {
        fn pick(&self) -> Result<Point, CaptureError> {
            Ok(self.0)
        }
    }

    struct CancelledPicker;

    impl PointPicker for CancelledPicker {
        fn pick(&self) -> Result<Point, CaptureError> {
            Err(CaptureError::Cancelled)
        }
    }

    fn poll_until<F: Fn(&Session) -> bool>(session: &mut Session, done: F) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            session.poll();
            if done(session) {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        false
    }

    #[test]
    fn test_picker_capture_appends_point() {
        let mut session = Session::new(
            Arc::new(OkDriver),
            CaptureSource::Picker(Arc::new(FixedPicker(Point { x: 7, y: 8 }))),
        );

        session.arm_capture();
        assert!(poll_until(&mut session, |s| !s.points().is_empty()));
        assert_eq!(session.points(), vec![Point { x: 7, y: 8 }]);
        assert!(!session.capture_armed());
    }

    #[test]
    fn test_picker_failure_disarms_and_reports() {
        let mut session = Session::new(
            Arc::new(OkDriver),
            CaptureSource::Picker(Arc::new(CancelledPicker)),
        );

        session.arm_capture();
        assert!(poll_until(&mut session, |s| !s.capture_armed()));
        assert!(session.points().is_empty());
        let events = session.drain_events();
        assert!(events.iter().any(|event| matches!(
            event,
            SessionEvent::CaptureFailed { reason } if reason == "capture cancelled"
        )));
    }

    #[test]
    fn test_closed_event_source_fails_pending_capture() {
        let (mut session, tx) = event_session();

        session.arm_capture();
        drop(tx);
        session.poll();

        assert!(!session.capture_armed());
        let events = session.drain_events();
        assert!(events
            .iter()
            .any(|event| matches!(event, SessionEvent::CaptureFailed { .. })));
    }

    #[test]
    fn test_remove_and_reorder_through_session() {
        let (mut session, _tx) = event_session();
        session.add_point(Point { x: 1, y: 1 });
        session.add_point(Point { x: 2, y: 2 });
        session.add_point(Point { x: 3, y: 3 });

        assert!(session.reorder(0, Direction::Down));
        assert!(!session.reorder(0, Direction::Up));
        session.remove_points(&[2]);
        assert_eq!(
            session.points(),
            vec![Point { x: 2, y: 2 }, Point { x: 1, y: 1 }]
        );

        session.clear_points();
        assert!(session.points().is_empty());
    }
}
