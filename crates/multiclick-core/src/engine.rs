//! Playback engine: the cancellable worker loop that walks the point list.

use crate::session::{emit, SessionEvent};
use crate::{BackendError, PlaybackConfig, PointList, PointerDriver};
use crossbeam_channel::Sender;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

/// Sleep chunk; the stop flag is re-checked at least this often.
const STOP_POLL: Duration = Duration::from_millis(25);

/// Level-triggered stop flag shared between the control side and the worker.
///
/// Once set it stays set for the life of the run, so a worker that checks
/// late still observes it.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Sleep up to `duration`, waking early when the signal is set.
    ///
    /// Returns false when the sleep was interrupted.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if self.is_set() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            let chunk = (deadline - now).min(STOP_POLL);
            thread::sleep(chunk);
        }
    }
}

/// How a playback run ended.
#[derive(Debug)]
pub(crate) enum RunOutcome {
    /// The repeat bound was reached.
    Exhausted { cycles: u32 },
    /// The stop signal was observed.
    Cancelled,
    /// A driver call failed; the run terminated immediately.
    Failed(BackendError),
}

/// Walk the point list in cycles until the repeat bound, the stop signal, or
/// a driver failure ends the run.
///
/// The stop flag is checked before every driver call and inside every sleep;
/// a pass cut short by cancellation still gets its pointer restore, a pass
/// cut short by a driver failure does not.
pub(crate) fn run_playback(
    driver: &dyn PointerDriver,
    points: &Mutex<PointList>,
    config: &PlaybackConfig,
    stop: &StopSignal,
    events: &Sender<SessionEvent>,
) -> RunOutcome {
    if config.start_delay_ms > 0 {
        emit_status(
            events,
            format!(
                "Starting in {:.1}s...",
                config.start_delay_ms as f64 / 1000.0
            ),
        );
        if !stop.sleep(Duration::from_millis(config.start_delay_ms)) {
            return RunOutcome::Cancelled;
        }
    }

    let interval = Duration::from_millis(config.interval_ms);
    let mut cycle = 0u32;

    loop {
        if stop.is_set() {
            return RunOutcome::Cancelled;
        }
        if config.repeat != 0 && cycle >= config.repeat {
            return RunOutcome::Exhausted { cycles: cycle };
        }
        cycle += 1;
        emit_status(events, format!("Running cycle {cycle}..."));

        // Pre-pass position so the pointer can be put back afterwards. A
        // failed query only skips the restore for this pass.
        let origin = if config.restore_pointer {
            match driver.pointer_position() {
                Ok(point) => Some(point),
                Err(e) => {
                    warn!(error = %e, "position query failed, skipping restore this pass");
                    None
                }
            }
        } else {
            None
        };

        let pass = points.lock().unwrap().snapshot();
        for point in &pass {
            if stop.is_set() {
                break;
            }
            if let Err(e) = driver.move_to(*point) {
                error!(error = %e, "pointer move failed, terminating run");
                return RunOutcome::Failed(e);
            }
            if stop.is_set() {
                break;
            }
            if let Err(e) = driver.click(config.button) {
                error!(error = %e, "click failed, terminating run");
                return RunOutcome::Failed(e);
            }
            if !stop.sleep(interval) {
                break;
            }
        }

        // Best effort, also after a cancelled pass.
        if let Some(origin) = origin {
            if let Err(e) = driver.move_to(origin) {
                debug!(error = %e, "pointer restore failed");
            }
        }
    }
}

fn emit_status(events: &Sender<SessionEvent>, text: String) {
    emit(events, SessionEvent::StatusChanged { text });
}
