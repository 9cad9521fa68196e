//! Playback: replays a snapshot of the action log N times, with observable
//! progress and cooperative cancellation.

use crate::action::Action;
use crate::hook::InputHook;
use crate::inject::Injector;
use crossbeam_channel::RecvTimeoutError;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{info, warn};

// Persistent inability to inject anything is treated as "cannot control
// input devices at all" and ends the session.
const MAX_CONSECUTIVE_FAILURES: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Running,
    Completed,
    Cancelled,
    Failed,
}

impl PlaybackState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            PlaybackState::Completed | PlaybackState::Cancelled | PlaybackState::Failed
        )
    }
}

/// Loop counters observable while a loop runs. `current_loop` is 0 until
/// the first iteration starts, and `remaining_loops` always equals the
/// requested count minus `current_loop`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub current_loop: u32,
    pub remaining_loops: u32,
}

pub(crate) struct PlaybackShared {
    pub(crate) state: Mutex<PlaybackState>,
    cancel: AtomicBool,
    // Both counters in one word so an observer never sees a half-updated
    // pair: current loop in the high half, remaining loops in the low half.
    progress: AtomicU64,
    failure: Mutex<Option<String>>,
}

impl PlaybackShared {
    pub(crate) fn new() -> Self {
        PlaybackShared {
            state: Mutex::new(PlaybackState::Idle),
            cancel: AtomicBool::new(false),
            progress: AtomicU64::new(0),
            failure: Mutex::new(None),
        }
    }

    pub(crate) fn state(&self) -> PlaybackState {
        *self.state.lock()
    }

    pub(crate) fn progress(&self) -> Progress {
        let packed = self.progress.load(Ordering::SeqCst);
        Progress {
            current_loop: (packed >> 32) as u32,
            remaining_loops: packed as u32,
        }
    }

    /// Prepare for a fresh run of `count` loops. Called just before the
    /// state flips to `Running`.
    pub(crate) fn reset(&self, count: u32) {
        self.cancel.store(false, Ordering::SeqCst);
        self.set_progress(0, count);
        *self.failure.lock() = None;
    }

    pub(crate) fn request_cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    pub(crate) fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    pub(crate) fn failure(&self) -> Option<String> {
        self.failure.lock().clone()
    }

    fn set_progress(&self, current: u32, remaining: u32) {
        let packed = ((current as u64) << 32) | remaining as u64;
        self.progress.store(packed, Ordering::SeqCst);
    }

    fn finish(&self, state: PlaybackState) {
        *self.state.lock() = state;
        info!("playback finished: {state:?}");
    }

    fn fail(&self, message: String) {
        *self.failure.lock() = Some(message);
        self.finish(PlaybackState::Failed);
    }
}

/// The playback loop. Runs on its own thread; every exit path leaves the
/// session in a terminal state.
pub(crate) fn run(
    shared: &PlaybackShared,
    actions: &[Action],
    count: u32,
    injector: &dyn Injector,
    delay: Duration,
) {
    let mut consecutive_failures = 0u32;

    for loop_index in 0..count {
        if shared.cancelled() {
            shared.finish(PlaybackState::Cancelled);
            return;
        }
        shared.set_progress(loop_index + 1, count - loop_index - 1);

        for action in actions {
            // Checked per action so a cancel can land mid-loop.
            if shared.cancelled() {
                shared.finish(PlaybackState::Cancelled);
                return;
            }

            match injector.inject(action) {
                Ok(()) => consecutive_failures = 0,
                Err(e) => {
                    consecutive_failures += 1;
                    warn!("skipping action after injection failure: {e}");
                    if consecutive_failures >= MAX_CONSECUTIVE_FAILURES {
                        shared.fail(format!("input injection is not working: {e}"));
                        return;
                    }
                }
            }

            thread::sleep(delay);
        }
    }

    shared.finish(PlaybackState::Completed);
}

/// Watches for the cancel key while a loop runs. The hook delivers the key
/// press over a channel; the bounded wait keeps the watcher from outliving
/// the session.
pub(crate) fn watch_cancel(shared: Arc<PlaybackShared>, key: rdev::Key, interval: Duration) {
    let (tx, rx) = crossbeam_channel::bounded(1);
    let hook = InputHook::global();
    hook.attach_cancel(key, tx);

    loop {
        match rx.recv_timeout(interval) {
            Ok(()) => {
                info!("cancel key pressed, stopping playback");
                shared.request_cancel();
                hook.detach_cancel();
                break;
            }
            Err(RecvTimeoutError::Timeout) => {
                if shared.state() != PlaybackState::Running {
                    hook.detach_cancel();
                    break;
                }
            }
            // A newer session replaced our channel; the slot is no longer
            // ours to detach.
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}
