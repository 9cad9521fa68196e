//! The engine: one value owning the action log, the capture session, and
//! the playback session. No ambient state beyond the process-wide OS hook.

use crate::action::{Action, NamedKey};
use crate::capture::{CaptureSession, Sources};
use crate::error::{EngineError, Result};
use crate::inject::{key_for_named, Injector, RdevInjector};
use crate::playback::{self, PlaybackShared, PlaybackState, Progress};
use crate::script;
use parking_lot::Mutex;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Pause between injected actions, roughly human pacing.
    pub inter_action_delay: Duration,
    /// Key that cancels a running loop.
    pub cancel_key: NamedKey,
    /// How often the cancel watcher wakes to check for session end.
    pub cancel_poll_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            inter_action_delay: Duration::from_millis(100),
            cancel_key: NamedKey::Escape,
            cancel_poll_interval: Duration::from_millis(50),
        }
    }
}

pub struct Engine {
    config: EngineConfig,
    injector: Arc<dyn Injector>,
    log: Arc<Mutex<Vec<Action>>>,
    // Lock order, for anything taking more than one: capture, then playback
    // state, then log.
    capture: Mutex<Option<CaptureSession>>,
    playback: Arc<PlaybackShared>,
    playback_thread: Mutex<Option<JoinHandle<()>>>,
}

impl Engine {
    pub fn new() -> Self {
        Self::with_injector(EngineConfig::default(), Box::new(RdevInjector::new()))
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self::with_injector(config, Box::new(RdevInjector::new()))
    }

    pub fn with_injector(config: EngineConfig, injector: Box<dyn Injector>) -> Self {
        Engine {
            config,
            injector: Arc::from(injector),
            log: Arc::new(Mutex::new(Vec::new())),
            capture: Mutex::new(None),
            playback: Arc::new(PlaybackShared::new()),
            playback_thread: Mutex::new(None),
        }
    }

    // ------------------------------------------------------------------
    // Capture
    // ------------------------------------------------------------------

    /// Start listening to the enabled sources and appending to the log.
    pub fn start_capture(&self, sources: Sources) -> Result<()> {
        if sources.is_empty() {
            return Err(EngineError::NoSourceSelected);
        }

        let mut capture = self.capture.lock();
        if capture.is_some() {
            return Err(EngineError::AlreadyCapturing);
        }
        if self.playback.state() == PlaybackState::Running {
            return Err(EngineError::AlreadyRunning);
        }

        *capture = Some(CaptureSession::start(self.log.clone(), sources));
        Ok(())
    }

    /// Stop capturing. Blocks until the listener threads have quiesced,
    /// then strips the trailing click/release pair left by the stop
    /// control. Idempotent: a second call does nothing.
    pub fn stop_capture(&self) {
        let session = self.capture.lock().take();
        if let Some(session) = session {
            session.stop();
            self.strip_stop_artifact();
        }
    }

    pub fn capturing(&self) -> bool {
        self.capture.lock().is_some()
    }

    // The release (and the click before it) from pressing a "stop" control
    // is an artifact of stopping, not part of the macro.
    fn strip_stop_artifact(&self) {
        let mut log = self.log.lock();
        if matches!(log.last(), Some(Action::MouseRelease { .. })) {
            log.pop();
            if matches!(log.last(), Some(Action::MouseClick { .. })) {
                log.pop();
            }
        }
    }

    // ------------------------------------------------------------------
    // Log access
    // ------------------------------------------------------------------

    pub fn snapshot(&self) -> Vec<Action> {
        self.log.lock().clone()
    }

    pub fn log_len(&self) -> usize {
        self.log.lock().len()
    }

    /// The whole log in its editable text form, one action per line.
    pub fn log_text(&self) -> String {
        let log = self.log.lock();
        let mut text = String::new();
        for action in log.iter() {
            text.push_str(&script::serialize(action));
            text.push('\n');
        }
        text
    }

    /// Replace the log with the actions parsed from `text`. Returns how
    /// many malformed lines were skipped.
    pub fn set_log_text(&self, text: &str) -> Result<usize> {
        let _capture = self.lock_for_mutation()?;
        let (actions, skipped) = script::parse_log(text);
        info!(
            actions = actions.len(),
            skipped, "log replaced from edited text"
        );
        *self.log.lock() = actions;
        Ok(skipped)
    }

    pub fn clear_log(&self) -> Result<()> {
        let _capture = self.lock_for_mutation()?;
        self.log.lock().clear();
        Ok(())
    }

    // Structural log mutation is only legal while nothing else is using the
    // log. The returned capture guard is held across the mutation so no
    // session can start mid-swap.
    fn lock_for_mutation(&self) -> Result<parking_lot::MutexGuard<'_, Option<CaptureSession>>> {
        let capture = self.capture.lock();
        if capture.is_some() {
            return Err(EngineError::ConcurrentMutation);
        }
        if self.playback.state() == PlaybackState::Running {
            return Err(EngineError::ConcurrentMutation);
        }
        Ok(capture)
    }

    // ------------------------------------------------------------------
    // Playback
    // ------------------------------------------------------------------

    /// Replay the log `count` times on a background thread. The cancel
    /// watcher runs alongside it for the configured cancel key.
    pub fn start_loop(&self, count: NonZeroU32) -> Result<()> {
        let capture = self.capture.lock();
        if capture.is_some() {
            return Err(EngineError::AlreadyCapturing);
        }

        {
            let mut state = self.playback.state.lock();
            if *state == PlaybackState::Running {
                return Err(EngineError::AlreadyRunning);
            }
            // Counters and flags go back to their starting values before
            // anyone can observe the session as running.
            self.playback.reset(count.get());
            *state = PlaybackState::Running;
        }
        let actions = self.log.lock().clone();
        drop(capture);

        // The previous loop's thread, if any, has already reached a
        // terminal state; reap it before starting the next one.
        if let Some(handle) = self.playback_thread.lock().take() {
            let _ = handle.join();
        }

        info!(count = count.get(), actions = actions.len(), "loop started");

        let shared = Arc::clone(&self.playback);
        let injector = Arc::clone(&self.injector);
        let delay = self.config.inter_action_delay;
        let count = count.get();
        let handle = thread::spawn(move || {
            playback::run(&shared, &actions, count, injector.as_ref(), delay);
        });
        *self.playback_thread.lock() = Some(handle);

        let shared = Arc::clone(&self.playback);
        let key = key_for_named(self.config.cancel_key);
        let interval = self.config.cancel_poll_interval;
        thread::spawn(move || playback::watch_cancel(shared, key, interval));

        Ok(())
    }

    /// Ask a running loop to stop. Cooperative: the loop observes the flag
    /// at its next per-action check. Harmless when nothing is running.
    pub fn stop_loop(&self) {
        self.playback.request_cancel();
    }

    pub fn playback_state(&self) -> PlaybackState {
        self.playback.state()
    }

    pub fn progress(&self) -> Progress {
        self.playback.progress()
    }

    /// Why the last session ended in `Failed`, if it did.
    pub fn last_failure(&self) -> Option<String> {
        self.playback.failure()
    }
}

impl Default for Engine {
    fn default() -> Self {
        Engine::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{KeySpec, MouseButton};
    use crate::inject::NoopInjector;

    fn engine() -> Arc<Engine> {
        Arc::new(Engine::with_injector(
            EngineConfig::default(),
            Box::new(NoopInjector),
        ))
    }

    #[test]
    fn empty_sources_are_rejected() {
        let engine = engine();
        let none = Sources {
            mouse: false,
            keyboard: false,
        };
        assert_eq!(
            engine.start_capture(none),
            Err(EngineError::NoSourceSelected)
        );
        assert!(!engine.capturing());
    }

    #[test]
    fn capture_cannot_start_twice() {
        let engine = engine();
        engine.start_capture(Sources::all()).unwrap();
        assert_eq!(
            engine.start_capture(Sources::all()),
            Err(EngineError::AlreadyCapturing)
        );
        engine.stop_capture();
    }

    #[test]
    fn stop_capture_strips_the_stop_click_pair() {
        let engine = engine();
        engine
            .set_log_text("Move - 5, 5\nClick - 10, 10\nRelease - 10, 10\n")
            .unwrap();

        engine.start_capture(Sources { mouse: true, keyboard: false }).unwrap();
        engine.stop_capture();

        assert_eq!(engine.snapshot(), vec![Action::MouseMove { x: 5, y: 5 }]);
    }

    #[test]
    fn stop_capture_leaves_other_tails_alone() {
        let engine = engine();
        engine.set_log_text("Click - 1, 1\nMove - 10, 10\n").unwrap();

        engine.start_capture(Sources::all()).unwrap();
        engine.stop_capture();

        assert_eq!(engine.log_len(), 2);
    }

    #[test]
    fn stop_capture_is_idempotent() {
        let engine = engine();
        engine
            .set_log_text("Click - 1, 1\nRelease - 1, 1\nClick - 2, 2\nRelease - 2, 2\n")
            .unwrap();

        engine.start_capture(Sources::all()).unwrap();
        engine.stop_capture();
        // One pair stripped, the genuine one stays.
        assert_eq!(engine.log_len(), 2);

        engine.stop_capture();
        assert_eq!(engine.log_len(), 2);
    }

    #[test]
    fn stop_capture_on_empty_log_is_a_no_op() {
        let engine = engine();
        engine.start_capture(Sources::all()).unwrap();
        engine.stop_capture();
        assert_eq!(engine.log_len(), 0);
    }

    #[test]
    fn mutation_is_rejected_while_capturing() {
        let engine = engine();
        engine.set_log_text("Move - 1, 2\n").unwrap();
        engine.start_capture(Sources::all()).unwrap();

        assert_eq!(engine.clear_log(), Err(EngineError::ConcurrentMutation));
        assert_eq!(
            engine.set_log_text(""),
            Err(EngineError::ConcurrentMutation)
        );
        assert_eq!(engine.log_len(), 1);

        engine.stop_capture();
        engine.clear_log().unwrap();
        assert_eq!(engine.log_len(), 0);
    }

    #[test]
    fn log_text_round_trips_through_replace() {
        let engine = engine();
        let text = "Move - 120, 340\nClick - 120, 340\nKey Press - [Escape]\nKey Press - a\n";
        let skipped = engine.set_log_text(text).unwrap();
        assert_eq!(skipped, 0);
        assert_eq!(engine.log_text(), text);
        assert_eq!(
            engine.snapshot()[3],
            Action::KeyPress {
                key: KeySpec::Char('a')
            }
        );
    }

    #[test]
    fn replace_reports_skipped_lines() {
        let engine = engine();
        let skipped = engine
            .set_log_text("Move - 1, 1\nClick - 2, 2\nRelease - 2, 2\nbogus line\n")
            .unwrap();
        assert_eq!(skipped, 1);
        assert_eq!(engine.log_len(), 3);
    }

    #[test]
    fn snapshot_preserves_button_detail() {
        let engine = engine();
        engine.set_log_text("Click - 4, 5, right\n").unwrap();
        assert_eq!(
            engine.snapshot(),
            vec![Action::MouseClick {
                x: 4,
                y: 5,
                button: MouseButton::Right
            }]
        );
    }
}
