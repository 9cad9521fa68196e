//! Playback state machine tests, driven through injector doubles so no
//! real input is synthesized.

use parking_lot::Mutex;
use parrot_core::prelude::*;
use parrot_core::InjectError;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Records every action it is asked to inject.
struct CountingInjector {
    seen: Arc<Mutex<Vec<Action>>>,
}

impl Injector for CountingInjector {
    fn inject(&self, action: &Action) -> std::result::Result<(), InjectError> {
        self.seen.lock().push(action.clone());
        Ok(())
    }
}

/// Fails every injection, as if input control were unavailable.
struct BrokenInjector;

impl Injector for BrokenInjector {
    fn inject(&self, _action: &Action) -> std::result::Result<(), InjectError> {
        Err(InjectError {
            action: "test",
            reason: "permission denied".into(),
        })
    }
}

fn fast_config() -> EngineConfig {
    EngineConfig {
        inter_action_delay: Duration::from_millis(2),
        ..EngineConfig::default()
    }
}

fn counting_engine(config: EngineConfig) -> (Arc<Engine>, Arc<Mutex<Vec<Action>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let engine = Arc::new(Engine::with_injector(
        config,
        Box::new(CountingInjector { seen: seen.clone() }),
    ));
    (engine, seen)
}

fn count(n: u32) -> NonZeroU32 {
    NonZeroU32::new(n).unwrap()
}

fn wait_terminal(engine: &Engine, timeout: Duration) -> PlaybackState {
    let deadline = Instant::now() + timeout;
    loop {
        let state = engine.playback_state();
        if state.is_terminal() {
            return state;
        }
        assert!(
            Instant::now() < deadline,
            "playback still {state:?} after {timeout:?}"
        );
        thread::sleep(Duration::from_millis(2));
    }
}

#[test]
fn completes_all_loops_in_log_order() {
    let (engine, seen) = counting_engine(fast_config());
    engine
        .set_log_text("Move - 1, 1\nClick - 1, 1\nRelease - 1, 1\n")
        .unwrap();

    engine.start_loop(count(3)).unwrap();
    assert_eq!(wait_terminal(&engine, Duration::from_secs(5)), PlaybackState::Completed);

    let seen = seen.lock();
    assert_eq!(seen.len(), 9);
    // Each loop replays the full log in order.
    for chunk in seen.chunks(3) {
        assert!(matches!(chunk[0], Action::MouseMove { .. }));
        assert!(matches!(chunk[1], Action::MouseClick { .. }));
        assert!(matches!(chunk[2], Action::MouseRelease { .. }));
    }

    let progress = engine.progress();
    assert_eq!(progress.current_loop, 3);
    assert_eq!(progress.remaining_loops, 0);
}

#[test]
fn empty_log_completes_every_iteration_immediately() {
    let (engine, seen) = counting_engine(fast_config());

    let started = Instant::now();
    engine.start_loop(count(3)).unwrap();
    assert_eq!(wait_terminal(&engine, Duration::from_secs(2)), PlaybackState::Completed);

    assert!(started.elapsed() < Duration::from_secs(1));
    assert!(seen.lock().is_empty());
    assert_eq!(engine.progress().current_loop, 3);
    assert_eq!(engine.progress().remaining_loops, 0);
}

#[test]
fn progress_is_monotonic_and_consistent() {
    let (engine, _seen) = counting_engine(EngineConfig {
        inter_action_delay: Duration::from_millis(5),
        ..EngineConfig::default()
    });
    engine.set_log_text("Move - 1, 1\nMove - 2, 2\n").unwrap();

    let total = 5;
    engine.start_loop(count(total)).unwrap();

    let mut last = 0;
    while !engine.playback_state().is_terminal() {
        let progress = engine.progress();
        assert!(
            progress.current_loop >= last,
            "current loop went backwards: {last} -> {}",
            progress.current_loop
        );
        assert_eq!(progress.remaining_loops, total - progress.current_loop);
        last = progress.current_loop;
        thread::sleep(Duration::from_millis(1));
    }

    assert_eq!(wait_terminal(&engine, Duration::from_secs(1)), PlaybackState::Completed);
    assert_eq!(engine.progress().current_loop, total);
}

#[test]
fn stop_loop_cancels_mid_loop_within_the_bound() {
    let (engine, seen) = counting_engine(EngineConfig {
        inter_action_delay: Duration::from_millis(20),
        ..EngineConfig::default()
    });
    let text = "Move - 1, 1\n".repeat(200);
    engine.set_log_text(&text).unwrap();

    engine.start_loop(count(1)).unwrap();
    thread::sleep(Duration::from_millis(50));

    let asked = Instant::now();
    engine.stop_loop();
    let state = wait_terminal(&engine, Duration::from_secs(1));

    assert_eq!(state, PlaybackState::Cancelled);
    // One inter-action delay plus one poll interval, with slack for CI.
    assert!(asked.elapsed() < Duration::from_millis(500));
    assert!(seen.lock().len() < 200);
}

#[test]
fn log_mutation_is_rejected_while_running() {
    let (engine, _seen) = counting_engine(EngineConfig {
        inter_action_delay: Duration::from_millis(10),
        ..EngineConfig::default()
    });
    let text = "Move - 1, 1\n".repeat(50);
    engine.set_log_text(&text).unwrap();

    engine.start_loop(count(5)).unwrap();
    thread::sleep(Duration::from_millis(20));
    assert_eq!(engine.playback_state(), PlaybackState::Running);

    assert_eq!(engine.clear_log(), Err(EngineError::ConcurrentMutation));
    assert_eq!(
        engine.set_log_text("Move - 9, 9\n"),
        Err(EngineError::ConcurrentMutation)
    );
    assert_eq!(engine.log_len(), 50);

    engine.stop_loop();
    wait_terminal(&engine, Duration::from_secs(2));

    // Idle again: mutation is allowed.
    engine.clear_log().unwrap();
    assert_eq!(engine.log_len(), 0);
}

#[test]
fn second_start_is_rejected_while_running() {
    let (engine, _seen) = counting_engine(EngineConfig {
        inter_action_delay: Duration::from_millis(10),
        ..EngineConfig::default()
    });
    engine.set_log_text(&"Move - 1, 1\n".repeat(50)).unwrap();

    engine.start_loop(count(2)).unwrap();
    assert_eq!(
        engine.start_loop(count(1)),
        Err(EngineError::AlreadyRunning)
    );
    assert_eq!(
        engine.start_capture(Sources::all()),
        Err(EngineError::AlreadyRunning)
    );

    engine.stop_loop();
    wait_terminal(&engine, Duration::from_secs(2));
}

#[test]
fn a_finished_engine_can_loop_again() {
    let (engine, seen) = counting_engine(fast_config());
    engine.set_log_text("Move - 1, 1\n").unwrap();

    engine.start_loop(count(2)).unwrap();
    assert_eq!(wait_terminal(&engine, Duration::from_secs(5)), PlaybackState::Completed);

    engine.start_loop(count(1)).unwrap();
    assert_eq!(wait_terminal(&engine, Duration::from_secs(5)), PlaybackState::Completed);

    assert_eq!(seen.lock().len(), 3);
    assert_eq!(engine.progress().current_loop, 1);
}

#[test]
fn persistent_injection_failure_fails_the_session() {
    let engine = Arc::new(Engine::with_injector(
        fast_config(),
        Box::new(BrokenInjector),
    ));
    engine.set_log_text(&"Move - 1, 1\n".repeat(10)).unwrap();

    engine.start_loop(count(1)).unwrap();
    assert_eq!(wait_terminal(&engine, Duration::from_secs(5)), PlaybackState::Failed);

    let failure = engine.last_failure().expect("failure message");
    assert!(failure.contains("injection"));
}
