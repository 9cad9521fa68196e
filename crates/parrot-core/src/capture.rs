//! Capture: one listener thread per enabled device source, all appending to
//! the shared log under its single lock.

use crate::action::{Action, KeySpec, MouseButton, NamedKey};
use crate::hook::{InputHook, RawInput};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info};

const LISTENER_POLL: Duration = Duration::from_millis(50);

/// Which devices a capture session listens to. Read once at start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sources {
    pub mouse: bool,
    pub keyboard: bool,
}

impl Sources {
    pub fn all() -> Self {
        Sources {
            mouse: true,
            keyboard: true,
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.mouse && !self.keyboard
    }
}

impl Default for Sources {
    fn default() -> Self {
        Sources::all()
    }
}

/// A running capture session: the listener threads and their stop flag.
pub(crate) struct CaptureSession {
    stop: Arc<AtomicBool>,
    threads: Vec<JoinHandle<()>>,
}

impl CaptureSession {
    pub(crate) fn start(log: Arc<Mutex<Vec<Action>>>, sources: Sources) -> CaptureSession {
        let stop = Arc::new(AtomicBool::new(false));
        let hook = InputHook::global();
        let mut threads = Vec::new();

        if sources.mouse {
            let (tx, rx) = crossbeam_channel::unbounded();
            hook.attach_mouse(tx);
            let log = log.clone();
            let stop = stop.clone();
            threads.push(thread::spawn(move || mouse_listener(rx, log, stop)));
        }

        if sources.keyboard {
            let (tx, rx) = crossbeam_channel::unbounded();
            hook.attach_keyboard(tx);
            let log = log.clone();
            let stop = stop.clone();
            threads.push(thread::spawn(move || keyboard_listener(rx, log, stop)));
        }

        info!(
            mouse = sources.mouse,
            keyboard = sources.keyboard,
            "capture started"
        );
        CaptureSession { stop, threads }
    }

    /// Detach from the hook, then block until every listener thread has
    /// drained its channel and exited. After this returns nothing can
    /// append to the log.
    pub(crate) fn stop(mut self) {
        InputHook::global().detach_capture();
        self.stop.store(true, Ordering::SeqCst);
        for t in self.threads.drain(..) {
            let _ = t.join();
        }
        info!("capture stopped");
    }
}

fn mouse_listener(rx: Receiver<RawInput>, log: Arc<Mutex<Vec<Action>>>, stop: Arc<AtomicBool>) {
    // Clicks and scrolls carry the last position the hook reported.
    let mut pos = (0u32, 0u32);
    loop {
        match rx.recv_timeout(LISTENER_POLL) {
            Ok(raw) => {
                if let Some(action) = mouse_action(raw, &mut pos) {
                    log.lock().push(action);
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                if stop.load(Ordering::SeqCst) {
                    break;
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

fn keyboard_listener(rx: Receiver<RawInput>, log: Arc<Mutex<Vec<Action>>>, stop: Arc<AtomicBool>) {
    loop {
        match rx.recv_timeout(LISTENER_POLL) {
            Ok(RawInput::Key { key, text }) => match key_spec(key, text) {
                Some(spec) => log.lock().push(Action::KeyPress { key: spec }),
                None => debug!("ignoring unrepresentable key {key:?}"),
            },
            Ok(_) => {}
            Err(RecvTimeoutError::Timeout) => {
                if stop.load(Ordering::SeqCst) {
                    break;
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

fn mouse_action(raw: RawInput, pos: &mut (u32, u32)) -> Option<Action> {
    match raw {
        RawInput::Move { x, y } => {
            // Positions left of or above the primary display clamp to zero.
            *pos = (x.max(0.0).round() as u32, y.max(0.0).round() as u32);
            Some(Action::MouseMove {
                x: pos.0,
                y: pos.1,
            })
        }
        RawInput::Button { button, pressed } => {
            let button = button_from_rdev(button)?;
            let (x, y) = *pos;
            Some(if pressed {
                Action::MouseClick { x, y, button }
            } else {
                Action::MouseRelease { x, y, button }
            })
        }
        RawInput::Wheel { delta } => {
            let (x, y) = *pos;
            Some(if delta > 0 {
                Action::ScrollUp { x, y }
            } else {
                Action::ScrollDown { x, y }
            })
        }
        RawInput::Key { .. } => None,
    }
}

fn button_from_rdev(button: rdev::Button) -> Option<MouseButton> {
    match button {
        rdev::Button::Left => Some(MouseButton::Left),
        rdev::Button::Right => Some(MouseButton::Right),
        rdev::Button::Middle => Some(MouseButton::Middle),
        rdev::Button::Unknown(_) => None,
    }
}

fn key_spec(key: rdev::Key, text: Option<String>) -> Option<KeySpec> {
    if let Some(named) = named_from_key(key) {
        return Some(KeySpec::Named(named));
    }
    if let Some(text) = text {
        let mut chars = text.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            if !c.is_control() {
                return Some(KeySpec::Char(c));
            }
        }
    }
    match key {
        rdev::Key::Unknown(code) => Some(KeySpec::Raw(code)),
        _ => None,
    }
}

fn named_from_key(key: rdev::Key) -> Option<NamedKey> {
    let named = match key {
        rdev::Key::Escape => NamedKey::Escape,
        rdev::Key::Return | rdev::Key::KpReturn => NamedKey::Enter,
        rdev::Key::Tab => NamedKey::Tab,
        rdev::Key::Space => NamedKey::Space,
        rdev::Key::Backspace => NamedKey::Backspace,
        rdev::Key::Delete | rdev::Key::KpDelete => NamedKey::Delete,
        rdev::Key::Insert => NamedKey::Insert,
        rdev::Key::Home => NamedKey::Home,
        rdev::Key::End => NamedKey::End,
        rdev::Key::PageUp => NamedKey::PageUp,
        rdev::Key::PageDown => NamedKey::PageDown,
        rdev::Key::UpArrow => NamedKey::Up,
        rdev::Key::DownArrow => NamedKey::Down,
        rdev::Key::LeftArrow => NamedKey::Left,
        rdev::Key::RightArrow => NamedKey::Right,
        rdev::Key::ShiftLeft | rdev::Key::ShiftRight => NamedKey::Shift,
        rdev::Key::ControlLeft | rdev::Key::ControlRight => NamedKey::Control,
        rdev::Key::Alt | rdev::Key::AltGr => NamedKey::Alt,
        rdev::Key::MetaLeft | rdev::Key::MetaRight => NamedKey::Meta,
        rdev::Key::CapsLock => NamedKey::CapsLock,
        rdev::Key::F1 => NamedKey::F1,
        rdev::Key::F2 => NamedKey::F2,
        rdev::Key::F3 => NamedKey::F3,
        rdev::Key::F4 => NamedKey::F4,
        rdev::Key::F5 => NamedKey::F5,
        rdev::Key::F6 => NamedKey::F6,
        rdev::Key::F7 => NamedKey::F7,
        rdev::Key::F8 => NamedKey::F8,
        rdev::Key::F9 => NamedKey::F9,
        rdev::Key::F10 => NamedKey::F10,
        rdev::Key::F11 => NamedKey::F11,
        rdev::Key::F12 => NamedKey::F12,
        _ => return None,
    };
    Some(named)
}
