//! Process-wide OS input hook.
//!
//! `rdev::listen` installs a global hook that cannot be torn down, so the
//! hook thread is spawned once per process and lives for its lifetime.
//! Everything session-scoped happens a layer up: capture listeners and the
//! cancel watcher attach channels here and detach them when done, and raw
//! events arriving while nothing is attached are dropped on the floor.

use crossbeam_channel::Sender;
use parking_lot::Mutex;
use std::sync::{Arc, OnceLock};
use std::thread;
use tracing::error;

/// A raw OS event, stripped down to what capture and cancellation need.
#[derive(Debug, Clone)]
pub(crate) enum RawInput {
    Move { x: f64, y: f64 },
    Button { button: rdev::Button, pressed: bool },
    Wheel { delta: i64 },
    Key { key: rdev::Key, text: Option<String> },
}

#[derive(Default)]
struct Slots {
    mouse: Option<Sender<RawInput>>,
    keyboard: Option<Sender<RawInput>>,
    cancel: Option<(rdev::Key, Sender<()>)>,
}

pub(crate) struct InputHook {
    slots: Arc<Mutex<Slots>>,
}

static HOOK: OnceLock<InputHook> = OnceLock::new();

impl InputHook {
    /// The hook, spawning its listen thread on first use.
    pub(crate) fn global() -> &'static InputHook {
        HOOK.get_or_init(|| {
            let slots = Arc::new(Mutex::new(Slots::default()));
            let tap = slots.clone();
            thread::spawn(move || {
                if let Err(e) = rdev::listen(move |event| dispatch(&tap, event)) {
                    error!("global input hook unavailable: {e:?}");
                }
            });
            InputHook { slots }
        })
    }

    pub(crate) fn attach_mouse(&self, tx: Sender<RawInput>) {
        self.slots.lock().mouse = Some(tx);
    }

    pub(crate) fn attach_keyboard(&self, tx: Sender<RawInput>) {
        self.slots.lock().keyboard = Some(tx);
    }

    pub(crate) fn attach_cancel(&self, key: rdev::Key, tx: Sender<()>) {
        self.slots.lock().cancel = Some((key, tx));
    }

    pub(crate) fn detach_capture(&self) {
        let mut slots = self.slots.lock();
        slots.mouse = None;
        slots.keyboard = None;
    }

    pub(crate) fn detach_cancel(&self) {
        self.slots.lock().cancel = None;
    }
}

fn dispatch(slots: &Mutex<Slots>, event: rdev::Event) {
    let slots = slots.lock();
    match event.event_type {
        rdev::EventType::MouseMove { x, y } => {
            if let Some(tx) = &slots.mouse {
                let _ = tx.send(RawInput::Move { x, y });
            }
        }
        rdev::EventType::ButtonPress(button) => {
            if let Some(tx) = &slots.mouse {
                let _ = tx.send(RawInput::Button {
                    button,
                    pressed: true,
                });
            }
        }
        rdev::EventType::ButtonRelease(button) => {
            if let Some(tx) = &slots.mouse {
                let _ = tx.send(RawInput::Button {
                    button,
                    pressed: false,
                });
            }
        }
        rdev::EventType::Wheel { delta_y, .. } => {
            if delta_y != 0 {
                if let Some(tx) = &slots.mouse {
                    let _ = tx.send(RawInput::Wheel { delta: delta_y });
                }
            }
        }
        rdev::EventType::KeyPress(key) => {
            if let Some((cancel_key, tx)) = &slots.cancel {
                if *cancel_key == key {
                    let _ = tx.try_send(());
                }
            }
            if let Some(tx) = &slots.keyboard {
                let _ = tx.send(RawInput::Key {
                    key,
                    text: event.name.clone(),
                });
            }
        }
        // Key releases are not part of the recorded model.
        rdev::EventType::KeyRelease(_) => {}
    }
}
