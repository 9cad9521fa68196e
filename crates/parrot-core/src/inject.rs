//! OS input injection for playback.
//!
//! The `Injector` trait is the seam between the playback loop and the
//! operating system, so playback logic can be exercised without moving the
//! real pointer.

use crate::action::{Action, KeySpec, MouseButton, NamedKey};
use std::thread;
use std::time::Duration;
use thiserror::Error;

/// Substituted for characters the key table cannot type.
const FALLBACK_CHAR: char = '?';

#[derive(Debug, Clone, Error)]
#[error("failed to inject {action}: {reason}")]
pub struct InjectError {
    pub action: &'static str,
    pub reason: String,
}

pub trait Injector: Send + Sync {
    fn inject(&self, action: &Action) -> Result<(), InjectError>;
}

/// Real injection through `rdev::simulate`.
pub struct RdevInjector {
    press_gap: Duration,
}

impl RdevInjector {
    pub fn new() -> Self {
        RdevInjector {
            press_gap: Duration::from_millis(10),
        }
    }

    fn simulate(&self, action: &'static str, event: &rdev::EventType) -> Result<(), InjectError> {
        rdev::simulate(event).map_err(|e| InjectError {
            action,
            reason: format!("{e:?}"),
        })
    }

    fn move_to(&self, x: u32, y: u32) -> Result<(), InjectError> {
        self.simulate(
            "move",
            &rdev::EventType::MouseMove {
                x: x as f64,
                y: y as f64,
            },
        )
    }

    fn tap_key(&self, action: &'static str, key: rdev::Key) -> Result<(), InjectError> {
        self.simulate(action, &rdev::EventType::KeyPress(key))?;
        thread::sleep(self.press_gap);
        self.simulate(action, &rdev::EventType::KeyRelease(key))
    }

    fn type_char(&self, c: char) -> Result<(), InjectError> {
        let (key, shift) = key_for_char(c)
            .or_else(|| key_for_char(FALLBACK_CHAR))
            .unwrap_or((rdev::Key::Slash, true));
        if shift {
            self.simulate("key press", &rdev::EventType::KeyPress(rdev::Key::ShiftLeft))?;
            let tapped = self.tap_key("key press", key);
            let released = self.simulate(
                "key press",
                &rdev::EventType::KeyRelease(rdev::Key::ShiftLeft),
            );
            tapped.and(released)
        } else {
            self.tap_key("key press", key)
        }
    }
}

impl Default for RdevInjector {
    fn default() -> Self {
        RdevInjector::new()
    }
}

impl Injector for RdevInjector {
    fn inject(&self, action: &Action) -> Result<(), InjectError> {
        match action {
            Action::MouseMove { x, y } => self.move_to(*x, *y),
            Action::MouseClick { x, y, button } => {
                self.move_to(*x, *y)?;
                self.simulate(
                    "click",
                    &rdev::EventType::ButtonPress(button_to_rdev(*button)),
                )
            }
            Action::MouseRelease { x, y, button } => {
                self.move_to(*x, *y)?;
                self.simulate(
                    "release",
                    &rdev::EventType::ButtonRelease(button_to_rdev(*button)),
                )
            }
            Action::ScrollUp { x, y } => {
                self.move_to(*x, *y)?;
                self.simulate(
                    "scroll up",
                    &rdev::EventType::Wheel {
                        delta_x: 0,
                        delta_y: 1,
                    },
                )
            }
            Action::ScrollDown { x, y } => {
                self.move_to(*x, *y)?;
                self.simulate(
                    "scroll down",
                    &rdev::EventType::Wheel {
                        delta_x: 0,
                        delta_y: -1,
                    },
                )
            }
            Action::KeyPress { key } => match key {
                KeySpec::Raw(code) => self.tap_key("key press", rdev::Key::Unknown(*code)),
                KeySpec::Named(named) => self.tap_key("key press", key_for_named(*named)),
                KeySpec::Char(c) => self.type_char(*c),
            },
        }
    }
}

/// Injects nothing. Used for dry runs and by playback tests.
pub struct NoopInjector;

impl Injector for NoopInjector {
    fn inject(&self, _action: &Action) -> Result<(), InjectError> {
        Ok(())
    }
}

fn button_to_rdev(button: MouseButton) -> rdev::Button {
    match button {
        MouseButton::Left => rdev::Button::Left,
        MouseButton::Right => rdev::Button::Right,
        MouseButton::Middle => rdev::Button::Middle,
    }
}

pub(crate) fn key_for_named(named: NamedKey) -> rdev::Key {
    match named {
        NamedKey::Escape => rdev::Key::Escape,
        NamedKey::Enter => rdev::Key::Return,
        NamedKey::Tab => rdev::Key::Tab,
        NamedKey::Space => rdev::Key::Space,
        NamedKey::Backspace => rdev::Key::Backspace,
        NamedKey::Delete => rdev::Key::Delete,
        NamedKey::Insert => rdev::Key::Insert,
        NamedKey::Home => rdev::Key::Home,
        NamedKey::End => rdev::Key::End,
        NamedKey::PageUp => rdev::Key::PageUp,
        NamedKey::PageDown => rdev::Key::PageDown,
        NamedKey::Up => rdev::Key::UpArrow,
        NamedKey::Down => rdev::Key::DownArrow,
        NamedKey::Left => rdev::Key::LeftArrow,
        NamedKey::Right => rdev::Key::RightArrow,
        NamedKey::Shift => rdev::Key::ShiftLeft,
        NamedKey::Control => rdev::Key::ControlLeft,
        NamedKey::Alt => rdev::Key::Alt,
        NamedKey::Meta => rdev::Key::MetaLeft,
        NamedKey::CapsLock => rdev::Key::CapsLock,
        NamedKey::F1 => rdev::Key::F1,
        NamedKey::F2 => rdev::Key::F2,
        NamedKey::F3 => rdev::Key::F3,
        NamedKey::F4 => rdev::Key::F4,
        NamedKey::F5 => rdev::Key::F5,
        NamedKey::F6 => rdev::Key::F6,
        NamedKey::F7 => rdev::Key::F7,
        NamedKey::F8 => rdev::Key::F8,
        NamedKey::F9 => rdev::Key::F9,
        NamedKey::F10 => rdev::Key::F10,
        NamedKey::F11 => rdev::Key::F11,
        NamedKey::F12 => rdev::Key::F12,
    }
}

/// US-layout character table: which key to press, and whether shift is held.
fn key_for_char(c: char) -> Option<(rdev::Key, bool)> {
    use rdev::Key::*;

    Some(match c {
        'a' | 'A' => (KeyA, c.is_uppercase()),
        'b' | 'B' => (KeyB, c.is_uppercase()),
        'c' | 'C' => (KeyC, c.is_uppercase()),
        'd' | 'D' => (KeyD, c.is_uppercase()),
        'e' | 'E' => (KeyE, c.is_uppercase()),
        'f' | 'F' => (KeyF, c.is_uppercase()),
        'g' | 'G' => (KeyG, c.is_uppercase()),
        'h' | 'H' => (KeyH, c.is_uppercase()),
        'i' | 'I' => (KeyI, c.is_uppercase()),
        'j' | 'J' => (KeyJ, c.is_uppercase()),
        'k' | 'K' => (KeyK, c.is_uppercase()),
        'l' | 'L' => (KeyL, c.is_uppercase()),
        'm' | 'M' => (KeyM, c.is_uppercase()),
        'n' | 'N' => (KeyN, c.is_uppercase()),
        'o' | 'O' => (KeyO, c.is_uppercase()),
        'p' | 'P' => (KeyP, c.is_uppercase()),
        'q' | 'Q' => (KeyQ, c.is_uppercase()),
        'r' | 'R' => (KeyR, c.is_uppercase()),
        's' | 'S' => (KeyS, c.is_uppercase()),
        't' | 'T' => (KeyT, c.is_uppercase()),
        'u' | 'U' => (KeyU, c.is_uppercase()),
        'v' | 'V' => (KeyV, c.is_uppercase()),
        'w' | 'W' => (KeyW, c.is_uppercase()),
        'x' | 'X' => (KeyX, c.is_uppercase()),
        'y' | 'Y' => (KeyY, c.is_uppercase()),
        'z' | 'Z' => (KeyZ, c.is_uppercase()),
        '0' | ')' => (Num0, c == ')'),
        '1' | '!' => (Num1, c == '!'),
        '2' | '@' => (Num2, c == '@'),
        '3' | '#' => (Num3, c == '#'),
        '4' | '$' => (Num4, c == '$'),
        '5' | '%' => (Num5, c == '%'),
        '6' | '^' => (Num6, c == '^'),
        '7' | '&' => (Num7, c == '&'),
        '8' | '*' => (Num8, c == '*'),
        '9' | '(' => (Num9, c == '('),
        ' ' => (Space, false),
        '\n' => (Return, false),
        '\t' => (Tab, false),
        '-' | '_' => (Minus, c == '_'),
        '=' | '+' => (Equal, c == '+'),
        '[' | '{' => (LeftBracket, c == '{'),
        ']' | '}' => (RightBracket, c == '}'),
        '\\' | '|' => (BackSlash, c == '|'),
        ';' | ':' => (SemiColon, c == ':'),
        '\'' | '"' => (Quote, c == '"'),
        ',' | '<' => (Comma, c == '<'),
        '.' | '>' => (Dot, c == '>'),
        '/' | '?' => (Slash, c == '?'),
        '`' | '~' => (BackQuote, c == '~'),
        _ => return None,
    })
}
