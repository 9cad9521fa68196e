//! Action data model shared by capture, the script format, and playback.

use serde::{Deserialize, Serialize};

/// One recorded input event. The order of actions in a log is the order
/// they replay in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Action {
    /// Pointer moved to an absolute screen position.
    MouseMove { x: u32, y: u32 },
    /// Button pressed at an absolute screen position.
    MouseClick { x: u32, y: u32, button: MouseButton },
    /// Button released at an absolute screen position.
    MouseRelease { x: u32, y: u32, button: MouseButton },
    /// One wheel unit up, pointer at (x, y).
    ScrollUp { x: u32, y: u32 },
    /// One wheel unit down, pointer at (x, y).
    ScrollDown { x: u32, y: u32 },
    /// A key was pressed.
    KeyPress { key: KeySpec },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// What a `KeyPress` carries: a printable character, a key we know by name,
/// or a raw virtual-key code for everything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeySpec {
    Char(char),
    Named(NamedKey),
    Raw(u32),
}

/// The symbolic keys the script format can name. Text names map through
/// this enumeration in both directions; nothing is ever reconstructed from
/// free-form text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NamedKey {
    Escape,
    Enter,
    Tab,
    Space,
    Backspace,
    Delete,
    Insert,
    Home,
    End,
    PageUp,
    PageDown,
    Up,
    Down,
    Left,
    Right,
    Shift,
    Control,
    Alt,
    Meta,
    CapsLock,
    F1,
    F2,
    F3,
    F4,
    F5,
    F6,
    F7,
    F8,
    F9,
    F10,
    F11,
    F12,
}

impl NamedKey {
    pub const ALL: [NamedKey; 32] = [
        NamedKey::Escape,
        NamedKey::Enter,
        NamedKey::Tab,
        NamedKey::Space,
        NamedKey::Backspace,
        NamedKey::Delete,
        NamedKey::Insert,
        NamedKey::Home,
        NamedKey::End,
        NamedKey::PageUp,
        NamedKey::PageDown,
        NamedKey::Up,
        NamedKey::Down,
        NamedKey::Left,
        NamedKey::Right,
        NamedKey::Shift,
        NamedKey::Control,
        NamedKey::Alt,
        NamedKey::Meta,
        NamedKey::CapsLock,
        NamedKey::F1,
        NamedKey::F2,
        NamedKey::F3,
        NamedKey::F4,
        NamedKey::F5,
        NamedKey::F6,
        NamedKey::F7,
        NamedKey::F8,
        NamedKey::F9,
        NamedKey::F10,
        NamedKey::F11,
        NamedKey::F12,
    ];

    /// The textual name used inside `[...]` in the script format.
    pub fn name(self) -> &'static str {
        match self {
            NamedKey::Escape => "Escape",
            NamedKey::Enter => "Enter",
            NamedKey::Tab => "Tab",
            NamedKey::Space => "Space",
            NamedKey::Backspace => "Backspace",
            NamedKey::Delete => "Delete",
            NamedKey::Insert => "Insert",
            NamedKey::Home => "Home",
            NamedKey::End => "End",
            NamedKey::PageUp => "PageUp",
            NamedKey::PageDown => "PageDown",
            NamedKey::Up => "Up",
            NamedKey::Down => "Down",
            NamedKey::Left => "Left",
            NamedKey::Right => "Right",
            NamedKey::Shift => "Shift",
            NamedKey::Control => "Control",
            NamedKey::Alt => "Alt",
            NamedKey::Meta => "Meta",
            NamedKey::CapsLock => "CapsLock",
            NamedKey::F1 => "F1",
            NamedKey::F2 => "F2",
            NamedKey::F3 => "F3",
            NamedKey::F4 => "F4",
            NamedKey::F5 => "F5",
            NamedKey::F6 => "F6",
            NamedKey::F7 => "F7",
            NamedKey::F8 => "F8",
            NamedKey::F9 => "F9",
            NamedKey::F10 => "F10",
            NamedKey::F11 => "F11",
            NamedKey::F12 => "F12",
        }
    }

    /// Reverse lookup, case-insensitive so hand-edited logs don't have to
    /// match our capitalization.
    pub fn from_name(name: &str) -> Option<NamedKey> {
        NamedKey::ALL
            .iter()
            .copied()
            .find(|k| k.name().eq_ignore_ascii_case(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_key_names_round_trip() {
        for key in NamedKey::ALL {
            assert_eq!(NamedKey::from_name(key.name()), Some(key));
        }
    }

    #[test]
    fn named_key_lookup_is_case_insensitive() {
        assert_eq!(NamedKey::from_name("escape"), Some(NamedKey::Escape));
        assert_eq!(NamedKey::from_name("PAGEUP"), Some(NamedKey::PageUp));
        assert_eq!(NamedKey::from_name("f11"), Some(NamedKey::F11));
        assert_eq!(NamedKey::from_name("NotAKey"), None);
    }

    #[test]
    fn action_serializes_to_tagged_json() {
        let action = Action::MouseClick {
            x: 10,
            y: 20,
            button: MouseButton::Left,
        };
        let json = serde_json::to_string(&action).unwrap();
        assert!(json.contains("\"kind\":\"mouse_click\""));
        assert!(json.contains("\"button\":\"left\""));
        let back: Action = serde_json::from_str(&json).unwrap();
        assert_eq!(back, action);
    }
}
