//! The editable text form of an action log: one action per line,
//! `"<Label> - <args>"`.
//!
//! ```text
//! Move - 120, 340
//! Click - 120, 340
//! Release - 120, 340
//! Scroll Up - 500, 500
//! Key Press - a
//! Key Press - <27>
//! Key Press - [Escape]
//! ```
//!
//! Serialization and parsing are exact inverses for every action the
//! serializer can produce, so a recorded log survives any number of
//! save/edit/load cycles.

use crate::action::{Action, KeySpec, MouseButton, NamedKey};
use crate::error::{EngineError, Result};
use tracing::debug;

/// Render one action as one line of script text.
pub fn serialize(action: &Action) -> String {
    match action {
        Action::MouseMove { x, y } => format!("Move - {x}, {y}"),
        Action::MouseClick { x, y, button } => click_line("Click", *x, *y, *button),
        Action::MouseRelease { x, y, button } => click_line("Release", *x, *y, *button),
        Action::ScrollUp { x, y } => format!("Scroll Up - {x}, {y}"),
        Action::ScrollDown { x, y } => format!("Scroll Down - {x}, {y}"),
        Action::KeyPress { key } => match key {
            KeySpec::Char(c) => format!("Key Press - {c}"),
            KeySpec::Named(k) => format!("Key Press - [{}]", k.name()),
            KeySpec::Raw(code) => format!("Key Press - <{code}>"),
        },
    }
}

// The primary button keeps the plain two-coordinate form; other buttons
// carry a third argument so they survive a round trip.
fn click_line(label: &str, x: u32, y: u32, button: MouseButton) -> String {
    match button {
        MouseButton::Left => format!("{label} - {x}, {y}"),
        MouseButton::Right => format!("{label} - {x}, {y}, right"),
        MouseButton::Middle => format!("{label} - {x}, {y}, middle"),
    }
}

/// Parse one line of script text back into an action.
///
/// Only the first `-` separates the label from the arguments; both sides
/// are trimmed, so hand-edited spacing is forgiven.
pub fn parse(line: &str) -> Result<Action> {
    let malformed = || EngineError::MalformedLine(line.trim().to_string());

    let (label, args) = line.split_once('-').ok_or_else(malformed)?;
    let label = label.trim();
    let args = args.trim();

    match label {
        "Move" => {
            let (x, y) = coords(args).ok_or_else(malformed)?;
            Ok(Action::MouseMove { x, y })
        }
        "Click" => {
            let (x, y, button) = coords_with_button(args).ok_or_else(malformed)?;
            Ok(Action::MouseClick { x, y, button })
        }
        "Release" => {
            let (x, y, button) = coords_with_button(args).ok_or_else(malformed)?;
            Ok(Action::MouseRelease { x, y, button })
        }
        "Scroll Up" => {
            let (x, y) = coords(args).ok_or_else(malformed)?;
            Ok(Action::ScrollUp { x, y })
        }
        "Scroll Down" => {
            let (x, y) = coords(args).ok_or_else(malformed)?;
            Ok(Action::ScrollDown { x, y })
        }
        "Key Press" => {
            let key = key_spec(args).ok_or_else(malformed)?;
            Ok(Action::KeyPress { key })
        }
        _ => Err(malformed()),
    }
}

/// Parse a whole multi-line log. Empty lines are ignored; malformed lines
/// are skipped and counted rather than aborting the parse.
pub fn parse_log(text: &str) -> (Vec<Action>, usize) {
    let mut actions = Vec::new();
    let mut skipped = 0;

    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }
        match parse(line) {
            Ok(action) => actions.push(action),
            Err(e) => {
                debug!("skipping unparseable log line: {e}");
                skipped += 1;
            }
        }
    }

    (actions, skipped)
}

fn coords(args: &str) -> Option<(u32, u32)> {
    let mut parts = args.split(',');
    let x = parts.next()?.trim().parse().ok()?;
    let y = parts.next()?.trim().parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((x, y))
}

fn coords_with_button(args: &str) -> Option<(u32, u32, MouseButton)> {
    let mut parts = args.split(',');
    let x = parts.next()?.trim().parse().ok()?;
    let y = parts.next()?.trim().parse().ok()?;
    let button = match parts.next().map(str::trim) {
        None => MouseButton::Left,
        Some("right") => MouseButton::Right,
        Some("middle") => MouseButton::Middle,
        Some("left") => MouseButton::Left,
        Some(_) => return None,
    };
    if parts.next().is_some() {
        return None;
    }
    Some((x, y, button))
}

fn key_spec(args: &str) -> Option<KeySpec> {
    if args.len() > 1 && args.starts_with('<') && args.ends_with('>') {
        let code = args[1..args.len() - 1].trim().parse().ok()?;
        return Some(KeySpec::Raw(code));
    }
    if args.len() > 1 && args.starts_with('[') && args.ends_with(']') {
        let name = args[1..args.len() - 1].trim();
        return NamedKey::from_name(name).map(KeySpec::Named);
    }
    let mut chars = args.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if !c.is_control() => Some(KeySpec::Char(c)),
        _ => None,
    }
}
