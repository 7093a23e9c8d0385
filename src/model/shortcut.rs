//! Keyboard shortcut value type
//!
//! Renders and parses as `Ctrl+Shift+F1`. Modifier order in the string form
//! is fixed (Ctrl, Alt, Shift) so equal shortcuts always print the same.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::fmt;
use std::str::FromStr;

/// A key plus modifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyboardShortcut {
    pub key: KeyCode,
    pub modifiers: KeyModifiers,
}

impl KeyboardShortcut {
    pub fn new(key: KeyCode, modifiers: KeyModifiers) -> Self {
        Self {
            key,
            modifiers: modifiers & (KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SHIFT),
        }
    }

    pub fn key(key: KeyCode) -> Self {
        Self::new(key, KeyModifiers::NONE)
    }

    /// Check whether a key event triggers this shortcut
    pub fn matches(&self, event: &KeyEvent) -> bool {
        *self == Self::from(*event)
    }
}

impl From<KeyEvent> for KeyboardShortcut {
    fn from(event: KeyEvent) -> Self {
        // Terminals report shifted letters as uppercase chars; fold them so
        // "Shift+A" and "A" with SHIFT compare equal.
        let key = match event.code {
            KeyCode::Char(c) => KeyCode::Char(c.to_ascii_lowercase()),
            other => other,
        };
        Self::new(key, event.modifiers)
    }
}

fn key_name(key: KeyCode) -> String {
    match key {
        KeyCode::Char(' ') => "Space".to_string(),
        KeyCode::Char(c) => c.to_ascii_uppercase().to_string(),
        KeyCode::F(n) => format!("F{n}"),
        KeyCode::Enter => "Enter".to_string(),
        KeyCode::Esc => "Esc".to_string(),
        KeyCode::Tab => "Tab".to_string(),
        KeyCode::Backspace => "Backspace".to_string(),
        KeyCode::Delete => "Delete".to_string(),
        KeyCode::Insert => "Insert".to_string(),
        KeyCode::Home => "Home".to_string(),
        KeyCode::End => "End".to_string(),
        KeyCode::PageUp => "PageUp".to_string(),
        KeyCode::PageDown => "PageDown".to_string(),
        KeyCode::Up => "Up".to_string(),
        KeyCode::Down => "Down".to_string(),
        KeyCode::Left => "Left".to_string(),
        KeyCode::Right => "Right".to_string(),
        other => format!("{other:?}"),
    }
}

fn parse_key(name: &str) -> Option<KeyCode> {
    let lower = name.to_ascii_lowercase();
    let key = match lower.as_str() {
        "space" => KeyCode::Char(' '),
        "enter" | "return" => KeyCode::Enter,
        "esc" | "escape" => KeyCode::Esc,
        "tab" => KeyCode::Tab,
        "backspace" => KeyCode::Backspace,
        "delete" | "del" => KeyCode::Delete,
        "insert" | "ins" => KeyCode::Insert,
        "home" => KeyCode::Home,
        "end" => KeyCode::End,
        "pageup" => KeyCode::PageUp,
        "pagedown" => KeyCode::PageDown,
        "up" => KeyCode::Up,
        "down" => KeyCode::Down,
        "left" => KeyCode::Left,
        "right" => KeyCode::Right,
        _ => {
            let mut chars = lower.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => KeyCode::Char(c),
                (Some('f'), Some(_)) => KeyCode::F(lower[1..].parse().ok()?),
                _ => return None,
            }
        }
    };
    Some(key)
}

impl fmt::Display for KeyboardShortcut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.modifiers.contains(KeyModifiers::CONTROL) {
            f.write_str("Ctrl+")?;
        }
        if self.modifiers.contains(KeyModifiers::ALT) {
            f.write_str("Alt+")?;
        }
        if self.modifiers.contains(KeyModifiers::SHIFT) {
            f.write_str("Shift+")?;
        }
        f.write_str(&key_name(self.key))
    }
}

/// Error returned when a shortcut string cannot be parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseShortcutError(pub String);

impl fmt::Display for ParseShortcutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid keyboard shortcut: {:?}", self.0)
    }
}

impl std::error::Error for ParseShortcutError {}

impl FromStr for KeyboardShortcut {
    type Err = ParseShortcutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseShortcutError(s.to_string());
        let mut parts: Vec<&str> = s.split('+').map(str::trim).collect();
        // "Ctrl++" means the plus key itself
        if s.ends_with("++") {
            parts.pop();
            parts.pop();
            parts.push("+");
        }
        let key_part = parts.pop().filter(|p| !p.is_empty()).ok_or_else(err)?;

        let mut modifiers = KeyModifiers::NONE;
        for part in parts {
            match part.to_ascii_lowercase().as_str() {
                "ctrl" | "control" => modifiers |= KeyModifiers::CONTROL,
                "alt" => modifiers |= KeyModifiers::ALT,
                "shift" => modifiers |= KeyModifiers::SHIFT,
                _ => return Err(err()),
            }
        }

        let key = parse_key(key_part).ok_or_else(err)?;
        Ok(Self::new(key, modifiers))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_orders_modifiers() {
        let shortcut = KeyboardShortcut::new(
            KeyCode::F(1),
            KeyModifiers::SHIFT | KeyModifiers::CONTROL,
        );
        assert_eq!(shortcut.to_string(), "Ctrl+Shift+F1");
    }

    #[test]
    fn test_parse() {
        let shortcut: KeyboardShortcut = "ctrl+alt+k".parse().unwrap();
        assert_eq!(shortcut.key, KeyCode::Char('k'));
        assert_eq!(shortcut.modifiers, KeyModifiers::CONTROL | KeyModifiers::ALT);
        assert_eq!(shortcut.to_string(), "Ctrl+Alt+K");

        let plus: KeyboardShortcut = "Ctrl++".parse().unwrap();
        assert_eq!(plus.key, KeyCode::Char('+'));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("Hyper+X".parse::<KeyboardShortcut>().is_err());
        assert!("".parse::<KeyboardShortcut>().is_err());
        assert!("Ctrl+".parse::<KeyboardShortcut>().is_err());
    }

    #[test]
    fn test_matches_folds_shifted_letters() {
        let shortcut: KeyboardShortcut = "Shift+A".parse().unwrap();
        let event = KeyEvent::new(KeyCode::Char('A'), KeyModifiers::SHIFT);
        assert!(shortcut.matches(&event));
    }
}
