use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Editor commands reachable from the keyboard.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Shortcut {
    Undo,
    Redo,
    Save,
    SaveAs,
    Export,
}

impl Shortcut {
    pub fn all() -> &'static [Shortcut] {
        &[
            Shortcut::Undo,
            Shortcut::Redo,
            Shortcut::Save,
            Shortcut::SaveAs,
            Shortcut::Export,
        ]
    }

    /// Default binding, as shown in menus.
    pub fn default_chord(&self) -> KeyChord {
        match self {
            Shortcut::Undo => KeyChord::ctrl('z'),
            Shortcut::Redo => KeyChord::ctrl('y'),
            Shortcut::Save => KeyChord::ctrl('s'),
            Shortcut::SaveAs => KeyChord::ctrl_shift('s'),
            Shortcut::Export => KeyChord::ctrl('e'),
        }
    }

    /// Map a pressed chord to a command. Ctrl+Shift+Z is accepted as Redo.
    pub fn from_chord(chord: KeyChord) -> Option<Shortcut> {
        if !chord.ctrl {
            return None;
        }
        match (chord.key.to_ascii_lowercase(), chord.shift) {
            ('z', false) => Some(Shortcut::Undo),
            ('z', true) | ('y', false) => Some(Shortcut::Redo),
            ('s', false) => Some(Shortcut::Save),
            ('s', true) => Some(Shortcut::SaveAs),
            ('e', false) => Some(Shortcut::Export),
            _ => None,
        }
    }

    /// Save-As and Export always need a destination from the shell.
    pub fn needs_destination(&self) -> bool {
        matches!(self, Shortcut::SaveAs | Shortcut::Export)
    }
}

/// Result of dispatching a shortcut to the session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShortcutOutcome {
    /// The command ran; `redraw` is set when the canvas changed.
    Done { redraw: bool },
    /// Nothing to do (empty history, or a gesture is in progress).
    Ignored,
    /// The shell must ask the user for a path and call again with it.
    NeedsPath(Shortcut),
}

/// A key press with modifiers, e.g. `Ctrl+Shift+S`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct KeyChord {
    pub ctrl: bool,
    pub shift: bool,
    pub key: char,
}

impl KeyChord {
    pub const fn ctrl(key: char) -> Self {
        Self {
            ctrl: true,
            shift: false,
            key,
        }
    }

    pub const fn ctrl_shift(key: char) -> Self {
        Self {
            ctrl: true,
            shift: true,
            key,
        }
    }
}

impl fmt::Display for KeyChord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ctrl {
            f.write_str("Ctrl+")?;
        }
        if self.shift {
            f.write_str("Shift+")?;
        }
        write!(f, "{}", self.key.to_ascii_uppercase())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot parse key chord '{0}'")]
pub struct BadChord(pub String);

impl FromStr for KeyChord {
    type Err = BadChord;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chord = KeyChord {
            ctrl: false,
            shift: false,
            key: '\0',
        };
        let mut key = None;
        for part in s.split('+').map(str::trim) {
            match part.to_ascii_lowercase().as_str() {
                "ctrl" | "control" | "cmd" => chord.ctrl = true,
                "shift" => chord.shift = true,
                other => {
                    let mut chars = other.chars();
                    match (chars.next(), chars.next(), key) {
                        (Some(c), None, None) => key = Some(c),
                        _ => return Err(BadChord(s.to_string())),
                    }
                }
            }
        }
        chord.key = key.ok_or_else(|| BadChord(s.to_string()))?;
        Ok(chord)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chord(s: &str) -> KeyChord {
        s.parse().unwrap()
    }

    #[test]
    fn test_default_bindings() {
        assert_eq!(Shortcut::from_chord(chord("Ctrl+Z")), Some(Shortcut::Undo));
        assert_eq!(Shortcut::from_chord(chord("Ctrl+Y")), Some(Shortcut::Redo));
        assert_eq!(Shortcut::from_chord(chord("Ctrl+Shift+Z")), Some(Shortcut::Redo));
        assert_eq!(Shortcut::from_chord(chord("ctrl+s")), Some(Shortcut::Save));
        assert_eq!(Shortcut::from_chord(chord("Ctrl+Shift+S")), Some(Shortcut::SaveAs));
        assert_eq!(Shortcut::from_chord(chord("Ctrl+E")), Some(Shortcut::Export));
    }

    #[test]
    fn test_unbound_chords() {
        assert_eq!(Shortcut::from_chord(chord("Z")), None);
        assert_eq!(Shortcut::from_chord(chord("Ctrl+Q")), None);
        assert_eq!(Shortcut::from_chord(chord("Ctrl+Shift+E")), None);
    }

    #[test]
    fn test_default_chord_maps_back() {
        for s in Shortcut::all() {
            assert_eq!(Shortcut::from_chord(s.default_chord()), Some(*s));
        }
        assert_eq!(Shortcut::SaveAs.default_chord().to_string(), "Ctrl+Shift+S");
    }

    #[test]
    fn test_bad_chords() {
        assert!("Ctrl+".parse::<KeyChord>().is_err());
        assert!("Ctrl+Alt".parse::<KeyChord>().is_err());
        assert!("Ctrl+A+B".parse::<KeyChord>().is_err());
    }
}
