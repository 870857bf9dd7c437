//! Keyboard chords and the mark hotkey table.

use std::fmt;
use std::str::FromStr;

use quire_core::Mark;
use thiserror::Error;

/// Modifier keys as a bitfield.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Modifiers(u8);

impl Modifiers {
    pub const NONE: Modifiers = Modifiers(0);
    pub const CTRL: Modifiers = Modifiers(0b0001);
    pub const SHIFT: Modifiers = Modifiers(0b0010);
    pub const ALT: Modifiers = Modifiers(0b0100);
    pub const META: Modifiers = Modifiers(0b1000);

    #[inline]
    pub const fn ctrl(self) -> bool {
        self.0 & Self::CTRL.0 != 0
    }

    #[inline]
    pub const fn shift(self) -> bool {
        self.0 & Self::SHIFT.0 != 0
    }

    #[inline]
    pub const fn alt(self) -> bool {
        self.0 & Self::ALT.0 != 0
    }

    #[inline]
    pub const fn meta(self) -> bool {
        self.0 & Self::META.0 != 0
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn union(self, other: Modifiers) -> Modifiers {
        Modifiers(self.0 | other.0)
    }

    /// The platform "mod" key: Cmd on macOS, Ctrl elsewhere.
    pub fn cmd() -> Modifiers {
        if cfg!(target_os = "macos") {
            Modifiers::META
        } else {
            Modifiers::CTRL
        }
    }
}

impl std::ops::BitOr for Modifiers {
    type Output = Modifiers;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.union(rhs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChordError {
    #[error("empty key chord")]
    Empty,
    #[error("unknown key in chord {0:?}")]
    UnknownKey(String),
    #[error("more than one key in chord {0:?}")]
    MultipleKeys(String),
}

/// A key plus the exact modifier set that must be held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Chord {
    pub key: char,
    pub modifiers: Modifiers,
}

impl Chord {
    pub fn new(key: char, modifiers: Modifiers) -> Self {
        Self {
            key: key.to_ascii_lowercase(),
            modifiers,
        }
    }

    pub fn matches(&self, event: &KeyEvent) -> bool {
        self.key == event.key.to_ascii_lowercase() && self.modifiers == event.modifiers
    }
}

impl FromStr for Chord {
    type Err = ChordError;

    /// Parses chords such as `"mod+b"`, `"ctrl+shift+x"` or ``"mod+`"``.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err(ChordError::Empty);
        }

        let mut modifiers = Modifiers::NONE;
        let mut key = None;
        for part in s.split('+') {
            let part = part.trim().to_lowercase();
            match part.as_str() {
                "mod" => modifiers = modifiers | Modifiers::cmd(),
                "ctrl" | "control" => modifiers = modifiers | Modifiers::CTRL,
                "shift" => modifiers = modifiers | Modifiers::SHIFT,
                "alt" | "option" | "opt" => modifiers = modifiers | Modifiers::ALT,
                "cmd" | "meta" | "super" | "win" => modifiers = modifiers | Modifiers::META,
                _ => {
                    let mut chars = part.chars();
                    let (Some(ch), None) = (chars.next(), chars.next()) else {
                        return Err(ChordError::UnknownKey(s.to_string()));
                    };
                    if key.replace(ch).is_some() {
                        return Err(ChordError::MultipleKeys(s.to_string()));
                    }
                }
            }
        }

        key.map(|key| Chord::new(key, modifiers))
            .ok_or_else(|| ChordError::UnknownKey(s.to_string()))
    }
}

impl fmt::Display for Chord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = self.modifiers;
        for (held, name) in [
            (m.ctrl(), "ctrl"),
            (m.shift(), "shift"),
            (m.alt(), "alt"),
            (m.meta(), "meta"),
        ] {
            if held {
                write!(f, "{name}+")?;
            }
        }
        write!(f, "{}", self.key)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: char,
    pub modifiers: Modifiers,
}

impl KeyEvent {
    pub fn new(key: char, modifiers: Modifiers) -> Self {
        Self { key, modifiers }
    }
}

/// Whether a key event was consumed, i.e. its default action suppressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    Handled,
    Ignored,
}

pub const HOTKEYS: [(&str, Mark); 4] = [
    ("mod+b", Mark::Bold),
    ("mod+i", Mark::Italic),
    ("mod+u", Mark::Underline),
    ("mod+`", Mark::Code),
];

/// The mark bound to `event`, if any.
pub fn mark_for_event(event: &KeyEvent) -> Option<Mark> {
    HOTKEYS.iter().find_map(|(chord, mark)| {
        chord
            .parse::<Chord>()
            .ok()
            .filter(|chord| chord.matches(event))
            .map(|_| *mark)
    })
}
