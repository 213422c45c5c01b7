//! Keyboard model: a key plus its modifier state.

use std::fmt;

/// A physical or logical key reported by the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Char(char),
    /// Function key F1..F12.
    F(u8),
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    Insert,
    Delete,
    Enter,
    Tab,
    BackTab,
    Escape,
}

/// A keypress with modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Keypress {
    pub key: Key,
    pub alt: bool,
    pub ctrl: bool,
    pub shift: bool,
}

impl Keypress {
    pub const ENTER: Keypress = Keypress::new(Key::Enter);
    pub const ESCAPE: Keypress = Keypress::new(Key::Escape);
    pub const TAB: Keypress = Keypress::new(Key::Tab);
    pub const BACK_TAB: Keypress = Keypress::new(Key::BackTab);
    pub const UP: Keypress = Keypress::new(Key::Up);
    pub const DOWN: Keypress = Keypress::new(Key::Down);
    pub const LEFT: Keypress = Keypress::new(Key::Left);
    pub const RIGHT: Keypress = Keypress::new(Key::Right);

    pub const fn new(key: Key) -> Self {
        Self {
            key,
            alt: false,
            ctrl: false,
            shift: false,
        }
    }

    pub const fn ch(ch: char) -> Self {
        Self::new(Key::Char(ch))
    }

    pub const fn f(n: u8) -> Self {
        Self::new(Key::F(n))
    }

    pub const fn alt(mut self) -> Self {
        self.alt = true;
        self
    }

    pub const fn ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    pub const fn shift(mut self) -> Self {
        self.shift = true;
        self
    }

    /// Anything other than a printable character (arrows, F-keys, Enter, Esc, ...).
    pub fn is_function_key(&self) -> bool {
        !matches!(self.key, Key::Char(_))
    }

    pub fn char(&self) -> Option<char> {
        match self.key {
            Key::Char(ch) => Some(ch),
            _ => None,
        }
    }

    /// Lowercased copy used for accelerator lookup. An ASCII uppercase letter also drops shift.
    pub fn to_lowercase(&self) -> Keypress {
        match self.key {
            Key::Char(ch) if ch.is_ascii_uppercase() => Keypress {
                key: Key::Char(ch.to_ascii_lowercase()),
                shift: false,
                ..*self
            },
            _ => *self,
        }
    }

    /// Normalized identifier, e.g. `"ctrl+alt+x"` or `"shift+f6"`.
    pub fn key_id(&self) -> String {
        let mut id = String::new();
        if self.ctrl {
            id.push_str("ctrl+");
        }
        if self.alt {
            id.push_str("alt+");
        }
        if self.shift {
            id.push_str("shift+");
        }
        match self.key {
            Key::Char(' ') => id.push_str("space"),
            Key::Char(ch) => id.extend(ch.to_lowercase()),
            Key::F(n) => {
                id.push('f');
                id.push_str(&n.to_string());
            }
            Key::Up => id.push_str("up"),
            Key::Down => id.push_str("down"),
            Key::Left => id.push_str("left"),
            Key::Right => id.push_str("right"),
            Key::Home => id.push_str("home"),
            Key::End => id.push_str("end"),
            Key::PageUp => id.push_str("pageup"),
            Key::PageDown => id.push_str("pagedown"),
            Key::Insert => id.push_str("insert"),
            Key::Delete => id.push_str("delete"),
            Key::Enter => id.push_str("enter"),
            Key::Tab => id.push_str("tab"),
            Key::BackTab => id.push_str("backtab"),
            Key::Escape => id.push_str("escape"),
        }
        id
    }

    /// Short label for menus (`"Ctrl+W"`, `"Shift+F6"`).
    pub fn label(&self) -> String {
        let mut label = String::new();
        if self.ctrl {
            label.push_str("Ctrl+");
        }
        if self.alt {
            label.push_str("Alt+");
        }
        if self.shift {
            label.push_str("Shift+");
        }
        match self.key {
            Key::Char(ch) => label.extend(ch.to_uppercase()),
            Key::F(n) => {
                label.push('F');
                label.push_str(&n.to_string());
            }
            _ => {
                let id = Keypress::new(self.key).key_id();
                let mut chars = id.chars();
                if let Some(first) = chars.next() {
                    label.extend(first.to_uppercase());
                    label.push_str(chars.as_str());
                }
            }
        }
        label
    }
}

impl fmt::Display for Keypress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key_id())
    }
}
