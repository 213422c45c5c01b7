//! Structured input events produced by the decoder or injected by the runtime.

use crate::core::key::Keypress;

/// Identifier carried by menu items and the events they post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MenuItemId(pub u32);

impl MenuItemId {
    pub const EXIT: MenuItemId = MenuItemId(1);
    pub const TILE: MenuItemId = MenuItemId(10);
    pub const CASCADE: MenuItemId = MenuItemId(11);
    pub const CLOSE_ALL: MenuItemId = MenuItemId(12);
    pub const WINDOW_NEXT: MenuItemId = MenuItemId(13);
    pub const WINDOW_PREVIOUS: MenuItemId = MenuItemId(14);
    pub const WINDOW_CLOSE: MenuItemId = MenuItemId(15);

    /// First id free for application menu items.
    pub const USER: MenuItemId = MenuItemId(1024);
}

/// Application-level commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Quit immediately; intercepted by the run loop.
    Abort,
    Exit,
    Tile,
    Cascade,
    CloseAll,
    WindowNext,
    WindowPrevious,
    WindowClose,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseEventType {
    Down,
    Up,
    Motion,
}

/// Mouse report. `x`/`y` start equal to `abs_x`/`abs_y` and are rewritten to
/// window- or menu-relative coordinates before dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseEvent {
    pub kind: MouseEventType,
    pub x: i32,
    pub y: i32,
    pub abs_x: i32,
    pub abs_y: i32,
    pub button1: bool,
    pub button2: bool,
    pub button3: bool,
    pub wheel_up: bool,
    pub wheel_down: bool,
}

impl MouseEvent {
    pub fn new(kind: MouseEventType, abs_x: i32, abs_y: i32) -> Self {
        Self {
            kind,
            x: abs_x,
            y: abs_y,
            abs_x,
            abs_y,
            button1: false,
            button2: false,
            button3: false,
            wheel_up: false,
            wheel_down: false,
        }
    }

    pub fn any_button(&self) -> bool {
        self.button1 || self.button2 || self.button3
    }

    /// Copy with `x`/`y` relative to the given origin.
    pub fn localized(&self, origin_x: i32, origin_y: i32) -> Self {
        Self {
            x: self.abs_x - origin_x,
            y: self.abs_y - origin_y,
            ..*self
        }
    }
}

/// Input event delivered to windows and menus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    Keypress(Keypress),
    Mouse(MouseEvent),
    Resize { width: u16, height: u16 },
    Command(Command),
    Menu(MenuItemId),
}

impl InputEvent {
    pub fn is_command(&self) -> bool {
        matches!(self, InputEvent::Command(_))
    }

    pub fn keypress(&self) -> Option<&Keypress> {
        match self {
            InputEvent::Keypress(key) => Some(key),
            _ => None,
        }
    }

    pub fn mouse(&self) -> Option<&MouseEvent> {
        match self {
            InputEvent::Mouse(mouse) => Some(mouse),
            _ => None,
        }
    }
}

impl From<Keypress> for InputEvent {
    fn from(key: Keypress) -> Self {
        InputEvent::Keypress(key)
    }
}

impl From<MouseEvent> for InputEvent {
    fn from(mouse: MouseEvent) -> Self {
        InputEvent::Mouse(mouse)
    }
}
