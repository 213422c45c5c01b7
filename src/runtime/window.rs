//! Window geometry, flags, and the handler contract windows are driven through.

use std::sync::{Arc, Mutex};

use crate::core::canvas::Canvas;
use crate::core::input_event::InputEvent;
use crate::core::key::Keypress;
use crate::runtime::app::AppHandle;

/// Stable handle for an open window; never reused within one application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowId(pub(crate) u64);

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct WindowFlags: u8 {
        /// Blocks every non-modal window until closed.
        const MODAL = 1 << 0;
        const RESIZABLE = 1 << 1;
        /// Center on the desktop instead of using smart placement.
        const CENTERED = 1 << 2;
        /// Survives close requests unless the application is quitting.
        const UNCLOSABLE = 1 << 3;
    }
}

/// Window state owned by the window manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    pub title: String,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub flags: WindowFlags,
    pub(crate) id: Option<WindowId>,
    pub(crate) z: Option<usize>,
    pub(crate) active: bool,
}

impl Window {
    pub fn new(title: impl Into<String>, x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            title: title.into(),
            x,
            y,
            width,
            height,
            flags: WindowFlags::empty(),
            id: None,
            z: None,
            active: false,
        }
    }

    pub fn with_flags(mut self, flags: WindowFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Assigned when the window is added.
    pub fn id(&self) -> Option<WindowId> {
        self.id
    }

    /// Stacking rank, 0 is topmost. `None` once closed.
    pub fn z(&self) -> Option<usize> {
        self.z
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_modal(&self) -> bool {
        self.flags.contains(WindowFlags::MODAL)
    }

    pub fn is_closable(&self) -> bool {
        !self.flags.contains(WindowFlags::UNCLOSABLE)
    }

    /// Whether the absolute screen cell falls on the window frame or interior.
    pub fn contains(&self, abs_x: i32, abs_y: i32) -> bool {
        abs_x >= self.x
            && abs_x < self.x + self.width
            && abs_y >= self.y
            && abs_y < self.y + self.height
    }

    /// Whether two windows share at least one cell.
    pub fn overlaps(&self, other: &Window) -> bool {
        self.x < other.x + other.width
            && other.x < self.x + self.width
            && self.y < other.y + other.height
            && other.y < self.y + self.height
    }
}

/// Behavior attached to a window.
///
/// `draw` runs on the run-loop thread while consumers are locked out and must not call back
/// into the [`AppHandle`]. Every other method runs on a consumer thread, or on the run loop for
/// `on_idle`, and may use the handle freely.
pub trait WindowHandler: Send {
    /// Paint the window interior. The canvas is clipped to it and origin-relative.
    fn draw(&mut self, _canvas: &mut Canvas<'_>) {}

    /// Mouse coordinates arrive relative to the window's top-left corner.
    fn handle_event(&mut self, _event: &InputEvent, _app: &AppHandle) {}

    fn on_focus(&mut self) {}

    fn on_unfocus(&mut self) {}

    fn on_close(&mut self) {}

    fn on_idle(&mut self) {}

    /// Claim a key before the global accelerator table sees it.
    fn is_shortcut_keypress(&self, _key: &Keypress) -> bool {
        false
    }

    /// Interior-relative position of a visible text cursor.
    fn cursor(&self) -> Option<(i32, i32)> {
        None
    }
}

pub type HandlerRef = Arc<Mutex<Box<dyn WindowHandler>>>;

pub(crate) fn handler_ref(handler: impl WindowHandler + 'static) -> HandlerRef {
    Arc::new(Mutex::new(Box::new(handler)))
}

/// Lifecycle callbacks queued by the window manager for delivery outside its lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowNotice {
    Focus,
    Unfocus,
    Close,
}

#[cfg(test)]
mod tests {
    use super::{Window, WindowFlags};

    #[test]
    fn contains_covers_frame_cells() {
        let window = Window::new("w", 2, 3, 4, 2);
        assert!(window.contains(2, 3));
        assert!(window.contains(5, 4));
        assert!(!window.contains(6, 4));
        assert!(!window.contains(2, 5));
    }

    #[test]
    fn overlap_is_symmetric() {
        let a = Window::new("a", 0, 0, 10, 5);
        let b = Window::new("b", 9, 4, 3, 3);
        let c = Window::new("c", 10, 0, 3, 3);
        assert!(a.overlaps(&b) && b.overlaps(&a));
        assert!(!a.overlaps(&c));
    }

    #[test]
    fn flags_drive_modality_and_closability() {
        let window = Window::new("w", 0, 0, 1, 1)
            .with_flags(WindowFlags::MODAL | WindowFlags::UNCLOSABLE);
        assert!(window.is_modal());
        assert!(!window.is_closable());
        assert!(window.id().is_none());
        assert!(window.z().is_none());
    }
}
