//! Window manager, menus, timers and the threaded event runtime.

pub mod app;
pub(crate) mod dispatch;
pub mod menu;
pub mod state;
pub mod sync;
pub mod timer;
pub mod window;
pub mod window_manager;

pub use app::{AppHandle, Application};
pub use menu::{Menu, MenuBar, MenuEntry, MenuId, MenuItem};
pub use state::{MenuHook, RuntimeState, TimerAction};
pub use timer::TimerId;
pub use window::{HandlerRef, Window, WindowFlags, WindowHandler, WindowId, WindowNotice};
pub use window_manager::{DesktopArea, WindowManager};
