//! Byte-level terminal device.

use std::io;

/// Best-effort restore run from a panic hook; must not block or panic.
pub type CrashCleanup = Box<dyn Fn() + Send + Sync>;

/// Raw terminal the ECMA-48 backend talks to.
///
/// `on_input` receives decoded UTF-8 text exactly as read; escape sequences may arrive split
/// across calls. `on_resize` fires when the device size may have changed.
pub trait Terminal {
    fn start(
        &mut self,
        on_input: Box<dyn FnMut(String) + Send>,
        on_resize: Box<dyn FnMut() + Send>,
    ) -> io::Result<()>;

    /// Stop input delivery and restore the saved terminal mode.
    fn stop(&mut self) -> io::Result<()>;

    fn write(&mut self, data: &str) -> io::Result<()>;

    /// `(columns, rows)`.
    fn size(&self) -> (u16, u16);

    fn crash_cleanup(&self) -> Option<CrashCleanup> {
        None
    }
}
