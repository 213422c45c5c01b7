//! Device abstraction the run loop drives: an event source paired with a screen.

use std::io;
use std::sync::Arc;
use std::time::Instant;

use crate::core::input_event::InputEvent;
use crate::core::screen::Screen;
use crate::core::terminal::CrashCleanup;

/// Called by a backend from any thread when new input is pending.
pub type Waker = Arc<dyn Fn() + Send + Sync>;

/// Only the run-loop thread calls into a backend.
pub trait Backend {
    /// Begin input delivery. `waker` interrupts the run loop's idle wait.
    fn start(&mut self, waker: Waker) -> io::Result<()>;

    fn screen(&mut self) -> &mut dyn Screen;

    /// Non-blocking: append every decoded event to `queue`.
    fn pull_events(&mut self, queue: &mut Vec<InputEvent>);

    /// Push dirty cells to the device.
    fn flush_screen(&mut self);

    /// Restore the device. Called once, after the last flush.
    fn shutdown(&mut self);

    /// Earliest instant at which `pull_events` could yield an event without new input.
    fn next_deadline(&self) -> Option<Instant> {
        None
    }

    /// Restore routine for the panic hook, if the device needs one.
    fn crash_cleanup(&self) -> Option<CrashCleanup> {
        None
    }
}
