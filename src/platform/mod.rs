//! Platform-specific terminal integrations.

pub mod ecma48_backend;
pub mod hooks;
pub mod process_terminal;

pub use ecma48_backend::Ecma48Backend;
pub use hooks::{install_panic_hook, PanicHookGuard};
#[cfg(unix)]
pub use hooks::{install_signal_handlers, SignalHookGuard};
pub use process_terminal::ProcessTerminal;
