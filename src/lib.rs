//! Text-mode desktop runtime: overlapping windows, a pull-down menu bar and a threaded event
//! loop on top of an ECMA-48 terminal.
//!
//! Invariant: single output gate. Only `core::output::OutputGate::flush(..)` writes to the
//! terminal.
//!
//! # Public API Overview
//! - Wrap a [`Terminal`] in an [`Ecma48Backend`] and hand it to [`Application`].
//! - Open windows with [`AppHandle::add_window`]; behavior lives in a [`WindowHandler`].
//! - Build menus with [`AppHandle::add_menu`] and friends; chosen items arrive as
//!   [`InputEvent::Menu`].
//! - Hand a window its own consumer thread with [`AppHandle::run_modal`] or
//!   [`AppHandle::enable_secondary_receiver`].
//!
//! # Threads
//! The thread calling [`Application::run`] owns the terminal: it decodes input, runs timers and
//! paints. Events are dispatched on a separate primary consumer thread, and optionally on one
//! secondary consumer bound to a single window.

#![allow(
    clippy::derivable_impls,
    clippy::needless_range_loop,
    clippy::too_many_arguments,
    clippy::type_complexity
)]

pub mod config;
pub mod error;
pub mod logging;

pub mod core;
pub mod platform;
pub mod render;
pub mod runtime;

/// Application entry points and the cloneable handle used from handlers and threads.
pub use crate::runtime::{AppHandle, Application};

/// Windows and the handler contract.
pub use crate::runtime::{DesktopArea, Window, WindowFlags, WindowHandler, WindowId};

/// Menu identifiers.
pub use crate::core::input_event::MenuItemId;
pub use crate::runtime::MenuId;

/// Timers.
pub use crate::runtime::TimerId;

/// Input model and the ECMA-48 input decoder.
pub use crate::core::decoder::Decoder;
pub use crate::core::input_event::{Command, InputEvent, MouseEvent, MouseEventType};
pub use crate::core::key::{Key, Keypress};

/// Drawing surfaces.
pub use crate::core::canvas::Canvas;
pub use crate::core::screen::{Cell, CellAttributes, Color, LogicalScreen, Screen, Style};

/// Terminal devices and the backend that drives them.
pub use crate::core::backend::Backend;
pub use crate::core::terminal::Terminal;
pub use crate::platform::{Ecma48Backend, ProcessTerminal};

/// Environment configuration.
pub use crate::config::EnvConfig;

/// Error type shared by every fallible operation.
pub use crate::error::{DesktopError, Result};
