//! Error type shared by the runtime, the menu stack, and the platform layer.

use thiserror::Error;

use crate::runtime::menu::MenuId;
use crate::runtime::window::WindowId;

#[derive(Debug, Error)]
pub enum DesktopError {
    #[error("terminal i/o failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("index {index} out of range for length {len}")]
    OutOfRange { index: usize, len: usize },

    #[error("no open window with id {0:?}")]
    UnknownWindow(WindowId),

    #[error("no menu with id {0:?}")]
    UnknownMenu(MenuId),

    #[error("accelerator {0} is already bound to a menu item")]
    DuplicateAccelerator(String),

    #[error("a secondary event receiver is already active")]
    SecondaryActive,

    #[error("yield requested with no secondary event receiver bound")]
    NoSecondaryReceiver,

    #[error("yield must be called from the primary event consumer thread")]
    NotPrimaryConsumer,

    #[error("failed to install log subscriber: {0}")]
    Logging(String),
}

pub type Result<T> = std::result::Result<T, DesktopError>;
