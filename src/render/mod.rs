//! Desktop painting: palette and the frame painter.

pub mod painter;
pub mod palette;

pub use painter::Painter;
pub use palette::Palette;
