//! Attributes used to paint the desktop chrome.

use crate::core::screen::{CellAttributes, Color, Style};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub desktop: CellAttributes,
    pub window_border: CellAttributes,
    pub window_border_inactive: CellAttributes,
    pub window_background: CellAttributes,
    pub window_title: CellAttributes,
    pub menu: CellAttributes,
    pub menu_selected: CellAttributes,
    pub menu_mnemonic: CellAttributes,
    pub menu_mnemonic_selected: CellAttributes,
    pub menu_disabled: CellAttributes,
    pub status: CellAttributes,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            desktop: CellAttributes::new(Color::Blue, Color::White),
            window_border: CellAttributes::new(Color::White, Color::Blue)
                .with_style(Style::BOLD),
            window_border_inactive: CellAttributes::new(Color::White, Color::Blue),
            window_background: CellAttributes::new(Color::White, Color::Blue),
            window_title: CellAttributes::new(Color::Yellow, Color::Blue).with_style(Style::BOLD),
            menu: CellAttributes::new(Color::Black, Color::White),
            menu_selected: CellAttributes::new(Color::White, Color::Green).with_style(Style::BOLD),
            menu_mnemonic: CellAttributes::new(Color::Red, Color::White),
            menu_mnemonic_selected: CellAttributes::new(Color::Red, Color::Green)
                .with_style(Style::BOLD),
            menu_disabled: CellAttributes::new(Color::Black, Color::White).with_style(Style::BOLD),
            status: CellAttributes::new(Color::Black, Color::Cyan),
        }
    }
}

/// Box-drawing characters for one border style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BorderChars {
    pub top_left: char,
    pub top_right: char,
    pub bottom_left: char,
    pub bottom_right: char,
    pub horizontal: char,
    pub vertical: char,
}

pub const SINGLE_BORDER: BorderChars = BorderChars {
    top_left: '┌',
    top_right: '┐',
    bottom_left: '└',
    bottom_right: '┘',
    horizontal: '─',
    vertical: '│',
};

pub const DOUBLE_BORDER: BorderChars = BorderChars {
    top_left: '╔',
    top_right: '╗',
    bottom_left: '╚',
    bottom_right: '╝',
    horizontal: '═',
    vertical: '║',
};

pub const DESKTOP_HATCH: char = '░';
pub const SUB_MENU_ARROW: char = '►';
pub const SEPARATOR_LEFT: char = '├';
pub const SEPARATOR_RIGHT: char = '┤';
