//! ECMA-48 escape sequence encoder.
//!
//! Every SGR family has a header form (`\x1b[...m`) and a bare parameter form (`...;`) that
//! can be concatenated and wrapped once with [`add_header_sgr`].

use std::fmt::Write as _;

use crate::core::screen::{CellAttributes, Color, Style};

const NORMAL: &str = "\x1b[0;37;40m";

/// Any-event mouse tracking with UTF-8 coordinates, plus the alternate screen.
pub fn mouse(on: bool) -> &'static str {
    if on {
        "\x1b[?1003;1005h\x1b[?1049h"
    } else {
        "\x1b[?1003;1005l\x1b[?1049l"
    }
}

/// xterm `metaSendsEscape`, so Alt arrives as an ESC prefix.
pub fn meta_sends_escape(on: bool) -> &'static str {
    if on {
        "\x1b[?1036h\x1b[?1034l"
    } else {
        "\x1b[?1036l"
    }
}

pub fn home() -> &'static str {
    "\x1b[H"
}

/// Move the cursor to zero-based `(x, y)`.
pub fn goto_xy(x: i32, y: i32) -> String {
    format!("\x1b[{};{}H", y + 1, x + 1)
}

pub fn clear_all() -> String {
    format!("{NORMAL}\x1b[2J")
}

pub fn clear_remaining_line() -> String {
    format!("{NORMAL}\x1b[K")
}

pub fn clear_preceding_line() -> String {
    format!("{NORMAL}\x1b[1K")
}

pub fn clear_line() -> String {
    format!("{NORMAL}\x1b[2K")
}

pub fn normal(header: bool) -> &'static str {
    if header {
        NORMAL
    } else {
        "0;37;40;"
    }
}

fn toggle(on_code: u8, off_code: u8, on: bool, header: bool) -> String {
    let code = if on { on_code } else { off_code };
    if header {
        format!("\x1b[{code}m")
    } else {
        format!("{code};")
    }
}

pub fn bold(on: bool, header: bool) -> String {
    toggle(1, 22, on, header)
}

pub fn blink(on: bool, header: bool) -> String {
    toggle(5, 25, on, header)
}

pub fn underline(on: bool, header: bool) -> String {
    toggle(4, 24, on, header)
}

pub fn reverse(on: bool, header: bool) -> String {
    toggle(7, 27, on, header)
}

/// Foreground and background in one sequence.
pub fn color(fore: Color, back: Color, header: bool) -> String {
    let fg = 30 + u32::from(fore.value());
    let bg = 40 + u32::from(back.value());
    if header {
        format!("\x1b[{fg};{bg}m")
    } else {
        format!("{fg};{bg};")
    }
}

/// A single color, as foreground or background.
pub fn color_one(value: Color, foreground: bool, header: bool) -> String {
    let base = if foreground { 30 } else { 40 };
    let code = base + u32::from(value.value());
    if header {
        format!("\x1b[{code}m")
    } else {
        format!("{code};")
    }
}

/// Reset, then bold(1) reverse(7) blink(5) underline(4) as set, then the color pair.
pub fn color_attributes(
    fore: Color,
    back: Color,
    bold: bool,
    reverse: bool,
    blink: bool,
    underline: bool,
) -> String {
    let mut out = String::from("\x1b[0;");
    for (set, code) in [(bold, "1;"), (reverse, "7;"), (blink, "5;"), (underline, "4;")] {
        if set {
            out.push_str(code);
        }
    }
    let _ = write!(
        out,
        "{};{}m",
        30 + u32::from(fore.value()),
        40 + u32::from(back.value())
    );
    out
}

/// Full SGR for a cell's attributes.
pub fn sgr(attr: &CellAttributes) -> String {
    color_attributes(
        attr.fore,
        attr.back,
        attr.style.contains(Style::BOLD),
        attr.style.contains(Style::REVERSE),
        attr.style.contains(Style::BLINK),
        attr.style.contains(Style::UNDERLINE),
    )
}

/// Wrap concatenated bare parameters in a single SGR header.
pub fn add_header_sgr(params: &str) -> String {
    let trimmed = params.trim_end_matches(';');
    format!("\x1b[{trimmed}m")
}

/// Cached cursor visibility. A terminal starts with a visible cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorVisibility {
    visible: bool,
}

impl Default for CursorVisibility {
    fn default() -> Self {
        Self { visible: true }
    }
}

impl CursorVisibility {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Sequence needed to reach the requested state; empty when nothing changes.
    pub fn set(&mut self, on: bool) -> &'static str {
        if on == self.visible {
            return "";
        }
        self.visible = on;
        if on {
            "\x1b[?25h"
        } else {
            "\x1b[?25l"
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn bold_red_on_black() {
        assert_eq!(
            color_attributes(Color::Red, Color::Black, true, false, false, false),
            "\x1b[0;1;31;40m"
        );
        assert_eq!(
            color_attributes(Color::Yellow, Color::Blue, false, false, false, false),
            "\x1b[0;33;44m"
        );
    }

    #[test]
    fn header_and_bare_forms() {
        assert_eq!(bold(true, true), "\x1b[1m");
        assert_eq!(bold(false, false), "22;");
        assert_eq!(blink(true, false), "5;");
        assert_eq!(underline(false, true), "\x1b[24m");
        assert_eq!(reverse(true, true), "\x1b[7m");
        assert_eq!(color(Color::White, Color::Blue, true), "\x1b[37;44m");
        assert_eq!(color(Color::White, Color::Blue, false), "37;44;");
        assert_eq!(color_one(Color::Cyan, false, true), "\x1b[46m");
        assert_eq!(normal(true), "\x1b[0;37;40m");
    }

    #[test]
    fn bare_forms_compose_under_one_header() {
        let params = format!(
            "{}{}{}",
            normal(false),
            bold(true, false),
            color(Color::Green, Color::Black, false)
        );
        assert_eq!(add_header_sgr(&params), "\x1b[0;37;40;1;32;40m");
    }

    #[test]
    fn cursor_and_clear_sequences() {
        assert_eq!(goto_xy(0, 0), "\x1b[1;1H");
        assert_eq!(goto_xy(9, 4), "\x1b[5;10H");
        assert_eq!(clear_all(), "\x1b[0;37;40m\x1b[2J");
        assert_eq!(clear_remaining_line(), "\x1b[0;37;40m\x1b[K");
        assert_eq!(clear_preceding_line(), "\x1b[0;37;40m\x1b[1K");
        assert_eq!(clear_line(), "\x1b[0;37;40m\x1b[2K");
        assert_eq!(mouse(true), "\x1b[?1003;1005h\x1b[?1049h");
        assert_eq!(meta_sends_escape(false), "\x1b[?1036l");
    }

    #[test]
    fn cursor_visibility_only_emits_changes() {
        let mut cursor = CursorVisibility::new();
        assert_eq!(cursor.set(true), "");
        assert_eq!(cursor.set(false), "\x1b[?25l");
        assert_eq!(cursor.set(false), "");
        assert_eq!(cursor.set(true), "\x1b[?25h");
        assert!(cursor.is_visible());
    }
}
