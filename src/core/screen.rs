//! Cell grid the runtime draws into, and the in-memory implementation that diffs itself
//! into ECMA-48 output.

use unicode_width::UnicodeWidthChar;

use crate::core::escape::{self, CursorVisibility};

/// Marks the right half of a double-width character.
const WIDE_CONTINUATION: char = '\0';

/// The eight ANSI colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Color {
    #[default]
    Black = 0,
    Red = 1,
    Green = 2,
    Yellow = 3,
    Blue = 4,
    Magenta = 5,
    Cyan = 6,
    White = 7,
}

impl Color {
    const ALL: [Color; 8] = [
        Color::Black,
        Color::Red,
        Color::Green,
        Color::Yellow,
        Color::Blue,
        Color::Magenta,
        Color::Cyan,
        Color::White,
    ];

    pub const fn value(self) -> u8 {
        self as u8
    }

    pub fn from_value(value: u8) -> Option<Color> {
        Self::ALL.get(usize::from(value)).copied()
    }

    pub fn invert(self) -> Color {
        Self::ALL[usize::from(7 - self.value())]
    }
}

bitflags::bitflags! {
    /// SGR rendition flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Style: u8 {
        const BOLD = 1 << 0;
        const BLINK = 1 << 1;
        const REVERSE = 1 << 2;
        const UNDERLINE = 1 << 3;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellAttributes {
    pub fore: Color,
    pub back: Color,
    pub style: Style,
}

impl Default for CellAttributes {
    fn default() -> Self {
        Self::new(Color::White, Color::Black)
    }
}

impl CellAttributes {
    pub const fn new(fore: Color, back: Color) -> Self {
        Self {
            fore,
            back,
            style: Style::empty(),
        }
    }

    pub const fn with_style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }

    pub fn bold(&self) -> bool {
        self.style.contains(Style::BOLD)
    }

    /// Swap to inverted colors, used for the mouse pointer cell.
    pub fn inverted(&self) -> Self {
        Self {
            fore: self.fore.invert(),
            back: self.back.invert(),
            style: self.style,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub ch: char,
    pub attr: CellAttributes,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            ch: ' ',
            attr: CellAttributes::default(),
        }
    }
}

/// Drawing surface. Coordinates outside the grid are ignored.
pub trait Screen {
    fn dimensions(&self) -> (u16, u16);

    fn set_dimensions(&mut self, width: u16, height: u16);

    fn put_char(&mut self, x: i32, y: i32, ch: char, attr: CellAttributes);

    fn cell(&self, x: i32, y: i32) -> Option<Cell>;

    fn put_attr(&mut self, x: i32, y: i32, attr: CellAttributes);

    fn clear(&mut self);

    fn is_dirty(&self) -> bool;

    fn put_cursor(&mut self, visible: bool, x: i32, y: i32);

    /// Cursor position when visible.
    fn cursor(&self) -> Option<(i32, i32)>;

    fn hide_cursor(&mut self) {
        self.put_cursor(false, 0, 0);
    }

    fn attr_at(&self, x: i32, y: i32) -> Option<CellAttributes> {
        self.cell(x, y).map(|cell| cell.attr)
    }

    /// Write `text` starting at `(x, y)` and return the number of columns used.
    fn put_string(&mut self, x: i32, y: i32, text: &str, attr: CellAttributes) -> i32 {
        let mut col = x;
        for ch in text.chars() {
            match ch.width() {
                Some(0) | None => continue,
                Some(2) => {
                    self.put_char(col, y, ch, attr);
                    self.put_char(col + 1, y, WIDE_CONTINUATION, attr);
                    col += 2;
                }
                Some(_) => {
                    self.put_char(col, y, ch, attr);
                    col += 1;
                }
            }
        }
        col - x
    }

    fn h_line(&mut self, x: i32, y: i32, len: i32, ch: char, attr: CellAttributes) {
        for col in x..x + len {
            self.put_char(col, y, ch, attr);
        }
    }

    fn v_line(&mut self, x: i32, y: i32, len: i32, ch: char, attr: CellAttributes) {
        for row in y..y + len {
            self.put_char(x, row, ch, attr);
        }
    }

    fn put_all(&mut self, ch: char, attr: CellAttributes) {
        let (width, height) = self.dimensions();
        for row in 0..i32::from(height) {
            self.h_line(0, row, i32::from(width), ch, attr);
        }
    }
}

/// Grid of logical cells plus the last state written to the terminal.
#[derive(Debug)]
pub struct LogicalScreen {
    width: u16,
    height: u16,
    logical: Vec<Cell>,
    physical: Vec<Option<Cell>>,
    cursor_visible: bool,
    cursor_x: i32,
    cursor_y: i32,
    last_cursor: Option<(i32, i32)>,
    visibility: CursorVisibility,
    dirty: bool,
}

impl LogicalScreen {
    pub fn new(width: u16, height: u16) -> Self {
        let len = usize::from(width) * usize::from(height);
        Self {
            width,
            height,
            logical: vec![Cell::default(); len],
            physical: vec![None; len],
            cursor_visible: false,
            cursor_x: 0,
            cursor_y: 0,
            last_cursor: None,
            visibility: CursorVisibility::new(),
            dirty: true,
        }
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= i32::from(self.width) || y >= i32::from(self.height) {
            return None;
        }
        Some(y as usize * usize::from(self.width) + x as usize)
    }

    /// Forget what the terminal shows so the next flush rewrites every cell.
    pub fn invalidate(&mut self) {
        self.physical.iter_mut().for_each(|cell| *cell = None);
        self.last_cursor = None;
        self.dirty = true;
    }

    /// Text of one row, continuation cells skipped. Mostly for tests.
    pub fn row_text(&self, y: i32) -> String {
        (0..i32::from(self.width))
            .filter_map(|x| self.cell(x, y))
            .map(|cell| cell.ch)
            .filter(|ch| *ch != WIDE_CONTINUATION)
            .collect()
    }

    /// Escape sequences that bring the terminal in line with the logical grid.
    pub fn flush_string(&mut self) -> String {
        let mut out = String::new();
        let mut last_attr: Option<CellAttributes> = None;
        let mut expected: Option<(i32, i32)> = None;

        for y in 0..i32::from(self.height) {
            for x in 0..i32::from(self.width) {
                let Some(idx) = self.index(x, y) else {
                    continue;
                };
                let cell = self.logical[idx];
                if self.physical[idx] == Some(cell) {
                    continue;
                }
                self.physical[idx] = Some(cell);
                if cell.ch == WIDE_CONTINUATION {
                    continue;
                }
                if expected != Some((x, y)) {
                    out.push_str(&escape::goto_xy(x, y));
                }
                if last_attr != Some(cell.attr) {
                    out.push_str(&escape::sgr(&cell.attr));
                    last_attr = Some(cell.attr);
                }
                out.push(cell.ch);
                expected = match cell.ch.width() {
                    Some(1) => Some((x + 1, y)),
                    _ => None,
                };
            }
        }

        let drew = !out.is_empty();
        if self.cursor_visible {
            let position = (self.cursor_x, self.cursor_y);
            if drew || self.last_cursor != Some(position) {
                out.push_str(&escape::goto_xy(position.0, position.1));
                self.last_cursor = Some(position);
            }
            out.push_str(self.visibility.set(true));
        } else {
            out.push_str(self.visibility.set(false));
            self.last_cursor = None;
        }

        self.dirty = false;
        out
    }
}

impl Screen for LogicalScreen {
    fn dimensions(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    fn set_dimensions(&mut self, width: u16, height: u16) {
        if (width, height) == (self.width, self.height) {
            return;
        }
        *self = Self {
            visibility: self.visibility,
            ..Self::new(width, height)
        };
    }

    fn put_char(&mut self, x: i32, y: i32, ch: char, attr: CellAttributes) {
        if let Some(idx) = self.index(x, y) {
            let cell = Cell { ch, attr };
            if self.logical[idx] != cell {
                self.logical[idx] = cell;
                self.dirty = true;
            }
        }
    }

    fn cell(&self, x: i32, y: i32) -> Option<Cell> {
        self.index(x, y).map(|idx| self.logical[idx])
    }

    fn put_attr(&mut self, x: i32, y: i32, attr: CellAttributes) {
        if let Some(idx) = self.index(x, y) {
            if self.logical[idx].attr != attr {
                self.logical[idx].attr = attr;
                self.dirty = true;
            }
        }
    }

    fn clear(&mut self) {
        self.put_all(' ', CellAttributes::default());
    }

    fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn put_cursor(&mut self, visible: bool, x: i32, y: i32) {
        if (self.cursor_visible, self.cursor_x, self.cursor_y) != (visible, x, y) {
            self.dirty = true;
        }
        self.cursor_visible = visible;
        self.cursor_x = x;
        self.cursor_y = y;
    }

    fn cursor(&self) -> Option<(i32, i32)> {
        self.cursor_visible.then_some((self.cursor_x, self.cursor_y))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{CellAttributes, Color, LogicalScreen, Screen, Style};

    #[test]
    fn invert_mirrors_the_palette() {
        assert_eq!(Color::Black.invert(), Color::White);
        assert_eq!(Color::Red.invert(), Color::Cyan);
        assert_eq!(Color::from_value(4), Some(Color::Blue));
        assert_eq!(Color::from_value(8), None);
    }

    #[test]
    fn out_of_bounds_writes_are_ignored() {
        let mut screen = LogicalScreen::new(4, 2);
        screen.put_char(-1, 0, 'x', CellAttributes::default());
        screen.put_char(4, 1, 'x', CellAttributes::default());
        assert_eq!(screen.row_text(0), "    ");
        assert_eq!(screen.row_text(1), "    ");
        assert!(screen.cell(4, 0).is_none());
    }

    #[test]
    fn first_flush_paints_everything_then_only_diffs() {
        let mut screen = LogicalScreen::new(3, 1);
        let first = screen.flush_string();
        assert_eq!(first, "\x1b[1;1H\x1b[0;37;40m   \x1b[?25l");
        assert!(!screen.is_dirty());

        let red = CellAttributes::new(Color::Red, Color::Black).with_style(Style::BOLD);
        screen.put_char(2, 0, 'z', red);
        assert!(screen.is_dirty());
        assert_eq!(screen.flush_string(), "\x1b[1;3H\x1b[0;1;31;40mz");
        assert_eq!(screen.flush_string(), "");
    }

    #[test]
    fn cursor_is_positioned_after_drawing() {
        let mut screen = LogicalScreen::new(2, 2);
        screen.flush_string();
        screen.put_cursor(true, 1, 1);
        assert_eq!(screen.cursor(), Some((1, 1)));
        assert_eq!(screen.flush_string(), "\x1b[2;2H\x1b[?25h");
        assert_eq!(screen.flush_string(), "");
    }

    #[test]
    fn wide_characters_take_two_cells() {
        let mut screen = LogicalScreen::new(4, 1);
        let used = screen.put_string(0, 0, "日a", CellAttributes::default());
        assert_eq!(used, 3);
        assert_eq!(screen.row_text(0), "日a ");
        let out = screen.flush_string();
        assert!(out.contains("日\x1b[1;3Ha"), "{out:?}");
    }

    #[test]
    fn resize_forces_a_full_repaint() {
        let mut screen = LogicalScreen::new(2, 1);
        screen.flush_string();
        screen.set_dimensions(3, 1);
        assert_eq!(screen.dimensions(), (3, 1));
        assert!(screen.flush_string().contains("   "));
    }
}
