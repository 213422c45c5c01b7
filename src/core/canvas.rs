//! Clipped, origin-relative drawing view handed to window handlers.

use crate::core::screen::{CellAttributes, Screen};

pub struct Canvas<'a> {
    screen: &'a mut dyn Screen,
    origin_x: i32,
    origin_y: i32,
    width: i32,
    height: i32,
}

impl<'a> Canvas<'a> {
    /// View of the `width` x `height` rectangle at `(origin_x, origin_y)`.
    pub fn new(
        screen: &'a mut dyn Screen,
        origin_x: i32,
        origin_y: i32,
        width: i32,
        height: i32,
    ) -> Self {
        Self {
            screen,
            origin_x,
            origin_y,
            width: width.max(0),
            height: height.max(0),
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    fn contains(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && x < self.width && y < self.height
    }

    pub fn put_char(&mut self, x: i32, y: i32, ch: char, attr: CellAttributes) {
        if self.contains(x, y) {
            self.screen
                .put_char(self.origin_x + x, self.origin_y + y, ch, attr);
        }
    }

    /// Writes as much of `text` as fits on the row; returns the columns drawn.
    pub fn put_string(&mut self, x: i32, y: i32, text: &str, attr: CellAttributes) -> i32 {
        if y < 0 || y >= self.height {
            return 0;
        }
        let mut col = x;
        for ch in text.chars() {
            if col >= self.width {
                break;
            }
            self.put_char(col, y, ch, attr);
            col += 1;
        }
        (col - x).max(0)
    }

    pub fn h_line(&mut self, x: i32, y: i32, len: i32, ch: char, attr: CellAttributes) {
        for col in x..x + len {
            self.put_char(col, y, ch, attr);
        }
    }

    pub fn fill(&mut self, ch: char, attr: CellAttributes) {
        for row in 0..self.height {
            self.h_line(0, row, self.width, ch, attr);
        }
    }

    pub fn attr_at(&self, x: i32, y: i32) -> Option<CellAttributes> {
        if !self.contains(x, y) {
            return None;
        }
        self.screen.attr_at(self.origin_x + x, self.origin_y + y)
    }
}
