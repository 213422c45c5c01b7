//! Paints the desktop, windows, menus and status bar into a [`Screen`].

use std::collections::HashMap;
use std::sync::TryLockError;

use crate::core::canvas::Canvas;
use crate::core::screen::{Cell, Screen};
use crate::render::palette::{
    BorderChars, Palette, DESKTOP_HATCH, DOUBLE_BORDER, SEPARATOR_LEFT, SEPARATOR_RIGHT,
    SINGLE_BORDER, SUB_MENU_ARROW,
};
use crate::runtime::menu::{Label, Menu, MenuEntry};
use crate::runtime::state::RuntimeState;
use crate::runtime::window::{HandlerRef, Window, WindowId};

/// Interior cells drawn last frame, keyed by window.
struct Snapshot {
    width: i32,
    height: i32,
    cells: Vec<Option<Cell>>,
}

pub struct Painter {
    palette: Palette,
    interiors: HashMap<WindowId, Snapshot>,
    /// Cell currently showing the inverted pointer.
    pointer: Option<(i32, i32)>,
}

impl Default for Painter {
    fn default() -> Self {
        Self::new()
    }
}

impl Painter {
    pub fn new() -> Self {
        Self::with_palette(Palette::default())
    }

    pub fn with_palette(palette: Palette) -> Self {
        Self {
            palette,
            interiors: HashMap::new(),
            pointer: None,
        }
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// Full repaint of the desktop from `state`.
    pub fn paint(&mut self, screen: &mut dyn Screen, state: &RuntimeState) {
        let (width, _) = screen.dimensions();
        let width = i32::from(width);
        let area = state.area;

        screen.clear();
        self.pointer = None;
        for row in area.top..area.bottom {
            screen.h_line(0, row, width, DESKTOP_HATCH, self.palette.desktop);
        }

        let windows = state.windows.by_z();
        self.interiors.retain(|id, _| {
            windows
                .iter()
                .any(|(window, _)| window.id() == Some(*id))
        });
        for (window, handler) in windows.iter().rev() {
            self.paint_window(screen, window, handler);
        }

        self.paint_menu_bar(screen, state, width);
        for menu in state.menus.open_menus() {
            self.paint_menu(screen, menu);
        }

        if area.bottom > 0 {
            screen.h_line(0, area.bottom, width, ' ', self.palette.status);
            if let Some(status) = &state.status {
                screen.put_string(1, area.bottom, status, self.palette.status);
            }
        }

        self.place_cursor(screen, state, &windows);
        self.move_pointer(screen, state.pointer);
    }

    fn paint_window(&mut self, screen: &mut dyn Screen, window: &Window, handler: &HandlerRef) {
        let (border, chars) = if window.is_active() {
            (self.palette.window_border, DOUBLE_BORDER)
        } else {
            (self.palette.window_border_inactive, SINGLE_BORDER)
        };
        draw_box(screen, window.x, window.y, window.width, window.height, chars, border);
        for row in 1..window.height - 1 {
            screen.h_line(
                window.x + 1,
                window.y + row,
                window.width - 2,
                ' ',
                self.palette.window_background,
            );
        }

        let title = format!(" {} ", window.title);
        let title_width = unicode_width::UnicodeWidthStr::width(title.as_str()) as i32;
        if title_width <= window.width - 2 {
            let x = window.x + (window.width - title_width) / 2;
            screen.put_string(x, window.y, &title, self.palette.window_title);
        }

        let (inner_x, inner_y) = (window.x + 1, window.y + 1);
        let (inner_w, inner_h) = ((window.width - 2).max(0), (window.height - 2).max(0));
        let Some(id) = window.id() else {
            return;
        };
        let drew = match handler.try_lock() {
            Ok(mut handler) => {
                handler.draw(&mut Canvas::new(screen, inner_x, inner_y, inner_w, inner_h));
                true
            }
            Err(TryLockError::Poisoned(poisoned)) => {
                poisoned
                    .into_inner()
                    .draw(&mut Canvas::new(screen, inner_x, inner_y, inner_w, inner_h));
                true
            }
            Err(TryLockError::WouldBlock) => false,
        };

        if drew {
            let cells = (0..inner_h)
                .flat_map(|row| (0..inner_w).map(move |col| (col, row)))
                .map(|(col, row)| screen.cell(inner_x + col, inner_y + row))
                .collect();
            self.interiors.insert(
                id,
                Snapshot {
                    width: inner_w,
                    height: inner_h,
                    cells,
                },
            );
        } else if let Some(snapshot) = self.interiors.get(&id) {
            // Handler busy (its consumer is parked in a modal): replay the last frame.
            if (snapshot.width, snapshot.height) == (inner_w, inner_h) {
                for (idx, cell) in snapshot.cells.iter().enumerate() {
                    if let Some(cell) = cell {
                        let idx = idx as i32;
                        screen.put_char(
                            inner_x + idx % inner_w,
                            inner_y + idx / inner_w,
                            cell.ch,
                            cell.attr,
                        );
                    }
                }
            }
        }
    }

    fn paint_menu_bar(&self, screen: &mut dyn Screen, state: &RuntimeState, width: i32) {
        screen.h_line(0, 0, width, ' ', self.palette.menu);
        let active = state.menus.active();
        for (id, menu) in state.menus.top_level() {
            let selected = active == Some(id);
            let (attr, mnemonic) = if selected {
                (self.palette.menu_selected, self.palette.menu_mnemonic_selected)
            } else {
                (self.palette.menu, self.palette.menu_mnemonic)
            };
            screen.h_line(menu.x, 0, menu.title_span(), ' ', attr);
            put_label(screen, menu.x + 1, 0, &menu.title, attr, Some(mnemonic));
        }
    }

    fn paint_menu(&self, screen: &mut dyn Screen, menu: &Menu) {
        let width = menu.width();
        let normal = self.palette.menu;
        draw_box(screen, menu.x, menu.y, width, menu.height(), SINGLE_BORDER, normal);

        for (idx, entry) in menu.entries.iter().enumerate() {
            let y = menu.y + 1 + idx as i32;
            let selected = menu.selected == Some(idx);
            let (attr, mnemonic) = match entry {
                MenuEntry::Item(item) if !item.enabled => (self.palette.menu_disabled, None),
                _ if selected => (
                    self.palette.menu_selected,
                    Some(self.palette.menu_mnemonic_selected),
                ),
                _ => (normal, Some(self.palette.menu_mnemonic)),
            };
            match entry {
                MenuEntry::Separator => {
                    screen.put_char(menu.x, y, SEPARATOR_LEFT, normal);
                    screen.h_line(menu.x + 1, y, width - 2, SINGLE_BORDER.horizontal, normal);
                    screen.put_char(menu.x + width - 1, y, SEPARATOR_RIGHT, normal);
                }
                MenuEntry::Item(item) => {
                    screen.h_line(menu.x + 1, y, width - 2, ' ', attr);
                    put_label(screen, menu.x + 2, y, &item.label, attr, mnemonic);
                    if let Some(key) = &item.key {
                        let label = key.label();
                        let key_width = unicode_width::UnicodeWidthStr::width(label.as_str());
                        screen.put_string(menu.x + width - 2 - key_width as i32, y, &label, attr);
                    }
                }
                MenuEntry::SubMenu { label, .. } => {
                    screen.h_line(menu.x + 1, y, width - 2, ' ', attr);
                    put_label(screen, menu.x + 2, y, label, attr, mnemonic);
                    screen.put_char(menu.x + width - 2, y, SUB_MENU_ARROW, attr);
                }
            }
        }
    }

    fn place_cursor(
        &self,
        screen: &mut dyn Screen,
        state: &RuntimeState,
        windows: &[(Window, HandlerRef)],
    ) {
        if state.menus.is_active() {
            screen.hide_cursor();
            return;
        }
        let cursor = windows
            .iter()
            .find(|(window, _)| window.is_active())
            .and_then(|(window, handler)| {
                let (x, y) = handler.try_lock().ok()?.cursor()?;
                let inside = x >= 0 && y >= 0 && x < window.width - 2 && y < window.height - 2;
                inside.then_some((window.x + 1 + x, window.y + 1 + y))
            });
        match cursor {
            Some((x, y)) => screen.put_cursor(true, x, y),
            None => screen.hide_cursor(),
        }
    }

    /// Move the inverted pointer cell, restoring the cell it leaves.
    pub fn move_pointer(&mut self, screen: &mut dyn Screen, pointer: Option<(i32, i32)>) {
        if self.pointer == pointer {
            return;
        }
        for (x, y) in self.pointer.into_iter().chain(pointer) {
            if let Some(attr) = screen.attr_at(x, y) {
                screen.put_attr(x, y, attr.inverted());
            }
        }
        self.pointer = pointer;
    }
}

fn draw_box(
    screen: &mut dyn Screen,
    x: i32,
    y: i32,
    width: i32,
    height: i32,
    chars: BorderChars,
    attr: crate::core::screen::CellAttributes,
) {
    if width < 2 || height < 2 {
        return;
    }
    let right = x + width - 1;
    let bottom = y + height - 1;
    screen.put_char(x, y, chars.top_left, attr);
    screen.put_char(right, y, chars.top_right, attr);
    screen.put_char(x, bottom, chars.bottom_left, attr);
    screen.put_char(right, bottom, chars.bottom_right, attr);
    screen.h_line(x + 1, y, width - 2, chars.horizontal, attr);
    screen.h_line(x + 1, bottom, width - 2, chars.horizontal, attr);
    screen.v_line(x, y + 1, height - 2, chars.vertical, attr);
    screen.v_line(right, y + 1, height - 2, chars.vertical, attr);
}

fn put_label(
    screen: &mut dyn Screen,
    x: i32,
    y: i32,
    label: &Label,
    attr: crate::core::screen::CellAttributes,
    mnemonic: Option<crate::core::screen::CellAttributes>,
) {
    screen.put_string(x, y, &label.text, attr);
    if let (Some(index), Some(mnemonic)) = (label.mnemonic_index, mnemonic) {
        if let Some(ch) = label.text.chars().nth(index) {
            let col: i32 = label
                .text
                .chars()
                .take(index)
                .map(|ch| unicode_width::UnicodeWidthChar::width(ch).unwrap_or(0) as i32)
                .sum();
            screen.put_char(x + col, y, ch, mnemonic);
        }
    }
}
