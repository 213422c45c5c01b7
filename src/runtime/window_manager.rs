//! Z-ordered window list: add/close/switch, tiling, cascading, and smart placement.
//!
//! Invariant: open windows hold the z values `0..len` exactly once each, and the window at
//! z 0 is the only active one.

use tracing::debug;

use crate::error::{DesktopError, Result};
use crate::runtime::window::{HandlerRef, Window, WindowFlags, WindowId, WindowNotice};

/// Usable desktop: row 0 is the menu bar and the last row the status bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DesktopArea {
    pub width: i32,
    pub height: i32,
    pub top: i32,
    /// First row below the desktop.
    pub bottom: i32,
}

impl DesktopArea {
    pub fn new(width: u16, height: u16) -> Self {
        let height = i32::from(height);
        Self {
            width: i32::from(width),
            height,
            top: 1,
            bottom: (height - 1).max(1),
        }
    }

    pub fn interior_height(&self) -> i32 {
        self.bottom - self.top
    }
}

struct WindowEntry {
    window: Window,
    handler: HandlerRef,
}

/// Cell coverage counts for the whole screen, used to score placements.
struct OverlapGrid {
    width: i32,
    height: i32,
    counts: Vec<u32>,
    total: u64,
    covered: u64,
}

impl OverlapGrid {
    fn new<'a>(width: i32, height: i32, windows: impl Iterator<Item = &'a Window>) -> Self {
        let mut grid = Self {
            width: width.max(0),
            height: height.max(0),
            counts: vec![0; (width.max(0) * height.max(0)) as usize],
            total: 0,
            covered: 0,
        };
        for window in windows {
            for (x, y) in grid.clip(window.x, window.y, window.width, window.height) {
                let idx = grid.index(x, y);
                if grid.counts[idx] == 0 {
                    grid.covered += 1;
                }
                grid.counts[idx] += 1;
                grid.total += 1;
            }
        }
        grid
    }

    fn index(&self, x: i32, y: i32) -> usize {
        (y * self.width + x) as usize
    }

    fn clip(&self, x: i32, y: i32, width: i32, height: i32) -> impl Iterator<Item = (i32, i32)> {
        let x0 = x.max(0);
        let x1 = (x + width).min(self.width);
        let y0 = y.max(0);
        let y1 = (y + height).min(self.height);
        (y0..y1).flat_map(move |row| (x0..x1).map(move |col| (col, row)))
    }

    /// Mean excess overlap per covered cell with a `width` x `height` window added at `(x, y)`.
    fn score(&self, x: i32, y: i32, width: i32, height: i32) -> f64 {
        let mut total = self.total;
        let mut covered = self.covered;
        for (col, row) in self.clip(x, y, width, height) {
            total += 1;
            if self.counts[self.index(col, row)] == 0 {
                covered += 1;
            }
        }
        if covered == 0 {
            return 0.0;
        }
        (total - covered) as f64 / covered as f64
    }
}

pub struct WindowManager {
    entries: Vec<WindowEntry>,
    next_id: u64,
    notices: Vec<(HandlerRef, WindowNotice)>,
    smart_placement: bool,
}

impl Default for WindowManager {
    fn default() -> Self {
        Self::new(true)
    }
}

impl WindowManager {
    pub fn new(smart_placement: bool) -> Self {
        Self {
            entries: Vec::new(),
            next_id: 1,
            notices: Vec::new(),
            smart_placement,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, id: WindowId) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.window.id == Some(id))
    }

    fn active_position(&self) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.window.z == Some(0))
    }

    pub fn window(&self, id: WindowId) -> Option<&Window> {
        self.position(id).map(|idx| &self.entries[idx].window)
    }

    pub fn window_mut(&mut self, id: WindowId) -> Option<&mut Window> {
        let idx = self.position(id)?;
        Some(&mut self.entries[idx].window)
    }

    /// Window by insertion index.
    pub fn window_at(&self, index: usize) -> Result<&Window> {
        self.entries
            .get(index)
            .map(|entry| &entry.window)
            .ok_or(DesktopError::OutOfRange {
                index,
                len: self.entries.len(),
            })
    }

    pub fn handler(&self, id: WindowId) -> Option<HandlerRef> {
        self.position(id)
            .map(|idx| HandlerRef::clone(&self.entries[idx].handler))
    }

    pub fn active(&self) -> Option<&Window> {
        self.active_position().map(|idx| &self.entries[idx].window)
    }

    pub fn active_id(&self) -> Option<WindowId> {
        self.active().and_then(|window| window.id)
    }

    pub fn active_handler(&self) -> Option<HandlerRef> {
        self.active_position()
            .map(|idx| HandlerRef::clone(&self.entries[idx].handler))
    }

    /// Ids in insertion order.
    pub fn ids(&self) -> Vec<WindowId> {
        self.entries
            .iter()
            .filter_map(|entry| entry.window.id)
            .collect()
    }

    /// Snapshot sorted by z, topmost first.
    pub fn by_z(&self) -> Vec<(Window, HandlerRef)> {
        let mut sorted: Vec<_> = self
            .entries
            .iter()
            .map(|entry| (entry.window.clone(), HandlerRef::clone(&entry.handler)))
            .collect();
        sorted.sort_by_key(|(window, _)| window.z);
        sorted
    }

    pub fn handlers(&self) -> Vec<HandlerRef> {
        self.entries
            .iter()
            .map(|entry| HandlerRef::clone(&entry.handler))
            .collect()
    }

    pub fn modal_window_active(&self) -> bool {
        self.entries.iter().any(|entry| entry.window.is_modal())
    }

    pub fn set_smart_placement(&mut self, enabled: bool) {
        self.smart_placement = enabled;
    }

    pub(crate) fn take_notices(&mut self) -> Vec<(HandlerRef, WindowNotice)> {
        std::mem::take(&mut self.notices)
    }

    /// Put undelivered notices back ahead of any queued since.
    pub(crate) fn requeue_notices(&mut self, mut notices: Vec<(HandlerRef, WindowNotice)>) {
        notices.append(&mut self.notices);
        self.notices = notices;
    }

    fn notify(&mut self, idx: usize, notice: WindowNotice) {
        let handler = HandlerRef::clone(&self.entries[idx].handler);
        self.notices.push((handler, notice));
    }

    pub fn add(&mut self, mut window: Window, handler: HandlerRef, area: &DesktopArea) -> WindowId {
        if self.modal_window_active() {
            window.flags |= WindowFlags::MODAL | WindowFlags::CENTERED;
        }
        if let Some(idx) = self.active_position() {
            self.entries[idx].window.active = false;
            self.notify(idx, WindowNotice::Unfocus);
        }
        for entry in &mut self.entries {
            entry.window.z = entry.window.z.map(|z| z + 1);
        }

        let id = WindowId(self.next_id);
        self.next_id += 1;
        window.id = Some(id);
        window.z = Some(0);
        window.active = true;

        if window.flags.contains(WindowFlags::CENTERED) {
            window.x = ((area.width - window.width) / 2).max(0);
            window.y = area.top + ((area.interior_height() - window.height) / 2).max(0);
        } else if self.smart_placement {
            if let Some((x, y)) = self.smart_position(&window, area) {
                window.x = x;
                window.y = y;
            }
        }

        debug!(?id, title = %window.title, x = window.x, y = window.y, "window added");
        self.entries.push(WindowEntry { window, handler });
        self.notify(self.entries.len() - 1, WindowNotice::Focus);
        id
    }

    /// Remove a window. Returns it (with `z` cleared) unless it is unknown, or unclosable
    /// while not quitting.
    pub fn close(&mut self, id: WindowId, quitting: bool) -> Option<Window> {
        let idx = self.position(id)?;
        if !self.entries[idx].window.is_closable() && !quitting {
            debug!(?id, "refusing to close unclosable window");
            return None;
        }

        let closed_z = self.entries[idx].window.z.unwrap_or(0);
        self.notify(idx, WindowNotice::Unfocus);
        let entry = self.entries.remove(idx);
        let mut window = entry.window;
        window.z = None;
        window.active = false;

        for other in &mut self.entries {
            if let Some(z) = other.window.z {
                if z > closed_z {
                    other.window.z = Some(z - 1);
                }
            }
        }
        if let Some(top) = self.active_position() {
            if !self.entries[top].window.active {
                self.entries[top].window.active = true;
                self.notify(top, WindowNotice::Focus);
            }
        }
        self.notices.push((entry.handler, WindowNotice::Close));

        debug!(?id, remaining = self.entries.len(), "window closed");
        Some(window)
    }

    fn swap_to_front(&mut self, target: usize) {
        let Some(active) = self.active_position() else {
            return;
        };
        if active == target {
            return;
        }
        let target_z = self.entries[target].window.z;
        self.entries[active].window.z = target_z;
        self.entries[active].window.active = false;
        self.notify(active, WindowNotice::Unfocus);
        self.entries[target].window.z = Some(0);
        self.entries[target].window.active = true;
        self.notify(target, WindowNotice::Focus);
    }

    /// Exchange the active window with its neighbor in insertion order.
    pub fn switch(&mut self, forward: bool) {
        let count = self.entries.len();
        if count < 2 {
            return;
        }
        let Some(active) = self.active_position() else {
            return;
        };
        if self.entries[active].window.is_modal() {
            return;
        }
        let next = if forward {
            (active + 1) % count
        } else {
            (active + count - 1) % count
        };
        self.swap_to_front(next);
    }

    /// Bring a window to the front, unless a modal window holds focus.
    pub fn activate(&mut self, id: WindowId) -> Result<()> {
        let idx = self.position(id).ok_or(DesktopError::UnknownWindow(id))?;
        if self.active().is_some_and(Window::is_modal) {
            return Ok(());
        }
        self.swap_to_front(idx);
        Ok(())
    }

    /// Topmost window under an absolute screen cell.
    pub fn window_at_point(&self, abs_x: i32, abs_y: i32) -> Option<WindowId> {
        self.entries
            .iter()
            .filter(|entry| entry.window.contains(abs_x, abs_y))
            .min_by_key(|entry| entry.window.z)
            .and_then(|entry| entry.window.id)
    }

    /// Click-to-focus. Returns true when focus moved.
    pub fn focus_at(&mut self, abs_x: i32, abs_y: i32) -> bool {
        let Some(id) = self.window_at_point(abs_x, abs_y) else {
            return false;
        };
        if self.active_id() == Some(id) || self.active().is_some_and(Window::is_modal) {
            return false;
        }
        match self.position(id) {
            Some(idx) => {
                self.swap_to_front(idx);
                true
            }
            None => false,
        }
    }

    /// Indices sorted bottom-most first.
    fn reverse_z_order(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.entries.len()).collect();
        order.sort_by_key(|&idx| std::cmp::Reverse(self.entries[idx].window.z));
        order
    }

    pub fn tile(&mut self, area: &DesktopArea) {
        let count = self.entries.len() as i32;
        if count == 0 {
            return;
        }
        let a = (f64::from(count).sqrt().floor() as i32).max(1);
        let c = count % a;
        let b = count / a;
        let tile_width = area.width / a;
        let height1 = area.interior_height() / b;
        let height2 = area.interior_height() / (b + c);
        let last_column_start = (a - 1) * b;

        for (i, idx) in self.reverse_z_order().into_iter().enumerate() {
            let i = i as i32;
            let window = &mut self.entries[idx].window;
            if i >= last_column_start {
                let row = i - last_column_start;
                window.x = (a - 1) * tile_width;
                window.y = area.top + row * height2;
                window.height = height2;
            } else {
                window.x = (i / b) * tile_width;
                window.y = area.top + (i % b) * height1;
                window.height = height1;
            }
            window.width = tile_width;
        }
    }

    pub fn cascade(&mut self, area: &DesktopArea) {
        let mut x = 0;
        let mut y = area.top;
        for idx in self.reverse_z_order() {
            let window = &mut self.entries[idx].window;
            window.x = x;
            window.y = y;
            x += 1;
            y += 1;
            if x > area.width {
                x = 0;
            }
            if y >= area.bottom {
                y = area.top;
            }
        }
    }

    /// Overlap-minimizing top-left corner for `window` against every other open window.
    /// `None` when no position fits on the desktop.
    pub fn smart_position(&self, window: &Window, area: &DesktopArea) -> Option<(i32, i32)> {
        let grid = self.overlap_grid(window.id, area);
        let x_min = 0;
        let x_max = (area.width - window.width + 1).max(x_min);
        let y_min = area.top;
        let y_max = (area.bottom - window.height + 1).max(y_min);

        let mut best: Option<(f64, i32, i32)> = None;
        for x in x_min..x_max {
            for y in y_min..y_max {
                let score = grid.score(x, y, window.width, window.height);
                if best.map_or(true, |(best_score, _, _)| score < best_score) {
                    best = Some((score, x, y));
                }
            }
        }
        best.map(|(_, x, y)| (x, y))
    }

    /// Score of placing `window` at `(x, y)`: mean excess overlap per covered screen cell.
    pub fn placement_overlap(&self, window: &Window, x: i32, y: i32, area: &DesktopArea) -> f64 {
        self.overlap_grid(window.id, area)
            .score(x, y, window.width, window.height)
    }

    fn overlap_grid(&self, exclude: Option<WindowId>, area: &DesktopArea) -> OverlapGrid {
        OverlapGrid::new(
            area.width,
            area.height,
            self.entries
                .iter()
                .filter(move |entry| exclude.is_none() || entry.window.id != exclude)
                .map(|entry| &entry.window),
        )
    }
}
