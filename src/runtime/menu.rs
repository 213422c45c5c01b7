//! Menu bar: top-level menus, drop-down entries, the sub-menu stack and the accelerator table.

use std::collections::HashMap;

use tracing::{debug, error};
use unicode_width::UnicodeWidthStr;

use crate::core::input_event::{MenuItemId, MouseEvent, MouseEventType};
use crate::core::key::{Key, Keypress};
use crate::error::{DesktopError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MenuId(pub(crate) usize);

/// Display text with an optional `&`-marked mnemonic. `&&` is a literal ampersand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub text: String,
    /// Lowercased mnemonic character.
    pub mnemonic: Option<char>,
    /// Char index of the mnemonic within `text`.
    pub mnemonic_index: Option<usize>,
}

impl Label {
    pub fn parse(raw: &str) -> Self {
        let mut text = String::new();
        let mut mnemonic = None;
        let mut mnemonic_index = None;
        let mut chars = raw.chars().peekable();
        let mut index = 0;
        while let Some(ch) = chars.next() {
            if ch == '&' {
                match chars.next() {
                    Some('&') => {
                        text.push('&');
                        index += 1;
                    }
                    Some(next) => {
                        if mnemonic.is_none() {
                            mnemonic = next.to_lowercase().next();
                            mnemonic_index = Some(index);
                        }
                        text.push(next);
                        index += 1;
                    }
                    None => {}
                }
                continue;
            }
            text.push(ch);
            index += 1;
        }
        Self {
            text,
            mnemonic,
            mnemonic_index,
        }
    }

    pub fn width(&self) -> i32 {
        self.text.width() as i32
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItem {
    pub id: MenuItemId,
    pub label: Label,
    pub key: Option<Keypress>,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuEntry {
    Item(MenuItem),
    Separator,
    SubMenu { label: Label, menu: MenuId },
}

impl MenuEntry {
    pub fn label(&self) -> Option<&Label> {
        match self {
            MenuEntry::Item(item) => Some(&item.label),
            MenuEntry::SubMenu { label, .. } => Some(label),
            MenuEntry::Separator => None,
        }
    }

    pub fn is_selectable(&self) -> bool {
        match self {
            MenuEntry::Item(item) => item.enabled,
            MenuEntry::SubMenu { .. } => true,
            MenuEntry::Separator => false,
        }
    }

    fn width(&self) -> i32 {
        match self {
            MenuEntry::Item(item) => {
                let key = item
                    .key
                    .map(|key| key.label().width() as i32 + 2)
                    .unwrap_or(0);
                item.label.width() + key + 2
            }
            MenuEntry::SubMenu { label, .. } => label.width() + 4,
            MenuEntry::Separator => 0,
        }
    }
}

/// A top-level menu or a sub-menu. Geometry is absolute: `x`/`y` is the top-left corner of
/// the drop-down box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Menu {
    pub title: Label,
    pub x: i32,
    pub y: i32,
    pub entries: Vec<MenuEntry>,
    pub selected: Option<usize>,
    pub(crate) parent: Option<MenuId>,
}

impl Menu {
    fn new(title: &str, parent: Option<MenuId>) -> Self {
        Self {
            title: Label::parse(title),
            x: 0,
            y: 1,
            entries: Vec::new(),
            selected: None,
            parent,
        }
    }

    pub fn width(&self) -> i32 {
        let inner = self
            .entries
            .iter()
            .map(MenuEntry::width)
            .max()
            .unwrap_or(0)
            .max(self.title.width() + 2);
        inner + 2
    }

    pub fn height(&self) -> i32 {
        self.entries.len() as i32 + 2
    }

    pub fn contains(&self, abs_x: i32, abs_y: i32) -> bool {
        abs_x >= self.x
            && abs_x < self.x + self.width()
            && abs_y >= self.y
            && abs_y < self.y + self.height()
    }

    /// Entry row under an absolute cell, if any.
    pub fn entry_at(&self, abs_x: i32, abs_y: i32) -> Option<usize> {
        let local_x = abs_x - self.x;
        let row = abs_y - self.y - 1;
        if local_x < 1 || local_x >= self.width() - 1 || row < 0 {
            return None;
        }
        let row = row as usize;
        (row < self.entries.len()).then_some(row)
    }

    /// Width of the title span on the menu bar.
    pub fn title_span(&self) -> i32 {
        self.title.width() + 2
    }

    fn first_selectable(&self) -> Option<usize> {
        self.entries.iter().position(MenuEntry::is_selectable)
    }

    fn step_selection(&mut self, forward: bool) {
        let count = self.entries.len();
        if count == 0 {
            return;
        }
        let mut idx = self.selected.unwrap_or(if forward { count - 1 } else { 0 });
        for _ in 0..count {
            idx = if forward {
                (idx + 1) % count
            } else {
                (idx + count - 1) % count
            };
            if self.entries[idx].is_selectable() {
                self.selected = Some(idx);
                return;
            }
        }
    }
}

/// What the dispatcher should do after the menu bar handled an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    /// Event swallowed, menu state may have changed.
    Consumed,
    /// An item was chosen; the menu stack is already closed.
    Dispatch(MenuItemId),
}

#[derive(Debug, Default)]
pub struct MenuBar {
    menus: Vec<Menu>,
    top_level: Vec<MenuId>,
    active: Option<MenuId>,
    sub_menus: Vec<MenuId>,
    accelerators: HashMap<Keypress, MenuItemId>,
}

impl MenuBar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn menu(&self, id: MenuId) -> Option<&Menu> {
        self.menus.get(id.0)
    }

    fn menu_mut(&mut self, id: MenuId) -> Result<&mut Menu> {
        self.menus.get_mut(id.0).ok_or(DesktopError::UnknownMenu(id))
    }

    pub fn top_level(&self) -> impl Iterator<Item = (MenuId, &Menu)> + '_ {
        self.top_level.iter().map(|&id| (id, &self.menus[id.0]))
    }

    pub fn active(&self) -> Option<MenuId> {
        self.active
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn sub_menus(&self) -> &[MenuId] {
        &self.sub_menus
    }

    /// Open drop-downs bottom to top: the active menu, then each sub-menu.
    pub fn open_menus(&self) -> Vec<&Menu> {
        self.active
            .iter()
            .chain(self.sub_menus.iter())
            .filter_map(|&id| self.menu(id))
            .collect()
    }

    fn current(&self) -> Option<MenuId> {
        self.sub_menus.last().copied().or(self.active)
    }

    pub fn add_menu(&mut self, title: &str) -> MenuId {
        let id = MenuId(self.menus.len());
        self.menus.push(Menu::new(title, None));
        self.top_level.push(id);
        self.recompute_menu_x();
        debug!(?id, title, "menu added");
        id
    }

    pub fn set_menu_title(&mut self, menu: MenuId, title: &str) -> Result<()> {
        self.menu_mut(menu)?.title = Label::parse(title);
        self.recompute_menu_x();
        Ok(())
    }

    fn recompute_menu_x(&mut self) {
        let mut x = 0;
        for &id in &self.top_level {
            let menu = &mut self.menus[id.0];
            menu.x = x;
            x += menu.title_span();
        }
    }

    /// Append an item. The accelerator, if any, is registered lowercased and must be unique.
    pub fn add_item(
        &mut self,
        menu: MenuId,
        id: MenuItemId,
        label: &str,
        key: Option<Keypress>,
    ) -> Result<()> {
        self.menu_mut(menu)?;
        if let Some(key) = key {
            let normalized = key.to_lowercase();
            if self.accelerators.contains_key(&normalized) {
                error!(key = %normalized.key_id(), "duplicate accelerator");
                debug_assert!(false, "duplicate accelerator {}", normalized.key_id());
                return Err(DesktopError::DuplicateAccelerator(normalized.key_id()));
            }
            self.accelerators.insert(normalized, id);
        }
        self.menu_mut(menu)?.entries.push(MenuEntry::Item(MenuItem {
            id,
            label: Label::parse(label),
            key,
            enabled: true,
        }));
        Ok(())
    }

    pub fn add_separator(&mut self, menu: MenuId) -> Result<()> {
        self.menu_mut(menu)?.entries.push(MenuEntry::Separator);
        Ok(())
    }

    pub fn add_sub_menu(&mut self, parent: MenuId, label: &str) -> Result<MenuId> {
        self.menu_mut(parent)?;
        let id = MenuId(self.menus.len());
        self.menus.push(Menu::new(label, Some(parent)));
        self.menu_mut(parent)?.entries.push(MenuEntry::SubMenu {
            label: Label::parse(label),
            menu: id,
        });
        Ok(id)
    }

    /// Entry by position within a menu.
    pub fn entry(&self, menu: MenuId, index: usize) -> Result<&MenuEntry> {
        let menu = self.menu(menu).ok_or(DesktopError::UnknownMenu(menu))?;
        menu.entries.get(index).ok_or(DesktopError::OutOfRange {
            index,
            len: menu.entries.len(),
        })
    }

    fn items_mut(&mut self) -> impl Iterator<Item = &mut MenuItem> {
        self.menus
            .iter_mut()
            .flat_map(|menu| menu.entries.iter_mut())
            .filter_map(|entry| match entry {
                MenuEntry::Item(item) => Some(item),
                _ => None,
            })
    }

    pub fn item(&self, id: MenuItemId) -> Option<&MenuItem> {
        self.menus
            .iter()
            .flat_map(|menu| menu.entries.iter())
            .find_map(|entry| match entry {
                MenuEntry::Item(item) if item.id == id => Some(item),
                _ => None,
            })
    }

    fn set_enabled(&mut self, lower: MenuItemId, upper: MenuItemId, enabled: bool) -> Result<usize> {
        if lower > upper {
            return Err(DesktopError::OutOfRange {
                index: lower.0 as usize,
                len: upper.0 as usize,
            });
        }
        let mut changed = 0;
        for item in self.items_mut() {
            if item.id >= lower && item.id <= upper {
                item.enabled = enabled;
                changed += 1;
            }
        }
        Ok(changed)
    }

    /// Returns false when no item carries `id`.
    pub fn enable_item(&mut self, id: MenuItemId) -> bool {
        matches!(self.set_enabled(id, id, true), Ok(n) if n > 0)
    }

    pub fn disable_item(&mut self, id: MenuItemId) -> bool {
        matches!(self.set_enabled(id, id, false), Ok(n) if n > 0)
    }

    /// Enable every item with an id in `lower..=upper`; returns how many matched.
    pub fn enable_items(&mut self, lower: MenuItemId, upper: MenuItemId) -> Result<usize> {
        self.set_enabled(lower, upper, true)
    }

    pub fn disable_items(&mut self, lower: MenuItemId, upper: MenuItemId) -> Result<usize> {
        self.set_enabled(lower, upper, false)
    }

    /// Enabled item bound to `key`.
    pub fn accelerator(&self, key: &Keypress) -> Option<MenuItemId> {
        let id = *self.accelerators.get(&key.to_lowercase())?;
        self.item(id).filter(|item| item.enabled).map(|item| item.id)
    }

    /// Top-level menu whose mnemonic matches an Alt+letter press.
    pub fn mnemonic_menu(&self, key: &Keypress) -> Option<MenuId> {
        if !key.alt || key.ctrl {
            return None;
        }
        let ch = key.char()?.to_lowercase().next()?;
        self.top_level()
            .find(|(_, menu)| menu.title.mnemonic == Some(ch))
            .map(|(id, _)| id)
    }

    /// Top-level menu whose title span covers column `abs_x` of the menu bar.
    pub fn title_at(&self, abs_x: i32) -> Option<MenuId> {
        self.top_level()
            .find(|(_, menu)| abs_x >= menu.x && abs_x < menu.x + menu.title_span())
            .map(|(id, _)| id)
    }

    /// Whether an absolute cell falls on the active menu or any open sub-menu.
    pub fn mouse_on_menu(&self, abs_x: i32, abs_y: i32) -> bool {
        self.open_menus()
            .iter()
            .any(|menu| menu.contains(abs_x, abs_y))
    }

    pub fn activate(&mut self, menu: MenuId) -> Result<()> {
        self.menu_mut(menu)?;
        self.open_top_level(menu);
        Ok(())
    }

    /// Open `menu`, an id handed out by this bar, as the active drop-down.
    pub(crate) fn open_top_level(&mut self, menu: MenuId) {
        self.close_sub_menus();
        self.active = Some(menu);
        let target = &mut self.menus[menu.0];
        target.selected = target.first_selectable();
    }

    pub fn close_menu(&mut self) {
        self.close_sub_menus();
        if let Some(active) = self.active.take() {
            self.menus[active.0].selected = None;
        }
    }

    pub fn close_sub_menu(&mut self) {
        if let Some(sub) = self.sub_menus.pop() {
            self.menus[sub.0].selected = None;
        }
    }

    pub fn close_sub_menus(&mut self) {
        while !self.sub_menus.is_empty() {
            self.close_sub_menu();
        }
    }

    /// Move to the next or previous top-level menu, wrapping.
    pub fn switch_menu(&mut self, forward: bool) {
        let Some(active) = self.active else {
            return;
        };
        let count = self.top_level.len();
        let Some(pos) = self.top_level.iter().position(|&id| id == active) else {
            return;
        };
        let next = if forward {
            (pos + 1) % count
        } else {
            (pos + count - 1) % count
        };
        let target = self.top_level[next];
        self.open_top_level(target);
    }

    /// Open the sub-menu entry at `index` of the current menu, next to its parent.
    pub fn push_sub_menu(&mut self, index: usize) -> Result<MenuId> {
        let current = self.current().ok_or(DesktopError::OutOfRange { index, len: 0 })?;
        let parent = &self.menus[current.0];
        let sub = match parent.entries.get(index) {
            Some(MenuEntry::SubMenu { menu, .. }) => *menu,
            _ => {
                return Err(DesktopError::OutOfRange {
                    index,
                    len: parent.entries.len(),
                })
            }
        };
        self.open_sub_menu(current, index, sub);
        Ok(sub)
    }

    /// `sub` is the sub-menu entry at `index` of `parent`.
    fn open_sub_menu(&mut self, parent: MenuId, index: usize, sub: MenuId) {
        let parent = &self.menus[parent.0];
        let (x, y) = (parent.x + parent.width(), parent.y + index as i32);
        let menu = &mut self.menus[sub.0];
        menu.x = x;
        menu.y = y;
        menu.selected = menu.first_selectable();
        self.sub_menus.push(sub);
    }

    /// Choose the entry at `index` of the current menu.
    fn choose(&mut self, index: usize) -> Option<MenuAction> {
        let current = self.current()?;
        let entry = self.menus[current.0].entries.get(index)?.clone();
        match entry {
            MenuEntry::Item(item) if item.enabled => {
                self.close_menu();
                Some(MenuAction::Dispatch(item.id))
            }
            MenuEntry::SubMenu { .. } => {
                self.menus[current.0].selected = Some(index);
                self.push_sub_menu(index).ok()?;
                Some(MenuAction::Consumed)
            }
            _ => Some(MenuAction::Consumed),
        }
    }

    /// Keyboard navigation while a menu is active.
    pub fn handle_key(&mut self, key: &Keypress) -> MenuAction {
        let Some(current) = self.current() else {
            return MenuAction::Consumed;
        };
        let in_sub_menu = !self.sub_menus.is_empty();
        match key.key {
            Key::Escape => {
                if in_sub_menu {
                    self.close_sub_menu();
                } else {
                    self.close_menu();
                }
            }
            Key::Left => {
                if in_sub_menu {
                    self.close_sub_menu();
                } else {
                    self.switch_menu(false);
                }
            }
            Key::Right => {
                let parent = &self.menus[current.0];
                let sub_menu_entry = parent.selected.and_then(|idx| match parent.entries.get(idx) {
                    Some(MenuEntry::SubMenu { menu, .. }) => Some((idx, *menu)),
                    _ => None,
                });
                match sub_menu_entry {
                    Some((idx, sub)) => self.open_sub_menu(current, idx, sub),
                    None => self.switch_menu(true),
                }
            }
            Key::Up => self.menus[current.0].step_selection(false),
            Key::Down => self.menus[current.0].step_selection(true),
            Key::Enter => {
                if let Some(idx) = self.menus[current.0].selected {
                    return self.choose(idx).unwrap_or(MenuAction::Consumed);
                }
            }
            Key::Char(ch) if !key.ctrl => {
                let ch = ch.to_lowercase().next();
                let hit = self.menus[current.0].entries.iter().position(|entry| {
                    entry.is_selectable() && entry.label().and_then(|label| label.mnemonic) == ch
                });
                if let Some(idx) = hit {
                    return self.choose(idx).unwrap_or(MenuAction::Consumed);
                }
            }
            _ => {}
        }
        MenuAction::Consumed
    }

    /// Mouse handling while a menu is active. Coordinates are absolute.
    pub fn handle_mouse(&mut self, mouse: &MouseEvent) -> MenuAction {
        let plain_motion = mouse.kind == MouseEventType::Motion
            && !mouse.any_button()
            && !mouse.wheel_up
            && !mouse.wheel_down;
        while let Some(&sub) = self.sub_menus.last() {
            if plain_motion || self.menus[sub.0].contains(mouse.abs_x, mouse.abs_y) {
                break;
            }
            // Still over the parent's sub-menu entry: keep it open.
            let parent_hit = self.menus[sub.0].parent.is_some_and(|parent| {
                self.menus[parent.0]
                    .entry_at(mouse.abs_x, mouse.abs_y)
                    .and_then(|idx| self.menus[parent.0].entries.get(idx))
                    .is_some_and(|entry| matches!(entry, MenuEntry::SubMenu { menu, .. } if *menu == sub))
            });
            if parent_hit {
                break;
            }
            self.close_sub_menu();
        }

        let Some(current) = self.current() else {
            return MenuAction::Consumed;
        };
        let Some(idx) = self.menus[current.0].entry_at(mouse.abs_x, mouse.abs_y) else {
            return MenuAction::Consumed;
        };
        match mouse.kind {
            MouseEventType::Up => self.choose(idx).unwrap_or(MenuAction::Consumed),
            MouseEventType::Down | MouseEventType::Motion => {
                if self.menus[current.0].entries[idx].is_selectable() {
                    self.menus[current.0].selected = Some(idx);
                }
                MenuAction::Consumed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{Label, MenuAction, MenuBar, MenuEntry};
    use crate::core::input_event::{MenuItemId, MouseEvent, MouseEventType};
    use crate::core::key::Keypress;
    use crate::error::DesktopError;

    const OPEN: MenuItemId = MenuItemId(2000);
    const SAVE: MenuItemId = MenuItemId(2001);
    const QUIT: MenuItemId = MenuItemId(2002);
    const NESTED: MenuItemId = MenuItemId(2003);

    fn file_and_edit() -> MenuBar {
        let mut bar = MenuBar::new();
        let file = bar.add_menu("&File");
        bar.add_item(file, OPEN, "&Open", Some(Keypress::ch('o').ctrl()))
            .expect("open");
        bar.add_item(file, SAVE, "&Save", None).expect("save");
        bar.add_separator(file).expect("separator");
        bar.add_item(file, QUIT, "&Quit", Some(Keypress::ch('Q').alt().shift()))
            .expect("quit");
        bar.add_menu("&Edit");
        bar
    }

    fn mouse(kind: MouseEventType, x: i32, y: i32) -> MouseEvent {
        let mut event = MouseEvent::new(kind, x, y);
        event.button1 = kind != MouseEventType::Motion;
        event
    }

    #[test]
    fn label_parsing_marks_the_mnemonic() {
        let label = Label::parse("Save &As && Exit");
        assert_eq!(label.text, "Save As & Exit");
        assert_eq!(label.mnemonic, Some('a'));
        assert_eq!(label.mnemonic_index, Some(5));
        assert_eq!(Label::parse("Plain").mnemonic, None);
    }

    #[test]
    fn menu_titles_are_laid_out_left_to_right() {
        let mut bar = file_and_edit();
        let xs: Vec<i32> = bar.top_level().map(|(_, menu)| menu.x).collect();
        assert_eq!(xs, vec![0, 6]);

        let (file, _) = bar.top_level().next().expect("file");
        bar.set_menu_title(file, "&Document").expect("rename");
        let xs: Vec<i32> = bar.top_level().map(|(_, menu)| menu.x).collect();
        assert_eq!(xs, vec![0, 10]);
        assert_eq!(bar.title_at(11), bar.top_level().nth(1).map(|(id, _)| id));
    }

    #[test]
    fn accelerators_match_case_insensitively_and_respect_enabled() {
        let mut bar = file_and_edit();
        assert_eq!(bar.accelerator(&Keypress::ch('O').ctrl().shift()), Some(OPEN));
        assert_eq!(bar.accelerator(&Keypress::ch('q').alt()), Some(QUIT));

        assert!(bar.disable_item(OPEN));
        assert_eq!(bar.accelerator(&Keypress::ch('o').ctrl()), None);
        assert!(!bar.enable_item(MenuItemId(9999)));
    }

    #[test]
    #[cfg_attr(debug_assertions, should_panic(expected = "duplicate accelerator"))]
    fn duplicate_accelerator_is_rejected() {
        let mut bar = file_and_edit();
        let (edit, _) = bar.top_level().nth(1).expect("edit");
        let err = bar
            .add_item(edit, NESTED, "Other", Some(Keypress::ch('o').ctrl()))
            .expect_err("duplicate");
        assert!(matches!(err, DesktopError::DuplicateAccelerator(key) if key == "ctrl+o"));
    }

    #[test]
    fn item_ranges_enable_and_disable_together() {
        let mut bar = file_and_edit();
        assert_eq!(bar.disable_items(OPEN, SAVE).expect("range"), 2);
        assert!(!bar.item(OPEN).expect("open").enabled);
        assert!(bar.item(QUIT).expect("quit").enabled);
        assert_eq!(bar.enable_items(OPEN, QUIT).expect("range"), 3);
        assert!(matches!(
            bar.enable_items(QUIT, OPEN),
            Err(DesktopError::OutOfRange { .. })
        ));
    }

    #[test]
    fn entry_index_is_bounds_checked() {
        let bar = file_and_edit();
        let (file, _) = bar.top_level().next().expect("file");
        assert_eq!(bar.entry(file, 2).expect("separator"), &MenuEntry::Separator);
        assert!(matches!(
            bar.entry(file, 4),
            Err(DesktopError::OutOfRange { index: 4, len: 4 })
        ));
    }

    #[test]
    fn alt_letter_finds_the_top_level_menu() {
        let bar = file_and_edit();
        let edit = bar.top_level().nth(1).map(|(id, _)| id);
        assert_eq!(bar.mnemonic_menu(&Keypress::ch('e').alt()), edit);
        assert_eq!(bar.mnemonic_menu(&Keypress::ch('e')), None);
    }

    #[test]
    fn keyboard_navigation_skips_separators_and_dispatches() {
        let mut bar = file_and_edit();
        let (file, _) = bar.top_level().next().expect("file");
        bar.activate(file).expect("activate");
        assert_eq!(bar.menu(file).and_then(|menu| menu.selected), Some(0));

        bar.handle_key(&Keypress::DOWN);
        bar.handle_key(&Keypress::DOWN);
        assert_eq!(bar.menu(file).and_then(|menu| menu.selected), Some(3));
        assert_eq!(bar.handle_key(&Keypress::ENTER), MenuAction::Dispatch(QUIT));
        assert!(!bar.is_active());
    }

    #[test]
    fn mnemonic_inside_menu_dispatches_item() {
        let mut bar = file_and_edit();
        let (file, _) = bar.top_level().next().expect("file");
        bar.activate(file).expect("activate");
        assert_eq!(bar.handle_key(&Keypress::ch('s')), MenuAction::Dispatch(SAVE));
    }

    #[test]
    fn left_and_right_switch_menus_with_wrap() {
        let mut bar = file_and_edit();
        let ids: Vec<_> = bar.top_level().map(|(id, _)| id).collect();
        bar.activate(ids[0]).expect("activate");
        bar.handle_key(&Keypress::LEFT);
        assert_eq!(bar.active(), Some(ids[1]));
        bar.handle_key(&Keypress::RIGHT);
        assert_eq!(bar.active(), Some(ids[0]));
        bar.handle_key(&Keypress::ESCAPE);
        assert!(!bar.is_active());
    }

    #[test]
    fn sub_menu_opens_beside_parent_and_pops_on_escape() {
        let mut bar = file_and_edit();
        let (file, _) = bar.top_level().next().expect("file");
        let more = bar.add_sub_menu(file, "&More").expect("sub menu");
        bar.add_item(more, NESTED, "&Nested", None).expect("nested");

        bar.activate(file).expect("activate");
        assert_eq!(bar.handle_key(&Keypress::ch('m')), MenuAction::Consumed);
        assert_eq!(bar.sub_menus(), &[more]);
        let parent = bar.menu(file).expect("file").clone();
        let sub = bar.menu(more).expect("more");
        assert_eq!((sub.x, sub.y), (parent.x + parent.width(), parent.y + 4));

        bar.handle_key(&Keypress::ESCAPE);
        assert!(bar.sub_menus().is_empty());
        assert!(bar.is_active());
    }

    #[test]
    fn mouse_release_on_entry_dispatches() {
        let mut bar = file_and_edit();
        let (file, _) = bar.top_level().next().expect("file");
        bar.activate(file).expect("activate");

        // Rows start one below the border at y = 1.
        assert_eq!(
            bar.handle_mouse(&mouse(MouseEventType::Motion, 3, 3)),
            MenuAction::Consumed
        );
        assert_eq!(bar.menu(file).and_then(|menu| menu.selected), Some(1));
        assert_eq!(
            bar.handle_mouse(&mouse(MouseEventType::Up, 3, 3)),
            MenuAction::Dispatch(SAVE)
        );
        assert!(!bar.mouse_on_menu(3, 3));
    }

    #[test]
    fn clicking_away_from_a_sub_menu_closes_it() {
        let mut bar = file_and_edit();
        let (file, _) = bar.top_level().next().expect("file");
        let more = bar.add_sub_menu(file, "&More").expect("sub menu");
        bar.add_item(more, NESTED, "&Nested", None).expect("nested");
        bar.activate(file).expect("activate");
        bar.push_sub_menu(4).expect("push");

        bar.handle_mouse(&MouseEvent::new(MouseEventType::Motion, 60, 20));
        assert_eq!(bar.sub_menus(), &[more]);
        bar.handle_mouse(&mouse(MouseEventType::Down, 60, 20));
        assert!(bar.sub_menus().is_empty());
    }

    #[test]
    fn right_arrow_opens_the_selected_sub_menu() {
        let mut bar = file_and_edit();
        let (file, _) = bar.top_level().next().expect("file");
        let more = bar.add_sub_menu(file, "&More").expect("sub menu");
        bar.add_item(more, NESTED, "&Nested", None).expect("nested");
        bar.activate(file).expect("activate");
        for _ in 0..3 {
            bar.handle_key(&Keypress::DOWN);
        }
        assert_eq!(bar.menu(file).and_then(|menu| menu.selected), Some(4));

        assert_eq!(bar.handle_key(&Keypress::RIGHT), MenuAction::Consumed);
        assert_eq!(bar.sub_menus(), &[more]);
        assert_eq!(bar.active(), Some(file));
        assert_eq!(bar.menu(more).and_then(|menu| menu.selected), Some(0));
        assert_eq!(bar.handle_key(&Keypress::ENTER), MenuAction::Dispatch(NESTED));
    }

    #[test]
    fn right_arrow_on_a_plain_item_moves_to_the_next_menu() {
        let mut bar = file_and_edit();
        let ids: Vec<_> = bar.top_level().map(|(id, _)| id).collect();
        let more = bar.add_sub_menu(ids[0], "&More").expect("sub menu");
        bar.add_item(more, NESTED, "&Nested", None).expect("nested");
        bar.activate(ids[0]).expect("activate");

        bar.handle_key(&Keypress::RIGHT);
        assert_eq!(bar.active(), Some(ids[1]));
        assert!(bar.sub_menus().is_empty());
    }
}
