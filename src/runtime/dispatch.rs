//! Event routing: the run loop's meta filter and the consumers' dispatch order.
//!
//! Primary order: click-to-focus and menu bar hits, the active menu, accelerators, menu
//! mnemonics, built-in commands and menu ids, the application menu hook, then the active
//! window. The secondary consumer routes everything to its receiver window.

use tracing::{debug, trace};

use crate::core::input_event::{Command, InputEvent, MenuItemId, MouseEvent, MouseEventType};
use crate::core::screen::Screen;
use crate::runtime::app::AppHandle;
use crate::runtime::menu::MenuAction;
use crate::runtime::state::{lock_handler, RuntimeState, Shared};
use crate::runtime::sync::lock;
use crate::runtime::window::WindowId;
use crate::runtime::window_manager::DesktopArea;

/// Run-loop filter between the fill and drain queues.
pub(crate) fn meta_handle_event(shared: &Shared, screen: &mut dyn Screen, event: InputEvent) {
    if shared.is_quitting() {
        trace!(?event, "dropping event while quitting");
        return;
    }
    match &event {
        InputEvent::Command(Command::Abort) => {
            shared.quit();
            return;
        }
        InputEvent::Resize { width, height } => {
            screen.set_dimensions(*width, *height);
            let mut state = shared.state();
            state.area = DesktopArea::new(*width, *height);
            state.pointer = None;
            drop(state);
            debug!(width, height, "desktop resized");
            shared.request_repaint();
            return;
        }
        InputEvent::Mouse(mouse) => {
            shared.state().pointer = Some((mouse.abs_x, mouse.abs_y));
        }
        _ => {}
    }
    shared.drain.push(event);
}

/// Menu bar hits and click-to-focus, applied before the event is routed anywhere.
fn check_switch_focus(state: &mut RuntimeState, mouse: &MouseEvent) {
    let modal = state.windows.modal_window_active();

    if mouse.kind == MouseEventType::Down
        && state.menus.is_active()
        && mouse.abs_y != 0
        && !state.menus.mouse_on_menu(mouse.abs_x, mouse.abs_y)
    {
        state.menus.close_menu();
    }

    if mouse.kind == MouseEventType::Down && mouse.button1 && !modal && mouse.abs_y == 0 {
        match state.menus.title_at(mouse.abs_x) {
            Some(menu) => state.menus.open_top_level(menu),
            None => state.menus.close_menu(),
        }
        return;
    }

    if mouse.kind == MouseEventType::Motion
        && mouse.button1
        && state.menus.is_active()
        && mouse.abs_y == 0
    {
        if let Some(menu) = state.menus.title_at(mouse.abs_x) {
            if state.menus.active() != Some(menu) {
                state.menus.open_top_level(menu);
            }
        }
        return;
    }

    if mouse.kind == MouseEventType::Up && state.windows.len() >= 2 {
        state.windows.focus_at(mouse.abs_x, mouse.abs_y);
    }
}

pub(crate) fn dispatch_primary(app: &AppHandle, event: InputEvent) {
    let shared = app.shared();
    let mut state = shared.state();

    if let InputEvent::Mouse(mouse) = &event {
        check_switch_focus(&mut state, mouse);
    }

    if state.menus.is_active() && !matches!(event, InputEvent::Command(_) | InputEvent::Menu(_)) {
        let action = match &event {
            InputEvent::Keypress(key) => state.menus.handle_key(key),
            InputEvent::Mouse(mouse) => state.menus.handle_mouse(mouse),
            _ => MenuAction::Consumed,
        };
        drop(state);
        if let MenuAction::Dispatch(id) = action {
            shared.post_event(InputEvent::Menu(id));
        }
        return;
    }

    if let InputEvent::Keypress(key) = &event {
        let modal = state.windows.modal_window_active();
        let active = state.windows.active_handler();
        drop(state);
        let claimed = active.is_some_and(|handler| lock_handler(&handler).is_shortcut_keypress(key));

        if !claimed && !modal {
            let mut state = shared.state();
            if let Some(id) = state.menus.accelerator(key) {
                drop(state);
                trace!(key = %key.key_id(), ?id, "accelerator");
                shared.post_event(InputEvent::Menu(id));
                return;
            }
            if let Some(menu) = state.menus.mnemonic_menu(key) {
                state.menus.open_top_level(menu);
                return;
            }
        }
    } else {
        drop(state);
    }

    let handled = match &event {
        InputEvent::Command(command) => handle_command(app, *command),
        InputEvent::Menu(id) => handle_menu(app, *id),
        _ => false,
    };
    if handled {
        return;
    }

    let target = {
        let state = shared.state();
        state
            .windows
            .active()
            .map(|window| (window.x, window.y))
            .zip(state.windows.active_handler())
    };
    if let Some(((x, y), handler)) = target {
        let event = localize(event, x, y);
        lock_handler(&handler).handle_event(&event, app);
    }
}

pub(crate) fn dispatch_secondary(app: &AppHandle, receiver: WindowId, event: InputEvent) {
    let target = {
        let state = app.shared().state();
        state
            .windows
            .window(receiver)
            .map(|window| (window.x, window.y))
            .zip(state.windows.handler(receiver))
    };
    match target {
        Some(((x, y), handler)) => {
            let event = localize(event, x, y);
            lock_handler(&handler).handle_event(&event, app);
        }
        None => trace!(?receiver, "secondary receiver window is gone"),
    }
}

fn localize(event: InputEvent, origin_x: i32, origin_y: i32) -> InputEvent {
    match event {
        InputEvent::Mouse(mouse) => InputEvent::Mouse(mouse.localized(origin_x, origin_y)),
        other => other,
    }
}

fn handle_command(app: &AppHandle, command: Command) -> bool {
    match command {
        Command::Abort | Command::Exit => app.quit(),
        Command::Tile => app.tile_windows(),
        Command::Cascade => app.cascade_windows(),
        Command::CloseAll => app.close_all_windows(),
        Command::WindowNext => app.switch_window(true),
        Command::WindowPrevious => app.switch_window(false),
        Command::WindowClose => {
            if let Some(id) = app.active_window() {
                app.close_window(id);
            }
        }
    }
    true
}

fn handle_menu(app: &AppHandle, id: MenuItemId) -> bool {
    let command = match id {
        MenuItemId::EXIT => Some(Command::Exit),
        MenuItemId::TILE => Some(Command::Tile),
        MenuItemId::CASCADE => Some(Command::Cascade),
        MenuItemId::CLOSE_ALL => Some(Command::CloseAll),
        MenuItemId::WINDOW_NEXT => Some(Command::WindowNext),
        MenuItemId::WINDOW_PREVIOUS => Some(Command::WindowPrevious),
        MenuItemId::WINDOW_CLOSE => Some(Command::WindowClose),
        _ => None,
    };
    if let Some(command) = command {
        return handle_command(app, command);
    }
    let hook = lock(&app.shared().menu_hook).clone();
    hook.is_some_and(|hook| hook(id, app))
}
