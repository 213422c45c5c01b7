//! The run loop, the consumer threads, and the handle windows and timers use to reach them.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use crate::config::EnvConfig;
use crate::core::backend::Backend;
use crate::core::input_event::{InputEvent, MenuItemId};
use crate::core::key::Keypress;
use crate::error::{DesktopError, Result};
use crate::render::Painter;
use crate::runtime::dispatch;
use crate::runtime::menu::MenuId;
use crate::runtime::state::{RuntimeState, Shared};
use crate::runtime::sync::lock;
use crate::runtime::timer::TimerId;
use crate::runtime::window::{handler_ref, Window, WindowHandler, WindowId};
use crate::runtime::window_manager::DesktopArea;

/// Clonable access to the runtime from window handlers, timers and other threads.
#[derive(Clone)]
pub struct AppHandle {
    shared: Arc<Shared>,
}

impl AppHandle {
    pub(crate) fn shared(&self) -> &Shared {
        &self.shared
    }

    fn after_window_change(&self) {
        self.shared.deliver_notices();
        self.shared.request_repaint();
    }

    // Windows

    pub fn add_window(&self, window: Window, handler: impl WindowHandler + 'static) -> WindowId {
        let mut state = self.shared.state();
        let area = state.area;
        let id = state.windows.add(window, handler_ref(handler), &area);
        drop(state);
        self.after_window_change();
        id
    }

    /// Close a window. Returns false for unknown windows and for unclosable ones while the
    /// application is running.
    pub fn close_window(&self, id: WindowId) -> bool {
        let quitting = self.shared.is_quitting();
        let closed = self.shared.state().windows.close(id, quitting).is_some();
        if closed && self.shared.handoff.release_if(id) {
            self.shared.consumers.notify();
        }
        self.after_window_change();
        closed
    }

    pub fn switch_window(&self, forward: bool) {
        self.shared.state().windows.switch(forward);
        self.after_window_change();
    }

    pub fn activate_window(&self, id: WindowId) -> Result<()> {
        self.shared.state().windows.activate(id)?;
        self.after_window_change();
        Ok(())
    }

    /// Skipped while a menu is open.
    pub fn tile_windows(&self) {
        let mut state = self.shared.state();
        if state.menus.is_active() {
            return;
        }
        let area = state.area;
        state.windows.tile(&area);
        drop(state);
        self.shared.request_repaint();
    }

    /// Skipped while a menu is open.
    pub fn cascade_windows(&self) {
        let mut state = self.shared.state();
        if state.menus.is_active() {
            return;
        }
        let area = state.area;
        state.windows.cascade(&area);
        drop(state);
        self.shared.request_repaint();
    }

    /// Close every closable window. Skipped while a menu is open.
    pub fn close_all_windows(&self) {
        let ids = {
            let state = self.shared.state();
            if state.menus.is_active() {
                return;
            }
            state.windows.ids()
        };
        for id in ids {
            self.close_window(id);
        }
    }

    /// Apply `update` to a window's geometry, title or flags.
    pub fn update_window<F: FnOnce(&mut Window)>(&self, id: WindowId, update: F) -> Result<()> {
        let mut state = self.shared.state();
        let window = state
            .windows
            .window_mut(id)
            .ok_or(DesktopError::UnknownWindow(id))?;
        update(window);
        drop(state);
        self.shared.request_repaint();
        Ok(())
    }

    pub fn window(&self, id: WindowId) -> Option<Window> {
        self.shared.state().windows.window(id).cloned()
    }

    /// Open windows, topmost first.
    pub fn windows(&self) -> Vec<Window> {
        self.shared
            .state()
            .windows
            .by_z()
            .into_iter()
            .map(|(window, _)| window)
            .collect()
    }

    pub fn active_window(&self) -> Option<WindowId> {
        self.shared.state().windows.active_id()
    }

    // Menus

    pub fn add_menu(&self, title: &str) -> MenuId {
        let id = self.shared.state().menus.add_menu(title);
        self.shared.request_repaint();
        id
    }

    pub fn add_menu_item(
        &self,
        menu: MenuId,
        id: MenuItemId,
        label: &str,
        key: Option<Keypress>,
    ) -> Result<()> {
        self.shared.state().menus.add_item(menu, id, label, key)
    }

    pub fn add_menu_separator(&self, menu: MenuId) -> Result<()> {
        self.shared.state().menus.add_separator(menu)
    }

    pub fn add_sub_menu(&self, parent: MenuId, label: &str) -> Result<MenuId> {
        self.shared.state().menus.add_sub_menu(parent, label)
    }

    pub fn enable_menu_item(&self, id: MenuItemId) -> bool {
        self.shared.state().menus.enable_item(id)
    }

    pub fn disable_menu_item(&self, id: MenuItemId) -> bool {
        self.shared.state().menus.disable_item(id)
    }

    pub fn enable_menu_items(&self, lower: MenuItemId, upper: MenuItemId) -> Result<usize> {
        self.shared.state().menus.enable_items(lower, upper)
    }

    pub fn disable_menu_items(&self, lower: MenuItemId, upper: MenuItemId) -> Result<usize> {
        self.shared.state().menus.disable_items(lower, upper)
    }

    /// `&File` with Exit (Alt+X).
    pub fn add_file_menu(&self) -> Result<MenuId> {
        let menu = self.add_menu("&File");
        self.add_menu_item(
            menu,
            MenuItemId::EXIT,
            "E&xit",
            Some(Keypress::ch('x').alt()),
        )?;
        Ok(menu)
    }

    /// `&Window` with the built-in window management items.
    pub fn add_window_menu(&self) -> Result<MenuId> {
        let menu = self.add_menu("&Window");
        self.add_menu_item(menu, MenuItemId::TILE, "&Tile", None)?;
        self.add_menu_item(menu, MenuItemId::CASCADE, "C&ascade", None)?;
        self.add_menu_item(menu, MenuItemId::CLOSE_ALL, "Close &All", None)?;
        self.add_menu_separator(menu)?;
        self.add_menu_item(menu, MenuItemId::WINDOW_NEXT, "&Next", Some(Keypress::f(6)))?;
        self.add_menu_item(
            menu,
            MenuItemId::WINDOW_PREVIOUS,
            "&Previous",
            Some(Keypress::f(6).shift()),
        )?;
        self.add_menu_item(
            menu,
            MenuItemId::WINDOW_CLOSE,
            "&Close",
            Some(Keypress::ch('w').ctrl()),
        )?;
        Ok(menu)
    }

    /// Handle application menu ids not claimed by the built-in items.
    pub fn set_menu_hook<F>(&self, hook: F)
    where
        F: Fn(MenuItemId, &AppHandle) -> bool + Send + Sync + 'static,
    {
        *lock(&self.shared.menu_hook) = Some(Arc::new(hook));
    }

    pub fn set_status_text(&self, text: Option<String>) {
        self.shared.state().status = text;
        self.shared.request_repaint();
    }

    // Timers

    /// Run `action` on the run loop after `duration`, repeatedly when `recurring`.
    pub fn add_timer<F>(&self, duration: Duration, recurring: bool, action: F) -> TimerId
    where
        F: FnMut(&AppHandle) + Send + 'static,
    {
        let id = self
            .shared
            .state()
            .timers
            .add(duration, recurring, Instant::now(), Box::new(action));
        self.shared.run_loop.notify();
        id
    }

    pub fn remove_timer(&self, id: TimerId) -> bool {
        self.shared.state().timers.remove(id)
    }

    // Events

    pub fn post_event(&self, event: InputEvent) {
        self.shared.post_event(event);
    }

    pub fn post_menu_event(&self, id: MenuItemId) {
        self.shared.post_event(InputEvent::Menu(id));
    }

    // Secondary consumer

    /// Route every event to `window` on a dedicated consumer thread until the window closes.
    pub fn enable_secondary_receiver(&self, window: WindowId) -> Result<()> {
        if self.shared.state().windows.window(window).is_none() {
            return Err(DesktopError::UnknownWindow(window));
        }
        self.shared.handoff.bind(window)?;
        let app = self.clone();
        let spawned = thread::Builder::new()
            .name("desktop-secondary".to_string())
            .spawn(move || secondary_loop(app));
        match spawned {
            Ok(thread) => {
                *lock(&self.shared.secondary_thread) = Some(thread);
                Ok(())
            }
            Err(err) => {
                self.shared.handoff.release();
                self.shared.handoff.finish();
                Err(err.into())
            }
        }
    }

    /// Park the primary consumer until the secondary consumer exits. Must be called from the
    /// primary consumer, i.e. from inside a window handler.
    pub fn yield_to_secondary(&self) -> Result<()> {
        self.check_primary()?;
        if !self.shared.handoff.secondary_running() {
            return Err(DesktopError::NoSecondaryReceiver);
        }
        debug!("primary consumer yielding");
        self.shared.gate.leave();
        self.shared.handoff.wait_finished();
        if let Some(thread) = lock(&self.shared.secondary_thread).take() {
            if thread.join().is_err() {
                error!("secondary consumer panicked");
            }
        }
        self.shared.gate.enter();
        debug!("primary consumer resumed");
        Ok(())
    }

    /// Add a window and block the calling handler until it closes.
    pub fn run_modal(&self, window: Window, handler: impl WindowHandler + 'static) -> Result<WindowId> {
        self.check_primary()?;
        let id = self.add_window(window, handler);
        self.enable_secondary_receiver(id)?;
        self.yield_to_secondary()?;
        Ok(id)
    }

    fn check_primary(&self) -> Result<()> {
        if self.shared.primary_thread.get() != Some(&thread::current().id()) {
            return Err(DesktopError::NotPrimaryConsumer);
        }
        Ok(())
    }

    // Lifecycle

    pub fn quit(&self) {
        self.shared.quit();
    }

    pub fn is_quitting(&self) -> bool {
        self.shared.is_quitting()
    }

    pub fn request_repaint(&self) {
        self.shared.request_repaint();
    }

    pub fn desktop_area(&self) -> DesktopArea {
        self.shared.state().area
    }

    /// Wait until both queues are empty and no consumer is dispatching. Returns false on
    /// timeout.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.shared.fill.is_empty()
                && self.shared.drain.is_empty()
                && !self.shared.gate.is_inside()
            {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            let seen = self.shared.run_loop.generation();
            self.shared
                .run_loop
                .wait_timeout(seen, Duration::from_millis(1));
        }
    }
}

/// Quits the application if a consumer thread unwinds, and always marks a secondary consumer
/// as finished so the parked primary resumes.
struct ConsumerExit<'a> {
    shared: &'a Shared,
    secondary: bool,
}

impl Drop for ConsumerExit<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            error!(secondary = self.secondary, "event consumer panicked");
            self.shared.quit();
        }
        if self.secondary {
            self.shared.handoff.finish();
            self.shared.consumers.notify();
        }
    }
}

/// Leaves the dispatch gate even when a handler panics.
struct Inside<'a>(&'a Shared);

impl<'a> Inside<'a> {
    fn enter(shared: &'a Shared) -> Self {
        shared.gate.enter();
        Self(shared)
    }
}

impl Drop for Inside<'_> {
    fn drop(&mut self) {
        self.0.gate.leave();
    }
}

fn primary_loop(app: AppHandle) {
    let shared = app.shared();
    let _ = shared.primary_thread.set(thread::current().id());
    let _exit = ConsumerExit {
        shared,
        secondary: false,
    };
    debug!("primary consumer started");
    loop {
        let seen = shared.consumers.generation();
        if shared.is_quitting() {
            break;
        }
        if shared.handoff.secondary_running() || shared.drain.is_empty() {
            shared.consumers.wait(seen);
            continue;
        }

        let inside = Inside::enter(shared);
        for event in shared.drain.take_all() {
            if shared.is_quitting() {
                break;
            }
            dispatch::dispatch_primary(&app, event);
            shared.deliver_notices();
        }
        drop(inside);
        shared.request_repaint();
    }
    debug!("primary consumer stopped");
}

fn secondary_loop(app: AppHandle) {
    let shared = app.shared();
    let _exit = ConsumerExit {
        shared,
        secondary: true,
    };
    debug!("secondary consumer started");
    loop {
        let seen = shared.consumers.generation();
        let Some(receiver) = shared.handoff.receiver() else {
            if shared.handoff.was_released() || shared.is_quitting() {
                break;
            }
            error!("secondary consumer woken with no receiver bound");
            panic!("secondary consumer woken with no receiver bound");
        };
        if shared.is_quitting() {
            break;
        }
        if shared.drain.is_empty() {
            shared.consumers.wait(seen);
            continue;
        }

        let inside = Inside::enter(shared);
        let mut events = shared.drain.take_all().into_iter();
        for event in events.by_ref() {
            dispatch::dispatch_secondary(&app, receiver, event);
            shared.deliver_notices();
            if shared.handoff.receiver() != Some(receiver) {
                break;
            }
        }
        let rest: Vec<InputEvent> = events.collect();
        if !rest.is_empty() {
            shared.drain.requeue_front(rest);
            shared.consumers.notify();
        }
        drop(inside);
        shared.request_repaint();
    }
    debug!("secondary consumer stopped");
}

/// Owns the backend and drives the run loop on the calling thread.
pub struct Application<B: Backend> {
    backend: B,
    shared: Arc<Shared>,
    painter: Painter,
    primary: Option<JoinHandle<()>>,
    raw: Vec<InputEvent>,
    last_pointer: Option<(i32, i32)>,
    started: bool,
    finished: bool,
}

impl<B: Backend> Application<B> {
    pub fn new(backend: B) -> Self {
        Self::with_config(backend, EnvConfig::from_env())
    }

    pub fn with_config(mut backend: B, config: EnvConfig) -> Self {
        let (width, height) = backend.screen().dimensions();
        let state = RuntimeState::new(width, height, &config);
        Self {
            backend,
            shared: Arc::new(Shared::new(state, config)),
            painter: Painter::new(),
            primary: None,
            raw: Vec::new(),
            last_pointer: None,
            started: false,
            finished: false,
        }
    }

    pub fn handle(&self) -> AppHandle {
        AppHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Start the backend and the primary consumer. Called by `run`/`run_once` when needed.
    pub fn start(&mut self) -> Result<()> {
        if self.started {
            return Ok(());
        }
        let shared = Arc::clone(&self.shared);
        self.backend
            .start(Arc::new(move || shared.run_loop.notify()))?;

        let app = self.handle();
        let primary = thread::Builder::new()
            .name("desktop-primary".to_string())
            .spawn(move || primary_loop(app))?;
        self.primary = Some(primary);
        self.started = true;
        self.shared.request_repaint();
        info!("desktop started");
        Ok(())
    }

    /// Run until quit, then tear down.
    pub fn run(&mut self) -> Result<()> {
        self.start()?;

        #[cfg(unix)]
        let _signals = if self.shared.config.signal_handlers {
            let shared = Arc::clone(&self.shared);
            match crate::platform::install_signal_handlers(move || {
                shared.post_event(InputEvent::Command(crate::core::input_event::Command::Abort))
            }) {
                Ok(guard) => Some(guard),
                Err(err) => {
                    warn!(error = %err, "failed to install signal handlers");
                    None
                }
            }
        } else {
            None
        };
        let _panic = self
            .backend
            .crash_cleanup()
            .map(|cleanup| crate::platform::install_panic_hook(move || cleanup()));

        while !self.shared.is_quitting() {
            self.run_once();
        }
        self.shutdown();
        Ok(())
    }

    /// One run-loop iteration: wait, pull and filter input, wake the consumer, tick timers and
    /// idle hooks, draw.
    pub fn run_once(&mut self) {
        if !self.started {
            if let Err(err) = self.start() {
                error!(error = %err, "failed to start desktop");
                self.shared.quit();
                return;
            }
        }
        if self.shared.is_quitting() {
            return;
        }

        self.wait_for_work();

        self.shared.gate.lock_out();

        self.backend.pull_events(&mut self.raw);
        self.shared.fill.extend(self.raw.drain(..));
        for event in self.shared.fill.take_all() {
            dispatch::meta_handle_event(&self.shared, self.backend.screen(), event);
        }
        if !self.shared.drain.is_empty() {
            self.shared.consumers.notify();
        }

        self.run_timers();
        self.run_idle_hooks();
        self.shared.deliver_notices();
        self.draw();

        self.shared.gate.release();
    }

    fn wait_for_work(&mut self) {
        let seen = self.shared.run_loop.generation();
        let pointer_moved = self.shared.state().pointer != self.last_pointer;
        if self.shared.needs_repaint() || pointer_moved || !self.shared.fill.is_empty() {
            return;
        }
        let now = Instant::now();
        let cap = self.shared.config.idle_cap;
        let mut timeout = self.shared.state().timers.sleep_time(now, cap);
        if let Some(deadline) = self.backend.next_deadline() {
            timeout = timeout.min(deadline.saturating_duration_since(now));
        }
        if !timeout.is_zero() {
            self.shared.run_loop.wait_timeout(seen, timeout);
        }
    }

    fn run_timers(&mut self) {
        let app = self.handle();
        let mut due = self.shared.state().timers.take_due(Instant::now());
        if due.is_empty() {
            return;
        }
        for timer in &mut due {
            let action = timer.action_mut();
            action(&app);
        }
        self.shared.state().timers.restore(due);
        self.shared.request_repaint();
    }

    fn run_idle_hooks(&mut self) {
        let handlers = self.shared.state().windows.handlers();
        for handler in handlers {
            if let Ok(mut handler) = handler.try_lock() {
                handler.on_idle();
            }
        }
    }

    fn draw(&mut self) {
        let repaint = self.shared.take_repaint();
        let state = self.shared.state();
        let pointer = state.pointer;
        let screen = self.backend.screen();
        if repaint {
            self.painter.paint(screen, &state);
        } else if pointer != self.last_pointer {
            self.painter.move_pointer(screen, pointer);
        } else {
            return;
        }
        drop(state);
        self.last_pointer = pointer;
        self.backend.flush_screen();
    }

    /// Stop consumers, restore the terminal, and close every window. Idempotent.
    pub fn shutdown(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        self.shared.quit();
        self.shared.gate.release();

        if let Some(primary) = self.primary.take() {
            if primary.join().is_err() {
                error!("primary consumer panicked");
            }
        }
        if let Some(secondary) = lock(&self.shared.secondary_thread).take() {
            let _ = secondary.join();
        }
        if self.started {
            self.backend.shutdown();
        }

        let ids = self.shared.state().windows.ids();
        for id in ids {
            self.shared.state().windows.close(id, true);
        }
        self.shared.deliver_notices();
        info!("desktop stopped");
    }
}

impl<B: Backend> Drop for Application<B> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pretty_assertions::assert_eq;

    use super::{secondary_loop, AppHandle};
    use crate::config::EnvConfig;
    use crate::runtime::state::{RuntimeState, Shared};
    use crate::runtime::window::{Window, WindowHandler, WindowId};

    struct Blank;

    impl WindowHandler for Blank {}

    fn handle() -> AppHandle {
        let config = EnvConfig {
            smart_placement: false,
            signal_handlers: false,
            ..EnvConfig::default()
        };
        let state = RuntimeState::new(80, 24, &config);
        AppHandle {
            shared: Arc::new(Shared::new(state, config)),
        }
    }

    #[test]
    #[should_panic(expected = "secondary consumer woken with no receiver bound")]
    fn secondary_woken_without_a_receiver_is_fatal() {
        let app = handle();
        app.shared().handoff.bind(WindowId(7)).expect("bind");
        // Slot cleared without a release.
        app.shared().handoff.finish();
        secondary_loop(app);
    }

    #[test]
    fn secondary_exits_quietly_after_release() {
        let app = handle();
        app.shared().handoff.bind(WindowId(7)).expect("bind");
        app.shared().handoff.release();
        secondary_loop(app.clone());

        assert!(!app.shared().handoff.secondary_running());
        assert!(!app.is_quitting());
    }

    #[test]
    fn secondary_exits_quietly_while_quitting() {
        let app = handle();
        app.shared().handoff.bind(WindowId(7)).expect("bind");
        app.shared().handoff.finish();
        app.quit();
        secondary_loop(app.clone());

        assert!(!app.shared().handoff.secondary_running());
    }

    #[test]
    fn tile_and_cascade_wait_for_the_menu_to_close() {
        let app = handle();
        let menu = app.add_file_menu().expect("file menu");
        let a = app.add_window(Window::new("a", 30, 5, 10, 5), Blank);
        let b = app.add_window(Window::new("b", 30, 5, 10, 5), Blank);
        let positions = |app: &AppHandle| {
            [a, b].map(|id| {
                let state = app.shared().state();
                let window = state.windows.window(id).expect("window");
                (window.x, window.y, window.width)
            })
        };

        app.shared().state().menus.activate(menu).expect("activate");
        app.tile_windows();
        app.cascade_windows();
        assert_eq!(positions(&app), [(30, 5, 10), (30, 5, 10)]);

        app.shared().state().menus.close_menu();
        app.cascade_windows();
        assert_eq!(positions(&app), [(0, 1, 10), (1, 2, 10)]);
    }
}
