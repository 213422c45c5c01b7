//! State shared between the run loop and the consumer threads.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, TryLockError};
use std::thread::{JoinHandle, ThreadId};

use tracing::debug;

use crate::config::EnvConfig;
use crate::core::input_event::{InputEvent, MenuItemId};
use crate::runtime::app::AppHandle;
use crate::runtime::menu::MenuBar;
use crate::runtime::sync::{lock, DispatchGate, EventQueue, Handoff, Signal};
use crate::runtime::timer::TimerList;
use crate::runtime::window::{HandlerRef, WindowHandler, WindowNotice};
use crate::runtime::window_manager::{DesktopArea, WindowManager};

pub type TimerAction = Box<dyn FnMut(&AppHandle) + Send>;

/// Application-level menu handler. Returns true when it consumed the menu event.
pub type MenuHook = Arc<dyn Fn(MenuItemId, &AppHandle) -> bool + Send + Sync>;

/// Windows, menus, timers and desktop geometry, guarded as one unit.
pub struct RuntimeState {
    pub windows: WindowManager,
    pub menus: MenuBar,
    pub timers: TimerList<TimerAction>,
    pub area: DesktopArea,
    /// Last absolute mouse position seen by the run loop.
    pub pointer: Option<(i32, i32)>,
    pub status: Option<String>,
}

impl RuntimeState {
    pub fn new(width: u16, height: u16, config: &EnvConfig) -> Self {
        Self {
            windows: WindowManager::new(config.smart_placement),
            menus: MenuBar::new(),
            timers: TimerList::new(),
            area: DesktopArea::new(width, height),
            pointer: None,
            status: None,
        }
    }
}

pub(crate) struct Shared {
    state: Mutex<RuntimeState>,
    /// Written by the run loop and `post_event`.
    pub(crate) fill: EventQueue,
    /// Filtered events awaiting the authoritative consumer.
    pub(crate) drain: EventQueue,
    pub(crate) gate: DispatchGate,
    pub(crate) handoff: Handoff,
    /// Wakes consumer threads.
    pub(crate) consumers: Signal,
    /// Wakes the run loop.
    pub(crate) run_loop: Signal,
    quit: AtomicBool,
    repaint: AtomicBool,
    pub(crate) primary_thread: OnceLock<ThreadId>,
    pub(crate) secondary_thread: Mutex<Option<JoinHandle<()>>>,
    pub(crate) menu_hook: Mutex<Option<MenuHook>>,
    pub(crate) config: EnvConfig,
}

impl Shared {
    pub(crate) fn new(state: RuntimeState, config: EnvConfig) -> Self {
        Self {
            state: Mutex::new(state),
            fill: EventQueue::new(),
            drain: EventQueue::new(),
            gate: DispatchGate::new(),
            handoff: Handoff::new(),
            consumers: Signal::new(),
            run_loop: Signal::new(),
            quit: AtomicBool::new(false),
            repaint: AtomicBool::new(true),
            primary_thread: OnceLock::new(),
            secondary_thread: Mutex::new(None),
            menu_hook: Mutex::new(None),
            config,
        }
    }

    pub(crate) fn state(&self) -> MutexGuard<'_, RuntimeState> {
        lock(&self.state)
    }

    pub(crate) fn is_quitting(&self) -> bool {
        self.quit.load(Ordering::SeqCst)
    }

    /// Set the quit flag and wake everything that might be waiting on it.
    pub(crate) fn quit(&self) {
        if !self.quit.swap(true, Ordering::SeqCst) {
            debug!("quit requested");
        }
        self.handoff.release();
        self.consumers.notify();
        self.run_loop.notify();
    }

    pub(crate) fn request_repaint(&self) {
        self.repaint.store(true, Ordering::SeqCst);
        self.run_loop.notify();
    }

    pub(crate) fn take_repaint(&self) -> bool {
        self.repaint.swap(false, Ordering::SeqCst)
    }

    pub(crate) fn needs_repaint(&self) -> bool {
        self.repaint.load(Ordering::SeqCst)
    }

    pub(crate) fn post_event(&self, event: InputEvent) {
        self.fill.push(event);
        self.run_loop.notify();
    }

    /// Deliver queued focus/unfocus/close notices. Handlers that are busy (locked by a consumer
    /// that is blocked or dispatching) get theirs on a later pass.
    pub(crate) fn deliver_notices(&self) {
        let notices = self.state().windows.take_notices();
        if notices.is_empty() {
            return;
        }
        let mut busy: Vec<(HandlerRef, WindowNotice)> = Vec::new();
        for (handler, notice) in notices {
            // Keep per-handler order once a handler turned out busy.
            if busy.iter().any(|(held, _)| Arc::ptr_eq(held, &handler)) {
                busy.push((handler, notice));
                continue;
            }
            let delivered = match handler.try_lock() {
                Ok(mut guard) => {
                    apply_notice(&mut **guard, notice);
                    true
                }
                Err(TryLockError::Poisoned(poisoned)) => {
                    apply_notice(&mut **poisoned.into_inner(), notice);
                    true
                }
                Err(TryLockError::WouldBlock) => false,
            };
            if !delivered {
                busy.push((handler, notice));
            }
        }
        if !busy.is_empty() {
            self.state().windows.requeue_notices(busy);
        }
    }
}

fn apply_notice(handler: &mut dyn WindowHandler, notice: WindowNotice) {
    match notice {
        WindowNotice::Focus => handler.on_focus(),
        WindowNotice::Unfocus => handler.on_unfocus(),
        WindowNotice::Close => handler.on_close(),
    }
}

/// Lock a handler for dispatch, recovering from a poisoned lock.
pub(crate) fn lock_handler(handler: &HandlerRef) -> MutexGuard<'_, Box<dyn WindowHandler>> {
    lock(handler)
}
