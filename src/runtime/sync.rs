//! Synchronization primitives shared by the run loop and the consumer threads.
//!
//! Every lock here recovers from poisoning: a panicking handler must not wedge the run loop's
//! teardown path.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::core::input_event::InputEvent;
use crate::error::{DesktopError, Result};
use crate::runtime::window::WindowId;

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn wait<'a, T>(cvar: &Condvar, guard: MutexGuard<'a, T>) -> MutexGuard<'a, T> {
    cvar.wait(guard)
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn wait_timeout<'a, T>(
    cvar: &Condvar,
    guard: MutexGuard<'a, T>,
    timeout: Duration,
) -> MutexGuard<'a, T> {
    match cvar.wait_timeout(guard, timeout) {
        Ok((guard, _)) => guard,
        Err(poisoned) => poisoned.into_inner().0,
    }
}

#[derive(Debug, Default)]
struct GateState {
    locked_out: bool,
    inside: usize,
}

/// Mutual exclusion between the run loop's mutate/draw phase and a consumer's dispatch batch.
///
/// The run loop calls [`DispatchGate::lock_out`], which blocks new batches and waits for the
/// one in flight to finish. Consumers bracket each batch with `enter`/`leave`.
#[derive(Debug, Default)]
pub struct DispatchGate {
    state: Mutex<GateState>,
    cvar: Condvar,
}

impl DispatchGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lock_out(&self) {
        let mut state = lock(&self.state);
        state.locked_out = true;
        while state.inside > 0 {
            state = wait(&self.cvar, state);
        }
    }

    pub fn release(&self) {
        let mut state = lock(&self.state);
        state.locked_out = false;
        self.cvar.notify_all();
    }

    pub fn enter(&self) {
        let mut state = lock(&self.state);
        while state.locked_out {
            state = wait(&self.cvar, state);
        }
        state.inside += 1;
    }

    pub fn leave(&self) {
        let mut state = lock(&self.state);
        state.inside = state.inside.saturating_sub(1);
        self.cvar.notify_all();
    }

    pub fn is_inside(&self) -> bool {
        lock(&self.state).inside > 0
    }

    pub fn is_locked_out(&self) -> bool {
        lock(&self.state).locked_out
    }
}

/// FIFO of input events behind its own lock.
#[derive(Debug, Default)]
pub struct EventQueue {
    events: Mutex<VecDeque<InputEvent>>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: InputEvent) {
        lock(&self.events).push_back(event);
    }

    pub fn extend<I: IntoIterator<Item = InputEvent>>(&self, events: I) {
        lock(&self.events).extend(events);
    }

    /// Put unprocessed events back ahead of anything queued since they were taken.
    pub fn requeue_front(&self, events: Vec<InputEvent>) {
        let mut queue = lock(&self.events);
        for event in events.into_iter().rev() {
            queue.push_front(event);
        }
    }

    pub fn take_all(&self) -> Vec<InputEvent> {
        lock(&self.events).drain(..).collect()
    }

    pub fn len(&self) -> usize {
        lock(&self.events).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.events).is_empty()
    }
}

/// Wake-up counter. Waiters remember the generation they observed before checking for work,
/// so a notify between the check and the wait is never lost.
#[derive(Debug, Default)]
pub struct Signal {
    generation: Mutex<u64>,
    cvar: Condvar,
}

impl Signal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> u64 {
        *lock(&self.generation)
    }

    pub fn notify(&self) {
        let mut generation = lock(&self.generation);
        *generation = generation.wrapping_add(1);
        self.cvar.notify_all();
    }

    /// Block until the generation moves past `seen`.
    pub fn wait(&self, seen: u64) -> u64 {
        let mut generation = lock(&self.generation);
        while *generation == seen {
            generation = wait(&self.cvar, generation);
        }
        *generation
    }

    /// Like [`Signal::wait`] but gives up after `timeout`.
    pub fn wait_timeout(&self, seen: u64, timeout: Duration) -> u64 {
        let deadline = Instant::now() + timeout;
        let mut generation = lock(&self.generation);
        while *generation == seen {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            generation = wait_timeout(&self.cvar, generation, deadline - now);
        }
        *generation
    }
}

#[derive(Debug, Default)]
struct HandoffState {
    receiver: Option<WindowId>,
    released: bool,
    secondary_running: bool,
}

/// The secondary receiver slot. At most one secondary consumer exists at a time.
#[derive(Debug, Default)]
pub struct Handoff {
    state: Mutex<HandoffState>,
    cvar: Condvar,
}

impl Handoff {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `window` as the receiver for a new secondary consumer.
    pub fn bind(&self, window: WindowId) -> Result<()> {
        let mut state = lock(&self.state);
        if state.receiver.is_some() || state.secondary_running {
            return Err(DesktopError::SecondaryActive);
        }
        state.receiver = Some(window);
        state.released = false;
        state.secondary_running = true;
        debug!(?window, "secondary receiver bound");
        Ok(())
    }

    pub fn receiver(&self) -> Option<WindowId> {
        lock(&self.state).receiver
    }

    /// Unbind the receiver so the secondary consumer can exit.
    pub fn release(&self) {
        let mut state = lock(&self.state);
        if let Some(window) = state.receiver.take() {
            debug!(?window, "secondary receiver released");
        }
        state.released = true;
        self.cvar.notify_all();
    }

    /// Release only when `window` is the bound receiver.
    pub fn release_if(&self, window: WindowId) -> bool {
        let mut state = lock(&self.state);
        if state.receiver != Some(window) {
            return false;
        }
        state.receiver = None;
        state.released = true;
        debug!(?window, "secondary receiver window closed");
        self.cvar.notify_all();
        true
    }

    pub fn was_released(&self) -> bool {
        lock(&self.state).released
    }

    pub fn secondary_running(&self) -> bool {
        lock(&self.state).secondary_running
    }

    /// Called by the secondary consumer on its way out.
    pub fn finish(&self) {
        let mut state = lock(&self.state);
        state.receiver = None;
        state.secondary_running = false;
        self.cvar.notify_all();
    }

    /// Block until the secondary consumer has exited.
    pub fn wait_finished(&self) {
        let mut state = lock(&self.state);
        while state.secondary_running {
            state = wait(&self.cvar, state);
        }
    }
}
