//! Process-level hooks: termination signals and panic cleanup.

use std::io;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::thread::{self, JoinHandle};

#[cfg(unix)]
use libc::c_int;
#[cfg(unix)]
use signal_hook::iterator::Signals;

/// Unregisters the signal thread on drop.
#[cfg(unix)]
pub struct SignalHookGuard {
    handle: signal_hook::iterator::Handle,
    thread: Option<JoinHandle<()>>,
}

#[cfg(unix)]
impl Drop for SignalHookGuard {
    fn drop(&mut self) {
        self.handle.close();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

/// Run `on_signal` for every SIGINT/SIGTERM until the guard is dropped.
#[cfg(unix)]
pub fn install_signal_handlers<F>(on_signal: F) -> io::Result<SignalHookGuard>
where
    F: Fn() + Send + Sync + 'static,
{
    let mut signals = Signals::new([libc::SIGINT, libc::SIGTERM])?;
    let handle = signals.handle();
    let thread = thread::Builder::new()
        .name("desktop-signals".to_string())
        .spawn(move || {
            for signal in signals.forever() {
                tracing::debug!(signal, "termination signal received");
                on_signal();
            }
        })?;

    Ok(SignalHookGuard {
        handle,
        thread: Some(thread),
    })
}

/// Disarms the panic cleanup on drop. The wrapper hook stays installed but becomes inert.
pub struct PanicHookGuard {
    active: Arc<AtomicBool>,
}

impl Drop for PanicHookGuard {
    fn drop(&mut self) {
        self.active.store(false, Ordering::SeqCst);
    }
}

/// Run `cleanup` once on the first panic, then delegate to the previously installed hook.
pub fn install_panic_hook<F>(cleanup: F) -> PanicHookGuard
where
    F: Fn() + Send + Sync + 'static,
{
    let active = Arc::new(AtomicBool::new(true));
    let ran = AtomicBool::new(false);
    let previous = std::panic::take_hook();
    let hook_active = Arc::clone(&active);
    std::panic::set_hook(Box::new(move |info| {
        if hook_active.load(Ordering::SeqCst) && !ran.swap(true, Ordering::SeqCst) {
            cleanup();
        }
        previous(info);
    }));
    PanicHookGuard { active }
}

/// Best-effort writer on the controlling tty for crash cleanup: never panics, never blocks.
#[cfg(unix)]
pub(crate) struct HookTerminal {
    fd: c_int,
    owns_fd: bool,
}

#[cfg(unix)]
impl HookTerminal {
    pub(crate) fn new() -> Self {
        let flags = libc::O_WRONLY | libc::O_NONBLOCK | libc::O_NOCTTY | libc::O_CLOEXEC;
        let fd = unsafe { libc::open(c"/dev/tty".as_ptr(), flags) };
        Self {
            fd,
            owns_fd: fd >= 0,
        }
    }

    pub(crate) fn write_best_effort(&self, data: &str) {
        if self.fd < 0 || data.is_empty() {
            return;
        }
        let bytes = data.as_bytes();
        let mut written = 0;
        while written < bytes.len() {
            let remaining = &bytes[written..];
            let result = unsafe {
                libc::write(
                    self.fd,
                    remaining.as_ptr() as *const libc::c_void,
                    remaining.len(),
                )
            };
            if result > 0 {
                written += result as usize;
                continue;
            }
            if result < 0 && io::Error::last_os_error().kind() == io::ErrorKind::Interrupted {
                continue;
            }
            break;
        }
    }
}

#[cfg(unix)]
impl Drop for HookTerminal {
    fn drop(&mut self) {
        if self.owns_fd {
            unsafe {
                libc::close(self.fd);
            }
        }
    }
}
