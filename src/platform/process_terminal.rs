//! Raw-mode terminal over the process's stdin/stdout.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};
use std::thread::{self, JoinHandle};

use tracing::{debug, warn};

use crate::config::EnvConfig;
use crate::core::escape;
use crate::core::terminal::{CrashCleanup, Terminal};
use crate::platform::hooks::HookTerminal;

#[cfg(unix)]
use libc::{self, c_int};
#[cfg(unix)]
use signal_hook::iterator::Signals;

const POLL_INTERVAL_MS: i32 = 50;

type InputHandler = Arc<Mutex<Option<Box<dyn FnMut(String) + Send>>>>;
type ResizeHandler = Arc<Mutex<Option<Box<dyn FnMut() + Send>>>>;

/// Split the longest valid UTF-8 prefix off `pending`. Invalid bytes become U+FFFD; an
/// incomplete trailing sequence stays in `pending` for the next read.
pub(crate) fn take_utf8(pending: &mut Vec<u8>) -> String {
    let mut out = String::new();
    let mut consumed = 0;
    loop {
        let rest = &pending[consumed..];
        match std::str::from_utf8(rest) {
            Ok(text) => {
                out.push_str(text);
                consumed = pending.len();
                break;
            }
            Err(err) => {
                let valid = err.valid_up_to();
                out.push_str(&String::from_utf8_lossy(&rest[..valid]));
                consumed += valid;
                match err.error_len() {
                    Some(len) => {
                        out.push(char::REPLACEMENT_CHARACTER);
                        consumed += len;
                    }
                    None => break,
                }
            }
        }
    }
    pending.drain(..consumed);
    out
}

#[cfg(unix)]
fn write_all_fd(fd: c_int, bytes: &[u8]) -> io::Result<()> {
    let mut written = 0;
    while written < bytes.len() {
        let remaining = &bytes[written..];
        let result =
            unsafe { libc::write(fd, remaining.as_ptr() as *const libc::c_void, remaining.len()) };
        if result > 0 {
            written += result as usize;
            continue;
        }
        if result == 0 {
            return Err(io::Error::new(io::ErrorKind::WriteZero, "write returned 0"));
        }
        let err = io::Error::last_os_error();
        match err.kind() {
            io::ErrorKind::Interrupted => continue,
            io::ErrorKind::WouldBlock => {
                let mut fds = libc::pollfd {
                    fd,
                    events: libc::POLLOUT,
                    revents: 0,
                };
                unsafe { libc::poll(&mut fds, 1, -1) };
            }
            _ => return Err(err),
        }
    }
    Ok(())
}

#[cfg(unix)]
fn read_winsize(fd: c_int) -> Option<(u16, u16)> {
    let mut size = libc::winsize {
        ws_row: 0,
        ws_col: 0,
        ws_xpixel: 0,
        ws_ypixel: 0,
    };
    let result = unsafe { libc::ioctl(fd, libc::TIOCGWINSZ, &mut size) };
    if result == 0 && size.ws_col > 0 && size.ws_row > 0 {
        Some((size.ws_col, size.ws_row))
    } else {
        None
    }
}

#[cfg(unix)]
fn poll_readable(fd: c_int, timeout_ms: i32) -> bool {
    let mut fds = libc::pollfd {
        fd,
        events: libc::POLLIN,
        revents: 0,
    };
    let result = unsafe { libc::poll(&mut fds, 1, timeout_ms) };
    result > 0 && (fds.revents & libc::POLLIN) != 0
}

#[cfg(unix)]
fn get_termios(fd: c_int) -> io::Result<libc::termios> {
    let mut termios = unsafe { std::mem::zeroed::<libc::termios>() };
    if unsafe { libc::tcgetattr(fd, &mut termios) } != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(termios)
}

#[cfg(unix)]
fn set_termios(fd: c_int, termios: &libc::termios) -> io::Result<()> {
    if unsafe { libc::tcsetattr(fd, libc::TCSANOW, termios) } != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(unix)]
pub struct ProcessTerminal {
    stdin_fd: c_int,
    stdout_fd: c_int,
    original_termios: Option<libc::termios>,
    raw_mode: bool,
    input_handler: InputHandler,
    resize_handler: ResizeHandler,
    input_thread: Option<JoinHandle<()>>,
    stop_flag: Arc<AtomicBool>,
    resize_signal_handle: Option<signal_hook::iterator::Handle>,
    resize_thread: Option<JoinHandle<()>>,
    write_log_path: Option<PathBuf>,
    write_log_failed: bool,
    started: bool,
}

#[cfg(unix)]
impl ProcessTerminal {
    pub fn new() -> Self {
        Self {
            stdin_fd: libc::STDIN_FILENO,
            stdout_fd: libc::STDOUT_FILENO,
            original_termios: None,
            raw_mode: false,
            input_handler: Arc::new(Mutex::new(None)),
            resize_handler: Arc::new(Mutex::new(None)),
            input_thread: None,
            stop_flag: Arc::new(AtomicBool::new(false)),
            resize_signal_handle: None,
            resize_thread: None,
            write_log_path: None,
            write_log_failed: false,
            started: false,
        }
    }

    /// Terminal with the write log from `TAPE_DESKTOP_WRITE_LOG`, if set.
    pub fn from_config(config: &EnvConfig) -> Self {
        let terminal = Self::new();
        match config.write_log.as_deref() {
            Some(path) => terminal.with_write_log(path),
            None => terminal,
        }
    }

    /// Also append everything written to the terminal to `path`.
    pub fn with_write_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.write_log_path = Some(path.into());
        self
    }

    /// Whether `start` managed to switch the device into raw mode.
    pub fn is_raw(&self) -> bool {
        self.raw_mode
    }

    fn enable_raw_mode(&mut self) -> io::Result<()> {
        let original = match self.original_termios {
            Some(original) => original,
            None => {
                let original = get_termios(self.stdin_fd)?;
                self.original_termios = Some(original);
                original
            }
        };
        let mut raw = original;
        unsafe {
            libc::cfmakeraw(&mut raw);
        }
        set_termios(self.stdin_fd, &raw)?;
        self.raw_mode = true;
        Ok(())
    }

    fn restore_cooked_mode(&mut self) -> io::Result<()> {
        if !self.raw_mode {
            return Ok(());
        }
        self.raw_mode = false;
        match self.original_termios.as_ref() {
            Some(original) => set_termios(self.stdin_fd, original),
            None => Ok(()),
        }
    }

    fn start_input_thread(&mut self) {
        let stdin_fd = self.stdin_fd;
        let handler = Arc::clone(&self.input_handler);
        let stop_flag = Arc::clone(&self.stop_flag);

        self.input_thread = Some(thread::spawn(move || {
            let mut buffer = [0u8; 4096];
            let mut pending = Vec::new();
            while !stop_flag.load(Ordering::SeqCst) {
                if !poll_readable(stdin_fd, POLL_INTERVAL_MS) {
                    continue;
                }
                let read_len =
                    unsafe { libc::read(stdin_fd, buffer.as_mut_ptr() as *mut _, buffer.len()) };
                if read_len <= 0 {
                    continue;
                }
                pending.extend_from_slice(&buffer[..read_len as usize]);
                let text = take_utf8(&mut pending);
                if text.is_empty() {
                    continue;
                }
                let mut handler = match handler.lock() {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                };
                if let Some(handler) = handler.as_mut() {
                    handler(text);
                }
            }
        }));
    }

    fn stop_input_thread(&mut self) {
        self.stop_flag.store(true, Ordering::SeqCst);
        if let Some(handle) = self.input_thread.take() {
            let _ = handle.join();
        }
    }

    fn start_resize_thread(&mut self) -> io::Result<()> {
        let mut signals = Signals::new([libc::SIGWINCH])?;
        let handle = signals.handle();
        let resize_handler = Arc::clone(&self.resize_handler);

        let thread = thread::spawn(move || {
            for _ in signals.forever() {
                let mut handler = match resize_handler.lock() {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                };
                if let Some(handler) = handler.as_mut() {
                    handler();
                }
            }
        });

        self.resize_signal_handle = Some(handle);
        self.resize_thread = Some(thread);
        Ok(())
    }

    fn stop_resize_thread(&mut self) {
        if let Some(handle) = self.resize_signal_handle.take() {
            handle.close();
        }
        if let Some(thread) = self.resize_thread.take() {
            let _ = thread.join();
        }
    }

    fn clear_handlers(&mut self) {
        if let Ok(mut handler) = self.input_handler.lock() {
            *handler = None;
        }
        if let Ok(mut handler) = self.resize_handler.lock() {
            *handler = None;
        }
    }
}

#[cfg(unix)]
impl Default for ProcessTerminal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(unix)]
impl Terminal for ProcessTerminal {
    fn start(
        &mut self,
        on_input: Box<dyn FnMut(String) + Send>,
        on_resize: Box<dyn FnMut() + Send>,
    ) -> io::Result<()> {
        if let Ok(mut handler) = self.input_handler.lock() {
            *handler = Some(on_input);
        }
        if let Ok(mut handler) = self.resize_handler.lock() {
            *handler = Some(on_resize);
        }
        self.stop_flag.store(false, Ordering::SeqCst);

        if let Err(err) = self.enable_raw_mode() {
            warn!(error = %err, "raw mode unavailable, continuing in cooked mode");
        }
        if let Err(err) = self.start_resize_thread() {
            warn!(error = %err, "SIGWINCH registration failed, resizes are polled only");
        }
        self.start_input_thread();
        self.started = true;
        debug!(raw = self.raw_mode, "process terminal started");
        Ok(())
    }

    fn stop(&mut self) -> io::Result<()> {
        if !self.started {
            return Ok(());
        }
        self.started = false;
        self.stop_input_thread();
        self.stop_resize_thread();
        self.clear_handlers();

        // Drop unread input so it does not leak into the shell.
        let _ = unsafe { libc::tcflush(self.stdin_fd, libc::TCIFLUSH) };
        self.restore_cooked_mode()
    }

    fn write(&mut self, data: &str) -> io::Result<()> {
        if data.is_empty() {
            return Ok(());
        }
        write_all_fd(self.stdout_fd, data.as_bytes())?;
        if self.write_log_failed {
            return Ok(());
        }
        if let Some(path) = self.write_log_path.as_ref() {
            let result = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .and_then(|mut file| file.write_all(data.as_bytes()));
            if let Err(err) = result {
                warn!(error = %err, path = %path.display(), "write log disabled");
                self.write_log_failed = true;
            }
        }
        Ok(())
    }

    fn size(&self) -> (u16, u16) {
        read_winsize(self.stdout_fd).unwrap_or((80, 24))
    }

    fn crash_cleanup(&self) -> Option<CrashCleanup> {
        let stdin_fd = self.stdin_fd;
        let original = self.original_termios;
        Some(Box::new(move || {
            let terminal = HookTerminal::new();
            terminal.write_best_effort(escape::mouse(false));
            terminal.write_best_effort("\x1b[?25h");
            terminal.write_best_effort(escape::normal(true));
            if let Some(original) = original.as_ref() {
                let _ = set_termios(stdin_fd, original);
            }
        }))
    }
}

#[cfg(unix)]
impl Drop for ProcessTerminal {
    fn drop(&mut self) {
        if let Err(err) = self.stop() {
            warn!(error = %err, "failed to restore terminal mode");
        }
    }
}

#[cfg(not(unix))]
pub struct ProcessTerminal;

#[cfg(not(unix))]
impl ProcessTerminal {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(not(unix))]
impl Terminal for ProcessTerminal {
    fn start(
        &mut self,
        _on_input: Box<dyn FnMut(String) + Send>,
        _on_resize: Box<dyn FnMut() + Send>,
    ) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "ProcessTerminal is only supported on Unix platforms",
        ))
    }

    fn stop(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn write(&mut self, _data: &str) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "ProcessTerminal is only supported on Unix platforms",
        ))
    }

    fn size(&self) -> (u16, u16) {
        (80, 24)
    }
}
