//! Backend for any ECMA-48 terminal: decoder on the input side, diffing screen on the output
//! side.

use std::io;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use tracing::{debug, warn};

use crate::config::EnvConfig;
use crate::core::backend::{Backend, Waker};
use crate::core::decoder::Decoder;
use crate::core::input_event::InputEvent;
use crate::core::output::{OutputGate, TerminalCmd};
use crate::core::screen::{LogicalScreen, Screen};
use crate::core::terminal::{CrashCleanup, Terminal};

pub struct Ecma48Backend<T: Terminal> {
    terminal: T,
    decoder: Decoder,
    screen: LogicalScreen,
    output: OutputGate,
    inbox: Arc<Mutex<Vec<String>>>,
    started: bool,
}

impl<T: Terminal> Ecma48Backend<T> {
    pub fn new(terminal: T) -> Self {
        let (width, height) = terminal.size();
        Self {
            terminal,
            decoder: Decoder::new(width, height),
            screen: LogicalScreen::new(width, height),
            output: OutputGate::new(),
            inbox: Arc::new(Mutex::new(Vec::new())),
            started: false,
        }
    }

    pub fn with_config(terminal: T, config: &EnvConfig) -> Self {
        let mut backend = Self::new(terminal);
        let (width, height) = backend.decoder.size();
        backend.decoder = Decoder::new(width, height).with_escape_timeout(config.escape_timeout);
        backend
    }

    pub fn terminal(&self) -> &T {
        &self.terminal
    }

    pub fn terminal_mut(&mut self) -> &mut T {
        &mut self.terminal
    }

    pub fn logical_screen(&self) -> &LogicalScreen {
        &self.screen
    }

    fn flush_output(&mut self) {
        if let Err(err) = self.output.flush(&mut self.terminal) {
            warn!(error = %err, "terminal write failed");
        }
    }
}

impl<T: Terminal> Backend for Ecma48Backend<T> {
    fn start(&mut self, waker: Waker) -> io::Result<()> {
        let inbox = Arc::clone(&self.inbox);
        let input_waker = Arc::clone(&waker);
        self.terminal.start(
            Box::new(move |text| {
                match inbox.lock() {
                    Ok(mut chunks) => chunks.push(text),
                    Err(poisoned) => poisoned.into_inner().push(text),
                }
                input_waker();
            }),
            Box::new(move || waker()),
        )?;

        self.output.extend([
            TerminalCmd::MouseReporting(true),
            TerminalCmd::MetaSendsEscape(true),
            TerminalCmd::ClearAll,
        ]);
        self.screen.invalidate();
        self.flush_output();
        self.started = true;
        debug!(size = ?self.decoder.size(), "ecma48 backend started");
        Ok(())
    }

    fn screen(&mut self) -> &mut dyn Screen {
        &mut self.screen
    }

    fn pull_events(&mut self, queue: &mut Vec<InputEvent>) {
        let chunks = match self.inbox.lock() {
            Ok(mut chunks) => std::mem::take(&mut *chunks),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        };
        let now = Instant::now();
        for chunk in chunks {
            queue.extend(self.decoder.feed_str(&chunk, now));
        }
        queue.extend(self.decoder.tick(now, Some(self.terminal.size())));
    }

    fn flush_screen(&mut self) {
        let update = self.screen.flush_string();
        if !update.is_empty() {
            self.output.push(TerminalCmd::Bytes(update));
        }
        self.flush_output();
    }

    fn shutdown(&mut self) {
        if !self.started {
            return;
        }
        self.started = false;
        self.output.extend([
            TerminalCmd::MouseReporting(false),
            TerminalCmd::ShowCursor,
            TerminalCmd::Normal,
        ]);
        self.flush_output();
        if let Err(err) = self.terminal.stop() {
            warn!(error = %err, "failed to restore terminal");
        }
    }

    fn next_deadline(&self) -> Option<Instant> {
        self.decoder.escape_deadline()
    }

    fn crash_cleanup(&self) -> Option<CrashCleanup> {
        self.terminal.crash_cleanup()
    }
}
