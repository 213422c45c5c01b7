//! Typed terminal output commands and a single output gate.
//!
//! Invariant: all terminal writes flow through `OutputGate::flush(..)`.

use std::io;

use crate::core::escape;
use crate::core::terminal::Terminal;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalCmd {
    /// Raw bytes/control sequences (UTF-8 string).
    Bytes(String),

    ShowCursor,

    /// Any-event mouse tracking plus the alternate screen.
    MouseReporting(bool),
    MetaSendsEscape(bool),

    /// Reset SGR to white on black.
    Normal,
    ClearAll,
}

#[derive(Debug, Default)]
pub struct OutputGate {
    cmds: Vec<TerminalCmd>,
}

impl OutputGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, cmd: TerminalCmd) {
        self.cmds.push(cmd);
    }

    pub fn extend<I>(&mut self, cmds: I)
    where
        I: IntoIterator<Item = TerminalCmd>,
    {
        self.cmds.extend(cmds);
    }

    pub fn is_empty(&self) -> bool {
        self.cmds.is_empty()
    }

    /// Flush buffered commands as one write.
    ///
    /// This is the single write gate: `Terminal::write(..)` must not be called from anywhere
    /// else. Commands are dropped even when the write fails.
    pub fn flush<T: Terminal + ?Sized>(&mut self, term: &mut T) -> io::Result<()> {
        if self.cmds.is_empty() {
            return Ok(());
        }
        let mut out = String::new();
        for cmd in self.cmds.drain(..) {
            match cmd {
                TerminalCmd::Bytes(data) => out.push_str(&data),
                TerminalCmd::ShowCursor => out.push_str("\x1b[?25h"),
                TerminalCmd::MouseReporting(on) => out.push_str(escape::mouse(on)),
                TerminalCmd::MetaSendsEscape(on) => out.push_str(escape::meta_sends_escape(on)),
                TerminalCmd::Normal => out.push_str(escape::normal(true)),
                TerminalCmd::ClearAll => out.push_str(&escape::clear_all()),
            }
        }
        if out.is_empty() {
            return Ok(());
        }
        term.write(&out)
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::{OutputGate, TerminalCmd};
    use crate::core::terminal::Terminal;

    #[derive(Default)]
    struct RecordingTerminal {
        writes: Vec<String>,
    }

    impl Terminal for RecordingTerminal {
        fn start(
            &mut self,
            _on_input: Box<dyn FnMut(String) + Send>,
            _on_resize: Box<dyn FnMut() + Send>,
        ) -> io::Result<()> {
            Ok(())
        }

        fn stop(&mut self) -> io::Result<()> {
            Ok(())
        }

        fn write(&mut self, data: &str) -> io::Result<()> {
            self.writes.push(data.to_string());
            Ok(())
        }

        fn size(&self) -> (u16, u16) {
            (80, 24)
        }
    }

    #[test]
    fn flush_joins_commands_into_one_write() {
        let mut gate = OutputGate::new();
        let mut term = RecordingTerminal::default();
        gate.extend([
            TerminalCmd::MouseReporting(false),
            TerminalCmd::ShowCursor,
            TerminalCmd::Normal,
        ]);
        gate.flush(&mut term).expect("flush");
        assert_eq!(
            term.writes,
            vec!["\x1b[?1003;1005l\x1b[?1049l\x1b[?25h\x1b[0;37;40m".to_string()]
        );
        assert!(gate.is_empty());

        gate.flush(&mut term).expect("empty flush");
        assert_eq!(term.writes.len(), 1);
    }

    #[test]
    fn empty_payload_skips_the_write() {
        let mut gate = OutputGate::new();
        let mut term = RecordingTerminal::default();
        gate.push(TerminalCmd::Bytes(String::new()));
        gate.flush(&mut term).expect("flush");
        assert!(term.writes.is_empty());
        assert!(gate.is_empty());

        gate.push(TerminalCmd::Bytes("\x1b[1;1H".to_string()));
        gate.push(TerminalCmd::ClearAll);
        gate.flush(&mut term).expect("flush");
        assert_eq!(term.writes, vec!["\x1b[1;1H\x1b[0;37;40m\x1b[2J".to_string()]);
    }
}
