//! ECMA-48 / xterm input decoder.
//!
//! A codepoint-driven state machine. Every completed or abandoned sequence returns the
//! machine to [`ParserState::Ground`], so feeding a stream in one call or split across many
//! calls produces the same events.

use std::time::{Duration, Instant};

use tracing::trace;

use crate::core::input_event::{InputEvent, MouseEvent, MouseEventType};
use crate::core::key::{Key, Keypress};

/// How long a lone ESC waits before it is reported as the Escape key.
pub const DEFAULT_ESCAPE_TIMEOUT: Duration = Duration::from_millis(250);

const MAX_PARAMS: usize = 16;
const MOUSE_REPORT_LEN: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserState {
    Ground,
    Escape,
    EscapeIntermediate,
    CsiEntry,
    CsiParam,
    Mouse,
}

#[derive(Debug)]
pub struct Decoder {
    state: ParserState,
    params: Vec<String>,
    param_index: usize,
    escape_entered_at: Option<Instant>,
    escape_timeout: Duration,
    width: u16,
    height: u16,
    // X10 releases do not say which button went up, so downs are remembered here.
    mouse1: bool,
    mouse2: bool,
    mouse3: bool,
}

impl Decoder {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            state: ParserState::Ground,
            params: vec![String::new()],
            param_index: 0,
            escape_entered_at: None,
            escape_timeout: DEFAULT_ESCAPE_TIMEOUT,
            width,
            height,
            mouse1: false,
            mouse2: false,
            mouse3: false,
        }
    }

    pub fn with_escape_timeout(mut self, timeout: Duration) -> Self {
        self.escape_timeout = timeout;
        self
    }

    pub fn state(&self) -> ParserState {
        self.state
    }

    /// Screen size used to clamp mouse coordinates.
    pub fn size(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    pub fn set_size(&mut self, width: u16, height: u16) {
        self.width = width;
        self.height = height;
    }

    /// Instant at which a pending lone ESC becomes the Escape key.
    pub fn escape_deadline(&self) -> Option<Instant> {
        match (self.state, self.escape_entered_at) {
            (ParserState::Escape, Some(entered)) => Some(entered + self.escape_timeout),
            _ => None,
        }
    }

    pub fn feed_str(&mut self, data: &str, now: Instant) -> Vec<InputEvent> {
        let mut events = Vec::new();
        for ch in data.chars() {
            self.expire_escape(now, &mut events);
            self.step(ch, now, &mut events);
        }
        events
    }

    pub fn feed(&mut self, ch: char, now: Instant) -> Vec<InputEvent> {
        let mut events = Vec::new();
        self.expire_escape(now, &mut events);
        self.step(ch, now, &mut events);
        events
    }

    /// Called when no input arrived: reports a timed-out ESC, and a resize when the polled
    /// size differs from the cached one.
    pub fn tick(&mut self, now: Instant, polled_size: Option<(u16, u16)>) -> Vec<InputEvent> {
        let mut events = Vec::new();
        self.expire_escape(now, &mut events);
        if let Some((width, height)) = polled_size {
            if (width, height) != (self.width, self.height) {
                self.set_size(width, height);
                events.push(InputEvent::Resize { width, height });
            }
        }
        events
    }

    fn expire_escape(&mut self, now: Instant, events: &mut Vec<InputEvent>) {
        if self.state != ParserState::Escape {
            return;
        }
        let Some(entered) = self.escape_entered_at else {
            return;
        };
        if now.saturating_duration_since(entered) > self.escape_timeout {
            events.push(Keypress::ESCAPE.into());
            self.reset();
        }
    }

    fn reset(&mut self) {
        self.state = ParserState::Ground;
        self.params.clear();
        self.params.push(String::new());
        self.param_index = 0;
        self.escape_entered_at = None;
    }

    fn discard(&mut self, ch: char) {
        trace!(state = ?self.state, ch = ?ch, params = ?self.params, "discarding escape sequence");
        self.reset();
    }

    fn emit(&mut self, events: &mut Vec<InputEvent>, event: InputEvent) {
        events.push(event);
        self.reset();
    }

    fn step(&mut self, ch: char, now: Instant, events: &mut Vec<InputEvent>) {
        match self.state {
            ParserState::Ground => {
                if ch == '\x1b' {
                    self.state = ParserState::Escape;
                    self.escape_entered_at = Some(now);
                } else if is_control(ch) {
                    self.emit(events, control_key(ch).into());
                } else {
                    self.emit(events, Keypress::ch(ch).into());
                }
            }
            ParserState::Escape => {
                if is_control(ch) {
                    self.emit(events, control_key(ch).alt().into());
                } else if ch == 'O' {
                    self.state = ParserState::EscapeIntermediate;
                } else if ch == '[' {
                    self.state = ParserState::CsiEntry;
                } else {
                    let mut key = Keypress::ch(ch).alt();
                    key.shift = ch.is_ascii_uppercase();
                    self.emit(events, key.into());
                }
            }
            ParserState::EscapeIntermediate => match ch {
                'P'..='S' => {
                    let n = (ch as u8 - b'P') + 1;
                    self.emit(events, Keypress::f(n).into());
                }
                _ => self.discard(ch),
            },
            ParserState::CsiEntry | ParserState::CsiParam => self.step_csi(ch, events),
            ParserState::Mouse => {
                self.params[0].push(ch);
                if self.params[0].chars().count() == MOUSE_REPORT_LEN {
                    let event = self.decode_mouse();
                    self.emit(events, event.into());
                }
            }
        }
    }

    fn step_csi(&mut self, ch: char, events: &mut Vec<InputEvent>) {
        let entry = self.state == ParserState::CsiEntry;
        match ch {
            '0'..='9' => {
                self.params[self.param_index].push(ch);
                self.state = ParserState::CsiParam;
            }
            ';' => {
                if self.params.len() >= MAX_PARAMS {
                    self.discard(ch);
                    return;
                }
                self.params.push(String::new());
                self.param_index += 1;
            }
            '~' => match self.csi_fn_key() {
                Some(key) => self.emit(events, key.into()),
                None => self.discard(ch),
            },
            'A' => self.emit(events, self.csi_arrow(Key::Up).into()),
            'B' => self.emit(events, self.csi_arrow(Key::Down).into()),
            'C' => self.emit(events, self.csi_arrow(Key::Right).into()),
            'D' => self.emit(events, self.csi_arrow(Key::Left).into()),
            'H' => self.emit(events, Keypress::new(Key::Home).into()),
            'F' => self.emit(events, Keypress::new(Key::End).into()),
            'Z' => self.emit(events, Keypress::BACK_TAB.into()),
            'M' if entry => {
                self.params.clear();
                self.params.push(String::new());
                self.param_index = 0;
                self.state = ParserState::Mouse;
            }
            _ => self.discard(ch),
        }
    }

    fn csi_arrow(&self, key: Key) -> Keypress {
        let mut press = Keypress::new(key);
        match self.params.get(1).map(String::as_str) {
            Some("2") => press.shift = true,
            Some("3") => press.alt = true,
            Some("5") => press.ctrl = true,
            _ => {}
        }
        press
    }

    /// `CSI Pn [; Pm] ~`
    fn csi_fn_key(&self) -> Option<Keypress> {
        if self.params.len() > 2 {
            return None;
        }
        let base: u32 = self.params.first()?.parse().ok()?;
        let modifier: u32 = match self.params.get(1) {
            None => 0,
            Some(param) if param.is_empty() => 0,
            Some(param) => param.parse().ok()?,
        };

        let key = match base {
            1 => Key::Home,
            2 => Key::Insert,
            3 => Key::Delete,
            4 => Key::End,
            5 => Key::PageUp,
            6 => Key::PageDown,
            15 => Key::F(5),
            17 => Key::F(6),
            18 => Key::F(7),
            19 => Key::F(8),
            20 => Key::F(9),
            21 => Key::F(10),
            23 => Key::F(11),
            24 => Key::F(12),
            _ => return None,
        };
        let press = Keypress::new(key);
        match modifier {
            0 => Some(press),
            2 => Some(press.shift()),
            3 => Some(press.alt()),
            5 => Some(press.ctrl()),
            _ => None,
        }
    }

    fn decode_mouse(&mut self) -> MouseEvent {
        let raw: Vec<i64> = self.params[0].chars().map(|ch| i64::from(u32::from(ch))).collect();
        let button = raw[0] - 32;
        let x = clamp_coordinate(raw[1] - 32 - 1, self.width);
        let y = clamp_coordinate(raw[2] - 32 - 1, self.height);

        let mut event = MouseEvent::new(MouseEventType::Motion, x, y);
        match button {
            0 => {
                self.mouse1 = true;
                event.kind = MouseEventType::Down;
                event.button1 = true;
            }
            1 => {
                self.mouse2 = true;
                event.kind = MouseEventType::Down;
                event.button2 = true;
            }
            2 => {
                self.mouse3 = true;
                event.kind = MouseEventType::Down;
                event.button3 = true;
            }
            3 => {
                if self.mouse1 || self.mouse2 || self.mouse3 {
                    event.kind = MouseEventType::Up;
                    event.button1 = self.mouse1;
                    event.button2 = self.mouse2;
                    event.button3 = self.mouse3;
                    self.mouse1 = false;
                    self.mouse2 = false;
                    self.mouse3 = false;
                }
            }
            32 => {
                self.mouse1 = true;
                event.button1 = true;
            }
            33 => {
                self.mouse2 = true;
                event.button2 = true;
            }
            34 => {
                self.mouse3 = true;
                event.button3 = true;
            }
            // Some terminals report a drag after wheel use with these codes.
            96 | 97 => {
                self.mouse2 = true;
                event.button2 = true;
            }
            64 => {
                event.kind = MouseEventType::Down;
                event.wheel_up = true;
            }
            65 => {
                event.kind = MouseEventType::Down;
                event.wheel_down = true;
            }
            _ => {}
        }
        event
    }
}

fn is_control(ch: char) -> bool {
    u32::from(ch) <= 0x1f
}

fn control_key(ch: char) -> Keypress {
    match ch {
        '\r' => Keypress::ENTER,
        '\t' => Keypress::TAB,
        '\x1b' => Keypress::ESCAPE,
        _ => {
            let letter = char::from_u32(u32::from(ch) + 0x40).unwrap_or('@');
            Keypress::ch(letter).ctrl()
        }
    }
}

fn clamp_coordinate(value: i64, extent: u16) -> i32 {
    let max = i64::from(extent).saturating_sub(1).max(0);
    value.clamp(0, max) as i32
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use pretty_assertions::assert_eq;

    use super::{Decoder, ParserState};
    use crate::core::input_event::{InputEvent, MouseEvent, MouseEventType};
    use crate::core::key::{Key, Keypress};

    fn decode(data: &str) -> Vec<InputEvent> {
        let mut decoder = Decoder::new(80, 24);
        decoder.feed_str(data, Instant::now())
    }

    fn keys(data: &str) -> Vec<Keypress> {
        decode(data)
            .into_iter()
            .map(|event| match event {
                InputEvent::Keypress(key) => key,
                other => panic!("expected keypress, got {other:?}"),
            })
            .collect()
    }

    fn mouse_report(button: u32, x: u32, y: u32) -> String {
        [32 + button, 33 + x, 33 + y]
            .into_iter()
            .map(|cp| char::from_u32(cp).expect("valid codepoint"))
            .collect::<String>()
    }

    fn mouse(decoder: &mut Decoder, button: u32, x: u32, y: u32) -> MouseEvent {
        let report = format!("\x1b[M{}", mouse_report(button, x, y));
        let events = decoder.feed_str(&report, Instant::now());
        assert_eq!(events.len(), 1, "{events:?}");
        match events[0] {
            InputEvent::Mouse(mouse) => mouse,
            ref other => panic!("expected mouse event, got {other:?}"),
        }
    }

    #[test]
    fn ground_maps_printable_and_control_characters() {
        assert_eq!(
            keys("a\r\t\x01\x00"),
            vec![
                Keypress::ch('a'),
                Keypress::ENTER,
                Keypress::TAB,
                Keypress::ch('A').ctrl(),
                Keypress::ch('@').ctrl(),
            ]
        );
    }

    #[test]
    fn escape_prefix_sets_alt_and_shift() {
        assert_eq!(
            keys("\x1bx\x1bX\x1b\x01"),
            vec![
                Keypress::ch('x').alt(),
                Keypress::ch('X').alt().shift(),
                Keypress::ch('A').ctrl().alt(),
            ]
        );
    }

    #[test]
    fn ss3_function_keys() {
        assert_eq!(
            keys("\x1bOP\x1bOQ\x1bOR\x1bOS"),
            vec![Keypress::f(1), Keypress::f(2), Keypress::f(3), Keypress::f(4)]
        );
        assert!(decode("\x1bOx").is_empty());
    }

    #[test]
    fn arrows_with_and_without_modifiers() {
        assert_eq!(keys("\x1b[A"), vec![Keypress::UP]);
        assert_eq!(keys("\x1b[1;2A"), vec![Keypress::UP.shift()]);
        assert_eq!(keys("\x1b[1;3D"), vec![Keypress::LEFT.alt()]);
        assert_eq!(keys("\x1b[1;5C"), vec![Keypress::RIGHT.ctrl()]);
        assert_eq!(keys("\x1b[1;9B"), vec![Keypress::DOWN]);
    }

    #[test]
    fn home_end_and_back_tab() {
        assert_eq!(
            keys("\x1b[H\x1b[F\x1b[Z"),
            vec![
                Keypress::new(Key::Home),
                Keypress::new(Key::End),
                Keypress::BACK_TAB
            ]
        );
    }

    #[test]
    fn tilde_function_keys_resolve_base_and_modifier() {
        assert_eq!(
            keys("\x1b[2~\x1b[3~\x1b[5~\x1b[6~\x1b[15~\x1b[24~"),
            vec![
                Keypress::new(Key::Insert),
                Keypress::new(Key::Delete),
                Keypress::new(Key::PageUp),
                Keypress::new(Key::PageDown),
                Keypress::f(5),
                Keypress::f(12),
            ]
        );
        assert_eq!(keys("\x1b[17;2~"), vec![Keypress::f(6).shift()]);
        assert_eq!(keys("\x1b[3;5~"), vec![Keypress::new(Key::Delete).ctrl()]);
        assert_eq!(keys("\x1b[1;3~"), vec![Keypress::new(Key::Home).alt()]);
    }

    #[test]
    fn unknown_sequences_are_dropped_and_parser_recovers() {
        assert!(decode("\x1b[16~").is_empty());
        assert!(decode("\x1b[17;7~").is_empty());
        assert!(decode("\x1b[~").is_empty());
        assert!(decode("\x1b[1;2;3~").is_empty());
        assert_eq!(keys("\x1b[99qz"), vec![Keypress::ch('z')]);

        let mut decoder = Decoder::new(80, 24);
        decoder.feed_str("\x1b[12x", Instant::now());
        assert_eq!(decoder.state(), ParserState::Ground);
    }

    #[test]
    fn lone_escape_times_out_into_escape_key() {
        let start = Instant::now();
        let mut decoder = Decoder::new(80, 24);
        assert!(decoder.feed('\x1b', start).is_empty());
        assert_eq!(decoder.state(), ParserState::Escape);
        assert_eq!(
            decoder.escape_deadline(),
            Some(start + Duration::from_millis(250))
        );

        assert!(decoder
            .tick(start + Duration::from_millis(100), None)
            .is_empty());
        assert_eq!(
            decoder.tick(start + Duration::from_millis(251), None),
            vec![InputEvent::Keypress(Keypress::ESCAPE)]
        );
        assert_eq!(decoder.state(), ParserState::Ground);
        assert!(decoder.tick(start + Duration::from_secs(2), None).is_empty());
    }

    #[test]
    fn late_byte_after_timeout_decodes_from_ground() {
        let start = Instant::now();
        let mut decoder = Decoder::new(80, 24);
        decoder.feed('\x1b', start);
        let events = decoder.feed('[', start + Duration::from_millis(300));
        assert_eq!(
            events,
            vec![
                InputEvent::Keypress(Keypress::ESCAPE),
                InputEvent::Keypress(Keypress::ch('[')),
            ]
        );
    }

    #[test]
    fn escape_within_timeout_still_starts_a_sequence() {
        let start = Instant::now();
        let mut decoder = Decoder::new(80, 24);
        decoder.feed('\x1b', start);
        decoder.feed('[', start + Duration::from_millis(200));
        let events = decoder.feed('A', start + Duration::from_millis(400));
        assert_eq!(events, vec![InputEvent::Keypress(Keypress::UP)]);
    }

    #[test]
    fn tick_reports_resize_once() {
        let mut decoder = Decoder::new(80, 24);
        let now = Instant::now();
        assert!(decoder.tick(now, Some((80, 24))).is_empty());
        assert_eq!(
            decoder.tick(now, Some((100, 30))),
            vec![InputEvent::Resize {
                width: 100,
                height: 30
            }]
        );
        assert_eq!(decoder.size(), (100, 30));
        assert!(decoder.tick(now, Some((100, 30))).is_empty());
    }

    #[test]
    fn press_then_release_reconciles_button_state() {
        let mut decoder = Decoder::new(80, 24);
        let down = mouse(&mut decoder, 0, 1, 1);
        assert_eq!(down.kind, MouseEventType::Down);
        assert!(down.button1);
        assert_eq!((down.x, down.y), (1, 1));

        let up = mouse(&mut decoder, 3, 1, 1);
        assert_eq!(up.kind, MouseEventType::Up);
        assert!(up.button1 && !up.button2 && !up.button3);

        let motion = mouse(&mut decoder, 3, 2, 1);
        assert_eq!(motion.kind, MouseEventType::Motion);
        assert!(!motion.any_button());
    }

    #[test]
    fn release_reports_every_remembered_button() {
        let mut decoder = Decoder::new(80, 24);
        mouse(&mut decoder, 0, 5, 5);
        mouse(&mut decoder, 2, 5, 5);
        let up = mouse(&mut decoder, 3, 5, 5);
        assert_eq!(up.kind, MouseEventType::Up);
        assert!(up.button1 && !up.button2 && up.button3);
    }

    #[test]
    fn drag_wheel_and_quirk_codes() {
        let mut decoder = Decoder::new(80, 24);
        let drag = mouse(&mut decoder, 32, 4, 4);
        assert_eq!(drag.kind, MouseEventType::Motion);
        assert!(drag.button1);
        assert_eq!(mouse(&mut decoder, 3, 4, 4).kind, MouseEventType::Up);

        let wheel_up = mouse(&mut decoder, 64, 0, 0);
        assert_eq!(wheel_up.kind, MouseEventType::Down);
        assert!(wheel_up.wheel_up && !wheel_up.wheel_down);
        let wheel_down = mouse(&mut decoder, 65, 0, 0);
        assert!(wheel_down.wheel_down);

        let quirk = mouse(&mut decoder, 96, 3, 3);
        assert_eq!(quirk.kind, MouseEventType::Motion);
        assert!(quirk.button2);

        let other = mouse(&mut decoder, 7, 3, 3);
        assert_eq!(other.kind, MouseEventType::Motion);
    }

    #[test]
    fn mouse_coordinates_clamp_to_screen() {
        let mut decoder = Decoder::new(10, 5);
        let far = mouse(&mut decoder, 0, 200, 200);
        assert_eq!((far.x, far.y), (9, 4));

        let report: String = ['\u{20}', '\u{10}', '\u{10}'].into_iter().collect();
        let events = decoder.feed_str(&format!("\x1b[M{report}"), Instant::now());
        match events.as_slice() {
            [InputEvent::Mouse(near)] => assert_eq!((near.x, near.y), (0, 0)),
            other => panic!("unexpected events {other:?}"),
        }
    }

    #[test]
    fn split_feeding_matches_batch_feeding() {
        let input = "ab\x1b[1;5C\x1bOQ\x1b[17;2~\x1b[M !!\x1b[M#!!\x1bx\x1b[Z";
        let batch = decode(input);

        let chars: Vec<char> = input.chars().collect();
        for split in 0..=chars.len() {
            let now = Instant::now();
            let mut decoder = Decoder::new(80, 24);
            let head: String = chars[..split].iter().collect();
            let tail: String = chars[split..].iter().collect();
            let mut events = decoder.feed_str(&head, now);
            events.extend(decoder.feed_str(&tail, now));
            assert_eq!(events, batch, "split at {split}");
        }
    }
}
