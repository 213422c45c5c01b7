use std::time::Instant;

use pretty_assertions::assert_eq;

use tape_desktop::core::decoder::ParserState;
use tape_desktop::{Decoder, InputEvent};

/// Deterministic generator so failures reproduce.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0 >> 33
    }

    fn below(&mut self, bound: usize) -> usize {
        (self.next() % bound as u64) as usize
    }
}

const FRAGMENTS: &[&str] = &[
    "a",
    "Z",
    "\r",
    "\x01",
    "\x1bx",
    "\x1bOQ",
    "\x1b[A",
    "\x1b[1;5C",
    "\x1b[17;2~",
    "\x1b[99~",
    "\x1b[H",
    "\x1b[M !!",
    "\x1b[M#!!",
    "\x1b[M@%&",
    "\x1b[Qz",
    "é",
];

fn stream(rng: &mut Lcg) -> String {
    (0..rng.below(40) + 1)
        .map(|_| FRAGMENTS[rng.below(FRAGMENTS.len())])
        .collect()
}

fn decode_whole(data: &str, now: Instant) -> Vec<InputEvent> {
    Decoder::new(80, 24).feed_str(data, now)
}

fn decode_split(data: &str, now: Instant, rng: &mut Lcg) -> (Vec<InputEvent>, ParserState) {
    let mut decoder = Decoder::new(80, 24);
    let chars: Vec<char> = data.chars().collect();
    let mut events = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let end = (start + rng.below(5) + 1).min(chars.len());
        let chunk: String = chars[start..end].iter().collect();
        events.extend(decoder.feed_str(&chunk, now));
        start = end;
    }
    (events, decoder.state())
}

#[test]
fn splitting_the_stream_never_changes_the_events() {
    let mut rng = Lcg(0x5eed);
    let now = Instant::now();
    for round in 0..500 {
        let data = stream(&mut rng);
        let whole = decode_whole(&data, now);
        let (split, state) = decode_split(&data, now, &mut rng);
        assert_eq!(split, whole, "round {round}: {data:?}");
        assert_eq!(state, ParserState::Ground, "round {round}: {data:?}");
    }
}

#[test]
fn char_by_char_feed_matches_feed_str() {
    let mut rng = Lcg(42);
    let now = Instant::now();
    for _ in 0..100 {
        let data = stream(&mut rng);
        let mut decoder = Decoder::new(80, 24);
        let one_by_one: Vec<InputEvent> = data
            .chars()
            .flat_map(|ch| decoder.feed(ch, now))
            .collect();
        assert_eq!(one_by_one, decode_whole(&data, now));
    }
}
