//! One-shot and recurring timers, ticked by the run loop.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

pub struct Timer<A> {
    id: TimerId,
    duration: Duration,
    recurring: bool,
    next_tick: Instant,
    action: A,
}

impl<A> Timer<A> {
    pub fn id(&self) -> TimerId {
        self.id
    }

    pub fn next_tick(&self) -> Instant {
        self.next_tick
    }

    pub fn is_recurring(&self) -> bool {
        self.recurring
    }

    pub fn action_mut(&mut self) -> &mut A {
        &mut self.action
    }
}

/// Timers owned by the runtime. `A` is the action type, kept generic so tests can use plain
/// values.
pub struct TimerList<A> {
    timers: Vec<Timer<A>>,
    next_id: u64,
    /// Recurring timers detached by `take_due` and not yet restored.
    in_flight: Vec<TimerId>,
    cancelled: Vec<TimerId>,
}

impl<A> Default for TimerList<A> {
    fn default() -> Self {
        Self {
            timers: Vec::new(),
            next_id: 1,
            in_flight: Vec::new(),
            cancelled: Vec::new(),
        }
    }
}

impl<A> TimerList<A> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    pub fn add(&mut self, duration: Duration, recurring: bool, now: Instant, action: A) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.timers.push(Timer {
            id,
            duration,
            recurring,
            next_tick: now + duration,
            action,
        });
        id
    }

    /// Returns false when the timer already fired (one-shot) or was removed. A recurring timer
    /// removed from inside its own action is not restored.
    pub fn remove(&mut self, id: TimerId) -> bool {
        if self.in_flight.contains(&id) && !self.cancelled.contains(&id) {
            self.cancelled.push(id);
            return true;
        }
        let before = self.timers.len();
        self.timers.retain(|timer| timer.id != id);
        self.timers.len() != before
    }

    pub fn contains(&self, id: TimerId) -> bool {
        self.timers.iter().any(|timer| timer.id == id)
    }

    /// Detach every timer due at `now`, in registration order. Recurring timers are
    /// rescheduled and must be handed back through [`TimerList::restore`] after running.
    pub fn take_due(&mut self, now: Instant) -> Vec<Timer<A>> {
        let mut due = Vec::new();
        let mut idx = 0;
        while idx < self.timers.len() {
            if self.timers[idx].next_tick <= now {
                let mut timer = self.timers.remove(idx);
                if timer.recurring {
                    timer.next_tick = now + timer.duration;
                    self.in_flight.push(timer.id);
                }
                due.push(timer);
            } else {
                idx += 1;
            }
        }
        due
    }

    /// Re-register recurring timers returned by `take_due`. One-shot timers are dropped.
    pub fn restore(&mut self, fired: Vec<Timer<A>>) {
        let cancelled = std::mem::take(&mut self.cancelled);
        self.in_flight.clear();
        self.timers.extend(
            fired
                .into_iter()
                .filter(|timer| timer.recurring && !cancelled.contains(&timer.id)),
        );
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.iter().map(|timer| timer.next_tick).min()
    }

    /// How long the run loop may sleep: until the soonest tick, never longer than `cap`.
    pub fn sleep_time(&self, now: Instant, cap: Duration) -> Duration {
        match self.next_deadline() {
            Some(deadline) => deadline.saturating_duration_since(now).min(cap),
            None => cap,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use pretty_assertions::assert_eq;

    use super::TimerList;

    const MS: Duration = Duration::from_millis(1);

    #[test]
    fn one_shot_timer_fires_once() {
        let start = Instant::now();
        let mut timers = TimerList::new();
        let id = timers.add(10 * MS, false, start, "once");

        assert!(timers.take_due(start + 5 * MS).is_empty());
        let fired = timers.take_due(start + 10 * MS);
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].id(), id);
        timers.restore(fired);
        assert!(timers.is_empty());
        assert!(!timers.remove(id));
    }

    #[test]
    fn recurring_timer_is_rescheduled_from_the_tick() {
        let start = Instant::now();
        let mut timers = TimerList::new();
        timers.add(10 * MS, true, start, ());

        let fired = timers.take_due(start + 12 * MS);
        assert_eq!(fired[0].next_tick(), start + 22 * MS);
        timers.restore(fired);
        assert_eq!(timers.len(), 1);
        assert_eq!(timers.next_deadline(), Some(start + 22 * MS));
    }

    #[test]
    fn recurring_timer_removed_while_running_stays_removed() {
        let start = Instant::now();
        let mut timers = TimerList::new();
        let id = timers.add(MS, true, start, ());

        let fired = timers.take_due(start + MS);
        assert!(timers.remove(id));
        timers.restore(fired);
        assert!(timers.is_empty());
    }

    #[test]
    fn removed_timer_never_fires() {
        let start = Instant::now();
        let mut timers = TimerList::new();
        let id = timers.add(MS, false, start, ());
        assert!(timers.remove(id));
        assert!(timers.take_due(start + 5 * MS).is_empty());
    }

    #[test]
    fn sleep_time_is_capped() {
        let start = Instant::now();
        let mut timers = TimerList::new();
        assert_eq!(timers.sleep_time(start, 50 * MS), 50 * MS);

        timers.add(200 * MS, false, start, ());
        assert_eq!(timers.sleep_time(start, 50 * MS), 50 * MS);
        timers.add(20 * MS, false, start, ());
        assert_eq!(timers.sleep_time(start, 50 * MS), 20 * MS);
        assert_eq!(timers.sleep_time(start + 30 * MS, 50 * MS), Duration::ZERO);
    }

    #[test]
    fn due_timers_keep_registration_order() {
        let start = Instant::now();
        let mut timers = TimerList::new();
        timers.add(3 * MS, false, start, 'a');
        timers.add(9 * MS, false, start, 'b');
        timers.add(MS, false, start, 'c');

        let mut fired = timers.take_due(start + 5 * MS);
        let order: Vec<char> = fired.iter_mut().map(|timer| *timer.action_mut()).collect();
        assert_eq!(order, vec!['a', 'c']);
        assert_eq!(timers.len(), 1);
    }
}
