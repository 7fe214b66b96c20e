//! Cancelable event scheduling on the virtual timeline.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::time::Duration;

use super::clock::{Clock, SimTime};

/// Handle to a scheduled event, used to cancel it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventId(u64);

/// Scheduling primitives the device models consume.
///
/// Implemented by [`EventQueue`] and by the per-device adapter inside the
/// engine. Object-safe so models can take `&mut dyn Scheduler<E>`.
pub trait Scheduler<E> {
    /// Current simulated time.
    fn now(&self) -> SimTime;

    /// Schedules `event` at the absolute time `at`.
    ///
    /// Times in the past are clamped to [`Scheduler::now`].
    fn schedule_at(&mut self, at: SimTime, event: E) -> EventId;

    /// Schedules `event` after `delay`.
    fn schedule_in(&mut self, delay: Duration, event: E) -> EventId {
        let at = self.now() + delay;
        self.schedule_at(at, event)
    }

    /// Cancels a pending event. Returns `false` if it already fired or was cancelled.
    fn cancel(&mut self, id: EventId) -> bool;

    /// Returns `true` while the event is still waiting to fire.
    fn is_pending(&self, id: EventId) -> bool;
}

/// Priority queue of timed events.
///
/// Events at the same instant pop in the order they were scheduled.
/// Cancelled entries stay in the heap and are skipped when reached.
pub struct EventQueue<E> {
    clock: Clock,
    heap: BinaryHeap<Reverse<(SimTime, u64)>>,
    payloads: HashMap<u64, E>,
    next_seq: u64,
}

impl<E> Default for EventQueue<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> EventQueue<E> {
    /// Creates an empty queue with the clock at zero.
    pub fn new() -> Self {
        Self {
            clock: Clock::new(),
            heap: BinaryHeap::new(),
            payloads: HashMap::new(),
            next_seq: 0,
        }
    }

    /// Pops the next live event due no later than `limit`, advancing the clock to it.
    ///
    /// Returns `None` when the queue is empty or the next event lies beyond `limit`.
    pub fn pop_until(&mut self, limit: SimTime) -> Option<(SimTime, E)> {
        while let Some(&Reverse((at, seq))) = self.heap.peek() {
            if at > limit {
                return None;
            }
            self.heap.pop();
            if let Some(event) = self.payloads.remove(&seq) {
                self.clock.advance_to(at);
                return Some((at, event));
            }
        }
        None
    }

    /// Moves the clock to `t` without dispatching anything.
    ///
    /// # Panics
    ///
    /// Panics if `t` is earlier than the current time.
    pub fn advance_to(&mut self, t: SimTime) {
        self.clock.advance_to(t);
    }

    /// Number of live (not cancelled, not yet fired) events.
    pub fn len(&self) -> usize {
        self.payloads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payloads.is_empty()
    }
}

impl<E> Scheduler<E> for EventQueue<E> {
    fn now(&self) -> SimTime {
        self.clock.now()
    }

    fn schedule_at(&mut self, at: SimTime, event: E) -> EventId {
        let at = at.max(self.clock.now());
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Reverse((at, seq)));
        self.payloads.insert(seq, event);
        EventId(seq)
    }

    fn cancel(&mut self, id: EventId) -> bool {
        self.payloads.remove(&id.0).is_some()
    }

    fn is_pending(&self, id: EventId) -> bool {
        self.payloads.contains_key(&id.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: f64) -> SimTime {
        SimTime::from_secs_f64(s)
    }

    #[test]
    fn pops_in_time_order() {
        let mut q = EventQueue::new();
        q.schedule_at(secs(3.0), "c");
        q.schedule_at(secs(1.0), "a");
        q.schedule_at(secs(2.0), "b");

        let order: Vec<_> = std::iter::from_fn(|| q.pop_until(secs(10.0)))
            .map(|(_, e)| e)
            .collect();
        assert_eq!(order, vec!["a", "b", "c"]);
        assert_eq!(q.now(), secs(3.0));
    }

    #[test]
    fn same_instant_is_fifo() {
        let mut q = EventQueue::new();
        for i in 0..5 {
            q.schedule_at(secs(1.0), i);
        }
        let order: Vec<_> = std::iter::from_fn(|| q.pop_until(secs(1.0)))
            .map(|(_, e)| e)
            .collect();
        assert_eq!(order, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn cancelled_events_never_fire() {
        let mut q = EventQueue::new();
        let a = q.schedule_at(secs(1.0), "a");
        q.schedule_at(secs(2.0), "b");
        assert!(q.is_pending(a));
        assert!(q.cancel(a));
        assert!(!q.is_pending(a));
        assert!(!q.cancel(a));

        assert_eq!(q.pop_until(secs(5.0)).map(|(_, e)| e), Some("b"));
        assert_eq!(q.pop_until(secs(5.0)), None);
    }

    #[test]
    fn limit_is_respected() {
        let mut q = EventQueue::new();
        q.schedule_at(secs(5.0), ());
        assert!(q.pop_until(secs(4.999)).is_none());
        assert_eq!(q.now(), SimTime::ZERO);
        assert_eq!(q.len(), 1);
        assert!(q.pop_until(secs(5.0)).is_some());
        assert!(q.is_empty());
    }

    #[test]
    fn schedule_in_is_relative_to_now() {
        let mut q = EventQueue::new();
        q.schedule_at(secs(2.0), 0);
        q.pop_until(secs(2.0));
        q.schedule_in(Duration::from_secs(3), 1);
        let (at, e) = q.pop_until(secs(10.0)).unwrap_or((SimTime::ZERO, -1));
        assert_eq!(e, 1);
        assert_eq!(at, secs(5.0));
    }

    #[test]
    fn past_times_are_clamped_to_now() {
        let mut q = EventQueue::new();
        q.advance_to(secs(4.0));
        q.schedule_at(secs(1.0), ());
        let popped = q.pop_until(secs(4.0));
        assert_eq!(popped.map(|(t, _)| t), Some(secs(4.0)));
    }
}
