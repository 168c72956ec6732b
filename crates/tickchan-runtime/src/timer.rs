//! One-shot timers for the event loop
//!
//! BinaryHeap ordered by deadline, ties broken by insertion order.
//!
//! # Complexity
//!
//! - Insert: O(log n)
//! - Cancel: O(1) (lazy cancellation)
//! - Poll expired: O(k log n) where k = number of expired timers
//! - Next deadline: O(1) amortized
//!
//! # Cancellation Strategy
//!
//! A timer is live while its id is in the `live` set. Cancelling only
//! removes the id; the heap entry is skipped when it surfaces. Stale
//! entries at the top of the heap are discarded eagerly so that
//! `next_deadline` stays accurate.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};
use std::fmt;
use std::time::{Duration, Instant};

/// Deadline used for delays that overflow `Instant` (about 30 years)
const FAR_FUTURE: Duration = Duration::from_secs(30 * 365 * 24 * 60 * 60);

/// Callback run when a timer expires
pub type TimerFn = Box<dyn FnOnce()>;

/// Identifier of a timer registered with `EventLoop::add_timer`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

impl TimerId {
    /// Get the raw id value (for debugging/logging)
    #[inline]
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer#{}", self.0)
    }
}

struct HeapEntry {
    deadline: Instant,
    id: TimerId,
    callback: TimerFn,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.id == other.id
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap is a max-heap, we want the earliest deadline.
        match other.deadline.cmp(&self.deadline) {
            Ordering::Equal => other.id.cmp(&self.id),
            ord => ord,
        }
    }
}

/// Min-heap of pending one-shot timers
pub(crate) struct TimerQueue {
    heap: BinaryHeap<HeapEntry>,
    live: HashSet<TimerId>,
    next_id: u64,
}

impl TimerQueue {
    pub(crate) fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            live: HashSet::new(),
            next_id: 1,
        }
    }

    pub(crate) fn insert(&mut self, now: Instant, delay: Duration, callback: TimerFn) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        let deadline = now
            .checked_add(delay)
            .or_else(|| now.checked_add(FAR_FUTURE))
            .unwrap_or(now);
        self.heap.push(HeapEntry {
            deadline,
            id,
            callback,
        });
        self.live.insert(id);
        id
    }

    /// Returns true if the timer was pending
    pub(crate) fn cancel(&mut self, id: TimerId) -> bool {
        let removed = self.live.remove(&id);
        self.prune();
        removed
    }

    /// Remove every timer due at or before `now`, earliest first
    pub(crate) fn poll_expired(&mut self, now: Instant) -> Vec<(TimerId, TimerFn)> {
        let mut expired = Vec::new();
        while let Some(top) = self.heap.peek() {
            if top.deadline > now {
                break;
            }
            let Some(entry) = self.heap.pop() else { break };
            if self.live.remove(&entry.id) {
                expired.push((entry.id, entry.callback));
            }
        }
        self.prune();
        expired
    }

    pub(crate) fn next_deadline(&self) -> Option<Instant> {
        self.heap.peek().map(|entry| entry.deadline)
    }

    pub(crate) fn len(&self) -> usize {
        self.live.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Drop cancelled entries sitting at the top of the heap
    fn prune(&mut self) {
        while let Some(top) = self.heap.peek() {
            if self.live.contains(&top.id) {
                break;
            }
            self.heap.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn fired_ids(expired: Vec<(TimerId, TimerFn)>) -> Vec<TimerId> {
        expired.into_iter().map(|(id, _)| id).collect()
    }

    #[test]
    fn test_expire_in_deadline_order() {
        let mut q = TimerQueue::new();
        let now = Instant::now();
        let late = q.insert(now, Duration::from_millis(30), Box::new(|| {}));
        let early = q.insert(now, Duration::from_millis(10), Box::new(|| {}));
        let mid = q.insert(now, Duration::from_millis(20), Box::new(|| {}));

        assert_eq!(q.len(), 3);
        assert_eq!(q.next_deadline(), Some(now + Duration::from_millis(10)));
        assert!(q.poll_expired(now).is_empty());

        let fired = fired_ids(q.poll_expired(now + Duration::from_millis(25)));
        assert_eq!(fired, vec![early, mid]);
        assert_eq!(fired_ids(q.poll_expired(now + Duration::from_secs(1))), vec![late]);
        assert!(q.is_empty());
    }

    #[test]
    fn test_same_deadline_keeps_insertion_order() {
        let mut q = TimerQueue::new();
        let now = Instant::now();
        let ids: Vec<_> = (0..5).map(|_| q.insert(now, Duration::ZERO, Box::new(|| {}))).collect();
        assert_eq!(fired_ids(q.poll_expired(now)), ids);
    }

    #[test]
    fn test_cancel() {
        let mut q = TimerQueue::new();
        let now = Instant::now();
        let a = q.insert(now, Duration::from_millis(1), Box::new(|| {}));
        let b = q.insert(now, Duration::from_millis(2), Box::new(|| {}));

        assert!(q.cancel(a));
        assert!(!q.cancel(a));
        assert_eq!(q.len(), 1);
        assert_eq!(q.next_deadline(), Some(now + Duration::from_millis(2)));
        assert_eq!(fired_ids(q.poll_expired(now + Duration::from_secs(1))), vec![b]);
        assert!(!q.cancel(b));
    }

    #[test]
    fn test_huge_delay_is_clamped() {
        let mut q = TimerQueue::new();
        let now = Instant::now();
        let id = q.insert(now, Duration::MAX, Box::new(|| {}));

        assert!(q.next_deadline().is_some_and(|d| d > now + Duration::from_secs(3600)));
        assert!(q.poll_expired(now + Duration::from_secs(3600)).is_empty());
        assert!(q.cancel(id));
    }

    #[test]
    fn test_callbacks_are_returned_not_run() {
        let mut q = TimerQueue::new();
        let now = Instant::now();
        let hits = Rc::new(RefCell::new(0));
        let h = Rc::clone(&hits);
        q.insert(now, Duration::ZERO, Box::new(move || *h.borrow_mut() += 1));

        let expired = q.poll_expired(now);
        assert_eq!(*hits.borrow(), 0);
        for (_, callback) in expired {
            callback();
        }
        assert_eq!(*hits.borrow(), 1);
    }
}
