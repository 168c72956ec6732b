//! Reference-counted channel over an SPSC ring
//!
//! A `Channel` is a cheap shared handle: `clone()` takes a reference,
//! dropping a handle releases it, and the ring is destroyed when the last
//! handle goes away. Pending operations and select entries hold their own
//! handle, so the caller may drop theirs while an operation is in flight.
//!
//! Reactor-side code drives the channel through [`Operation`](crate::op::Operation)
//! and [`Select`](crate::select::Select). The one thread outside the reactor
//! uses [`try_push`](Channel::try_push) / [`try_pop`](Channel::try_pop),
//! keeping to the single-producer/single-consumer discipline.

use std::fmt;
use std::mem::ManuallyDrop;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::error::{ChanError, ChanResult, Full, TryPushError};
use crate::ring::RingBuffer;
use crate::slot::Slot;

/// Outcome of one non-blocking attempt made from a poll step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Attempt {
    /// The element moved
    Ready,
    /// The channel is closed; nothing moved
    Closed,
    /// Try again next tick
    Pending,
}

/// Shared handle to a bounded channel of `T`
pub struct Channel<T> {
    inner: Arc<ChannelInner<T>>,
}

/// Internal channel state
struct ChannelInner<T> {
    /// Queue storage, exclusively owned by the channel
    ring: ManuallyDrop<RingBuffer<T>>,

    /// Closed flag (monotonic)
    closed: AtomicBool,

    /// Pop attempts currently in progress
    polling: AtomicUsize,

    /// Requested capacity was < 1
    rendezvous: bool,

    /// Process-unique id for logging
    id: u64,
}

impl<T> Channel<T> {
    /// Create a channel holding up to `capacity` elements.
    ///
    /// A capacity of 0 creates a rendezvous channel: one slot of storage,
    /// and a push only goes through while a pop attempt is in progress.
    pub fn new(capacity: usize) -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);

        let rendezvous = capacity < 1;
        let inner = ChannelInner {
            ring: ManuallyDrop::new(RingBuffer::new(capacity.max(1))),
            closed: AtomicBool::new(false),
            polling: AtomicUsize::new(0),
            rendezvous,
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
        };
        crate::ktrace!(
            "chan#{} created capacity={} rendezvous={}",
            inner.id,
            inner.ring.capacity(),
            rendezvous
        );
        Channel { inner: Arc::new(inner) }
    }

    /// Shorthand for `Channel::new(0)`
    pub fn rendezvous() -> Self {
        Self::new(0)
    }

    /// Logical capacity (1 for rendezvous channels)
    #[inline]
    pub fn capacity(&self) -> usize {
        self.inner.ring.capacity()
    }

    #[inline]
    pub fn is_rendezvous(&self) -> bool {
        self.inner.rendezvous
    }

    /// Process-unique channel id (for logs and diagnostics)
    #[inline]
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Close the channel. Idempotent and irreversible; storage stays alive
    /// until the last handle drops, and buffered elements remain poppable.
    pub fn close(&self) {
        // Release: pushes made before the close are visible to whoever
        // observes the flag.
        if !self.inner.closed.swap(true, Ordering::Release) {
            crate::kdebug!("chan#{} closed", self.inner.id);
        }
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Number of live handles, including those held by pending operations
    #[inline]
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    /// Pop attempts currently in progress
    #[inline]
    pub fn polling(&self) -> usize {
        self.inner.polling.load(Ordering::Acquire)
    }

    /// Whether both handles refer to the same channel
    #[inline]
    pub fn same_channel(&self, other: &Channel<T>) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Rendezvous channels only accept a push while someone other than
    /// the pusher's own `own_pollers` pop attempts is popping
    #[inline]
    fn push_gate_open(&self, own_pollers: usize) -> bool {
        !self.inner.rendezvous || self.polling() > own_pollers
    }

    /// One non-blocking push.
    ///
    /// Fails with `ChannelClosed` on a closed channel and with `QueueFull`
    /// when the ring has no room (or, on a rendezvous channel, when no pop
    /// is in progress). The value is handed back either way.
    pub fn try_push(&self, value: T) -> Result<(), TryPushError<T>> {
        if self.is_closed() {
            return Err(TryPushError { error: ChanError::ChannelClosed, value });
        }
        if !self.push_gate_open(0) {
            return Err(TryPushError { error: ChanError::QueueFull, value });
        }
        self.inner
            .ring
            .push(value)
            .map_err(|Full(value)| TryPushError { error: ChanError::QueueFull, value })
    }

    /// One non-blocking pop.
    ///
    /// Elements buffered before a close are still returned; `ChannelClosed`
    /// only once the channel is closed and drained, `QueueEmpty` otherwise.
    pub fn try_pop(&self) -> ChanResult<T> {
        if let Ok(value) = self.inner.ring.pop() {
            return Ok(value);
        }
        if !self.is_closed() {
            return Err(ChanError::QueueEmpty);
        }
        // A producer may have pushed and closed between our pop and the
        // Acquire of `closed`; one more look catches that element.
        self.inner.ring.pop().map_err(|_| ChanError::ChannelClosed)
    }

    /// Push attempt made from a poll step: takes the value out of `slot`
    /// only when the ring accepts it.
    pub(crate) fn attempt_push(&self, slot: &Slot<T>) -> Attempt {
        self.attempt_push_excluding(slot, 0)
    }

    /// Push attempt from a caller that itself holds `own_pollers` of the
    /// in-progress pop attempts; those do not open the rendezvous gate.
    pub(crate) fn attempt_push_excluding(&self, slot: &Slot<T>, own_pollers: usize) -> Attempt {
        if self.is_closed() {
            return Attempt::Closed;
        }
        if !self.push_gate_open(own_pollers) {
            return Attempt::Pending;
        }
        // An emptied slot waits until the caller refills it.
        let Some(value) = slot.take() else {
            return Attempt::Pending;
        };
        match self.inner.ring.push(value) {
            Ok(()) => Attempt::Ready,
            Err(Full(value)) => {
                slot.put(value);
                Attempt::Pending
            }
        }
    }

    /// Pop attempt made from a poll step: stores the element into `slot`.
    pub(crate) fn attempt_pop(&self, slot: &Slot<T>) -> Attempt {
        match self.try_pop() {
            Ok(value) => {
                slot.put(value);
                Attempt::Ready
            }
            Err(ChanError::ChannelClosed) => Attempt::Closed,
            Err(_) => Attempt::Pending,
        }
    }

    /// A pop attempt starts
    pub(crate) fn begin_polling(&self) {
        self.inner.polling.fetch_add(1, Ordering::AcqRel);
    }

    /// A pop attempt resolved or was cancelled
    pub(crate) fn end_polling(&self) {
        let prev = self.inner.polling.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(prev > 0, "chan#{} polling count underflow", self.inner.id);
    }
}

impl<T> Clone for Channel<T> {
    fn clone(&self) -> Self {
        Channel { inner: Arc::clone(&self.inner) }
    }
}

impl<T> Drop for ChannelInner<T> {
    fn drop(&mut self) {
        // Safety: the ring is taken exactly once, here.
        let ring = unsafe { ManuallyDrop::take(&mut self.ring) };

        let mut undelivered = 0usize;
        while ring.pop().is_ok() {
            undelivered += 1;
        }
        if undelivered > 0 {
            crate::kwarn!(
                "chan#{} released with {} undelivered element(s)",
                self.id,
                undelivered
            );
        }
        ring.destroy();
        crate::ktrace!("chan#{} destroyed", self.id);
    }
}

impl<T> fmt::Debug for Channel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("id", &self.inner.id)
            .field("capacity", &self.capacity())
            .field("rendezvous", &self.inner.rendezvous)
            .field("closed", &self.is_closed())
            .field("polling", &self.polling())
            .field("refs", &self.ref_count())
            .finish()
    }
}
