//! Lock-free single-producer/single-consumer bounded ring buffer
//!
//! One slot is sacrificed to tell full from empty, so a ring of logical
//! capacity N allocates N + 1 slots.
//!
//! ```text
//!   tail = last slot read          head = next slot to write
//!        │                              │
//!   ┌────▼───┬────────┬────────┬────────▼───┬────────┐
//!   │  read  │  x1    │  x2    │   free     │  free  │
//!   └────────┴────────┴────────┴────────────┴────────┘
//!
//!   full  ⇔ head == tail
//!   empty ⇔ (tail + 1) % slots == head
//! ```
//!
//! # Thread safety
//!
//! - **Producer:** sole writer of `head`. Writes the element, then
//!   publishes the new `head` with `Release`.
//! - **Consumer:** sole writer of `tail`. Reads `head` with `Acquire`
//!   before touching the element, then publishes the new `tail` with
//!   `Release` so the producer may reuse the slot.
//!
//! Each side also takes a claim flag with a non-waiting swap. A second
//! producer (or consumer) racing the first is a contract violation; it
//! observes `Full` (or `Empty`) instead of touching a slot.
//!
//! There is deliberately no `len()`: with the opposite side running
//! concurrently it would be stale the moment it returned.

use core::cell::UnsafeCell;
use core::mem::MaybeUninit;
use core::ops::Deref;
use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::error::{Empty, Full};

cfg_if::cfg_if! {
    if #[cfg(any(target_arch = "x86_64", target_arch = "aarch64"))] {
        // Adjacent-line prefetch pulls cache lines in pairs on these targets.
        #[repr(align(128))]
        struct CachePadded<T>(T);
    } else {
        #[repr(align(64))]
        struct CachePadded<T>(T);
    }
}

impl<T> Deref for CachePadded<T> {
    type Target = T;

    #[inline(always)]
    fn deref(&self) -> &T {
        &self.0
    }
}

/// Bounded SPSC ring of `T`
pub struct RingBuffer<T> {
    /// Next slot to write (producer writes, both read)
    head: CachePadded<AtomicUsize>,
    /// Last slot read (consumer writes, both read)
    tail: CachePadded<AtomicUsize>,
    push_claim: AtomicBool,
    pop_claim: AtomicBool,
    slots: Box<[UnsafeCell<MaybeUninit<T>>]>,
}

// Safety: slots are only touched by the claimed producer between its
// fullness check and the Release store of head, and by the claimed
// consumer between its Acquire load of head and the Release store of tail.
unsafe impl<T: Send> Send for RingBuffer<T> {}
unsafe impl<T: Send> Sync for RingBuffer<T> {}

/// Held for the duration of one push or pop.
struct Claim<'a>(&'a AtomicBool);

impl<'a> Claim<'a> {
    #[inline]
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        if flag.swap(true, Ordering::Acquire) {
            None
        } else {
            Some(Claim(flag))
        }
    }
}

impl Drop for Claim<'_> {
    #[inline]
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<T> RingBuffer<T> {
    /// Create a ring holding up to `capacity` elements (at least 1)
    pub fn new(capacity: usize) -> Self {
        let physical = capacity.max(1) + 1;
        let slots = (0..physical)
            .map(|_| UnsafeCell::new(MaybeUninit::uninit()))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        RingBuffer {
            head: CachePadded(AtomicUsize::new(1)),
            tail: CachePadded(AtomicUsize::new(0)),
            push_claim: AtomicBool::new(false),
            pop_claim: AtomicBool::new(false),
            slots,
        }
    }

    /// Logical capacity
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len() - 1
    }

    #[inline(always)]
    fn next(&self, index: usize) -> usize {
        let n = index + 1;
        if n == self.slots.len() {
            0
        } else {
            n
        }
    }

    /// Try to append `value`.
    ///
    /// Producer side only. Returns the value back in `Full` when no slot
    /// is free; the ring is left unchanged.
    pub fn push(&self, value: T) -> Result<(), Full<T>> {
        let Some(_claim) = Claim::acquire(&self.push_claim) else {
            return Err(Full(value));
        };

        let head = self.head.load(Ordering::Relaxed);
        // Acquire pairs with the consumer's Release of tail: its read of
        // the slot we are about to reuse has completed.
        let tail = self.tail.load(Ordering::Acquire);
        if head == tail {
            return Err(Full(value));
        }

        unsafe {
            (*self.slots[head].get()).write(value);
        }
        self.head.store(self.next(head), Ordering::Release);
        Ok(())
    }

    /// Try to remove the oldest element.
    ///
    /// Consumer side only. Returns `Empty` when nothing is queued; the
    /// ring is left unchanged.
    pub fn pop(&self) -> Result<T, Empty> {
        let Some(_claim) = Claim::acquire(&self.pop_claim) else {
            return Err(Empty);
        };

        let tail = self.tail.load(Ordering::Relaxed);
        let next = self.next(tail);
        // Acquire pairs with the producer's Release of head: the element
        // write is visible before we read it.
        if next == self.head.load(Ordering::Acquire) {
            return Err(Empty);
        }

        let value = unsafe { (*self.slots[next].get()).assume_init_read() };
        self.tail.store(next, Ordering::Release);
        Ok(value)
    }

    /// Destroy a ring the caller has drained.
    ///
    /// A non-empty ring means the caller still owns payloads it never
    /// finalized. That is a programmer error: it panics in debug builds
    /// (or with the `debug-assertions` feature) and is logged in release
    /// builds, where the stranded elements are dropped.
    pub fn destroy(mut self) {
        let stranded = self.drain_exclusive();
        if stranded == 0 {
            return;
        }
        if cfg!(any(debug_assertions, feature = "debug-assertions")) {
            panic!("RingBuffer destroyed with {} undrained element(s)", stranded);
        }
        crate::kerror!("RingBuffer destroyed with {} undrained element(s)", stranded);
    }

    /// Drop every queued element; we have `&mut self`, so no other side exists.
    fn drain_exclusive(&mut self) -> usize {
        let len = self.slots.len();
        let head = *self.head.0.get_mut();
        let mut tail = *self.tail.0.get_mut();
        let mut dropped = 0;
        loop {
            let next = if tail + 1 == len { 0 } else { tail + 1 };
            if next == head {
                break;
            }
            unsafe {
                self.slots[next].get_mut().assume_init_drop();
            }
            tail = next;
            dropped += 1;
        }
        *self.tail.0.get_mut() = tail;
        dropped
    }
}

impl<T> Drop for RingBuffer<T> {
    fn drop(&mut self) {
        self.drain_exclusive();
    }
}

impl<T> core::fmt::Debug for RingBuffer<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RingBuffer")
            .field("capacity", &self.capacity())
            .finish_non_exhaustive()
    }
}
