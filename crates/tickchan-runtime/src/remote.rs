//! Cross-thread injection into the event loop
//!
//! The event loop itself is `!Send`. Other threads reach it through a
//! `Remote`: closures posted here are drained and run on the loop thread
//! at the start of the next tick, in posting order.
//!
//! ```ignore
//! let remote = event_loop.remote();
//! std::thread::spawn(move || {
//!     let result = expensive();
//!     let _ = remote.post(move || kinfo!("worker finished: {}", result));
//! });
//! ```

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_queue::ArrayQueue;

use crate::error::RemoteFull;

/// A closure posted from another thread
pub type RemoteFn = Box<dyn FnOnce() + Send>;

struct Shared {
    queue: ArrayQueue<RemoteFn>,
    stop: AtomicBool,
}

/// `Send + Clone` handle to an event loop
#[derive(Clone)]
pub struct Remote {
    shared: Arc<Shared>,
}

impl Remote {
    pub(crate) fn new(capacity: usize) -> Self {
        Remote {
            shared: Arc::new(Shared {
                queue: ArrayQueue::new(capacity),
                stop: AtomicBool::new(false),
            }),
        }
    }

    /// Queue `f` to run on the loop thread.
    ///
    /// Fails without blocking when the queue is full; the closure is
    /// handed back inside the error.
    pub fn post<F>(&self, f: F) -> Result<(), RemoteFull>
    where
        F: FnOnce() + Send + 'static,
    {
        self.shared.queue.push(Box::new(f)).map_err(RemoteFull)
    }

    /// Ask the loop to return from `run()` at the next tick boundary
    pub fn stop(&self) {
        self.shared.stop.store(true, Ordering::Release);
    }

    /// Closures waiting to be drained
    pub fn pending(&self) -> usize {
        self.shared.queue.len()
    }

    pub fn capacity(&self) -> usize {
        self.shared.queue.capacity()
    }

    pub(crate) fn pop(&self) -> Option<RemoteFn> {
        self.shared.queue.pop()
    }

    /// Consume a stop request, if any
    pub(crate) fn take_stop(&self) -> bool {
        self.shared.stop.swap(false, Ordering::AcqRel)
    }
}

impl fmt::Debug for Remote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Remote")
            .field("pending", &self.pending())
            .field("capacity", &self.capacity())
            .field("stop", &self.shared.stop.load(Ordering::Relaxed))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::thread;

    #[test]
    fn test_post_and_drain_in_order() {
        let remote = Remote::new(4);
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        for i in 0..3 {
            let seen = Arc::clone(&seen);
            remote.post(move || seen.lock().unwrap().push(i)).unwrap();
        }
        assert_eq!(remote.pending(), 3);
        while let Some(f) = remote.pop() {
            f();
        }
        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn test_full_hands_closure_back() {
        let remote = Remote::new(1);
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        remote.post(|| {}).unwrap();
        let err = remote
            .post(move || {
                h.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap_err();

        (err.into_inner())();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_stop_is_consumed_once() {
        let remote = Remote::new(1);
        assert!(!remote.take_stop());
        remote.clone().stop();
        assert!(remote.take_stop());
        assert!(!remote.take_stop());
    }

    #[test]
    fn test_post_from_threads() {
        let remote = Remote::new(256);
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let remote = remote.clone();
                thread::spawn(move || {
                    for _ in 0..50 {
                        remote.post(|| {}).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(remote.pending(), 200);
    }
}
