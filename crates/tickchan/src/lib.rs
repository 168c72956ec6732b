//! # tickchan - channels for a cooperative reactor
//!
//! Message passing between code driven by a single-threaded event loop
//! and one independent thread doing blocking work, without ever blocking
//! the loop.
//!
//! ## Features
//!
//! - **SPSC ring**: lock-free bounded queue, one producer and one consumer
//! - **Channels**: ref-counted, closable, optional rendezvous mode
//! - **Async push/pop**: retried once per tick until they resolve
//! - **Select**: up to 32 tagged attempts plus a default, registration-order priority
//!
//! ## Quick Start
//!
//! ```ignore
//! use tickchan::{spawn_blocking, start_pop, Channel, EventLoop, Slot};
//!
//! fn main() {
//!     let ev = EventLoop::new().unwrap();
//!     let results = Channel::new(16);
//!
//!     let tx = results.clone();
//!     let worker = spawn_blocking(move || {
//!         let _ = tx.try_push(expensive_computation());
//!         tx.close();
//!     })
//!     .unwrap();
//!
//!     let dst = Slot::new();
//!     let out = dst.clone();
//!     start_pop(&ev, &results, &dst, move |res| {
//!         println!("{:?} -> {:?}", res, out.take());
//!     });
//!
//!     ev.run();
//!     worker.join().unwrap();
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      User Code                              │
//! │        start_push / start_pop, Select, callbacks            │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      EventLoop                              │
//! │       remote posts, timers, deferred, tasks per tick        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//!    ┌──────────────┐   Channel<T>   ┌──────────────────────────┐
//!    │ reactor side │ ◄── SPSC ────► │ blocking thread          │
//!    │ (one thread) │     ring       │ try_push / try_pop       │
//!    └──────────────┘                └──────────────────────────┘
//! ```

use std::io;
use std::thread::{self, JoinHandle};

// Re-export core types
pub use tickchan_core::{
    error_to_string,
    result_code,
    start_pop,
    start_push,
    ChanError,
    ChanResult,
    Channel,
    Empty,
    Full,
    OpHandle,
    OpKind,
    Operation,
    Reactor,
    RingBuffer,
    Select,
    Slot,
    TaskId,
    Tick,
    TryPushError,
    WeakSelect,
};
pub use tickchan_core::constants::MAX_SELECT;

// Re-export kprint macros for debug logging
pub use tickchan_core::{kprint, kprintln, kerror, kwarn, kinfo, kdebug, ktrace};
pub use tickchan_core::kprint::{LogLevel, init as init_logging, set_log_level, set_flush_enabled, set_time_enabled};

// Re-export env utilities
pub use tickchan_core::{env_get, env_get_bool, env_get_micros, env_get_opt, env_is_set};

// Re-export runtime types
pub use tickchan_runtime::{
    EventLoop,
    LoopConfig,
    LoopError,
    LoopResult,
    LoopStats,
    Remote,
    RemoteFull,
    TimerId,
};

/// Run `f` on a dedicated, named OS thread.
///
/// This is the "other side" of a channel: the closure may block freely,
/// talking to the loop through `try_push`/`try_pop` on cloned channels.
/// Only one such thread may push into (or pop from) a given channel.
pub fn spawn_blocking<F, T>(f: F) -> io::Result<JoinHandle<T>>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    let handle = thread::Builder::new()
        .name("tickchan-blocking".into())
        .spawn(f)?;
    kdebug!("spawned blocking thread {:?}", handle.thread().id());
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    #[test]
    fn test_spawn_blocking_thread_name() {
        let name = spawn_blocking(|| thread::current().name().map(str::to_owned))
            .unwrap()
            .join()
            .unwrap();
        assert_eq!(name.as_deref(), Some("tickchan-blocking"));
    }

    #[test]
    fn test_worker_feeds_loop_until_closed() {
        let ev = Rc::new(EventLoop::with_config(LoopConfig::new().idle_sleep(Duration::ZERO)).unwrap());
        let ch = Channel::new(4);

        let tx = ch.clone();
        let worker = spawn_blocking(move || {
            for mut v in 0..20u32 {
                while let Err(e) = tx.try_push(v) {
                    v = e.into_inner();
                    thread::yield_now();
                }
            }
            tx.close();
        })
        .unwrap();

        let got = Rc::new(RefCell::new(Vec::new()));
        let closed = Rc::new(RefCell::new(false));
        pop_all(&ev, &ch, &got, &closed);
        ev.run();
        worker.join().unwrap();

        assert_eq!(*got.borrow(), (0..20).collect::<Vec<_>>());
        assert!(*closed.borrow());
        assert_eq!(ch.ref_count(), 1);
    }

    fn pop_all(
        ev: &Rc<EventLoop>,
        ch: &Channel<u32>,
        got: &Rc<RefCell<Vec<u32>>>,
        closed: &Rc<RefCell<bool>>,
    ) {
        let dst = Slot::new();
        let (ev2, ch2, got2, closed2, out) =
            (Rc::clone(ev), ch.clone(), Rc::clone(got), Rc::clone(closed), dst.clone());
        start_pop(&**ev, ch, &dst, move |res| match res {
            Ok(()) => {
                got2.borrow_mut().extend(out.take());
                pop_all(&ev2, &ch2, &got2, &closed2);
            }
            Err(ChanError::ChannelClosed) => *closed2.borrow_mut() = true,
            Err(e) => panic!("unexpected {}", e),
        });
    }

    #[test]
    fn test_reexports_are_wired() {
        assert_eq!(MAX_SELECT, 32);
        assert_eq!(error_to_string(result_code(&Err::<(), _>(ChanError::QueueFull))), "queue is full");
    }
}
