//! Asynchronous push/pop operations driven by a reactor
//!
//! An operation owns a channel handle, a caller-owned [`Slot`] and a
//! completion callback. It is polled once per tick until the element moves
//! (`Ok(())`) or the channel is observed closed (`Err(ChannelClosed)`).
//! On resolution it stops being scheduled, releases its channel handle,
//! then invokes the callback exactly once.
//!
//! ```ignore
//! let ch = Channel::new(4);
//! let out = Slot::new();
//! let handle = Operation::pop(&ch, &out)
//!     .on_complete(|res| kinfo!("pop finished: {:?}", res))
//!     .start(&event_loop);
//! ```
//!
//! There is no fairness among several operations on the same channel
//! beyond the order the reactor revisits them.

use std::fmt;

use crate::channel::{Attempt, Channel};
use crate::error::{ChanError, ChanResult};
use crate::id::TaskId;
use crate::slot::Slot;
use crate::traits::{Reactor, Tick};

/// Direction of an operation or select entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    Push,
    Pop,
}

/// Completion callback of a push or pop
pub type Callback = Box<dyn FnOnce(ChanResult<()>)>;

/// Stand-in used when the caller supplies no callback. Cleanup is the
/// same either way; the outcome is simply discarded.
fn noop_callback() -> Callback {
    Box::new(|_| {})
}

/// Builder for one push or pop
pub struct Operation<T> {
    channel: Channel<T>,
    slot: Slot<T>,
    kind: OpKind,
    callback: Option<Callback>,
}

impl<T: 'static> Operation<T> {
    /// Push the value held in `slot` into `channel`
    pub fn push(channel: &Channel<T>, slot: &Slot<T>) -> Self {
        Self::new(channel, slot, OpKind::Push)
    }

    /// Pop one element of `channel` into `slot`
    pub fn pop(channel: &Channel<T>, slot: &Slot<T>) -> Self {
        Self::new(channel, slot, OpKind::Pop)
    }

    fn new(channel: &Channel<T>, slot: &Slot<T>, kind: OpKind) -> Self {
        Operation {
            channel: channel.clone(),
            slot: slot.clone(),
            kind,
            callback: None,
        }
    }

    /// Set the completion callback
    pub fn on_complete(mut self, callback: impl FnOnce(ChanResult<()>) + 'static) -> Self {
        self.callback = Some(Box::new(callback));
        self
    }

    /// Schedule the operation; it is first attempted on the next tick.
    pub fn start<R: Reactor + ?Sized>(self, reactor: &R) -> OpHandle {
        let Operation { channel, slot, kind, callback } = self;
        let chan_id = channel.id();

        if kind == OpKind::Pop {
            channel.begin_polling();
        }
        let mut pending = Some(PendingOp {
            channel,
            slot,
            kind,
            callback: Some(callback.unwrap_or_else(noop_callback)),
        });

        let id = reactor.schedule(Box::new(move || {
            let outcome = match pending.as_ref().map(PendingOp::attempt) {
                None => return Tick::Done,
                Some(Attempt::Pending) => return Tick::Pending,
                Some(Attempt::Ready) => Ok(()),
                Some(Attempt::Closed) => Err(ChanError::ChannelClosed),
            };
            if let Some(op) = pending.take() {
                op.resolve(outcome);
            }
            Tick::Done
        }));

        crate::ktrace!("chan#{} {:?} scheduled as task {}", chan_id, kind, id);
        OpHandle { id, kind }
    }
}

/// Start pushing the value held in `slot`
pub fn start_push<T: 'static, R: Reactor + ?Sized>(
    reactor: &R,
    channel: &Channel<T>,
    slot: &Slot<T>,
    callback: impl FnOnce(ChanResult<()>) + 'static,
) -> OpHandle {
    Operation::push(channel, slot).on_complete(callback).start(reactor)
}

/// Start popping one element into `slot`
pub fn start_pop<T: 'static, R: Reactor + ?Sized>(
    reactor: &R,
    channel: &Channel<T>,
    slot: &Slot<T>,
    callback: impl FnOnce(ChanResult<()>) + 'static,
) -> OpHandle {
    Operation::pop(channel, slot).on_complete(callback).start(reactor)
}

/// State living inside the scheduled task
struct PendingOp<T> {
    channel: Channel<T>,
    slot: Slot<T>,
    kind: OpKind,
    callback: Option<Callback>,
}

impl<T> PendingOp<T> {
    fn attempt(&self) -> Attempt {
        match self.kind {
            OpKind::Push => self.channel.attempt_push(&self.slot),
            OpKind::Pop => self.channel.attempt_pop(&self.slot),
        }
    }

    /// Release the channel handle (and polling count), then fire.
    fn resolve(mut self, outcome: ChanResult<()>) {
        let callback = self.callback.take();
        crate::ktrace!(
            "chan#{} {:?} resolved: {:?}",
            self.channel.id(),
            self.kind,
            outcome
        );
        drop(self);
        if let Some(callback) = callback {
            callback(outcome);
        }
    }
}

impl<T> Drop for PendingOp<T> {
    fn drop(&mut self) {
        if self.kind == OpKind::Pop {
            self.channel.end_polling();
        }
    }
}

/// Handle to a scheduled operation.
///
/// Dropping the handle does not cancel the operation.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct OpHandle {
    id: TaskId,
    kind: OpKind,
}

impl OpHandle {
    /// Reactor task driving this operation
    #[inline]
    pub fn id(&self) -> TaskId {
        self.id
    }

    #[inline]
    pub fn kind(&self) -> OpKind {
        self.kind
    }

    /// Cancel before resolution. The channel handle and polling count are
    /// released and the callback never fires. Returns `false` if the
    /// operation already resolved.
    ///
    /// Timeouts are built by cancelling from a timer.
    pub fn cancel<R: Reactor + ?Sized>(&self, reactor: &R) -> bool {
        let cancelled = reactor.cancel(self.id);
        if cancelled {
            crate::ktrace!("{:?} task {} cancelled", self.kind, self.id);
        }
        cancelled
    }
}

impl fmt::Debug for OpHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OpHandle({:?}, {})", self.kind, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_reactor::TestReactor;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recorder() -> (Rc<RefCell<Vec<ChanResult<()>>>>, impl Fn() -> Box<dyn FnOnce(ChanResult<()>)>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let make = {
            let log = Rc::clone(&log);
            move || {
                let log = Rc::clone(&log);
                Box::new(move |r| log.borrow_mut().push(r)) as Box<dyn FnOnce(ChanResult<()>)>
            }
        };
        (log, make)
    }

    #[test]
    fn test_push_then_pop() {
        let reactor = TestReactor::new();
        let ch = Channel::new(1);
        let src = Slot::with(5);
        let dst = Slot::new();
        let (log, cb) = recorder();

        start_push(&reactor, &ch, &src, cb());
        start_pop(&reactor, &ch, &dst, cb());
        assert!(log.borrow().is_empty());

        reactor.tick();
        assert_eq!(*log.borrow(), vec![Ok(()), Ok(())]);
        assert_eq!(dst.take(), Some(5));
        assert!(src.is_empty());
        assert_eq!(reactor.pending(), 0);
    }

    #[test]
    fn test_pop_waits_for_value() {
        let reactor = TestReactor::new();
        let ch = Channel::new(2);
        let dst = Slot::new();
        let (log, cb) = recorder();

        start_pop(&reactor, &ch, &dst, cb());
        for _ in 0..5 {
            reactor.tick();
        }
        assert!(log.borrow().is_empty());
        assert_eq!(ch.polling(), 1);

        ch.try_push(9).unwrap();
        reactor.tick();
        assert_eq!(*log.borrow(), vec![Ok(())]);
        assert_eq!(dst.take(), Some(9));
        assert_eq!(ch.polling(), 0);
    }

    #[test]
    fn test_push_waits_for_room() {
        let reactor = TestReactor::new();
        let ch = Channel::new(1);
        ch.try_push(1).unwrap();
        let src = Slot::with(2);
        let (log, cb) = recorder();

        start_push(&reactor, &ch, &src, cb());
        reactor.tick();
        reactor.tick();
        assert!(log.borrow().is_empty());
        assert_eq!(src.get(), Some(2));

        assert_eq!(ch.try_pop(), Ok(1));
        reactor.tick();
        assert_eq!(*log.borrow(), vec![Ok(())]);
        assert_eq!(ch.try_pop(), Ok(2));
    }

    #[test]
    fn test_close_drains_before_reporting() {
        let reactor = TestReactor::new();
        let ch = Channel::new(4);
        ch.try_push(1).unwrap();
        ch.try_push(2).unwrap();
        ch.close();

        let (log, cb) = recorder();
        let dst = Slot::new();
        let mut got = Vec::new();
        for _ in 0..3 {
            start_pop(&reactor, &ch, &dst, cb());
            reactor.tick();
            if let Some(v) = dst.take() {
                got.push(v);
            }
        }
        assert_eq!(got, vec![1, 2]);
        assert_eq!(
            *log.borrow(),
            vec![Ok(()), Ok(()), Err(ChanError::ChannelClosed)]
        );
    }

    #[test]
    fn test_closed_push_keeps_value() {
        let reactor = TestReactor::new();
        let ch = Channel::new(4);
        let src = Slot::with("keep");
        let (log, cb) = recorder();

        start_push(&reactor, &ch, &src, cb());
        ch.close();
        reactor.tick();
        assert_eq!(*log.borrow(), vec![Err(ChanError::ChannelClosed)]);
        assert_eq!(src.take(), Some("keep"));
    }

    #[test]
    fn test_close_wakes_pending_pop() {
        let reactor = TestReactor::new();
        let ch = Channel::<u8>::new(4);
        let (log, cb) = recorder();

        start_pop(&reactor, &ch, &Slot::new(), cb());
        reactor.tick();
        ch.close();
        reactor.tick();
        assert_eq!(*log.borrow(), vec![Err(ChanError::ChannelClosed)]);
        assert_eq!(ch.polling(), 0);
    }

    #[test]
    fn test_rendezvous_push_starves_without_pop() {
        let reactor = TestReactor::new();
        let ch = Channel::rendezvous();
        let (log, cb) = recorder();

        start_push(&reactor, &ch, &Slot::with(1), cb());
        for _ in 0..100 {
            reactor.tick();
        }
        assert!(log.borrow().is_empty());
        assert_eq!(reactor.pending(), 1);

        let dst = Slot::new();
        start_pop(&reactor, &ch, &dst, cb());
        assert_eq!(ch.polling(), 1);
        reactor.tick();
        assert_eq!(*log.borrow(), vec![Ok(()), Ok(())]);
        assert_eq!(dst.take(), Some(1));
        assert_eq!(ch.polling(), 0);
    }

    #[test]
    fn test_pending_push_keeps_channel_alive() {
        let reactor = TestReactor::new();
        let ch = Channel::new(1);
        let observer = ch.clone();
        let (log, cb) = recorder();

        start_push(&reactor, &ch, &Slot::with(3), cb());
        drop(ch);
        assert_eq!(observer.ref_count(), 2);

        reactor.tick();
        assert_eq!(*log.borrow(), vec![Ok(())]);
        assert_eq!(observer.ref_count(), 1);
        assert_eq!(observer.try_pop(), Ok(3));
    }

    #[test]
    fn test_reference_released_before_callback() {
        let reactor = TestReactor::new();
        let ch = Channel::new(1);
        let seen = Rc::new(RefCell::new(0));

        let observer = ch.clone();
        let s = Rc::clone(&seen);
        start_push(&reactor, &ch, &Slot::with(1u8), move |_| {
            *s.borrow_mut() = observer.ref_count();
        });
        drop(ch);
        reactor.tick();
        // Only the observer handle moved into the callback remains.
        assert_eq!(*seen.borrow(), 1);
    }

    #[test]
    fn test_cancel_releases_channel() {
        let reactor = TestReactor::new();
        let ch = Channel::<u32>::new(1);
        let (log, cb) = recorder();

        let handle = start_pop(&reactor, &ch, &Slot::new(), cb());
        assert_eq!(ch.ref_count(), 2);
        assert_eq!(ch.polling(), 1);

        assert!(handle.cancel(&reactor));
        assert!(!handle.cancel(&reactor));
        assert_eq!(ch.ref_count(), 1);
        assert_eq!(ch.polling(), 0);

        ch.try_push(1).unwrap();
        reactor.tick();
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_missing_callback_still_cleans_up() {
        let reactor = TestReactor::new();
        let ch = Channel::new(1);
        let src = Slot::with(11);

        let handle = Operation::push(&ch, &src).start(&reactor);
        assert_eq!(handle.kind(), OpKind::Push);
        reactor.tick();
        assert_eq!(reactor.pending(), 0);
        assert_eq!(ch.ref_count(), 1);
        assert_eq!(ch.try_pop(), Ok(11));
    }

    #[test]
    fn test_callback_can_start_next_operation() {
        let reactor = Rc::new(TestReactor::new());
        let ch = Channel::new(4);
        for i in 0..3 {
            ch.try_push(i).unwrap();
        }
        ch.close();

        let got = Rc::new(RefCell::new(Vec::new()));
        fn pop_loop(reactor: Rc<TestReactor>, ch: Channel<i32>, got: Rc<RefCell<Vec<i32>>>) {
            let dst = Slot::new();
            let out = dst.clone();
            let r = Rc::clone(&reactor);
            start_pop(&*reactor, &ch.clone(), &dst, move |res| {
                if res.is_ok() {
                    got.borrow_mut().extend(out.take());
                    pop_loop(r, ch, got);
                }
            });
        }
        pop_loop(Rc::clone(&reactor), ch, Rc::clone(&got));

        for _ in 0..10 {
            reactor.tick();
        }
        assert_eq!(*got.borrow(), vec![0, 1, 2]);
        assert_eq!(reactor.pending(), 0);
    }
}
