//! Reactor traits
//!
//! These traits define the interface between the platform-agnostic
//! channel core and whatever event loop drives it.

use crate::id::TaskId;

/// What a scheduled task reports after one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Not resolved yet; run me again next tick
    Pending,
    /// Resolved; stop scheduling me and drop me
    Done,
}

impl Tick {
    #[inline]
    pub fn is_done(self) -> bool {
        self == Tick::Done
    }
}

/// A unit of work re-invoked once per tick
pub type Task = Box<dyn FnMut() -> Tick>;

/// The host scheduler capability the channel core needs.
///
/// Implementations drive every scheduled task from one logical thread;
/// none of the channel bookkeeping is safe to poll from two threads.
pub trait Reactor {
    /// Invoke `task` once per tick until it returns `Tick::Done` or is
    /// cancelled. The task is dropped as soon as it stops being scheduled.
    fn schedule(&self, task: Task) -> TaskId;

    /// Stop invoking a task and drop it.
    ///
    /// Returns `false` if the task is unknown or already finished.
    /// A task cancelled from inside its own tick is dropped once it returns.
    fn cancel(&self, id: TaskId) -> bool;
}

impl<R: Reactor + ?Sized> Reactor for &R {
    fn schedule(&self, task: Task) -> TaskId {
        (**self).schedule(task)
    }

    fn cancel(&self, id: TaskId) -> bool {
        (**self).cancel(id)
    }
}

impl<R: Reactor + ?Sized> Reactor for std::rc::Rc<R> {
    fn schedule(&self, task: Task) -> TaskId {
        (**self).schedule(task)
    }

    fn cancel(&self, id: TaskId) -> bool {
        (**self).cancel(id)
    }
}
