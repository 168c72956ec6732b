//! Multi-way select over push/pop attempts
//!
//! A `Select` races tagged push and pop attempts, possibly on channels of
//! different element types, and fires exactly one tag per activation.
//!
//! # Per-tick scan
//!
//! Entries are visited in registration order. The first entry whose
//! channel is closed fires `(tag, Err(ChannelClosed))`; the first entry
//! whose operation succeeds fires `(tag, Ok(()))`. Entries after the
//! winner are not looked at that tick, even if they were ready. If no
//! entry fires and a default tag is registered, the default fires with
//! `Ok(())` and nothing is transferred. Otherwise the select stays
//! scheduled.
//!
//! Registration order is the only priority signal.
//!
//! # Slots
//!
//! Each entry moves its value through the `Slot` passed at registration.
//! `slot_for` looks one up by tag while it is registered, and
//! `result_slot` returns the slot of the entry that fired last (`None`
//! after the default fired).
//!
//! # Re-arming
//!
//! A callback holding a strong `Select` handle of its own set forms an
//! `Rc` cycle that keeps the set alive forever. Build such a set with
//! `new_cyclic`, whose callback gets a `WeakSelect`.
//!
//! ```ignore
//! let sel = Select::new(|tag, res| kinfo!("fired {:?}: {:?}", tag, res));
//! sel.add_pop("jobs", &jobs, &job_slot)?;
//! sel.add_push("results", &results, &result_slot)?;
//! sel.add_default("idle")?;
//! sel.start(&event_loop)?;
//! ```

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::channel::{Attempt, Channel};
use crate::constants::MAX_SELECT;
use crate::error::{ChanError, ChanResult};
use crate::id::TaskId;
use crate::op::OpKind;
use crate::slot::Slot;
use crate::traits::{Reactor, Tick};

/// Callback of a select: the fired tag and its outcome
pub type SelectCallback<K> = Box<dyn FnMut(K, ChanResult<()>)>;

/// One registered attempt, with the element type erased
trait Arm {
    fn kind(&self) -> OpKind;
    fn channel_id(&self) -> u64;
    fn is_closed(&self) -> bool;
    /// Counts toward its channel's `polling`
    fn is_armed_pop(&self) -> bool;
    /// `own_pollers`: armed pops of this same select on this channel
    fn attempt(&mut self, own_pollers: usize) -> bool;
    /// The select started; pop arms now count as polling
    fn arm(&mut self);
    /// The registered `Slot<T>`
    fn slot(&self) -> &dyn Any;
    fn slot_boxed(&self) -> Box<dyn Any>;
}

struct ChannelArm<T> {
    channel: Channel<T>,
    slot: Slot<T>,
    kind: OpKind,
    polling: bool,
}

impl<T: 'static> Arm for ChannelArm<T> {
    fn kind(&self) -> OpKind {
        self.kind
    }

    fn channel_id(&self) -> u64 {
        self.channel.id()
    }

    fn is_closed(&self) -> bool {
        self.channel.is_closed()
    }

    fn is_armed_pop(&self) -> bool {
        self.kind == OpKind::Pop && self.polling
    }

    fn attempt(&mut self, own_pollers: usize) -> bool {
        let attempt = match self.kind {
            OpKind::Push => self.channel.attempt_push_excluding(&self.slot, own_pollers),
            OpKind::Pop => self.channel.attempt_pop(&self.slot),
        };
        attempt == Attempt::Ready
    }

    fn arm(&mut self) {
        if self.kind == OpKind::Pop && !self.polling {
            self.channel.begin_polling();
            self.polling = true;
        }
    }

    fn slot(&self) -> &dyn Any {
        &self.slot
    }

    fn slot_boxed(&self) -> Box<dyn Any> {
        Box::new(self.slot.clone())
    }
}

impl<T> Drop for ChannelArm<T> {
    fn drop(&mut self) {
        if self.polling {
            self.channel.end_polling();
        }
    }
}

struct Entry<K> {
    tag: K,
    arm: Box<dyn Arm>,
}

struct SelectState<K> {
    entries: Vec<Entry<K>>,
    default_tag: Option<K>,
    /// Taken out while it runs
    callback: Option<SelectCallback<K>>,
    /// Reactor task while running
    task: Option<TaskId>,
    result: Option<(K, ChanResult<()>)>,
    /// `Slot<T>` of the entry that fired last
    result_slot: Option<Box<dyn Any>>,
}

/// A set of tagged attempts resolving to one fired tag per activation
///
/// Cloning yields another handle to the same set. Dropping every handle
/// of an idle set releases its channel references; a running set stays
/// alive inside the reactor until it fires or is cancelled.
pub struct Select<K> {
    state: Rc<RefCell<SelectState<K>>>,
}

/// Non-owning handle to a `Select`, for callbacks that re-arm their own set
pub struct WeakSelect<K> {
    state: Weak<RefCell<SelectState<K>>>,
}

impl<K> WeakSelect<K> {
    /// `None` once every strong handle (and the reactor's) is gone
    pub fn upgrade(&self) -> Option<Select<K>> {
        self.state.upgrade().map(|state| Select { state })
    }
}

impl<K> Clone for WeakSelect<K> {
    fn clone(&self) -> Self {
        WeakSelect { state: Weak::clone(&self.state) }
    }
}

impl<K> Select<K>
where
    K: Clone + PartialEq + fmt::Debug + 'static,
{
    /// Create an empty select firing into `callback`
    ///
    /// `callback` must not own a `Select` handle of this same set; see
    /// `new_cyclic`.
    pub fn new(callback: impl FnMut(K, ChanResult<()>) + 'static) -> Self {
        Select {
            state: Rc::new(RefCell::new(SelectState::new(Box::new(callback)))),
        }
    }

    /// Create an empty select whose callback is built with a weak handle
    /// to the set itself, so that it can re-register entries and restart
    /// without keeping the set alive.
    ///
    /// ```ignore
    /// let sel = Select::new_cyclic(|me| {
    ///     let me = me.clone();
    ///     move |tag, res| {
    ///         if let Some(sel) = me.upgrade() {
    ///             sel.add_pop("next", &ch, &slot).ok();
    ///         }
    ///     }
    /// });
    /// ```
    pub fn new_cyclic<F, C>(make_callback: F) -> Self
    where
        F: FnOnce(&WeakSelect<K>) -> C,
        C: FnMut(K, ChanResult<()>) + 'static,
    {
        let state = Rc::new_cyclic(|weak| {
            let me = WeakSelect { state: Weak::clone(weak) };
            RefCell::new(SelectState::new(Box::new(make_callback(&me))))
        });
        Select { state }
    }

    pub fn downgrade(&self) -> WeakSelect<K> {
        WeakSelect { state: Rc::downgrade(&self.state) }
    }

    /// Register an attempt to push the value held in `slot`
    pub fn add_push<T: 'static>(&self, tag: K, channel: &Channel<T>, slot: &Slot<T>) -> ChanResult<()> {
        self.add(tag, channel, slot, OpKind::Push)
    }

    /// Register an attempt to pop into `slot`
    pub fn add_pop<T: 'static>(&self, tag: K, channel: &Channel<T>, slot: &Slot<T>) -> ChanResult<()> {
        self.add(tag, channel, slot, OpKind::Pop)
    }

    fn add<T: 'static>(&self, tag: K, channel: &Channel<T>, slot: &Slot<T>, kind: OpKind) -> ChanResult<()> {
        let mut st = self.state.borrow_mut();
        if st.entries.len() >= MAX_SELECT {
            return Err(ChanError::SelectFull);
        }
        if st.entries.iter().any(|e| e.tag == tag) {
            return Err(ChanError::SelectDuplicateTag);
        }

        let mut arm = ChannelArm {
            channel: channel.clone(),
            slot: slot.clone(),
            kind,
            polling: false,
        };
        if st.task.is_some() {
            arm.arm();
        }
        crate::ktrace!("select add {:?} {:?} on chan#{}", tag, kind, channel.id());
        st.entries.push(Entry { tag, arm: Box::new(arm) });
        Ok(())
    }

    /// Register (or replace) the fallback tag
    pub fn add_default(&self, tag: K) -> ChanResult<()> {
        self.state.borrow_mut().default_tag = Some(tag);
        Ok(())
    }

    /// Detach the entry registered under `tag`, keeping the others in order
    pub fn remove(&self, tag: &K) -> ChanResult<()> {
        let removed = {
            let mut st = self.state.borrow_mut();
            let index = st
                .entries
                .iter()
                .position(|e| e.tag == *tag)
                .ok_or(ChanError::SelectTagNotFound)?;
            st.entries.remove(index)
        };
        crate::ktrace!("select removed {:?} on chan#{}", tag, removed.arm.channel_id());
        drop(removed);
        Ok(())
    }

    /// Begin scanning on every tick until one tag fires.
    ///
    /// Fails with `SelectEmpty` when there are no entries and no default.
    /// Starting a running select does nothing.
    pub fn start<R: Reactor + ?Sized>(&self, reactor: &R) -> ChanResult<()> {
        {
            let mut st = self.state.borrow_mut();
            if st.task.is_some() {
                return Ok(());
            }
            if st.entries.is_empty() && st.default_tag.is_none() {
                return Err(ChanError::SelectEmpty);
            }
            for entry in st.entries.iter_mut() {
                entry.arm.arm();
            }
        }

        let state = Rc::clone(&self.state);
        let id = reactor.schedule(Box::new(move || poll_select(&state)));
        self.state.borrow_mut().task = Some(id);
        crate::ktrace!("select scheduled as task {}", id);
        Ok(())
    }

    /// Tear the select down without firing: stop scheduling and release
    /// every entry. Returns `false` if it was not running.
    pub fn cancel<R: Reactor + ?Sized>(&self, reactor: &R) -> bool {
        let Some(id) = self.state.borrow_mut().task.take() else {
            return false;
        };
        reactor.cancel(id);
        let released = {
            let mut st = self.state.borrow_mut();
            st.default_tag = None;
            std::mem::take(&mut st.entries)
        };
        crate::ktrace!("select task {} cancelled, released {} entries", id, released.len());
        drop(released);
        true
    }

    /// Tag and outcome of the most recent activation
    pub fn last_result(&self) -> ChanResult<(K, ChanResult<()>)> {
        self.state
            .borrow()
            .result
            .clone()
            .ok_or(ChanError::SelectNoResult)
    }

    /// Number of registered entries (the default is not counted)
    pub fn len(&self) -> usize {
        self.state.borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, tag: &K) -> bool {
        self.state.borrow().entries.iter().any(|e| e.tag == *tag)
    }

    pub fn default_tag(&self) -> Option<K> {
        self.state.borrow().default_tag.clone()
    }

    pub fn is_running(&self) -> bool {
        self.state.borrow().task.is_some()
    }

    /// Slot of the entry registered under `tag`, if its element type is `T`
    pub fn slot_for<T: 'static>(&self, tag: &K) -> Option<Slot<T>> {
        let st = self.state.borrow();
        let entry = st.entries.iter().find(|e| e.tag == *tag)?;
        entry.arm.slot().downcast_ref::<Slot<T>>().cloned()
    }

    /// Slot of the entry behind the most recent firing, if its element
    /// type is `T`. `None` before the first firing and after the default.
    pub fn result_slot<T: 'static>(&self) -> Option<Slot<T>> {
        let st = self.state.borrow();
        st.result_slot.as_deref()?.downcast_ref::<Slot<T>>().cloned()
    }
}

impl<K> SelectState<K> {
    fn new(callback: SelectCallback<K>) -> Self {
        SelectState {
            entries: Vec::new(),
            default_tag: None,
            callback: Some(callback),
            task: None,
            result: None,
            result_slot: None,
        }
    }
}

/// One tick of a running select
fn poll_select<K>(state: &Rc<RefCell<SelectState<K>>>) -> Tick
where
    K: Clone + PartialEq + fmt::Debug + 'static,
{
    let (fired, released, callback) = {
        let mut st = state.borrow_mut();

        // A select's own pop arms never satisfy its own rendezvous push.
        let armed_pops: Vec<u64> = st
            .entries
            .iter()
            .filter(|e| e.arm.is_armed_pop())
            .map(|e| e.arm.channel_id())
            .collect();

        let mut fired = None;
        let mut fired_slot = None;
        for entry in st.entries.iter_mut() {
            if entry.arm.is_closed() {
                fired = Some((entry.tag.clone(), Err(ChanError::ChannelClosed)));
                fired_slot = Some(entry.arm.slot_boxed());
                break;
            }
            let own_pollers = match entry.arm.kind() {
                OpKind::Push => {
                    let id = entry.arm.channel_id();
                    armed_pops.iter().filter(|&&c| c == id).count()
                }
                OpKind::Pop => 0,
            };
            if entry.arm.attempt(own_pollers) {
                fired = Some((entry.tag.clone(), Ok(())));
                fired_slot = Some(entry.arm.slot_boxed());
                break;
            }
        }
        if fired.is_none() {
            fired = st.default_tag.clone().map(|tag| (tag, Ok(())));
        }
        let Some(fired) = fired else {
            return Tick::Pending;
        };

        st.task = None;
        st.default_tag = None;
        st.result = Some(fired.clone());
        st.result_slot = fired_slot;
        let released = std::mem::take(&mut st.entries);
        (fired, released, st.callback.take())
    };

    crate::kdebug!("select fired {:?}: {:?}", fired.0, fired.1);
    drop(released);

    if let Some(mut callback) = callback {
        let (tag, outcome) = fired;
        callback(tag, outcome);
        let mut st = state.borrow_mut();
        if st.callback.is_none() {
            st.callback = Some(callback);
        }
    }
    Tick::Done
}

impl<K> Clone for Select<K> {
    fn clone(&self) -> Self {
        Select { state: Rc::clone(&self.state) }
    }
}

impl<K: fmt::Debug> fmt::Debug for Select<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let st = self.state.borrow();
        let entries: Vec<_> = st
            .entries
            .iter()
            .map(|e| (&e.tag, e.arm.kind(), e.arm.channel_id()))
            .collect();
        f.debug_struct("Select")
            .field("entries", &entries)
            .field("default", &st.default_tag)
            .field("task", &st.task)
            .finish()
    }
}
