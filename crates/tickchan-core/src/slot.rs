//! Caller-owned buffers shared with pending operations
//!
//! A push operation takes its value out of a `Slot` only at the moment
//! the value enters the queue; a pop operation stores what it received
//! into its `Slot`. The caller keeps a clone and inspects it from the
//! completion callback (or any time later).
//!
//! Slots are reactor-thread objects (`Rc`), like the operations that
//! borrow them.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Shared single-value cell
pub struct Slot<T> {
    cell: Rc<RefCell<Option<T>>>,
}

impl<T> Slot<T> {
    /// An empty slot, typically the destination of a pop
    pub fn new() -> Self {
        Slot { cell: Rc::new(RefCell::new(None)) }
    }

    /// A slot already holding `value`, typically the source of a push
    pub fn with(value: T) -> Self {
        Slot { cell: Rc::new(RefCell::new(Some(value))) }
    }

    /// Remove and return the held value
    #[inline]
    pub fn take(&self) -> Option<T> {
        self.cell.borrow_mut().take()
    }

    /// Store `value`, returning whatever was held before
    #[inline]
    pub fn put(&self, value: T) -> Option<T> {
        self.cell.borrow_mut().replace(value)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cell.borrow().is_none()
    }

    #[inline]
    pub fn is_filled(&self) -> bool {
        !self.is_empty()
    }

    /// Run `f` against the held value without removing it
    pub fn with_ref<R>(&self, f: impl FnOnce(Option<&T>) -> R) -> R {
        f(self.cell.borrow().as_ref())
    }
}

impl<T: Clone> Slot<T> {
    /// Copy of the held value
    pub fn get(&self) -> Option<T> {
        self.cell.borrow().clone()
    }
}

impl<T> Clone for Slot<T> {
    fn clone(&self) -> Self {
        Slot { cell: Rc::clone(&self.cell) }
    }
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for Slot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.cell.try_borrow() {
            Ok(v) => f.debug_tuple("Slot").field(&*v).finish(),
            Err(_) => f.write_str("Slot(<borrowed>)"),
        }
    }
}
