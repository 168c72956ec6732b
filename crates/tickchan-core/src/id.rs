//! Reactor task identifier type

use core::fmt;

/// Identifier of a task scheduled on a [`Reactor`](crate::traits::Reactor)
///
/// Reactors hand these out from a monotonically increasing counter, so an
/// id is never reused within one reactor. The value 0 is reserved as a
/// sentinel for "no task".
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct TaskId(u64);

impl TaskId {
    /// Sentinel value indicating no task
    pub const NONE: TaskId = TaskId(0);

    /// Create a new TaskId from a raw value
    #[inline]
    pub const fn new(id: u64) -> Self {
        TaskId(id)
    }

    /// Get the raw u64 value
    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Check if this is the NONE sentinel
    #[inline]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "TaskId(NONE)")
        } else {
            write!(f, "TaskId({})", self.0)
        }
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "none")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl Default for TaskId {
    fn default() -> Self {
        TaskId::NONE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_id_basics() {
        let id = TaskId::new(42);
        assert_eq!(id.as_u64(), 42);
        assert!(!id.is_none());
        assert_eq!(format!("{}", id), "42");
    }

    #[test]
    fn test_task_id_none() {
        let none = TaskId::default();
        assert!(none.is_none());
        assert_eq!(format!("{:?}", none), "TaskId(NONE)");
    }
}
