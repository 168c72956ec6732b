//! Minimal reactor for unit tests: ticks only when told to

use std::cell::{Cell, RefCell};

use crate::id::TaskId;
use crate::traits::{Reactor, Task, Tick};

#[derive(Default)]
pub(crate) struct TestReactor {
    tasks: RefCell<Vec<(TaskId, Option<Task>)>>,
    next_id: Cell<u64>,
    running: Cell<Option<TaskId>>,
    cancel_running: Cell<bool>,
}

impl TestReactor {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Run every task registered before this call once, in order
    pub(crate) fn tick(&self) {
        let count = self.tasks.borrow().len();
        for index in 0..count {
            let (id, task) = {
                let mut tasks = self.tasks.borrow_mut();
                let entry = &mut tasks[index];
                (entry.0, entry.1.take())
            };
            let Some(mut task) = task else { continue };

            self.running.set(Some(id));
            self.cancel_running.set(false);
            let tick = task();
            self.running.set(None);

            if tick == Tick::Pending && !self.cancel_running.get() {
                self.tasks.borrow_mut()[index].1 = Some(task);
            }
        }
        self.tasks.borrow_mut().retain(|(_, task)| task.is_some());
    }

    /// Tasks still scheduled
    pub(crate) fn pending(&self) -> usize {
        self.tasks.borrow().iter().filter(|(_, task)| task.is_some()).count()
    }
}

impl Reactor for TestReactor {
    fn schedule(&self, task: Task) -> TaskId {
        let id = TaskId::new(self.next_id.get() + 1);
        self.next_id.set(id.as_u64());
        self.tasks.borrow_mut().push((id, Some(task)));
        id
    }

    fn cancel(&self, id: TaskId) -> bool {
        if self.running.get() == Some(id) {
            self.cancel_running.set(true);
            return true;
        }
        let task = self
            .tasks
            .borrow_mut()
            .iter_mut()
            .find(|(task_id, _)| *task_id == id)
            .and_then(|(_, task)| task.take());
        task.is_some()
    }
}
