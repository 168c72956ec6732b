//! Single-threaded cooperative event loop
//!
//! # Tick anatomy
//!
//! ```text
//!   tick()
//!     1. drain Remote posts queued before the tick started
//!     2. run expired timers, earliest first
//!     3. run callbacks deferred before the tick started
//!     4. invoke every scheduled task once, in registration order
//!     5. compact the task list
//! ```
//!
//! Tasks scheduled while a tick runs join at the end of the list and run
//! for the first time on the next tick. A task cancelled while it is
//! running is dropped as soon as it returns.
//!
//! The loop is `!Send`; other threads reach it through [`Remote`].

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::time::{Duration, Instant};

use tickchan_core::kprint::{self, LogLevel};
use tickchan_core::{kdebug, ktrace, Reactor, Task, TaskId, Tick};

use crate::config::LoopConfig;
use crate::error::LoopResult;
use crate::remote::Remote;
use crate::timer::{TimerId, TimerQueue};

/// Counters since the loop was created
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub ticks: u64,
    pub tasks_completed: u64,
    pub tasks_cancelled: u64,
    pub timers_fired: u64,
}

struct TaskEntry {
    id: TaskId,
    /// `None` while running or once finished
    task: Option<Task>,
}

/// The reactor: owns scheduled tasks, timers and deferred callbacks
pub struct EventLoop {
    config: LoopConfig,
    tasks: RefCell<Vec<TaskEntry>>,
    next_task_id: Cell<u64>,
    running: Cell<Option<TaskId>>,
    cancel_running: Cell<bool>,
    deferred: RefCell<VecDeque<Box<dyn FnOnce()>>>,
    timers: RefCell<TimerQueue>,
    remote: Remote,
    stats: Cell<LoopStats>,
}

impl EventLoop {
    /// Create a loop from `LoopConfig::from_env()`
    pub fn new() -> LoopResult<Self> {
        Self::with_config(LoopConfig::from_env())
    }

    pub fn with_config(config: LoopConfig) -> LoopResult<Self> {
        config.validate()?;
        if config.debug_logging && !kprint::level_enabled(LogLevel::Debug) {
            kprint::set_log_level(LogLevel::Debug);
        }
        kdebug!(
            "event loop created (idle_sleep={:?}, remote_queue_capacity={}, max_ticks={})",
            config.idle_sleep,
            config.remote_queue_capacity,
            config.max_ticks
        );

        Ok(EventLoop {
            remote: Remote::new(config.remote_queue_capacity),
            config,
            tasks: RefCell::new(Vec::new()),
            next_task_id: Cell::new(0),
            running: Cell::new(None),
            cancel_running: Cell::new(false),
            deferred: RefCell::new(VecDeque::new()),
            timers: RefCell::new(TimerQueue::new()),
            stats: Cell::new(LoopStats::default()),
        })
    }

    pub fn config(&self) -> &LoopConfig {
        &self.config
    }

    /// A `Send` handle for posting closures from other threads
    pub fn remote(&self) -> Remote {
        self.remote.clone()
    }

    /// Run `f` once at the start of the next tick
    pub fn defer(&self, f: impl FnOnce() + 'static) {
        self.deferred.borrow_mut().push_back(Box::new(f));
    }

    /// Run `f` once, on the first tick at least `delay` from now
    pub fn add_timer(&self, delay: Duration, f: impl FnOnce() + 'static) -> TimerId {
        let id = self
            .timers
            .borrow_mut()
            .insert(Instant::now(), delay, Box::new(f));
        ktrace!("{} armed for {:?}", id, delay);
        id
    }

    /// Returns `false` if the timer already fired or was cancelled
    pub fn cancel_timer(&self, id: TimerId) -> bool {
        self.timers.borrow_mut().cancel(id)
    }

    /// Ask `run()` to return at the next tick boundary
    pub fn stop(&self) {
        self.remote.stop();
    }

    pub fn stats(&self) -> LoopStats {
        self.stats.get()
    }

    /// Number of scheduled tasks
    pub fn pending_tasks(&self) -> usize {
        let running = usize::from(self.running.get().is_some() && !self.cancel_running.get());
        running + self.tasks.borrow().iter().filter(|e| e.task.is_some()).count()
    }

    /// True while anything could still make progress
    pub fn has_work(&self) -> bool {
        self.pending_tasks() > 0
            || !self.timers.borrow().is_empty()
            || !self.deferred.borrow().is_empty()
            || self.remote.pending() > 0
    }

    /// Run one tick. Returns the number of tasks that completed.
    pub fn tick(&self) -> usize {
        self.tick_inner().completed
    }

    /// Tick until there is no work left, `stop()` is requested, or
    /// `max_ticks` is reached.
    pub fn run(&self) -> LoopStats {
        kdebug!("event loop running");
        let mut ran: u64 = 0;
        loop {
            if self.remote.take_stop() {
                kdebug!("event loop stop requested");
                break;
            }
            if self.config.max_ticks > 0 && ran >= self.config.max_ticks {
                kdebug!("event loop reached max_ticks={}", self.config.max_ticks);
                break;
            }
            if !self.has_work() {
                break;
            }

            let outcome = self.tick_inner();
            ran += 1;
            if !outcome.progress {
                self.idle();
            }
        }
        let stats = self.stats();
        kdebug!("event loop finished: {:?}", stats);
        stats
    }

    /// Run at most `n` ticks, stopping early when there is no work left.
    /// Returns the number of ticks run.
    pub fn run_ticks(&self, n: u64) -> u64 {
        let mut ran = 0;
        while ran < n && self.has_work() {
            self.tick_inner();
            ran += 1;
        }
        ran
    }

    fn idle(&self) {
        if self.config.idle_sleep.is_zero() {
            std::thread::yield_now();
            return;
        }
        let mut sleep = self.config.idle_sleep;
        if let Some(deadline) = self.timers.borrow().next_deadline() {
            sleep = sleep.min(deadline.saturating_duration_since(Instant::now()));
        }
        std::thread::sleep(sleep);
    }

    fn tick_inner(&self) -> TickOutcome {
        let mut outcome = TickOutcome::default();
        // Only callbacks deferred before this tick; timers and posts below
        // may defer more, which wait for the next one.
        let deferred = std::mem::take(&mut *self.deferred.borrow_mut());

        // Posts that arrive while draining wait for the next tick.
        for _ in 0..self.remote.pending() {
            let Some(f) = self.remote.pop() else { break };
            f();
            outcome.progress = true;
        }

        let expired = self.timers.borrow_mut().poll_expired(Instant::now());
        let fired = expired.len() as u64;
        for (id, callback) in expired {
            ktrace!("{} fired", id);
            callback();
            outcome.progress = true;
        }

        for f in deferred {
            f();
            outcome.progress = true;
        }

        let mut cancelled = 0u64;
        let count = self.tasks.borrow().len();
        for index in 0..count {
            let (id, task) = {
                let mut tasks = self.tasks.borrow_mut();
                let entry = &mut tasks[index];
                (entry.id, entry.task.take())
            };
            let Some(mut task) = task else { continue };

            self.running.set(Some(id));
            self.cancel_running.set(false);
            let tick = task();
            self.running.set(None);

            if self.cancel_running.get() {
                self.cancel_running.set(false);
                cancelled += 1;
                ktrace!("task {} dropped after cancel", id);
            } else if tick == Tick::Done {
                outcome.completed += 1;
                outcome.progress = true;
                ktrace!("task {} done", id);
            } else {
                self.tasks.borrow_mut()[index].task = Some(task);
            }
        }
        self.tasks.borrow_mut().retain(|e| e.task.is_some());

        let mut stats = self.stats.get();
        stats.ticks += 1;
        stats.tasks_completed += outcome.completed as u64;
        stats.tasks_cancelled += cancelled;
        stats.timers_fired += fired;
        self.stats.set(stats);
        outcome
    }
}

#[derive(Default)]
struct TickOutcome {
    completed: usize,
    progress: bool,
}

impl Reactor for EventLoop {
    fn schedule(&self, task: Task) -> TaskId {
        let id = TaskId::new(self.next_task_id.get() + 1);
        self.next_task_id.set(id.as_u64());
        self.tasks.borrow_mut().push(TaskEntry { id, task: Some(task) });
        id
    }

    fn cancel(&self, id: TaskId) -> bool {
        if self.running.get() == Some(id) {
            if self.cancel_running.replace(true) {
                return false;
            }
            return true;
        }

        let task = self
            .tasks
            .borrow_mut()
            .iter_mut()
            .find(|e| e.id == id)
            .and_then(|e| e.task.take());
        match task {
            Some(task) => {
                // Dropped outside the borrow: a task's drop may touch the loop.
                drop(task);
                let mut stats = self.stats.get();
                stats.tasks_cancelled += 1;
                self.stats.set(stats);
                true
            }
            None => false,
        }
    }
}

impl fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventLoop")
            .field("pending_tasks", &self.pending_tasks())
            .field("timers", &self.timers.borrow().len())
            .field("deferred", &self.deferred.borrow().len())
            .field("remote", &self.remote)
            .field("stats", &self.stats.get())
            .finish()
    }
}
