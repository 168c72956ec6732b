//! Library defaults for `LoopConfig`
//!
//! Every value here can be overridden at runtime through the matching
//! `TCH_*` environment variable.

/// Sleep between ticks that made no progress, in microseconds (0 = yield)
pub const IDLE_SLEEP_US: u64 = 50;

/// Capacity of the cross-thread injection queue
pub const REMOTE_QUEUE_CAPACITY: usize = 1024;

/// Upper bound on ticks per `run()` (0 = unbounded)
pub const MAX_TICKS: u64 = 0;

cfg_if::cfg_if! {
    if #[cfg(feature = "debug-logging")] {
        pub const DEBUG_LOGGING: bool = true;
    } else {
        pub const DEBUG_LOGGING: bool = false;
    }
}
