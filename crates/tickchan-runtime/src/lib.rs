//! # tickchan-runtime
//!
//! A concrete single-threaded reactor for `tickchan-core` channels.
//!
//! This crate provides:
//! - `EventLoop`, which implements `Reactor` and drives scheduled tasks once per tick
//! - One-shot timers (`add_timer` / `cancel_timer`)
//! - `Remote`, a `Send` handle for posting closures from other threads
//! - `LoopConfig` with environment overrides

pub mod config;
pub mod error;
pub mod event_loop;
pub mod remote;
pub mod timer;

// Re-exports
pub use config::LoopConfig;
pub use error::{LoopError, LoopResult, RemoteFull};
pub use event_loop::{EventLoop, LoopStats};
pub use remote::{Remote, RemoteFn};
pub use timer::{TimerFn, TimerId};
