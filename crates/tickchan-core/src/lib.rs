//! # tickchan-core
//!
//! Message-passing channels for a single-threaded cooperative reactor.
//!
//! Nothing here blocks. A push or pop that cannot complete right now is
//! registered as a task on a [`Reactor`] and retried once per tick until
//! it resolves; the result is delivered through a one-shot callback.
//!
//! This crate is platform-agnostic and owns no event loop of its own.
//! `tickchan-runtime` provides one.
//!
//! ## Modules
//!
//! - `ring` - Lock-free SPSC bounded ring buffer
//! - `channel` - Ref-counted bounded channel with close and rendezvous mode
//! - `op` - Asynchronous push/pop operations retried every tick
//! - `select` - Multi-way select over tagged push/pop attempts
//! - `slot` - Caller-owned value buffers shared with pending operations
//! - `error` - Error taxonomy and numeric codes
//! - `id` - Reactor task identifier
//! - `traits` - The reactor interface
//! - `kprint` - Kernel-style debug printing macros
//! - `env` - Environment variable utilities

pub mod id;
pub mod error;
pub mod ring;
pub mod slot;
pub mod channel;
pub mod op;
pub mod select;
pub mod traits;
pub mod kprint;
pub mod env;

#[cfg(test)]
mod test_reactor;

// Re-exports for convenience
pub use id::TaskId;
pub use error::{error_to_string, result_code, ChanError, ChanResult, Empty, Full, TryPushError};
pub use ring::RingBuffer;
pub use slot::Slot;
pub use channel::Channel;
pub use op::{start_pop, start_push, OpHandle, OpKind, Operation};
pub use select::{Select, SelectCallback, WeakSelect};
pub use traits::{Reactor, Task, Tick};
pub use env::{env_get, env_get_bool, env_get_micros, env_get_opt, env_is_set};

/// Library-wide limits
pub mod constants {
    /// Maximum number of entries one select can hold (the default tag
    /// is not counted)
    pub const MAX_SELECT: usize = 32;
}
