//! Event loop configuration
//!
//! Provides compile-time defaults with runtime environment overrides.
//!
//! # Configuration Priority (highest wins)
//!
//! 1. Builder calls on the returned value
//! 2. Environment variables (runtime)
//! 3. Library defaults (`defaults`)
//!
//! # Example
//!
//! ```rust,ignore
//! use tickchan_runtime::config::LoopConfig;
//!
//! // Use defaults with env overrides
//! let config = LoopConfig::from_env();
//!
//! // Or customize programmatically
//! let config = LoopConfig::from_env()
//!     .idle_sleep(Duration::ZERO)
//!     .max_ticks(10_000);
//! ```

pub mod defaults;

use std::time::Duration;

use tickchan_core::env::{env_get, env_get_bool, env_get_micros};
use tickchan_core::kprintln;

use crate::error::LoopError;

/// Event loop configuration with builder pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopConfig {
    /// Sleep after a tick that made no progress (zero yields instead)
    pub idle_sleep: Duration,
    /// Capacity of the `Remote` injection queue
    pub remote_queue_capacity: usize,
    /// Stop `run()` after this many ticks (0 = unbounded)
    pub max_ticks: u64,
    /// Raise the log level to debug when the loop is created
    pub debug_logging: bool,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

impl LoopConfig {
    /// Create config from compile-time defaults with environment overrides.
    ///
    /// Environment variables (all optional):
    /// - `TCH_IDLE_SLEEP_US` - Idle sleep in microseconds
    /// - `TCH_REMOTE_QUEUE_CAPACITY` - Remote injection queue size
    /// - `TCH_MAX_TICKS` - Tick limit for `run()` (0 = unbounded)
    /// - `TCH_DEBUG` - Enable debug logging (0/1)
    pub fn from_env() -> Self {
        Self {
            idle_sleep: env_get_micros(
                "TCH_IDLE_SLEEP_US",
                Duration::from_micros(defaults::IDLE_SLEEP_US),
            ),
            remote_queue_capacity: env_get(
                "TCH_REMOTE_QUEUE_CAPACITY",
                defaults::REMOTE_QUEUE_CAPACITY,
            ),
            max_ticks: env_get("TCH_MAX_TICKS", defaults::MAX_TICKS),
            debug_logging: env_get_bool("TCH_DEBUG", defaults::DEBUG_LOGGING),
        }
    }

    /// Create config with explicit defaults (no env override).
    /// Useful for testing or when you want full control.
    pub fn new() -> Self {
        Self {
            idle_sleep: Duration::from_micros(defaults::IDLE_SLEEP_US),
            remote_queue_capacity: defaults::REMOTE_QUEUE_CAPACITY,
            max_ticks: defaults::MAX_TICKS,
            debug_logging: defaults::DEBUG_LOGGING,
        }
    }

    // Builder methods

    pub fn idle_sleep(mut self, d: Duration) -> Self {
        self.idle_sleep = d;
        self
    }

    pub fn remote_queue_capacity(mut self, cap: usize) -> Self {
        self.remote_queue_capacity = cap;
        self
    }

    pub fn max_ticks(mut self, n: u64) -> Self {
        self.max_ticks = n;
        self
    }

    pub fn debug_logging(mut self, enable: bool) -> Self {
        self.debug_logging = enable;
        self
    }

    /// Validate configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), LoopError> {
        if self.remote_queue_capacity == 0 {
            return Err(LoopError::InvalidConfig("remote_queue_capacity must be > 0"));
        }
        Ok(())
    }

    /// Print configuration (for debugging)
    pub fn print(&self) {
        kprintln!("tickchan loop configuration:");
        kprintln!("  idle_sleep:             {:?}", self.idle_sleep);
        kprintln!("  remote_queue_capacity:  {}", self.remote_queue_capacity);
        kprintln!("  max_ticks:              {}", self.max_ticks);
        kprintln!("  debug_logging:          {}", self.debug_logging);
    }
}
