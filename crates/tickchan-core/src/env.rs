//! Environment variable utilities
//!
//! Typed lookups with defaults, used by `LoopConfig::from_env` and the
//! logging setup.
//!
//! # Usage
//!
//! ```ignore
//! use tickchan_core::env::{env_get, env_get_bool, env_get_micros};
//!
//! let capacity: usize = env_get("TCH_REMOTE_QUEUE_CAPACITY", 1024);
//! let debug = env_get_bool("TCH_DEBUG", false);
//! let idle = env_get_micros("TCH_IDLE_SLEEP_US", Duration::from_micros(50));
//! ```

use std::str::FromStr;
use std::time::Duration;

/// Get environment variable parsed as type T, or return default
///
/// Unset variables and values that fail to parse both yield `default`.
#[inline]
pub fn env_get<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    env_get_opt(key).unwrap_or(default)
}

/// Get environment variable as optional value
///
/// Returns `Some(T)` if the variable is set and parses successfully.
#[inline]
pub fn env_get_opt<T>(key: &str) -> Option<T>
where
    T: FromStr,
{
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Get environment variable as boolean
///
/// "1", "true", "yes", "on" (case-insensitive) are true; any other set
/// value is false. Unset returns the default.
#[inline]
pub fn env_get_bool(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(val) => matches!(val.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}

/// Get environment variable as a whole number of microseconds
#[inline]
pub fn env_get_micros(key: &str, default: Duration) -> Duration {
    env_get_opt::<u64>(key)
        .map(Duration::from_micros)
        .unwrap_or(default)
}

/// Check if environment variable is set (regardless of value)
#[inline]
pub fn env_is_set(key: &str) -> bool {
    std::env::var_os(key).is_some()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // Each test owns its variable names; tests run in parallel.

    #[test]
    fn test_env_get_default() {
        let val: usize = env_get("__TCH_TEST_UNSET_A__", 42);
        assert_eq!(val, 42);
        assert!(!env_is_set("__TCH_TEST_UNSET_A__"));
    }

    #[test]
    fn test_env_get_bool_default() {
        assert!(env_get_bool("__TCH_TEST_UNSET_B__", true));
        assert!(!env_get_bool("__TCH_TEST_UNSET_B__", false));
    }

    #[test]
    fn test_env_get_opt_none() {
        let val: Option<usize> = env_get_opt("__TCH_TEST_UNSET_C__");
        assert!(val.is_none());
    }

    #[test]
    fn test_env_get_with_set_var() {
        std::env::set_var("__TCH_TEST_NUM__", " 123 ");
        let val: usize = env_get("__TCH_TEST_NUM__", 0);
        assert_eq!(val, 123);
        std::env::remove_var("__TCH_TEST_NUM__");
    }

    #[test]
    fn test_env_get_invalid_parse() {
        std::env::set_var("__TCH_TEST_INVALID__", "not_a_number");
        let val: usize = env_get("__TCH_TEST_INVALID__", 99);
        assert_eq!(val, 99);
        std::env::remove_var("__TCH_TEST_INVALID__");
    }

    #[test]
    fn test_env_get_bool_variants() {
        for (raw, expected) in [("1", true), ("TRUE", true), ("yes", true), ("on", true),
                                ("0", false), ("false", false), ("garbage", false)] {
            std::env::set_var("__TCH_TEST_BOOL__", raw);
            assert_eq!(env_get_bool("__TCH_TEST_BOOL__", !expected), expected, "value {:?}", raw);
        }
        std::env::remove_var("__TCH_TEST_BOOL__");
    }

    #[test]
    fn test_env_get_micros() {
        assert_eq!(
            env_get_micros("__TCH_TEST_UNSET_D__", Duration::from_micros(7)),
            Duration::from_micros(7)
        );
        std::env::set_var("__TCH_TEST_MICROS__", "250");
        assert_eq!(
            env_get_micros("__TCH_TEST_MICROS__", Duration::ZERO),
            Duration::from_micros(250)
        );
        std::env::remove_var("__TCH_TEST_MICROS__");
    }
}
