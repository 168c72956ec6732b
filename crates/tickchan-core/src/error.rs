//! Error types for tickchan channels and select

use core::fmt;

/// Result type for channel and select operations
pub type ChanResult<T> = Result<T, ChanError>;

/// The fixed outcome set of every fallible channel/select operation.
///
/// Success is `Ok(..)`; everything else is one of these variants.
/// None of them is fatal. Full, empty and closed are routine outcomes
/// callers are expected to branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChanError {
    /// Queue has no free slot (for try_push)
    QueueFull,

    /// Queue holds no element (for try_pop)
    QueueEmpty,

    /// Channel was closed
    ChannelClosed,

    /// Select already holds the maximum number of entries
    SelectFull,

    /// Tag is already registered in the select
    SelectDuplicateTag,

    /// Select has neither entries nor a default
    SelectEmpty,

    /// Tag is not registered in the select
    SelectTagNotFound,

    /// Select has not fired yet
    SelectNoResult,
}

/// Numeric code of a successful operation
pub const SUCCESS: i32 = 0;

impl ChanError {
    /// All variants, in code order
    pub const ALL: [ChanError; 8] = [
        ChanError::QueueFull,
        ChanError::QueueEmpty,
        ChanError::ChannelClosed,
        ChanError::SelectFull,
        ChanError::SelectDuplicateTag,
        ChanError::SelectEmpty,
        ChanError::SelectTagNotFound,
        ChanError::SelectNoResult,
    ];

    /// Stable numeric code (`SUCCESS` is 0, variants follow from 1)
    #[inline]
    pub const fn code(self) -> i32 {
        match self {
            ChanError::QueueFull => 1,
            ChanError::QueueEmpty => 2,
            ChanError::ChannelClosed => 3,
            ChanError::SelectFull => 4,
            ChanError::SelectDuplicateTag => 5,
            ChanError::SelectEmpty => 6,
            ChanError::SelectTagNotFound => 7,
            ChanError::SelectNoResult => 8,
        }
    }

    /// Inverse of [`code`](Self::code). `SUCCESS` and unknown codes map to `None`.
    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.iter().copied().find(|e| e.code() == code)
    }

    /// Static description
    pub const fn as_str(self) -> &'static str {
        match self {
            ChanError::QueueFull => "queue is full",
            ChanError::QueueEmpty => "queue is empty",
            ChanError::ChannelClosed => "channel is closed",
            ChanError::SelectFull => "select is full",
            ChanError::SelectDuplicateTag => "duplicate select tag",
            ChanError::SelectEmpty => "select is empty",
            ChanError::SelectTagNotFound => "select tag not found",
            ChanError::SelectNoResult => "select has no result",
        }
    }
}

impl fmt::Display for ChanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::error::Error for ChanError {}

/// Describe any outcome code, including `SUCCESS`
pub fn error_to_string(code: i32) -> &'static str {
    if code == SUCCESS {
        return "success";
    }
    match ChanError::from_code(code) {
        Some(e) => e.as_str(),
        None => "unknown",
    }
}

/// Numeric code of an outcome
#[inline]
pub fn result_code<T>(result: &ChanResult<T>) -> i32 {
    match result {
        Ok(_) => SUCCESS,
        Err(e) => e.code(),
    }
}

/// Error returned by the raw ring when it has no free slot.
///
/// Hands the rejected value back.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Full<T>(pub T);

impl<T> fmt::Debug for Full<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Full(..)")
    }
}

impl<T> fmt::Display for Full<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "queue is full")
    }
}

impl<T> From<Full<T>> for ChanError {
    fn from(_: Full<T>) -> Self {
        ChanError::QueueFull
    }
}

/// Error returned by the raw ring when it holds no element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Empty;

impl fmt::Display for Empty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "queue is empty")
    }
}

impl From<Empty> for ChanError {
    fn from(_: Empty) -> Self {
        ChanError::QueueEmpty
    }
}

/// Error returned by [`Channel::try_push`](crate::channel::Channel::try_push)
///
/// Carries the outcome (`QueueFull` or `ChannelClosed`) and the value
/// that was not queued.
#[derive(Clone, PartialEq, Eq)]
pub struct TryPushError<T> {
    pub error: ChanError,
    pub value: T,
}

impl<T> TryPushError<T> {
    /// Recover the rejected value
    #[inline]
    pub fn into_inner(self) -> T {
        self.value
    }
}

impl<T> fmt::Debug for TryPushError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TryPushError")
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

impl<T> fmt::Display for TryPushError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.error, f)
    }
}

impl<T> From<TryPushError<T>> for ChanError {
    fn from(e: TryPushError<T>) -> Self {
        e.error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(format!("{}", ChanError::ChannelClosed), "channel is closed");
        assert_eq!(format!("{}", ChanError::SelectFull), "select is full");
    }

    #[test]
    fn test_codes_are_stable_and_distinct() {
        for (i, e) in ChanError::ALL.iter().enumerate() {
            assert_eq!(e.code(), i as i32 + 1);
            assert_eq!(ChanError::from_code(e.code()), Some(*e));
        }
        assert_eq!(ChanError::from_code(SUCCESS), None);
        assert_eq!(ChanError::from_code(99), None);
    }

    #[test]
    fn test_error_to_string() {
        assert_eq!(error_to_string(SUCCESS), "success");
        assert_eq!(error_to_string(ChanError::QueueEmpty.code()), "queue is empty");
        assert_eq!(error_to_string(-1), "unknown");
        assert_eq!(error_to_string(1000), "unknown");
    }

    #[test]
    fn test_result_code() {
        let ok: ChanResult<()> = Ok(());
        assert_eq!(result_code(&ok), SUCCESS);
        let err: ChanResult<()> = Err(ChanError::SelectEmpty);
        assert_eq!(result_code(&err), 6);
    }

    #[test]
    fn test_error_conversion() {
        let e: ChanError = Full(5u8).into();
        assert_eq!(e, ChanError::QueueFull);
        let e: ChanError = Empty.into();
        assert_eq!(e, ChanError::QueueEmpty);

        let rejected = TryPushError { error: ChanError::ChannelClosed, value: "x" };
        assert_eq!(format!("{}", rejected), "channel is closed");
        assert_eq!(rejected.into_inner(), "x");
    }
}
