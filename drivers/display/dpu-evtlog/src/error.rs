//! # Event Log Errors
//!
//! Error types for the display event log.
//!
//! Recording never surfaces these to the display pipeline: the record path
//! reports an informational [`Outcome`](crate::Outcome) instead. Errors are
//! returned from initialization, configuration and the multi-instance front
//! door only.

use core::fmt;

// =============================================================================
// RESULT TYPE
// =============================================================================

/// Event log result type alias
pub type Result<T> = core::result::Result<T, Error>;

// =============================================================================
// ERROR ENUM
// =============================================================================

/// Event log error type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// Configuration rejected by [`EventLogConfig::validate`](crate::EventLogConfig::validate)
    InvalidConfig,
    /// Backing storage for the given slot count could not be allocated
    AllocationFailed {
        /// Slot count of the failed attempt
        slots: usize,
    },
    /// The log has no backing storage (allocation failed or torn down)
    LogDisabled,
    /// Pipeline instance index is negative or out of range
    InvalidInstance(i32),
    /// Raw event tag outside the event registry
    UnknownEvent(u16),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig => write!(f, "invalid event log configuration"),
            Self::AllocationFailed { slots } => {
                write!(f, "failed to allocate {} event log slots", slots)
            },
            Self::LogDisabled => write!(f, "event log disabled"),
            Self::InvalidInstance(index) => write!(f, "decon id is not valid({})", index),
            Self::UnknownEvent(tag) => write!(f, "unknown event tag {:#x}", tag),
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::ToString;

    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Error::InvalidInstance(-1).to_string(), "decon id is not valid(-1)");
        assert_eq!(Error::UnknownEvent(0x40).to_string(), "unknown event tag 0x40");
        assert_eq!(
            Error::AllocationFailed { slots: 256 }.to_string(),
            "failed to allocate 256 event log slots"
        );
    }
}
