//! # Event Log Configuration
//!
//! Sizes and coalescing policy of one event log instance. Each pipeline
//! instance gets its own configuration; nothing here is global.

use crate::error::{Error, Result};
use crate::event::EventMask;

/// Default slot count of the ring buffer
pub const DEFAULT_CAPACITY: usize = 1024;

/// Default replay depth of fault dumps
pub const DEFAULT_PRINT_MAX: usize = 512;

/// Default number of allocation attempts
pub const DEFAULT_ALLOC_RETRIES: u32 = 3;

/// Default K of the K-window coalescing rule
pub const DEFAULT_COALESCE_WINDOW: usize = 4;

/// Default auto-refresh streak threshold
pub const DEFAULT_STREAK_THRESHOLD: u32 = 3;

/// Largest supported coalescing window
pub const MAX_COALESCE_WINDOW: usize = 16;

// =============================================================================
// STREAK POLICY
// =============================================================================

/// Hard cutoff of per-frame events during auto-refresh
///
/// Every frame start extends the auto-refresh streak. Once the streak
/// exceeds `threshold`, events in `gated` are dropped outright. Any event
/// outside `periodic` ends the streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreakPolicy {
    /// Streak length after which gated events are dropped, `None` disables the cutoff
    pub threshold: Option<u32>,
    /// Events dropped past the threshold
    pub gated: EventMask,
    /// Events that keep the streak alive
    pub periodic: EventMask,
}

impl StreakPolicy {
    /// Policy with the cutoff disabled
    pub const fn disabled() -> Self {
        Self {
            threshold: None,
            gated: EventMask::FRAME_EVENTS,
            periodic: EventMask::PERIODIC,
        }
    }
}

impl Default for StreakPolicy {
    fn default() -> Self {
        Self {
            threshold: Some(DEFAULT_STREAK_THRESHOLD),
            gated: EventMask::FRAME_EVENTS,
            periodic: EventMask::PERIODIC,
        }
    }
}

// =============================================================================
// EVENT LOG CONFIG
// =============================================================================

/// Event log configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventLogConfig {
    /// Requested slot count
    pub capacity: usize,
    /// Replay depth used by fault dumps
    pub print_max: usize,
    /// Allocation attempts, halving the slot count after each failure
    pub alloc_retries: u32,
    /// K of the K-window rule, 0 disables coalescing
    pub coalesce_window: usize,
    /// Events subject to the K-window rule
    pub coalesce: EventMask,
    /// Auto-refresh hard cutoff
    pub streak: StreakPolicy,
}

impl Default for EventLogConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            print_max: DEFAULT_PRINT_MAX,
            alloc_retries: DEFAULT_ALLOC_RETRIES,
            coalesce_window: DEFAULT_COALESCE_WINDOW,
            coalesce: EventMask::PERIODIC | EventMask::ERRORS,
            streak: StreakPolicy::default(),
        }
    }
}

impl EventLogConfig {
    /// Set requested capacity
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Set fault dump depth
    pub fn with_print_max(mut self, print_max: usize) -> Self {
        self.print_max = print_max;
        self
    }

    /// Set allocation attempts
    pub fn with_alloc_retries(mut self, retries: u32) -> Self {
        self.alloc_retries = retries;
        self
    }

    /// Set coalescing window and the events it applies to
    pub fn with_coalescing(mut self, window: usize, events: EventMask) -> Self {
        self.coalesce_window = window;
        self.coalesce = events;
        self
    }

    /// Set auto-refresh cutoff
    pub fn with_streak(mut self, streak: StreakPolicy) -> Self {
        self.streak = streak;
        self
    }

    /// Check configuration
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 || self.coalesce_window > MAX_COALESCE_WINDOW {
            return Err(Error::InvalidConfig);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventType;

    #[test]
    fn test_defaults() {
        let config = EventLogConfig::default();
        assert_eq!(config.capacity, 1024);
        assert_eq!(config.print_max, 512);
        assert_eq!(config.coalesce_window, 4);
        assert!(config.coalesce.has(EventType::DsimCrc));
        assert!(config.coalesce.has(EventType::TeInterrupt));
        assert!(!config.streak.gated.has(EventType::DsimCrc));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate() {
        assert_eq!(
            EventLogConfig::default().with_capacity(0).validate(),
            Err(Error::InvalidConfig)
        );
        assert_eq!(
            EventLogConfig::default()
                .with_coalescing(MAX_COALESCE_WINDOW + 1, EventMask::PERIODIC)
                .validate(),
            Err(Error::InvalidConfig)
        );
        assert!(EventLogConfig::default()
            .with_coalescing(0, EventMask::empty())
            .validate()
            .is_ok());
    }
}
