//! # Coalescing Policy
//!
//! Decides which occurrences of noisy event types reach the ring buffer.
//!
//! Two independent mechanisms apply:
//!
//! - **Streak cutoff**: frame starts extend an auto-refresh streak; past the
//!   configured threshold the gated frame events are dropped outright until
//!   a non-periodic event (or a commit) ends the streak.
//! - **K-window**: an event of a coalesced type is dropped when the last K
//!   claimed slots all hold that same type. This check runs inside the
//!   ring buffer claim lock.
//!
//! Error counters (underrun, CRC, ECC) count every occurrence, including
//! the ones that are dropped: the counters hold the true totals and the
//! ring buffer a rate-limited view.

use core::sync::atomic::{AtomicU32, Ordering};

use crate::config::{EventLogConfig, StreakPolicy};
use crate::event::{EventMask, EventType};
use crate::ring::History;

// =============================================================================
// COUNTERS
// =============================================================================

/// Snapshot of the per-instance counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Counters {
    /// Underruns seen
    pub underrun: u32,
    /// CRC errors seen
    pub crc: u32,
    /// ECC errors seen
    pub ecc: u32,
    /// Current auto-refresh streak
    pub auto_refresh: u32,
}

/// Why an occurrence was not recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suppression {
    /// Dropped by the auto-refresh streak cutoff
    Streak,
    /// Dropped by the K-window rule
    Coalesced,
}

// =============================================================================
// POLICY
// =============================================================================

/// Coalescing policy and counters of one event log instance
#[derive(Debug)]
pub struct CoalescingPolicy {
    /// K of the K-window rule
    window: usize,
    /// Types subject to the K-window rule
    coalesce: EventMask,
    /// Streak cutoff configuration
    streak: StreakPolicy,
    /// Auto-refresh streak
    auto_refresh: AtomicU32,
    /// Underrun total
    underrun: AtomicU32,
    /// CRC error total
    crc: AtomicU32,
    /// ECC error total
    ecc: AtomicU32,
}

impl CoalescingPolicy {
    /// Create a policy from configuration
    pub fn new(config: &EventLogConfig) -> Self {
        Self {
            window: config.coalesce_window,
            coalesce: config.coalesce,
            streak: config.streak,
            auto_refresh: AtomicU32::new(0),
            underrun: AtomicU32::new(0),
            crc: AtomicU32::new(0),
            ecc: AtomicU32::new(0),
        }
    }

    /// Account for one occurrence and apply the type specific guards
    ///
    /// Runs before any slot is claimed. Returns the counters including this
    /// occurrence, or the reason the occurrence is dropped.
    pub fn admit(&self, ty: EventType) -> Result<Counters, Suppression> {
        let counted = match ty {
            EventType::DsimUnderrun => Some(&self.underrun),
            EventType::DsimCrc => Some(&self.crc),
            EventType::DsimEcc => Some(&self.ecc),
            _ => None,
        }
        .map(|counter| counter.fetch_add(1, Ordering::Relaxed).wrapping_add(1));

        let streak = if ty == EventType::DeconFrameStart {
            self.auto_refresh.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
        } else if ty == EventType::AtomicCommit || !self.streak.periodic.has(ty) {
            self.auto_refresh.store(0, Ordering::Relaxed);
            0
        } else {
            self.auto_refresh.load(Ordering::Relaxed)
        };

        if let Some(threshold) = self.streak.threshold {
            if self.streak.gated.has(ty) && streak > threshold {
                return Err(Suppression::Streak);
            }
        }

        let mut counts = self.counters();
        counts.auto_refresh = streak;
        match (ty, counted) {
            (EventType::DsimUnderrun, Some(value)) => counts.underrun = value,
            (EventType::DsimCrc, Some(value)) => counts.crc = value,
            (EventType::DsimEcc, Some(value)) => counts.ecc = value,
            _ => {},
        }
        Ok(counts)
    }

    /// K-window rule: check if `ty` repeats the last K claims
    ///
    /// Must be called with the claim history locked, i.e. from
    /// [`RingBuffer::claim_unless`](crate::RingBuffer::claim_unless).
    pub fn should_suppress(&self, ty: EventType, history: &History) -> bool {
        self.window > 0 && self.coalesce.has(ty) && history.ends_with_run(ty, self.window)
    }

    /// Current counters
    pub fn counters(&self) -> Counters {
        Counters {
            underrun: self.underrun.load(Ordering::Relaxed),
            crc: self.crc.load(Ordering::Relaxed),
            ecc: self.ecc.load(Ordering::Relaxed),
            auto_refresh: self.auto_refresh.load(Ordering::Relaxed),
        }
    }

    /// Overwrite the underrun total
    pub fn set_underrun_count(&self, value: u32) {
        self.underrun.store(value, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ring::{HeapAllocator, RingBuffer};

    fn policy(config: EventLogConfig) -> CoalescingPolicy {
        CoalescingPolicy::new(&config)
    }

    #[test]
    fn test_error_counters_count_every_occurrence() {
        let policy = policy(EventLogConfig::default());
        for _ in 0..5 {
            policy.admit(EventType::DsimUnderrun).unwrap();
        }
        let counts = policy.admit(EventType::DsimCrc).unwrap();
        assert_eq!(counts.underrun, 5);
        assert_eq!(counts.crc, 1);
        assert_eq!(counts.ecc, 0);
    }

    #[test]
    fn test_streak_cutoff() {
        let policy = policy(EventLogConfig::default());
        for _ in 0..3 {
            assert!(policy.admit(EventType::DeconFrameStart).is_ok());
            assert!(policy.admit(EventType::DeconFrameDone).is_ok());
        }
        assert_eq!(policy.admit(EventType::DeconFrameStart), Err(Suppression::Streak));
        assert_eq!(policy.admit(EventType::DppFrameDone), Err(Suppression::Streak));
        // TE is periodic but not gated
        assert!(policy.admit(EventType::TeInterrupt).is_ok());
        assert_eq!(policy.counters().auto_refresh, 4);
    }

    #[test]
    fn test_streak_reset() {
        let policy = policy(EventLogConfig::default());
        for _ in 0..5 {
            let _ = policy.admit(EventType::DeconFrameStart);
        }
        assert!(policy.admit(EventType::AtomicCommit).is_ok());
        assert_eq!(policy.counters().auto_refresh, 0);
        assert!(policy.admit(EventType::DeconFrameStart).is_ok());

        for _ in 0..5 {
            let _ = policy.admit(EventType::DeconFrameStart);
        }
        assert!(policy.admit(EventType::VblankDisable).is_ok());
        assert_eq!(policy.counters().auto_refresh, 0);
    }

    #[test]
    fn test_streak_disabled() {
        let config = EventLogConfig::default().with_streak(StreakPolicy::disabled());
        let policy = policy(config);
        for _ in 0..100 {
            assert!(policy.admit(EventType::DeconFrameStart).is_ok());
        }
    }

    #[test]
    fn test_counted_even_when_cut_off() {
        let streak = StreakPolicy {
            threshold: Some(0),
            gated: EventMask::ERRORS,
            periodic: EventMask::PERIODIC | EventMask::ERRORS,
        };
        let policy = policy(EventLogConfig::default().with_streak(streak));
        policy.admit(EventType::DeconFrameStart).unwrap();
        assert_eq!(policy.admit(EventType::DsimEcc), Err(Suppression::Streak));
        assert_eq!(policy.counters().ecc, 1);
    }

    #[test]
    fn test_window_rule() {
        let policy = policy(EventLogConfig::default().with_streak(StreakPolicy::disabled()));
        let ring = RingBuffer::allocate(&mut HeapAllocator, 16, 1).unwrap();

        let mut recorded = 0;
        for _ in 0..10 {
            let claim = ring.claim_unless(EventType::TeInterrupt, |h| {
                policy.should_suppress(EventType::TeInterrupt, h)
            });
            recorded += usize::from(claim.is_some());
        }
        assert_eq!(recorded, 4);

        ring.claim_slot(EventType::DeconEnabled);
        let claim = ring.claim_unless(EventType::TeInterrupt, |h| {
            policy.should_suppress(EventType::TeInterrupt, h)
        });
        assert!(claim.is_some());
    }

    #[test]
    fn test_window_ignores_uncoalesced_types() {
        let policy = policy(EventLogConfig::default());
        let ring = RingBuffer::allocate(&mut HeapAllocator, 16, 1).unwrap();
        for _ in 0..8 {
            let claim = ring.claim_unless(EventType::PlaneUpdate, |h| {
                policy.should_suppress(EventType::PlaneUpdate, h)
            });
            assert!(claim.is_some());
        }
    }

    #[test]
    fn test_set_underrun_count() {
        let policy = policy(EventLogConfig::default());
        policy.admit(EventType::DsimUnderrun).unwrap();
        policy.set_underrun_count(0);
        assert_eq!(policy.admit(EventType::DsimUnderrun).unwrap().underrun, 1);
    }
}
