//! # Event Log
//!
//! [`EventLog`] ties one pipeline instance's ring buffer, coalescing
//! policy and clock together.
//!
//! ## Record path
//!
//! ```text
//! record(ty, source)
//!   ├─ ring missing?         -> Disabled   (single test, nothing mutated)
//!   ├─ policy.admit(ty)      -> counters, streak cutoff
//!   ├─ ring.claim_unless(..) -> K-window decision + claim, one lock
//!   ├─ clock + Payload::capture (no lock held)
//!   └─ ring.publish(..)       -> never waits, drops on contention
//! ```
//!
//! Recording never fails towards the caller. The returned [`Outcome`] is
//! informational only.

use alloc::string::String;
use core::fmt;
use core::panic::Location;

use crate::config::EventLogConfig;
use crate::error::{Error, Result};
use crate::event::EventType;
use crate::payload::{DsimCommand, EventRecord, Payload};
use crate::policy::{CoalescingPolicy, Counters, Suppression};
use crate::replay::{self, FormatLookup, Replay};
use crate::ring::{HeapAllocator, RingBuffer, SlotAllocator};
use crate::source::{Clock, CommandContext, CommitContext, CommitSource, EventSource};
use crate::writer::{LogWriter, LINE_MAX};

/// Result of a record call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Stored under the given claim sequence number
    Recorded {
        /// Claim sequence number
        seq: u64,
    },
    /// Dropped by the coalescing policy
    Suppressed(Suppression),
    /// Claimed, but the slot was busy or already reused at publication
    Lost {
        /// Claim sequence number
        seq: u64,
    },
    /// The log has no storage
    Disabled,
}

impl Outcome {
    /// Check if the occurrence was stored
    #[inline]
    pub fn is_recorded(&self) -> bool {
        matches!(self, Self::Recorded { .. })
    }
}

/// Event log of one display pipeline instance
pub struct EventLog<C: Clock> {
    /// Pipeline instance id
    id: usize,
    /// Configuration
    config: EventLogConfig,
    /// Timestamp source
    clock: C,
    /// Storage, `None` when disabled
    ring: Option<RingBuffer>,
    /// Coalescing policy and counters
    policy: CoalescingPolicy,
}

impl<C: Clock> fmt::Debug for EventLog<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventLog")
            .field("id", &self.id)
            .field("capacity", &self.capacity())
            .field("counters", &self.counters())
            .finish()
    }
}

impl<C: Clock> EventLog<C> {
    /// Initialize an event log
    ///
    /// Only an invalid configuration is an error. When no storage can be
    /// allocated the log comes up disabled and every record call is a
    /// no-op.
    pub fn initialize(
        id: usize,
        config: EventLogConfig,
        clock: C,
        allocator: &mut dyn SlotAllocator,
    ) -> Result<Self> {
        config.validate()?;

        let ring = match RingBuffer::allocate(allocator, config.capacity, config.alloc_retries) {
            Ok(ring) => Some(ring),
            Err(err) => {
                log::error!("decon{}: {}, event log disabled", id, err);
                None
            },
        };

        Ok(Self {
            id,
            policy: CoalescingPolicy::new(&config),
            config,
            clock,
            ring,
        })
    }

    /// Initialize an event log backed by the global heap
    pub fn new(id: usize, config: EventLogConfig, clock: C) -> Result<Self> {
        Self::initialize(id, config, clock, &mut HeapAllocator)
    }

    /// Pipeline instance id
    #[inline]
    pub fn id(&self) -> usize {
        self.id
    }

    /// Configuration
    #[inline]
    pub fn config(&self) -> &EventLogConfig {
        &self.config
    }

    /// Check if the log has storage
    #[inline(always)]
    pub fn is_enabled(&self) -> bool {
        self.ring.is_some()
    }

    /// Allocated slot count, 0 when disabled
    pub fn capacity(&self) -> usize {
        self.ring.as_ref().map_or(0, RingBuffer::capacity)
    }

    /// Claims handed out so far
    pub fn claimed(&self) -> u64 {
        self.ring.as_ref().map_or(0, RingBuffer::claimed)
    }

    /// Records lost to slot contention at publication
    pub fn dropped(&self) -> u64 {
        self.ring.as_ref().map_or(0, RingBuffer::dropped)
    }

    // =========================================================================
    // RECORDING
    // =========================================================================

    /// Record one occurrence
    pub fn record(&self, ty: EventType, source: &dyn EventSource) -> Outcome {
        let Some(ring) = self.ring.as_ref() else {
            return Outcome::Disabled;
        };

        let counts = match self.policy.admit(ty) {
            Ok(counts) => counts,
            Err(reason) => {
                #[cfg(feature = "debug")]
                log::debug!("decon{}: {} dropped ({:?})", self.id, ty.name(), reason);
                return Outcome::Suppressed(reason);
            },
        };

        let Some(claim) = ring.claim_unless(ty, |history| self.policy.should_suppress(ty, history))
        else {
            #[cfg(feature = "debug")]
            log::debug!("decon{}: {} coalesced", self.id, ty.name());
            return Outcome::Suppressed(Suppression::Coalesced);
        };

        let record = EventRecord {
            seq: claim.seq,
            timestamp: self.clock.now_ns(),
            ty,
            payload: Payload::capture(ty, source, &counts),
        };
        if ring.publish(claim, record) {
            Outcome::Recorded { seq: claim.seq }
        } else {
            Outcome::Lost { seq: claim.seq }
        }
    }

    /// Record an occurrence identified by its raw tag
    pub fn record_raw(&self, tag: u16, source: &dyn EventSource) -> Result<Outcome> {
        let ty = EventType::from_raw(tag).ok_or(Error::UnknownEvent(tag))?;
        Ok(self.record(ty, source))
    }

    /// Record an atomic commit with a snapshot of the window table
    pub fn capture_commit_snapshot(&self, table: &dyn CommitSource) -> Outcome {
        self.record(EventType::AtomicCommit, &CommitContext(table))
    }

    /// Record a command transaction along with the calling location
    #[track_caller]
    pub fn log_command(&self, mut cmd: DsimCommand) -> Outcome {
        cmd.site = Some(Location::caller());
        self.record(EventType::DsimCommand, &CommandContext(cmd))
    }

    // =========================================================================
    // COUNTERS
    // =========================================================================

    /// Error totals and auto-refresh streak
    pub fn counters(&self) -> Counters {
        self.policy.counters()
    }

    /// Overwrite the underrun total
    pub fn set_underrun_count(&self, value: u32) {
        self.policy.set_underrun_count(value);
    }

    // =========================================================================
    // REPLAY
    // =========================================================================

    /// Walk the most recent `max_entries` records
    pub fn replay(&self, max_entries: usize) -> Replay<'_> {
        match self.ring.as_ref() {
            Some(ring) => Replay::new(ring, max_entries),
            None => Replay::empty(),
        }
    }

    /// Render the most recent `max_entries` records
    ///
    /// A disabled log renders nothing.
    pub fn render(&self, max_entries: usize, out: &mut dyn fmt::Write) -> fmt::Result {
        self.render_with(max_entries, None, out)
    }

    /// Render with pixel format names resolved by `formats`
    pub fn render_with(
        &self,
        max_entries: usize,
        formats: Option<&dyn FormatLookup>,
        out: &mut dyn fmt::Write,
    ) -> fmt::Result {
        if !self.is_enabled() {
            return Ok(());
        }
        replay::render(self.replay(max_entries), formats, out)
    }

    /// Render into a string
    pub fn report(&self, max_entries: usize) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail
        let _ = self.render(max_entries, &mut out);
        out
    }

    /// Print the power state and the last `print_max` records to the log
    pub fn dump(&self, power_active: bool) {
        log::info!(
            "decon{}: DPU power {} state",
            self.id,
            if power_active { "on" } else { "off" }
        );

        let mut writer = LogWriter::<LINE_MAX>::new(log::Level::Info);
        let _ = self.render(self.config.print_max, &mut writer);
    }

    /// Release the storage
    ///
    /// Producers and readers of this instance must have stopped. Counters
    /// are kept; later record calls are no-ops.
    pub fn teardown(&mut self) {
        if self.ring.take().is_some() {
            log::info!("decon{}: event log released", self.id);
        }
    }
}
