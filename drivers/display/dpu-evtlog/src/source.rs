//! # Event Sources
//!
//! Collaborator traits implemented by the pipeline code that produces
//! events. The log only knows how to store and decode values; sources
//! resolve them from driver state (device structs, devfreq, registers).

use crate::payload::{CrtcFlags, DppInfo, DsimCommand, Freqs, PlaneInfo, RscOccupancy};
use crate::snapshot::WinConfig;

// =============================================================================
// CLOCK
// =============================================================================

/// Monotonic time source
pub trait Clock {
    /// Current monotonic time in nanoseconds
    fn now_ns(&self) -> u64;
}

impl<F: Fn() -> u64> Clock for F {
    fn now_ns(&self) -> u64 {
        self()
    }
}

// =============================================================================
// EVENT SOURCE
// =============================================================================

/// Producer-side context of a [`record`](crate::EventLog::record) call
///
/// Every accessor defaults to `None`; a source only implements what its
/// event types need. Missing values degrade to an empty or zeroed payload,
/// never to a dropped record.
pub trait EventSource {
    /// DPP channel identity (DPP frame done, DMA recovery)
    fn dpp(&self) -> Option<DppInfo> {
        None
    }

    /// Decoded resource occupancy masks
    fn rsc_occupancy(&self) -> Option<RscOccupancy> {
        None
    }

    /// Runtime PM state (hibernation transitions)
    fn power_active(&self) -> Option<bool> {
        None
    }

    /// Plane to window binding (plane update/disable)
    fn plane(&self) -> Option<PlaneInfo> {
        None
    }

    /// CRTC state flags
    fn crtc_state(&self) -> Option<CrtcFlags> {
        None
    }

    /// Devfreq domain frequencies
    fn freqs(&self) -> Option<Freqs> {
        None
    }

    /// Calculated maximum display frequency
    fn max_disp_freq(&self) -> Option<u32> {
        None
    }

    /// Live window table (atomic commit)
    fn commit(&self) -> Option<&dyn CommitSource> {
        None
    }

    /// Command transaction
    fn command(&self) -> Option<DsimCommand> {
        None
    }
}

/// Source carrying no context
impl EventSource for () {}

// =============================================================================
// COMMIT SOURCE
// =============================================================================

/// Live window configuration read by commit snapshots
pub trait CommitSource {
    /// Configuration of window `index`, `None` past the last window
    fn window(&self, index: usize) -> Option<WinConfig>;

    /// DMA address of the buffer currently bound to a DPP channel
    fn dma_addr(&self, dpp_ch: u32) -> Option<u64>;
}

impl<const N: usize> CommitSource for [WinConfig; N] {
    fn window(&self, index: usize) -> Option<WinConfig> {
        self.get(index).copied()
    }

    fn dma_addr(&self, _dpp_ch: u32) -> Option<u64> {
        None
    }
}

/// Adapter presenting a commit table as an event source
pub(crate) struct CommitContext<'a>(pub &'a dyn CommitSource);

impl EventSource for CommitContext<'_> {
    fn commit(&self) -> Option<&dyn CommitSource> {
        Some(self.0)
    }
}

/// Adapter presenting a command transaction as an event source
pub(crate) struct CommandContext(pub DsimCommand);

impl EventSource for CommandContext {
    fn command(&self) -> Option<DsimCommand> {
        Some(self.0.clone())
    }
}
