//! # Event Records
//!
//! One [`EventRecord`] per logged occurrence. The payload is a sum type
//! selected by the event type; [`Payload::capture`] is the single place
//! that maps an event type onto the payload it carries.

use core::panic::Location;

use arrayvec::ArrayVec;

use crate::event::EventType;
use crate::policy::Counters;
use crate::snapshot::{CommitSnapshot, Compression};
use crate::source::EventSource;
use crate::CALLSTACK_MAX;

// =============================================================================
// PAYLOAD COMPONENTS
// =============================================================================

/// Devfreq domain frequencies at the time of the event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Freqs {
    /// Memory interface frequency
    pub mif: u64,
    /// Internal bus frequency
    pub int: u64,
    /// Display domain frequency
    pub disp: u64,
}

/// DPP channel identity and recovery state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DppInfo {
    /// DPP channel id
    pub id: u32,
    /// Compression source of the channel
    pub comp_src: Compression,
    /// DMA recoveries performed so far
    pub recovery_cnt: u32,
}

/// Channel and window occupancy of one DECON
///
/// Bit `n` of a mask is set when channel (or window) `n` is in use by the
/// pipeline. Decoding the hardware registers into these masks is done by
/// the producer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RscOccupancy {
    /// DPP channels in use
    pub ch_mask: u32,
    /// Windows in use
    pub win_mask: u32,
}

impl RscOccupancy {
    /// Check if channel is in use
    #[inline]
    pub fn uses_ch(&self, ch: usize) -> bool {
        ch < 32 && self.ch_mask & (1 << ch) != 0
    }

    /// Check if window is in use
    #[inline]
    pub fn uses_win(&self, win: usize) -> bool {
        win < 32 && self.win_mask & (1 << win) != 0
    }
}

/// Plane to window binding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlaneInfo {
    /// DPP channel (plane) index
    pub plane_idx: u32,
    /// Window index
    pub win_idx: u32,
}

bitflags::bitflags! {
    /// CRTC state flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct CrtcFlags: u8 {
        /// CRTC enabled
        const ENABLE = 1 << 0;
        /// CRTC active
        const ACTIVE = 1 << 1;
        /// Planes changed in this update
        const PLANES_CHANGED = 1 << 2;
        /// Mode changed in this update
        const MODE_CHANGED = 1 << 3;
        /// Active state changed in this update
        const ACTIVE_CHANGED = 1 << 4;
    }
}

/// Frequencies together with one bandwidth related value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BtsEvent {
    /// Frequencies at the time of the event
    pub freqs: Freqs,
    /// Calculated display frequency or running underrun count
    pub value: u32,
}

/// Call-site trace of a command transaction
pub type CallTrace = ArrayVec<usize, CALLSTACK_MAX>;

/// DSIM command transaction
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DsimCommand {
    /// Command id
    pub id: u8,
    /// First payload byte
    pub d0: u8,
    /// Payload length
    pub len: u16,
    /// Caller return addresses, innermost first
    pub callers: CallTrace,
    /// Source location of the logging call
    pub site: Option<&'static Location<'static>>,
}

impl DsimCommand {
    /// Create a command record without a call-site trace
    pub fn new(id: u8, d0: u8, len: u16) -> Self {
        Self {
            id,
            d0,
            len,
            callers: CallTrace::new(),
            site: None,
        }
    }

    /// Attach caller addresses (anything past `CALLSTACK_MAX` is dropped)
    pub fn with_callers(mut self, callers: &[usize]) -> Self {
        self.callers = callers.iter().copied().take(CALLSTACK_MAX).collect();
        self
    }
}

// =============================================================================
// PAYLOAD
// =============================================================================

/// Event payload
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Payload {
    /// No payload
    #[default]
    None,
    /// DPP frame done
    Dpp {
        /// DPP channel id
        id: u32,
    },
    /// DMA recovery
    DmaRecovery(DppInfo),
    /// Resource occupancy sample
    Rsc(RscOccupancy),
    /// Hibernation transition
    Power {
        /// Runtime PM state of the pipeline
        active: bool,
    },
    /// Plane update or disable
    Plane(PlaneInfo),
    /// CRTC state
    Crtc(CrtcFlags),
    /// Bandwidth release or update
    Freqs(Freqs),
    /// Bandwidth calculation
    CalcBw(BtsEvent),
    /// Underrun with the running underrun count
    Underrun(BtsEvent),
    /// Running CRC error count
    Crc(u32),
    /// Running ECC error count
    Ecc(u32),
    /// Command transaction
    Command(DsimCommand),
    /// Commit snapshot
    Commit(CommitSnapshot),
}

impl Payload {
    /// Build the payload for an event from its source
    ///
    /// `counts` are the error counters after this occurrence was counted.
    pub fn capture(ty: EventType, source: &dyn EventSource, counts: &Counters) -> Self {
        match ty {
            EventType::DppFrameDone => source
                .dpp()
                .map_or(Self::None, |dpp| Self::Dpp { id: dpp.id }),
            EventType::DmaRecovery => source.dpp().map_or(Self::None, Self::DmaRecovery),
            EventType::DeconRscOccupancy => source.rsc_occupancy().map_or(Self::None, Self::Rsc),
            EventType::EnterHibernationIn
            | EventType::EnterHibernationOut
            | EventType::ExitHibernationIn
            | EventType::ExitHibernationOut => source
                .power_active()
                .map_or(Self::None, |active| Self::Power { active }),
            EventType::PlaneUpdate | EventType::PlaneDisable => {
                source.plane().map_or(Self::None, Self::Plane)
            },
            EventType::ReqCrtcInfoOld | EventType::ReqCrtcInfoNew => {
                source.crtc_state().map_or(Self::None, Self::Crtc)
            },
            EventType::BtsReleaseBw | EventType::BtsUpdateBw => {
                Self::Freqs(source.freqs().unwrap_or_default())
            },
            EventType::BtsCalcBw => Self::CalcBw(BtsEvent {
                freqs: source.freqs().unwrap_or_default(),
                value: source.max_disp_freq().unwrap_or(0),
            }),
            EventType::DsimUnderrun => Self::Underrun(BtsEvent {
                freqs: source.freqs().unwrap_or_default(),
                value: counts.underrun,
            }),
            EventType::DsimCrc => Self::Crc(counts.crc),
            EventType::DsimEcc => Self::Ecc(counts.ecc),
            EventType::DsimCommand => source.command().map_or(Self::None, Self::Command),
            EventType::AtomicCommit => source
                .commit()
                .map_or(Self::None, |table| Self::Commit(CommitSnapshot::capture(table))),
            EventType::DeconEnabled
            | EventType::DeconDisabled
            | EventType::DeconFrameDone
            | EventType::DeconFrameStart
            | EventType::DeconTrigMask
            | EventType::DsimEnabled
            | EventType::DsimDisabled
            | EventType::DsimFrameDone
            | EventType::TeInterrupt
            | EventType::AtomicBegin
            | EventType::AtomicFlush
            | EventType::WbEnable
            | EventType::WbDisable
            | EventType::WbAtomicCommit
            | EventType::WbFrameDone
            | EventType::WbEnterHibernation
            | EventType::WbExitHibernation
            | EventType::FramestartTimeout
            | EventType::VblankEnable
            | EventType::VblankDisable
            | EventType::DimmingStart
            | EventType::DimmingEnd => Self::None,
        }
    }
}

// =============================================================================
// EVENT RECORD
// =============================================================================

/// One logged occurrence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    /// Claim sequence number
    pub seq: u64,
    /// Monotonic timestamp in nanoseconds
    pub timestamp: u64,
    /// Event type
    pub ty: EventType,
    /// Type specific payload
    pub payload: Payload,
}

impl EventRecord {
    /// Timestamp split into seconds and microseconds
    pub fn time_parts(&self) -> (u64, u64) {
        (self.timestamp / 1_000_000_000, (self.timestamp % 1_000_000_000) / 1_000)
    }
}
