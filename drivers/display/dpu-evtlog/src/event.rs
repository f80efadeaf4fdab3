//! # Event Type Registry
//!
//! The closed set of loggable display pipeline events, their stable raw
//! tags and display names, and [`EventMask`] sets used by the coalescing
//! policy.
//!
//! Raw tags start at 1; tag 0 is reserved for "no event" and is never
//! produced by the registry.

// =============================================================================
// EVENT TYPE
// =============================================================================

/// Display pipeline event kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum EventType {
    /// DECON enabled
    DeconEnabled        = 1,
    /// DECON disabled
    DeconDisabled       = 2,
    /// DECON frame done
    DeconFrameDone      = 3,
    /// DECON frame start
    DeconFrameStart     = 4,
    /// DECON channel/window resource occupancy sample
    DeconRscOccupancy   = 5,
    /// DECON trigger mask
    DeconTrigMask       = 6,
    /// DSIM enabled
    DsimEnabled         = 7,
    /// DSIM disabled
    DsimDisabled        = 8,
    /// DSIM command transaction
    DsimCommand         = 9,
    /// DSIM underrun
    DsimUnderrun        = 10,
    /// DSIM frame done
    DsimFrameDone       = 11,
    /// DPP frame done
    DppFrameDone        = 12,
    /// DMA recovery
    DmaRecovery         = 13,
    /// Full pipeline commit (window table snapshot)
    AtomicCommit        = 14,
    /// Tearing effect interrupt
    TeInterrupt         = 15,
    /// Hibernation entry started
    EnterHibernationIn  = 16,
    /// Hibernation entry finished
    EnterHibernationOut = 17,
    /// Hibernation exit started
    ExitHibernationIn   = 18,
    /// Hibernation exit finished
    ExitHibernationOut  = 19,
    /// Atomic update begin
    AtomicBegin         = 20,
    /// Atomic update flush
    AtomicFlush         = 21,
    /// Writeback enabled
    WbEnable            = 22,
    /// Writeback disabled
    WbDisable           = 23,
    /// Writeback commit
    WbAtomicCommit      = 24,
    /// Writeback frame done
    WbFrameDone         = 25,
    /// Writeback hibernation entry
    WbEnterHibernation  = 26,
    /// Writeback hibernation exit
    WbExitHibernation   = 27,
    /// Plane update
    PlaneUpdate         = 28,
    /// Plane disable
    PlaneDisable        = 29,
    /// CRTC state before a commit
    ReqCrtcInfoOld      = 30,
    /// CRTC state after a commit
    ReqCrtcInfoNew      = 31,
    /// Frame start timed out
    FramestartTimeout   = 32,
    /// Bandwidth released
    BtsReleaseBw        = 33,
    /// Bandwidth calculated
    BtsCalcBw           = 34,
    /// Bandwidth updated
    BtsUpdateBw         = 35,
    /// DSIM CRC error
    DsimCrc             = 36,
    /// DSIM ECC error
    DsimEcc             = 37,
    /// Vblank interrupt enabled
    VblankEnable        = 38,
    /// Vblank interrupt disabled
    VblankDisable       = 39,
    /// Panel dimming started
    DimmingStart        = 40,
    /// Panel dimming finished
    DimmingEnd          = 41,
}

/// Number of raw tags including the reserved tag 0
pub const EVENT_TAG_COUNT: usize = 42;

// Every tag must have a bit in EventMask
static_assertions::const_assert!(EVENT_TAG_COUNT <= 64);

/// Display names indexed by raw tag
static EVENT_NAMES: [&str; EVENT_TAG_COUNT] = [
    "NONE",
    "DECON_ENABLED",
    "DECON_DISABLED",
    "DECON_FRAMEDONE",
    "DECON_FRAMESTART",
    "DECON_RSC_OCCUPANCY",
    "DECON_TRIG_MASK",
    "DSIM_ENABLED",
    "DSIM_DISABLED",
    "DSIM_COMMAND",
    "DSIM_UNDERRUN",
    "DSIM_FRAMEDONE",
    "DPP_FRAMEDONE",
    "DMA_RECOVERY",
    "ATOMIC_COMMIT",
    "TE_INTERRUPT",
    "ENTER_HIBERNATION_IN",
    "ENTER_HIBERNATION_OUT",
    "EXIT_HIBERNATION_IN",
    "EXIT_HIBERNATION_OUT",
    "ATOMIC_BEGIN",
    "ATOMIC_FLUSH",
    "WB_ENABLE",
    "WB_DISABLE",
    "WB_ATOMIC_COMMIT",
    "WB_FRAMEDONE",
    "WB_ENTER_HIBERNATION",
    "WB_EXIT_HIBERNATION",
    "PLANE_UPDATE",
    "PLANE_DISABLE",
    "REQ_CRTC_INFO_OLD",
    "REQ_CRTC_INFO_NEW",
    "FRAMESTART_TIMEOUT",
    "BTS_RELEASE_BW",
    "BTS_CALC_BW",
    "BTS_UPDATE_BW",
    "DSIM_CRC",
    "DSIM_ECC",
    "VBLANK_ENABLE",
    "VBLANK_DISABLE",
    "DIMMING_START",
    "DIMMING_END",
];

/// All event types in tag order
const ALL_EVENTS: [EventType; EVENT_TAG_COUNT - 1] = [
    EventType::DeconEnabled,
    EventType::DeconDisabled,
    EventType::DeconFrameDone,
    EventType::DeconFrameStart,
    EventType::DeconRscOccupancy,
    EventType::DeconTrigMask,
    EventType::DsimEnabled,
    EventType::DsimDisabled,
    EventType::DsimCommand,
    EventType::DsimUnderrun,
    EventType::DsimFrameDone,
    EventType::DppFrameDone,
    EventType::DmaRecovery,
    EventType::AtomicCommit,
    EventType::TeInterrupt,
    EventType::EnterHibernationIn,
    EventType::EnterHibernationOut,
    EventType::ExitHibernationIn,
    EventType::ExitHibernationOut,
    EventType::AtomicBegin,
    EventType::AtomicFlush,
    EventType::WbEnable,
    EventType::WbDisable,
    EventType::WbAtomicCommit,
    EventType::WbFrameDone,
    EventType::WbEnterHibernation,
    EventType::WbExitHibernation,
    EventType::PlaneUpdate,
    EventType::PlaneDisable,
    EventType::ReqCrtcInfoOld,
    EventType::ReqCrtcInfoNew,
    EventType::FramestartTimeout,
    EventType::BtsReleaseBw,
    EventType::BtsCalcBw,
    EventType::BtsUpdateBw,
    EventType::DsimCrc,
    EventType::DsimEcc,
    EventType::VblankEnable,
    EventType::VblankDisable,
    EventType::DimmingStart,
    EventType::DimmingEnd,
];

impl EventType {
    /// Look up an event type by raw tag
    ///
    /// Returns `None` for tag 0 and for tags past the end of the registry.
    #[inline]
    pub fn from_raw(tag: u16) -> Option<Self> {
        let index = usize::from(tag).checked_sub(1)?;
        ALL_EVENTS.get(index).copied()
    }

    /// Get raw tag
    #[inline(always)]
    pub fn raw(self) -> u16 {
        self as u16
    }

    /// Get display name
    #[inline]
    pub fn name(self) -> &'static str {
        EVENT_NAMES[self as usize]
    }

    /// Iterate over every registered event type
    pub fn iter() -> impl Iterator<Item = EventType> {
        ALL_EVENTS.iter().copied()
    }
}

/// Look up the display name of a raw tag
///
/// Guards replay against garbage tags: anything the registry does not know
/// yields `None` and is rendered as a placeholder by the formatter.
pub fn event_name(tag: u16) -> Option<&'static str> {
    EventType::from_raw(tag).map(EventType::name)
}

// =============================================================================
// EVENT MASK
// =============================================================================

bitflags::bitflags! {
    /// A set of event types, one bit per raw tag
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct EventMask: u64 {
        /// DECON frame done
        const DECON_FRAMEDONE = 1 << 3;
        /// DECON frame start
        const DECON_FRAMESTART = 1 << 4;
        /// DSIM underrun
        const DSIM_UNDERRUN = 1 << 10;
        /// DSIM frame done
        const DSIM_FRAMEDONE = 1 << 11;
        /// DPP frame done
        const DPP_FRAMEDONE = 1 << 12;
        /// Atomic commit
        const ATOMIC_COMMIT = 1 << 14;
        /// TE interrupt
        const TE_INTERRUPT = 1 << 15;
        /// DSIM CRC error
        const DSIM_CRC = 1 << 36;
        /// DSIM ECC error
        const DSIM_ECC = 1 << 37;

        /// Frame start and every frame done variant
        const FRAME_EVENTS = Self::DECON_FRAMESTART.bits()
            | Self::DECON_FRAMEDONE.bits()
            | Self::DPP_FRAMEDONE.bits()
            | Self::DSIM_FRAMEDONE.bits();
        /// Per-frame events plus the TE interrupt
        const PERIODIC = Self::FRAME_EVENTS.bits() | Self::TE_INTERRUPT.bits();
        /// Error events carrying running counters
        const ERRORS = Self::DSIM_UNDERRUN.bits() | Self::DSIM_CRC.bits() | Self::DSIM_ECC.bits();
    }
}

impl EventMask {
    /// Mask holding a single event type
    #[inline]
    pub const fn of(ty: EventType) -> Self {
        Self::from_bits_retain(1 << (ty as u16))
    }

    /// Check membership of an event type
    #[inline]
    pub fn has(self, ty: EventType) -> bool {
        self.intersects(Self::of(ty))
    }
}

impl From<EventType> for EventMask {
    fn from(ty: EventType) -> Self {
        Self::of(ty)
    }
}
