//! # DPU Event Log
//!
//! Diagnostic event trace for a display processing pipeline.
//!
//! Every DECON instance owns a fixed-capacity ring of event records. The
//! display driver records occurrences (frame start/done, underruns,
//! bandwidth requests, commits, ...) from interrupt and worker context;
//! the history is replayed on demand or dumped when a bus fault hits the
//! display block.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                        DECON instance N                           │
//! │                                                                   │
//! │  record(ty, source)                                               │
//! │        │                                                          │
//! │  ┌─────▼────────┐   ┌──────────────┐   ┌──────────────────────┐   │
//! │  │  Coalescing  │──▶│  Claim lock  │──▶│  Payload capture     │   │
//! │  │  Policy      │   │  (seq, last  │   │  (snapshot, command, │   │
//! │  │  (counters)  │   │   16 types)  │   │   freqs, ...)        │   │
//! │  └──────────────┘   └──────────────┘   └──────────┬───────────┘   │
//! │                                                   │               │
//! │                     ┌─────────────────────────────▼───────────┐   │
//! │                     │  Ring buffer  [slot 0 .. capacity-1]    │   │
//! │                     └─────────────────────────────┬───────────┘   │
//! │                                                   │               │
//! │                     ┌─────────────────────────────▼───────────┐   │
//! │                     │  Replay / Formatter ──▶ fmt::Write, log │   │
//! │                     └─────────────────────────────────────────┘   │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let log = EventLog::new(0, EventLogConfig::default(), clock)?;
//! log.record(EventType::DeconFrameStart, &());
//! log.capture_commit_snapshot(&windows);
//! log.render(32, &mut out)?;
//! ```

#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]
#![warn(clippy::all)]

extern crate alloc;

#[cfg(test)]
extern crate std;

pub mod config;
pub mod error;
pub mod event;
pub mod evtlog;
pub mod fault;
pub mod instances;
pub mod payload;
pub mod policy;
pub mod replay;
pub mod ring;
pub mod snapshot;
pub mod source;
pub mod writer;

/// Window slots per DECON
pub const MAX_WIN_PER_DECON: usize = 6;

/// DPP channels (planes) per DECON
pub const MAX_PLANE: usize = 6;

/// Depth of the call-site trace of command records
pub const CALLSTACK_MAX: usize = 4;

// Re-exports
pub use config::{EventLogConfig, StreakPolicy};
pub use error::{Error, Result};
pub use event::{event_name, EventMask, EventType};
pub use evtlog::{EventLog, Outcome};
pub use fault::{BusFault, FaultMonitor, NotifyAction};
pub use instances::DisplayTrace;
pub use payload::{DsimCommand, EventRecord, Payload};
pub use policy::{CoalescingPolicy, Counters, Suppression};
pub use replay::{FormatLookup, Replay, ReplayEntry};
pub use ring::{Claim, HeapAllocator, History, RingBuffer, SlotAllocator};
pub use snapshot::{CommitSnapshot, Rect, WinConfig, WinState};
pub use source::{Clock, CommitSource, EventSource};
pub use writer::LogWriter;
