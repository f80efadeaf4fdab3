//! # Replay and Formatting
//!
//! Walks the ring buffer from the oldest requested entry to the most
//! recent one and renders the history as text.
//!
//! A [`Replay`] snapshots the claim counter when it is created and then
//! reads slots one at a time, so every replay is independent and never
//! mutates the buffer. Writers may race ahead of a replay; slots whose
//! content does not belong to the expected claim are reported as
//! [`ReplayEntry::InFlight`] or [`ReplayEntry::Overwritten`] instead of
//! being decoded.
//!
//! Rendering writes straight into a [`core::fmt::Write`] sink and never
//! allocates.

use core::fmt::{self, Write};
use core::iter::FusedIterator;

use crate::event::event_name;
use crate::payload::{EventRecord, Payload, RscOccupancy};
use crate::ring::{RingBuffer, SlotRead};
use crate::snapshot::{CommitSnapshot, WinState};
use crate::MAX_PLANE;

/// Horizontal rule framing a report
pub const RULE: &str = "----------------------------------------------------";

// =============================================================================
// FORMAT LOOKUP
// =============================================================================

/// Pixel format name lookup supplied by the display driver
pub trait FormatLookup {
    /// Name of a pixel format identifier
    fn format_name(&self, format: u32) -> Option<&str>;
}

impl<F: Fn(u32) -> Option<&'static str>> FormatLookup for F {
    fn format_name(&self, format: u32) -> Option<&str> {
        self(format)
    }
}

// =============================================================================
// REPLAY
// =============================================================================

/// One visited slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplayEntry {
    /// Decoded record
    Event(EventRecord),
    /// Slot claimed but not yet published, or its record was dropped
    InFlight {
        /// Expected claim sequence number
        seq: u64,
    },
    /// Slot already reused by a newer claim
    Overwritten {
        /// Expected claim sequence number
        seq: u64,
    },
}

impl ReplayEntry {
    /// Get the record if the slot was decoded
    pub fn record(&self) -> Option<&EventRecord> {
        match self {
            Self::Event(record) => Some(record),
            _ => None,
        }
    }
}

/// Lazy oldest-to-newest walk over a ring buffer
#[derive(Debug, Clone)]
pub struct Replay<'a> {
    ring: Option<&'a RingBuffer>,
    next: u64,
    end: u64,
}

impl<'a> Replay<'a> {
    /// Replay at most `max_entries` of the most recent records
    ///
    /// `max_entries` is clamped to the ring capacity.
    pub fn new(ring: &'a RingBuffer, max_entries: usize) -> Self {
        let claimed = ring.claimed();
        let visits = (max_entries.min(ring.capacity()) as u64).min(claimed);
        Self {
            ring: Some(ring),
            next: claimed - visits,
            end: claimed,
        }
    }

    /// Replay of a log without storage
    pub fn empty() -> Self {
        Self {
            ring: None,
            next: 0,
            end: 0,
        }
    }
}

impl Iterator for Replay<'_> {
    type Item = ReplayEntry;

    fn next(&mut self) -> Option<ReplayEntry> {
        let ring = self.ring?;
        if self.next >= self.end {
            return None;
        }

        let seq = self.next;
        self.next += 1;

        let index = (seq % ring.capacity() as u64) as usize;
        let entry = match ring.read(index) {
            SlotRead::Record(record) if record.seq == seq => ReplayEntry::Event(record),
            SlotRead::Record(record) if record.seq > seq => ReplayEntry::Overwritten { seq },
            SlotRead::Record(_) | SlotRead::Busy | SlotRead::Empty => {
                ReplayEntry::InFlight { seq }
            },
        };
        Some(entry)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = match self.ring {
            Some(_) => (self.end - self.next) as usize,
            None => 0,
        };
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Replay<'_> {}

impl FusedIterator for Replay<'_> {}

// =============================================================================
// FORMATTING
// =============================================================================

/// Text rendering of one replay entry, one or more `\n` terminated lines
#[derive(Clone, Copy)]
pub struct EntryDisplay<'a> {
    entry: &'a ReplayEntry,
    formats: Option<&'a dyn FormatLookup>,
}

impl fmt::Debug for EntryDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryDisplay").field("entry", self.entry).finish()
    }
}

impl<'a> EntryDisplay<'a> {
    /// Display an entry
    pub fn new(entry: &'a ReplayEntry, formats: Option<&'a dyn FormatLookup>) -> Self {
        Self { entry, formats }
    }
}

impl fmt::Display for EntryDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.entry {
            ReplayEntry::Event(record) => write_record(f, record, self.formats),
            ReplayEntry::InFlight { seq } => {
                writeln!(f, "[{:>13}] {:>20}\tseq({})", "-", "IN_FLIGHT", seq)
            },
            ReplayEntry::Overwritten { seq } => {
                writeln!(f, "[{:>13}] {:>20}\tseq({})", "-", "OVERWRITTEN", seq)
            },
        }
    }
}

/// Event name, or a placeholder for tags the registry does not know
struct TagName(u16);

impl fmt::Display for TagName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match event_name(self.0) {
            Some(name) => f.pad(name),
            None => {
                let mut name = heapless::String::<24>::new();
                write!(name, "UNKNOWN({:#x})", self.0)?;
                f.pad(&name)
            },
        }
    }
}

fn write_record(
    f: &mut dyn Write,
    record: &EventRecord,
    formats: Option<&dyn FormatLookup>,
) -> fmt::Result {
    let (secs, usecs) = record.time_parts();
    write!(f, "[{:6}.{:06}] {:>20}", secs, usecs, TagName(record.ty.raw()))?;
    write_remarks(f, &record.payload)?;
    f.write_char('\n')?;

    if let Payload::Commit(snapshot) = &record.payload {
        write_commit(f, snapshot, formats)?;
    }
    Ok(())
}

fn write_remarks(f: &mut dyn Write, payload: &Payload) -> fmt::Result {
    match payload {
        Payload::None | Payload::Commit(_) => Ok(()),
        Payload::Dpp { id } => write!(f, "\tID:{}", id),
        Payload::DmaRecovery(dpp) => write!(
            f,
            "\tID:{} SRC:{} COUNT:{}",
            dpp.id,
            dpp.comp_src.name(),
            dpp.recovery_cnt
        ),
        Payload::Rsc(rsc) => write_rsc(f, rsc),
        Payload::Power { active } => {
            write!(f, "\tDPU POWER {}", if *active { "ON" } else { "OFF" })
        },
        Payload::Plane(plane) => write!(f, "\tCH:{}, WIN:{}", plane.plane_idx, plane.win_idx),
        Payload::Crtc(flags) => {
            use crate::payload::CrtcFlags;
            write!(
                f,
                "\tenable({}) active({}) [p:{} m:{} a:{}]",
                u8::from(flags.contains(CrtcFlags::ENABLE)),
                u8::from(flags.contains(CrtcFlags::ACTIVE)),
                u8::from(flags.contains(CrtcFlags::PLANES_CHANGED)),
                u8::from(flags.contains(CrtcFlags::MODE_CHANGED)),
                u8::from(flags.contains(CrtcFlags::ACTIVE_CHANGED)),
            )
        },
        Payload::Freqs(freqs) => write!(
            f,
            "\tmif({}) int({}) disp({})",
            freqs.mif, freqs.int, freqs.disp
        ),
        Payload::CalcBw(bts) => write!(f, "\tcalculated disp({})", bts.value),
        Payload::Underrun(bts) => write!(
            f,
            "\tunderrun count({})\tmif({}) int({}) disp({})",
            bts.value, bts.freqs.mif, bts.freqs.int, bts.freqs.disp
        ),
        Payload::Crc(count) => write!(f, "\tcrc count({})", count),
        Payload::Ecc(count) => write!(f, "\tecc count({})", count),
        Payload::Command(cmd) => {
            write!(
                f,
                "\tCMD_ID: {:#x}\tDATA[0]: {:#x} len: {}",
                cmd.id, cmd.d0, cmd.len
            )?;
            if !cmd.callers.is_empty() {
                f.write_str("\tCALLER:")?;
                for addr in &cmd.callers {
                    write!(f, " {:#x}", addr)?;
                }
            }
            if let Some(site) = cmd.site {
                write!(f, " ({}:{})", site.file(), site.line())?;
            }
            Ok(())
        },
    }
}

fn write_rsc(f: &mut dyn Write, rsc: &RscOccupancy) -> fmt::Result {
    let mark = |used: bool| if used { 'O' } else { 'X' };

    f.write_str("\tCHs: ")?;
    for ch in 0..MAX_PLANE {
        write!(f, "{}[{}] ", ch, mark(rsc.uses_ch(ch)))?;
    }
    f.write_str("\tWINs: ")?;
    for win in 0..MAX_PLANE {
        write!(f, "{}[{}] ", win, mark(rsc.uses_win(win)))?;
    }
    Ok(())
}

fn write_commit(
    f: &mut dyn Write,
    snapshot: &CommitSnapshot,
    formats: Option<&dyn FormatLookup>,
) -> fmt::Result {
    for (index, slot) in snapshot.active() {
        let win = &slot.win;
        write!(
            f,
            "\t\t\t\t\tWIN{}: {}[{:#x}] SRC{} DST{} ",
            index,
            win.state.name(),
            slot.dma_addr.unwrap_or(0),
            win.src,
            win.dst
        )?;
        if win.state == WinState::Buffer {
            write!(f, "CH{} ", win.dpp_ch)?;
        }
        match formats.and_then(|lookup| lookup.format_name(win.format)) {
            Some(name) => f.write_str(name)?,
            None => write!(f, "FMT({:#x})", win.format)?,
        }
        writeln!(f, " {}", win.comp_src.name())?;
    }
    Ok(())
}

/// Render a replay as a framed report
pub fn render(
    replay: Replay<'_>,
    formats: Option<&dyn FormatLookup>,
    out: &mut dyn Write,
) -> fmt::Result {
    writeln!(out, "{}", RULE)?;
    writeln!(out, "{:>14}  {:>20}  {:>20}", "Time", "Event ID", "Remarks")?;
    writeln!(out, "{}", RULE)?;

    for entry in replay {
        write!(out, "{}", EntryDisplay::new(&entry, formats))?;
    }

    writeln!(out, "{}", RULE)
}
