//! # Event Ring Buffer
//!
//! Fixed-capacity slot array plus the slot allocation protocol.
//!
//! ## Claiming
//!
//! A claim hands out the next value of a monotonic sequence counter; the
//! slot index is `seq % capacity`. The counter lives inside a short spin
//! lock together with the types of the most recent claims, so the
//! coalescing decision and the claim it guards are one critical section.
//!
//! ## Publishing
//!
//! Record construction happens after the claim lock is released. The
//! finished record is moved into its slot under a per-slot lock, and
//! neither side ever waits for it: a writer that finds the slot held by a
//! reader (or by another writer a full lap away) drops its record and
//! counts the drop. A record is never stored over one with a newer
//! sequence number. Readers report a held slot, or a slot still holding
//! the record of an older lap, as in flight. Both replay and publication
//! are therefore best effort.

use alloc::vec::Vec;
use core::sync::atomic::{AtomicU64, Ordering};

use spin::Mutex;

use crate::config::MAX_COALESCE_WINDOW;
use crate::error::{Error, Result};
use crate::event::EventType;
use crate::payload::EventRecord;

/// One ring buffer slot, `None` until first written
pub type Slot = Mutex<Option<EventRecord>>;

// =============================================================================
// SLOT ALLOCATION
// =============================================================================

/// Backing storage provider for ring buffers
pub trait SlotAllocator {
    /// Allocate `slots` empty slots
    fn allocate(&mut self, slots: usize) -> Result<Vec<Slot>>;
}

/// Allocates slots from the global heap without aborting on exhaustion
#[derive(Debug, Clone, Copy, Default)]
pub struct HeapAllocator;

impl SlotAllocator for HeapAllocator {
    fn allocate(&mut self, slots: usize) -> Result<Vec<Slot>> {
        let mut storage = Vec::new();
        storage
            .try_reserve_exact(slots)
            .map_err(|_| Error::AllocationFailed { slots })?;
        storage.extend((0..slots).map(|_| Mutex::new(None)));
        Ok(storage)
    }
}

// =============================================================================
// CLAIM STATE
// =============================================================================

/// A claimed slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Claim {
    /// Sequence number of the claim
    pub seq: u64,
    /// Slot index
    pub index: usize,
}

/// Types of the most recent claims, visible to the coalescing decision
#[derive(Debug)]
pub struct History {
    /// Claims handed out so far
    claimed: u64,
    /// Type of claim `seq`, stored at `seq % MAX_COALESCE_WINDOW`
    recent: [Option<EventType>; MAX_COALESCE_WINDOW],
}

impl History {
    const fn new() -> Self {
        Self {
            claimed: 0,
            recent: [None; MAX_COALESCE_WINDOW],
        }
    }

    /// Claims handed out so far
    #[inline]
    pub fn claimed(&self) -> u64 {
        self.claimed
    }

    /// Type of the claim `back` steps before the next one (1 = most recent)
    pub fn nth_back(&self, back: usize) -> Option<EventType> {
        if back == 0 || back > MAX_COALESCE_WINDOW {
            return None;
        }
        let seq = self.claimed.checked_sub(back as u64)?;
        self.recent[(seq % MAX_COALESCE_WINDOW as u64) as usize]
    }

    /// Check whether the last `count` claims were all of type `ty`
    pub fn ends_with_run(&self, ty: EventType, count: usize) -> bool {
        count > 0 && (1..=count).all(|back| self.nth_back(back) == Some(ty))
    }

    fn push(&mut self, ty: EventType) -> u64 {
        let seq = self.claimed;
        self.recent[(seq % MAX_COALESCE_WINDOW as u64) as usize] = Some(ty);
        self.claimed += 1;
        seq
    }
}

// =============================================================================
// RING BUFFER
// =============================================================================

/// Result of a non-blocking slot read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotRead {
    /// Slot never written
    Empty,
    /// A writer holds the slot
    Busy,
    /// Slot content
    Record(EventRecord),
}

/// Fixed-capacity event ring buffer
#[derive(Debug)]
pub struct RingBuffer {
    /// Slot storage
    slots: Vec<Slot>,
    /// Claim counter and recent claim types
    history: Mutex<History>,
    /// Records dropped at publication
    dropped: AtomicU64,
}

impl RingBuffer {
    /// Create a ring buffer over allocated slots
    pub fn new(slots: Vec<Slot>) -> Result<Self> {
        if slots.is_empty() {
            return Err(Error::InvalidConfig);
        }
        Ok(Self {
            slots,
            history: Mutex::new(History::new()),
            dropped: AtomicU64::new(0),
        })
    }

    /// Allocate a ring buffer, halving the slot count after each failure
    pub fn allocate(
        allocator: &mut dyn SlotAllocator,
        capacity: usize,
        attempts: u32,
    ) -> Result<Self> {
        let mut slots = capacity;
        let mut last_err = Error::AllocationFailed { slots };

        for _ in 0..attempts.max(1) {
            if slots == 0 {
                break;
            }
            match allocator.allocate(slots) {
                Ok(storage) => {
                    log::info!("#{} event log buffers are allocated", slots);
                    return Self::new(storage);
                },
                Err(err) => {
                    log::warn!("failed to alloc event log buf[{}]. retry", slots);
                    last_err = err;
                    slots /= 2;
                },
            }
        }

        Err(last_err)
    }

    /// Slot count
    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of claims handed out so far
    pub fn claimed(&self) -> u64 {
        self.history.lock().claimed()
    }

    /// Check if every slot has been claimed at least once
    pub fn has_wrapped(&self) -> bool {
        self.claimed() >= self.capacity() as u64
    }

    /// Claim the next slot unconditionally
    pub fn claim_slot(&self, ty: EventType) -> Claim {
        let mut history = self.history.lock();
        let seq = history.push(ty);
        self.claim_for(seq)
    }

    /// Claim the next slot unless `suppress` rejects it
    ///
    /// `suppress` runs inside the claim lock and sees the claim history as
    /// it is at the moment of the decision.
    pub fn claim_unless(
        &self,
        ty: EventType,
        suppress: impl FnOnce(&History) -> bool,
    ) -> Option<Claim> {
        let mut history = self.history.lock();
        if suppress(&history) {
            return None;
        }
        let seq = history.push(ty);
        Some(self.claim_for(seq))
    }

    #[inline]
    fn claim_for(&self, seq: u64) -> Claim {
        Claim {
            seq,
            index: (seq % self.slots.len() as u64) as usize,
        }
    }

    /// Store a record into its claimed slot without waiting
    ///
    /// Returns `false` when the slot is held by someone else or already
    /// holds a newer claim; the record is dropped and counted.
    pub fn publish(&self, claim: Claim, record: EventRecord) -> bool {
        let stored = match self.slots[claim.index].try_lock() {
            Some(mut slot) if slot.as_ref().map_or(true, |current| current.seq < claim.seq) => {
                *slot = Some(record);
                true
            },
            _ => false,
        };
        if !stored {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        stored
    }

    #[cfg(test)]
    pub(crate) fn slot(&self, index: usize) -> &Slot {
        &self.slots[index]
    }

    /// Records dropped at publication so far
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Read a slot without waiting for a writer
    pub fn read(&self, index: usize) -> SlotRead {
        let Some(slot) = self.slots.get(index) else {
            return SlotRead::Empty;
        };
        match slot.try_lock() {
            Some(guard) => match guard.as_ref() {
                Some(record) => SlotRead::Record(record.clone()),
                None => SlotRead::Empty,
            },
            None => SlotRead::Busy,
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use std::sync::Arc;
    use std::thread;

    use super::*;
    use crate::payload::Payload;

    struct CappedAllocator {
        max: usize,
        attempts: Vec<usize>,
    }

    impl SlotAllocator for CappedAllocator {
        fn allocate(&mut self, slots: usize) -> Result<Vec<Slot>> {
            self.attempts.push(slots);
            if slots > self.max {
                return Err(Error::AllocationFailed { slots });
            }
            HeapAllocator.allocate(slots)
        }
    }

    fn ring(capacity: usize) -> RingBuffer {
        RingBuffer::allocate(&mut HeapAllocator, capacity, 1).unwrap()
    }

    fn record(claim: Claim, ty: EventType) -> EventRecord {
        EventRecord {
            seq: claim.seq,
            timestamp: claim.seq + 1,
            ty,
            payload: Payload::None,
        }
    }

    #[test]
    fn test_claim_indices_wrap() {
        let ring = ring(4);
        let indices: Vec<usize> = (0..6)
            .map(|_| ring.claim_slot(EventType::DeconEnabled).index)
            .collect();
        assert_eq!(indices, [0, 1, 2, 3, 0, 1]);
        assert_eq!(ring.claimed(), 6);
        assert!(ring.has_wrapped());
    }

    #[test]
    fn test_publish_and_read() {
        let ring = ring(2);
        assert_eq!(ring.read(0), SlotRead::Empty);

        let claim = ring.claim_slot(EventType::TeInterrupt);
        ring.publish(claim, record(claim, EventType::TeInterrupt));

        match ring.read(claim.index) {
            SlotRead::Record(r) => assert_eq!(r.ty, EventType::TeInterrupt),
            other => panic!("unexpected read {:?}", other),
        }
        assert_eq!(ring.read(99), SlotRead::Empty);
    }

    #[test]
    fn test_read_busy_slot() {
        let ring = ring(2);
        let guard = ring.slots[0].lock();
        assert_eq!(ring.read(0), SlotRead::Busy);
        drop(guard);
        assert_eq!(ring.read(0), SlotRead::Empty);
    }

    #[test]
    fn test_publish_does_not_wait_for_reader() {
        let ring = ring(2);
        let claim = ring.claim_slot(EventType::DeconEnabled);

        let reader = ring.slots[claim.index].try_lock().unwrap();
        assert!(!ring.publish(claim, record(claim, EventType::DeconEnabled)));
        drop(reader);

        assert_eq!(ring.dropped(), 1);
        assert_eq!(ring.read(claim.index), SlotRead::Empty);
    }

    #[test]
    fn test_publish_from_other_thread_while_read() {
        let ring = Arc::new(ring(1));
        let claim = ring.claim_slot(EventType::DeconEnabled);
        let reader = ring.slots[0].try_lock().unwrap();

        let writer = {
            let ring = Arc::clone(&ring);
            thread::spawn(move || ring.publish(claim, record(claim, EventType::DeconEnabled)))
        };
        assert!(!writer.join().unwrap());
        drop(reader);
    }

    #[test]
    fn test_stale_publish_keeps_newer_record() {
        let ring = ring(1);
        let old = ring.claim_slot(EventType::DeconEnabled);
        let new = ring.claim_slot(EventType::DsimEnabled);

        assert!(ring.publish(new, record(new, EventType::DsimEnabled)));
        assert!(!ring.publish(old, record(old, EventType::DeconEnabled)));

        match ring.read(0) {
            SlotRead::Record(r) => assert_eq!((r.seq, r.ty), (1, EventType::DsimEnabled)),
            other => panic!("unexpected read {:?}", other),
        }
        assert_eq!(ring.dropped(), 1);
    }

    #[test]
    fn test_claim_unless_sees_history() {
        let ring = ring(8);
        for _ in 0..3 {
            ring.claim_slot(EventType::DeconFrameStart);
        }
        let rejected = ring.claim_unless(EventType::DeconFrameStart, |h| {
            h.ends_with_run(EventType::DeconFrameStart, 3)
        });
        assert!(rejected.is_none());
        assert_eq!(ring.claimed(), 3);

        let accepted = ring.claim_unless(EventType::DeconFrameStart, |h| {
            h.ends_with_run(EventType::DeconFrameStart, 4)
        });
        assert_eq!(accepted.map(|c| c.seq), Some(3));
    }

    #[test]
    fn test_history_lookback() {
        let mut history = History::new();
        assert_eq!(history.nth_back(1), None);
        history.push(EventType::DsimCrc);
        history.push(EventType::DsimEcc);
        assert_eq!(history.nth_back(1), Some(EventType::DsimEcc));
        assert_eq!(history.nth_back(2), Some(EventType::DsimCrc));
        assert_eq!(history.nth_back(3), None);
        assert!(!history.ends_with_run(EventType::DsimEcc, 0));
    }

    #[test]
    fn test_allocate_halves_on_failure() {
        let mut allocator = CappedAllocator {
            max: 300,
            attempts: Vec::new(),
        };
        let ring = RingBuffer::allocate(&mut allocator, 1024, 3).unwrap();
        assert_eq!(ring.capacity(), 256);
        assert_eq!(allocator.attempts, [1024, 512, 256]);
    }

    #[test]
    fn test_allocate_gives_up() {
        let mut allocator = CappedAllocator {
            max: 0,
            attempts: Vec::new(),
        };
        let err = RingBuffer::allocate(&mut allocator, 64, 3).unwrap_err();
        assert_eq!(err, Error::AllocationFailed { slots: 16 });
        assert_eq!(allocator.attempts, [64, 32, 16]);
    }

    #[test]
    fn test_concurrent_claims_are_distinct() {
        const THREADS: usize = 8;
        const PER_THREAD: usize = 500;

        let ring = Arc::new(ring(64));
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let ring = Arc::clone(&ring);
                thread::spawn(move || {
                    (0..PER_THREAD)
                        .map(|_| ring.claim_slot(EventType::PlaneUpdate).seq)
                        .collect::<Vec<u64>>()
                })
            })
            .collect();

        let mut seqs: Vec<u64> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        seqs.sort_unstable();

        let expected: Vec<u64> = (0..(THREADS * PER_THREAD) as u64).collect();
        assert_eq!(seqs, expected);
    }
}
