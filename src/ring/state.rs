//! Cursor and counter state for the slot ring.
//!
//! This is the accounting half of the ring buffer: three cursors (write,
//! read, processing) moving over `ring_len` slots of `slot_len` samples,
//! plus the sample counters that tie them together. Storage lives in
//! [`SampleRing`](crate::ring::SampleRing); everything here is unit-free
//! of the element type and counted in samples.
//!
//! Concurrency contract (one producer, one or more consumers):
//! - the producer owns the write cursor, the within-slot write counters and
//!   the slot contents ahead of the read cursor;
//! - consumers own the read cursor and the within-slot read counter, and
//!   only move them through the reporting calls;
//! - `buffered` is the published hand-off point: the producer releases into
//!   it on rotation and consumers acquire from it before touching slot data.
//!
//! Contract violations (over-long rotation arguments, reporting more than
//! is outstanding) are `debug_assert!`ed; release builds clamp to the safe
//! boundary instead.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::error::RingError;

/// Subtracts with a floor of zero, atomically.
fn sub_clamped(counter: &AtomicUsize, n: usize) {
    let _ = counter.fetch_update(Ordering::AcqRel, Ordering::Acquire, |v| {
        Some(v.saturating_sub(n))
    });
}

/// Adds with a ceiling, atomically.
fn add_clamped(counter: &AtomicUsize, n: usize, ceiling: usize) {
    let _ = counter.fetch_update(Ordering::AcqRel, Ordering::Acquire, |v| {
        Some((v + n).min(ceiling))
    });
}

pub(crate) struct RingState {
    slot_len: usize,
    ring_len: usize,
    /// `(ring_len - 1) * slot_len`; one slot is always reserved so an empty
    /// ring can be told apart from a full one.
    writable_len: usize,
    auto_first_rotate: bool,

    read_idx: AtomicUsize,
    write_idx: AtomicUsize,
    processing_idx: AtomicUsize,

    /// Samples present across completed slots, excluding the active write
    /// slot. Never exceeds `writable_len`.
    buffered: AtomicUsize,
    written_in_slot: AtomicUsize,
    unwritten_in_slot: AtomicUsize,
    unread_in_slot: AtomicUsize,
    processed: AtomicUsize,
    first_written: AtomicBool,
}

impl RingState {
    /// Validates the layout and builds the initial cursor state.
    ///
    /// The read cursor starts on the last slot so the first write rotation
    /// advances it onto slot zero, letting the reader observe the first
    /// completed slot without an explicit hand-off.
    pub(crate) fn new(
        slot_len: usize,
        ring_len: usize,
        sample_width: usize,
        auto_first_rotate: bool,
    ) -> Result<Self, RingError> {
        if ring_len < 2 {
            return Err(RingError::RingTooShort { got: ring_len });
        }
        let bytes = slot_len
            .checked_mul(ring_len)
            .and_then(|samples| samples.checked_mul(sample_width));
        match bytes {
            Some(total) if total <= i32::MAX as usize => {}
            _ => {
                return Err(RingError::CapacityOverflow {
                    len: slot_len,
                    ring: ring_len,
                })
            }
        }
        if slot_len < 2 || slot_len % 2 != 0 {
            return Err(RingError::UnevenSlotLength { len: slot_len });
        }
        if slot_len % ring_len != 0 {
            return Err(RingError::NonMultipleSlotLength {
                len: slot_len,
                ring: ring_len,
            });
        }

        let state = Self {
            slot_len,
            ring_len,
            writable_len: (ring_len - 1) * slot_len,
            auto_first_rotate,
            read_idx: AtomicUsize::new(ring_len - 1),
            write_idx: AtomicUsize::new(0),
            processing_idx: AtomicUsize::new(0),
            buffered: AtomicUsize::new(0),
            written_in_slot: AtomicUsize::new(0),
            unwritten_in_slot: AtomicUsize::new(slot_len),
            unread_in_slot: AtomicUsize::new(slot_len),
            processed: AtomicUsize::new(0),
            first_written: AtomicBool::new(false),
        };
        Ok(state)
    }

    /// Restores the post-construction state without touching slot contents.
    pub(crate) fn reset(&self) {
        self.first_written.store(false, Ordering::Release);
        self.buffered.store(0, Ordering::Release);
        self.written_in_slot.store(0, Ordering::Release);
        self.unwritten_in_slot.store(self.slot_len, Ordering::Release);
        self.unread_in_slot.store(self.slot_len, Ordering::Release);
        self.processed.store(0, Ordering::Release);
        self.read_idx.store(self.ring_len - 1, Ordering::Release);
        self.write_idx.store(0, Ordering::Release);
        self.processing_idx.store(0, Ordering::Release);
    }

    /*                          Layout queries                          */

    pub(crate) fn slot_len(&self) -> usize {
        self.slot_len
    }

    pub(crate) fn ring_len(&self) -> usize {
        self.ring_len
    }

    /// Total sample capacity across all slots.
    pub(crate) fn sample_len(&self) -> usize {
        self.slot_len * self.ring_len
    }

    pub(crate) fn writable_len(&self) -> usize {
        self.writable_len
    }

    /*                          Cursor queries                          */

    pub(crate) fn read_idx(&self) -> usize {
        self.read_idx.load(Ordering::Acquire)
    }

    pub(crate) fn write_idx(&self) -> usize {
        self.write_idx.load(Ordering::Acquire)
    }

    pub(crate) fn processing_idx(&self) -> usize {
        self.processing_idx.load(Ordering::Acquire)
    }

    pub(crate) fn first_written(&self) -> bool {
        self.first_written.load(Ordering::Acquire)
    }

    /*                          Sample counters                         */

    pub(crate) fn buffered(&self) -> usize {
        self.buffered.load(Ordering::Acquire)
    }

    pub(crate) fn available(&self) -> usize {
        self.writable_len - self.buffered().min(self.writable_len)
    }

    pub(crate) fn processed(&self) -> usize {
        self.processed.load(Ordering::Acquire)
    }

    pub(crate) fn unprocessed(&self) -> usize {
        self.buffered().saturating_sub(self.processed())
    }

    /// Unread samples in the current read slot; zero while nothing is
    /// buffered.
    pub(crate) fn unread(&self) -> usize {
        if self.buffered() > 0 {
            self.unread_in_slot.load(Ordering::Acquire)
        } else {
            0
        }
    }

    /// Unwritten samples in the current write slot; zero while the ring has
    /// no writable room.
    pub(crate) fn unwritten(&self) -> usize {
        if self.available() > 0 {
            self.unwritten_in_slot.load(Ordering::Acquire)
        } else {
            0
        }
    }

    /// Samples already written into the current write slot.
    pub(crate) fn written_in_slot(&self) -> usize {
        self.written_in_slot.load(Ordering::Acquire)
    }

    /// Raw within-slot unread count, not gated on `buffered`.
    pub(crate) fn unread_in_slot(&self) -> usize {
        self.unread_in_slot.load(Ordering::Acquire)
    }

    pub(crate) fn unwritten_in_slot(&self) -> usize {
        self.unwritten_in_slot.load(Ordering::Acquire)
    }

    /*                          Slot counters                           */

    pub(crate) fn slots_buffered(&self) -> usize {
        self.buffered() / self.slot_len
    }

    pub(crate) fn slots_available(&self) -> usize {
        self.available() / self.slot_len
    }

    pub(crate) fn slots_processed(&self) -> usize {
        self.processed() / self.slot_len
    }

    /// True when the write slot can accept data without colliding with the
    /// read slot.
    pub(crate) fn is_writable(&self) -> bool {
        self.read_idx() != self.write_idx() && self.available() > 0
    }

    /*                               Read                               */

    fn rotate_read_index(&self) {
        let _ = self
            .read_idx
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |i| {
                Some((i + 1) % self.ring_len)
            });
    }

    /// Advances the read cursor past a fully consumed slot.
    pub(crate) fn rotate_read(&self) {
        self.rotate_read_index();
        self.unread_in_slot.store(self.slot_len, Ordering::Release);
        sub_clamped(&self.buffered, self.slot_len);
        sub_clamped(&self.processed, self.slot_len);
    }

    /// Advances the read cursor after consuming only `len` samples of the
    /// slot; the remainder of the slot is discarded.
    pub(crate) fn rotate_partial_read(&self, len: usize) {
        debug_assert!(len <= self.slot_len, "partial read exceeds slot length");
        let len = len.min(self.slot_len);
        self.rotate_read_index();
        self.unread_in_slot.store(self.slot_len, Ordering::Release);
        sub_clamped(&self.buffered, len);
        sub_clamped(&self.processed, len);
    }

    /// Accounts for `len` samples read externally from the read slot,
    /// rotating when the slot is exhausted.
    pub(crate) fn report_read(&self, len: usize) {
        let unread = self.unread_in_slot.load(Ordering::Acquire);
        debug_assert!(len <= unread, "reported read exceeds unread samples");
        let len = len.min(unread);
        if len == 0 {
            return;
        }
        self.unread_in_slot.store(unread - len, Ordering::Release);
        if unread == len {
            self.rotate_read();
        }
    }

    /*                               Write                               */

    fn rotate_write_index(&self) {
        let _ = self
            .write_idx
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |i| {
                Some((i + 1) % self.ring_len)
            });
        if self.auto_first_rotate && !self.first_written.swap(true, Ordering::AcqRel) {
            self.rotate_read_index();
        }
    }

    /// Drops the oldest unread slot so a forced write can proceed.
    fn sacrifice_read_slot(&self) {
        self.rotate_read_index();
        self.unread_in_slot.store(self.slot_len, Ordering::Release);
        let buffered = self.buffered();
        let _ = self
            .processed
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |p| {
                Some(p.min(buffered))
            });
    }

    /// Advances the write cursor past a filled slot.
    ///
    /// With `force`, an overwrite of a full ring is tolerated: the read
    /// cursor is pushed forward and the oldest unread slot is lost.
    pub(crate) fn rotate_write(&self, force: bool) {
        self.rotate_write_index();
        self.written_in_slot.store(0, Ordering::Release);
        self.unwritten_in_slot.store(self.slot_len, Ordering::Release);
        add_clamped(&self.buffered, self.slot_len, self.writable_len);
        if force && !self.is_writable() {
            self.sacrifice_read_slot();
        }
    }

    /// Advances the write cursor after filling only `len` samples; the
    /// remaining capacity of the slot is given up.
    pub(crate) fn rotate_partial_write(&self, len: usize, force: bool) {
        debug_assert!(len <= self.slot_len, "partial write exceeds slot length");
        let len = len.min(self.slot_len);
        self.rotate_write_index();
        self.written_in_slot.store(0, Ordering::Release);
        self.unwritten_in_slot.store(self.slot_len, Ordering::Release);
        add_clamped(&self.buffered, len, self.writable_len);
        if force && !self.is_writable() {
            self.sacrifice_read_slot();
        }
    }

    /// Accounts for `len` samples written externally into the write slot,
    /// rotating when the slot fills.
    pub(crate) fn report_written(&self, len: usize) {
        debug_assert!(
            len <= self.unwritten_in_slot.load(Ordering::Acquire),
            "reported write exceeds unwritten samples"
        );
        self.advance_written(len, false);
    }

    /// `report_written` with the force policy carried into the boundary
    /// rotation, for the owning ring's write paths.
    pub(crate) fn advance_written(&self, len: usize, force: bool) {
        let unwritten = self.unwritten_in_slot.load(Ordering::Acquire);
        let len = len.min(unwritten);
        if len == 0 {
            return;
        }
        self.written_in_slot.fetch_add(len, Ordering::AcqRel);
        self.unwritten_in_slot.store(unwritten - len, Ordering::Release);
        if unwritten == len {
            self.rotate_write(force);
        }
    }

    /*                             Transform                             */

    fn rotate_processing_index(&self) {
        let _ = self
            .processing_idx
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |i| {
                Some((i + 1) % self.ring_len)
            });
    }

    /// Advances the processing cursor past a fully transformed slot.
    pub(crate) fn rotate_processing(&self) {
        self.rotate_processing_index();
        add_clamped(&self.processed, self.slot_len, self.writable_len);
    }

    /// Advances the processing cursor after transforming only `len`
    /// samples of the slot.
    pub(crate) fn rotate_partial_processing(&self, len: usize) {
        debug_assert!(len <= self.slot_len, "partial processing exceeds slot length");
        let len = len.min(self.slot_len);
        self.rotate_processing_index();
        add_clamped(&self.processed, len, self.writable_len);
    }

    /// Accounts for `len` processed samples, which may span several slots;
    /// the processing cursor rotates each time a slot boundary is crossed.
    pub(crate) fn report_processed(&self, len: usize) {
        debug_assert!(
            len <= self.unprocessed(),
            "reported processing exceeds unprocessed samples"
        );
        let mut remaining = len.min(self.unprocessed());
        while remaining > 0 {
            let fill = self.processed() % self.slot_len;
            let take = remaining.min(self.slot_len - fill);
            add_clamped(&self.processed, take, self.writable_len);
            if fill + take == self.slot_len {
                self.rotate_processing_index();
            }
            remaining -= take;
        }
    }

    /// Offset of the next processed sample within the processing slot.
    pub(crate) fn processed_in_slot(&self) -> usize {
        self.processed() % self.slot_len
    }
}
