//! The sample ring: slot storage plus cursor state.
//!
//! [`SampleRing`] owns `ring_len` contiguous slots of `slot_len` samples
//! and exposes the read / write / processing sides of the pipeline. All
//! methods take `&self`: the ring is shared between the bus worker thread
//! and the socket tasks, and the cursor discipline of
//! [`RingState`](super::state::RingState) keeps the sides off each other's
//! slots.
//!
//! The source's raw pointer accessors (`get_write_byte` and friends) are
//! expressed here as closure-scoped slices over the active region of a
//! slot, so the bus and socket layers can hand the region straight to the
//! OS without pointer arithmetic at the call sites.

use std::cell::UnsafeCell;

use crate::error::RingError;
use crate::ring::state::RingState;
use crate::sample::{bytes_of, bytes_of_mut, Sample};

/// A ring of sample slots with independent write, read and processing
/// cursors.
///
/// # Example
///
/// ```
/// use aircast::ring::SampleRing;
///
/// let ring = SampleRing::<i16>::new(4, 2).unwrap();
/// assert_eq!(ring.write(&[1, 2, 3, 4], false), 4);
/// assert_eq!(ring.read().unwrap(), vec![1, 2, 3, 4]);
/// ```
pub struct SampleRing<T: Sample> {
    state: RingState,
    storage: Box<[UnsafeCell<T>]>,
}

// SAFETY: slot data is only touched through the region views, and the
// cursor contract (single producer on the write slot, readers behind the
// published `buffered` count) keeps concurrent access on disjoint slots.
// A forced overwrite is the documented exception: it sacrifices the slot a
// stalled reader may still be looking at, which is the accepted trade of
// the force policy.
unsafe impl<T: Sample> Send for SampleRing<T> {}
unsafe impl<T: Sample> Sync for SampleRing<T> {}

impl<T: Sample> SampleRing<T> {
    /// Creates a ring of `ring_len` slots of `slot_len` samples each, with
    /// the automatic first read rotation enabled.
    ///
    /// # Errors
    ///
    /// Fails with the sizing variants of [`RingError`] when `ring_len < 2`,
    /// `slot_len` is odd, `slot_len` is not a multiple of `ring_len`, or
    /// the total byte size would overflow the addressable range.
    pub fn new(slot_len: usize, ring_len: usize) -> Result<Self, RingError> {
        Self::with_options(slot_len, ring_len, true)
    }

    /// Creates a ring with explicit control over the automatic first read
    /// rotation.
    pub fn with_options(
        slot_len: usize,
        ring_len: usize,
        auto_first_rotate: bool,
    ) -> Result<Self, RingError> {
        let state = RingState::new(slot_len, ring_len, T::WIDTH, auto_first_rotate)?;
        let storage = (0..slot_len * ring_len)
            .map(|_| UnsafeCell::new(T::default()))
            .collect();
        Ok(Self { state, storage })
    }

    pub(crate) fn state(&self) -> &RingState {
        &self.state
    }

    /*                          Layout queries                          */

    /// Samples per slot.
    #[must_use]
    pub fn slot_len(&self) -> usize {
        self.state.slot_len()
    }

    /// Number of slots in the ring.
    #[must_use]
    pub fn ring_len(&self) -> usize {
        self.state.ring_len()
    }

    /// Total sample capacity across all slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.sample_len()
    }

    /// Never true: a constructed ring always has capacity.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total byte capacity across all slots.
    #[must_use]
    pub fn byte_len(&self) -> usize {
        self.len() * T::WIDTH
    }

    /// Bytes per slot.
    #[must_use]
    pub fn slot_bytes(&self) -> usize {
        self.slot_len() * T::WIDTH
    }

    /*                          Sample counters                         */

    /// Unread samples buffered across completed slots.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.state.buffered()
    }

    /// Writable sample capacity remaining.
    #[must_use]
    pub fn available(&self) -> usize {
        self.state.available()
    }

    /// Samples processed by the transform stage, not yet read past.
    #[must_use]
    pub fn processed(&self) -> usize {
        self.state.processed()
    }

    /// Buffered samples the transform stage has not reached yet.
    #[must_use]
    pub fn unprocessed(&self) -> usize {
        self.state.unprocessed()
    }

    /// Unread samples in the current read slot.
    #[must_use]
    pub fn unread(&self) -> usize {
        self.state.unread()
    }

    /// Unwritten samples in the current write slot.
    #[must_use]
    pub fn unwritten(&self) -> usize {
        self.state.unwritten()
    }

    /// Byte-valued siblings of the sample counters.
    #[must_use]
    pub fn bytes_buffered(&self) -> usize {
        self.buffered() * T::WIDTH
    }

    /// Writable capacity in bytes.
    #[must_use]
    pub fn bytes_available(&self) -> usize {
        self.available() * T::WIDTH
    }

    /// Processed samples in bytes.
    #[must_use]
    pub fn bytes_processed(&self) -> usize {
        self.processed() * T::WIDTH
    }

    /// Unprocessed samples in bytes.
    #[must_use]
    pub fn bytes_unprocessed(&self) -> usize {
        self.unprocessed() * T::WIDTH
    }

    /// Unread bytes in the current read slot.
    #[must_use]
    pub fn bytes_unread(&self) -> usize {
        self.unread() * T::WIDTH
    }

    /// Unwritten bytes in the current write slot.
    #[must_use]
    pub fn bytes_unwritten(&self) -> usize {
        self.unwritten() * T::WIDTH
    }

    /*                           Slot counters                          */

    /// Whole unread slots buffered.
    #[must_use]
    pub fn slots_buffered(&self) -> usize {
        self.state.slots_buffered()
    }

    /// Whole writable slots remaining.
    #[must_use]
    pub fn slots_available(&self) -> usize {
        self.state.slots_available()
    }

    /// Whole slots the transform stage has completed.
    #[must_use]
    pub fn slots_processed(&self) -> usize {
        self.state.slots_processed()
    }

    /// True when the write slot can accept data without colliding with the
    /// read slot.
    #[must_use]
    pub fn is_writable(&self) -> bool {
        self.state.is_writable()
    }

    /// Resets cursors and counters to the post-construction state without
    /// touching slot contents.
    pub fn reset(&self) {
        self.state.reset();
    }

    /*                          Region access                           */

    fn base_ptr(&self) -> *mut T {
        self.storage.as_ptr() as *mut T
    }

    /// Builds a slice over `len` samples of `slot` starting at `offset`.
    ///
    /// SAFETY: the caller must hold the side of the cursor contract that
    /// owns this region (producer for the write slot, consumer for the
    /// read slot, transform stage for the processing slot).
    unsafe fn region(&self, slot: usize, offset: usize, len: usize) -> &[T] {
        std::slice::from_raw_parts(self.base_ptr().add(slot * self.slot_len() + offset), len)
    }

    /// Mutable variant of [`region`](Self::region); same contract.
    #[allow(clippy::mut_from_ref)]
    unsafe fn region_mut(&self, slot: usize, offset: usize, len: usize) -> &mut [T] {
        std::slice::from_raw_parts_mut(self.base_ptr().add(slot * self.slot_len() + offset), len)
    }

    /// Runs `f` over the unwritten region of the write slot.
    ///
    /// The slice is empty while the ring has no writable room. Producer
    /// side only; pair with [`report_written`](Self::report_written) for
    /// the samples actually filled.
    pub fn with_unwritten<R>(&self, f: impl FnOnce(&mut [T]) -> R) -> R {
        let len = self.unwritten();
        let offset = self.state.written_in_slot();
        let slot = self.state.write_idx();
        // SAFETY: producer-owned region per the cursor contract.
        f(unsafe { self.region_mut(slot, offset, len) })
    }

    /// Byte view of [`with_unwritten`](Self::with_unwritten).
    pub fn with_unwritten_bytes<R>(&self, f: impl FnOnce(&mut [u8]) -> R) -> R {
        self.with_unwritten(|samples| f(bytes_of_mut(samples)))
    }

    /// Runs `f` over the unread region of the read slot.
    ///
    /// The slice is empty while nothing is buffered. Consumer side only;
    /// pair with [`report_read`](Self::report_read) for the samples
    /// actually consumed.
    pub fn with_unread<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        let len = self.unread();
        let offset = self.slot_len() - self.state.unread_in_slot();
        let slot = self.state.read_idx();
        // SAFETY: consumer-owned region; len is gated on `buffered`.
        f(unsafe { self.region(slot, offset, len) })
    }

    /// Byte view of [`with_unread`](Self::with_unread).
    pub fn with_unread_bytes<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        self.with_unread(|samples| f(bytes_of(samples)))
    }

    /// Runs `f` over the unprocessed region of the processing slot, for an
    /// in-place transform stage between writer and reader.
    ///
    /// Pair with [`report_processed`](Self::report_processed).
    pub fn with_unprocessed<R>(&self, f: impl FnOnce(&mut [T]) -> R) -> R {
        let offset = self.state.processed_in_slot();
        let len = self
            .unprocessed()
            .min(self.slot_len() - offset);
        let slot = self.state.processing_idx();
        // SAFETY: transform-stage-owned region between the cursors.
        f(unsafe { self.region_mut(slot, offset, len) })
    }

    /*                               Read                               */

    /// Returns a copy of the current read slot and rotates past it.
    ///
    /// # Errors
    ///
    /// Fails with [`RingError::ReadUnderrun`] when no completed slot is
    /// buffered.
    pub fn read(&self) -> Result<Vec<T>, RingError> {
        if self.state.slots_buffered() == 0 {
            return Err(RingError::ReadUnderrun);
        }
        let slot = self.state.read_idx();
        // SAFETY: a buffered slot is consumer-owned.
        let out = unsafe { self.region(slot, 0, self.slot_len()) }.to_vec();
        self.state.rotate_read();
        Ok(out)
    }

    /// Copies `dst.len()` samples from the read cursor and reports them
    /// read.
    ///
    /// # Errors
    ///
    /// Fails with [`RingError::OutOfRange`] when more samples are requested
    /// than are unread in the current slot.
    pub fn read_samples(&self, dst: &mut [T]) -> Result<(), RingError> {
        let unread = self.unread();
        if dst.len() > unread {
            return Err(RingError::OutOfRange {
                what: "sample read",
                got: dst.len(),
                limit: unread,
            });
        }
        self.with_unread(|samples| dst.copy_from_slice(&samples[..dst.len()]));
        self.state.report_read(dst.len());
        Ok(())
    }

    /// Byte-granular variant of [`read_samples`](Self::read_samples).
    ///
    /// # Errors
    ///
    /// Additionally fails with [`RingError::NonMultipleByteCount`] when the
    /// destination does not divide into whole samples.
    pub fn read_bytes(&self, dst: &mut [u8]) -> Result<(), RingError> {
        if dst.len() % T::WIDTH != 0 {
            return Err(RingError::NonMultipleByteCount {
                count: dst.len(),
                width: T::WIDTH,
            });
        }
        let unread_bytes = self.bytes_unread();
        if dst.len() > unread_bytes {
            return Err(RingError::OutOfRange {
                what: "byte read",
                got: dst.len(),
                limit: unread_bytes,
            });
        }
        self.with_unread_bytes(|bytes| dst.copy_from_slice(&bytes[..dst.len()]));
        self.state.report_read(dst.len() / T::WIDTH);
        Ok(())
    }

    /// Accounts for samples consumed through a region view.
    pub fn report_read(&self, len: usize) {
        self.state.report_read(len);
    }

    /// Byte-granular variant of [`report_read`](Self::report_read).
    pub fn report_read_bytes(&self, len: usize) -> Result<(), RingError> {
        if len % T::WIDTH != 0 {
            return Err(RingError::NonMultipleByteCount {
                count: len,
                width: T::WIDTH,
            });
        }
        self.state.report_read(len / T::WIDTH);
        Ok(())
    }

    /// Rotates the read cursor past the current slot.
    pub fn rotate_read(&self) {
        self.state.rotate_read();
    }

    /// Rotates the read cursor after consuming only `len` samples.
    pub fn rotate_partial_read(&self, len: usize) {
        self.state.rotate_partial_read(len);
    }

    /*                               Write                              */

    /// Writes a single sample.
    ///
    /// Returns 1 on acceptance, 0 when the ring is full and `force` is not
    /// set. A forced write into a full ring sacrifices the oldest unread
    /// slot.
    pub fn write_sample(&self, sample: T, force: bool) -> usize {
        if !self.state.is_writable() && !force {
            return 0;
        }
        let offset = self.state.written_in_slot();
        let slot = self.state.write_idx();
        // SAFETY: producer-owned write slot.
        (unsafe { self.region_mut(slot, offset, 1) })[0] = sample;
        self.state.advance_written(1, force);
        1
    }

    /// Writes a sequence, walking across slot boundaries, and returns the
    /// number of samples actually placed.
    ///
    /// Without `force` the walk stops when the ring fills; with `force` it
    /// overwrites the oldest unread slots as needed (bounded by one pass
    /// around the ring).
    pub fn write(&self, data: &[T], force: bool) -> usize {
        let mut written = 0;
        let mut crossings = self.ring_len();
        while written < data.len() && (self.state.is_writable() || force) && crossings > 0 {
            let room = self.state.unwritten_in_slot();
            let take = (data.len() - written).min(room);
            let offset = self.state.written_in_slot();
            let slot = self.state.write_idx();
            // SAFETY: producer-owned write slot region of `take` samples.
            unsafe { self.region_mut(slot, offset, take) }
                .copy_from_slice(&data[written..written + take]);
            self.state.advance_written(take, force);
            if take == room {
                crossings -= 1;
            }
            written += take;
        }
        written
    }

    /// Byte-granular variant of [`write`](Self::write); returns the number
    /// of bytes placed.
    ///
    /// # Errors
    ///
    /// Fails with [`RingError::NonMultipleByteCount`] when `data` does not
    /// divide into whole samples.
    pub fn write_bytes(&self, data: &[u8], force: bool) -> Result<usize, RingError> {
        if data.len() % T::WIDTH != 0 {
            return Err(RingError::NonMultipleByteCount {
                count: data.len(),
                width: T::WIDTH,
            });
        }
        let samples: Vec<T> = data.chunks_exact(T::WIDTH).map(T::get_ne).collect();
        Ok(self.write(&samples, force) * T::WIDTH)
    }

    /// Accounts for samples filled through a region view.
    pub fn report_written(&self, len: usize) {
        self.state.report_written(len);
    }

    /// Byte-granular variant of [`report_written`](Self::report_written).
    pub fn report_written_bytes(&self, len: usize) -> Result<(), RingError> {
        if len % T::WIDTH != 0 {
            return Err(RingError::NonMultipleByteCount {
                count: len,
                width: T::WIDTH,
            });
        }
        self.state.report_written(len / T::WIDTH);
        Ok(())
    }

    /// Rotates the write cursor past the current slot.
    pub fn rotate_write(&self, force: bool) {
        self.state.rotate_write(force);
    }

    /// Rotates the write cursor after filling only `len` samples.
    pub fn rotate_partial_write(&self, len: usize, force: bool) {
        self.state.rotate_partial_write(len, force);
    }

    /*                             Transform                            */

    /// Accounts for processed samples, which may span several slots.
    pub fn report_processed(&self, len: usize) {
        self.state.report_processed(len);
    }

    /// Byte-granular variant of [`report_processed`](Self::report_processed).
    pub fn report_processed_bytes(&self, len: usize) -> Result<(), RingError> {
        if len % T::WIDTH != 0 {
            return Err(RingError::NonMultipleByteCount {
                count: len,
                width: T::WIDTH,
            });
        }
        self.state.report_processed(len / T::WIDTH);
        Ok(())
    }

    /// Rotates the processing cursor past the current slot.
    pub fn rotate_processing(&self) {
        self.state.rotate_processing();
    }

    /// Rotates the processing cursor after transforming only `len` samples.
    pub fn rotate_partial_processing(&self, len: usize) {
        self.state.rotate_partial_processing(len);
    }

    /*                               Fill                               */

    /// Broadcasts `value` into every slot. Used to flush the ring to
    /// silence between connections; cursors are left untouched.
    pub fn fill(&self, value: T) {
        for cell in self.storage.iter() {
            // SAFETY: flushing runs while no worker holds a region view;
            // each cell write is a plain store of an integer sample.
            unsafe {
                *cell.get() = value;
            }
        }
    }

    /// Copy of the current read slot without advancing the cursor, for the
    /// multi-reader wrapper.
    pub(crate) fn read_slot_copy(&self) -> Vec<T> {
        let slot = self.state.read_idx();
        // SAFETY: consumer-owned slot; the caller reports the read.
        unsafe { self.region(slot, 0, self.slot_len()) }.to_vec()
    }

    /// Copy of one whole slot, for assertions and diagnostics.
    #[cfg(test)]
    pub(crate) fn slot_snapshot(&self, slot: usize) -> Vec<T> {
        // SAFETY: test-only accessor used while no writer is active.
        unsafe { self.region(slot, 0, self.slot_len()) }.to_vec()
    }
}

impl<T: Sample> std::fmt::Debug for SampleRing<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SampleRing")
            .field("slot_len", &self.slot_len())
            .field("ring_len", &self.ring_len())
            .field("buffered", &self.buffered())
            .field("available", &self.available())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_fills_one_slot_and_stops() {
        let ring = SampleRing::<i16>::new(4, 2).unwrap();
        let written = ring.write(&[1, 2, 3, 4, 5, 6, 7], false);
        assert_eq!(written, 4);
        assert_eq!(ring.buffered(), 4);
        assert_eq!(ring.slot_snapshot(0), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_read_returns_slot_in_fifo_order() {
        let ring = SampleRing::<i16>::new(4, 2).unwrap();
        ring.write(&[1, 2, 3, 4, 5, 6, 7], false);

        let slot = ring.read().unwrap();
        assert_eq!(slot, vec![1, 2, 3, 4]);
        assert_eq!(ring.buffered(), 0);
        assert_eq!(ring.state().read_idx(), 1);
    }

    #[test]
    fn test_read_on_empty_ring_underruns() {
        let ring = SampleRing::<i16>::new(4, 2).unwrap();
        assert!(matches!(ring.read(), Err(RingError::ReadUnderrun)));
    }

    #[test]
    fn test_third_slot_write_refused_without_force() {
        let ring = SampleRing::<i16>::new(6, 3).unwrap();
        assert_eq!(ring.write(&[1; 6], false), 6);
        assert_eq!(ring.write(&[2; 6], false), 6);
        assert_eq!(ring.write(&[3; 6], false), 0);
        assert_eq!(ring.available(), 0);
    }

    #[test]
    fn test_forced_write_drops_exactly_the_oldest_slot() {
        let ring = SampleRing::<i16>::new(6, 3).unwrap();
        ring.write(&[1; 6], false);
        ring.write(&[2; 6], false);
        assert_eq!(ring.write(&[3; 6], true), 6);

        // The reader now sees the second and third slots; the first is lost.
        assert_eq!(ring.read().unwrap(), vec![2; 6]);
        assert_eq!(ring.read().unwrap(), vec![3; 6]);
        assert!(ring.read().is_err());
    }

    #[test]
    fn test_full_write_read_cycle_is_byte_identical() {
        let ring = SampleRing::<i16>::new(8, 4).unwrap();
        let first: Vec<i16> = (0..8).collect();
        let second: Vec<i16> = (100..108).collect();
        ring.write(&first, false);
        ring.write(&second, false);

        assert_eq!(ring.read().unwrap(), first);
        assert_eq!(ring.read().unwrap(), second);
    }

    #[test]
    fn test_partial_writes_concatenate_within_slot() {
        let ring = SampleRing::<i16>::new(4, 2).unwrap();
        assert_eq!(ring.write(&[1, 2], false), 2);
        assert_eq!(ring.buffered(), 0);
        assert_eq!(ring.write(&[3, 4], false), 2);

        assert_eq!(ring.read().unwrap(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_single_sample_writes_rotate_at_boundary() {
        let ring = SampleRing::<u8>::new(2, 2).unwrap();
        assert_eq!(ring.write_sample(10, false), 1);
        assert_eq!(ring.write_sample(20, false), 1);
        assert_eq!(ring.buffered(), 2);
        assert_eq!(ring.read().unwrap(), vec![10, 20]);
    }

    #[test]
    fn test_write_sample_refused_when_full() {
        let ring = SampleRing::<u8>::new(2, 2).unwrap();
        ring.write(&[1, 2], false);
        assert_eq!(ring.write_sample(3, false), 0);
    }

    #[test]
    fn test_write_bytes_rejects_ragged_lengths() {
        let ring = SampleRing::<i16>::new(4, 2).unwrap();
        assert!(matches!(
            ring.write_bytes(&[0u8; 3], false),
            Err(RingError::NonMultipleByteCount { count: 3, width: 2 })
        ));
    }

    #[test]
    fn test_write_bytes_round_trips_through_read_bytes() {
        let ring = SampleRing::<i16>::new(4, 2).unwrap();
        let samples: Vec<i16> = vec![-1, 2, -3, 4];
        let mut wire = vec![0u8; 8];
        for (i, s) in samples.iter().enumerate() {
            wire[i * 2..i * 2 + 2].copy_from_slice(&s.to_ne_bytes());
        }

        assert_eq!(ring.write_bytes(&wire, false).unwrap(), 8);
        let mut out = vec![0u8; 8];
        ring.read_bytes(&mut out).unwrap();
        assert_eq!(out, wire);
        assert_eq!(ring.buffered(), 0);
    }

    #[test]
    fn test_read_samples_respects_unread_limit() {
        let ring = SampleRing::<i16>::new(4, 2).unwrap();
        ring.write(&[1, 2, 3, 4], false);

        let mut dst = [0i16; 5];
        assert!(matches!(
            ring.read_samples(&mut dst),
            Err(RingError::OutOfRange { .. })
        ));

        let mut dst = [0i16; 2];
        ring.read_samples(&mut dst).unwrap();
        assert_eq!(dst, [1, 2]);
        assert_eq!(ring.unread(), 2);
    }

    #[test]
    fn test_region_views_pass_data_through() {
        let ring = SampleRing::<i16>::new(4, 2).unwrap();

        let filled = ring.with_unwritten(|slot| {
            slot.copy_from_slice(&[9, 8, 7, 6]);
            slot.len()
        });
        ring.report_written(filled);
        assert_eq!(ring.buffered(), 4);

        let seen = ring.with_unread(|slot| slot.to_vec());
        assert_eq!(seen, vec![9, 8, 7, 6]);
        ring.report_read(seen.len());
        assert_eq!(ring.buffered(), 0);
    }

    #[test]
    fn test_unread_region_is_empty_before_first_rotation() {
        let ring = SampleRing::<i16>::new(4, 2).unwrap();
        ring.with_unwritten(|slot| slot[0] = 1);
        let len = ring.with_unread(|slot| slot.len());
        assert_eq!(len, 0);
    }

    #[test]
    fn test_byte_views_track_partial_consumption() {
        let ring = SampleRing::<i16>::new(4, 2).unwrap();
        ring.write(&[1, 2, 3, 4], false);

        ring.with_unread_bytes(|bytes| assert_eq!(bytes.len(), 8));
        ring.report_read_bytes(4).unwrap();
        ring.with_unread_bytes(|bytes| {
            assert_eq!(bytes.len(), 4);
            assert_eq!(i16::get_ne(&bytes[..2]), 3);
        });
    }

    #[test]
    fn test_transform_stage_modifies_in_place() {
        let ring = SampleRing::<i16>::new(4, 2).unwrap();
        ring.write(&[1, 2, 3, 4], false);

        ring.with_unprocessed(|region| {
            for s in region.iter_mut() {
                *s *= 10;
            }
        });
        ring.report_processed(4);
        assert_eq!(ring.slots_processed(), 1);

        assert_eq!(ring.read().unwrap(), vec![10, 20, 30, 40]);
    }

    #[test]
    fn test_fill_broadcasts_to_every_slot() {
        let ring = SampleRing::<i16>::new(6, 3).unwrap();
        ring.write(&[7; 12], false);
        ring.fill(0);
        for slot in 0..3 {
            assert_eq!(ring.slot_snapshot(slot), vec![0; 6]);
        }
    }

    #[test]
    fn test_counters_report_in_bytes() {
        let ring = SampleRing::<i32>::new(8, 4).unwrap();
        assert_eq!(ring.byte_len(), 128);
        assert_eq!(ring.slot_bytes(), 32);
        ring.write(&[1, 2, 3, 4, 5, 6, 7, 8], false);
        assert_eq!(ring.bytes_buffered(), 32);
        assert_eq!(ring.bytes_available(), 64);
        assert_eq!(ring.bytes_unread(), 32);
    }

    #[test]
    fn test_reset_then_reuse() {
        let ring = SampleRing::<i16>::new(4, 2).unwrap();
        ring.write(&[1, 2, 3, 4], false);
        ring.reset();
        assert_eq!(ring.buffered(), 0);
        assert_eq!(ring.write(&[5, 6, 7, 8], false), 4);
        assert_eq!(ring.read().unwrap(), vec![5, 6, 7, 8]);
    }
}
