//! Read-quorum gate over the sample ring.
//!
//! The transmitter fans one ring out to N socket clients without per-client
//! copies: every client reads the same slot region, and the read cursor only
//! advances once all registered readers have reported their read. A slot
//! becomes writable again exactly when the last reader acknowledges it.
//!
//! The scheme relies on every registered reader actually reporting: a
//! stalled reader blocks rotation and the producer observes
//! `is_writable() == false`. Client purging and send failures are the
//! mitigations upstream.

use std::ops::Deref;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::RingError;
use crate::ring::SampleRing;
use crate::sample::Sample;

/// A [`SampleRing`] whose read side requires acknowledgement from every
/// registered reader before a slot is considered drained.
///
/// Dereferences to the underlying ring for everything except the read
/// reporting, which is intercepted by the quorum counter.
///
/// # Example
///
/// ```
/// use aircast::ring::MultiReadRing;
///
/// let ring = MultiReadRing::<i16>::new(4, 2).unwrap();
/// ring.set_num_readers(2).unwrap();
/// ring.write(&[1, 2, 3, 4], false);
///
/// ring.report_read(4); // first reader: cursor holds
/// assert_eq!(ring.buffered(), 4);
/// ring.report_read(4); // second reader: slot drained
/// assert_eq!(ring.buffered(), 0);
/// ```
pub struct MultiReadRing<T: Sample> {
    ring: SampleRing<T>,
    readers: AtomicUsize,
    read_counter: AtomicUsize,
}

impl<T: Sample> MultiReadRing<T> {
    /// Creates a multi-reader ring with a single registered reader.
    ///
    /// # Errors
    ///
    /// Propagates the sizing errors of [`SampleRing::new`].
    pub fn new(slot_len: usize, ring_len: usize) -> Result<Self, RingError> {
        Ok(Self {
            ring: SampleRing::new(slot_len, ring_len)?,
            readers: AtomicUsize::new(1),
            read_counter: AtomicUsize::new(0),
        })
    }

    /// Number of readers that must acknowledge each slot.
    #[must_use]
    pub fn num_readers(&self) -> usize {
        self.readers.load(Ordering::Acquire)
    }

    /// Registers the number of readers.
    ///
    /// Safe to change mid-flight: a pending quorum count is taken modulo the
    /// new reader count on the next report.
    ///
    /// # Errors
    ///
    /// Fails with [`RingError::OutOfRange`] when `readers` is zero.
    pub fn set_num_readers(&self, readers: usize) -> Result<(), RingError> {
        if readers == 0 {
            return Err(RingError::OutOfRange {
                what: "reader count",
                got: 0,
                limit: usize::MAX,
            });
        }
        self.readers.store(readers, Ordering::Release);
        Ok(())
    }

    /// Increments the quorum counter; true when this report completes the
    /// quorum and the underlying read accounting should run.
    fn quorum_reached(&self) -> bool {
        let readers = self.num_readers().max(1);
        let previous = self
            .read_counter
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |c| {
                Some((c + 1) % readers)
            })
            .unwrap_or(0);
        (previous + 1) % readers == 0
    }

    /// Reports `len` samples read by one reader.
    ///
    /// Only the report that completes the quorum moves the read cursor; the
    /// earlier ones are bookkeeping no-ops, so all readers of a slot observe
    /// identical data.
    pub fn report_read(&self, len: usize) {
        if self.quorum_reached() {
            self.ring.report_read(len);
        }
    }

    /// Byte-granular variant of [`report_read`](Self::report_read).
    ///
    /// # Errors
    ///
    /// Fails with [`RingError::NonMultipleByteCount`] when `len` does not
    /// divide into whole samples.
    pub fn report_read_bytes(&self, len: usize) -> Result<(), RingError> {
        if len % T::WIDTH != 0 {
            return Err(RingError::NonMultipleByteCount {
                count: len,
                width: T::WIDTH,
            });
        }
        self.report_read(len / T::WIDTH);
        Ok(())
    }

    /// Returns a copy of the current read slot and reports it read, so
    /// single-reader operation still advances the cursor.
    ///
    /// # Errors
    ///
    /// Fails with [`RingError::ReadUnderrun`] when no completed slot is
    /// buffered.
    pub fn read(&self) -> Result<Vec<T>, RingError> {
        if self.slots_buffered() == 0 {
            return Err(RingError::ReadUnderrun);
        }
        let out = self.ring.read_slot_copy();
        self.report_read(self.slot_len());
        Ok(out)
    }
}

impl<T: Sample> Deref for MultiReadRing<T> {
    type Target = SampleRing<T>;

    fn deref(&self) -> &Self::Target {
        &self.ring
    }
}

impl<T: Sample> std::fmt::Debug for MultiReadRing<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultiReadRing")
            .field("ring", &self.ring)
            .field("readers", &self.num_readers())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_rotates_only_after_full_quorum() {
        let ring = MultiReadRing::<i16>::new(4, 2).unwrap();
        ring.set_num_readers(3).unwrap();
        ring.write(&[1, 2, 3, 4], false);
        let read_idx_before = ring.state().read_idx();

        ring.report_read(4);
        ring.report_read(4);
        assert_eq!(ring.state().read_idx(), read_idx_before);
        assert_eq!(ring.buffered(), 4);

        ring.report_read(4);
        assert_ne!(ring.state().read_idx(), read_idx_before);
        assert_eq!(ring.buffered(), 0);
    }

    #[test]
    fn test_every_reader_observes_identical_data() {
        let ring = MultiReadRing::<i16>::new(4, 2).unwrap();
        ring.set_num_readers(2).unwrap();
        ring.write(&[5, 6, 7, 8], false);

        let first = ring.with_unread(|slot| slot.to_vec());
        ring.report_read(4);
        let second = ring.with_unread(|slot| slot.to_vec());
        ring.report_read(4);

        assert_eq!(first, second);
        assert_eq!(first, vec![5, 6, 7, 8]);
    }

    #[test]
    fn test_single_reader_read_advances() {
        let ring = MultiReadRing::<i16>::new(4, 2).unwrap();
        ring.write(&[1, 2, 3, 4], false);
        assert_eq!(ring.read().unwrap(), vec![1, 2, 3, 4]);
        assert_eq!(ring.buffered(), 0);
    }

    #[test]
    fn test_read_underruns_when_empty() {
        let ring = MultiReadRing::<i16>::new(4, 2).unwrap();
        assert!(matches!(ring.read(), Err(RingError::ReadUnderrun)));
    }

    #[test]
    fn test_zero_readers_rejected() {
        let ring = MultiReadRing::<i16>::new(4, 2).unwrap();
        assert!(matches!(
            ring.set_num_readers(0),
            Err(RingError::OutOfRange { .. })
        ));
        assert_eq!(ring.num_readers(), 1);
    }

    #[test]
    fn test_reader_count_change_mid_flight() {
        let ring = MultiReadRing::<i16>::new(4, 2).unwrap();
        ring.set_num_readers(3).unwrap();
        ring.write(&[1, 2, 3, 4], false);

        // Two of three readers have reported when the third disconnects.
        ring.report_read(4);
        ring.report_read(4);
        ring.set_num_readers(2).unwrap();

        // Pending count is taken modulo the new reader count on the next
        // report: 2 + 1 ≡ 1 (mod 2), so another report completes it.
        ring.report_read(4);
        assert_eq!(ring.buffered(), 4);
        ring.report_read(4);
        assert_eq!(ring.buffered(), 0);
    }

    #[test]
    fn test_partial_chunk_reads_share_offsets() {
        let ring = MultiReadRing::<i16>::new(4, 2).unwrap();
        ring.set_num_readers(2).unwrap();
        ring.write(&[10, 20, 30, 40], false);

        // Both readers consume the first half before either sees the second.
        let a = ring.with_unread(|s| s[..2].to_vec());
        ring.report_read(2);
        let b = ring.with_unread(|s| s[..2].to_vec());
        ring.report_read(2);
        assert_eq!(a, b);

        let c = ring.with_unread(|s| s[..2].to_vec());
        assert_eq!(c, vec![30, 40]);
    }

    #[test]
    fn test_report_read_bytes_checks_width() {
        let ring = MultiReadRing::<i16>::new(4, 2).unwrap();
        assert!(matches!(
            ring.report_read_bytes(3),
            Err(RingError::NonMultipleByteCount { count: 3, width: 2 })
        ));
    }
}
