//! Timecode labels and the fixed-size metadata frame.
//!
//! Every transmission carries a metadata frame behind the audio chunk. The
//! first [`TIMECODE_BYTES`] encode the timecode as four little-endian `i32`
//! values `(hours, minutes, seconds, frames)`; the remainder of the frame is
//! reserved and zero-filled. The width and byte order are fixed so units
//! with different native word sizes stay interoperable.

use crate::error::MetadataError;

/// Bytes occupied by the encoded timecode at the head of a metadata frame.
pub const TIMECODE_BYTES: usize = 16;

/// A four-field timecode label `(hours, minutes, seconds, frames)`.
///
/// The link does not interpret or synchronize timecode; the transmitter
/// stamps outgoing chunks with whatever label it currently holds and
/// receivers merely decode it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Timecode {
    /// Hours field.
    pub hours: i32,
    /// Minutes field.
    pub minutes: i32,
    /// Seconds field.
    pub seconds: i32,
    /// Frames field.
    pub frames: i32,
}

impl Timecode {
    /// Creates a timecode from its four fields.
    #[must_use]
    pub fn new(hours: i32, minutes: i32, seconds: i32, frames: i32) -> Self {
        Self {
            hours,
            minutes,
            seconds,
            frames,
        }
    }

    /// Encodes the timecode into `dst[..TIMECODE_BYTES]`.
    pub(crate) fn encode(&self, dst: &mut [u8]) {
        for (i, field) in [self.hours, self.minutes, self.seconds, self.frames]
            .into_iter()
            .enumerate()
        {
            dst[i * 4..i * 4 + 4].copy_from_slice(&field.to_le_bytes());
        }
    }

    /// Decodes a timecode from `src[..TIMECODE_BYTES]`.
    pub(crate) fn decode(src: &[u8]) -> Self {
        let field = |i: usize| {
            i32::from_le_bytes([src[i * 4], src[i * 4 + 1], src[i * 4 + 2], src[i * 4 + 3]])
        };
        Self {
            hours: field(0),
            minutes: field(1),
            seconds: field(2),
            frames: field(3),
        }
    }
}

impl std::fmt::Display for Timecode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}:{:02}",
            self.hours, self.minutes, self.seconds, self.frames
        )
    }
}

/// The fixed-size metadata block appended to every transmission.
///
/// # Example
///
/// ```
/// use aircast::{MetadataFrame, Timecode};
///
/// let mut frame = MetadataFrame::new(128).unwrap();
/// frame.set_timecode(Timecode::new(23, 59, 59, 29));
///
/// let mut copy = MetadataFrame::new(128).unwrap();
/// copy.copy_from(frame.as_bytes()).unwrap();
/// assert_eq!(copy.timecode(), Timecode::new(23, 59, 59, 29));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataFrame {
    bytes: Box<[u8]>,
}

impl MetadataFrame {
    /// Creates a zero-filled frame of `len` bytes.
    ///
    /// Fails with [`MetadataError::FrameTooSmall`] when `len` cannot hold
    /// the encoded timecode.
    pub fn new(len: usize) -> Result<Self, MetadataError> {
        if len < TIMECODE_BYTES {
            return Err(MetadataError::FrameTooSmall {
                len,
                min: TIMECODE_BYTES,
            });
        }
        Ok(Self {
            bytes: vec![0u8; len].into_boxed_slice(),
        })
    }

    /// Frame length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns true if the frame holds no bytes. Never the case for a
    /// constructed frame; present for slice-like completeness.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Stamps a new timecode into the head of the frame.
    pub fn set_timecode(&mut self, timecode: Timecode) {
        timecode.encode(&mut self.bytes[..TIMECODE_BYTES]);
    }

    /// Decodes the timecode currently held by the frame.
    #[must_use]
    pub fn timecode(&self) -> Timecode {
        Timecode::decode(&self.bytes[..TIMECODE_BYTES])
    }

    /// Replaces the whole frame with an incoming payload.
    ///
    /// Fails with [`MetadataError::LengthMismatch`] when the payload length
    /// differs from the frame length.
    pub fn copy_from(&mut self, payload: &[u8]) -> Result<(), MetadataError> {
        if payload.len() != self.bytes.len() {
            return Err(MetadataError::LengthMismatch {
                got: payload.len(),
                expected: self.bytes.len(),
            });
        }
        self.bytes.copy_from_slice(payload);
        Ok(())
    }

    /// The raw frame contents.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}
