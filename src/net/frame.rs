//! Wire framing: one transmission is an audio chunk followed by the
//! metadata frame.
//!
//! Both peers must agree on the two lengths; there is no header on the
//! wire, the stream is a fixed cadence of `chunk_bytes + metadata_len`
//! sized units delivered at most once each.

use crate::error::MetadataError;
use crate::timecode::MetadataFrame;

/// Layout of one transmission on the socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransmissionFrame {
    chunk_bytes: usize,
    metadata_len: usize,
}

impl TransmissionFrame {
    /// Builds the layout from the two section lengths.
    #[must_use]
    pub fn new(chunk_bytes: usize, metadata_len: usize) -> Self {
        Self {
            chunk_bytes,
            metadata_len,
        }
    }

    /// Audio chunk length in bytes.
    #[must_use]
    pub fn chunk_bytes(&self) -> usize {
        self.chunk_bytes
    }

    /// Metadata section length in bytes.
    #[must_use]
    pub fn metadata_len(&self) -> usize {
        self.metadata_len
    }

    /// Total bytes of one transmission.
    #[must_use]
    pub fn len(&self) -> usize {
        self.chunk_bytes + self.metadata_len
    }

    /// True only for a degenerate zero-length layout.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Writes the metadata tail into a transmission buffer whose chunk
    /// section has already been filled.
    pub fn encode_metadata(&self, buf: &mut [u8], metadata: &MetadataFrame) {
        debug_assert_eq!(buf.len(), self.len());
        buf[self.chunk_bytes..].copy_from_slice(metadata.as_bytes());
    }

    /// Splits a received transmission into its chunk and metadata sections.
    #[must_use]
    pub fn split<'a>(&self, buf: &'a [u8]) -> (&'a [u8], &'a [u8]) {
        debug_assert_eq!(buf.len(), self.len());
        buf.split_at(self.chunk_bytes)
    }

    /// Decodes the metadata tail of a received transmission into `frame`.
    pub fn decode_metadata(
        &self,
        buf: &[u8],
        frame: &mut MetadataFrame,
    ) -> Result<(), MetadataError> {
        let (_, tail) = self.split(buf);
        frame.copy_from(tail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timecode::Timecode;

    #[test]
    fn test_layout_lengths() {
        let frame = TransmissionFrame::new(64, 128);
        assert_eq!(frame.len(), 192);
        assert_eq!(frame.chunk_bytes(), 64);
        assert_eq!(frame.metadata_len(), 128);
    }

    #[test]
    fn test_encode_then_split_round_trip() {
        let layout = TransmissionFrame::new(8, 32);
        let mut metadata = MetadataFrame::new(32).unwrap();
        metadata.set_timecode(Timecode::new(10, 20, 30, 12));

        let mut wire = vec![0u8; layout.len()];
        wire[..8].copy_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]);
        layout.encode_metadata(&mut wire, &metadata);

        let (chunk, tail) = layout.split(&wire);
        assert_eq!(chunk, &[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(tail, metadata.as_bytes());

        let mut decoded = MetadataFrame::new(32).unwrap();
        layout.decode_metadata(&wire, &mut decoded).unwrap();
        assert_eq!(decoded.timecode(), Timecode::new(10, 20, 30, 12));
    }

    #[test]
    fn test_decode_rejects_mismatched_frame() {
        let layout = TransmissionFrame::new(8, 32);
        let wire = vec![0u8; layout.len()];
        let mut wrong_size = MetadataFrame::new(64).unwrap();
        assert!(layout.decode_metadata(&wire, &mut wrong_size).is_err());
    }
}
