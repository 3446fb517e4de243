//! Error types for aircast.
//!
//! Errors are split into two tiers:
//! - **Fatal errors** ([`LinkError`]): prevent a link from starting; the
//!   process is expected to restart after one of these.
//! - **Component errors** ([`RingError`], [`MetadataError`], [`BusError`]):
//!   contract violations surfaced by the individual building blocks. Inside
//!   the running loops these are logged and the affected iteration is
//!   abandoned; they never cross a loop boundary.

/// Errors raised by the ring buffer when its sizing or access contract is
/// violated.
///
/// Sizing errors are returned at construction time. Access errors
/// (`ReadUnderrun`, `NonMultipleByteCount`) are returned by the read/write
/// entry points; out-of-contract rotation arguments are checked with
/// `debug_assert!` and clamped to safe values in release builds.
#[derive(Debug, thiserror::Error)]
pub enum RingError {
    /// The ring must hold at least two slots so the cursors can rotate.
    #[error("ring must contain at least 2 slots (got {got})")]
    RingTooShort {
        /// Requested slot count.
        got: usize,
    },

    /// Slot lengths must be even.
    #[error("slot length must be even (got {len})")]
    UnevenSlotLength {
        /// Requested slot length in samples.
        len: usize,
    },

    /// The slot length must be divisible by the ring length.
    #[error("slot length {len} is not a multiple of ring length {ring}")]
    NonMultipleSlotLength {
        /// Requested slot length in samples.
        len: usize,
        /// Requested slot count.
        ring: usize,
    },

    /// The total ring byte size would overflow the addressable range.
    #[error("{ring} slots of {len} samples overflow the addressable range")]
    CapacityOverflow {
        /// Requested slot length in samples.
        len: usize,
        /// Requested slot count.
        ring: usize,
    },

    /// A byte-granular call was handed a length that does not divide into
    /// whole samples.
    #[error("byte count {count} is not a multiple of the {width}-byte sample width")]
    NonMultipleByteCount {
        /// Offending byte count.
        count: usize,
        /// Sample width in bytes.
        width: usize,
    },

    /// A slot read was requested while no completed slot was buffered.
    #[error("read requested while no slot is buffered")]
    ReadUnderrun,

    /// A length argument exceeded the region it addresses.
    #[error("{what} of {got} exceeds the limit of {limit}")]
    OutOfRange {
        /// What was being sized.
        what: &'static str,
        /// Offending value.
        got: usize,
        /// Maximum permitted value.
        limit: usize,
    },
}

/// Errors raised by the metadata frame.
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    /// The frame is too small to hold the encoded timecode.
    #[error("metadata frame of {len} bytes cannot hold the {min}-byte timecode")]
    FrameTooSmall {
        /// Requested frame length.
        len: usize,
        /// Minimum frame length.
        min: usize,
    },

    /// An incoming payload does not match the configured frame length.
    #[error("metadata payload of {got} bytes does not match frame length {expected}")]
    LengthMismatch {
        /// Payload length received.
        got: usize,
        /// Configured frame length.
        expected: usize,
    },
}

/// Errors raised by the PCM bus adapter.
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    /// The bus was used before `start()`.
    #[error("bus not started")]
    NotStarted,

    /// Only mono and stereo are supported.
    #[error("unsupported channel count: {0} (must be 1 or 2)")]
    UnsupportedChannels(u16),

    /// Bit depth outside {8, 16, 24, 32}.
    #[error("unsupported bit depth: {0}")]
    UnsupportedBitDepth(u16),

    /// The peripheral transferred fewer bytes than requested within the
    /// tick budget.
    #[error("short transfer: expected {expected} bytes, moved {got}")]
    ShortTransfer {
        /// Bytes requested.
        expected: usize,
        /// Bytes actually moved.
        got: usize,
    },

    /// An underlying I/O failure.
    #[error("bus i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Fatal errors that prevent an audio link from starting.
///
/// These are returned from [`AudioLinkBuilder::start()`] and mean the link
/// cannot be created; per the device contract the caller restarts the
/// process. Runtime trouble (a dropped client, a failed send) is surfaced
/// via [`LinkEvent`](crate::LinkEvent) instead and never tears the link
/// down.
///
/// [`AudioLinkBuilder::start()`]: crate::AudioLinkBuilder::start
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// The ring layout is invalid.
    #[error("invalid ring layout: {0}")]
    Ring(#[from] RingError),

    /// The metadata layout is invalid.
    #[error("invalid metadata layout: {0}")]
    Metadata(#[from] MetadataError),

    /// The bus configuration is invalid or the bus failed to start.
    #[error("bus configuration failed: {0}")]
    Bus(#[from] BusError),

    /// No PCM bus was configured before starting.
    #[error("no PCM bus configured - provide one with bus()")]
    NoBusConfigured,

    /// The chunk size must divide the slot so whole transmissions map onto
    /// slot boundaries.
    #[error("chunk of {chunk} bytes does not divide the {slot}-byte slot")]
    ChunkMisaligned {
        /// Configured transmission chunk in bytes.
        chunk: usize,
        /// Slot size in bytes.
        slot: usize,
    },

    /// The configured bit depth does not match the sample type the link was
    /// built with.
    #[error("bit depth {depth} does not fit the {type_name} sample type")]
    SampleDepthMismatch {
        /// Configured bit depth.
        depth: u16,
        /// Name of the Rust sample type in use.
        type_name: &'static str,
    },

    /// The radio interface failed to start.
    #[error("radio failed to start: {source}")]
    Radio {
        /// Underlying driver error.
        source: std::io::Error,
    },

    /// Station association gave up after exhausting the retry budget.
    #[error("wifi association failed after {retries} retries")]
    WifiFailed {
        /// Number of attempts made.
        retries: u32,
    },

    /// The transmitter could not bind its listening socket.
    #[error("failed to bind listener on port {port}: {source}")]
    Bind {
        /// Requested port.
        port: u16,
        /// Underlying socket error.
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_error_display() {
        let err = RingError::RingTooShort { got: 1 };
        assert_eq!(err.to_string(), "ring must contain at least 2 slots (got 1)");
    }

    #[test]
    fn test_byte_count_error_display() {
        let err = RingError::NonMultipleByteCount { count: 7, width: 2 };
        assert!(err.to_string().contains('7'));
        assert!(err.to_string().contains("2-byte"));
    }

    #[test]
    fn test_metadata_error_display() {
        let err = MetadataError::FrameTooSmall { len: 8, min: 16 };
        assert_eq!(
            err.to_string(),
            "metadata frame of 8 bytes cannot hold the 16-byte timecode"
        );
    }

    #[test]
    fn test_link_error_from_ring_error() {
        let err: LinkError = RingError::ReadUnderrun.into();
        assert!(matches!(err, LinkError::Ring(RingError::ReadUnderrun)));
    }

    #[test]
    fn test_bus_error_from_io() {
        let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "budget exceeded");
        let err: BusError = io.into();
        assert!(err.to_string().contains("budget exceeded"));
    }
}
