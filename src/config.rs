//! Configuration types for audio links.
//!
//! Everything here has a default matching the reference device build, so
//! `LinkConfig::default()` describes a 48kHz / 16-bit / mono unit with a
//! two-slot ring of 128 samples per slot.

use std::net::{Ipv4Addr, SocketAddrV4};
use std::time::Duration;

use crate::error::BusError;

/// Default TCP port for the audio stream.
pub const DEFAULT_PORT: u16 = 7800;

/// Conventional transmitter address on the soft-AP subnet.
pub const TRANSMITTER_ADDR: Ipv4Addr = Ipv4Addr::new(192, 168, 4, 1);

/// Sample bit depth of the PCM stream.
///
/// The 24-bit depth is carried in 32-bit containers on the bus and in
/// memory ("24-in-32").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BitDepth {
    /// 8 bits per sample.
    Eight,
    /// 16 bits per sample.
    #[default]
    Sixteen,
    /// 24 bits per sample in a 32-bit container.
    TwentyFour,
    /// 32 bits per sample.
    ThirtyTwo,
}

impl BitDepth {
    /// Container width in bytes.
    #[must_use]
    pub fn bytes(self) -> usize {
        match self {
            Self::Eight => 1,
            Self::Sixteen => 2,
            Self::TwentyFour | Self::ThirtyTwo => 4,
        }
    }

    /// Nominal bits per sample.
    #[must_use]
    pub fn bits(self) -> u16 {
        match self {
            Self::Eight => 8,
            Self::Sixteen => 16,
            Self::TwentyFour => 24,
            Self::ThirtyTwo => 32,
        }
    }

    /// Master-clock multiplier required by the codec for this depth.
    ///
    /// 24-bit frames need a 384x MCLK; every other depth runs at 256x.
    #[must_use]
    pub fn mclk_multiple(self) -> u32 {
        match self {
            Self::TwentyFour => 384,
            _ => 256,
        }
    }

    /// Parses a raw bit count.
    pub fn from_bits(bits: u16) -> Result<Self, BusError> {
        match bits {
            8 => Ok(Self::Eight),
            16 => Ok(Self::Sixteen),
            24 => Ok(Self::TwentyFour),
            32 => Ok(Self::ThirtyTwo),
            other => Err(BusError::UnsupportedBitDepth(other)),
        }
    }
}

/// PCM format of the stream both units must agree on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormat {
    /// Sample rate in Hz. Default: 48000.
    pub sample_rate: u32,
    /// Bit depth. Default: 16.
    pub bit_depth: BitDepth,
    /// Channel count, 1 or 2. Default: 1.
    pub channels: u16,
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            bit_depth: BitDepth::default(),
            channels: 1,
        }
    }
}

impl AudioFormat {
    /// Validates the channel count.
    pub fn validate(&self) -> Result<(), BusError> {
        if self.channels == 0 || self.channels > 2 {
            return Err(BusError::UnsupportedChannels(self.channels));
        }
        Ok(())
    }
}

/// Shape of the sample ring between the bus worker and the socket side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingConfig {
    /// Samples per slot. Default: 128.
    pub slot_len: usize,
    /// Slots in the ring. Default: 2.
    pub ring_len: usize,
}

impl Default for RingConfig {
    fn default() -> Self {
        Self {
            slot_len: 128,
            ring_len: 2,
        }
    }
}

/// Radio configuration shared by the soft-AP and the station.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RadioConfig {
    /// Network name. Default: "aircast".
    pub ssid: String,
    /// WPA2-PSK passphrase; an empty string means an open network.
    pub password: String,
    /// Radio channel. Default: 1.
    pub channel: u8,
    /// Maximum station associations the soft-AP accepts; also the peer
    /// registry capacity before disconnected entries are purged. Default: 4.
    pub max_stations: usize,
    /// Station association retry budget before the link reports failure.
    /// Default: 8.
    pub max_retries: u32,
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            ssid: "aircast".to_string(),
            password: String::new(),
            channel: 1,
            max_stations: 4,
            max_retries: 8,
        }
    }
}

/// Full configuration of one link endpoint.
///
/// # Example
///
/// ```
/// use aircast::LinkConfig;
///
/// let config = LinkConfig {
///     port: 9000,
///     ..Default::default()
/// };
/// // 128-sample slots at 16 bit are 256 bytes; quarter-slot chunks apply.
/// assert_eq!(config.chunk_bytes(), 64);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkConfig {
    /// PCM format.
    pub audio: AudioFormat,
    /// Ring shape.
    pub ring: RingConfig,
    /// Radio parameters.
    pub radio: RadioConfig,
    /// TCP port the transmitter listens on and the receiver dials.
    pub port: u16,
    /// Transmitter address the receiver connects to.
    /// Default: 192.168.4.1 on [`DEFAULT_PORT`].
    pub transmitter: SocketAddrV4,
    /// Transmission chunk size in bytes. `None` derives it from the slot
    /// size (see [`chunk_bytes`](Self::chunk_bytes)).
    pub chunk_bytes: Option<usize>,
    /// Metadata frame length in bytes appended to every transmission.
    /// Default: 128.
    pub metadata_len: usize,
    /// Loop iterations between cooperative yields in the worker loops.
    /// A tuning constant, not a correctness requirement. Default: 125.
    pub yield_every: u32,
    /// Delay between receiver reconnect attempts. Default: 500ms.
    pub reconnect_delay: Duration,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            audio: AudioFormat::default(),
            ring: RingConfig::default(),
            radio: RadioConfig::default(),
            port: DEFAULT_PORT,
            transmitter: SocketAddrV4::new(TRANSMITTER_ADDR, DEFAULT_PORT),
            chunk_bytes: None,
            metadata_len: 128,
            yield_every: 125,
            reconnect_delay: Duration::from_millis(500),
        }
    }
}

impl LinkConfig {
    /// Slot size in bytes for the configured depth.
    #[must_use]
    pub fn slot_bytes(&self) -> usize {
        self.ring.slot_len * self.audio.bit_depth.bytes()
    }

    /// Effective transmission chunk size in bytes.
    ///
    /// When not set explicitly, the chunk is a fraction of the slot chosen
    /// so a transmission stays comfortably under typical socket buffer
    /// sizes: slots of at least 1024 bytes send 1/16th per transmission,
    /// at least 512 bytes 1/8th, at least 256 bytes 1/4th, and smaller
    /// slots go out whole.
    #[must_use]
    pub fn chunk_bytes(&self) -> usize {
        if let Some(bytes) = self.chunk_bytes {
            return bytes;
        }
        let slot = self.slot_bytes();
        if slot >= 1024 {
            slot / 16
        } else if slot >= 512 {
            slot / 8
        } else if slot >= 256 {
            slot / 4
        } else {
            slot
        }
    }

    /// Size in bytes of one unit on the wire: audio chunk plus metadata.
    #[must_use]
    pub fn transmission_bytes(&self) -> usize {
        self.chunk_bytes() + self.metadata_len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_depth_bytes() {
        assert_eq!(BitDepth::Eight.bytes(), 1);
        assert_eq!(BitDepth::Sixteen.bytes(), 2);
        assert_eq!(BitDepth::TwentyFour.bytes(), 4);
        assert_eq!(BitDepth::ThirtyTwo.bytes(), 4);
    }

    #[test]
    fn test_bit_depth_mclk_multiple() {
        assert_eq!(BitDepth::TwentyFour.mclk_multiple(), 384);
        assert_eq!(BitDepth::Sixteen.mclk_multiple(), 256);
        assert_eq!(BitDepth::Eight.mclk_multiple(), 256);
        assert_eq!(BitDepth::ThirtyTwo.mclk_multiple(), 256);
    }

    #[test]
    fn test_bit_depth_from_bits() {
        assert_eq!(BitDepth::from_bits(24).unwrap(), BitDepth::TwentyFour);
        assert!(BitDepth::from_bits(12).is_err());
    }

    #[test]
    fn test_audio_format_defaults() {
        let format = AudioFormat::default();
        assert_eq!(format.sample_rate, 48_000);
        assert_eq!(format.bit_depth, BitDepth::Sixteen);
        assert_eq!(format.channels, 1);
        assert!(format.validate().is_ok());
    }

    #[test]
    fn test_audio_format_rejects_bad_channels() {
        let mut format = AudioFormat::default();
        format.channels = 3;
        assert!(matches!(
            format.validate(),
            Err(BusError::UnsupportedChannels(3))
        ));
        format.channels = 0;
        assert!(format.validate().is_err());
    }

    #[test]
    fn test_link_config_defaults() {
        let config = LinkConfig::default();
        assert_eq!(config.ring.slot_len, 128);
        assert_eq!(config.ring.ring_len, 2);
        assert_eq!(config.metadata_len, 128);
        assert_eq!(config.radio.max_retries, 8);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(*config.transmitter.ip(), Ipv4Addr::new(192, 168, 4, 1));
    }

    #[test]
    fn test_chunk_rule_small_slot_sends_whole() {
        // 128 samples * 2 bytes = 256-byte slot -> quarter-slot chunks
        let config = LinkConfig::default();
        assert_eq!(config.slot_bytes(), 256);
        assert_eq!(config.chunk_bytes(), 64);
    }

    #[test]
    fn test_chunk_rule_ladder() {
        let mut config = LinkConfig::default();

        config.ring.slot_len = 512; // 1024 bytes
        assert_eq!(config.chunk_bytes(), 64);

        config.ring.slot_len = 256; // 512 bytes
        assert_eq!(config.chunk_bytes(), 64);

        config.ring.slot_len = 64; // 128 bytes, below every threshold
        assert_eq!(config.chunk_bytes(), 128);
    }

    #[test]
    fn test_chunk_override() {
        let mut config = LinkConfig::default();
        config.chunk_bytes = Some(32);
        assert_eq!(config.chunk_bytes(), 32);
        assert_eq!(config.transmission_bytes(), 32 + 128);
    }
}
