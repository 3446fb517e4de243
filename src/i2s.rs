//! Blocking PCM bus adapter.
//!
//! The I²S peripheral itself is an external collaborator; this module
//! defines its configuration surface, the [`PcmBus`] trait the workers
//! drive, and a [`MockBus`] for running the pipeline without hardware.
//! Real deployments implement [`PcmBus`] over their codec driver.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::config::AudioFormat;
use crate::error::BusError;
use crate::sample::{bytes_of, Sample};

/// Clock role of the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BusRole {
    /// The unit drives the bus clocks.
    #[default]
    Master,
    /// The codec drives the bus clocks.
    Slave,
}

/// GPIO assignment for the bus lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinMap {
    /// Master clock output.
    pub mclk: u32,
    /// Bit clock.
    pub bclk: u32,
    /// Word select (LR clock).
    pub ws: u32,
    /// Serial data out.
    pub data_out: u32,
    /// Serial data in.
    pub data_in: u32,
}

impl Default for PinMap {
    fn default() -> Self {
        Self {
            mclk: 0,
            bclk: 14,
            ws: 26,
            data_out: 25,
            data_in: 35,
        }
    }
}

/// Polarity flips for the clock lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InvertMask {
    /// Invert the master clock.
    pub mclk: bool,
    /// Invert the bit clock.
    pub bclk: bool,
    /// Invert word select.
    pub ws: bool,
}

/// Full bus configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusConfig {
    /// PCM format on the bus.
    pub format: AudioFormat,
    /// Clock role. Default: master.
    pub role: BusRole,
    /// GPIO assignment.
    pub pins: PinMap,
    /// Clock polarity flips.
    pub invert: InvertMask,
    /// Zero-fill the output on underrun instead of repeating stale data.
    pub auto_clear: bool,
    /// Upper bound a single read or write may block for. Default: 100ms.
    pub tick_budget: Duration,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self::from_format(AudioFormat::default())
    }
}

impl BusConfig {
    /// Builds a bus configuration around a stream format.
    #[must_use]
    pub fn from_format(format: AudioFormat) -> Self {
        Self {
            format,
            role: BusRole::default(),
            pins: PinMap::default(),
            invert: InvertMask::default(),
            auto_clear: true,
            tick_budget: Duration::from_millis(100),
        }
    }

    /// Master clock rate derived from the sample rate and the depth's
    /// required multiplier.
    #[must_use]
    pub fn mclk_rate(&self) -> u32 {
        self.format.sample_rate * self.format.bit_depth.mclk_multiple()
    }

    /// Validates the channel count and depth pairing.
    pub fn validate(&self) -> Result<(), BusError> {
        self.format.validate()
    }
}

/// A blocking PCM peripheral.
///
/// Exactly one thread calls [`read_bytes`](Self::read_bytes) and one calls
/// [`write_bytes`](Self::write_bytes); both block for at most the
/// configured tick budget and report the bytes actually moved.
pub trait PcmBus: Send {
    /// Enables the channel.
    fn start(&mut self) -> Result<(), BusError>;

    /// Disables the channel; `start` may be called again.
    fn stop(&mut self);

    /// Releases the peripheral.
    fn close(&mut self);

    /// Reconfigures the sample clock. The channel is disabled for the
    /// change and re-enabled afterwards if it was running.
    fn set_sample_rate(&mut self, sample_rate: u32) -> Result<(), BusError>;

    /// Reads captured PCM into `dst`, blocking up to the tick budget.
    fn read_bytes(&mut self, dst: &mut [u8]) -> Result<usize, BusError>;

    /// Writes PCM from `src` to the output, blocking up to the tick budget.
    fn write_bytes(&mut self, src: &[u8]) -> Result<usize, BusError>;
}

/// A scripted bus for tests and simulation.
///
/// Reads pop from a queue of scripted input bytes, zero-filling once the
/// script runs dry (the simulation analogue of `auto_clear`); writes are
/// captured for inspection. This lets the whole transmit/receive pipeline
/// run without a codec attached.
///
/// # Example
///
/// ```
/// use aircast::i2s::{BusConfig, MockBus, PcmBus};
///
/// let mut bus = MockBus::new(BusConfig::default());
/// bus.push_samples(&[1i16, 2, 3, 4]);
/// bus.start().unwrap();
///
/// let mut buf = [0u8; 4];
/// assert_eq!(bus.read_bytes(&mut buf).unwrap(), 4);
/// ```
pub struct MockBus {
    config: BusConfig,
    started: bool,
    script: Mutex<VecDeque<u8>>,
    captured: Arc<Mutex<Vec<u8>>>,
    restarts: u32,
}

impl MockBus {
    /// Creates a mock bus with an empty input script.
    #[must_use]
    pub fn new(config: BusConfig) -> Self {
        Self {
            config,
            started: false,
            script: Mutex::new(VecDeque::new()),
            captured: Arc::new(Mutex::new(Vec::new())),
            restarts: 0,
        }
    }

    /// Queues samples the bus will deliver on subsequent reads.
    pub fn push_samples<T: Sample>(&self, samples: &[T]) {
        self.script.lock().extend(bytes_of(samples).iter().copied());
    }

    /// Bytes still queued for reading.
    #[must_use]
    pub fn scripted_len(&self) -> usize {
        self.script.lock().len()
    }

    /// Shared handle to everything written to the bus so far.
    #[must_use]
    pub fn captured(&self) -> Arc<Mutex<Vec<u8>>> {
        Arc::clone(&self.captured)
    }

    /// Number of disable/enable cycles a live reconfiguration caused.
    #[must_use]
    pub fn restarts(&self) -> u32 {
        self.restarts
    }
}

impl PcmBus for MockBus {
    fn start(&mut self) -> Result<(), BusError> {
        self.config.validate()?;
        self.started = true;
        Ok(())
    }

    fn stop(&mut self) {
        self.started = false;
    }

    fn close(&mut self) {
        self.started = false;
        self.script.lock().clear();
    }

    fn set_sample_rate(&mut self, sample_rate: u32) -> Result<(), BusError> {
        let was_running = self.started;
        if was_running {
            self.stop();
        }
        self.config.format.sample_rate = sample_rate;
        if was_running {
            self.start()?;
            self.restarts += 1;
        }
        Ok(())
    }

    fn read_bytes(&mut self, dst: &mut [u8]) -> Result<usize, BusError> {
        if !self.started {
            return Err(BusError::NotStarted);
        }
        let mut script = self.script.lock();
        let have = script.len().min(dst.len());
        for byte in dst.iter_mut().take(have) {
            *byte = script.pop_front().unwrap_or(0);
        }
        drop(script);
        if have < dst.len() {
            if !self.config.auto_clear {
                return Err(BusError::ShortTransfer {
                    expected: dst.len(),
                    got: have,
                });
            }
            for byte in dst.iter_mut().skip(have) {
                *byte = 0;
            }
        }
        Ok(dst.len())
    }

    fn write_bytes(&mut self, src: &[u8]) -> Result<usize, BusError> {
        if !self.started {
            return Err(BusError::NotStarted);
        }
        self.captured.lock().extend_from_slice(src);
        Ok(src.len())
    }
}
