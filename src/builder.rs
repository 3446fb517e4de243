//! Builder wiring a link endpoint together for its role.

use std::marker::PhantomData;
use std::net::SocketAddrV4;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::net::TcpListener;

use crate::config::{AudioFormat, LinkConfig, RadioConfig, RingConfig};
use crate::error::LinkError;
use crate::event::{event_callback, EventCallback, LinkEvent};
use crate::i2s::PcmBus;
use crate::io::{spawn_capture_worker, spawn_playback_worker};
use crate::net::wifi::{WifiDriver, WifiSupervisor};
use crate::net::{MacAddr, ReceiverLoop, Registry, TransmissionFrame, TransmitterLoop};
use crate::ring::MultiReadRing;
use crate::sample::Sample;
use crate::session::{LinkSession, LinkState};
use crate::timecode::MetadataFrame;

/// Which side of the link this unit is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkRole {
    /// Soft-AP + TCP server: capture audio and broadcast it.
    Transmit,
    /// Station + TCP client: pull audio and play it out.
    #[default]
    Receive,
}

/// Entry point mirroring the builder idiom.
///
/// # Example
///
/// ```ignore
/// use aircast::{AudioLink, LinkRole};
/// use aircast::i2s::{BusConfig, MockBus};
///
/// let session = AudioLink::builder()
///     .role(LinkRole::Transmit)
///     .bus(MockBus::new(BusConfig::default()))
///     .on_event(|event| tracing::warn!(?event, "link event"))
///     .start()
///     .await?;
/// ```
pub struct AudioLink;

impl AudioLink {
    /// Creates a builder for the default 16-bit sample type.
    #[must_use]
    pub fn builder() -> AudioLinkBuilder {
        AudioLinkBuilder::new()
    }
}

/// Builder for configuring and starting an audio link.
///
/// Generic over the PCM element type; use
/// `AudioLinkBuilder::<i32>::new()` for 24-in-32 or 32-bit streams.
#[must_use]
pub struct AudioLinkBuilder<T: Sample = i16> {
    config: LinkConfig,
    role: LinkRole,
    bus: Option<Box<dyn PcmBus>>,
    wifi: Option<Arc<dyn WifiDriver>>,
    callback: Option<EventCallback>,
    mac: Option<MacAddr>,
    _sample: PhantomData<T>,
}

impl<T: Sample> Default for AudioLinkBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Sample> AudioLinkBuilder<T> {
    /// Creates a builder with default settings.
    pub fn new() -> Self {
        Self {
            config: LinkConfig::default(),
            role: LinkRole::default(),
            bus: None,
            wifi: None,
            callback: None,
            mac: None,
            _sample: PhantomData,
        }
    }

    /// Sets the link role. Default: receive.
    pub fn role(mut self, role: LinkRole) -> Self {
        self.role = role;
        self
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: LinkConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the PCM format.
    pub fn audio(mut self, audio: AudioFormat) -> Self {
        self.config.audio = audio;
        self
    }

    /// Sets the ring shape.
    pub fn ring(mut self, ring: RingConfig) -> Self {
        self.config.ring = ring;
        self
    }

    /// Sets the radio parameters.
    pub fn radio(mut self, radio: RadioConfig) -> Self {
        self.config.radio = radio;
        self
    }

    /// Sets the TCP port the transmitter binds. Use 0 for an ephemeral
    /// port and read it back from [`LinkSession::local_addr`].
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Sets the transmitter address a receiver dials.
    pub fn transmitter(mut self, target: SocketAddrV4) -> Self {
        self.config.transmitter = target;
        self
    }

    /// Provides the PCM bus. Required.
    pub fn bus<B: PcmBus + 'static>(mut self, bus: B) -> Self {
        self.bus = Some(Box::new(bus));
        self
    }

    /// Provides the radio driver. Without one the socket layer runs over
    /// whatever network the host already has (wired or test loopback).
    pub fn wifi<W: WifiDriver>(mut self, driver: W) -> Self {
        self.wifi = Some(Arc::new(driver));
        self
    }

    /// Overrides the identity MAC a receiver presents. Defaults to the
    /// radio driver's MAC, or a locally administered placeholder without
    /// a radio.
    pub fn mac(mut self, mac: MacAddr) -> Self {
        self.mac = Some(mac);
        self
    }

    /// Registers a callback for runtime events.
    pub fn on_event<F>(mut self, callback: F) -> Self
    where
        F: Fn(LinkEvent) + Send + Sync + 'static,
    {
        self.callback = Some(event_callback(callback));
        self
    }

    /// Validates the configuration, brings up the radio for the chosen
    /// role and starts the workers.
    ///
    /// # Errors
    ///
    /// Any [`LinkError`] here is fatal: nothing was started and, per the
    /// device contract, the caller restarts the process.
    pub async fn start(mut self) -> Result<LinkSession<T>, LinkError> {
        self.config.audio.validate()?;
        if !T::supports(self.config.audio.bit_depth) {
            return Err(LinkError::SampleDepthMismatch {
                depth: self.config.audio.bit_depth.bits(),
                type_name: T::NAME,
            });
        }

        let chunk = self.config.chunk_bytes();
        let slot_bytes = self.config.slot_bytes();
        if chunk == 0 || chunk % T::WIDTH != 0 || slot_bytes % chunk != 0 {
            return Err(LinkError::ChunkMisaligned {
                chunk,
                slot: slot_bytes,
            });
        }

        let metadata = Arc::new(Mutex::new(MetadataFrame::new(self.config.metadata_len)?));
        let frame = TransmissionFrame::new(chunk, self.config.metadata_len);

        let ring = Arc::new(MultiReadRing::<T>::new(
            self.config.ring.slot_len,
            self.config.ring.ring_len,
        )?);
        ring.set_num_readers(1)?;

        let mut bus = self.bus.take().ok_or(LinkError::NoBusConfigured)?;
        bus.start()?;

        let state = Arc::new(LinkState::new());
        let mut tasks = Vec::new();

        match self.role {
            LinkRole::Transmit => {
                let registry = Arc::new(Mutex::new(Registry::new(self.config.radio.max_stations)));

                if let Some(driver) = &self.wifi {
                    let supervisor =
                        WifiSupervisor::new(Arc::clone(driver), self.config.radio.clone())
                            .with_registry(Arc::clone(&registry))
                            .with_event_callback(self.callback.clone());
                    tasks.push(supervisor.start_access_point().await?);
                    supervisor.await_ready().await?;
                }

                let listener = TcpListener::bind(("0.0.0.0", self.config.port))
                    .await
                    .map_err(|source| LinkError::Bind {
                        port: self.config.port,
                        source,
                    })?;
                let local_addr = listener.local_addr().ok();

                let io_worker = spawn_capture_worker(
                    Arc::clone(&ring),
                    bus,
                    Arc::clone(&state),
                    self.config.yield_every,
                    self.callback.clone(),
                );

                let server = Arc::new(TransmitterLoop {
                    ring: Arc::clone(&ring),
                    registry: Arc::clone(&registry),
                    metadata: Arc::clone(&metadata),
                    frame,
                    state: Arc::clone(&state),
                    callback: self.callback.clone(),
                    yield_every: self.config.yield_every,
                });
                tasks.push(tokio::spawn(server.run(listener)));

                Ok(LinkSession::new(
                    state,
                    self.role,
                    ring,
                    metadata,
                    Some(registry),
                    local_addr,
                    io_worker,
                    tasks,
                ))
            }
            LinkRole::Receive => {
                if let Some(driver) = &self.wifi {
                    let supervisor =
                        WifiSupervisor::new(Arc::clone(driver), self.config.radio.clone())
                            .with_event_callback(self.callback.clone());
                    tasks.push(supervisor.start_station().await?);
                    let ip = supervisor.await_ready().await?;
                    tracing::info!(%ip, "station ready");
                }

                let mac = self
                    .mac
                    .or_else(|| self.wifi.as_ref().map(|d| d.mac()))
                    .unwrap_or(MacAddr([0x02, 0, 0, 0, 0, 0x01]));

                let io_worker = spawn_playback_worker(
                    Arc::clone(&ring),
                    bus,
                    Arc::clone(&state),
                    self.config.yield_every,
                );

                let client = Arc::new(ReceiverLoop {
                    ring: Arc::clone(&ring),
                    metadata: Arc::clone(&metadata),
                    frame,
                    state: Arc::clone(&state),
                    callback: self.callback.clone(),
                    yield_every: self.config.yield_every,
                    mac,
                    target: self.config.transmitter,
                    reconnect_delay: self.config.reconnect_delay,
                });
                tasks.push(tokio::spawn(client.run()));

                Ok(LinkSession::new(
                    state,
                    self.role,
                    ring,
                    metadata,
                    None,
                    None,
                    io_worker,
                    tasks,
                ))
            }
        }
    }
}
