//! Radio supervision for the two link roles.
//!
//! The WiFi hardware is an external collaborator reached through
//! [`WifiDriver`]; it delivers connect/disconnect events and leaves TCP to
//! the socket layer. This module turns the driver's event stream into an
//! explicit state machine - `Idle -> Connecting -> Retrying(k) ->
//! Connected / Failed` - and exposes a single [`await_ready`] primitive
//! instead of raw event bits.
//!
//! In access-point shape the supervisor also keeps the peer registry
//! honest: a station-disconnected event lowers the peer's connection
//! flags so the purge pass can reclaim the entry.
//!
//! [`await_ready`]: WifiSupervisor::await_ready

use std::net::Ipv4Addr;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::config::{RadioConfig, TRANSMITTER_ADDR};
use crate::error::LinkError;
use crate::event::{emit, EventCallback, LinkEvent};
use crate::net::{MacAddr, Registry};

/// Events a radio driver delivers to the supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiEvent {
    /// The soft-AP is up and beaconing.
    ApStarted,
    /// A station associated with the soft-AP.
    StationConnected {
        /// Station MAC.
        mac: MacAddr,
    },
    /// A station dropped off the soft-AP.
    StationDisconnected {
        /// Station MAC.
        mac: MacAddr,
    },
    /// The station interface started.
    StaStarted,
    /// The station lost (or failed to gain) its association.
    StaDisconnected,
    /// The station was assigned an address.
    GotIp(Ipv4Addr),
}

/// Connection state of the radio, driven purely by [`WifiEvent`] inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WifiState {
    /// Nothing started yet.
    #[default]
    Idle,
    /// First association attempt in flight.
    Connecting,
    /// Association attempt `k` of the retry budget in flight.
    Retrying(u32),
    /// Associated and addressed.
    Connected(Ipv4Addr),
    /// Retry budget exhausted.
    Failed,
}

/// The radio hardware interface.
///
/// `start_ap` / `start_sta` bring the interface up and begin delivering
/// events into the supplied channel; `connect` issues one association
/// attempt whose outcome arrives as an event.
#[async_trait]
pub trait WifiDriver: Send + Sync + 'static {
    /// MAC of the local interface; the receiver sends this as its identity.
    fn mac(&self) -> MacAddr;

    /// Starts soft-AP mode.
    async fn start_ap(
        &self,
        radio: &RadioConfig,
        events: mpsc::Sender<WifiEvent>,
    ) -> std::io::Result<()>;

    /// Starts station mode.
    async fn start_sta(
        &self,
        radio: &RadioConfig,
        events: mpsc::Sender<WifiEvent>,
    ) -> std::io::Result<()>;

    /// Issues one association attempt.
    async fn connect(&self) -> std::io::Result<()>;
}

/// Everything the event pump task needs.
struct PumpContext {
    driver: Arc<dyn WifiDriver>,
    radio: RadioConfig,
    state: Arc<watch::Sender<WifiState>>,
    registry: Option<Arc<Mutex<Registry>>>,
    callback: Option<EventCallback>,
}

/// Drives a [`WifiDriver`]'s event stream through the state machine.
pub struct WifiSupervisor {
    driver: Arc<dyn WifiDriver>,
    radio: RadioConfig,
    registry: Option<Arc<Mutex<Registry>>>,
    callback: Option<EventCallback>,
    state: Arc<watch::Sender<WifiState>>,
    state_rx: watch::Receiver<WifiState>,
}

impl WifiSupervisor {
    /// Creates a supervisor over a driver.
    pub fn new(driver: Arc<dyn WifiDriver>, radio: RadioConfig) -> Self {
        let (state, state_rx) = watch::channel(WifiState::Idle);
        Self {
            driver,
            radio,
            registry: None,
            callback: None,
            state: Arc::new(state),
            state_rx,
        }
    }

    /// Attaches the peer registry so station-disconnect events lower the
    /// matching peer's flags (access-point shape).
    #[must_use]
    pub fn with_registry(mut self, registry: Arc<Mutex<Registry>>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Attaches the link event callback.
    #[must_use]
    pub fn with_event_callback(mut self, callback: Option<EventCallback>) -> Self {
        self.callback = callback;
        self
    }

    /// MAC of the local interface.
    #[must_use]
    pub fn mac(&self) -> MacAddr {
        self.driver.mac()
    }

    /// Current state snapshot.
    #[must_use]
    pub fn state(&self) -> WifiState {
        *self.state_rx.borrow()
    }

    fn pump_context(&self) -> PumpContext {
        PumpContext {
            driver: Arc::clone(&self.driver),
            radio: self.radio.clone(),
            state: Arc::clone(&self.state),
            registry: self.registry.clone(),
            callback: self.callback.clone(),
        }
    }

    /// Starts soft-AP mode and spawns the event pump.
    pub async fn start_access_point(&self) -> Result<JoinHandle<()>, LinkError> {
        let (tx, rx) = mpsc::channel(16);
        self.driver
            .start_ap(&self.radio, tx)
            .await
            .map_err(|source| LinkError::Radio { source })?;
        Ok(tokio::spawn(pump(self.pump_context(), rx)))
    }

    /// Starts station mode and spawns the event pump; follow with
    /// [`await_ready`](Self::await_ready).
    pub async fn start_station(&self) -> Result<JoinHandle<()>, LinkError> {
        let (tx, rx) = mpsc::channel(16);
        self.driver
            .start_sta(&self.radio, tx)
            .await
            .map_err(|source| LinkError::Radio { source })?;
        Ok(tokio::spawn(pump(self.pump_context(), rx)))
    }

    /// Blocks until the station is associated and addressed, or the retry
    /// budget is spent.
    pub async fn await_ready(&self) -> Result<Ipv4Addr, LinkError> {
        let mut rx = self.state_rx.clone();
        loop {
            let state = *rx.borrow();
            match state {
                WifiState::Connected(ip) => return Ok(ip),
                WifiState::Failed => {
                    return Err(LinkError::WifiFailed {
                        retries: self.radio.max_retries,
                    })
                }
                _ => {}
            }
            if rx.changed().await.is_err() {
                return Err(LinkError::WifiFailed {
                    retries: self.radio.max_retries,
                });
            }
        }
    }
}

/// The event pump: consumes driver events until the channel closes.
async fn pump(ctx: PumpContext, mut events: mpsc::Receiver<WifiEvent>) {
    let mut retries: u32 = 0;
    while let Some(event) = events.recv().await {
        match event {
            WifiEvent::ApStarted => {
                tracing::info!(ssid = %ctx.radio.ssid, "soft-AP up");
                let _ = ctx.state.send(WifiState::Connected(TRANSMITTER_ADDR));
            }
            WifiEvent::StationConnected { mac } => {
                tracing::info!(%mac, "station associated");
            }
            WifiEvent::StationDisconnected { mac } => {
                tracing::info!(%mac, "station dropped");
                if let Some(registry) = &ctx.registry {
                    if let Some(peer) = registry.lock().find(mac) {
                        peer.mark_disconnected();
                    }
                }
            }
            WifiEvent::StaStarted => {
                let _ = ctx.state.send(WifiState::Connecting);
                if let Err(error) = ctx.driver.connect().await {
                    tracing::warn!(%error, "association attempt failed to issue");
                }
            }
            WifiEvent::StaDisconnected => {
                retries += 1;
                if retries <= ctx.radio.max_retries {
                    tracing::warn!(attempt = retries, "association lost, retrying");
                    let _ = ctx.state.send(WifiState::Retrying(retries));
                    emit(&ctx.callback, LinkEvent::WifiRetry { attempt: retries });
                    if let Err(error) = ctx.driver.connect().await {
                        tracing::warn!(%error, "association attempt failed to issue");
                    }
                } else {
                    tracing::error!(retries, "association retry budget spent");
                    let _ = ctx.state.send(WifiState::Failed);
                }
            }
            WifiEvent::GotIp(ip) => {
                tracing::info!(%ip, "station addressed");
                retries = 0;
                let _ = ctx.state.send(WifiState::Connected(ip));
            }
        }
    }
}

/// A scripted radio driver for tests and simulation.
///
/// Station mode associates after a configurable number of failed
/// attempts; access-point mode comes up immediately. Events can also be
/// injected by hand through [`event_sender`](Self::event_sender), e.g. to
/// simulate a station dropping off the soft-AP.
pub struct MockWifiDriver {
    mac: MacAddr,
    ip: Ipv4Addr,
    flaky_connects: Mutex<u32>,
    events: Mutex<Option<mpsc::Sender<WifiEvent>>>,
}

impl MockWifiDriver {
    /// Creates a driver that associates on the first attempt.
    #[must_use]
    pub fn new(mac: MacAddr, ip: Ipv4Addr) -> Self {
        Self {
            mac,
            ip,
            flaky_connects: Mutex::new(0),
            events: Mutex::new(None),
        }
    }

    /// Makes the next `failures` association attempts fail before one
    /// succeeds.
    #[must_use]
    pub fn with_flaky_connects(self, failures: u32) -> Self {
        *self.flaky_connects.lock() = failures;
        self
    }

    /// Sender into the supervisor's event pump, once started.
    #[must_use]
    pub fn event_sender(&self) -> Option<mpsc::Sender<WifiEvent>> {
        self.events.lock().clone()
    }
}

#[async_trait]
impl WifiDriver for MockWifiDriver {
    fn mac(&self) -> MacAddr {
        self.mac
    }

    async fn start_ap(
        &self,
        _radio: &RadioConfig,
        events: mpsc::Sender<WifiEvent>,
    ) -> std::io::Result<()> {
        let _ = events.send(WifiEvent::ApStarted).await;
        *self.events.lock() = Some(events);
        Ok(())
    }

    async fn start_sta(
        &self,
        _radio: &RadioConfig,
        events: mpsc::Sender<WifiEvent>,
    ) -> std::io::Result<()> {
        let _ = events.send(WifiEvent::StaStarted).await;
        *self.events.lock() = Some(events);
        Ok(())
    }

    async fn connect(&self) -> std::io::Result<()> {
        let event = {
            let mut flaky = self.flaky_connects.lock();
            if *flaky > 0 {
                *flaky -= 1;
                WifiEvent::StaDisconnected
            } else {
                WifiEvent::GotIp(self.ip)
            }
        };
        if let Some(events) = self.event_sender() {
            let _ = events.send(event).await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::event_callback;
    use std::net::Ipv4Addr;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn mac(last: u8) -> MacAddr {
        MacAddr([2, 0, 0, 0, 0, last])
    }

    #[tokio::test]
    async fn test_station_connects_first_try() {
        let driver = Arc::new(MockWifiDriver::new(mac(1), Ipv4Addr::new(192, 168, 4, 2)));
        let supervisor = WifiSupervisor::new(driver, RadioConfig::default());

        let _pump = supervisor.start_station().await.unwrap();
        let ip = supervisor.await_ready().await.unwrap();
        assert_eq!(ip, Ipv4Addr::new(192, 168, 4, 2));
        assert!(matches!(supervisor.state(), WifiState::Connected(_)));
    }

    #[tokio::test]
    async fn test_station_retries_then_connects() {
        let retries_seen = Arc::new(AtomicU32::new(0));
        let retries_clone = Arc::clone(&retries_seen);

        let driver = Arc::new(
            MockWifiDriver::new(mac(1), Ipv4Addr::new(192, 168, 4, 2)).with_flaky_connects(2),
        );
        let supervisor = WifiSupervisor::new(driver, RadioConfig::default())
            .with_event_callback(Some(event_callback(move |event| {
                if matches!(event, LinkEvent::WifiRetry { .. }) {
                    retries_clone.fetch_add(1, Ordering::SeqCst);
                }
            })));

        let _pump = supervisor.start_station().await.unwrap();
        supervisor.await_ready().await.unwrap();
        assert_eq!(retries_seen.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_station_fails_after_budget() {
        let mut radio = RadioConfig::default();
        radio.max_retries = 3;
        let driver = Arc::new(
            MockWifiDriver::new(mac(1), Ipv4Addr::new(192, 168, 4, 2)).with_flaky_connects(10),
        );
        let supervisor = WifiSupervisor::new(driver, radio);

        let _pump = supervisor.start_station().await.unwrap();
        let err = supervisor.await_ready().await.unwrap_err();
        assert!(matches!(err, LinkError::WifiFailed { retries: 3 }));
        assert_eq!(supervisor.state(), WifiState::Failed);
    }

    #[tokio::test]
    async fn test_access_point_reports_ready() {
        let driver = Arc::new(MockWifiDriver::new(mac(9), TRANSMITTER_ADDR));
        let supervisor = WifiSupervisor::new(driver, RadioConfig::default());

        let _pump = supervisor.start_access_point().await.unwrap();
        let ip = supervisor.await_ready().await.unwrap();
        assert_eq!(ip, TRANSMITTER_ADDR);
    }

    #[tokio::test]
    async fn test_station_disconnect_clears_peer_flags() {
        let registry = Arc::new(Mutex::new(Registry::new(4)));
        {
            let (peer, _, _) = registry.lock().admit(mac(5));
            peer.begin_connection(Ipv4Addr::new(192, 168, 4, 7));
        }

        let driver = Arc::new(MockWifiDriver::new(mac(9), TRANSMITTER_ADDR));
        let supervisor = WifiSupervisor::new(driver.clone(), RadioConfig::default())
            .with_registry(Arc::clone(&registry));
        let _pump = supervisor.start_access_point().await.unwrap();
        supervisor.await_ready().await.unwrap();

        driver
            .event_sender()
            .unwrap()
            .send(WifiEvent::StationDisconnected { mac: mac(5) })
            .await
            .unwrap();

        // Give the pump a moment to apply the event.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        let peer = registry.lock().find(mac(5)).unwrap();
        assert!(!peer.is_socket_connected());
        assert!(!peer.is_network_connected());
    }
}
