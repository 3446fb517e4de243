//! Link session lifecycle and statistics.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

use crate::builder::LinkRole;
use crate::net::Registry;
use crate::ring::MultiReadRing;
use crate::sample::Sample;
use crate::timecode::{MetadataFrame, Timecode};

/// Bound on how long shutdown waits for the bus worker thread.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Internal state shared between the session handle and the workers.
pub(crate) struct LinkState {
    pub(crate) running: AtomicBool,
    pub(crate) samples_captured: AtomicU64,
    pub(crate) samples_played: AtomicU64,
    pub(crate) transmissions_sent: AtomicU64,
    pub(crate) transmissions_received: AtomicU64,
    pub(crate) buffer_overruns: AtomicU64,
    pub(crate) reconnects: AtomicU64,
    pub(crate) clients_connected: AtomicUsize,
}

impl LinkState {
    pub(crate) fn new() -> Self {
        Self {
            running: AtomicBool::new(true),
            samples_captured: AtomicU64::new(0),
            samples_played: AtomicU64::new(0),
            transmissions_sent: AtomicU64::new(0),
            transmissions_received: AtomicU64::new(0),
            buffer_overruns: AtomicU64::new(0),
            reconnects: AtomicU64::new(0),
            clients_connected: AtomicUsize::new(0),
        }
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// Statistics snapshot of a running link.
#[derive(Debug, Clone, Default)]
pub struct LinkStats {
    /// Samples pulled from the bus into the ring (transmitter side).
    pub samples_captured: u64,
    /// Samples pushed from the ring to the bus (receiver side).
    pub samples_played: u64,
    /// Transmissions sent across all clients.
    pub transmissions_sent: u64,
    /// Transmissions received from the transmitter.
    pub transmissions_received: u64,
    /// Times the capture side found the ring full and dropped at the
    /// source.
    pub buffer_overruns: u64,
    /// Receiver reconnect attempts.
    pub reconnects: u64,
    /// Clients currently being served (transmitter side).
    pub clients_connected: usize,
}

/// Handle to a running audio link.
///
/// Returned by [`AudioLinkBuilder::start()`]; the link keeps running in
/// the background until [`stop()`](LinkSession::stop) is called or the
/// handle is dropped.
///
/// [`AudioLinkBuilder::start()`]: crate::AudioLinkBuilder::start
pub struct LinkSession<T: Sample = i16> {
    state: Arc<LinkState>,
    role: LinkRole,
    ring: Arc<MultiReadRing<T>>,
    metadata: Arc<Mutex<MetadataFrame>>,
    registry: Option<Arc<Mutex<Registry>>>,
    local_addr: Option<SocketAddr>,
    io_worker: Option<std::thread::JoinHandle<()>>,
    tasks: Vec<JoinHandle<()>>,
}

impl<T: Sample> std::fmt::Debug for LinkSession<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkSession")
            .field("role", &self.role)
            .field("local_addr", &self.local_addr)
            .finish_non_exhaustive()
    }
}

impl<T: Sample> LinkSession<T> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        state: Arc<LinkState>,
        role: LinkRole,
        ring: Arc<MultiReadRing<T>>,
        metadata: Arc<Mutex<MetadataFrame>>,
        registry: Option<Arc<Mutex<Registry>>>,
        local_addr: Option<SocketAddr>,
        io_worker: std::thread::JoinHandle<()>,
        tasks: Vec<JoinHandle<()>>,
    ) -> Self {
        Self {
            state,
            role,
            ring,
            metadata,
            registry,
            local_addr,
            io_worker: Some(io_worker),
            tasks,
        }
    }

    /// The role this link was started in.
    #[must_use]
    pub fn role(&self) -> LinkRole {
        self.role
    }

    /// True until `stop()` runs.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }

    /// Address of the transmitter's listening socket, when transmitting.
    /// Useful when the port was configured as 0.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Current statistics snapshot.
    #[must_use]
    pub fn stats(&self) -> LinkStats {
        LinkStats {
            samples_captured: self.state.samples_captured.load(Ordering::SeqCst),
            samples_played: self.state.samples_played.load(Ordering::SeqCst),
            transmissions_sent: self.state.transmissions_sent.load(Ordering::SeqCst),
            transmissions_received: self.state.transmissions_received.load(Ordering::SeqCst),
            buffer_overruns: self.state.buffer_overruns.load(Ordering::SeqCst),
            reconnects: self.state.reconnects.load(Ordering::SeqCst),
            clients_connected: self.state.clients_connected.load(Ordering::SeqCst),
        }
    }

    /// Number of peers tracked in the registry (transmitter side).
    #[must_use]
    pub fn known_peers(&self) -> usize {
        self.registry.as_ref().map_or(0, |r| r.lock().len())
    }

    /// Stamps the timecode that outgoing transmissions will carry
    /// (transmitter side).
    pub fn set_timecode(&self, timecode: Timecode) {
        self.metadata.lock().set_timecode(timecode);
    }

    /// The timecode currently held: the last one stamped on a transmitter,
    /// the last one received on a receiver.
    #[must_use]
    pub fn timecode(&self) -> Timecode {
        self.metadata.lock().timecode()
    }

    /// Shared handle to the ring, for diagnostics.
    #[must_use]
    pub fn ring(&self) -> Arc<MultiReadRing<T>> {
        Arc::clone(&self.ring)
    }

    /// Gracefully stops the link: signals the workers, cancels the socket
    /// tasks and joins the bus worker thread.
    pub async fn stop(mut self) {
        self.stop_internal().await;
    }

    async fn stop_internal(&mut self) {
        if !self.state.running.swap(false, Ordering::SeqCst) {
            return;
        }

        // Socket tasks block in accept/recv and cannot observe the flag.
        let tasks: Vec<_> = self.tasks.drain(..).collect();
        for task in &tasks {
            task.abort();
        }
        let _ = futures::future::join_all(tasks).await;

        // The bus worker polls the flag every iteration.
        if let Some(worker) = self.io_worker.take() {
            let joined = tokio::time::timeout(
                SHUTDOWN_TIMEOUT,
                tokio::task::spawn_blocking(move || worker.join()),
            )
            .await;
            if joined.is_err() {
                tracing::warn!("bus worker did not stop within timeout");
            }
        }
    }
}

impl<T: Sample> Drop for LinkSession<T> {
    fn drop(&mut self) {
        if self.state.running.swap(false, Ordering::SeqCst) {
            // Dropped without an explicit stop: cancel what we can without
            // blocking; the bus worker exits on its next flag check.
            for task in self.tasks.drain(..) {
                task.abort();
            }
        }
    }
}
