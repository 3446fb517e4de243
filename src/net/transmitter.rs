//! The transmitter: accept loop and per-client send loops.
//!
//! Inbound connections identify themselves with a 6-byte station MAC
//! before any audio flows; the registry reuses the entry for a returning
//! MAC and purges disconnected peers when it outgrows the station cap.
//! Each client gets its own task reading the shared ring through the
//! multi-reader quorum, so one slot serves every client without
//! per-client buffers.

use std::net::{IpAddr, Ipv4Addr};
use std::sync::atomic::Ordering;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use crate::event::{emit, EventCallback, LinkEvent};
use crate::net::registry::{Peer, Registry};
use crate::net::{MacAddr, TransmissionFrame, MAC_LEN};
use crate::pace::Pacer;
use crate::ring::MultiReadRing;
use crate::sample::Sample;
use crate::session::LinkState;
use crate::timecode::MetadataFrame;

pub(crate) struct TransmitterLoop<T: Sample> {
    pub(crate) ring: Arc<MultiReadRing<T>>,
    pub(crate) registry: Arc<Mutex<Registry>>,
    pub(crate) metadata: Arc<Mutex<MetadataFrame>>,
    pub(crate) frame: TransmissionFrame,
    pub(crate) state: Arc<LinkState>,
    pub(crate) callback: Option<EventCallback>,
    pub(crate) yield_every: u32,
}

impl<T: Sample> TransmitterLoop<T> {
    /// Accepts clients until the listener dies or the link stops.
    pub(crate) async fn run(self: Arc<Self>, listener: TcpListener) {
        tracing::info!(addr = ?listener.local_addr().ok(), "transmitter listening");
        while self.state.is_running() {
            let (stream, addr) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(error) => {
                    tracing::error!(%error, "accept failed, stopping server");
                    return;
                }
            };
            let ip = match addr.ip() {
                IpAddr::V4(v4) => v4,
                IpAddr::V6(_) => Ipv4Addr::UNSPECIFIED,
            };
            if let Err(error) = self.admit(stream, ip).await {
                tracing::warn!(%error, "client identification failed");
            }
        }
    }

    /// Reads the client's identity and hands it to a serving task.
    async fn admit(self: &Arc<Self>, mut stream: TcpStream, ip: Ipv4Addr) -> std::io::Result<()> {
        let mut octets = [0u8; MAC_LEN];
        stream.read_exact(&mut octets).await?;
        let mac = MacAddr(octets);

        let (peer, reconnect, purged) = self.registry.lock().admit(mac);
        if purged > 0 {
            tracing::info!(purged, "purged disconnected peers");
            emit(&self.callback, LinkEvent::ClientsPurged { removed: purged });
        }
        let generation = peer.begin_connection(ip);
        tracing::info!(%mac, %ip, reconnect, "client connected");
        emit(&self.callback, LinkEvent::ClientConnected { mac, reconnect });

        // The ring pre-allocates one reader slot, so the first client does
        // not raise the quorum; each further client adds itself.
        let active = self.state.clients_connected.fetch_add(1, Ordering::SeqCst) + 1;
        if active > 1 {
            let _ = self.ring.set_num_readers(active);
        }

        tokio::spawn(Arc::clone(self).serve_client(stream, peer, generation));
        Ok(())
    }

    /// Streams chunk+metadata transmissions to one client until it
    /// disconnects or is superseded by a newer connection of the same MAC.
    async fn serve_client(self: Arc<Self>, mut stream: TcpStream, peer: Arc<Peer>, generation: u64) {
        let chunk = self.frame.chunk_bytes();
        let mut wire = vec![0u8; self.frame.len()];
        let mut pacer = Pacer::new(self.yield_every);

        while self.state.is_running() && peer.is_socket_connected() && peer.is_current(generation) {
            if self.ring.bytes_buffered() >= chunk && self.ring.bytes_unread() >= chunk {
                self.ring
                    .with_unread_bytes(|bytes| wire[..chunk].copy_from_slice(&bytes[..chunk]));
                self.frame.encode_metadata(&mut wire, &self.metadata.lock());

                if let Err(error) = stream.write_all(&wire).await {
                    tracing::warn!(mac = %peer.mac(), %error, "send failed");
                    emit(
                        &self.callback,
                        LinkEvent::StreamInterrupted {
                            reason: format!("send to {}: {error}", peer.mac()),
                        },
                    );
                    break;
                }
                let _ = self.ring.report_read_bytes(chunk);
                self.state.transmissions_sent.fetch_add(1, Ordering::SeqCst);
                pacer.breathe(true).await;
            } else {
                pacer.breathe(false).await;
            }
        }

        // Only the live handler may lower the flag; a superseded one just
        // leaves quietly.
        if peer.is_current(generation) {
            peer.mark_socket_disconnected();
        }
        let remaining = self
            .state
            .clients_connected
            .fetch_sub(1, Ordering::SeqCst)
            .saturating_sub(1);
        let _ = self.ring.set_num_readers(remaining.max(1));
        tracing::info!(mac = %peer.mac(), "client handler exited");
        emit(
            &self.callback,
            LinkEvent::ClientDisconnected { mac: peer.mac() },
        );
    }
}
