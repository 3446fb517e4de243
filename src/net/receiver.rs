//! The receiver: connect, identify, pull transmissions, reconnect.
//!
//! The receiver dials the transmitter, sends its 6-byte MAC as identity
//! and then pulls fixed-size transmissions off the socket for as long as
//! the stream lasts. Audio lands in the ring only when there is room for
//! a whole chunk - TCP backpressure does the rest. On any socket error
//! the ring is flushed to silence and the outer loop dials again; the
//! retry is unbounded, association-level failures are the radio
//! supervisor's problem.

use std::net::SocketAddrV4;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::event::{emit, EventCallback, LinkEvent};
use crate::net::{MacAddr, TransmissionFrame};
use crate::pace::Pacer;
use crate::ring::MultiReadRing;
use crate::sample::Sample;
use crate::session::LinkState;
use crate::timecode::MetadataFrame;

pub(crate) struct ReceiverLoop<T: Sample> {
    pub(crate) ring: Arc<MultiReadRing<T>>,
    pub(crate) metadata: Arc<Mutex<MetadataFrame>>,
    pub(crate) frame: TransmissionFrame,
    pub(crate) state: Arc<LinkState>,
    pub(crate) callback: Option<EventCallback>,
    pub(crate) yield_every: u32,
    pub(crate) mac: MacAddr,
    pub(crate) target: SocketAddrV4,
    pub(crate) reconnect_delay: Duration,
}

impl<T: Sample> ReceiverLoop<T> {
    /// Dials the transmitter forever, pulling the stream while connected.
    pub(crate) async fn run(self: Arc<Self>) {
        let mut attempt: u64 = 0;
        while self.state.is_running() {
            match TcpStream::connect(self.target).await {
                Ok(mut stream) => {
                    attempt = 0;
                    if let Err(error) = stream.write_all(&self.mac.octets()).await {
                        tracing::warn!(%error, "failed to send identity");
                    } else {
                        tracing::info!(peer = %self.target, mac = %self.mac, "connected");
                        self.pull_stream(&mut stream).await;
                    }
                    // Flush stale audio so a resumed stream starts clean.
                    self.ring.fill(T::default());
                }
                Err(error) => {
                    tracing::warn!(peer = %self.target, %error, "connect failed");
                }
            }
            if !self.state.is_running() {
                break;
            }
            attempt += 1;
            self.state.reconnects.fetch_add(1, Ordering::SeqCst);
            emit(&self.callback, LinkEvent::Reconnecting { attempt });
            tokio::time::sleep(self.reconnect_delay).await;
        }
    }

    /// Pulls whole transmissions until the socket fails or the link stops.
    async fn pull_stream(&self, stream: &mut TcpStream) {
        let chunk = self.frame.chunk_bytes();
        let mut wire = vec![0u8; self.frame.len()];
        let mut pacer = Pacer::new(self.yield_every);

        while self.state.is_running() {
            if self.ring.bytes_available() < chunk || self.ring.bytes_unwritten() < chunk {
                // No room for a whole chunk yet; let the bus drain.
                pacer.breathe(false).await;
                continue;
            }
            match stream.read_exact(&mut wire).await {
                Ok(_) => {
                    let (audio, _) = self.frame.split(&wire);
                    self.ring
                        .with_unwritten_bytes(|buf| buf[..chunk].copy_from_slice(audio));
                    let _ = self.ring.report_written_bytes(chunk);

                    if let Err(error) = self.frame.decode_metadata(&wire, &mut self.metadata.lock())
                    {
                        tracing::warn!(%error, "metadata tail did not decode");
                    }
                    self.state
                        .transmissions_received
                        .fetch_add(1, Ordering::SeqCst);
                    pacer.breathe(true).await;
                }
                Err(error) => {
                    tracing::warn!(%error, "stream lost");
                    emit(
                        &self.callback,
                        LinkEvent::StreamInterrupted {
                            reason: format!("recv: {error}"),
                        },
                    );
                    return;
                }
            }
        }
    }
}
