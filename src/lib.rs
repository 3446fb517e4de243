//! # aircast
//!
//! **Note:** This crate is under active development. The API may change before 1.0.
//!
//! Point-to-multipoint wireless audio transport.
//!
//! One unit runs as a **transmitter** (soft access point + TCP server):
//! it pulls PCM from its codec and broadcasts fixed-size transmissions -
//! an audio chunk followed by a timecode-bearing metadata frame - to every
//! connected receiver. Each **receiver** (station + TCP client) joins the
//! transmitter's network, identifies itself with its MAC, pulls the stream
//! and plays it out on its own codec.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use aircast::{AudioLink, LinkRole, Timecode};
//! use aircast::i2s::{BusConfig, MockBus};
//!
//! let session = AudioLink::builder()
//!     .role(LinkRole::Transmit)
//!     .bus(MockBus::new(BusConfig::default()))
//!     .on_event(|event| tracing::warn!(?event, "link event"))
//!     .start()
//!     .await?;
//!
//! session.set_timecode(Timecode::new(10, 20, 30, 0));
//! // stream runs in the background...
//! session.stop().await;
//! ```
//!
//! ## Architecture
//!
//! The crate maintains a strict thread boundary:
//!
//! - **Bus worker thread**: blocking codec I/O that never waits on a
//!   socket
//! - **Sample ring**: a three-cursor ring buffer absorbing the rate
//!   mismatch between the codec and the network
//! - **Tokio tasks**: the accept loop, one send loop per client, or the
//!   receiver's pull loop
//!
//! The ring's multi-reader quorum lets the transmitter serve N clients
//! from one set of slots: a slot is recycled only after every client has
//! consumed it.

#![warn(missing_docs)]
// Audio plumbing counts samples and bytes in both directions
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap
)]
// unwrap/expect allowed in tests only
#![allow(clippy::unwrap_used)]
#![allow(clippy::missing_panics_doc, clippy::missing_errors_doc)]

mod builder;
mod config;
mod error;
mod event;
mod io;
mod pace;
mod sample;
mod session;
mod timecode;

pub mod i2s;
pub mod net;
pub mod ring;

pub use builder::{AudioLink, AudioLinkBuilder, LinkRole};
pub use config::{
    AudioFormat, BitDepth, LinkConfig, RadioConfig, RingConfig, DEFAULT_PORT, TRANSMITTER_ADDR,
};
pub use error::{BusError, LinkError, MetadataError, RingError};
pub use event::{event_callback, EventCallback, LinkEvent};
pub use net::{MacAddr, Peer, Registry, TransmissionFrame, MAC_LEN};
pub use sample::Sample;
pub use session::{LinkSession, LinkStats};
pub use timecode::{MetadataFrame, Timecode, TIMECODE_BYTES};
