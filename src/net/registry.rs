//! Connected-peer registry keyed on station MAC.
//!
//! The accept loop owns the table; per-client tasks and the radio event
//! pump hold shared handles to individual [`Peer`] records and only touch
//! their atomic flag fields. A reconnecting MAC reuses its entry - the
//! address and socket change, the identity does not.

use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::net::MacAddr;

/// One known peer.
///
/// Created on first inbound connection and kept across reconnects until a
/// capacity purge removes it while disconnected. Each (re)connection bumps
/// a generation counter so a superseded handler can notice it is stale and
/// close its socket instead of shadowing the new one.
#[derive(Debug)]
pub struct Peer {
    mac: MacAddr,
    ip: Mutex<Option<Ipv4Addr>>,
    network_connected: AtomicBool,
    socket_connected: AtomicBool,
    generation: AtomicU64,
}

impl Peer {
    fn new(mac: MacAddr) -> Self {
        Self {
            mac,
            ip: Mutex::new(None),
            network_connected: AtomicBool::new(false),
            socket_connected: AtomicBool::new(false),
            generation: AtomicU64::new(0),
        }
    }

    /// The stable identity.
    #[must_use]
    pub fn mac(&self) -> MacAddr {
        self.mac
    }

    /// Address of the most recent connection, if any.
    #[must_use]
    pub fn ip(&self) -> Option<Ipv4Addr> {
        *self.ip.lock()
    }

    /// True while the peer's station is associated with the radio.
    #[must_use]
    pub fn is_network_connected(&self) -> bool {
        self.network_connected.load(Ordering::Acquire)
    }

    /// True while a socket handler is serving this peer.
    #[must_use]
    pub fn is_socket_connected(&self) -> bool {
        self.socket_connected.load(Ordering::Acquire)
    }

    /// Current connection generation.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Registers a new connection: records the address, raises both flags
    /// and bumps the generation. Returns the generation the new handler
    /// should consider itself current for.
    pub fn begin_connection(&self, ip: Ipv4Addr) -> u64 {
        *self.ip.lock() = Some(ip);
        self.network_connected.store(true, Ordering::Release);
        self.socket_connected.store(true, Ordering::Release);
        self.generation.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// True while `generation` is still the live connection.
    #[must_use]
    pub fn is_current(&self, generation: u64) -> bool {
        self.generation() == generation
    }

    /// Lowers the socket flag; the serving handler exits on its next check.
    pub fn mark_socket_disconnected(&self) {
        self.socket_connected.store(false, Ordering::Release);
    }

    /// Lowers both flags, for a station-disconnected radio event.
    pub fn mark_disconnected(&self) {
        self.network_connected.store(false, Ordering::Release);
        self.socket_connected.store(false, Ordering::Release);
    }
}

/// Ordered table of known peers with unique MACs.
#[derive(Debug)]
pub struct Registry {
    peers: Vec<Arc<Peer>>,
    capacity: usize,
}

impl Registry {
    /// Creates a registry that purges disconnected entries once more than
    /// `capacity` peers are tracked.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            peers: Vec::new(),
            capacity,
        }
    }

    /// Number of tracked peers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    /// True when no peers are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Looks a peer up by MAC, byte-equal compare.
    #[must_use]
    pub fn find(&self, mac: MacAddr) -> Option<Arc<Peer>> {
        self.peers.iter().find(|p| p.mac == mac).cloned()
    }

    /// Admits a connection: reuses the entry for a known MAC, otherwise
    /// appends a new one, purging disconnected entries when the table
    /// would exceed capacity.
    ///
    /// Returns the peer, whether it was reused, and how many entries a
    /// purge removed.
    pub fn admit(&mut self, mac: MacAddr) -> (Arc<Peer>, bool, usize) {
        if let Some(peer) = self.find(mac) {
            return (peer, true, 0);
        }
        let peer = Arc::new(Peer::new(mac));
        self.peers.push(Arc::clone(&peer));
        let mut purged = 0;
        if self.peers.len() > self.capacity {
            purged = self.purge_disconnected();
        }
        (peer, false, purged)
    }

    /// Removes every entry whose socket flag is down, preserving order.
    /// Returns the number removed.
    pub fn purge_disconnected(&mut self) -> usize {
        let before = self.peers.len();
        self.peers.retain(|p| p.is_socket_connected());
        before - self.peers.len()
    }

    /// Iterates the tracked peers in admission order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Peer>> {
        self.peers.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mac(last: u8) -> MacAddr {
        MacAddr([0, 0, 0, 0, 0, last])
    }

    #[test]
    fn test_admit_creates_then_reuses_by_mac() {
        let mut registry = Registry::new(4);
        let (first, reused, _) = registry.admit(mac(1));
        assert!(!reused);

        let (again, reused, _) = registry.admit(mac(1));
        assert!(reused);
        assert!(Arc::ptr_eq(&first, &again));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_find_compares_bytes() {
        let mut registry = Registry::new(4);
        registry.admit(mac(7));
        assert!(registry.find(mac(7)).is_some());
        assert!(registry.find(mac(8)).is_none());
    }

    #[test]
    fn test_purge_removes_only_disconnected_preserving_order() {
        let mut registry = Registry::new(8);
        let (a, _, _) = registry.admit(mac(1));
        let (b, _, _) = registry.admit(mac(2));
        let (c, _, _) = registry.admit(mac(3));
        a.begin_connection(Ipv4Addr::new(192, 168, 4, 2));
        b.mark_disconnected();
        c.begin_connection(Ipv4Addr::new(192, 168, 4, 3));

        assert_eq!(registry.purge_disconnected(), 1);
        let order: Vec<MacAddr> = registry.iter().map(|p| p.mac()).collect();
        assert_eq!(order, vec![mac(1), mac(3)]);
    }

    #[test]
    fn test_capacity_overflow_triggers_purge() {
        let mut registry = Registry::new(2);
        let (a, _, _) = registry.admit(mac(1));
        a.begin_connection(Ipv4Addr::new(192, 168, 4, 2));
        let (b, _, _) = registry.admit(mac(2));
        b.mark_socket_disconnected();

        let (_, _, purged) = registry.admit(mac(3));
        assert_eq!(purged, 1);
        assert_eq!(registry.len(), 2);
        assert!(registry.find(mac(2)).is_none());
    }

    #[test]
    fn test_generation_invalidates_stale_handler() {
        let peer = Peer::new(mac(1));
        let first = peer.begin_connection(Ipv4Addr::new(192, 168, 4, 2));
        assert!(peer.is_current(first));

        // The same MAC reconnects before the old handler noticed.
        let second = peer.begin_connection(Ipv4Addr::new(192, 168, 4, 9));
        assert!(!peer.is_current(first));
        assert!(peer.is_current(second));
        assert_eq!(peer.ip(), Some(Ipv4Addr::new(192, 168, 4, 9)));
    }

    #[test]
    fn test_disconnect_flags() {
        let peer = Peer::new(mac(1));
        peer.begin_connection(Ipv4Addr::new(192, 168, 4, 2));
        assert!(peer.is_socket_connected());
        assert!(peer.is_network_connected());

        peer.mark_disconnected();
        assert!(!peer.is_socket_connected());
        assert!(!peer.is_network_connected());
    }
}
