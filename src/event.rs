//! Runtime events for monitoring link health.
//!
//! Events are non-fatal notifications about link behavior. The link keeps
//! running after an event is emitted - they exist for logging and metrics,
//! not error handling.

use std::sync::Arc;

use crate::net::MacAddr;

/// Runtime events emitted while a link is up.
///
/// # Example
///
/// ```
/// use aircast::LinkEvent;
///
/// fn handle_event(event: LinkEvent) {
///     if let LinkEvent::ClientConnected { mac, reconnect } = event {
///         eprintln!("client {mac} joined (reconnect: {reconnect})");
///     }
/// }
/// ```
#[derive(Debug, Clone)]
pub enum LinkEvent {
    /// A receiver identified itself on the transmitter's socket.
    ClientConnected {
        /// Station MAC the client sent as identity.
        mac: MacAddr,
        /// True when an existing registry entry was reused.
        reconnect: bool,
    },

    /// A client's handler exited and its socket was closed.
    ClientDisconnected {
        /// MAC of the departed client.
        mac: MacAddr,
    },

    /// Disconnected entries were purged to make room in the registry.
    ClientsPurged {
        /// Number of entries removed.
        removed: usize,
    },

    /// The capture side found the ring full and stopped pulling from the
    /// bus; audio is being dropped at the source until a reader catches up.
    BufferOverrun,

    /// A socket transfer failed; the affected connection is being torn
    /// down.
    StreamInterrupted {
        /// Description of the failure.
        reason: String,
    },

    /// The receiver is dialing the transmitter again after losing the
    /// stream.
    Reconnecting {
        /// 1-based attempt number since the last good connection.
        attempt: u64,
    },

    /// The station is retrying its association with the access point.
    WifiRetry {
        /// 1-based retry number, bounded by the configured budget.
        attempt: u32,
    },
}

/// Callback type for receiving runtime events.
///
/// Register one via [`AudioLinkBuilder::on_event()`] to observe client
/// churn, overruns and reconnects.
///
/// [`AudioLinkBuilder::on_event()`]: crate::AudioLinkBuilder::on_event
pub type EventCallback = Arc<dyn Fn(LinkEvent) + Send + Sync>;

/// Creates an [`EventCallback`] from a closure without the explicit `Arc`.
///
/// # Example
///
/// ```
/// use aircast::{event_callback, LinkEvent};
///
/// let callback = event_callback(|event| {
///     tracing::warn!(?event, "link event");
/// });
/// ```
pub fn event_callback<F>(f: F) -> EventCallback
where
    F: Fn(LinkEvent) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Emits `event` through an optional callback.
pub(crate) fn emit(callback: &Option<EventCallback>, event: LinkEvent) {
    if let Some(callback) = callback {
        callback(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_event_callback_helper() {
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_clone = Arc::clone(&hits);
        let callback = event_callback(move |_| {
            hits_clone.fetch_add(1, Ordering::SeqCst);
        });

        callback(LinkEvent::BufferOverrun);
        callback(LinkEvent::Reconnecting { attempt: 1 });
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_emit_without_callback_is_silent() {
        emit(&None, LinkEvent::BufferOverrun);
    }

    #[test]
    fn test_event_is_cloneable_for_fanout() {
        let event = LinkEvent::StreamInterrupted {
            reason: "send failed".to_string(),
        };
        let copy = event.clone();
        assert!(matches!(copy, LinkEvent::StreamInterrupted { .. }));
    }
}
