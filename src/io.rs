//! Bus workers: the blocking threads moving PCM between the bus and the
//! ring.
//!
//! Hardware I/O stays on dedicated OS threads so a stalled codec can never
//! back up the socket side; the ring buffer is the only thing crossing the
//! thread boundary. The capture worker pulls from the bus only while the
//! ring has unwritten room, so during a stall audio is dropped at the
//! source rather than overwriting unread slots.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::event::{emit, EventCallback, LinkEvent};
use crate::i2s::PcmBus;
use crate::pace::Pacer;
use crate::ring::MultiReadRing;
use crate::sample::Sample;
use crate::session::LinkState;

/// Spawns the capture worker: bus input into the ring's write slots.
pub(crate) fn spawn_capture_worker<T: Sample>(
    ring: Arc<MultiReadRing<T>>,
    mut bus: Box<dyn PcmBus>,
    state: Arc<LinkState>,
    yield_every: u32,
    callback: Option<EventCallback>,
) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        let mut pacer = Pacer::new(yield_every);
        let mut stalled = false;
        while state.running.load(Ordering::SeqCst) {
            if ring.unwritten() == 0 {
                if !stalled {
                    stalled = true;
                    state.buffer_overruns.fetch_add(1, Ordering::SeqCst);
                    emit(&callback, LinkEvent::BufferOverrun);
                    tracing::warn!("ring full, dropping captured audio at the source");
                }
                pacer.breathe_blocking(false);
                continue;
            }
            stalled = false;

            let moved = ring.with_unwritten_bytes(|buf| bus.read_bytes(buf));
            match moved {
                Ok(count) if count > 0 => {
                    if let Err(error) = ring.report_written_bytes(count) {
                        tracing::warn!(%error, "bus delivered a ragged byte count");
                        pacer.breathe_blocking(false);
                        continue;
                    }
                    state
                        .samples_captured
                        .fetch_add((count / T::WIDTH) as u64, Ordering::SeqCst);
                    pacer.breathe_blocking(true);
                }
                Ok(_) => pacer.breathe_blocking(false),
                Err(error) => {
                    tracing::warn!(%error, "bus read failed");
                    pacer.breathe_blocking(false);
                }
            }
        }
        bus.stop();
    })
}

/// Spawns the playback worker: the ring's read slots onto the bus output.
pub(crate) fn spawn_playback_worker<T: Sample>(
    ring: Arc<MultiReadRing<T>>,
    mut bus: Box<dyn PcmBus>,
    state: Arc<LinkState>,
    yield_every: u32,
) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        let mut pacer = Pacer::new(yield_every);
        while state.running.load(Ordering::SeqCst) {
            if ring.slots_buffered() == 0 || ring.unread() == 0 {
                pacer.breathe_blocking(false);
                continue;
            }

            let moved = ring.with_unread_bytes(|buf| bus.write_bytes(buf));
            match moved {
                Ok(count) if count > 0 => {
                    if let Err(error) = ring.report_read_bytes(count) {
                        tracing::warn!(%error, "bus accepted a ragged byte count");
                        pacer.breathe_blocking(false);
                        continue;
                    }
                    state
                        .samples_played
                        .fetch_add((count / T::WIDTH) as u64, Ordering::SeqCst);
                    pacer.breathe_blocking(true);
                }
                Ok(_) => pacer.breathe_blocking(false),
                Err(error) => {
                    tracing::warn!(%error, "bus write failed");
                    pacer.breathe_blocking(false);
                }
            }
        }
        bus.stop();
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i2s::{BusConfig, MockBus};
    use std::time::Duration;

    fn wait_until(timeout: Duration, mut done: impl FnMut() -> bool) -> bool {
        let deadline = std::time::Instant::now() + timeout;
        while std::time::Instant::now() < deadline {
            if done() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        done()
    }

    #[test]
    fn test_capture_worker_fills_ring_from_bus() {
        let ring = Arc::new(MultiReadRing::<i16>::new(4, 2).unwrap());
        let state = Arc::new(LinkState::new());
        let mut bus = MockBus::new(BusConfig::default());
        let samples: Vec<i16> = (1..=4).collect();
        bus.push_samples(&samples);
        bus.start().unwrap();

        let worker = spawn_capture_worker(Arc::clone(&ring), Box::new(bus), Arc::clone(&state), 125, None);

        assert!(wait_until(Duration::from_secs(2), || ring.slots_buffered() >= 1));
        assert_eq!(ring.read().unwrap(), samples);

        state.running.store(false, Ordering::SeqCst);
        worker.join().unwrap();
        assert!(state.samples_captured.load(Ordering::SeqCst) >= 4);
    }

    #[test]
    fn test_playback_worker_drains_ring_to_bus() {
        let ring = Arc::new(MultiReadRing::<i16>::new(4, 2).unwrap());
        let state = Arc::new(LinkState::new());
        let mut bus = MockBus::new(BusConfig::default());
        bus.start().unwrap();
        let captured = bus.captured();

        ring.write(&[10i16, 20, 30, 40], false);
        let worker = spawn_playback_worker(Arc::clone(&ring), Box::new(bus), Arc::clone(&state), 125);

        assert!(wait_until(Duration::from_secs(2), || captured.lock().len() >= 8));
        state.running.store(false, Ordering::SeqCst);
        worker.join().unwrap();

        let played = captured.lock();
        assert_eq!(i16::get_ne(&played[..2]), 10);
        assert_eq!(i16::get_ne(&played[6..8]), 40);
        assert_eq!(state.samples_played.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_capture_worker_reports_overrun_once_per_stall() {
        // No reader drains the ring, so it fills and the worker stalls.
        let ring = Arc::new(MultiReadRing::<i16>::new(4, 2).unwrap());
        let state = Arc::new(LinkState::new());
        let mut bus = MockBus::new(BusConfig::default());
        bus.push_samples(&vec![1i16; 64]);
        bus.start().unwrap();

        let worker = spawn_capture_worker(Arc::clone(&ring), Box::new(bus), Arc::clone(&state), 125, None);

        assert!(wait_until(Duration::from_secs(2), || {
            state.buffer_overruns.load(Ordering::SeqCst) > 0
        }));
        // A sustained stall is one overrun episode, not one per iteration.
        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(state.buffer_overruns.load(Ordering::SeqCst), 1);

        state.running.store(false, Ordering::SeqCst);
        worker.join().unwrap();
    }
}
