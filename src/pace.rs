//! Cooperative pacing for the tight worker loops.
//!
//! Every loop in the pipeline runs hot and yields to the scheduler on a
//! fixed cadence; the cadence is a tuning constant, not a correctness
//! requirement. When a loop found nothing to do it sleeps a tick instead,
//! so an idle link does not burn a core.

use std::time::Duration;

/// One scheduler tick; what an idle loop iteration costs.
pub(crate) const IDLE_TICK: Duration = Duration::from_millis(1);

/// Iteration counter that yields on a fixed cadence.
pub(crate) struct Pacer {
    count: u32,
    every: u32,
}

impl Pacer {
    pub(crate) fn new(every: u32) -> Self {
        Self {
            count: 0,
            every: every.max(1),
        }
    }

    /// Async flavor: yields to the tokio scheduler on cadence, or sleeps a
    /// tick when the caller made no progress this iteration.
    pub(crate) async fn breathe(&mut self, made_progress: bool) {
        if !made_progress {
            tokio::time::sleep(IDLE_TICK).await;
            return;
        }
        self.count += 1;
        if self.count >= self.every {
            self.count = 0;
            tokio::task::yield_now().await;
        }
    }

    /// Thread flavor for the blocking bus workers.
    pub(crate) fn breathe_blocking(&mut self, made_progress: bool) {
        if !made_progress {
            std::thread::sleep(IDLE_TICK);
            return;
        }
        self.count += 1;
        if self.count >= self.every {
            self.count = 0;
            std::thread::yield_now();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cadence_wraps() {
        let mut pacer = Pacer::new(3);
        pacer.breathe_blocking(true);
        pacer.breathe_blocking(true);
        assert_eq!(pacer.count, 2);
        pacer.breathe_blocking(true);
        assert_eq!(pacer.count, 0);
    }

    #[test]
    fn test_idle_iterations_do_not_advance_cadence() {
        let mut pacer = Pacer::new(2);
        pacer.breathe_blocking(false);
        assert_eq!(pacer.count, 0);
    }

    #[test]
    fn test_zero_cadence_is_clamped() {
        let mut pacer = Pacer::new(0);
        pacer.breathe_blocking(true);
        assert_eq!(pacer.count, 0);
    }

    #[tokio::test]
    async fn test_async_flavor_matches() {
        let mut pacer = Pacer::new(2);
        pacer.breathe(true).await;
        assert_eq!(pacer.count, 1);
        pacer.breathe(true).await;
        assert_eq!(pacer.count, 0);
    }
}
