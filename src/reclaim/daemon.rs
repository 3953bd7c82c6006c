//! Background target enforcement.
//!
//! Pages admitted after a shrink push the resident count back up; the daemon
//! periodically re-applies the last target so it sticks.

use crossbeam_channel::{bounded, select, tick, Sender};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::Reclaimer;

/// Re-applies a reclaimer's target on a fixed interval
pub struct ShrinkDaemon {
    reclaimer: Weak<Reclaimer>,
}

/// Running daemon; dropping it stops the thread
pub struct DaemonHandle {
    stop: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl ShrinkDaemon {
    pub fn new(reclaimer: &Arc<Reclaimer>) -> Self {
        Self {
            reclaimer: Arc::downgrade(reclaimer),
        }
    }

    /// Run a single enforcement cycle
    ///
    /// Returns the pages retired, zero when no target is set or the
    /// reclaimer is gone.
    pub fn cycle(&self) -> u64 {
        let Some(reclaimer) = self.reclaimer.upgrade() else {
            return 0;
        };
        match reclaimer.target_pages() {
            Some(target) => reclaimer.shrink(target).pages_retired,
            None => 0,
        }
    }

    /// Spawn the enforcement thread
    ///
    /// The thread stops when the handle is stopped or dropped, or once the
    /// reclaimer itself has been dropped.
    pub fn start(self, interval: Duration) -> DaemonHandle {
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let ticker = tick(interval);

        let thread = thread::spawn(move || loop {
            select! {
                // A message or a disconnect both mean stop
                recv(stop_rx) -> _ => break,
                recv(ticker) -> _ => {
                    if self.reclaimer.strong_count() == 0 {
                        break;
                    }
                    let retired = self.cycle();
                    if retired > 0 {
                        log::debug!("shrink daemon retired {} pages", retired);
                    }
                }
            }
        });

        DaemonHandle {
            stop: Some(stop_tx),
            thread: Some(thread),
        }
    }
}

impl DaemonHandle {
    /// Stop the thread and wait for it to exit
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        // Dropping the sender disconnects the stop channel
        self.stop.take();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::warn!("shrink daemon panicked");
            }
        }
    }
}

impl Drop for DaemonHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Frontswap;
    use crate::testing::{fill, CountingBackend, FlushingUnuse};
    use std::time::Instant;

    #[test]
    fn test_cycle_without_target() {
        let cache = Arc::new(Frontswap::with_defaults());
        let reclaimer = Arc::new(Reclaimer::unlimited(
            Arc::clone(&cache),
            Box::new(FlushingUnuse::new(Arc::clone(&cache))),
        ));

        assert_eq!(ShrinkDaemon::new(&reclaimer).cycle(), 0);
    }

    #[test]
    fn test_daemon_reapplies_target() {
        let cache = Arc::new(Frontswap::with_defaults());
        cache.register_backend(CountingBackend::new());
        cache.activate_area(1, 128).unwrap();

        let reclaimer = Arc::new(Reclaimer::unlimited(
            Arc::clone(&cache),
            Box::new(FlushingUnuse::new(Arc::clone(&cache))),
        ));
        reclaimer.set_target_pages(10);

        // Refill past the target after the initial shrink
        fill(&cache, 1, 64);
        assert_eq!(cache.current_resident_pages(), 64);

        let handle = ShrinkDaemon::new(&reclaimer).start(Duration::from_millis(10));

        let deadline = Instant::now() + Duration::from_secs(5);
        while cache.current_resident_pages() > 10 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        handle.stop();

        assert!(cache.current_resident_pages() <= 10);
    }

    #[test]
    fn test_daemon_exits_with_reclaimer() {
        let cache = Arc::new(Frontswap::with_defaults());
        let reclaimer = Arc::new(Reclaimer::unlimited(
            Arc::clone(&cache),
            Box::new(|_area: u32, _budget: u64, _block: bool| -> u64 { 0 }),
        ));

        let handle = ShrinkDaemon::new(&reclaimer).start(Duration::from_millis(5));
        drop(reclaimer);

        let deadline = Instant::now() + Duration::from_secs(5);
        let finished = || handle.thread.as_ref().map_or(true, |t| t.is_finished());
        while !finished() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert!(finished());
    }
}
