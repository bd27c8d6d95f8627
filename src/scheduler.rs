//! Periodic scan driver.
//!
//! Scans never overlap. A tick that fires while the previous scan still
//! has tasks outstanding is dropped, not queued. The active-scan marker is
//! a single `AtomicBool`, set by [`Scheduler::trigger`] and cleared by a
//! guard owned by the scan task, so it is released however the scan ends.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use crate::dispatch::{Dispatcher, ScanSummary};

/// Result of asking for a scan.
#[derive(Debug)]
pub enum TriggerOutcome {
    /// A scan task was spawned; it yields the summary, or `None` if the
    /// catalog could not be read.
    Started(JoinHandle<Option<ScanSummary>>),
    /// A scan was already running.
    Skipped,
}

struct ActiveScan(Arc<AtomicBool>);

impl Drop for ActiveScan {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct Scheduler {
    dispatcher: Arc<Dispatcher>,
    interval: Duration,
    active: Arc<AtomicBool>,
}

impl Scheduler {
    pub fn new(dispatcher: Arc<Dispatcher>, interval: Duration) -> Self {
        Self {
            dispatcher,
            interval,
            active: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_scanning(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Starts a scan unless one is already running.
    pub fn trigger(&self) -> TriggerOutcome {
        if self
            .active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            info!("previous scan still running; skipping tick");
            return TriggerOutcome::Skipped;
        }

        let guard = ActiveScan(Arc::clone(&self.active));
        let dispatcher = Arc::clone(&self.dispatcher);
        TriggerOutcome::Started(tokio::spawn(async move {
            let _guard = guard;
            match dispatcher.run_scan().await {
                Ok(summary) => Some(summary),
                Err(e) => {
                    error!(error = %e, "scan aborted: catalog unavailable");
                    None
                }
            }
        }))
    }

    /// Scans immediately, then every interval until `shutdown` resolves.
    /// An in-flight scan is drained before returning.
    pub async fn run(&self, shutdown: impl Future<Output = ()>) {
        tokio::pin!(shutdown);
        info!(interval_secs = self.interval.as_secs(), "scheduler starting");

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut current: Option<JoinHandle<Option<ScanSummary>>> = None;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let TriggerOutcome::Started(handle) = self.trigger() {
                        current = Some(handle);
                    }
                }
                _ = &mut shutdown => break,
            }
        }

        if let Some(handle) = current {
            if self.is_scanning() {
                info!("shutdown requested; waiting for active scan to finish");
            }
            if let Err(e) = handle.await {
                error!(error = %e, "scan task failed");
            }
        }
        info!("scheduler stopped");
    }
}
