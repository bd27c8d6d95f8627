//! Bounded fan-out of one scan.
//!
//! A permit is taken from the semaphore *before* each task is spawned, so
//! at most `concurrency` reconciliations exist at any moment and the
//! database pool (sized to the same bound) is never oversubscribed.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tracing::{error, info};

use crate::catalog::Catalog;
use crate::error::{CatalogError, FailureKind};
use crate::models::Attribute;
use crate::reconcile::{Reconciler, RecordReport};

/// Totals for one completed scan.
#[derive(Debug, Clone)]
pub struct ScanSummary {
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
    pub records: usize,
    pub clean_records: usize,
    pub writes: BTreeMap<Attribute, u64>,
    pub failures: BTreeMap<FailureKind, u64>,
}

impl ScanSummary {
    fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            elapsed: Duration::ZERO,
            records: 0,
            clean_records: 0,
            writes: BTreeMap::new(),
            failures: BTreeMap::new(),
        }
    }

    fn absorb(&mut self, report: &RecordReport) {
        self.records += 1;
        if report.is_clean() {
            self.clean_records += 1;
        }
        for a in &report.written {
            *self.writes.entry(*a).or_default() += 1;
        }
        for f in &report.failures {
            *self.failures.entry(*f).or_default() += 1;
        }
    }

    fn absorb_panic(&mut self) {
        self.records += 1;
        *self.failures.entry(FailureKind::Panic).or_default() += 1;
    }

    pub fn writes_for(&self, attribute: Attribute) -> u64 {
        self.writes.get(&attribute).copied().unwrap_or(0)
    }

    pub fn failures_of(&self, kind: FailureKind) -> u64 {
        self.failures.get(&kind).copied().unwrap_or(0)
    }

    pub fn total_writes(&self) -> u64 {
        self.writes.values().sum()
    }

    pub fn total_failures(&self) -> u64 {
        self.failures.values().sum()
    }
}

pub struct Dispatcher {
    catalog: Arc<dyn Catalog>,
    reconciler: Arc<Reconciler>,
    concurrency: usize,
    list_timeout: Duration,
}

impl Dispatcher {
    pub fn new(
        catalog: Arc<dyn Catalog>,
        reconciler: Arc<Reconciler>,
        concurrency: usize,
        list_timeout: Duration,
    ) -> Self {
        Self {
            catalog,
            reconciler,
            concurrency: concurrency.max(1),
            list_timeout,
        }
    }

    /// Reads the catalog and reconciles every record, returning once all
    /// dispatched tasks have finished.
    pub async fn run_scan(&self) -> Result<ScanSummary, CatalogError> {
        let started_at = Utc::now();
        let clock = Instant::now();

        let records = tokio::time::timeout(self.list_timeout, self.catalog.list_all())
            .await
            .unwrap_or(Err(CatalogError::Timeout(self.list_timeout)))?;
        info!(records = records.len(), concurrency = self.concurrency, "scan started");

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks: JoinSet<RecordReport> = JoinSet::new();
        let mut owners: HashMap<tokio::task::Id, i64> = HashMap::new();
        let mut summary = ScanSummary::new(started_at);

        for record in records {
            let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                break;
            };
            let reconciler = Arc::clone(&self.reconciler);
            let id = record.id;
            let handle = tasks.spawn(async move {
                let _permit = permit;
                reconciler.reconcile(&record).await
            });
            owners.insert(handle.id(), id);

            while let Some(joined) = tasks.try_join_next_with_id() {
                collect(joined, &mut owners, &mut summary);
            }
        }

        while let Some(joined) = tasks.join_next_with_id().await {
            collect(joined, &mut owners, &mut summary);
        }

        summary.elapsed = clock.elapsed();
        info!(
            records = summary.records,
            clean = summary.clean_records,
            writes = summary.total_writes(),
            failures = summary.total_failures(),
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "scan finished"
        );
        Ok(summary)
    }
}

fn collect(
    joined: Result<(tokio::task::Id, RecordReport), JoinError>,
    owners: &mut HashMap<tokio::task::Id, i64>,
    summary: &mut ScanSummary,
) {
    match joined {
        Ok((task_id, report)) => {
            owners.remove(&task_id);
            summary.absorb(&report);
        }
        Err(e) => {
            let record_id = owners.remove(&e.id());
            error!(?record_id, error = %e, "reconciliation task aborted");
            summary.absorb_panic();
        }
    }
}
