//! Service wiring: builds the catalog, reconciler, dispatcher and
//! scheduler from a [`Config`] and runs them.

use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use crate::catalog::{Catalog, SqlCatalog};
use crate::config::Config;
use crate::db;
use crate::dispatch::{Dispatcher, ScanSummary};
use crate::reconcile::Reconciler;
use crate::scheduler::Scheduler;

/// Connects to the catalog and verifies it answers. Failure here is fatal.
pub async fn connect_catalog(config: &Config) -> Result<Arc<SqlCatalog>> {
    let pool = match db::connect(config).await {
        Ok(pool) => pool,
        Err(e) => {
            error!(error = %format!("{:#}", e), "cannot reach catalog");
            return Err(e);
        }
    };
    let catalog = SqlCatalog::new(pool);
    if let Err(e) = catalog.ping().await {
        error!(error = %e, "catalog did not answer ping");
        return Err(e).context("Catalog connectivity check failed");
    }
    info!(driver = ?config.db.driver, name = %config.db.name, "connected to catalog");
    Ok(Arc::new(catalog))
}

/// Dispatcher over `catalog` with the built-in extractors.
pub fn build_dispatcher(config: &Config, catalog: Arc<dyn Catalog>) -> Dispatcher {
    if !config.storage.root.is_dir() {
        warn!(
            root = %config.storage.root.display(),
            "storage root is not a directory; every record will fail to read"
        );
    }
    let reconciler = Reconciler::with_default_extractors(
        Arc::clone(&catalog),
        config.storage.root.clone(),
        &config.storage.image_prefix,
        config.operation_timeout(),
    );
    Dispatcher::new(
        catalog,
        Arc::new(reconciler),
        config.workers.concurrency,
        config.operation_timeout(),
    )
}

/// One full scan, then return.
pub async fn run_scan_once(config: &Config) -> Result<ScanSummary> {
    let catalog = connect_catalog(config).await?;
    let dispatcher = build_dispatcher(config, catalog.clone());
    let summary = dispatcher.run_scan().await?;
    catalog.pool().close().await;
    Ok(summary)
}

/// Long-running service: settle, connect, then scan on schedule until
/// `shutdown` resolves.
pub async fn run_service(config: &Config, shutdown: impl Future<Output = ()>) -> Result<()> {
    tokio::pin!(shutdown);

    info!(
        settle_delay_secs = config.schedule.settle_delay_secs,
        "waiting for dependent services"
    );
    tokio::select! {
        _ = tokio::time::sleep(config.settle_delay()) => {}
        _ = &mut shutdown => return Ok(()),
    }

    let catalog = connect_catalog(config).await?;
    let dispatcher = Arc::new(build_dispatcher(config, catalog.clone()));
    let scheduler = Scheduler::new(dispatcher, config.scan_interval());
    scheduler.run(shutdown).await;

    catalog.pool().close().await;
    Ok(())
}
