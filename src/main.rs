//! # pubrecon CLI
//!
//! ```bash
//! pubrecon --config ./config/pubrecon.toml init   # create the publications table
//! pubrecon --config ./config/pubrecon.toml scan   # one scan, print totals
//! pubrecon --config ./config/pubrecon.toml run    # scan on a schedule until Ctrl-C
//! ```
//!
//! Logs go to stderr; verbosity follows `RUST_LOG` (default `pubrecon=info`).

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pubrecon::dispatch::ScanSummary;
use pubrecon::error::FailureKind;
use pubrecon::models::Attribute;
use pubrecon::{config, migrate, service};

/// Keeps a publication catalog's hashes, full text, and cover images in
/// step with the files behind it.
#[derive(Parser)]
#[command(name = "pubrecon", version)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Database credentials may also come from `DB_USER` / `DB_PASSWORD`.
    #[arg(long, global = true, default_value = "./config/pubrecon.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the `publications` table if it does not exist.
    ///
    /// Idempotent. Meant for local SQLite catalogs and test setups.
    Init,

    /// Run a single scan over the whole catalog and exit.
    Scan,

    /// Run the reconciliation service until interrupted.
    ///
    /// Waits for the configured settle delay, connects to the catalog
    /// (exiting non-zero if it is unreachable), scans once, and then
    /// rescans every `schedule.interval_secs`.
    Run,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pubrecon=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Catalog schema initialized.");
        }
        Commands::Scan => {
            let summary = service::run_scan_once(&cfg).await?;
            print_summary(&summary);
        }
        Commands::Run => {
            service::run_service(&cfg, async {
                if tokio::signal::ctrl_c().await.is_err() {
                    std::future::pending::<()>().await;
                }
            })
            .await?;
        }
    }

    Ok(())
}

fn print_summary(summary: &ScanSummary) {
    println!("scan");
    println!("  started: {}", summary.started_at.format("%Y-%m-%d %H:%M:%S UTC"));
    println!("  records: {}", summary.records);
    println!("  clean: {}", summary.clean_records);
    for attribute in Attribute::ALL {
        println!("  {} written: {}", attribute, summary.writes_for(attribute));
    }
    for (kind, label) in [
        (FailureKind::Read, "read"),
        (FailureKind::Extraction, "extraction"),
        (FailureKind::Filesystem, "filesystem"),
        (FailureKind::Write, "write"),
        (FailureKind::Connectivity, "connectivity"),
        (FailureKind::Timeout, "timeout"),
        (FailureKind::PathEscape, "path escape"),
        (FailureKind::Panic, "panic"),
    ] {
        let n = summary.failures_of(kind);
        if n > 0 {
            println!("  {} failures: {}", label, n);
        }
    }
    println!("  elapsed: {:.1}s", summary.elapsed.as_secs_f64());
    println!("ok");
}
