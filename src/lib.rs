//! # pubrecon
//!
//! A periodic reconciliation service for a publication catalog.
//!
//! Every scan reads all catalog records and, for each one, derives the
//! attributes that come from its backing file: a SHA-256 content hash,
//! extracted full text, and a representative image. Only missing or
//! changed attributes are written back, one column at a time, so scans
//! are safe to repeat indefinitely.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐   ┌────────────┐   ┌──────────────┐   ┌──────────────┐
//! │ Scheduler │──▶│ Dispatcher │──▶│  Reconciler  │──▶│   Catalog    │
//! │ (ticks)   │   │ (N workers)│   │ (per record) │   │ MySQL/SQLite │
//! └───────────┘   └────────────┘   └──────┬───────┘   └──────────────┘
//!                                         │
//!                      ┌──────────────────┼──────────────────┐
//!                      ▼                  ▼                  ▼
//!                 ┌─────────┐       ┌──────────┐       ┌───────────┐
//!                 │  hash   │       │   text   │       │   image   │
//!                 │ SHA-256 │       │ PDF/DOCX │       │ PDF XObj  │
//!                 └─────────┘       └──────────┘       └───────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`catalog`] | Catalog access trait, SQL and in-memory backends |
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema creation |
//! | [`models`] | Core data types |
//! | [`derive_hash`] | Content hash derivation |
//! | [`derive_text`] | Full-text derivation |
//! | [`derive_image`] | Representative image selection |
//! | [`extract`] | Text extraction capability |
//! | [`pdf_images`] | Image extraction capability |
//! | [`reconcile`] | Per-record reconciliation |
//! | [`dispatch`] | Bounded scan fan-out |
//! | [`scheduler`] | Periodic, non-overlapping scans |
//! | [`service`] | Wiring for the `pubrecon` binary |

mod blocking;

pub mod catalog;
pub mod config;
pub mod db;
pub mod derive_hash;
pub mod derive_image;
pub mod derive_text;
pub mod dispatch;
pub mod error;
pub mod extract;
pub mod migrate;
pub mod models;
pub mod pdf_images;
pub mod reconcile;
pub mod scheduler;
pub mod service;
