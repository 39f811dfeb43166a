//! # Hostwatch
//!
//! Metrics ingestion, time-series persistence, and threshold alerting for a
//! multi-tenant infrastructure-monitoring dashboard.
//!
//! ## Architecture
//!
//! - **Ingest**: heartbeat endpoints normalizing two wire formats into one
//!   canonical sample
//! - **Cache**: bounded per-host in-memory buffer of recent samples
//! - **Store**: Redis-backed durable time-series tier (current slot, history,
//!   host index)
//! - **Persist**: batch scheduler draining the cache plus a retention sweeper
//! - **Alerts**: per-heartbeat threshold rule evaluation with duplicate
//!   suppression
//!
//! ## Quick Start
//!
//! ```bash
//! # Run migrations, then start the server
//! hostwatch migrate
//! hostwatch serve
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod alerts;
pub mod api;
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod ingest;
pub mod models;
pub mod persist;
pub mod store;

#[cfg(test)]
mod testutil;

pub use config::Config;
pub use error::{Error, Result};

/// Re-exports for convenience
pub mod prelude {
    pub use crate::cache::RecentMetricsCache;
    pub use crate::config::Config;
    pub use crate::db::Database;
    pub use crate::error::{Error, Result};
    pub use crate::ingest::{HeartbeatPayload, HeartbeatPipeline};
    pub use crate::models::*;
    pub use crate::store::TimeSeriesStore;
}
