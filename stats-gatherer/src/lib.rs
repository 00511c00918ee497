//! # Research Monitor Stats Gatherer
//!
//! Daily statistics for a roster of research organizations, built on the
//! OpenAIRE gateway client.
//!
//! ## Architecture
//!
//! - **`metrics`**: per-organization statistics, roster entries and snapshot records
//! - **`collectors`**: statistics derivation and the daily collection orchestrator
//! - **`store`**: dated CSV snapshots, roster loading, pruning and XLSX export
//! - **`alerts`**: publication-drop, stale-data and availability rules with persisted batches
//! - **`display`**: terminal tables for the command-line front end
//!
//! ## Usage
//!
//! ```no_run
//! # use std::{path::Path, sync::Arc};
//! # use research_monitor_config::{AlertThresholds, ApiConfig};
//! # use research_monitor_gateway::{GatewayClient, RequestLog};
//! # use research_monitor_stats_gatherer::*;
//! # async fn run(api: ApiConfig) -> eyre::Result<()> {
//! let client = Arc::new(GatewayClient::new(&api, RequestLog::in_dir("logs"))?);
//! let store = SnapshotStore::open("data", Path::new("data/roster.xlsx"))?;
//! let orchestrator = Orchestrator::new(StatisticsCollector::new(client), store);
//!
//! let report = orchestrator.run_daily_collection().await;
//! let engine = AlertEngine::for_store(orchestrator.store(), AlertThresholds::default())?;
//! for alert in engine.check_alerts(orchestrator.store()) {
//!     println!("{}: {}", alert.organization, alert.message);
//! }
//! # Ok(())
//! # }
//! ```

#[macro_use]
extern crate tracing;

pub mod alerts;
pub mod collectors;
pub mod display;
pub mod metrics;
pub mod store;

pub use alerts::*;
pub use collectors::*;
pub use metrics::*;
pub use store::*;
