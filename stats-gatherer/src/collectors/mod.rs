//! # Collectors Module
//!
//! - **`OrganizationSource` trait**: resolves roster entries and produces per-organization statistics
//! - **`StatisticsCollector`**: derives statistics from the gateway's publication and data-source listings
//! - **`Orchestrator`**: paces through the roster and writes the daily snapshot

pub mod collector;
pub mod orchestrator;
pub mod statistics_collector;

// Re-export the main types for easy access
pub use collector::OrganizationSource;
pub use orchestrator::{
    CollectionReport,
    Orchestrator,
};
pub use statistics_collector::StatisticsCollector;
