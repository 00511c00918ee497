pub mod org_stats;
pub mod organization;
pub mod snapshot;

// Re-export the main types for easy access
pub use org_stats::*;
pub use organization::*;
pub use snapshot::*;
