//! # Store Module
//!
//! File-backed persistence under the data directory:
//!
//! - **`SnapshotStore`**: daily CSV snapshots, range reads, pruning and export
//! - **`Roster`**: the monitored organizations, read from CSV or XLSX
//! - **`export`**: XLSX workbook with the roster and recent history

pub mod error;
mod export;
pub mod roster;
pub mod snapshot_store;

pub use error::{
    ExportError,
    PersistenceError,
};
pub use roster::Roster;
pub use snapshot_store::{
    SnapshotStore,
    SystemStats,
};
