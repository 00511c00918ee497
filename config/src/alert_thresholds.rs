use serde::{
    Deserialize,
    Serialize,
};

/// Thresholds driving the alert rules. All values can be overridden from
/// the `alerts` section of the configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertThresholds {
    /// Days of snapshots read for every evaluation.
    pub window_days: u32,
    /// Days of data an organization needs before drop detection kicks in.
    pub min_days_of_data: usize,
    pub publication_drop_percent: f64,
    pub publication_drop_critical_percent: f64,
    pub stale_data_days: i64,
    pub stale_data_critical_days: i64,
    pub system_unavailable_hours: f64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            window_days: 30,
            min_days_of_data: 7,
            publication_drop_percent: 20.0,
            publication_drop_critical_percent: 50.0,
            stale_data_days: 14,
            stale_data_critical_days: 30,
            system_unavailable_hours: 6.0,
        }
    }
}
