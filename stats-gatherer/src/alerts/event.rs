use chrono::{
    DateTime,
    Utc,
};
use serde::{
    Deserialize,
    Serialize,
};
use serde_json::Value;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
pub enum AlertKind {
    PublicationDrop,
    StaleData,
    SystemUnavailable,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
    Warning,
    Critical,
}

/// A detected anomaly for one organization.
///
/// `id` is stable for a kind and organization, so re-detections of the same
/// condition collapse when alerts are listed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: AlertKind,
    pub severity: Severity,
    pub organization: String,
    pub org_id: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub data: Value,
}

impl AlertEvent {
    pub fn new(
        kind: AlertKind,
        severity: Severity,
        organization: impl Into<String>,
        org_id: impl Into<String>,
        message: impl Into<String>,
        timestamp: DateTime<Utc>,
        data: Value,
    ) -> Self {
        let org_id = org_id.into();
        Self {
            id: Self::identity(kind, &org_id),
            kind,
            severity,
            organization: organization.into(),
            org_id,
            message: message.into(),
            timestamp,
            data,
        }
    }

    pub fn identity(kind: AlertKind, org_id: &str) -> String {
        format!("{kind}_{org_id}")
    }
}
