use super::{
    Health,
    OrgStatistics,
    OrganizationRef,
};
use chrono::{
    DateTime,
    NaiveDate,
    Utc,
};
use serde::{
    Deserialize,
    Serialize,
};

/// A row of a daily snapshot: one organization's statistics merged with its
/// roster metadata, tagged with the snapshot date.
///
/// Kept flat because snapshot files are CSV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub date: NaiveDate,
    pub org_id: String,
    pub timestamp: DateTime<Utc>,
    pub publications_total: u64,
    pub publications_recent: u64,
    pub data_sources_count: u64,
    pub last_publication_date: Option<NaiveDate>,
    pub data_freshness_days: Option<i64>,
    pub repository_health: Health,
    pub ror_id: String,
    pub ror_link: String,
    pub organization_name: String,
    pub acronym: Option<String>,
    pub main_grouping: Option<String>,
}

impl SnapshotRecord {
    pub fn new(stats: OrgStatistics, organization: &OrganizationRef, date: NaiveDate) -> Self {
        Self {
            date,
            org_id: stats.org_id,
            timestamp: stats.timestamp,
            publications_total: stats.publications_total,
            publications_recent: stats.publications_recent,
            data_sources_count: stats.data_sources_count,
            last_publication_date: stats.last_publication_date,
            data_freshness_days: stats.data_freshness_days,
            repository_health: stats.repository_health,
            ror_id: organization.ror_id.clone(),
            ror_link: organization.ror_link.clone(),
            organization_name: organization.name.clone(),
            acronym: organization.acronym.clone(),
            main_grouping: organization.main_grouping.clone(),
        }
    }

    pub fn statistics(&self) -> OrgStatistics {
        OrgStatistics {
            org_id: self.org_id.clone(),
            timestamp: self.timestamp,
            publications_total: self.publications_total,
            publications_recent: self.publications_recent,
            data_sources_count: self.data_sources_count,
            last_publication_date: self.last_publication_date,
            data_freshness_days: self.data_freshness_days,
            repository_health: self.repository_health,
        }
    }

    /// Acronym when present, otherwise the organization name.
    pub fn display_name(&self) -> &str {
        self.acronym
            .as_deref()
            .filter(|acronym| !acronym.trim().is_empty())
            .unwrap_or(&self.organization_name)
    }
}

/// Numeric snapshot fields that can be followed over time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum Metric {
    PublicationsTotal,
    PublicationsRecent,
    DataSourcesCount,
    DataFreshnessDays,
}

impl Metric {
    pub fn value(&self, record: &SnapshotRecord) -> Option<f64> {
        match self {
            Metric::PublicationsTotal => Some(record.publications_total as f64),
            Metric::PublicationsRecent => Some(record.publications_recent as f64),
            Metric::DataSourcesCount => Some(record.data_sources_count as f64),
            Metric::DataFreshnessDays => record.data_freshness_days.map(|days| days as f64),
        }
    }
}

/// One point of an organization trend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub value: f64,
}
