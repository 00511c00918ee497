use chrono::{
    DateTime,
    Duration,
    NaiveDate,
    NaiveTime,
    Utc,
};
use research_monitor_gateway::Payload;
use serde::{
    Deserialize,
    Serialize,
};
use serde_json::Value;

/// Only the newest publications of a page are inspected for dates.
pub const PUBLICATION_SAMPLE_SIZE: usize = 50;
/// Publications collected within this many days count as recent.
pub const RECENT_WINDOW_DAYS: i64 = 30;

/// Repository health derived from how old the newest publication is.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Health {
    Healthy,
    Warning,
    Critical,
    #[default]
    Unknown,
}

impl Health {
    /// `<= 7` days is healthy, `<= 30` days a warning, anything older critical.
    pub fn from_freshness(freshness_days: Option<i64>) -> Self {
        match freshness_days {
            None => Health::Unknown,
            Some(days) if days <= 7 => Health::Healthy,
            Some(days) if days <= 30 => Health::Warning,
            Some(_) => Health::Critical,
        }
    }
}

/// Statistics derived for one organization at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrgStatistics {
    pub org_id: String,
    pub timestamp: DateTime<Utc>,
    pub publications_total: u64,
    pub publications_recent: u64,
    pub data_sources_count: u64,
    pub last_publication_date: Option<NaiveDate>,
    pub data_freshness_days: Option<i64>,
    pub repository_health: Health,
}

impl OrgStatistics {
    /// Statistics with every count at zero and unknown health.
    pub fn empty(org_id: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            org_id: org_id.into(),
            timestamp,
            publications_total: 0,
            publications_recent: 0,
            data_sources_count: 0,
            last_publication_date: None,
            data_freshness_days: None,
            repository_health: Health::Unknown,
        }
    }

    /// Fills the publication fields from a publications page.
    ///
    /// The first [`PUBLICATION_SAMPLE_SIZE`] results are scanned for a
    /// `dateofcollection`; items without a parseable date are ignored.
    pub fn apply_publications(&mut self, payload: &Payload, now: DateTime<Utc>) {
        self.publications_total = payload.total();

        let recent_cutoff = now - Duration::days(RECENT_WINDOW_DAYS);
        let mut recent = 0;
        let mut undated = 0;
        let mut newest: Option<NaiveDate> = None;
        for item in payload.results().iter().take(PUBLICATION_SAMPLE_SIZE) {
            let Some(date) = collection_date(item) else {
                undated += 1;
                continue;
            };
            if date.and_time(NaiveTime::MIN).and_utc() >= recent_cutoff {
                recent += 1;
            }
            newest = newest.max(Some(date));
        }
        if undated > 0 {
            debug!(org_id = %self.org_id, undated, "skipped publications without a collection date");
        }

        self.publications_recent = recent;
        self.last_publication_date = newest;
        self.data_freshness_days = newest.map(|date| (now.date_naive() - date).num_days());
        self.repository_health = Health::from_freshness(self.data_freshness_days);
    }
}

fn collection_date(item: &Value) -> Option<NaiveDate> {
    let raw = item.get("dateofcollection")?.as_str()?;
    NaiveDate::parse_from_str(raw.get(..10)?, "%Y-%m-%d").ok()
}
