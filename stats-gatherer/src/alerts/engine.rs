use super::{
    event::{
        AlertEvent,
        AlertKind,
        Severity,
    },
    rules,
};
use crate::store::{
    PersistenceError,
    SnapshotStore,
};
use chrono::{
    DateTime,
    Duration,
    Utc,
};
use research_monitor_config::AlertThresholds;
use serde::Serialize;
use std::{
    collections::{
        BTreeMap,
        HashSet,
    },
    fs,
    path::{
        Path,
        PathBuf,
    },
};

const BATCH_PREFIX: &str = "alerts_";
const BATCH_EXTENSION: &str = ".json";
/// Window of [`AlertEngine::alert_summary`].
pub const SUMMARY_WINDOW_HOURS: u32 = 24;

/// Counts over the active alerts of the last 24 hours.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AlertSummary {
    pub total_alerts: usize,
    pub critical_alerts: usize,
    pub warning_alerts: usize,
    pub alert_types: BTreeMap<AlertKind, usize>,
}

impl AlertSummary {
    fn from_alerts(alerts: &[AlertEvent]) -> Self {
        let mut summary = Self {
            total_alerts: alerts.len(),
            ..Default::default()
        };
        for alert in alerts {
            match alert.severity {
                Severity::Critical => summary.critical_alerts += 1,
                Severity::Warning => summary.warning_alerts += 1,
            }
            *summary.alert_types.entry(alert.kind).or_default() += 1;
        }
        summary
    }
}

/// Evaluates the alert rules over stored snapshots and keeps every
/// non-empty result as a timestamped JSON batch in the alerts directory.
#[derive(Debug, Clone)]
pub struct AlertEngine {
    alerts_dir: PathBuf,
    thresholds: AlertThresholds,
}

impl AlertEngine {
    pub fn new(alerts_dir: impl Into<PathBuf>, thresholds: AlertThresholds) -> Result<Self, PersistenceError> {
        let alerts_dir = alerts_dir.into();
        fs::create_dir_all(&alerts_dir).map_err(PersistenceError::io(&alerts_dir))?;
        Ok(Self { alerts_dir, thresholds })
    }

    /// Engine writing into the store's alerts directory.
    pub fn for_store(store: &SnapshotStore, thresholds: AlertThresholds) -> Result<Self, PersistenceError> {
        Self::new(store.alerts_dir(), thresholds)
    }

    pub fn alerts_dir(&self) -> &Path {
        &self.alerts_dir
    }

    pub fn thresholds(&self) -> &AlertThresholds {
        &self.thresholds
    }

    pub fn check_alerts(&self, store: &SnapshotStore) -> Vec<AlertEvent> {
        self.check_alerts_at(store, Utc::now())
    }

    /// Reads the configured window of snapshots and runs the rules. A batch
    /// file is written only when something fired; a failed write is logged
    /// and the alerts are still returned.
    #[instrument(level = "debug", skip_all)]
    pub fn check_alerts_at(&self, store: &SnapshotStore, now: DateTime<Utc>) -> Vec<AlertEvent> {
        let records = store.read_range_at(now.date_naive(), self.thresholds.window_days);
        if records.is_empty() {
            warn!("No data available for alert checking");
            return Vec::new();
        }

        let alerts = rules::evaluate(&records, &self.thresholds, now);
        if !alerts.is_empty() {
            if let Err(err) = self.save_alerts_at(&alerts, now) {
                error!("Error saving alerts: {err}");
            }
        }
        info!(count = alerts.len(), "Generated alerts");
        alerts
    }

    /// Writes `alerts` as one batch named after `now`. Never overwrites an
    /// earlier batch from the same second.
    pub fn save_alerts_at(&self, alerts: &[AlertEvent], now: DateTime<Utc>) -> Result<PathBuf, PersistenceError> {
        let stamp = now.format("%Y%m%d_%H%M%S").to_string();
        let mut path = self.alerts_dir.join(format!("{BATCH_PREFIX}{stamp}{BATCH_EXTENSION}"));
        let mut attempt = 1;
        while path.exists() {
            path = self
                .alerts_dir
                .join(format!("{BATCH_PREFIX}{stamp}_{attempt}{BATCH_EXTENSION}"));
            attempt += 1;
        }

        let json = serde_json::to_vec_pretty(alerts).map_err(PersistenceError::json(&path))?;
        fs::write(&path, json).map_err(PersistenceError::io(&path))?;
        info!(path = %path.display(), count = alerts.len(), "Saved alerts");
        Ok(path)
    }

    pub fn active_alerts(&self, window_hours: u32) -> Vec<AlertEvent> {
        self.active_alerts_at(Utc::now(), window_hours)
    }

    /// Alerts from batches modified within the window whose own timestamp is
    /// also within it, newest first, one per alert id.
    pub fn active_alerts_at(&self, now: DateTime<Utc>, window_hours: u32) -> Vec<AlertEvent> {
        let cutoff = now
            .checked_sub_signed(Duration::hours(i64::from(window_hours)))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let mut alerts = Vec::new();

        for path in self.batch_files() {
            let modified = match fs::metadata(&path).and_then(|meta| meta.modified()) {
                Ok(modified) => DateTime::<Utc>::from(modified),
                Err(err) => {
                    error!(path = %path.display(), "Error reading alert file: {err}");
                    continue;
                }
            };
            if modified < cutoff {
                continue;
            }

            match read_batch(&path) {
                Ok(batch) => alerts.extend(batch.into_iter().filter(|alert| alert.timestamp >= cutoff)),
                Err(err) => error!(path = %path.display(), "Error reading alert file: {err}"),
            }
        }

        alerts.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        let mut seen = HashSet::new();
        alerts.retain(|alert| seen.insert(alert.id.clone()));
        alerts
    }

    pub fn alert_summary(&self) -> AlertSummary {
        self.alert_summary_at(Utc::now())
    }

    pub fn alert_summary_at(&self, now: DateTime<Utc>) -> AlertSummary {
        AlertSummary::from_alerts(&self.active_alerts_at(now, SUMMARY_WINDOW_HOURS))
    }

    fn batch_files(&self) -> Vec<PathBuf> {
        let entries = match fs::read_dir(&self.alerts_dir) {
            Ok(entries) => entries,
            Err(err) => {
                error!(dir = %self.alerts_dir.display(), "Error getting active alerts: {err}");
                return Vec::new();
            }
        };
        entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .map(|name| name.to_string_lossy())
                    .is_some_and(|name| name.starts_with(BATCH_PREFIX) && name.ends_with(BATCH_EXTENSION))
            })
            .collect()
    }
}

fn read_batch(path: &Path) -> Result<Vec<AlertEvent>, PersistenceError> {
    let bytes = fs::read(path).map_err(PersistenceError::io(path))?;
    serde_json::from_slice(&bytes).map_err(PersistenceError::json(path))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        metrics::{
            OrgStatistics,
            OrganizationRef,
            SnapshotRecord,
        },
        store::Roster,
    };
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::{
        fs::File,
        time::SystemTime,
    };
    use temp_dir::TempDir;

    fn now() -> DateTime<Utc> {
        "2025-03-20T12:00:00Z".parse().unwrap()
    }

    fn engine(dir: &TempDir) -> AlertEngine {
        AlertEngine::new(dir.child("alerts"), AlertThresholds::default()).unwrap()
    }

    fn alert(kind: AlertKind, severity: Severity, org_id: &str, timestamp: DateTime<Utc>) -> AlertEvent {
        AlertEvent::new(kind, severity, "Org", org_id, "message", timestamp, json!({}))
    }

    #[test]
    fn duplicate_ids_keep_the_newest_occurrence() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir);
        let older = alert(AlertKind::StaleData, Severity::Warning, "org123", now() - Duration::hours(2));
        let mut newer = alert(AlertKind::StaleData, Severity::Critical, "org123", now() - Duration::hours(1));
        newer.message = "newest".to_string();

        engine.save_alerts_at(&[older], now() - Duration::hours(2)).unwrap();
        engine.save_alerts_at(&[newer.clone()], now() - Duration::hours(1)).unwrap();

        let active = engine.active_alerts_at(now(), 24);
        assert_eq!(active, vec![newer]);
        assert_eq!(active[0].id, "StaleData_org123");
    }

    #[test]
    fn batches_in_the_same_second_do_not_collide() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir);
        let first = engine
            .save_alerts_at(&[alert(AlertKind::StaleData, Severity::Warning, "a", now())], now())
            .unwrap();
        let second = engine
            .save_alerts_at(&[alert(AlertKind::StaleData, Severity::Warning, "b", now())], now())
            .unwrap();

        assert_ne!(first, second);
        assert!(first.ends_with("alerts_20250320_120000.json"));
        assert_eq!(engine.active_alerts_at(now(), 24).len(), 2);
    }

    #[test]
    fn alerts_outside_the_window_are_not_active() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir);
        let old = alert(AlertKind::StaleData, Severity::Warning, "old", now() - Duration::hours(30));
        let fresh = alert(AlertKind::StaleData, Severity::Warning, "fresh", now() - Duration::hours(3));
        engine.save_alerts_at(&[old, fresh.clone()], now()).unwrap();

        let stale_file = engine
            .save_alerts_at(&[alert(AlertKind::StaleData, Severity::Warning, "file", now())], now())
            .unwrap();
        File::options()
            .write(true)
            .open(&stale_file)
            .unwrap()
            .set_modified(SystemTime::from(now() - Duration::hours(48)))
            .unwrap();

        assert_eq!(engine.active_alerts_at(now(), 24), vec![fresh]);
    }

    #[test]
    fn huge_window_returns_every_alert() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir);
        let ancient = alert(AlertKind::StaleData, Severity::Warning, "ancient", now() - Duration::days(3650));
        engine.save_alerts_at(&[ancient.clone()], now()).unwrap();

        assert_eq!(engine.active_alerts_at(now(), u32::MAX), vec![ancient]);
    }

    #[test]
    fn unreadable_batches_are_skipped() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir);
        fs::write(engine.alerts_dir().join("alerts_broken.json"), "not json").unwrap();
        let good = alert(AlertKind::SystemUnavailable, Severity::Critical, "a", now());
        engine.save_alerts_at(&[good.clone()], now()).unwrap();

        assert_eq!(engine.active_alerts_at(now(), 24), vec![good]);
    }

    #[test]
    fn summary_counts_severities_and_kinds() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir);
        engine
            .save_alerts_at(
                &[
                    alert(AlertKind::StaleData, Severity::Warning, "a", now()),
                    alert(AlertKind::StaleData, Severity::Critical, "b", now()),
                    alert(AlertKind::SystemUnavailable, Severity::Critical, "a", now()),
                ],
                now(),
            )
            .unwrap();

        let summary = engine.alert_summary_at(now());

        assert_eq!(summary.total_alerts, 3);
        assert_eq!(summary.critical_alerts, 2);
        assert_eq!(summary.warning_alerts, 1);
        assert_eq!(
            summary.alert_types,
            BTreeMap::from([(AlertKind::StaleData, 2), (AlertKind::SystemUnavailable, 1)])
        );
    }

    #[test]
    fn check_alerts_persists_only_non_empty_batches() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::with_roster(dir.path(), Roster::default()).unwrap();
        let engine = AlertEngine::for_store(&store, AlertThresholds::default()).unwrap();
        let organization = OrganizationRef {
            ror_id: "ror1".to_string(),
            ror_link: "https://ror.org/ror1".to_string(),
            name: "University One".to_string(),
            acronym: None,
            main_grouping: None,
        };
        let today = now().date_naive();

        let mut fresh = OrgStatistics::empty("org1", now());
        fresh.data_freshness_days = Some(2);
        store
            .write_snapshot(today, &[SnapshotRecord::new(fresh, &organization, today)])
            .unwrap();
        let morning: DateTime<Utc> = "2025-03-20T01:00:00Z".parse().unwrap();
        assert!(engine.check_alerts_at(&store, morning).is_empty());
        assert_eq!(engine.batch_files().len(), 0);

        let mut stale = OrgStatistics::empty("org1", now());
        stale.data_freshness_days = Some(20);
        store
            .write_snapshot(today, &[SnapshotRecord::new(stale, &organization, today)])
            .unwrap();
        let alerts = engine.check_alerts_at(&store, morning);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind, AlertKind::StaleData);
        assert_eq!(engine.batch_files().len(), 1);
    }
}
