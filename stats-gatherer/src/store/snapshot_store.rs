use super::{
    error::{
        ExportError,
        PersistenceError,
    },
    export,
    roster::Roster,
};
use crate::metrics::{
    Metric,
    SnapshotRecord,
    TrendPoint,
};
use chrono::{
    DateTime,
    Days,
    Duration,
    NaiveDate,
    Utc,
};
use serde::Serialize;
use std::{
    collections::BTreeSet,
    fs,
    io,
    path::{
        Path,
        PathBuf,
    },
    time::SystemTime,
};

pub const DAILY_DIR: &str = "daily";
pub const ORGANIZATIONS_DIR: &str = "organizations";
pub const ALERTS_DIR: &str = "alerts";
pub const EXPORTS_DIR: &str = "exports";

const SNAPSHOT_PREFIX: &str = "daily_stats_";
const SNAPSHOT_EXTENSION: &str = ".csv";

/// Days of history in the `Recent_Data` and `Historical_Data` export sheets.
pub const EXPORT_RECENT_DAYS: u32 = 30;
pub const EXPORT_HISTORICAL_DAYS: u32 = 90;

/// Aggregate figures over the daily snapshot directory.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SystemStats {
    pub total_orgs: usize,
    pub total_data_points: usize,
    pub days_of_data: usize,
}

/// File-backed store of daily per-organization snapshots.
///
/// ```text
/// <data_dir>/daily/daily_stats_YYYYMMDD.csv
/// <data_dir>/alerts/alerts_YYYYMMDD_HHMMSS.json
/// <data_dir>/exports/full_export_YYYYMMDD_HHMMSS.xlsx
/// ```
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    data_dir: PathBuf,
    roster: Roster,
}

impl SnapshotStore {
    /// Creates the directory layout and loads the roster. A missing roster
    /// yields an empty one.
    pub fn open(data_dir: impl Into<PathBuf>, roster_path: &Path) -> Result<Self, PersistenceError> {
        let roster = Roster::load_or_empty(roster_path);
        Self::with_roster(data_dir, roster)
    }

    pub fn with_roster(data_dir: impl Into<PathBuf>, roster: Roster) -> Result<Self, PersistenceError> {
        let store = Self {
            data_dir: data_dir.into(),
            roster,
        };
        for dir in [DAILY_DIR, ORGANIZATIONS_DIR, ALERTS_DIR, EXPORTS_DIR] {
            let path = store.data_dir.join(dir);
            fs::create_dir_all(&path).map_err(PersistenceError::io(&path))?;
        }
        Ok(store)
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn daily_dir(&self) -> PathBuf {
        self.data_dir.join(DAILY_DIR)
    }

    pub fn alerts_dir(&self) -> PathBuf {
        self.data_dir.join(ALERTS_DIR)
    }

    pub fn exports_dir(&self) -> PathBuf {
        self.data_dir.join(EXPORTS_DIR)
    }

    pub fn snapshot_path(&self, date: NaiveDate) -> PathBuf {
        self.daily_dir()
            .join(format!("{SNAPSHOT_PREFIX}{}{SNAPSHOT_EXTENSION}", date.format("%Y%m%d")))
    }

    /// Replaces the snapshot for `date`. Every record is stamped with that date.
    ///
    /// The file is written next to its final location and renamed into place,
    /// so readers never observe a partial snapshot.
    pub fn write_snapshot(&self, date: NaiveDate, records: &[SnapshotRecord]) -> Result<PathBuf, PersistenceError> {
        let path = self.snapshot_path(date);
        let staging = path.with_extension("csv.tmp");

        let written = stage_records(&staging, date, records)
            .and_then(|()| fs::rename(&staging, &path).map_err(PersistenceError::io(&path)));
        if let Err(err) = written {
            if let Err(cleanup) = fs::remove_file(&staging) {
                if cleanup.kind() != io::ErrorKind::NotFound {
                    warn!(path = %staging.display(), "Failed to remove staging file: {cleanup}");
                }
            }
            return Err(err);
        }

        info!(path = %path.display(), records = records.len(), "Saved daily snapshot");
        Ok(path)
    }

    /// Records of the snapshot for `date`; empty when it is missing or unreadable.
    pub fn read_snapshot(&self, date: NaiveDate) -> Vec<SnapshotRecord> {
        read_records(&self.snapshot_path(date))
    }

    /// Records of the last `days` days up to and including today.
    pub fn read_range(&self, days: u32) -> Vec<SnapshotRecord> {
        self.read_range_at(Utc::now().date_naive(), days)
    }

    /// Records of every snapshot dated `today - days ..= today`, oldest first.
    /// Days without a snapshot are skipped; a window reaching past the
    /// calendar's start covers everything on disk.
    pub fn read_range_at(&self, today: NaiveDate, days: u32) -> Vec<SnapshotRecord> {
        let start = today
            .checked_sub_days(Days::new(u64::from(days)))
            .unwrap_or(NaiveDate::MIN);

        let mut dates: Vec<NaiveDate> = self
            .snapshot_files()
            .iter()
            .filter_map(|(path, _)| snapshot_date(path))
            .filter(|date| (start..=today).contains(date))
            .collect();
        dates.sort_unstable();

        dates.into_iter().flat_map(|date| self.read_snapshot(date)).collect()
    }

    /// The most recently modified snapshot; empty when there is none.
    pub fn latest_snapshot(&self) -> Vec<SnapshotRecord> {
        self.snapshot_files()
            .into_iter()
            .max_by_key(|(_, modified)| *modified)
            .map(|(path, _)| read_records(&path))
            .unwrap_or_default()
    }

    /// Modification time of the most recent snapshot.
    pub fn last_update_time(&self) -> Option<DateTime<Utc>> {
        self.snapshot_files()
            .into_iter()
            .map(|(_, modified)| DateTime::<Utc>::from(modified))
            .max()
    }

    /// Deletes daily snapshots older than `days`; returns how many were removed.
    pub fn prune_older_than(&self, days: u32) -> usize {
        self.prune_older_than_at(Utc::now(), days)
    }

    /// Only snapshot files whose modification time is before `now - days` are
    /// removed. The roster and every other directory are left alone.
    pub fn prune_older_than_at(&self, now: DateTime<Utc>, days: u32) -> usize {
        let cutoff = now
            .checked_sub_signed(Duration::days(i64::from(days)))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let mut removed = 0;
        for (path, modified) in self.snapshot_files() {
            if DateTime::<Utc>::from(modified) >= cutoff {
                continue;
            }
            match fs::remove_file(&path) {
                Ok(()) => {
                    info!(path = %path.display(), "Removed old snapshot");
                    removed += 1;
                }
                Err(err) => error!(path = %path.display(), "Failed to remove old snapshot: {err}"),
            }
        }
        removed
    }

    /// Values of `metric` for one organization over the last `days` days.
    pub fn organization_trend(&self, org_id: &str, metric: Metric, days: u32) -> Vec<TrendPoint> {
        self.organization_trend_at(Utc::now().date_naive(), org_id, metric, days)
    }

    pub fn organization_trend_at(&self, today: NaiveDate, org_id: &str, metric: Metric, days: u32) -> Vec<TrendPoint> {
        self.read_range_at(today, days)
            .iter()
            .filter(|record| record.org_id == org_id)
            .filter_map(|record| {
                metric.value(record).map(|value| TrendPoint {
                    date: record.date,
                    value,
                })
            })
            .collect()
    }

    /// Counts the roster, every stored record and the number of snapshot files.
    pub fn system_stats(&self) -> SystemStats {
        let files = self.snapshot_files();
        let total_data_points = files.iter().map(|(path, _)| read_records(path).len()).sum();
        let total_orgs = if self.roster.is_empty() {
            self.latest_snapshot()
                .iter()
                .map(|record| record.org_id.as_str())
                .collect::<BTreeSet<_>>()
                .len()
        } else {
            self.roster.len()
        };

        SystemStats {
            total_orgs,
            total_data_points,
            days_of_data: files.len(),
        }
    }

    /// Writes a workbook with the roster, the last 30 days and the last 90 days of snapshots.
    pub fn export_all(&self) -> Result<PathBuf, ExportError> {
        self.export_all_at(Utc::now())
    }

    pub fn export_all_at(&self, now: DateTime<Utc>) -> Result<PathBuf, ExportError> {
        let path = self
            .exports_dir()
            .join(format!("full_export_{}.xlsx", now.format("%Y%m%d_%H%M%S")));
        let today = now.date_naive();
        let recent = self.read_range_at(today, EXPORT_RECENT_DAYS);
        let historical = self.read_range_at(today, EXPORT_HISTORICAL_DAYS);

        export::write_workbook(&path, self.roster.organizations(), &recent, &historical)?;
        info!(path = %path.display(), "Exported all data");
        Ok(path)
    }

    fn snapshot_files(&self) -> Vec<(PathBuf, SystemTime)> {
        let dir = self.daily_dir();
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(dir = %dir.display(), "Cannot list snapshots: {err}");
                return Vec::new();
            }
        };

        entries
            .filter_map(Result::ok)
            .filter(|entry| {
                let name = entry.file_name();
                let name = name.to_string_lossy();
                name.starts_with(SNAPSHOT_PREFIX) && name.ends_with(SNAPSHOT_EXTENSION)
            })
            .filter_map(|entry| {
                let modified = entry.metadata().and_then(|meta| meta.modified()).ok()?;
                Some((entry.path(), modified))
            })
            .collect()
    }
}

fn stage_records(staging: &Path, date: NaiveDate, records: &[SnapshotRecord]) -> Result<(), PersistenceError> {
    let mut writer = csv::Writer::from_path(staging).map_err(PersistenceError::csv(staging))?;
    for record in records {
        let mut record = record.clone();
        record.date = date;
        writer.serialize(&record).map_err(PersistenceError::csv(staging))?;
    }
    writer.flush().map_err(PersistenceError::io(staging))
}

/// Date encoded in a `daily_stats_YYYYMMDD.csv` file name.
fn snapshot_date(path: &Path) -> Option<NaiveDate> {
    let name = path.file_name()?.to_str()?;
    let stamp = name.strip_prefix(SNAPSHOT_PREFIX)?.strip_suffix(SNAPSHOT_EXTENSION)?;
    NaiveDate::parse_from_str(stamp, "%Y%m%d").ok()
}

fn read_records(path: &Path) -> Vec<SnapshotRecord> {
    if !path.exists() {
        return Vec::new();
    }
    let mut reader = match csv::Reader::from_path(path) {
        Ok(reader) => reader,
        Err(err) => {
            error!(path = %path.display(), "Failed to open snapshot: {err}");
            return Vec::new();
        }
    };
    match reader.deserialize().collect::<Result<Vec<SnapshotRecord>, _>>() {
        Ok(records) => records,
        Err(err) => {
            error!(path = %path.display(), "Failed to read snapshot: {err}");
            Vec::new()
        }
    }
}
