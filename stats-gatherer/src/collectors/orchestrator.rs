use crate::{
    collectors::OrganizationSource,
    metrics::{
        OrganizationRef,
        SnapshotRecord,
    },
    store::SnapshotStore,
};
use chrono::{
    DateTime,
    NaiveDate,
    Utc,
};
use eyre::Result;
use research_monitor_config::MIN_PACING;
use serde::Serialize;
use std::{
    path::PathBuf,
    time::{
        Duration,
        Instant,
    },
};

/// Outcome of one collection run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionReport {
    pub date: NaiveDate,
    pub attempted: usize,
    pub collected: usize,
    pub unresolved: usize,
    pub failed: usize,
    pub snapshot_path: Option<PathBuf>,
    pub duration_seconds: f64,
}

impl CollectionReport {
    /// A run succeeds when a snapshot with at least one record was written.
    pub fn success(&self) -> bool {
        self.snapshot_path.is_some()
    }
}

/// Walks the roster, collects statistics for every organization and writes
/// the day's snapshot.
pub struct Orchestrator<S> {
    source: S,
    store: SnapshotStore,
    pacing: Duration,
}

impl<S: OrganizationSource> Orchestrator<S> {
    pub fn new(source: S, store: SnapshotStore) -> Self {
        Self {
            source,
            store,
            pacing: MIN_PACING,
        }
    }

    /// Delay between two consecutive organizations.
    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub async fn run_daily_collection(&self) -> CollectionReport {
        self.run_daily_collection_at(Utc::now()).await
    }

    /// Organizations are processed one at a time. Unresolvable organizations
    /// are skipped and a failing organization never aborts the run. Nothing is
    /// written when no organization produced statistics.
    #[instrument(level = "debug", skip(self))]
    pub async fn run_daily_collection_at(&self, now: DateTime<Utc>) -> CollectionReport {
        let started = Instant::now();
        let date = now.date_naive();
        let organizations = self.store.roster().organizations();
        let mut report = CollectionReport {
            date,
            attempted: organizations.len(),
            collected: 0,
            unresolved: 0,
            failed: 0,
            snapshot_path: None,
            duration_seconds: 0.0,
        };

        if organizations.is_empty() {
            error!("No organizations data available");
            return report;
        }
        info!(
            organizations = organizations.len(),
            source = self.source.name(),
            "Starting daily data collection"
        );

        let mut records = Vec::with_capacity(organizations.len());
        for (idx, organization) in organizations.iter().enumerate() {
            if idx > 0 && !self.pacing.is_zero() {
                tokio::time::sleep(self.pacing).await;
            }

            info!(
                "Processing {}/{}: {}",
                idx + 1,
                organizations.len(),
                organization.display_name()
            );
            match self.collect_one(organization, date).await {
                Ok(Some(record)) => records.push(record),
                Ok(None) => report.unresolved += 1,
                Err(err) => {
                    error!(ror_link = %organization.ror_link, "Error processing organization: {err:#}");
                    report.failed += 1;
                }
            }
        }
        report.collected = records.len();

        if records.is_empty() {
            warn!("No data collected");
        } else {
            match self.store.write_snapshot(date, &records) {
                Ok(path) => report.snapshot_path = Some(path),
                Err(err) => error!("Failed to save daily snapshot: {err}"),
            }
        }

        report.duration_seconds = started.elapsed().as_secs_f64();
        info!(
            collected = report.collected,
            unresolved = report.unresolved,
            failed = report.failed,
            "Collection finished in {:.1}s",
            report.duration_seconds
        );
        report
    }

    async fn collect_one(&self, organization: &OrganizationRef, date: NaiveDate) -> Result<Option<SnapshotRecord>> {
        let org_id = match self.source.resolve_org_id(&organization.ror_link).await {
            Ok(Some(org_id)) => org_id,
            Ok(None) => {
                warn!(ror_link = %organization.ror_link, "Could not find OpenAIRE ID");
                return Ok(None);
            }
            Err(err) => {
                warn!(ror_link = %organization.ror_link, "Could not resolve OpenAIRE ID: {err:#}");
                return Ok(None);
            }
        };

        let stats = self.source.org_statistics(&org_id).await?;
        Ok(Some(SnapshotRecord::new(stats, organization, date)))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        metrics::OrgStatistics,
        store::Roster,
    };
    use eyre::eyre;
    use pretty_assertions::assert_eq;
    use std::{
        future::Future,
        pin::Pin,
    };
    use temp_dir::TempDir;

    /// Organizations `0..n`; ids listed in `unknown` do not resolve and those
    /// in `broken` fail while collecting.
    struct FakeSource {
        unknown: Vec<usize>,
        broken: Vec<usize>,
    }

    fn index(key: &str) -> usize {
        key.rsplit('-').next().and_then(|n| n.parse().ok()).unwrap()
    }

    impl OrganizationSource for FakeSource {
        fn resolve_org_id<'a>(
            &'a self,
            ror_link: &'a str,
        ) -> Pin<Box<dyn Future<Output = Result<Option<String>>> + Send + 'a>> {
            Box::pin(async move {
                let n = index(ror_link);
                Ok((!self.unknown.contains(&n)).then(|| format!("openorgs____::org-{n}")))
            })
        }

        fn org_statistics<'a>(
            &'a self,
            org_id: &'a str,
        ) -> Pin<Box<dyn Future<Output = Result<OrgStatistics>> + Send + 'a>> {
            Box::pin(async move {
                let n = index(org_id);
                if self.broken.contains(&n) {
                    return Err(eyre!("gateway exploded for {org_id}"));
                }
                let mut stats = OrgStatistics::empty(org_id, now());
                stats.publications_total = n as u64;
                Ok(stats)
            })
        }

        fn name(&self) -> &'static str {
            "FakeSource"
        }
    }

    fn now() -> DateTime<Utc> {
        "2025-03-20T02:00:00Z".parse().unwrap()
    }

    fn roster(n: usize) -> Roster {
        Roster::new(
            (0..n)
                .map(|i| OrganizationRef {
                    ror_id: format!("ror-{i}"),
                    ror_link: format!("https://ror.org/ror-{i}"),
                    name: format!("Organization {i}"),
                    acronym: None,
                    main_grouping: None,
                })
                .collect(),
        )
    }

    fn orchestrator(dir: &TempDir, organizations: usize, unknown: Vec<usize>, broken: Vec<usize>) -> Orchestrator<FakeSource> {
        let store = SnapshotStore::with_roster(dir.path(), roster(organizations)).unwrap();
        Orchestrator::new(FakeSource { unknown, broken }, store).with_pacing(Duration::ZERO)
    }

    #[tokio::test]
    async fn failing_organizations_do_not_abort_the_run() {
        let dir = TempDir::new().unwrap();
        let orchestrator = orchestrator(&dir, 10, vec![], vec![2, 5, 7]);

        let report = orchestrator.run_daily_collection_at(now()).await;

        assert!(report.success());
        assert_eq!(report.collected, 7);
        assert_eq!(report.failed, 3);
        let stored = orchestrator.store().read_snapshot(now().date_naive());
        assert_eq!(stored.len(), 7);
        assert!(stored.iter().all(|r| r.date == now().date_naive()));
        assert!(!stored.iter().any(|r| r.org_id == "openorgs____::org-5"));
    }

    #[tokio::test]
    async fn unresolved_organizations_are_skipped() {
        let dir = TempDir::new().unwrap();
        let orchestrator = orchestrator(&dir, 4, vec![0, 3], vec![]);

        let report = orchestrator.run_daily_collection_at(now()).await;

        assert_eq!(report.unresolved, 2);
        assert_eq!(report.collected, 2);
        let ids: Vec<_> = orchestrator
            .store()
            .read_snapshot(now().date_naive())
            .into_iter()
            .map(|r| r.org_id)
            .collect();
        assert_eq!(ids, vec!["openorgs____::org-1", "openorgs____::org-2"]);
    }

    #[tokio::test]
    async fn nothing_collected_means_failure_and_no_snapshot() {
        let dir = TempDir::new().unwrap();
        let orchestrator = orchestrator(&dir, 3, vec![0], vec![1, 2]);

        let report = orchestrator.run_daily_collection_at(now()).await;

        assert!(!report.success());
        assert!(!orchestrator.store().snapshot_path(now().date_naive()).exists());
    }

    #[tokio::test]
    async fn empty_roster_is_a_failure() {
        let dir = TempDir::new().unwrap();
        let orchestrator = orchestrator(&dir, 0, vec![], vec![]);

        let report = orchestrator.run_daily_collection_at(now()).await;

        assert!(!report.success());
        assert_eq!(report.attempted, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn organizations_are_paced() {
        let dir = TempDir::new().unwrap();
        let orchestrator = orchestrator(&dir, 4, vec![], vec![]).with_pacing(Duration::from_millis(500));

        let started = tokio::time::Instant::now();
        let report = orchestrator.run_daily_collection_at(now()).await;

        assert!(report.success());
        assert_eq!(started.elapsed(), Duration::from_millis(1500));
    }
}
