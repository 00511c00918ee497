//! Pure alert rules over a window of snapshot records.

use super::event::{
    AlertEvent,
    AlertKind,
    Severity,
};
use crate::metrics::SnapshotRecord;
use chrono::{
    DateTime,
    Duration,
    NaiveDate,
    NaiveTime,
    Utc,
};
use research_monitor_config::AlertThresholds;
use serde_json::json;
use std::collections::{
    BTreeMap,
    BTreeSet,
};

/// Length of each of the two compared windows of the drop rule.
pub const DROP_WINDOW_DAYS: i64 = 7;

/// Runs every rule for every organization in `records`.
///
/// Organizations are evaluated in id order; for each organization the rules
/// run as drop, stale, unavailable.
pub fn evaluate(records: &[SnapshotRecord], thresholds: &AlertThresholds, now: DateTime<Utc>) -> Vec<AlertEvent> {
    let mut by_org: BTreeMap<&str, Vec<&SnapshotRecord>> = BTreeMap::new();
    for record in records {
        by_org.entry(record.org_id.as_str()).or_default().push(record);
    }

    let mut alerts = Vec::new();
    for (org_id, mut rows) in by_org {
        rows.sort_by_key(|record| record.date);
        let organization = rows[0].organization_name.as_str();
        debug!(org_id, rows = rows.len(), "Evaluating alert rules");

        alerts.extend(publication_drop(&rows, organization, thresholds, now));
        alerts.extend(stale_data(&rows, organization, thresholds, now));
        alerts.extend(system_unavailable(&rows, organization, thresholds, now));
    }
    alerts
}

/// Compares the mean `publications_recent` of the week ending at the latest
/// snapshot with the week before it. Days without a snapshot do not count
/// toward either mean.
///
/// `rows` must belong to one organization and be sorted by date.
pub fn publication_drop(
    rows: &[&SnapshotRecord],
    organization: &str,
    thresholds: &AlertThresholds,
    now: DateTime<Utc>,
) -> Option<AlertEvent> {
    let days_of_data = rows.iter().map(|record| record.date).collect::<BTreeSet<_>>().len();
    if days_of_data < thresholds.min_days_of_data {
        return None;
    }

    let latest = rows.last()?.date;
    let recent_start = latest - Duration::days(DROP_WINDOW_DAYS - 1);
    let prior_start = recent_start - Duration::days(DROP_WINDOW_DAYS);

    let recent = mean_recent_publications(rows, recent_start, latest)?;
    let prior = mean_recent_publications(rows, prior_start, recent_start - Duration::days(1))?;
    if prior <= 0.0 {
        return None;
    }

    let drop_percent = (prior - recent) / prior * 100.0;
    if drop_percent < thresholds.publication_drop_percent {
        return None;
    }

    let severity = if drop_percent >= thresholds.publication_drop_critical_percent {
        Severity::Critical
    } else {
        Severity::Warning
    };
    Some(AlertEvent::new(
        AlertKind::PublicationDrop,
        severity,
        organization,
        &rows[0].org_id,
        format!("Publications dropped by {drop_percent:.1}% ({prior:.1} → {recent:.1})"),
        now,
        json!({
            "drop_percent": drop_percent,
            "previous_avg": prior,
            "recent_avg": recent,
        }),
    ))
}

fn mean_recent_publications(rows: &[&SnapshotRecord], from: NaiveDate, to: NaiveDate) -> Option<f64> {
    let values: Vec<f64> = rows
        .iter()
        .filter(|record| record.date >= from && record.date <= to)
        .map(|record| record.publications_recent as f64)
        .collect();
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Flags an organization whose newest snapshot reports old publication data.
pub fn stale_data(
    rows: &[&SnapshotRecord],
    organization: &str,
    thresholds: &AlertThresholds,
    now: DateTime<Utc>,
) -> Option<AlertEvent> {
    let latest = rows.last()?;
    let freshness = latest.data_freshness_days?;
    if freshness < thresholds.stale_data_days {
        return None;
    }

    let severity = if freshness >= thresholds.stale_data_critical_days {
        Severity::Critical
    } else {
        Severity::Warning
    };
    Some(AlertEvent::new(
        AlertKind::StaleData,
        severity,
        organization,
        &latest.org_id,
        format!("Data is {freshness} days old"),
        now,
        json!({
            "data_freshness_days": freshness,
            "last_publication_date": latest.last_publication_date,
        }),
    ))
}

/// Flags an organization whose newest snapshot date, taken as midnight UTC,
/// lies too far in the past.
pub fn system_unavailable(
    rows: &[&SnapshotRecord],
    organization: &str,
    thresholds: &AlertThresholds,
    now: DateTime<Utc>,
) -> Option<AlertEvent> {
    let latest = rows.iter().map(|record| record.date).max()?;
    let last_update = latest.and_time(NaiveTime::MIN).and_utc();
    let hours_since_update = (now - last_update).num_seconds() as f64 / 3600.0;
    if hours_since_update < thresholds.system_unavailable_hours {
        return None;
    }

    Some(AlertEvent::new(
        AlertKind::SystemUnavailable,
        Severity::Critical,
        organization,
        &rows[0].org_id,
        format!("No data updates for {hours_since_update:.1} hours"),
        now,
        json!({
            "hours_since_update": hours_since_update,
            "last_update": last_update,
        }),
    ))
}
