//! Terminal tables for collection runs, store status and alerts.

use crate::{
    alerts::{
        AlertEvent,
        AlertSummary,
        Severity,
    },
    collectors::CollectionReport,
    metrics::{
        Health,
        SnapshotRecord,
    },
    store::SystemStats,
};
use chrono::{
    DateTime,
    Utc,
};
use comfy_table::{
    presets,
    Attribute,
    Cell,
    Color,
    ContentArrangement,
    Table,
};

fn table(title: &str) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![Cell::new(title).add_attribute(Attribute::Bold).fg(Color::Cyan)]);
    table
}

fn label(text: &str) -> Cell {
    Cell::new(text).add_attribute(Attribute::Bold)
}

fn health_color(health: Health) -> Color {
    match health {
        Health::Healthy => Color::Green,
        Health::Warning => Color::Yellow,
        Health::Critical => Color::Red,
        Health::Unknown => Color::DarkGrey,
    }
}

fn severity_color(severity: Severity) -> Color {
    match severity {
        Severity::Warning => Color::Yellow,
        Severity::Critical => Color::Red,
    }
}

pub fn format_collection(report: &CollectionReport) -> String {
    let mut table = table("📥 DAILY COLLECTION");
    table.add_row(vec![label("Date"), Cell::new(report.date)]);
    table.add_row(vec![label("Organizations"), Cell::new(report.attempted)]);
    table.add_row(vec![label("Collected"), Cell::new(report.collected).fg(Color::Green)]);
    table.add_row(vec![label("Unresolved"), Cell::new(report.unresolved)]);
    table.add_row(vec![
        label("Failed"),
        Cell::new(report.failed).fg(if report.failed > 0 { Color::Red } else { Color::Reset }),
    ]);
    table.add_row(vec![
        label("Snapshot"),
        match &report.snapshot_path {
            Some(path) => Cell::new(path.display()),
            None => Cell::new("❌ not written").fg(Color::Red),
        },
    ]);
    table.add_row(vec![label("Duration"), Cell::new(format!("{:.1}s", report.duration_seconds))]);
    table.to_string()
}

pub fn format_status(stats: &SystemStats, last_update: Option<DateTime<Utc>>, latest: &[SnapshotRecord]) -> String {
    let mut output = String::new();

    let mut summary = table("🗂️  STORE STATUS");
    summary.add_row(vec![label("Organizations"), Cell::new(stats.total_orgs)]);
    summary.add_row(vec![label("Data points"), Cell::new(stats.total_data_points)]);
    summary.add_row(vec![label("Days of data"), Cell::new(stats.days_of_data)]);
    summary.add_row(vec![
        label("Last update"),
        Cell::new(
            last_update
                .map(|at| at.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                .unwrap_or_else(|| "never".to_string()),
        ),
    ]);
    output.push_str(&format!("{summary}\n"));

    if latest.is_empty() {
        return output;
    }

    let mut organizations = Table::new();
    organizations
        .load_preset(presets::UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            ["Organization", "Publications", "Recent", "Data sources", "Freshness", "Health"]
                .into_iter()
                .map(|title| Cell::new(title).add_attribute(Attribute::Bold)),
        );
    for record in latest {
        organizations.add_row(vec![
            Cell::new(record.display_name()),
            Cell::new(record.publications_total),
            Cell::new(record.publications_recent),
            Cell::new(record.data_sources_count),
            Cell::new(
                record
                    .data_freshness_days
                    .map(|days| format!("{days}d"))
                    .unwrap_or_else(|| "-".to_string()),
            ),
            Cell::new(record.repository_health).fg(health_color(record.repository_health)),
        ]);
    }
    output.push_str(&format!("{organizations}\n"));
    output
}

pub fn format_alerts(alerts: &[AlertEvent], summary: &AlertSummary) -> String {
    let mut output = String::new();

    let mut overview = table("🚨 ALERTS");
    overview.add_row(vec![label("Total"), Cell::new(summary.total_alerts)]);
    overview.add_row(vec![label("Critical"), Cell::new(summary.critical_alerts).fg(Color::Red)]);
    overview.add_row(vec![label("Warning"), Cell::new(summary.warning_alerts).fg(Color::Yellow)]);
    for (kind, count) in &summary.alert_types {
        overview.add_row(vec![label(&kind.to_string()), Cell::new(count)]);
    }
    output.push_str(&format!("{overview}\n"));

    if alerts.is_empty() {
        output.push_str("No active alerts.\n");
        return output;
    }

    let mut list = Table::new();
    list.load_preset(presets::UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            ["Time", "Severity", "Type", "Organization", "Message"]
                .into_iter()
                .map(|title| Cell::new(title).add_attribute(Attribute::Bold)),
        );
    for alert in alerts {
        list.add_row(vec![
            Cell::new(alert.timestamp.format("%Y-%m-%d %H:%M")),
            Cell::new(alert.severity).fg(severity_color(alert.severity)),
            Cell::new(alert.kind),
            Cell::new(&alert.organization),
            Cell::new(&alert.message),
        ]);
    }
    output.push_str(&format!("{list}\n"));
    output
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::alerts::AlertKind;
    use serde_json::json;

    #[test]
    fn alert_table_lists_every_alert() {
        let timestamp: DateTime<Utc> = "2025-03-20T08:00:00Z".parse().unwrap();
        let alerts = vec![AlertEvent::new(
            AlertKind::StaleData,
            Severity::Critical,
            "University One",
            "org1",
            "Data is 31 days old",
            timestamp,
            json!({}),
        )];
        let summary = AlertSummary {
            total_alerts: 1,
            critical_alerts: 1,
            ..Default::default()
        };

        let output = format_alerts(&alerts, &summary);

        assert!(output.contains("University One"));
        assert!(output.contains("Data is 31 days old"));
        assert!(output.contains("critical"));
    }

    #[test]
    fn status_without_snapshots() {
        let output = format_status(&SystemStats::default(), None, &[]);
        assert!(output.contains("never"));
        assert!(!output.contains("Organization "));
    }
}
