//! Spreadsheet export of the roster and stored snapshots.

use super::error::ExportError;
use crate::metrics::{
    OrganizationRef,
    SnapshotRecord,
};
use rust_xlsxwriter::{
    Format,
    Workbook,
    Worksheet,
};
use std::path::Path;

enum Value<'a> {
    Text(&'a str),
    Number(f64),
    Owned(String),
    Empty,
}

trait Row {
    const HEADERS: &'static [&'static str];

    fn values(&self) -> Vec<Value<'_>>;
}

impl Row for OrganizationRef {
    const HEADERS: &'static [&'static str] = &["ROR", "ROR_LINK", "full_name_in_English", "acronym_EN", "main_grouping"];

    fn values(&self) -> Vec<Value<'_>> {
        vec![
            Value::Text(&self.ror_id),
            Value::Text(&self.ror_link),
            Value::Text(&self.name),
            optional_text(self.acronym.as_deref()),
            optional_text(self.main_grouping.as_deref()),
        ]
    }
}

impl Row for SnapshotRecord {
    const HEADERS: &'static [&'static str] = &[
        "date",
        "org_id",
        "organization_name",
        "acronym",
        "main_grouping",
        "ror_id",
        "ror_link",
        "timestamp",
        "publications_total",
        "publications_recent",
        "data_sources_count",
        "last_publication_date",
        "data_freshness_days",
        "repository_health",
    ];

    fn values(&self) -> Vec<Value<'_>> {
        vec![
            Value::Owned(self.date.to_string()),
            Value::Text(&self.org_id),
            Value::Text(&self.organization_name),
            optional_text(self.acronym.as_deref()),
            optional_text(self.main_grouping.as_deref()),
            Value::Text(&self.ror_id),
            Value::Text(&self.ror_link),
            Value::Owned(self.timestamp.to_rfc3339()),
            Value::Number(self.publications_total as f64),
            Value::Number(self.publications_recent as f64),
            Value::Number(self.data_sources_count as f64),
            self.last_publication_date
                .map_or(Value::Empty, |date| Value::Owned(date.to_string())),
            self.data_freshness_days
                .map_or(Value::Empty, |days| Value::Number(days as f64)),
            Value::Owned(self.repository_health.to_string()),
        ]
    }
}

fn optional_text(value: Option<&str>) -> Value<'_> {
    value.map_or(Value::Empty, Value::Text)
}

/// Writes the `Organizations`, `Recent_Data` and `Historical_Data` sheets.
pub(super) fn write_workbook(
    path: &Path,
    organizations: &[OrganizationRef],
    recent: &[SnapshotRecord],
    historical: &[SnapshotRecord],
) -> Result<(), ExportError> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();

    write_sheet(workbook.add_worksheet(), "Organizations", organizations, &header)?;
    write_sheet(workbook.add_worksheet(), "Recent_Data", recent, &header)?;
    write_sheet(workbook.add_worksheet(), "Historical_Data", historical, &header)?;

    workbook.save(path)?;
    Ok(())
}

fn write_sheet<R: Row>(sheet: &mut Worksheet, name: &str, rows: &[R], header: &Format) -> Result<(), ExportError> {
    sheet.set_name(name)?;
    for (col, title) in R::HEADERS.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *title, header)?;
    }

    for (idx, row) in rows.iter().enumerate() {
        let row_num = idx as u32 + 1;
        for (col, value) in row.values().into_iter().enumerate() {
            let col = col as u16;
            match value {
                Value::Text(text) => {
                    sheet.write_string(row_num, col, text)?;
                }
                Value::Owned(text) => {
                    sheet.write_string(row_num, col, text)?;
                }
                Value::Number(number) => {
                    sheet.write_number(row_num, col, number)?;
                }
                Value::Empty => {}
            }
        }
    }
    Ok(())
}
