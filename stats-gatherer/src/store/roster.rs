use super::error::PersistenceError;
use crate::metrics::OrganizationRef;
use calamine::{
    open_workbook_auto,
    Reader,
    RangeDeserializerBuilder,
};
use std::path::{
    Path,
    PathBuf,
};

/// The list of organizations to monitor, loaded from a CSV or XLSX sheet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Roster {
    organizations: Vec<OrganizationRef>,
}

impl Roster {
    pub fn new(organizations: Vec<OrganizationRef>) -> Self {
        Self { organizations }
    }

    /// Reads the roster; the format is picked from the file extension
    /// (`csv`, anything else is treated as a spreadsheet).
    pub fn load(path: &Path) -> Result<Self, PersistenceError> {
        let is_csv = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));

        let organizations = if is_csv {
            load_csv(path)?
        } else {
            load_spreadsheet(path)?
        };
        Ok(Self { organizations })
    }

    /// Like [`Roster::load`] but an unreadable or missing roster is logged and
    /// treated as empty.
    pub fn load_or_empty(path: &Path) -> Self {
        match Self::load(path) {
            Ok(roster) => {
                info!(path = %path.display(), organizations = roster.len(), "Loaded organization roster");
                roster
            }
            Err(err) => {
                error!("{err}");
                Self::default()
            }
        }
    }

    pub fn organizations(&self) -> &[OrganizationRef] {
        &self.organizations
    }

    pub fn len(&self) -> usize {
        self.organizations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.organizations.is_empty()
    }
}

fn roster_error(path: &Path, reason: impl ToString) -> PersistenceError {
    PersistenceError::Roster {
        path: PathBuf::from(path),
        reason: reason.to_string(),
    }
}

/// Keeps a parsed row if it names an organization link, otherwise logs
/// why the row was dropped. `row` is the 1-based sheet row.
fn accept_row<E: std::fmt::Display>(
    path: &Path,
    row: usize,
    parsed: Result<OrganizationRef, E>,
) -> Option<OrganizationRef> {
    match parsed {
        Ok(organization) if organization.ror_link.trim().is_empty() => {
            warn!(path = %path.display(), row, "Skipping roster row without ROR_LINK");
            None
        }
        Ok(organization) => Some(organization),
        Err(err) => {
            warn!(path = %path.display(), row, "Skipping invalid roster row: {err}");
            None
        }
    }
}

fn load_csv(path: &Path) -> Result<Vec<OrganizationRef>, PersistenceError> {
    let mut reader = csv::Reader::from_path(path).map_err(|err| roster_error(path, err))?;
    let organizations = reader
        .deserialize::<OrganizationRef>()
        .enumerate()
        .filter_map(|(index, parsed)| accept_row(path, index + 2, parsed))
        .collect();
    Ok(organizations)
}

fn load_spreadsheet(path: &Path) -> Result<Vec<OrganizationRef>, PersistenceError> {
    let mut workbook = open_workbook_auto(path).map_err(|err| roster_error(path, err))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| roster_error(path, "workbook has no sheets"))?
        .map_err(|err| roster_error(path, err))?;

    let first_row = range.start().map_or(0, |(row, _)| row as usize);
    let organizations = RangeDeserializerBuilder::new()
        .from_range::<_, OrganizationRef>(&range)
        .map_err(|err| roster_error(path, err))?
        .enumerate()
        .filter_map(|(index, parsed)| accept_row(path, first_row + index + 2, parsed))
        .collect();
    Ok(organizations)
}
