use serde::{
    Deserialize,
    Serialize,
};

/// One row of the organization roster.
///
/// Field names follow the roster spreadsheet columns, so the same struct
/// deserializes from both the CSV and the XLSX form. Only `ROR_LINK` is
/// required; it is what the organization is resolved by.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationRef {
    #[serde(rename = "ROR", default)]
    pub ror_id: String,
    #[serde(rename = "ROR_LINK")]
    pub ror_link: String,
    #[serde(rename = "full_name_in_English", default)]
    pub name: String,
    #[serde(rename = "acronym_EN", default)]
    pub acronym: Option<String>,
    #[serde(rename = "main_grouping", default)]
    pub main_grouping: Option<String>,
}

impl OrganizationRef {
    /// Acronym when present, otherwise the full name.
    pub fn display_name(&self) -> &str {
        self.acronym
            .as_deref()
            .filter(|acronym| !acronym.trim().is_empty())
            .unwrap_or(&self.name)
    }
}
