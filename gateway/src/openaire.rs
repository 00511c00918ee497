//! OpenAIRE graph endpoints used by the monitor: organizations, results
//! (publications) and data sources.

use crate::{
    client::GatewayClient,
    error::RequestError,
    payload::Payload,
    request_log::RequestContext,
};
use chrono::NaiveDate;
use serde_json::Value;

/// Internal organization ids issued by OpenOrgs carry this prefix.
pub const OPENORGS_PREFIX: &str = "openorgs____::";
pub const PUBLICATIONS_PAGE_SIZE: u32 = 100;
pub const DATA_SOURCES_PAGE_SIZE: u32 = 50;

/// Optional collection-date bounds for publication queries.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DateFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl GatewayClient {
    /// Resolves the gateway organization id for an external persistent id (a ROR link).
    /// No matching candidate is not an error and yields `None`.
    #[instrument(level = "debug", skip(self))]
    pub async fn resolve_organization_id(&self, ror_link: &str) -> Result<Option<String>, RequestError> {
        let url = self.endpoint("organizations")?;
        let context = RequestContext::new("get_organization_id")
            .tag("ror_link", ror_link)
            .tag("endpoint", "organizations");
        let payload = self.request(&url, &[("pid", ror_link.to_string())], context).await?;

        let org_id = payload
            .results()
            .iter()
            .filter_map(|candidate| candidate.get("id").and_then(Value::as_str))
            .find(|id| id.starts_with(OPENORGS_PREFIX))
            .map(str::to_string);

        match &org_id {
            Some(id) => info!(org_id = %id, %ror_link, "Found organization ID"),
            None => warn!(%ror_link, "No organization ID found"),
        }
        Ok(org_id)
    }

    /// Most recently collected publications produced by the organization.
    #[instrument(level = "debug", skip(self))]
    pub async fn organization_publications(&self, org_id: &str, filter: DateFilter) -> Result<Payload, RequestError> {
        let url = self.endpoint("results")?;
        let mut params = vec![
            ("format", "json".to_string()),
            ("size", PUBLICATIONS_PAGE_SIZE.to_string()),
            ("sortBy", "dateofcollection".to_string()),
            ("sortOrder", "desc".to_string()),
            (
                "fq",
                format!(r#"(reltypevalue exact "isProducedBy") AND (relorganizationid exact "{org_id}")"#),
            ),
        ];
        if let Some(from) = filter.from {
            params.push(("from", from.format("%Y-%m-%d").to_string()));
        }
        if let Some(to) = filter.to {
            params.push(("to", to.format("%Y-%m-%d").to_string()));
        }

        let context = RequestContext::new("get_organization_publications")
            .tag("org_id", org_id)
            .tag("endpoint", "results")
            .tag(
                "date_filter",
                serde_json::json!({
                    "from_date": filter.from.map(|d| d.to_string()),
                    "to_date": filter.to.map(|d| d.to_string()),
                }),
            );

        let payload = self.request(&url, &params, context).await?;
        info!(
            org_id,
            returned = payload.results().len(),
            total = payload.total(),
            "Retrieved publications"
        );
        Ok(payload)
    }

    /// Data sources related to the organization.
    #[instrument(level = "debug", skip(self))]
    pub async fn data_sources(&self, org_id: &str) -> Result<Payload, RequestError> {
        let url = self.endpoint("datasources")?;
        let params = [
            ("format", "json".to_string()),
            ("size", DATA_SOURCES_PAGE_SIZE.to_string()),
            ("fq", format!(r#"relorganizationid exact "{org_id}""#)),
        ];
        let context = RequestContext::new("get_data_sources")
            .tag("org_id", org_id)
            .tag("endpoint", "datasources");

        let payload = self.request(&url, &params, context).await?;
        info!(org_id, count = payload.results().len(), "Retrieved data sources");
        Ok(payload)
    }

    /// Obtains a token and issues a minimal organizations query.
    pub async fn test_connection(&self) -> bool {
        info!("Testing API connection...");
        if let Err(err) = self.access_token().await {
            error!("API connection test failed - no access token: {err}");
            return false;
        }

        let url = match self.endpoint("organizations") {
            Ok(url) => url,
            Err(err) => {
                error!("API connection test failed: {err}");
                return false;
            }
        };
        let context = RequestContext::new("test_connection")
            .tag("endpoint", "organizations")
            .tag("test_query", true);
        match self.request(&url, &[("size", "1".to_string())], context).await {
            Ok(_) => {
                info!("API connection test successful");
                true
            }
            Err(err) => {
                error!("API connection test failed: {err}");
                false
            }
        }
    }
}
