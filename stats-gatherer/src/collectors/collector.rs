use crate::metrics::OrgStatistics;
use eyre::Result;
use std::{
    future::Future,
    pin::Pin,
};

/// Source of per-organization statistics used by the orchestrator.
pub trait OrganizationSource {
    /// Gateway organization id for a roster ROR link, `None` when unknown.
    fn resolve_org_id<'a>(&'a self, ror_link: &'a str)
        -> Pin<Box<dyn Future<Output = Result<Option<String>>> + Send + 'a>>;

    /// Statistics for an already resolved organization.
    fn org_statistics<'a>(&'a self, org_id: &'a str) -> Pin<Box<dyn Future<Output = Result<OrgStatistics>> + Send + 'a>>;

    /// Get the name of this source
    fn name(&self) -> &'static str;
}
