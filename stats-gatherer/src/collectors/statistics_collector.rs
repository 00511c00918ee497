use crate::{
    collectors::OrganizationSource,
    metrics::OrgStatistics,
};
use chrono::{
    DateTime,
    Utc,
};
use eyre::Result;
use research_monitor_gateway::{
    DateFilter,
    GatewayClient,
};
use std::{
    future::Future,
    pin::Pin,
    sync::Arc,
    time::Instant,
};

/// Derives [`OrgStatistics`] from the gateway's publication and data-source listings.
#[derive(Debug, Clone)]
pub struct StatisticsCollector {
    client: Arc<GatewayClient>,
}

impl StatisticsCollector {
    pub fn new(client: Arc<GatewayClient>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &GatewayClient {
        &self.client
    }

    pub async fn derive_stats(&self, org_id: &str) -> OrgStatistics {
        self.derive_stats_at(org_id, Utc::now()).await
    }

    /// Never fails: a sub-fetch that errors leaves its fields at their defaults.
    #[instrument(level = "debug", skip(self))]
    pub async fn derive_stats_at(&self, org_id: &str, now: DateTime<Utc>) -> OrgStatistics {
        let started = Instant::now();
        let mut stats = OrgStatistics::empty(org_id, now);

        match self
            .client
            .organization_publications(org_id, DateFilter::default())
            .await
        {
            Ok(payload) if payload.is_paginated() => stats.apply_publications(&payload, now),
            Ok(_) => warn!(org_id, "publications response has no results listing"),
            Err(err) => warn!(org_id, "publications unavailable: {err}"),
        }

        match self.client.data_sources(org_id).await {
            Ok(payload) if payload.is_paginated() => stats.data_sources_count = payload.results().len() as u64,
            Ok(_) => warn!(org_id, "data sources response has no results listing"),
            Err(err) => warn!(org_id, "data sources unavailable: {err}"),
        }

        info!(
            org_id,
            publications = stats.publications_total,
            health = %stats.repository_health,
            "Completed stats collection in {:.2}s",
            started.elapsed().as_secs_f64()
        );
        stats
    }
}

impl OrganizationSource for StatisticsCollector {
    fn resolve_org_id<'a>(
        &'a self,
        ror_link: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<String>>> + Send + 'a>> {
        Box::pin(async move { Ok(self.client.resolve_organization_id(ror_link).await?) })
    }

    fn org_statistics<'a>(&'a self, org_id: &'a str) -> Pin<Box<dyn Future<Output = Result<OrgStatistics>> + Send + 'a>> {
        Box::pin(async move { Ok(self.derive_stats(org_id).await) })
    }

    fn name(&self) -> &'static str {
        "StatisticsCollector"
    }
}
