use eyre::{
    Context as _,
    Result,
};
use research_monitor_config::{
    Args,
    Command,
    Config,
};
use research_monitor_gateway::{
    GatewayClient,
    RequestLog,
};
use research_monitor_stats_gatherer::{
    display,
    AlertEngine,
    Orchestrator,
    SnapshotStore,
    StatisticsCollector,
};
use std::{
    process::ExitCode,
    sync::Arc,
};

pub struct App {
    config: Config,
    command: Command,
}

impl App {
    pub fn new(args: Args) -> Result<Self> {
        let config = Config::new(&args).context("Failed to load configuration")?;
        Ok(Self::with_config(config, args.command()))
    }

    pub fn with_config(config: Config, command: Command) -> Self {
        Self { config, command }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub async fn run(self) -> Result<ExitCode> {
        match self.command.clone() {
            Command::Collect => self.collect().await,
            Command::CheckAlerts => self.check_alerts(),
            Command::Alerts { hours } => self.show_alerts(hours),
            Command::Status => self.status(),
            Command::Prune { days } => self.prune(days),
            Command::Export => self.export(),
        }
    }

    fn store(&self) -> Result<SnapshotStore> {
        Ok(SnapshotStore::open(self.config.data_dir(), &self.config.roster_path())?)
    }

    fn alert_engine(&self, store: &SnapshotStore) -> Result<AlertEngine> {
        Ok(AlertEngine::for_store(store, self.config.alerts.clone())?)
    }

    #[instrument(level = "debug", skip(self))]
    async fn collect(&self) -> Result<ExitCode> {
        self.config.validate()?;
        info!("Starting daily data collection...");
        info!(endpoint = %self.config.api.base_url, "Using API endpoint");

        let client = GatewayClient::new(&self.config.api, RequestLog::in_dir(self.config.logs_dir()))?;
        if !client.test_connection().await {
            error!("Failed to connect to OpenAIRE API - check logs for detailed error information");
            return Ok(ExitCode::FAILURE);
        }

        let orchestrator =
            Orchestrator::new(StatisticsCollector::new(Arc::new(client)), self.store()?).with_pacing(self.config.pacing());
        let report = orchestrator.run_daily_collection().await;
        println!("{}", display::format_collection(&report));

        if !report.success() {
            error!("Data collection failed");
            return Ok(ExitCode::FAILURE);
        }
        info!("Data collection completed successfully");

        let alerts = self.alert_engine(orchestrator.store())?.check_alerts(orchestrator.store());
        if alerts.is_empty() {
            info!("No alerts generated");
        }
        for alert in &alerts {
            warn!("Alert: {} - {} - {}", alert.kind, alert.organization, alert.message);
        }
        Ok(ExitCode::SUCCESS)
    }

    fn check_alerts(&self) -> Result<ExitCode> {
        let store = self.store()?;
        let engine = self.alert_engine(&store)?;
        let alerts = engine.check_alerts(&store);
        for alert in &alerts {
            warn!("Alert: {} - {} - {}", alert.kind, alert.organization, alert.message);
        }
        println!("{}", display::format_alerts(&alerts, &engine.alert_summary()));
        Ok(ExitCode::SUCCESS)
    }

    fn show_alerts(&self, hours: u32) -> Result<ExitCode> {
        let store = self.store()?;
        let engine = self.alert_engine(&store)?;
        let alerts = engine.active_alerts(hours);
        println!("{}", display::format_alerts(&alerts, &engine.alert_summary()));
        Ok(ExitCode::SUCCESS)
    }

    fn status(&self) -> Result<ExitCode> {
        let store = self.store()?;
        println!(
            "{}",
            display::format_status(&store.system_stats(), store.last_update_time(), &store.latest_snapshot())
        );
        Ok(ExitCode::SUCCESS)
    }

    fn prune(&self, days: Option<u32>) -> Result<ExitCode> {
        let days = days.unwrap_or(self.config.retention_days);
        let removed = self.store()?.prune_older_than(days);
        println!("Removed {removed} snapshot(s) older than {days} days");
        Ok(ExitCode::SUCCESS)
    }

    fn export(&self) -> Result<ExitCode> {
        let path = self.store()?.export_all()?;
        println!("{}", path.display());
        Ok(ExitCode::SUCCESS)
    }
}
