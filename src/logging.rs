use eyre::{
    Context as _,
    Result,
};
use research_monitor_gateway::DailyLogSink;
use std::path::Path;
use tracing_subscriber::{
    fmt,
    prelude::*,
    EnvFilter,
};

/// Prefix of the dated narrative log, `logs/data_collection_YYYYMMDD.log`.
pub const NARRATIVE_LOG_PREFIX: &str = "data_collection";

fn env_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }))
}

/// Logs to stdout and to a dated file under `logs_dir`. `RUST_LOG` takes
/// precedence over `verbose`.
pub fn init_logging(logs_dir: &Path, verbose: bool) -> Result<()> {
    std::fs::create_dir_all(logs_dir).context("Failed to create log directory")?;
    let narrative = DailyLogSink::new(logs_dir, NARRATIVE_LOG_PREFIX);

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_filter(env_filter(verbose)))
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_writer(narrative)
                .with_filter(env_filter(verbose)),
        )
        .with(tracing_error::ErrorLayer::default())
        .try_init()
        .context("Failed to initialize tracing subscriber")
}
