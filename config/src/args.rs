use clap::{
    Parser,
    Subcommand,
};
use std::path::PathBuf;

/// Research Monitor: daily OpenAIRE statistics, snapshots and alerts.
#[derive(Parser, Debug, Clone)]
#[command(author, version = version(), about, long_about = None)]
pub struct Args {
    /// Optional YAML configuration file layered over the stored configuration.
    #[clap(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding snapshots, alerts, exports and logs.
    #[clap(long, value_name = "DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Optional API base URL to override the stored configuration.
    #[clap(long, value_name = "URL", global = true)]
    pub api_base_url: Option<String>,

    /// Enables debug logging.
    #[clap(short, long, action, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Default, PartialEq)]
pub enum Command {
    /// Collect today's statistics for every organization and check for alerts.
    #[default]
    Collect,
    /// Evaluate the alert rules over the stored snapshots.
    CheckAlerts,
    /// Show the active alerts.
    Alerts {
        /// Look-back window in hours.
        #[clap(long, default_value_t = 24)]
        hours: u32,
    },
    /// Show the latest snapshot and storage statistics.
    Status,
    /// Delete snapshots older than the retention period.
    Prune {
        /// Retention in days, defaults to `retention_days` from the configuration.
        #[clap(long)]
        days: Option<u32>,
    },
    /// Export the roster and recent snapshots into a workbook.
    Export,
}

impl Args {
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or_default()
    }
}

mod config_ext {
    use super::*;
    use config::{
        Map,
        Source,
        Value,
    };
    use std::collections::HashMap;

    impl Source for Args {
        fn clone_into_box(&self) -> Box<dyn Source + Send + Sync> {
            Box::new((*self).clone())
        }

        fn collect(&self) -> Result<Map<String, Value>, config::ConfigError> {
            let mut cache = HashMap::<String, Value>::new();
            if let Some(data_dir) = &self.data_dir {
                cache.insert("data_dir".to_string(), data_dir.display().to_string().into());
            }
            if let Some(url) = &self.api_base_url {
                cache.insert("api.base_url".to_string(), url.clone().into());
            }
            Ok(cache)
        }
    }
}

pub fn version() -> String {
    let author = clap::crate_authors!();
    let config_dir_path = crate::get_config_dir().display().to_string();
    let data_dir_path = crate::get_data_dir().display().to_string();

    format!(
        "\
Authors: {author}

Config directory: {config_dir_path}
Data directory: {data_dir_path}"
    )
}
