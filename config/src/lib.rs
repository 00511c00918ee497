#[macro_use]
extern crate tracing;

mod alert_thresholds;
mod api_config;
mod app_config;
mod args;

pub use alert_thresholds::AlertThresholds;
pub use api_config::ApiConfig;
pub use app_config::{
    get_config_dir,
    get_data_dir,
};
use app_config::AppConfig;
pub use args::{
    Args,
    Command,
};
use eyre::{
    bail,
    Result,
};
use secrecy::ExposeSecret as _;
use serde::Deserialize;
use std::{
    path::{
        Path,
        PathBuf,
    },
    time::Duration,
};

/// Inter-organization pacing below this value is rejected by [`Config::validate`].
pub const MIN_PACING: Duration = Duration::from_millis(500);

const DEFAULT_CONFIG: &str = include_str!("default-config.yaml");

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    #[serde(flatten)]
    app_config: AppConfig,
    pub api: ApiConfig,
    pub roster_file: PathBuf,
    pub pacing_ms: u64,
    pub retention_days: u32,
    #[serde(default)]
    pub alerts: AlertThresholds,
}

impl Config {
    /// Layers, from lowest to highest priority: embedded defaults, `config.yaml` in the config
    /// directory, the file passed with `--config`, `RESEARCH_MONITOR__*` environment variables and
    /// command-line overrides.
    pub fn new(args: &Args) -> Result<Self, config::ConfigError> {
        Self::build(args, true)
    }

    /// Like [`Config::new`] without the user `config.yaml` and the environment, so the result
    /// depends only on the embedded defaults and `args`.
    pub fn isolated(args: &Args) -> Result<Self, config::ConfigError> {
        Self::build(args, false)
    }

    fn build(args: &Args, user_layers: bool) -> Result<Self, config::ConfigError> {
        let data_dir = get_data_dir();
        let config_dir = get_config_dir();
        let mut builder = config::Config::builder()
            .set_default("data_dir", data_dir.display().to_string())?
            .set_default("config_dir", config_dir.display().to_string())?
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Yaml));

        let config_files = [("config.yaml", config::FileFormat::Yaml)];

        if user_layers {
            for (file, format) in &config_files {
                let source = config::File::from(config_dir.join(file))
                    .format(*format)
                    .required(false);
                builder = builder.add_source(source);
            }
        }

        if let Some(path) = &args.config {
            debug!(?path, "adding explicit configuration file");
            builder = builder.add_source(config::File::from(path.as_path()).format(config::FileFormat::Yaml));
        }

        if user_layers {
            builder = builder.add_source(
                config::Environment::with_prefix(&app_config::PROJECT_NAME)
                    .prefix_separator("__")
                    .separator("__"),
            );
        }

        let cfg: Self = builder.add_source(args.clone()).build()?.try_deserialize()?;

        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.api.client_id.trim().is_empty() {
            bail!("api.client_id must be configured");
        }
        if self.api.client_secret.expose_secret().trim().is_empty() {
            bail!("api.client_secret must be configured");
        }
        for url in [&self.api.base_url, &self.api.auth_url] {
            if !matches!(url.scheme(), "http" | "https") {
                bail!("unsupported URL scheme in {url}");
            }
        }
        if self.pacing() < MIN_PACING {
            bail!(
                "pacing_ms must be at least {} to respect the API rate limits",
                MIN_PACING.as_millis()
            );
        }
        Ok(())
    }

    pub fn data_dir(&self) -> &Path {
        &self.app_config.data_dir
    }

    pub fn config_dir(&self) -> &Path {
        &self.app_config.config_dir
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.data_dir().join("logs")
    }

    /// The roster location; relative paths are resolved against the data directory.
    pub fn roster_path(&self) -> PathBuf {
        if self.roster_file.is_absolute() {
            self.roster_file.clone()
        } else {
            self.data_dir().join(&self.roster_file)
        }
    }

    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }
}
