/// Application configuration
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use wavecast_catalog::CatalogConfig;
use wavecast_progress::ProgressPolicy;

/// File looked up in the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "wavecast.toml";

/// Prefix of environment overrides (`WAVECAST_CATALOG__BASE_URL`, ...)
pub const ENV_PREFIX: &str = "WAVECAST";

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub progress: ProgressSettings,

    #[serde(default)]
    pub catalog: CatalogConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ProgressSettings {
    #[serde(default = "default_completion_threshold")]
    pub completion_threshold: f64,

    #[serde(default = "default_resume_min")]
    pub resume_min: f64,

    #[serde(default = "default_resume_max")]
    pub resume_max: f64,

    #[serde(default = "default_storage_path")]
    pub storage_path: PathBuf,
}

impl Default for ProgressSettings {
    fn default() -> Self {
        Self {
            completion_threshold: default_completion_threshold(),
            resume_min: default_resume_min(),
            resume_max: default_resume_max(),
            storage_path: default_storage_path(),
        }
    }
}

impl ProgressSettings {
    pub fn policy(&self) -> ProgressPolicy {
        ProgressPolicy {
            completion_threshold: self.completion_threshold,
            resume_min: self.resume_min,
            resume_max: self.resume_max,
        }
    }
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// An explicit `path` must exist; otherwise `wavecast.toml` is used when
    /// present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, None)
    }

    /// Like [`AppConfig::load`], reading overrides from `env` instead of the
    /// process environment when given
    pub fn load_with_env(
        path: Option<&Path>,
        env: Option<config::Map<String, String>>,
    ) -> Result<Self> {
        let mut settings = config::Config::builder();

        settings = match path {
            Some(path) => settings.add_source(config::File::from(path).required(true)),
            None => settings
                .add_source(config::File::from(Path::new(DEFAULT_CONFIG_FILE)).required(false)),
        };

        // Override with environment variables (prefixed with WAVECAST_)
        settings = settings.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(env),
        );

        let config: Self = settings.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let progress = &self.progress;
        for (name, value) in [
            ("progress.completion_threshold", progress.completion_threshold),
            ("progress.resume_min", progress.resume_min),
            ("progress.resume_max", progress.resume_max),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(AppError::Config(format!(
                    "{name} must be between 0 and 1 (got {value})"
                )));
            }
        }

        if progress.resume_min > progress.resume_max {
            return Err(AppError::Config(
                "progress.resume_min must not exceed progress.resume_max".to_string(),
            ));
        }

        if self.catalog.timeout_ms == 0 {
            return Err(AppError::Config(
                "catalog.timeout_ms must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

// Default values
fn default_completion_threshold() -> f64 {
    0.95
}

fn default_resume_min() -> f64 {
    0.05
}

fn default_resume_max() -> f64 {
    0.95
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("./data/wavecast.json")
}
