//! Runtime settings.
//!
//! Layered as built-in defaults, then the process environment (which a `.env`
//! file may have populated through `dotenvy`). Variables use the `AIRQ_`
//! prefix, e.g. `AIRQ_BIND_ADDR` or `AIRQ_PREDICTOR_TIMEOUT_MS`.
//!
//! | Env var                      | Default                  |
//! |------------------------------|--------------------------|
//! | `AIRQ_BIND_ADDR`             | `0.0.0.0:8000`           |
//! | `AIRQ_DEFAULT_CITY`          | `São Paulo`              |
//! | `AIRQ_DATABASE_URL`          | unset (in-memory store)  |
//! | `AIRQ_PREDICTOR_URL`         | unset (rule model)       |
//! | `AIRQ_PREDICTOR_TIMEOUT_MS`  | `5000`                   |
//! | `AIRQ_MODEL_PATH`            | `models/production`      |
//! | `AIRQ_MAX_BATCH_SIZE`        | `100`                    |
//! | `AIRQ_BATCH_CONCURRENCY`     | `8`                      |
//! | `AIRQ_ALLOWED_ORIGINS`       | `*` (comma-separated)    |

use std::time::Duration;

use air_quality_core::PipelineConfig;
use anyhow::{bail, Context, Result};
use ::config::{Config, Environment};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub bind_addr: String,
    pub app_name: String,
    pub app_version: String,
    pub default_city: String,
    #[serde(default)]
    pub database_url: Option<String>,
    #[serde(default)]
    pub predictor_url: Option<String>,
    pub predictor_timeout_ms: u64,
    pub model_path: String,
    pub max_batch_size: usize,
    pub batch_concurrency: usize,
    pub allowed_origins: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8000".to_string(),
            app_name: "API de Predição da Qualidade do Ar".to_string(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            default_city: "São Paulo".to_string(),
            database_url: None,
            predictor_url: None,
            predictor_timeout_ms: 5000,
            model_path: "models/production".to_string(),
            max_batch_size: 100,
            batch_concurrency: 8,
            allowed_origins: vec!["*".to_string()],
        }
    }
}

impl Settings {
    /// Load from the `AIRQ_*` environment on top of the defaults.
    pub fn load() -> Result<Self> {
        Self::from_env(Environment::with_prefix("AIRQ"))
    }

    fn from_env(env: Environment) -> Result<Self> {
        let d = Settings::default();
        let settings: Settings = Config::builder()
            .set_default("bind_addr", d.bind_addr)?
            .set_default("app_name", d.app_name)?
            .set_default("app_version", d.app_version)?
            .set_default("default_city", d.default_city)?
            .set_default("predictor_timeout_ms", d.predictor_timeout_ms)?
            .set_default("model_path", d.model_path)?
            .set_default("max_batch_size", d.max_batch_size as u64)?
            .set_default("batch_concurrency", d.batch_concurrency as u64)?
            .set_default("allowed_origins", d.allowed_origins)?
            .add_source(
                env.try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("allowed_origins"),
            )
            .build()
            .context("failed to read configuration")?
            .try_deserialize()
            .context("invalid configuration")?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_batch_size == 0 {
            bail!("max_batch_size must be at least 1");
        }
        if self.batch_concurrency == 0 {
            bail!("batch_concurrency must be at least 1");
        }
        if self.predictor_timeout_ms == 0 {
            bail!("predictor_timeout_ms must be positive");
        }
        Ok(())
    }

    pub fn predictor_timeout(&self) -> Duration {
        Duration::from_millis(self.predictor_timeout_ms)
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            default_city: self.default_city.clone(),
            predictor_timeout: self.predictor_timeout(),
            max_batch_size: self.max_batch_size,
            batch_concurrency: self.batch_concurrency,
            ..PipelineConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(vars: &[(&str, &str)]) -> Environment {
        let source: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Environment::with_prefix("AIRQ").source(Some(source))
    }

    #[test]
    fn defaults_apply_without_environment() {
        let s = Settings::from_env(env(&[])).unwrap();
        assert_eq!(s.bind_addr, "0.0.0.0:8000");
        assert_eq!(s.max_batch_size, 100);
        assert_eq!(s.allowed_origins, vec!["*"]);
        assert!(s.database_url.is_none());
    }

    #[test]
    fn environment_overrides_defaults() {
        let s = Settings::from_env(env(&[
            ("AIRQ_PREDICTOR_TIMEOUT_MS", "250"),
            ("AIRQ_DATABASE_URL", "postgres://localhost/airq"),
            ("AIRQ_ALLOWED_ORIGINS", "http://a.test,http://b.test"),
        ]))
        .unwrap();
        assert_eq!(s.predictor_timeout(), Duration::from_millis(250));
        assert_eq!(s.database_url.as_deref(), Some("postgres://localhost/airq"));
        assert_eq!(s.allowed_origins, vec!["http://a.test", "http://b.test"]);
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        assert!(Settings::from_env(env(&[("AIRQ_MAX_BATCH_SIZE", "0")])).is_err());
    }

    #[test]
    fn unparseable_number_is_rejected() {
        assert!(Settings::from_env(env(&[("AIRQ_BATCH_CONCURRENCY", "lots")])).is_err());
    }
}
