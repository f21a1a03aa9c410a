//! Configuration Loader
//!
//! Loads a YAML configuration file and layers `ACTIVITY_WORKER__SECTION__KEY`
//! environment overrides on top of it, then validates the result.

use super::error::{ConfigResult, ConfigurationError};
use super::WorkerConfig;
use ::config::{Config, Environment, File, FileFormat};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

/// Prefix for environment overrides (`ACTIVITY_WORKER__WORKER__POLL_TIMEOUT_SECONDS=30`)
pub const ENV_PREFIX: &str = "ACTIVITY_WORKER";
const ENV_SEPARATOR: &str = "__";

/// Loads and validates [`WorkerConfig`]
pub struct ConfigManager;

impl ConfigManager {
    /// Load configuration from a YAML file with process environment overrides
    pub fn load_from_file(path: impl AsRef<Path>) -> ConfigResult<WorkerConfig> {
        Self::load_with_env(path, None)
    }

    /// Load configuration from a YAML file with an explicit environment map.
    ///
    /// Passing `None` reads the process environment. Tests pass a map so they
    /// never mutate global state.
    pub fn load_with_env(
        path: impl AsRef<Path>,
        env: Option<HashMap<String, String>>,
    ) -> ConfigResult<WorkerConfig> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ConfigurationError::load_error(
                path.display().to_string(),
                "file does not exist or is not a regular file",
            ));
        }

        debug!(path = %path.display(), "Loading worker configuration");

        let builder = Config::builder()
            .add_source(File::from(path).format(FileFormat::Yaml))
            .add_source(Self::environment_source(env));

        Self::finish(builder, &path.display().to_string())
    }

    /// Load configuration from an in-memory YAML document
    pub fn load_from_yaml_str(
        yaml: &str,
        env: Option<HashMap<String, String>>,
    ) -> ConfigResult<WorkerConfig> {
        let builder = Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .add_source(Self::environment_source(env));

        Self::finish(builder, "<inline>")
    }

    fn environment_source(env: Option<HashMap<String, String>>) -> Environment {
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator(ENV_SEPARATOR)
            .separator(ENV_SEPARATOR)
            .try_parsing(true)
            .source(env)
    }

    fn finish(
        builder: ::config::ConfigBuilder<::config::builder::DefaultState>,
        source_name: &str,
    ) -> ConfigResult<WorkerConfig> {
        let config: WorkerConfig = builder
            .build()
            .map_err(|e| ConfigurationError::load_error(source_name, e))?
            .try_deserialize()?;

        config.validate()?;

        info!(
            source = %source_name,
            activity = %config.activity.name,
            version = %config.activity.version,
            poll_timeout_seconds = config.worker.poll_timeout_seconds,
            network_timeout_seconds = config.worker.network_timeout_seconds,
            "Configuration loaded successfully"
        );
        debug!(config = %Self::sanitize_config_for_logging(&config), "Effective configuration");

        Ok(config)
    }

    /// JSON view of the configuration with credentials masked
    pub fn sanitize_config_for_logging(config: &WorkerConfig) -> serde_json::Value {
        let mut value = serde_json::to_value(config).unwrap_or(serde_json::Value::Null);

        for pointer in ["/orchestration/auth_token", "/notification/database_url"] {
            if let Some(field) = value.pointer_mut(pointer) {
                if !field.is_null() {
                    *field = serde_json::Value::String("***REDACTED***".to_string());
                }
            }
        }

        value
    }
}
