use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Prefix for environment overrides, e.g. `PDFWORD_SERVER__PORT=9000`.
const ENV_PREFIX: &str = "PDFWORD_";

/// Load configuration from file with environment variable overrides
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    Figment::from(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Load configuration from file if present, otherwise from defaults plus
/// environment overrides.
pub fn load_config_or_default(path: &Path) -> Result<Config, ConfigError> {
    match load_config(path) {
        Err(ConfigError::FileNotFound(missing)) => {
            tracing::warn!(
                "Config file {} not found, using defaults and environment",
                missing
            );
            Figment::from(Serialized::defaults(Config::default()))
                .merge(Env::prefixed(ENV_PREFIX).split("__"))
                .extract()
                .map_err(|e| ConfigError::ParseError(e.to_string()))
        }
        other => other,
    }
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}
