use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Environment prefix; nested keys use a double underscore, e.g.
/// `FONTINDEX_API__TOKEN`.
const ENV_PREFIX: &str = "FONTINDEX_";

/// Defaults, then the optional file, then the environment.
fn figment(file: Option<&Path>) -> Figment {
    let base = match file {
        Some(path) => Figment::new().merge(Toml::file(path)),
        None => Figment::new(),
    };
    base.merge(Env::prefixed(ENV_PREFIX).split("__"))
}

fn extract(figment: Figment) -> Result<Config, ConfigError> {
    figment
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Load configuration from file with environment variable overrides.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }
    extract(figment(Some(path)))
}

/// Load configuration from defaults plus environment only (no file).
pub fn load_config_from_env() -> Result<Config, ConfigError> {
    extract(figment(None))
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}
