use std::path::Path;

// config lets you read a separate config file
use ::config::{Config, Environment, File};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use crate::error::Result;
use crate::polymorph::IdentityPolicy;

pub const ENV_PREFIX: &str = "TREEMAPPER";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub identity_policy: IdentityPolicy,
    pub json: JsonSettings,
    pub log: LogSettings,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct JsonSettings {
    pub pretty: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub filter: String,
}
impl Default for LogSettings {
    fn default() -> Self {
        Self { filter: "info".to_string() }
    }
}

impl Settings {
    /// Defaults, then the file at `path` if it exists, then `TREEMAPPER_*`
    /// environment variables (`__` separates nested keys).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(false));
        }
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );
        Ok(builder.build()?.try_deserialize()?)
    }
}

/// Installs a fmt subscriber. `RUST_LOG` wins over the configured filter.
/// Does nothing if a global subscriber is already set.
pub fn init_tracing(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.log.filter));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_a_file() {
        let settings = Settings::load(None).unwrap();
        assert_eq!(settings.identity_policy, IdentityPolicy::Warn);
        assert!(!settings.json.pretty);
        assert_eq!(settings.log.filter, "info");
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let settings = Settings::load(Some(Path::new("does_not_exist_treemapper.toml"))).unwrap();
        assert_eq!(settings.identity_policy, IdentityPolicy::Warn);
    }

    #[test]
    fn tracing_can_be_initialized_twice() {
        let settings = Settings::default();
        init_tracing(&settings);
        init_tracing(&settings);
        tracing::debug!("still alive");
    }
}
