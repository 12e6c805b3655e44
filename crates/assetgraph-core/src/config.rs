//! Configuration loading for AssetGraph services.
//!
//! Settings come from (in priority order):
//! 1. Environment variables (`ASSETGRAPH_` prefix, `__` separator)
//! 2. Config file (`assetgraph.toml` by default)
//! 3. Defaults

use serde::Deserialize;

/// Connection settings for the Neo4j store.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreSettings {
    #[serde(default = "default_uri")]
    pub uri: String,

    #[serde(default = "default_user")]
    pub user: String,

    #[serde(default = "default_password")]
    pub password: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_fetch_size")]
    pub fetch_size: usize,
}

fn default_uri() -> String {
    "bolt://localhost:7687".to_string()
}

fn default_user() -> String {
    "neo4j".to_string()
}

fn default_password() -> String {
    "assetgraph-dev".to_string()
}

fn default_max_connections() -> u32 {
    16
}

fn default_fetch_size() -> usize {
    256
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            uri: default_uri(),
            user: default_user(),
            password: default_password(),
            max_connections: default_max_connections(),
            fetch_size: default_fetch_size(),
        }
    }
}

/// Load store settings from `<file_prefix>.toml` and the environment.
///
/// Missing file or missing `store` section falls back to defaults; a
/// present-but-invalid source is surfaced to the caller.
pub fn load_store_settings(file_prefix: &str) -> Result<StoreSettings, config::ConfigError> {
    let cfg = config::Config::builder()
        .add_source(config::File::with_name(file_prefix).required(false))
        .add_source(
            config::Environment::with_prefix("ASSETGRAPH")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    match cfg.get::<StoreSettings>("store") {
        Ok(settings) => Ok(settings),
        Err(_) => {
            tracing::debug!("no [store] config section found, using defaults");
            Ok(StoreSettings::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let settings = StoreSettings::default();
        assert_eq!(settings.uri, "bolt://localhost:7687");
        assert_eq!(settings.user, "neo4j");
        assert_eq!(settings.max_connections, 16);
        assert_eq!(settings.fetch_size, 256);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let settings = load_store_settings("definitely-not-a-real-config").unwrap();
        assert_eq!(settings.uri, StoreSettings::default().uri);
    }
}
