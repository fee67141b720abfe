//! Application configuration.

use serde::Deserialize;
use std::path::Path;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: Option<DatabaseConfig>,
    /// Watch-party configuration.
    #[serde(default)]
    pub party: PartyConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Database connection configuration.
///
/// Optional: without it the server runs on the in-memory store and
/// comments/polls do not survive a restart.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Watch-party tuning knobs.
#[derive(Debug, Clone, Deserialize)]
pub struct PartyConfig {
    /// Length of generated room codes.
    #[serde(default = "default_room_code_length")]
    pub room_code_length: usize,
    /// Interval at which playing clients are expected to re-emit `sync`.
    #[serde(default = "default_sync_heartbeat_secs")]
    pub sync_heartbeat_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for PartyConfig {
    fn default() -> Self {
        Self {
            room_code_length: default_room_code_length(),
            sync_heartbeat_secs: default_sync_heartbeat_secs(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    3000
}

const fn default_max_connections() -> u32 {
    100
}

const fn default_min_connections() -> u32 {
    5
}

const fn default_room_code_length() -> usize {
    8
}

const fn default_sync_heartbeat_secs() -> u64 {
    5
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `config/default.toml`
    /// 2. `config/{environment}.toml` (based on `ANIPARTY_ENV`)
    /// 3. Environment variables with `ANIPARTY_` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        // Pick up a local .env file if present.
        dotenvy::dotenv().ok();

        let env = std::env::var("ANIPARTY_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("ANIPARTY")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("ANIPARTY")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_party_config_defaults() {
        let party = PartyConfig::default();
        assert_eq!(party.room_code_length, 8);
        assert_eq!(party.sync_heartbeat_secs, 5);
    }

    #[test]
    fn test_config_without_database_section() {
        let config: Config = config::Config::builder()
            .add_source(config::File::from_str(
                "[server]\nhost = \"127.0.0.1\"\nport = 4000\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.server.port, 4000);
        assert!(config.database.is_none());
    }
}
