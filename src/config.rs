/// Service configuration loader - parses climate_service.toml
///
/// Keeps deployment settings (bind address, worker count, database schema)
/// out of the code. The connection string itself stays in `DATABASE_URL`
/// (see `db`), so credentials never land in the TOML file.

use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Default config file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "climate_service.toml";

/// Env var pointing at an alternative config file.
pub const CONFIG_PATH_ENV: &str = "CLIMATE_SERVICE_CONFIG";

pub const PORT_ENV: &str = "CLIMATE_SERVICE_PORT";
pub const WORKERS_ENV: &str = "CLIMATE_SERVICE_WORKERS";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid value '{value}' for {var}")]
    InvalidEnv { var: &'static str, value: String },

    #[error("server.workers must be at least 1")]
    NoWorkers,

    #[error("database.schema '{0}' is not a plain SQL identifier")]
    InvalidSchemaName(String),
}

/// Root of climate_service.toml.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    /// Worker threads; each holds its own database connection.
    pub workers: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 5000,
            workers: 4,
        }
    }
}

/// Where the climate tables live.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// PostgreSQL schema holding `measurement` and `station`.
    pub schema: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            schema: "public".to_string(),
        }
    }
}

impl ServiceConfig {
    /// Parses a TOML document and validates it.
    pub fn from_toml_str(contents: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: ServiceConfig = toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// `host:port` string for the listener.
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.server.bind_address, self.server.port)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        if !is_sql_identifier(&self.database.schema) {
            return Err(ConfigError::InvalidSchemaName(self.database.schema.clone()));
        }
        Ok(())
    }

    /// Applies `CLIMATE_SERVICE_PORT` / `CLIMATE_SERVICE_WORKERS` overrides.
    fn apply_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        if let Some(value) = lookup(PORT_ENV) {
            self.server.port = value
                .parse()
                .map_err(|_| ConfigError::InvalidEnv { var: PORT_ENV, value })?;
        }
        if let Some(value) = lookup(WORKERS_ENV) {
            self.server.workers = value
                .parse()
                .map_err(|_| ConfigError::InvalidEnv { var: WORKERS_ENV, value })?;
        }
        self.validate()?;
        Ok(self)
    }
}

/// Loads the service configuration.
///
/// Reads `$CLIMATE_SERVICE_CONFIG` if set, otherwise `climate_service.toml`.
/// A missing default file means "use defaults"; a missing file named
/// explicitly through the env var is an error.
pub fn load_config() -> Result<ServiceConfig, ConfigError> {
    let (path, explicit) = match env::var(CONFIG_PATH_ENV) {
        Ok(p) => (PathBuf::from(p), true),
        Err(_) => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
    };

    let config = match fs::read_to_string(&path) {
        Ok(contents) => ServiceConfig::from_toml_str(&contents, &path)?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound && !explicit => {
            log::info!("{} not found, using default configuration", path.display());
            ServiceConfig::default()
        }
        Err(source) => return Err(ConfigError::Read { path, source }),
    };

    config.apply_overrides(|var| env::var(var).ok())
}

/// True for `[a-z_][a-z0-9_]*`, the only schema names interpolated into SQL.
///
/// Uppercase is rejected: PostgreSQL folds an unquoted `Climate` to `climate`
/// in queries, while `information_schema` is searched for the exact string.
pub fn is_sql_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}
