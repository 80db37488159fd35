use std::fs;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::postgres::PgConnectOptions;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config yaml: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("missing username")]
    NoUsername,
    #[error("missing password")]
    NoPassword,
    #[error("missing host")]
    NoHost,
    #[error("missing port")]
    NoPort,
    #[error("missing database")]
    NoDatabase,

    #[error("Invalid postgres_url: {0}")]
    InvalidUrl(String),
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    pub gateway: GatewayConfig,
    /// Discrete PostgreSQL credentials
    #[serde(default)]
    pub postgres: Option<PostgresConfig>,
    /// Full PostgreSQL connection URL, takes precedence over `postgres`
    #[serde(default)]
    pub postgres_url: Option<String>,
    /// Directory holding generated CSV reports
    #[serde(default = "default_reports_dir")]
    pub reports_dir: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    /// Base URL for report download links, defaults to `http://localhost:<port>`
    #[serde(default)]
    pub public_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct PostgresConfig {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub max_connections: Option<u32>,
}

fn default_reports_dir() -> String {
    "./reports".to_string()
}

pub const DEFAULT_MAX_CONNECTIONS: u32 = 20;

fn required(value: &Option<String>, err: ConfigError) -> Result<&str, ConfigError> {
    match value.as_deref() {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(err),
    }
}

impl PostgresConfig {
    /// Connection options; each missing credential is its own error
    pub fn connect_options(&self) -> Result<PgConnectOptions, ConfigError> {
        let username = required(&self.username, ConfigError::NoUsername)?;
        let password = required(&self.password, ConfigError::NoPassword)?;
        let host = required(&self.host, ConfigError::NoHost)?;
        let port = self.port.ok_or(ConfigError::NoPort)?;
        let database = required(&self.database, ConfigError::NoDatabase)?;

        Ok(PgConnectOptions::new()
            .username(username)
            .password(password)
            .host(host)
            .port(port)
            .database(database))
    }
}

impl AppConfig {
    pub fn load(env: &str) -> Result<Self, ConfigError> {
        let config_path = format!("config/{}.yaml", env);
        let content = fs::read_to_string(&config_path).map_err(|source| ConfigError::Read {
            path: config_path.clone(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// PostgreSQL target, or `None` to run on the in-memory store
    pub fn postgres_options(&self) -> Result<Option<PgConnectOptions>, ConfigError> {
        if let Some(url) = self.postgres_url.as_deref()
            && !url.trim().is_empty()
        {
            return PgConnectOptions::from_str(url)
                .map(Some)
                .map_err(|e| ConfigError::InvalidUrl(e.to_string()));
        }
        self.postgres
            .as_ref()
            .map(PostgresConfig::connect_options)
            .transpose()
    }

    pub fn max_connections(&self) -> u32 {
        self.postgres
            .as_ref()
            .and_then(|pg| pg.max_connections)
            .unwrap_or(DEFAULT_MAX_CONNECTIONS)
    }

    /// Apply a `--port` override; a derived public url follows the new port
    pub fn override_port(&mut self, port: u16) {
        self.gateway.port = port;
    }

    pub fn public_url(&self) -> String {
        self.gateway
            .public_url
            .clone()
            .unwrap_or_else(|| format!("http://localhost:{}", self.gateway.port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = r#"
log_level: info
log_dir: ./logs
log_file: balance.log
use_json: false
rotation: daily
gateway:
  host: 0.0.0.0
  port: 8080
"#;

    #[test]
    fn test_minimal_config_uses_memory_store() {
        let cfg = AppConfig::from_yaml(BASE).unwrap();
        assert!(cfg.postgres_options().unwrap().is_none());
        assert_eq!(cfg.reports_dir, "./reports");
        assert_eq!(cfg.public_url(), "http://localhost:8080");
        assert_eq!(cfg.max_connections(), DEFAULT_MAX_CONNECTIONS);
    }

    #[test]
    fn test_full_postgres_block() {
        let yaml = format!(
            "{BASE}postgres:\n  username: app\n  password: secret\n  host: db\n  port: 5433\n  database: balance\n  max_connections: 7\n"
        );
        let cfg = AppConfig::from_yaml(&yaml).unwrap();
        let opts = cfg.postgres_options().unwrap().unwrap();
        assert_eq!(opts.get_host(), "db");
        assert_eq!(opts.get_port(), 5433);
        assert_eq!(opts.get_database(), Some("balance"));
        assert_eq!(cfg.max_connections(), 7);
    }

    #[test]
    fn test_missing_postgres_fields_are_typed() {
        let cases = [
            ("password: p\n  host: h\n  port: 1\n  database: d", "missing username"),
            ("username: u\n  host: h\n  port: 1\n  database: d", "missing password"),
            ("username: u\n  password: p\n  port: 1\n  database: d", "missing host"),
            ("username: u\n  password: p\n  host: h\n  database: d", "missing port"),
            ("username: u\n  password: p\n  host: h\n  port: 1", "missing database"),
            (
                "username: ''\n  password: p\n  host: h\n  port: 1\n  database: d",
                "missing username",
            ),
        ];
        for (block, expected) in cases {
            let yaml = format!("{BASE}postgres:\n  {block}\n");
            let cfg = AppConfig::from_yaml(&yaml).unwrap();
            let err = cfg.postgres_options().unwrap_err();
            assert_eq!(err.to_string(), expected);
        }
    }

    #[test]
    fn test_postgres_url_takes_precedence() {
        let yaml = format!(
            "{BASE}postgres_url: postgres://u:p@urlhost:5432/db\npostgres:\n  username: u\n"
        );
        let cfg = AppConfig::from_yaml(&yaml).unwrap();
        let opts = cfg.postgres_options().unwrap().unwrap();
        assert_eq!(opts.get_host(), "urlhost");
    }

    #[test]
    fn test_port_override_moves_report_links() {
        for env in ["dev", "prod"] {
            let mut cfg = AppConfig::load(env).unwrap();
            cfg.override_port(9090);
            assert_eq!(cfg.gateway.port, 9090);
            assert_eq!(cfg.public_url(), "http://localhost:9090", "{env}");
        }
    }

    #[test]
    fn test_explicit_public_url_is_kept() {
        let yaml = BASE.replace(
            "port: 8080",
            "port: 8080\n  public_url: https://billing.example.com",
        );
        let mut cfg = AppConfig::from_yaml(&yaml).unwrap();
        cfg.override_port(9090);
        assert_eq!(cfg.public_url(), "https://billing.example.com");
    }

    #[test]
    fn test_invalid_yaml() {
        assert!(matches!(
            AppConfig::from_yaml("gateway: ["),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            AppConfig::load("does-not-exist"),
            Err(ConfigError::Read { .. })
        ));
    }
}
