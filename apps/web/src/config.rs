//! Web server configuration.
//!
//! Values are layered: built-in defaults, then an optional TOML file named
//! by `PARKING_CONFIG`, then environment variables.
//!
//! ```toml
//! # parking.toml
//! http_port = 8080
//! db_path = "/var/lib/parking/parking.db"
//! hourly_rate_cents = 15000
//! fee_rounding = "floor"
//! ```

use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;

use serde::Deserialize;

use park_core::{FeePolicy, Money, Rounding, DEFAULT_HOURLY_RATE_CENTS};
use park_db::DbConfig;

/// Environment variable naming the optional TOML file.
pub const CONFIG_FILE_ENV: &str = "PARKING_CONFIG";

/// Web server configuration.
#[derive(Debug, Clone)]
pub struct WebConfig {
    /// HTTP listen port
    pub http_port: u16,

    /// Address to bind
    pub bind_addr: String,

    /// SQLite database file
    pub db_path: PathBuf,

    /// Pool size
    pub db_max_connections: u32,

    /// Secret for signing session tokens
    pub session_secret: String,

    /// Session token and cookie lifetime in seconds
    pub session_lifetime_secs: i64,

    /// Parking rate per started hour
    pub hourly_rate: Money,

    /// How partial hours are billed
    pub fee_rounding: Rounding,

    /// Bootstrapped admin account
    pub admin_email: String,
    pub admin_password: String,

    /// Bootstrapped operator account
    pub operator_email: String,
    pub operator_password: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        WebConfig {
            http_port: 3000,
            bind_addr: "0.0.0.0".to_string(),
            db_path: PathBuf::from("./parking.db"),
            db_max_connections: 5,
            // In production this MUST be set via SESSION_SECRET
            session_secret: "parking-dev-secret-change-in-production".to_string(),
            session_lifetime_secs: 86_400, // 24 hours
            hourly_rate: Money::from_cents(DEFAULT_HOURLY_RATE_CENTS),
            fee_rounding: Rounding::Ceil,
            admin_email: "admin@example.com".to_string(),
            admin_password: "admin123".to_string(),
            operator_email: "operator@example.com".to_string(),
            operator_password: "operator123".to_string(),
        }
    }
}

/// Shape of the optional TOML file. Every key may be omitted.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    http_port: Option<u16>,
    bind_addr: Option<String>,
    db_path: Option<PathBuf>,
    db_max_connections: Option<u32>,
    session_secret: Option<String>,
    session_lifetime_secs: Option<i64>,
    hourly_rate_cents: Option<i64>,
    fee_rounding: Option<String>,
    admin_email: Option<String>,
    admin_password: Option<String>,
    operator_email: Option<String>,
    operator_password: Option<String>,
}

impl WebConfig {
    /// Load configuration from `PARKING_CONFIG` (if set) and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        let file = match env::var(CONFIG_FILE_ENV) {
            Ok(path) => Some(
                fs::read_to_string(&path).map_err(|e| ConfigError::FileRead(path.clone(), e))?,
            ),
            Err(_) => None,
        };
        Self::from_sources(file.as_deref(), |key| env::var(key).ok())
    }

    /// Builds a configuration from TOML text and an environment lookup.
    pub fn from_sources(
        file: Option<&str>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = WebConfig::default();

        if let Some(text) = file {
            let file: FileConfig = toml::from_str(text).map_err(ConfigError::FileParse)?;
            config.apply_file(file)?;
        }

        config.apply_env(env)?;
        config.validate()?;
        Ok(config)
    }

    fn apply_file(&mut self, file: FileConfig) -> Result<(), ConfigError> {
        if let Some(v) = file.http_port {
            self.http_port = v;
        }
        if let Some(v) = file.bind_addr {
            self.bind_addr = v;
        }
        if let Some(v) = file.db_path {
            self.db_path = v;
        }
        if let Some(v) = file.db_max_connections {
            self.db_max_connections = v;
        }
        if let Some(v) = file.session_secret {
            self.session_secret = v;
        }
        if let Some(v) = file.session_lifetime_secs {
            self.session_lifetime_secs = v;
        }
        if let Some(v) = file.hourly_rate_cents {
            self.hourly_rate = Money::from_cents(v);
        }
        if let Some(v) = file.fee_rounding {
            self.fee_rounding = v
                .parse()
                .map_err(|_| ConfigError::InvalidValue("fee_rounding".to_string()))?;
        }
        if let Some(v) = file.admin_email {
            self.admin_email = v;
        }
        if let Some(v) = file.admin_password {
            self.admin_password = v;
        }
        if let Some(v) = file.operator_email {
            self.operator_email = v;
        }
        if let Some(v) = file.operator_password {
            self.operator_password = v;
        }
        Ok(())
    }

    fn apply_env(&mut self, env: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(v) = env("PARKING_HTTP_PORT") {
            self.http_port = parse("PARKING_HTTP_PORT", &v)?;
        }
        if let Some(v) = env("PARKING_BIND_ADDR") {
            self.bind_addr = v;
        }
        if let Some(v) = env("PARKING_DB_PATH") {
            self.db_path = PathBuf::from(v);
        }
        if let Some(v) = env("PARKING_DB_MAX_CONNECTIONS") {
            self.db_max_connections = parse("PARKING_DB_MAX_CONNECTIONS", &v)?;
        }
        if let Some(v) = env("SESSION_SECRET") {
            self.session_secret = v;
        }
        if let Some(v) = env("SESSION_LIFETIME_SECS") {
            self.session_lifetime_secs = parse("SESSION_LIFETIME_SECS", &v)?;
        }
        if let Some(v) = env("PARKING_HOURLY_RATE_CENTS") {
            self.hourly_rate = Money::from_cents(parse("PARKING_HOURLY_RATE_CENTS", &v)?);
        }
        if let Some(v) = env("PARKING_FEE_ROUNDING") {
            self.fee_rounding = parse("PARKING_FEE_ROUNDING", &v)?;
        }
        if let Some(v) = env("PARKING_ADMIN_EMAIL") {
            self.admin_email = v;
        }
        if let Some(v) = env("PARKING_ADMIN_PASSWORD") {
            self.admin_password = v;
        }
        if let Some(v) = env("PARKING_OPERATOR_EMAIL") {
            self.operator_email = v;
        }
        if let Some(v) = env("PARKING_OPERATOR_PASSWORD") {
            self.operator_password = v;
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.hourly_rate.is_negative() {
            return Err(ConfigError::InvalidValue("hourly_rate_cents".to_string()));
        }
        if self.session_lifetime_secs <= 0 {
            return Err(ConfigError::InvalidValue("session_lifetime_secs".to_string()));
        }
        if self.db_max_connections == 0 {
            return Err(ConfigError::InvalidValue("db_max_connections".to_string()));
        }
        if self.session_secret.is_empty() {
            return Err(ConfigError::MissingRequired("session_secret".to_string()));
        }
        Ok(())
    }

    /// Socket address to listen on.
    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.bind_addr, self.http_port)
            .parse()
            .map_err(|_| ConfigError::InvalidValue("PARKING_BIND_ADDR".to_string()))
    }

    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.db_path).max_connections(self.db_max_connections)
    }

    pub fn fee_policy(&self) -> FeePolicy {
        FeePolicy::new(self.hourly_rate, self.fee_rounding)
    }
}

fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue(key.to_string()))
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Could not read config file {0}: {1}")]
    FileRead(String, #[source] std::io::Error),

    #[error("Could not parse config file: {0}")]
    FileParse(#[source] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = WebConfig::from_sources(None, env_of(&[])).unwrap();
        assert_eq!(config.http_port, 3000);
        assert_eq!(config.session_lifetime_secs, 86_400);
        assert_eq!(config.hourly_rate, Money::from_cents(10_000));
        assert_eq!(config.fee_rounding, Rounding::Ceil);
        assert_eq!(config.listen_addr().unwrap().port(), 3000);
    }

    #[test]
    fn test_env_overrides_file() {
        let file = r#"
            http_port = 8080
            hourly_rate_cents = 15000
            fee_rounding = "floor"
        "#;
        let config = WebConfig::from_sources(
            Some(file),
            env_of(&[("PARKING_HTTP_PORT", "9090"), ("SESSION_SECRET", "s3cret")]),
        )
        .unwrap();

        assert_eq!(config.http_port, 9090);
        assert_eq!(config.hourly_rate, Money::from_cents(15_000));
        assert_eq!(config.fee_rounding, Rounding::Floor);
        assert_eq!(config.session_secret, "s3cret");
    }

    #[test]
    fn test_invalid_values() {
        let err = WebConfig::from_sources(None, env_of(&[("PARKING_HTTP_PORT", "http")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(ref k) if k == "PARKING_HTTP_PORT"));

        let err = WebConfig::from_sources(None, env_of(&[("PARKING_FEE_ROUNDING", "nearest")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(ref k) if k == "PARKING_FEE_ROUNDING"));

        let err = WebConfig::from_sources(None, env_of(&[("PARKING_HOURLY_RATE_CENTS", "-1")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(_)));

        assert!(matches!(
            WebConfig::from_sources(Some("http_port = \"x\""), env_of(&[])),
            Err(ConfigError::FileParse(_))
        ));
    }
}
