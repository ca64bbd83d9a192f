//! API configuration module.
//!
//! Configuration is loaded from environment variables with fallback to defaults.

use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

/// Development signing secret used when `JWT_SECRET` is unset.
pub const DEV_JWT_SECRET: &str = "clinic-dev-secret-change-in-production";

/// API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// HTTP listen port
    pub http_port: u16,

    /// SQLite database file
    pub database_path: String,

    /// Pool size
    pub db_max_connections: u32,

    /// JWT secret key for signing tokens
    pub jwt_secret: String,

    /// JWT access token lifetime in seconds
    pub jwt_access_lifetime_secs: i64,

    /// JWT refresh token lifetime in seconds
    pub jwt_refresh_lifetime_secs: i64,

    /// Access tokens closer than this to expiry are renewed on the response
    pub jwt_renewal_window_secs: i64,

    /// Set the `Secure` attribute on auth cookies
    pub cookie_secure: bool,

    /// Default tracing filter when `RUST_LOG` is unset
    pub log_level: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            http_port: 8080,
            database_path: "./clinic.db".to_string(),
            db_max_connections: 5,
            jwt_secret: DEV_JWT_SECRET.to_string(),
            jwt_access_lifetime_secs: 900,
            jwt_refresh_lifetime_secs: 604_800,
            jwt_renewal_window_secs: 300,
            cookie_secure: false,
            log_level: "info".to_string(),
        }
    }
}

impl ApiConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from any key lookup; `load` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = ApiConfig::default();

        let config = ApiConfig {
            http_port: parse_or(&lookup, "HTTP_PORT", defaults.http_port)?,
            database_path: lookup("DATABASE_PATH").unwrap_or(defaults.database_path),
            db_max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", defaults.db_max_connections)?,
            jwt_secret: lookup("JWT_SECRET").unwrap_or(defaults.jwt_secret),
            jwt_access_lifetime_secs: parse_or(
                &lookup,
                "JWT_ACCESS_LIFETIME_SECS",
                defaults.jwt_access_lifetime_secs,
            )?,
            jwt_refresh_lifetime_secs: parse_or(
                &lookup,
                "JWT_REFRESH_LIFETIME_SECS",
                defaults.jwt_refresh_lifetime_secs,
            )?,
            jwt_renewal_window_secs: parse_or(
                &lookup,
                "JWT_RENEWAL_WINDOW_SECS",
                defaults.jwt_renewal_window_secs,
            )?,
            cookie_secure: parse_or(&lookup, "COOKIE_SECURE", defaults.cookie_secure)?,
            log_level: lookup("LOG_LEVEL").unwrap_or(defaults.log_level),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.trim().is_empty() {
            return Err(ConfigError::MissingRequired("JWT_SECRET".to_string()));
        }
        if self.db_max_connections == 0 {
            return Err(ConfigError::InvalidValue("DB_MAX_CONNECTIONS".to_string()));
        }
        if self.jwt_access_lifetime_secs <= 0 {
            return Err(ConfigError::InvalidValue("JWT_ACCESS_LIFETIME_SECS".to_string()));
        }
        if self.jwt_refresh_lifetime_secs <= 0 {
            return Err(ConfigError::InvalidValue("JWT_REFRESH_LIFETIME_SECS".to_string()));
        }
        if self.jwt_renewal_window_secs < 0
            || self.jwt_renewal_window_secs >= self.jwt_access_lifetime_secs
        {
            return Err(ConfigError::RenewalWindowTooLong {
                window: self.jwt_renewal_window_secs,
                lifetime: self.jwt_access_lifetime_secs,
            });
        }
        Ok(())
    }

    /// True when running with the built-in development secret.
    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("JWT_RENEWAL_WINDOW_SECS ({window}) must be shorter than JWT_ACCESS_LIFETIME_SECS ({lifetime})")]
    RenewalWindowTooLong { window: i64, lifetime: i64 },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ApiConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.http_port, 8080);
        assert_eq!(config.database_path, "./clinic.db");
        assert_eq!(config.jwt_access_lifetime_secs, 900);
        assert_eq!(config.jwt_refresh_lifetime_secs, 604_800);
        assert_eq!(config.jwt_renewal_window_secs, 300);
        assert!(!config.cookie_secure);
        assert!(config.uses_dev_secret());
    }

    #[test]
    fn test_overrides() {
        let config = ApiConfig::from_lookup(lookup(&[
            ("HTTP_PORT", "9000"),
            ("JWT_SECRET", "prod-secret"),
            ("COOKIE_SECURE", "true"),
            ("DATABASE_PATH", "/var/lib/clinic/clinic.db"),
        ]))
        .unwrap();
        assert_eq!(config.http_port, 9000);
        assert!(config.cookie_secure);
        assert!(!config.uses_dev_secret());
        assert_eq!(config.database_path, "/var/lib/clinic/clinic.db");
    }

    #[test]
    fn test_invalid_number() {
        let err = ApiConfig::from_lookup(lookup(&[("HTTP_PORT", "eighty")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(ref key) if key == "HTTP_PORT"));
    }

    #[test]
    fn test_renewal_window_must_fit_in_lifetime() {
        let err = ApiConfig::from_lookup(lookup(&[
            ("JWT_ACCESS_LIFETIME_SECS", "300"),
            ("JWT_RENEWAL_WINDOW_SECS", "300"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::RenewalWindowTooLong { .. }));

        let err = ApiConfig::from_lookup(lookup(&[("JWT_ACCESS_LIFETIME_SECS", "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(_)));
    }
}
