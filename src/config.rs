//! Configuration management for the classifieds sync server

use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),
    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Empty means any origin
    pub cors_allowed_origins: Vec<String>,
    pub body_limit_bytes: usize,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_issuer: Option<String>,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"[REDACTED]")
            .field("jwt_issuer", &self.jwt_issuer)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub window: Duration,
    pub max_requests: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
                cors_allowed_origins: Vec::new(),
                body_limit_bytes: 10 * 1024 * 1024,
            },
            database: DatabaseConfig {
                url: "sqlite:./classifieds.db".to_string(),
                max_connections: 5,
            },
            auth: AuthConfig {
                jwt_secret: String::new(),
                jwt_issuer: None,
            },
            rate_limit: RateLimitConfig {
                window: Duration::from_secs(15 * 60),
                max_requests: 1000,
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let values: HashMap<String, String> = env::vars().collect();
        Self::from_lookup(|name| values.get(name).cloned())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Config::default();
        let var = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let jwt_secret = var("AUTH_JWT_SECRET").ok_or(ConfigError::MissingVar("AUTH_JWT_SECRET"))?;

        let cors_allowed_origins = var("CORS_ALLOWED_ORIGINS")
            .map(|origins| {
                origins
                    .split(',')
                    .map(str::trim)
                    .filter(|o| !o.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Config {
            server: ServerConfig {
                host: var("SERVER_HOST").unwrap_or(defaults.server.host),
                port: parse_or("SERVER_PORT", var("SERVER_PORT"), defaults.server.port)?,
                cors_allowed_origins,
                body_limit_bytes: parse_or(
                    "BODY_LIMIT_BYTES",
                    var("BODY_LIMIT_BYTES"),
                    defaults.server.body_limit_bytes,
                )?,
            },
            database: DatabaseConfig {
                url: var("DATABASE_URL").unwrap_or(defaults.database.url),
                max_connections: parse_or(
                    "DATABASE_MAX_CONNECTIONS",
                    var("DATABASE_MAX_CONNECTIONS"),
                    defaults.database.max_connections,
                )?,
            },
            auth: AuthConfig {
                jwt_secret,
                jwt_issuer: var("AUTH_JWT_ISSUER"),
            },
            rate_limit: RateLimitConfig {
                window: Duration::from_secs(parse_or(
                    "RATE_LIMIT_WINDOW_SECS",
                    var("RATE_LIMIT_WINDOW_SECS"),
                    defaults.rate_limit.window.as_secs(),
                )?),
                max_requests: parse_or(
                    "RATE_LIMIT_MAX_REQUESTS",
                    var("RATE_LIMIT_MAX_REQUESTS"),
                    defaults.rate_limit.max_requests,
                )?,
            },
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    name: &'static str,
    value: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_requires_jwt_secret() {
        let err = Config::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar("AUTH_JWT_SECRET")));
    }

    #[test]
    fn test_defaults_apply() {
        let config = Config::from_lookup(lookup_from(&[("AUTH_JWT_SECRET", "s3cret")])).unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.rate_limit.max_requests, 1000);
        assert_eq!(config.rate_limit.window, Duration::from_secs(900));
        assert!(config.server.cors_allowed_origins.is_empty());
        assert_eq!(config.database.url, "sqlite:./classifieds.db");
    }

    #[test]
    fn test_overrides_and_origins() {
        let config = Config::from_lookup(lookup_from(&[
            ("AUTH_JWT_SECRET", "s3cret"),
            ("SERVER_PORT", "8080"),
            ("CORS_ALLOWED_ORIGINS", "http://localhost:19006, exp://127.0.0.1:19000,"),
            ("AUTH_JWT_ISSUER", "classifieds-auth"),
        ]))
        .unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(
            config.server.cors_allowed_origins,
            vec!["http://localhost:19006", "exp://127.0.0.1:19000"]
        );
        assert_eq!(config.auth.jwt_issuer.as_deref(), Some("classifieds-auth"));
    }

    #[test]
    fn test_rejects_bad_port() {
        let err = Config::from_lookup(lookup_from(&[
            ("AUTH_JWT_SECRET", "s3cret"),
            ("SERVER_PORT", "not-a-port"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "SERVER_PORT", .. }));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config = Config::from_lookup(lookup_from(&[("AUTH_JWT_SECRET", "s3cret")])).unwrap();
        assert!(!format!("{:?}", config).contains("s3cret"));
    }
}
