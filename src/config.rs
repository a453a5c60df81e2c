// src/config.rs

use std::{env, fmt};

use dotenvy::dotenv;
use url::Url;

/// Default session lifetime, also used as the cookie `Max-Age`.
pub const DEFAULT_SESSION_TTL_SECS: u64 = 3600;

/// Longest accepted session lifetime (one year).
pub const MAX_SESSION_TTL_SECS: u64 = 365 * 24 * 3600;

/// Upper bound on the number of steps in one saved test flow.
pub const MAX_PROCESS_STEPS: usize = 256;

/// Connection settings for the PostgreSQL database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseSettings {
    pub user: String,
    pub password: String,
    pub host: String,
    pub port: u16,
    pub name: String,
}

impl DatabaseSettings {
    /// Builds a `postgres://` URL, percent-encoding the credentials.
    pub fn url(&self) -> Result<String, ConfigError> {
        let base = format!("postgres://{}:{}/{}", self.host, self.port, self.name);
        let mut url = Url::parse(&base)
            .map_err(|e| ConfigError::Invalid("DB_HOST".to_string(), e.to_string()))?;

        url.set_username(&self.user)
            .map_err(|_| ConfigError::Invalid("DB_USER".to_string(), self.user.clone()))?;

        if !self.password.is_empty() {
            url.set_password(Some(&self.password))
                .map_err(|_| ConfigError::Invalid("DB_PASSWORD".to_string(), "***".to_string()))?;
        }

        Ok(url.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database: DatabaseSettings,
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
    pub jwt_secret: String,
    /// True when no `JWT_SECRET` was configured and a random one is in use.
    pub jwt_secret_generated: bool,
    pub session_ttl: u64,
    pub seed_default_users: bool,
    pub cors_origins: Vec<String>,
    pub rust_log: String,
    pub log_dir: String,
}

#[derive(Debug)]
pub enum ConfigError {
    /// (variable, offending value or reason)
    Invalid(String, String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Invalid(key, value) => {
                write!(f, "invalid value for {}: {}", key, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database = DatabaseSettings {
            user: get("DB_USER").unwrap_or_else(|| "postgres".to_string()),
            password: lookup("DB_PASSWORD").unwrap_or_default(),
            host: get("DB_HOST").unwrap_or_else(|| "localhost".to_string()),
            port: parse_or(get("DB_PORT"), "DB_PORT", 5432)?,
            name: get("DB_NAME").unwrap_or_else(|| "QuizApplicationYT".to_string()),
        };

        let database_url = match get("DATABASE_URL") {
            Some(url) => url,
            None => database.url()?,
        };

        let (jwt_secret, jwt_secret_generated) = match get("JWT_SECRET") {
            Some(secret) => (secret, false),
            None => (
                format!("{}{}", uuid::Uuid::new_v4().simple(), uuid::Uuid::new_v4().simple()),
                true,
            ),
        };

        let workers = match get("APP_WORKERS") {
            Some(raw) => {
                let n: usize = raw
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::Invalid("APP_WORKERS".to_string(), raw.clone()))?;
                if n == 0 {
                    return Err(ConfigError::Invalid("APP_WORKERS".to_string(), raw));
                }
                Some(n)
            }
            None => None,
        };

        let cors_origins = get("CORS_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let session_ttl: u64 =
            parse_or(get("SESSION_TTL_SECS"), "SESSION_TTL_SECS", DEFAULT_SESSION_TTL_SECS)?;
        if session_ttl == 0 || session_ttl > MAX_SESSION_TTL_SECS {
            return Err(ConfigError::Invalid(
                "SESSION_TTL_SECS".to_string(),
                format!("{} (expected 1..={})", session_ttl, MAX_SESSION_TTL_SECS),
            ));
        }

        Ok(Self {
            database,
            database_url,
            host: get("APP_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(get("APP_PORT"), "APP_PORT", 8001)?,
            workers,
            jwt_secret,
            jwt_secret_generated,
            session_ttl,
            seed_default_users: parse_bool_or(get("SEED_DEFAULT_USERS"), "SEED_DEFAULT_USERS", true)?,
            cors_origins,
            rust_log: get("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            log_dir: get("LOG_DIR").unwrap_or_else(|| "logs".to_string()),
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    raw: Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(key.to_string(), value)),
        None => Ok(default),
    }
}

fn parse_bool_or(raw: Option<String>, key: &str, default: bool) -> Result<bool, ConfigError> {
    let Some(value) = raw else {
        return Ok(default);
    };

    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid(key.to_string(), value)),
    }
}
