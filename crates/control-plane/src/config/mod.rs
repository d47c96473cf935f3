// Configuration loading
//
// The control plane is configured entirely through environment variables.
// A `.env` file is honored when present (loaded in main via dotenvy).

use campus_notify_core::NotifyConfig;
use std::net::SocketAddr;
use thiserror::Error;

/// Default listen address for the HTTP server
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:9000";

/// Default number of users seeded in dev mode
pub const DEFAULT_DEV_SEED_USERS: i64 = 3;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {value:?}")]
    InvalidValue { name: &'static str, value: String },
}

/// Control-plane configuration
#[derive(Debug, Clone)]
pub struct ControlPlaneConfig {
    /// PostgreSQL connection string. `None` runs in-memory dev mode.
    pub database_url: Option<String>,
    /// HTTP listen address
    pub bind_addr: SocketAddr,
    /// Optional prefix for all API routes (e.g., "/api")
    pub api_prefix: String,
    /// Allowed CORS origins; empty means same-origin only
    pub cors_allowed_origins: Vec<String>,
    /// Users created at startup in dev mode
    pub dev_seed_users: i64,
    /// Live delivery tunables
    pub notify: NotifyConfig,
}

impl ControlPlaneConfig {
    /// Create configuration from environment variables
    ///
    /// Environment variables:
    /// - `DATABASE_URL`: PostgreSQL URL (unset: in-memory dev mode)
    /// - `BIND_ADDR`: listen address (default: "0.0.0.0:9000")
    /// - `API_PREFIX`: route prefix (default: empty)
    /// - `CORS_ALLOWED_ORIGINS`: comma-separated origins (default: none)
    /// - `DEV_SEED_USERS`: users seeded in dev mode (default: 3)
    /// - `NOTIFY_QUEUE_CAPACITY`, `NOTIFY_HEARTBEAT_SECS`: see [`NotifyConfig::from_env`]
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_raw = lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_raw.parse().map_err(|_| ConfigError::InvalidValue {
            name: "BIND_ADDR",
            value: bind_raw.clone(),
        })?;

        let dev_seed_users = match lookup("DEV_SEED_USERS") {
            Some(raw) => raw
                .parse::<i64>()
                .ok()
                .filter(|n| *n >= 0)
                .ok_or(ConfigError::InvalidValue {
                    name: "DEV_SEED_USERS",
                    value: raw,
                })?,
            None => DEFAULT_DEV_SEED_USERS,
        };

        let cors_allowed_origins = lookup("CORS_ALLOWED_ORIGINS")
            .map(|s| {
                s.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            database_url: lookup("DATABASE_URL").filter(|s| !s.is_empty()),
            bind_addr,
            api_prefix: lookup("API_PREFIX").unwrap_or_default(),
            cors_allowed_origins,
            dev_seed_users,
            notify: NotifyConfig::from_env(),
        })
    }

    /// Check if the control plane will run without a database
    pub fn is_dev_mode(&self) -> bool {
        self.database_url.is_none()
    }
}
