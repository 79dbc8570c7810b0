//! Configuration management

use std::str::FromStr;

use cda_common::ConfigurationError;

use crate::dispatch::{AccessPolicy, CacheRule, OfficeResolver};

// ============================================================================
// Server Configuration Constants
// ============================================================================

/// Default server host binding.
pub const DEFAULT_SERVER_HOST: &str = "127.0.0.1";

/// Default server port.
pub const DEFAULT_SERVER_PORT: u16 = 7000;

/// Default shutdown timeout in seconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// Default mount point of the resources.
pub const DEFAULT_CONTEXT_PATH: &str = "/cwms-data";

/// Default database URL for local development.
pub const DEFAULT_DATABASE_URL: &str = "postgresql://localhost/cwms";

/// Default maximum database connections in the pool.
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 10;

/// Default minimum database connections in the pool.
pub const DEFAULT_DATABASE_MIN_CONNECTIONS: u32 = 2;

/// Default database connection timeout in seconds.
pub const DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default database idle timeout in seconds (10 minutes).
pub const DEFAULT_DATABASE_IDLE_TIMEOUT_SECS: u64 = 600;

/// Default CORS allowed origin.
pub const DEFAULT_CORS_ALLOWED_ORIGIN: &str = "*";

/// Role required for writes unless configured otherwise.
pub const DEFAULT_WRITE_ROLE: &str = "CWMS Users";

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub cors: CorsConfig,
    pub access: AccessConfig,
    /// Default caching of successful reads
    pub cache: CacheRule,
    /// Operator override of the office derived from the context path
    pub office: Option<String>,
}

/// Server-specific configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub shutdown_timeout_secs: u64,
    /// Base path the resources are mounted under, e.g. `/spk-data`
    pub context_path: String,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

/// CORS configuration
#[derive(Debug, Clone)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub allow_credentials: bool,
}

/// Access configuration
#[derive(Debug, Clone)]
pub struct AccessConfig {
    /// Any one of these roles allows writes
    pub write_roles: Vec<String>,
    /// Require the write roles for reads too
    pub restrict_reads: bool,
    /// Take the caller from `x-cda-user`/`x-cda-roles`
    pub trust_identity_headers: bool,
}

impl AccessConfig {
    /// The policy every resource is registered with
    pub fn policy(&self) -> AccessPolicy {
        let policy = AccessPolicy::new(self.write_roles.iter().cloned());
        if self.restrict_reads {
            policy.restrict_reads()
        } else {
            policy
        }
    }
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self::from_lookup(|name| std::env::var(name).ok())?;
        config.validate()?;

        Ok(config)
    }

    /// Build configuration from any variable source, applying defaults
    pub fn from_lookup<F>(var: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let flag = |name: &str, default: bool| {
            var(name)
                .and_then(|s| s.trim().parse::<bool>().ok())
                .unwrap_or(default)
        };
        let list = |name: &str, default: &str| -> Vec<String> {
            var(name)
                .unwrap_or_else(|| default.to_string())
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        };

        let cache = match var("CDA_DEFAULT_CACHE") {
            Some(raw) => CacheRule::from_str(&raw)?,
            None => CacheRule::default(),
        };

        Ok(Config {
            server: ServerConfig {
                host: var("CDA_HOST").unwrap_or_else(|| DEFAULT_SERVER_HOST.to_string()),
                port: parsed(&var, "CDA_PORT").unwrap_or(DEFAULT_SERVER_PORT),
                shutdown_timeout_secs: parsed(&var, "CDA_SHUTDOWN_TIMEOUT")
                    .unwrap_or(DEFAULT_SHUTDOWN_TIMEOUT_SECS),
                context_path: var("CDA_CONTEXT_PATH")
                    .unwrap_or_else(|| DEFAULT_CONTEXT_PATH.to_string()),
            },
            database: DatabaseConfig {
                url: var("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
                max_connections: parsed(&var, "DATABASE_MAX_CONNECTIONS")
                    .unwrap_or(DEFAULT_DATABASE_MAX_CONNECTIONS),
                min_connections: parsed(&var, "DATABASE_MIN_CONNECTIONS")
                    .unwrap_or(DEFAULT_DATABASE_MIN_CONNECTIONS),
                connect_timeout_secs: parsed(&var, "DATABASE_CONNECT_TIMEOUT")
                    .unwrap_or(DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS),
                idle_timeout_secs: parsed(&var, "DATABASE_IDLE_TIMEOUT")
                    .unwrap_or(DEFAULT_DATABASE_IDLE_TIMEOUT_SECS),
            },
            cors: CorsConfig {
                allowed_origins: list("CORS_ALLOWED_ORIGINS", DEFAULT_CORS_ALLOWED_ORIGIN),
                allow_credentials: flag("CORS_ALLOW_CREDENTIALS", false),
            },
            access: AccessConfig {
                write_roles: list("CDA_WRITE_ROLES", DEFAULT_WRITE_ROLE),
                restrict_reads: flag("CDA_RESTRICT_READS", false),
                trust_identity_headers: flag("CDA_TRUST_IDENTITY_HEADERS", false),
            },
            cache,
            office: var("CDA_OFFICE")
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.port == 0 {
            return Err(
                ConfigurationError::invalid_setting("CDA_PORT", "must be greater than 0").into(),
            );
        }

        if !self.server.context_path.starts_with('/') {
            return Err(
                ConfigurationError::invalid_setting("CDA_CONTEXT_PATH", "must start with '/'").into(),
            );
        }

        if self.database.url.is_empty() {
            return Err(
                ConfigurationError::invalid_setting("DATABASE_URL", "cannot be empty").into(),
            );
        }

        if self.database.max_connections == 0 {
            return Err(
                ConfigurationError::invalid_setting("DATABASE_MAX_CONNECTIONS", "must be greater than 0").into(),
            );
        }

        if self.database.min_connections > self.database.max_connections {
            anyhow::bail!(
                "Database min_connections ({}) cannot be greater than max_connections ({})",
                self.database.min_connections,
                self.database.max_connections
            );
        }

        if self.access.write_roles.is_empty() {
            return Err(
                ConfigurationError::invalid_setting("CDA_WRITE_ROLES", "at least one role is required").into(),
            );
        }

        if self.access.trust_identity_headers {
            tracing::warn!(
                "Trusting x-cda-user/x-cda-roles; only the auth proxy may reach this server"
            );
        }

        Ok(())
    }

    /// Office resolution for this deployment
    pub fn offices(&self) -> OfficeResolver {
        match self.office {
            Some(ref office) => OfficeResolver::with_override(office.as_str()),
            None => OfficeResolver::derived(),
        }
    }
}

fn parsed<T, F>(var: &F, name: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    var(name).and_then(|s| s.trim().parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: DEFAULT_SERVER_HOST.to_string(),
                port: DEFAULT_SERVER_PORT,
                shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
                context_path: DEFAULT_CONTEXT_PATH.to_string(),
            },
            database: DatabaseConfig {
                url: DEFAULT_DATABASE_URL.to_string(),
                max_connections: DEFAULT_DATABASE_MAX_CONNECTIONS,
                min_connections: DEFAULT_DATABASE_MIN_CONNECTIONS,
                connect_timeout_secs: DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
                idle_timeout_secs: DEFAULT_DATABASE_IDLE_TIMEOUT_SECS,
            },
            cors: CorsConfig {
                allowed_origins: vec![DEFAULT_CORS_ALLOWED_ORIGIN.to_string()],
                allow_credentials: false,
            },
            access: AccessConfig {
                write_roles: vec![DEFAULT_WRITE_ROLE.to_string()],
                restrict_reads: false,
                trust_identity_headers: false,
            },
            cache: CacheRule::default(),
            office: None,
        }
    }
}
