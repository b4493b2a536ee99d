//! Connection configuration for stagesync
//!
//! A config is created once per [`Store`](crate::store::Store) and never
//! mutated afterwards. Connection parameters are discrete fields; policy
//! knobs (TLS, connection recycling, bulk-load chunking) carry fixed
//! defaults.

use std::time::Duration;

/// Smallest accepted bulk-load chunk size.
pub const CHUNK_SIZE_MIN: usize = 300;

/// Largest accepted bulk-load chunk size.
pub const CHUNK_SIZE_MAX: usize = 5000;

/// Default bulk-load chunk size.
pub const CHUNK_SIZE_DEFAULT: usize = 1000;

/// Default maximum connection lifetime before recycling.
pub const MAX_LIFETIME_DEFAULT: Duration = Duration::from_secs(3600);

/// Configuration for creating connections
#[derive(Clone)]
pub struct ConnectionConfig {
    /// Database server hostname or IP
    pub host: String,
    /// Database user
    pub user: String,
    /// Database password
    pub password: String,
    /// Database (schema) name
    pub database: String,
    /// TCP port
    pub port: u16,
    /// Whether to require a TLS-enabled transport
    pub require_tls: bool,
    /// Maximum connection lifetime before the pool recycles it
    pub max_lifetime: Duration,
    /// Rows per chunk for bulk loads
    pub chunk_size: usize,
}

impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Redact the password to prevent leaking credentials to logs.
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &"***")
            .field("database", &self.database)
            .field("port", &self.port)
            .field("require_tls", &self.require_tls)
            .field("max_lifetime", &self.max_lifetime)
            .field("chunk_size", &self.chunk_size)
            .finish()
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            user: String::new(),
            password: String::new(),
            database: String::new(),
            port: 3306,
            require_tls: true,
            max_lifetime: MAX_LIFETIME_DEFAULT,
            chunk_size: CHUNK_SIZE_DEFAULT,
        }
    }
}

impl ConnectionConfig {
    /// Create a configuration from connection parameters
    pub fn new(
        host: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
        database: impl Into<String>,
        port: u16,
    ) -> Self {
        Self {
            host: host.into(),
            user: user.into(),
            password: password.into(),
            database: database.into(),
            port,
            ..Default::default()
        }
    }

    /// Enable or disable TLS
    pub fn with_require_tls(mut self, require: bool) -> Self {
        self.require_tls = require;
        self
    }

    /// Set the maximum connection lifetime before recycling
    pub fn with_max_lifetime(mut self, lifetime: Duration) -> Self {
        self.max_lifetime = lifetime;
        self
    }

    /// Set the bulk-load chunk size, clamped to the accepted range
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.clamp(CHUNK_SIZE_MIN, CHUNK_SIZE_MAX);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = ConnectionConfig::new("db.internal", "app", "secret", "warehouse", 3307)
            .with_require_tls(false)
            .with_max_lifetime(Duration::from_secs(600))
            .with_chunk_size(500);

        assert_eq!(config.host, "db.internal");
        assert_eq!(config.user, "app");
        assert_eq!(config.database, "warehouse");
        assert_eq!(config.port, 3307);
        assert!(!config.require_tls);
        assert_eq!(config.max_lifetime, Duration::from_secs(600));
        assert_eq!(config.chunk_size, 500);
    }

    #[test]
    fn test_chunk_size_clamped() {
        let config = ConnectionConfig::default().with_chunk_size(10);
        assert_eq!(config.chunk_size, CHUNK_SIZE_MIN);

        let config = ConnectionConfig::default().with_chunk_size(1_000_000);
        assert_eq!(config.chunk_size, CHUNK_SIZE_MAX);
    }

    #[test]
    fn test_debug_redacts_password() {
        let config = ConnectionConfig::new("localhost", "app", "hunter2", "db", 3306);
        let debug = format!("{config:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("***"));
    }
}
