use std::env::var;
use std::time::Duration;

use dotenvy::dotenv;

/// Application configuration with environment variable overrides
#[derive(Debug, Clone)]
pub struct Config {
    /// Request body size limit in bytes
    /// Env: REQUEST_BODY_LIMIT (default: 65536 = 64KB)
    pub request_body_limit: usize,

    /// Request timeout in seconds
    /// Env: REQUEST_TIMEOUT_SECS (default: 30)
    pub request_timeout: Duration,

    /// Server port
    /// Env: PORT (default: 3000)
    pub port: u16,

    /// Document store file path
    /// Env: DATABASE_PATH (default: "warden.db")
    pub database_path: String,

    /// Game server to create at startup if it doesn't exist yet
    /// Env: BOOTSTRAP_SERVER_IP (optional)
    pub bootstrap_server_ip: Option<String>,

    /// Display name for the bootstrapped server
    /// Env: BOOTSTRAP_SERVER_NAME (default: "default")
    pub bootstrap_server_name: String,
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        let _ = dotenv();
        Self {
            request_body_limit: env_or_default("REQUEST_BODY_LIMIT", 64 * 1024),
            request_timeout: Duration::from_secs(env_or_default("REQUEST_TIMEOUT_SECS", 30)),
            port: env_or_default("PORT", 3000),
            database_path: env_or_default_string("DATABASE_PATH", "warden.db"),
            bootstrap_server_ip: var("BOOTSTRAP_SERVER_IP").ok().filter(|ip| !ip.is_empty()),
            bootstrap_server_name: env_or_default_string("BOOTSTRAP_SERVER_NAME", "default"),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            request_body_limit: 64 * 1024, // 64 KB
            request_timeout: Duration::from_secs(30),
            port: 3000,
            database_path: "warden.db".to_string(),
            bootstrap_server_ip: None,
            bootstrap_server_name: "default".to_string(),
        }
    }
}

/// Parse environment variable or return default value
fn env_or_default<T: std::str::FromStr>(key: &str, default: T) -> T {
    var(key)
        .ok()
        .and_then(|val| val.parse().ok())
        .unwrap_or(default)
}

/// Parse environment variable string or return default value
fn env_or_default_string(key: &str, default: &str) -> String {
    var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.request_body_limit, 64 * 1024);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.port, 3000);
        assert_eq!(config.database_path, "warden.db");
        assert!(config.bootstrap_server_ip.is_none());
        assert_eq!(config.bootstrap_server_name, "default");
    }

    #[test]
    fn test_unset_values_fall_back() {
        // Never set by anything else in the test suite
        assert_eq!(env_or_default("WARDEN_TEST_UNSET_PORT", 8080u16), 8080);
        assert_eq!(
            env_or_default_string("WARDEN_TEST_UNSET_PATH", "x.db"),
            "x.db"
        );
    }
}
