//! Server configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the server can start with zero
//! configuration for local development.

use std::net::SocketAddr;
use std::path::PathBuf;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP (axum) API server.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:8080`
    pub http_addr: SocketAddr,

    /// Filesystem path of the SQLite database.
    /// Env: `DATABASE_PATH`
    /// Default: `./truyenkho.db`
    pub database_path: PathBuf,

    /// Stories per page on the public listing.
    /// Env: `PAGE_SIZE`
    /// Default: `20`
    pub page_size: u32,

    /// Maximum results returned by `/search`.
    /// Env: `SEARCH_LIMIT`
    /// Default: `20`
    pub search_limit: usize,

    /// Maximum titles returned by `/suggest`.
    /// Env: `SUGGEST_LIMIT`
    /// Default: `8`
    pub suggest_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], 8080).into(),
            database_path: PathBuf::from("./truyenkho.db"),
            page_size: 20,
            search_limit: 20,
            suggest_limit: 8,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("HTTP_ADDR") {
            if let Ok(parsed) = addr.parse::<SocketAddr>() {
                config.http_addr = parsed;
            } else {
                tracing::warn!(value = %addr, "Invalid HTTP_ADDR, using default");
            }
        }

        if let Ok(path) = std::env::var("DATABASE_PATH") {
            config.database_path = PathBuf::from(path);
        }

        if let Ok(val) = std::env::var("PAGE_SIZE") {
            match val.parse::<u32>() {
                Ok(n) if n > 0 => config.page_size = n,
                _ => tracing::warn!(value = %val, "Invalid PAGE_SIZE, using default"),
            }
        }

        if let Ok(val) = std::env::var("SEARCH_LIMIT") {
            if let Ok(n) = val.parse::<usize>() {
                config.search_limit = n;
            }
        }

        if let Ok(val) = std::env::var("SUGGEST_LIMIT") {
            if let Ok(n) = val.parse::<usize>() {
                config.suggest_limit = n;
            }
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter,
        // so we do not store it here.

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.http_addr, ([0, 0, 0, 0], 8080).into());
        assert_eq!(config.page_size, 20);
        assert_eq!(config.suggest_limit, 8);
    }
}
