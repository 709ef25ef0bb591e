/**
 * Server Configuration
 *
 * Loads server settings from environment variables (a `.env` file is
 * honoured by the binary through `dotenv`) and opens the SQLite pool.
 *
 * # Environment
 *
 * - `DATABASE_URL` - SQLite URL, default `sqlite://boardsync.db?mode=rwc`
 * - `SERVER_PORT` - listen port, default `3000`
 * - `JWT_SECRET` - HS256 secret for bearer tokens
 * - `DEV_AUTH_BYPASS` - `1`/`true` accepts the `X-Dev-User-Id` header
 * - `CHANNEL_CAPACITY` - per-board broadcast buffer, default `256`
 *
 * Unlike optional integrations, the database is required: the server
 * refuses to start without it.
 */

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

pub const DEFAULT_DATABASE_URL: &str = "sqlite://boardsync.db?mode=rwc";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;
const DEV_JWT_SECRET: &str = "boardsync-dev-secret-change-me";

/// Server settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub database_url: String,
    pub port: u16,
    pub jwt_secret: String,
    /// Accept `X-Dev-User-Id` instead of a bearer token
    pub dev_auth_bypass: bool,
    pub channel_capacity: usize,
    /// Interval of the idle channel cleanup task
    pub cleanup_interval: std::time::Duration,
}

impl ServerConfig {
    /// Read configuration from the environment, falling back to defaults
    pub fn from_env() -> Self {
        let database_url =
            std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());

        let port = std::env::var("SERVER_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);

        let jwt_secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| {
            tracing::warn!("JWT_SECRET not set, using the development secret");
            DEV_JWT_SECRET.to_string()
        });

        let dev_auth_bypass = std::env::var("DEV_AUTH_BYPASS")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        if dev_auth_bypass {
            tracing::warn!("DEV_AUTH_BYPASS enabled: X-Dev-User-Id is trusted");
        }

        let channel_capacity = std::env::var("CHANNEL_CAPACITY")
            .ok()
            .and_then(|c| c.parse::<usize>().ok())
            .filter(|c| *c > 0)
            .unwrap_or(DEFAULT_CHANNEL_CAPACITY);

        Self {
            database_url,
            port,
            jwt_secret,
            dev_auth_bypass,
            channel_capacity,
            cleanup_interval: std::time::Duration::from_secs(300),
        }
    }

    /// In-memory database, fixed secret, dev header enabled
    pub fn for_tests() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            port: 0,
            jwt_secret: "test-secret".to_string(),
            dev_auth_bypass: true,
            channel_capacity: 64,
            cleanup_interval: std::time::Duration::from_secs(300),
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_url.contains(":memory:")
    }
}

/// Open the SQLite pool and run migrations
///
/// An in-memory database lives inside a single connection, so the pool is
/// pinned to one connection that never expires.
pub async fn load_database(config: &ServerConfig) -> Result<SqlitePool, sqlx::Error> {
    tracing::info!("Connecting to database...");

    let options = SqliteConnectOptions::from_str(&config.database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = if config.is_in_memory() {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?
    } else {
        SqlitePoolOptions::new()
            .max_connections(8)
            .connect_with(options)
            .await?
    };

    tracing::info!("Running database migrations...");
    sqlx::migrate!().run(&pool).await?;
    tracing::info!("Database migrations completed successfully");

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_load_in_memory_database() {
        let pool = load_database(&ServerConfig::for_tests()).await.unwrap();
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_for_tests_config() {
        let config = ServerConfig::for_tests();
        assert!(config.is_in_memory());
        assert!(config.dev_auth_bypass);
    }
}
