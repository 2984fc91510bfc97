use std::str::FromStr;

use chrono::FixedOffset;
use leaderboard_core::error::CoreError;
use leaderboard_core::snapshot_store::SnapshotStoreConfig;

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development except the
/// database URL, which must be provided.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    pub database_url: String,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How snapshots are computed (top-N, calendar offset, publication).
    pub snapshots: SnapshotStoreConfig,
}

impl ServerConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                          | Default                 |
    /// |----------------------------------|-------------------------|
    /// | `HOST`                           | `0.0.0.0`               |
    /// | `PORT`                           | `3000`                  |
    /// | `DATABASE_URL`                   | required                |
    /// | `CORS_ORIGINS`                   | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`           | `30`                    |
    /// | `SNAPSHOT_TOP_N`                 | `10`                    |
    /// | `LEADERBOARD_UTC_OFFSET_MINUTES` | `0`                     |
    /// | `PUBLISHED_SCORES_ONLY`          | `true`                  |
    pub fn from_env() -> Result<Self, CoreError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, CoreError> {
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = parse_or(&lookup, "PORT", 3000)?;

        let database_url = lookup("DATABASE_URL")
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| CoreError::Configuration("DATABASE_URL must be set".into()))?;

        let cors_origins: Vec<String> = lookup("CORS_ORIGINS")
            .unwrap_or_else(|| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = parse_or(&lookup, "REQUEST_TIMEOUT_SECS", 30)?;

        let defaults = SnapshotStoreConfig::default();
        let top_n: usize = parse_or(&lookup, "SNAPSHOT_TOP_N", defaults.top_n)?;
        if top_n == 0 {
            return Err(CoreError::Configuration(
                "SNAPSHOT_TOP_N must be at least 1".into(),
            ));
        }

        let offset_minutes: i32 = parse_or(&lookup, "LEADERBOARD_UTC_OFFSET_MINUTES", 0)?;
        let utc_offset = offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| {
                CoreError::Configuration(format!(
                    "LEADERBOARD_UTC_OFFSET_MINUTES out of range: {offset_minutes}"
                ))
            })?;

        let published_only: bool =
            parse_or(&lookup, "PUBLISHED_SCORES_ONLY", defaults.published_only)?;

        Ok(Self {
            host,
            port,
            database_url,
            cors_origins,
            request_timeout_secs,
            snapshots: SnapshotStoreConfig {
                top_n,
                utc_offset,
                published_only,
            },
        })
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T, CoreError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| CoreError::Configuration(format!("{key} is invalid ('{raw}'): {e}"))),
    }
}
