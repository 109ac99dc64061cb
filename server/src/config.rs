//! Runtime configuration parsed from environment variables.
//!
//! Everything has a default except the canvas password and database URL,
//! whose absence degrades features instead of aborting start-up.

use std::path::PathBuf;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_CANVAS_BODY_LIMIT_BYTES: usize = 25 * 1024 * 1024;
pub const DEFAULT_CANVAS_SAVE_ATTEMPTS: usize = 1;
pub const DEFAULT_CANVAS_SAVE_RETRY_BASE_MS: u64 = 50;
pub const DEFAULT_CONTENT_DIR: &str = "public";
pub const DEFAULT_WEBSITE_DIR: &str = "website";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub port: u16,
    /// `None` runs the canvas against the in-memory store.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    /// `None` leaves the canvas locked (login answers 503).
    pub canvas_password: Option<String>,
    pub cookie: CookieConfig,
    pub canvas_body_limit_bytes: usize,
    pub save_retry: SaveRetry,
    pub content_dir: PathBuf,
    pub website_dir: PathBuf,
}

/// Attributes applied to the session cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CookieConfig {
    pub secure: bool,
    /// Optional `Max-Age`; a browser-session cookie when absent.
    pub max_age_secs: Option<i64>,
}

/// Bounded retry policy for scene saves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveRetry {
    /// Total attempts, at least one.
    pub attempts: usize,
    /// Delay before attempt `n + 1` is `n * base_ms`.
    pub base_ms: u64,
}

impl Default for SaveRetry {
    fn default() -> Self {
        Self { attempts: DEFAULT_CANVAS_SAVE_ATTEMPTS, base_ms: DEFAULT_CANVAS_SAVE_RETRY_BASE_MS }
    }
}

impl Config {
    /// Build typed config from environment variables.
    ///
    /// - `PORT`, `DATABASE_URL`, `DB_MAX_CONNECTIONS`
    /// - `CANVAS_PASSWORD`: blank counts as unset
    /// - `COOKIE_SECURE`, `SESSION_MAX_AGE_SECS`
    /// - `CANVAS_BODY_LIMIT_BYTES`, `CANVAS_SAVE_ATTEMPTS`, `CANVAS_SAVE_RETRY_BASE_MS`
    /// - `CONTENT_DIR`, `WEBSITE_DIR`
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            port: env_parse("PORT", DEFAULT_PORT),
            database_url: env_non_empty("DATABASE_URL"),
            db_max_connections: env_parse("DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS),
            canvas_password: env_non_empty("CANVAS_PASSWORD"),
            cookie: CookieConfig {
                secure: env_bool("COOKIE_SECURE").unwrap_or(false),
                max_age_secs: env_non_empty("SESSION_MAX_AGE_SECS")
                    .and_then(|v| v.parse::<i64>().ok())
                    .filter(|secs| *secs > 0),
            },
            canvas_body_limit_bytes: env_parse("CANVAS_BODY_LIMIT_BYTES", DEFAULT_CANVAS_BODY_LIMIT_BYTES),
            save_retry: SaveRetry {
                attempts: env_parse("CANVAS_SAVE_ATTEMPTS", DEFAULT_CANVAS_SAVE_ATTEMPTS).max(1),
                base_ms: env_parse("CANVAS_SAVE_RETRY_BASE_MS", DEFAULT_CANVAS_SAVE_RETRY_BASE_MS),
            },
            content_dir: env_path("CONTENT_DIR", DEFAULT_CONTENT_DIR),
            website_dir: env_path("WEBSITE_DIR", DEFAULT_WEBSITE_DIR),
        }
    }
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

pub(crate) fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .and_then(|raw| match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        })
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_path(key: &str, default: &str) -> PathBuf {
    env_non_empty(key).map_or_else(|| PathBuf::from(default), PathBuf::from)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
