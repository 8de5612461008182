//! Configuration module for the recipe backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::errors::AppError;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Directory uploaded media is written to
    pub media_root: PathBuf,
    /// URL prefix media files are served under
    pub media_url: String,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// How many times to try opening the database before giving up
    pub db_wait_attempts: u32,
    /// Largest accepted request body, in bytes
    pub max_upload_bytes: usize,
    /// Superuser created at startup when both are set
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let db_path = env::var("RECIPE_DB_PATH")
            .unwrap_or_else(|_| "./data/app.sqlite".to_string())
            .into();

        let media_root = env::var("RECIPE_MEDIA_ROOT")
            .unwrap_or_else(|_| "./data/media".to_string())
            .into();

        let mut media_url = env::var("RECIPE_MEDIA_URL").unwrap_or_else(|_| "/media/".to_string());
        if !media_url.starts_with('/') {
            media_url.insert(0, '/');
        }
        if !media_url.ends_with('/') {
            media_url.push('/');
        }
        if media_url == "/" {
            return Err(AppError::Config(
                "RECIPE_MEDIA_URL must not be the site root".to_string(),
            ));
        }

        let bind_addr = env::var("RECIPE_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8000".to_string())
            .parse()
            .map_err(|e| AppError::Config(format!("Invalid RECIPE_BIND_ADDR: {}", e)))?;

        let log_level = env::var("RECIPE_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let db_wait_attempts = parse_var("RECIPE_DB_WAIT_ATTEMPTS", 10)?;
        let max_upload_bytes = parse_var("RECIPE_MAX_UPLOAD_BYTES", 10 * 1024 * 1024)?;

        let admin_email = env::var("RECIPE_ADMIN_EMAIL").ok().filter(|s| !s.is_empty());
        let admin_password = env::var("RECIPE_ADMIN_PASSWORD")
            .ok()
            .filter(|s| !s.is_empty());

        Ok(Self {
            db_path,
            media_root,
            media_url,
            bind_addr,
            log_level,
            db_wait_attempts,
            max_upload_bytes,
            admin_email,
            admin_password,
        })
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T, AppError>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| AppError::Config(format!("Invalid {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}
