//! Server configuration from environment variables.
//!
//! | Variable | Default |
//! |---|---|
//! | `HOST` | `0.0.0.0` |
//! | `PORT` | `3000` |
//! | `DATA_DIR` | `./data` |
//! | `JWT_SECRET` | built-in local secret |
//! | `TOKEN_TTL_HOURS` | `24` |
//! | `AUTH_REQUIRED` | `false` |
//! | `DEFAULT_USER` | `friend1` |
//! | `MAX_FILE_SIZE` | `100000000` |
//! | `MAX_FILES_PER_UPLOAD` | `10` |
//! | `TEMPORAL_UTC_OFFSET` | `+00:00` |
//! | `ALLOWED_ORIGINS` | `http://localhost:5173,http://localhost:3000` |

use std::path::PathBuf;
use std::str::FromStr;

use chrono::FixedOffset;
use elephant_core::defaults;
use elephant_core::{parse_utc_offset, utc_offset, Result};
use elephant_store::StoreConfig;
use tracing::warn;

const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:5173,http://localhost:3000";

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub token_secret: String,
    pub token_ttl_hours: i64,
    /// Reject requests without a valid bearer token
    pub auth_required: bool,
    /// Acting user when no valid token is supplied
    pub default_user: String,
    pub max_file_size: usize,
    pub max_files_per_upload: usize,
    pub utc_offset: FixedOffset,
    pub allowed_origins: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            data_dir: PathBuf::from("./data"),
            token_secret: defaults::TOKEN_SECRET.to_string(),
            token_ttl_hours: defaults::TOKEN_TTL_HOURS,
            auth_required: false,
            default_user: defaults::DEFAULT_USER.to_string(),
            max_file_size: defaults::MAX_FILE_SIZE,
            max_files_per_upload: defaults::MAX_FILES_PER_UPLOAD,
            utc_offset: utc_offset(),
            allowed_origins: split_origins(DEFAULT_ALLOWED_ORIGINS),
        }
    }
}

impl ApiConfig {
    /// Read configuration from the environment.
    ///
    /// Malformed values fall back to their defaults with a warning, except
    /// `TEMPORAL_UTC_OFFSET`, which is rejected.
    pub fn from_env() -> Result<Self> {
        let base = Self::default();

        let utc_offset = match std::env::var("TEMPORAL_UTC_OFFSET") {
            Ok(raw) => parse_utc_offset(&raw)?,
            Err(_) => base.utc_offset,
        };

        let allowed_origins = std::env::var("ALLOWED_ORIGINS")
            .ok()
            .map(|raw| split_origins(&raw))
            .filter(|origins| !origins.is_empty())
            .unwrap_or(base.allowed_origins);

        Ok(Self {
            host: std::env::var("HOST").unwrap_or(base.host),
            port: env_or("PORT", base.port),
            data_dir: std::env::var("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(base.data_dir),
            token_secret: std::env::var("JWT_SECRET")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or(base.token_secret),
            token_ttl_hours: env_or("TOKEN_TTL_HOURS", base.token_ttl_hours),
            auth_required: std::env::var("AUTH_REQUIRED")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(base.auth_required),
            default_user: std::env::var("DEFAULT_USER")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(base.default_user),
            max_file_size: env_or("MAX_FILE_SIZE", base.max_file_size),
            max_files_per_upload: env_or("MAX_FILES_PER_UPLOAD", base.max_files_per_upload),
            utc_offset,
            allowed_origins,
        })
    }

    /// Settings for opening the store.
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            data_dir: self.data_dir.clone(),
            utc_offset: self.utc_offset,
            token_secret: self.token_secret.clone(),
            token_ttl_hours: self.token_ttl_hours,
        }
    }

    /// Upper bound for a whole upload request body.
    pub fn max_upload_body(&self) -> usize {
        self.max_file_size
            .saturating_mul(self.max_files_per_upload.max(1))
            .saturating_add(1024 * 1024)
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                warn!(key, value = %raw, "Invalid configuration value, using default");
                default
            }
        },
        Err(_) => default,
    }
}

fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ApiConfig::default();
        assert_eq!(config.port, 3000);
        assert_eq!(config.default_user, "friend1");
        assert!(!config.auth_required);
        assert_eq!(config.allowed_origins.len(), 2);
        assert_eq!(config.utc_offset, utc_offset());
    }

    #[test]
    fn test_split_origins_drops_blanks() {
        assert_eq!(
            split_origins(" http://a , ,http://b"),
            vec!["http://a".to_string(), "http://b".to_string()]
        );
    }

    #[test]
    fn test_max_upload_body_saturates() {
        let config = ApiConfig {
            max_file_size: usize::MAX,
            ..Default::default()
        };
        assert_eq!(config.max_upload_body(), usize::MAX);
    }
}
