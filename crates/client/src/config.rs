//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `ZAFARAN_API_URL` - Base URL of the Zafaran REST backend
//!
//! ## Optional
//! - `ZAFARAN_IMAGE_URL` - Base URL for product/gallery images
//!   (default: `ZAFARAN_API_URL` with the `/api` suffix stripped)
//! - `ZAFARAN_DATA_DIR` - Directory for persisted session state
//!   (default: the platform data dir, e.g. `~/.local/share/zafaran`)

use std::path::PathBuf;

use directories::ProjectDirs;
use thiserror::Error;
use url::Url;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Could not determine a platform data directory; set ZAFARAN_DATA_DIR")]
    NoDataDir,
}

/// Storefront client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the backend REST API.
    pub api_url: Url,
    /// Base URL for images referenced by products and gallery items.
    pub image_url: Url,
    /// Directory holding persisted session state.
    pub data_dir: PathBuf,
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from a `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid,
    /// or if no data directory can be determined.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_url = parse_url_var("ZAFARAN_API_URL", &get_required_env("ZAFARAN_API_URL")?)?;

        let image_url = match get_optional_env("ZAFARAN_IMAGE_URL") {
            Some(raw) => parse_url_var("ZAFARAN_IMAGE_URL", &raw)?,
            None => derive_image_url(&api_url),
        };

        let data_dir = match get_optional_env("ZAFARAN_DATA_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => default_data_dir()?,
        };

        Ok(Self {
            api_url,
            image_url,
            data_dir,
        })
    }

    /// Build a configuration directly, for embedders and tests.
    #[must_use]
    pub fn new(api_url: Url, data_dir: PathBuf) -> Self {
        let image_url = derive_image_url(&api_url);
        Self {
            api_url,
            image_url,
            data_dir,
        }
    }
}

/// The image host is the API host without the `/api` path segment.
fn derive_image_url(api_url: &Url) -> Url {
    let mut url = api_url.clone();
    let trimmed = url.path().trim_end_matches('/');
    let path = trimmed.strip_suffix("/api").unwrap_or("").to_owned();
    url.set_path(&path);
    url
}

/// Platform data directory for persisted session state.
fn default_data_dir() -> Result<PathBuf, ConfigError> {
    ProjectDirs::from("shop", "Zafaran", "zafaran")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or(ConfigError::NoDataDir)
}

fn get_required_env(name: &str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::MissingEnvVar(name.to_string()))
}

fn get_optional_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn parse_url_var(name: &str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw).map_err(|e| ConfigError::InvalidEnvVar(name.to_string(), e.to_string()))
}
