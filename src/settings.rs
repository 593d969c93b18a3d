//! Platform connection settings.
//!
//! Settings come from the environment, after an optional project `.env` file
//! has been loaded. Only the API token is required.

use std::path::Path;
use tracing::{debug, info};

use crate::error::{Result, SettingsError};

/// Environment variable holding the platform API token.
pub const ENV_TOKEN: &str = "EDGE_DEPLOY_TOKEN";

/// Environment variable overriding the platform API base URL.
pub const ENV_API_URL: &str = "EDGE_DEPLOY_API_URL";

/// Environment variable overriding the storage API base URL.
pub const ENV_STORAGE_URL: &str = "EDGE_DEPLOY_STORAGE_URL";

/// Environment variable overriding the request timeout.
pub const ENV_TIMEOUT_SECS: &str = "EDGE_DEPLOY_TIMEOUT_SECS";

/// Default platform API base URL.
pub const DEFAULT_API_URL: &str = "https://api.azionapi.net";

/// Default storage API base URL.
pub const DEFAULT_STORAGE_URL: &str = "https://api.azion.com/v4";

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Connection settings for the platform API.
#[derive(Clone, PartialEq, Eq)]
pub struct PlatformSettings {
    /// API token.
    pub token: String,
    /// Base URL of the resource API.
    pub api_url: String,
    /// Base URL of the storage API.
    pub storage_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl std::fmt::Debug for PlatformSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlatformSettings")
            .field("token", &"<redacted>")
            .field("api_url", &self.api_url)
            .field("storage_url", &self.storage_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl PlatformSettings {
    /// Creates settings with default endpoints for the given token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            api_url: DEFAULT_API_URL.to_string(),
            storage_url: DEFAULT_STORAGE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Reads settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is missing or the timeout is not a
    /// positive integer.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads `<project_dir>/.env` if present, then reads the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the `.env` file exists but cannot be loaded, or if
    /// the resulting environment is incomplete.
    pub fn load(project_dir: &Path) -> Result<Self> {
        load_dotenv(project_dir)?;
        Self::from_env()
    }

    /// Builds settings from an arbitrary variable lookup.
    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let token = lookup(ENV_TOKEN)
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| SettingsError::MissingEnvVar {
                name: String::from(ENV_TOKEN),
            })?;

        let mut settings = Self::new(token);

        if let Some(url) = lookup(ENV_API_URL) {
            debug!("Overriding API URL from environment");
            settings.api_url = url;
        }

        if let Some(url) = lookup(ENV_STORAGE_URL) {
            debug!("Overriding storage URL from environment");
            settings.storage_url = url;
        }

        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            settings.timeout_secs = raw
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| SettingsError::InvalidValue {
                    name: String::from(ENV_TIMEOUT_SECS),
                    message: format!("expected a positive number of seconds, got '{raw}'"),
                })?;
        }

        Ok(settings)
    }
}

/// Loads the project's `.env` file if present.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be parsed.
pub fn load_dotenv(project_dir: &Path) -> Result<()> {
    let env_path = project_dir.join(".env");

    if env_path.exists() {
        info!("Loading environment from: {}", env_path.display());
        dotenvy::from_path(&env_path).map_err(|e| SettingsError::DotenvFailed {
            path: env_path.clone(),
            message: e.to_string(),
        })?;
    } else {
        debug!(".env file not found at: {}", env_path.display());
    }

    Ok(())
}
