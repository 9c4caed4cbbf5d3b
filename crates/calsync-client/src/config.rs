//! Client configuration.
//!
//! All settings live in a single `config.toml` file at
//! `~/.config/calsync/config.toml` by default.
//!
//! Credential values (`client_id`, `client_secret`) support secret references:
//! - `pass::path/in/store` - resolved via `pass show`
//! - `env::VAR_NAME` - resolved from the environment
//! - `file::/path` - first line of the file
//! - plain text - used as-is

use std::path::{Path, PathBuf};
#[cfg(feature = "google")]
use std::time::Duration;

#[cfg(feature = "google")]
use calsync_providers::google::{ClientRegistration, GoogleConfig, RegistrationSource};
use serde::{Deserialize, Serialize};

/// Configuration for the calsync client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Debug mode.
    pub debug: bool,

    /// Google Calendar settings.
    #[cfg(feature = "google")]
    pub google: GoogleSettings,
}

impl ClientConfig {
    /// Loads configuration from the default path.
    ///
    /// A missing file yields the defaults.
    pub fn load() -> Result<Self, String> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, String> {
        let content =
            std::fs::read_to_string(path).map_err(|e| format!("failed to read config: {}", e))?;
        toml::from_str(&content).map_err(|e| format!("failed to parse config: {}", e))
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("calsync")
    }
}

/// Google Calendar settings.
///
/// The client registration comes either from inline `client_id` /
/// `client_secret` (which take precedence and support secret references) or
/// from `credentials_file`.
#[cfg(feature = "google")]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleSettings {
    /// Google Cloud Console credentials JSON.
    ///
    /// Defaults to `~/.config/calsync/credentials.json`.
    pub credentials_file: Option<PathBuf>,

    /// OAuth client ID (supports secret references).
    pub client_id: Option<String>,

    /// OAuth client secret (supports secret references).
    pub client_secret: Option<String>,

    /// Path to token storage.
    pub token_path: Option<PathBuf>,

    /// OAuth scopes to request.
    pub scopes: Option<Vec<String>>,

    /// Loopback port for the OAuth redirect; `0` lets the OS choose.
    pub loopback_port: Option<u16>,

    /// HTTP request timeout in seconds. Unset means no timeout.
    pub timeout_secs: Option<u64>,
}

#[cfg(feature = "google")]
impl GoogleSettings {
    /// Converts to provider configuration.
    ///
    /// Inline credentials are resolved here (expanding `pass::` / `env::`
    /// references); a credentials file is only read when a flow needs it.
    pub fn to_provider_config(&self) -> Result<GoogleConfig, String> {
        let mut config = GoogleConfig::new(self.registration_source()?);

        if let Some(ref path) = self.token_path {
            config = config.with_token_path(path);
        }

        if let Some(ref scopes) = self.scopes {
            config = config.with_scopes(scopes.clone());
        }

        if let Some(port) = self.loopback_port {
            config = config.with_loopback_port(port);
        }

        if let Some(secs) = self.timeout_secs {
            config = config.with_timeout(Duration::from_secs(secs));
        }

        config.validate()?;
        Ok(config)
    }

    /// Picks the registration source.
    ///
    /// Both `client_id` and `client_secret` must be set to use inline
    /// credentials. Each value is passed through `secret::resolve()`.
    pub(crate) fn registration_source(&self) -> Result<RegistrationSource, String> {
        match (self.client_id.as_deref(), self.client_secret.as_deref()) {
            (None, None) => Ok(RegistrationSource::File(
                self.credentials_file
                    .clone()
                    .unwrap_or_else(GoogleConfig::default_registration_path),
            )),
            (Some(raw_id), Some(raw_secret)) => {
                let client_id = crate::secret::resolve(raw_id)
                    .map_err(|e| format!("failed to resolve client_id: {}", e))?;
                let client_secret = crate::secret::resolve(raw_secret)
                    .map_err(|e| format!("failed to resolve client_secret: {}", e))?;
                Ok(RegistrationSource::Inline(ClientRegistration::new(
                    client_id,
                    client_secret,
                )))
            }
            (Some(_), None) => {
                Err("client_secret is missing from [google] section in config.toml".to_string())
            }
            (None, Some(_)) => {
                Err("client_id is missing from [google] section in config.toml".to_string())
            }
        }
    }
}
