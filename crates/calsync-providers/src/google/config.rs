//! Google Calendar provider configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{ProviderError, ProviderResult};

/// Google's OAuth authorization endpoint.
pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";

/// Google's OAuth token endpoint.
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Base URL for Google Calendar API v3.
pub const GOOGLE_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

/// The application's OAuth client registration.
///
/// Users must provide their own OAuth client ID and secret, as Google
/// requires registered applications for API access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientRegistration {
    /// The OAuth 2.0 client ID from Google Cloud Console.
    pub client_id: String,
    /// The OAuth 2.0 client secret from Google Cloud Console.
    pub client_secret: String,
}

/// Structure of Google's OAuth credentials JSON file.
///
/// Supports multiple formats:
/// 1. Google Cloud Console format with "installed" or "web" section
/// 2. Flat format with client_id and client_secret at root level (e.g., from gcloud)
#[derive(Debug, Deserialize)]
struct RegistrationFile {
    installed: Option<NestedRegistration>,
    web: Option<NestedRegistration>,
    client_id: Option<String>,
    client_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NestedRegistration {
    client_id: String,
    client_secret: String,
}

impl ClientRegistration {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Loads the registration from a Google Cloud Console JSON file.
    ///
    /// # Errors
    ///
    /// Returns an authentication error if the file is missing, unreadable, or
    /// does not hold a client registration.
    pub fn from_file(path: impl AsRef<Path>) -> ProviderResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ProviderError::authentication(format!(
                "failed to read client registration {}: {}",
                path.display(),
                e
            ))
            .with_source(e)
        })?;
        Self::from_json(&content)
    }

    /// Parses the registration from a Google credentials JSON string.
    ///
    /// Supports multiple formats:
    /// 1. Google Cloud Console format: `{"installed": {"client_id": "...", "client_secret": "..."}}`
    /// 2. Flat format: `{"client_id": "...", "client_secret": "..."}`
    pub fn from_json(json: &str) -> ProviderResult<Self> {
        let file: RegistrationFile = serde_json::from_str(json).map_err(|e| {
            ProviderError::authentication(format!("failed to parse client registration: {}", e))
        })?;

        if let Some(nested) = file.installed.or(file.web) {
            return Ok(Self::new(nested.client_id, nested.client_secret));
        }

        if let (Some(client_id), Some(client_secret)) = (file.client_id, file.client_secret) {
            return Ok(Self::new(client_id, client_secret));
        }

        Err(ProviderError::authentication(
            "client registration must contain an 'installed'/'web' section or 'client_id'/'client_secret' at root level",
        ))
    }

    /// Validates that the registration appears to be correctly formatted.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.client_id.is_empty() {
            return Err("client_id is required");
        }
        if self.client_secret.is_empty() {
            return Err("client_secret is required");
        }
        Ok(())
    }
}

/// Where the client registration comes from.
///
/// File sources are read lazily, only when a flow actually needs them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationSource {
    File(PathBuf),
    Inline(ClientRegistration),
}

impl RegistrationSource {
    /// Produces a validated registration.
    ///
    /// # Errors
    ///
    /// Returns an authentication error when the registration cannot be read
    /// or is incomplete.
    pub fn resolve(&self) -> ProviderResult<ClientRegistration> {
        let registration = match self {
            Self::File(path) => ClientRegistration::from_file(path)?,
            Self::Inline(registration) => registration.clone(),
        };
        registration
            .validate()
            .map_err(|e| ProviderError::authentication(format!("invalid client registration: {}", e)))?;
        Ok(registration)
    }
}

/// Configuration for the Google Calendar provider.
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    /// The OAuth client registration.
    pub registration: RegistrationSource,

    /// Path to store OAuth tokens.
    ///
    /// Defaults to `<data_dir>/calsync/token.json`.
    pub token_path: PathBuf,

    /// Request timeout. `None` waits indefinitely.
    pub timeout: Option<Duration>,

    /// User agent string for API requests.
    pub user_agent: String,

    /// Port range for the loopback OAuth server.
    ///
    /// Ports are tried in order; `(0, 0)` lets the OS pick one.
    pub loopback_port_range: (u16, u16),

    /// OAuth scopes to request.
    ///
    /// Defaults to `["https://www.googleapis.com/auth/calendar"]`.
    pub scopes: Vec<String>,

    pub auth_url: String,
    pub token_url: String,
    pub api_base_url: String,
}

impl GoogleConfig {
    /// Default OAuth scope.
    pub const DEFAULT_SCOPE: &'static str = "https://www.googleapis.com/auth/calendar";

    /// Creates a new Google configuration with the given registration source.
    pub fn new(registration: RegistrationSource) -> Self {
        Self {
            registration,
            token_path: Self::default_token_path(),
            timeout: None,
            user_agent: format!("calsync/{}", env!("CARGO_PKG_VERSION")),
            loopback_port_range: (0, 0),
            scopes: vec![Self::DEFAULT_SCOPE.to_string()],
            auth_url: GOOGLE_AUTH_URL.to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
            api_base_url: GOOGLE_API_BASE.to_string(),
        }
    }

    /// Returns the default token storage path.
    pub fn default_token_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("calsync")
            .join("token.json")
    }

    /// Returns the default client registration path.
    pub fn default_registration_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("calsync")
            .join("credentials.json")
    }

    /// Sets the token storage path.
    pub fn with_token_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_path = path.into();
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the loopback port range for OAuth.
    pub fn with_loopback_port_range(mut self, start: u16, end: u16) -> Self {
        self.loopback_port_range = (start, end);
        self
    }

    /// Sets a single loopback port.
    pub fn with_loopback_port(self, port: u16) -> Self {
        self.with_loopback_port_range(port, port)
    }

    /// Sets the OAuth scopes.
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Points the OAuth endpoints somewhere else.
    pub fn with_oauth_endpoints(
        mut self,
        auth_url: impl Into<String>,
        token_url: impl Into<String>,
    ) -> Self {
        self.auth_url = auth_url.into();
        self.token_url = token_url.into();
        self
    }

    /// Points the Calendar API somewhere else.
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    /// Validates the configuration.
    ///
    /// The client registration is not read here.
    pub fn validate(&self) -> Result<(), String> {
        if self.scopes.is_empty() {
            return Err("at least one OAuth scope is required".to_string());
        }

        if self.loopback_port_range.0 > self.loopback_port_range.1 {
            return Err("invalid loopback port range".to_string());
        }

        for (name, value) in [
            ("auth_url", &self.auth_url),
            ("token_url", &self.token_url),
            ("api_base_url", &self.api_base_url),
        ] {
            url::Url::parse(value).map_err(|e| format!("invalid {}: {}", name, e))?;
        }

        Ok(())
    }

    /// Builds the HTTP client shared by the OAuth flow and the API client.
    pub(crate) fn http_client(&self) -> reqwest::Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder().user_agent(&self.user_agent);
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        builder.build()
    }
}
