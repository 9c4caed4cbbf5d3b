//! Credentials and their persistence.
//!
//! A [`Credential`] is serialized in Google's "authorized user" JSON layout
//! (`token`, `refresh_token`, `token_uri`, `client_id`, `client_secret`,
//! `scopes`, `expiry`), so token files written by other Google client
//! libraries can be picked up as-is.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, info};

use crate::error::{ProviderError, ProviderResult};

/// Seconds before the recorded expiry at which a credential already counts as
/// expired.
pub const EXPIRY_SKEW_SECS: i64 = 60;

/// An OAuth token bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    /// The bearer token for API requests.
    #[serde(rename = "token", default, deserialize_with = "null_as_empty")]
    pub access_token: String,

    /// The refresh token for obtaining new access tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// Token endpoint the refresh token is redeemed at.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_uri: Option<String>,

    /// OAuth client the tokens were issued to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,

    /// The OAuth scopes that were granted.
    #[serde(default)]
    pub scopes: Vec<String>,

    /// When the access token expires.
    #[serde(rename = "expiry", default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl Credential {
    /// Creates a credential from token endpoint response data.
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_in_secs: Option<i64>,
        scopes: Vec<String>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
            token_uri: None,
            client_id: None,
            client_secret: None,
            scopes,
            expires_at: expires_in_secs.map(|secs| Utc::now() + Duration::seconds(secs)),
        }
    }

    /// Records the OAuth client and token endpoint a refresh must go through.
    pub fn with_client(
        mut self,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        token_uri: impl Into<String>,
    ) -> Self {
        self.client_id = Some(client_id.into());
        self.client_secret = Some(client_secret.into());
        self.token_uri = Some(token_uri.into());
        self
    }

    /// Returns true if the access token is expired or about to expire.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Expiry check against an explicit clock.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => now + Duration::seconds(EXPIRY_SKEW_SECS) >= expires_at,
            // Tokens without a recorded expiry are taken at face value
            None => false,
        }
    }

    /// Returns true if the credential can be used for API calls as-is.
    pub fn is_valid(&self) -> bool {
        !self.access_token.is_empty() && !self.is_expired()
    }

    /// Returns true if a refresh exchange is possible.
    pub fn can_refresh(&self) -> bool {
        self.refresh_token.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// Applies the result of a refresh exchange.
    ///
    /// The refresh token and scopes are only replaced when the token endpoint
    /// hands out new ones.
    pub fn apply_refresh(
        &mut self,
        access_token: impl Into<String>,
        expires_in_secs: Option<i64>,
        refresh_token: Option<String>,
        scopes: Option<Vec<String>>,
    ) {
        self.access_token = access_token.into();
        self.expires_at = expires_in_secs.map(|secs| Utc::now() + Duration::seconds(secs));
        if let Some(token) = refresh_token {
            self.refresh_token = Some(token);
        }
        if let Some(scopes) = scopes {
            self.scopes = scopes;
        }
    }
}

/// Where credentials are persisted between runs.
pub trait CredentialStore {
    /// Loads the persisted credential.
    ///
    /// Returns `Ok(None)` if nothing has been stored yet.
    fn load(&self) -> ProviderResult<Option<Credential>>;

    /// Persists a credential, replacing whatever was stored before.
    fn store(&self, credential: &Credential) -> ProviderResult<()>;

    /// Removes the persisted credential. Clearing an empty store is not an error.
    fn clear(&self) -> ProviderResult<()>;
}

impl<S: CredentialStore + ?Sized> CredentialStore for &S {
    fn load(&self) -> ProviderResult<Option<Credential>> {
        (**self).load()
    }

    fn store(&self, credential: &Credential) -> ProviderResult<()> {
        (**self).store(credential)
    }

    fn clear(&self) -> ProviderResult<()> {
        (**self).clear()
    }
}

/// Token file on local disk.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    /// Creates a store backed by the given token file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the token file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> ProviderResult<Option<Credential>> {
        if !self.path.exists() {
            debug!("no token file at {:?}", self.path);
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path).map_err(|e| {
            ProviderError::storage(format!("failed to read token file {:?}", self.path))
                .with_source(e)
        })?;

        let credential: Credential = serde_json::from_str(&content).map_err(|e| {
            ProviderError::authentication(format!(
                "token file {:?} is corrupt; remove it to sign in again",
                self.path
            ))
            .with_source(e)
        })?;

        debug!("loaded credential from {:?}", self.path);
        Ok(Some(credential))
    }

    fn store(&self, credential: &Credential) -> ProviderResult<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| {
                ProviderError::storage(format!("failed to create token directory {:?}", parent))
                    .with_source(e)
            })?;
        }

        let content = serde_json::to_string_pretty(credential).map_err(|e| {
            ProviderError::storage("failed to serialize credential").with_source(e)
        })?;

        // Write to temp file first, then rename for atomicity
        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, &content).map_err(|e| {
            ProviderError::storage(format!("failed to write token file {:?}", temp_path))
                .with_source(e)
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&temp_path, fs::Permissions::from_mode(0o600)).map_err(|e| {
                ProviderError::storage("failed to restrict token file permissions").with_source(e)
            })?;
        }

        fs::rename(&temp_path, &self.path).map_err(|e| {
            ProviderError::storage(format!("failed to replace token file {:?}", self.path))
                .with_source(e)
        })?;

        debug!("saved credential to {:?}", self.path);
        Ok(())
    }

    fn clear(&self) -> ProviderResult<()> {
        if self.path.exists() {
            fs::remove_file(&self.path).map_err(|e| {
                ProviderError::storage(format!("failed to remove token file {:?}", self.path))
                    .with_source(e)
            })?;
            info!("removed token file {:?}", self.path);
        }
        Ok(())
    }
}

/// In-process store that never touches the disk.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    credential: Mutex<Option<Credential>>,
}

impl MemoryCredentialStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that already holds a credential.
    pub fn with_credential(credential: Credential) -> Self {
        Self {
            credential: Mutex::new(Some(credential)),
        }
    }

    /// Returns a clone of the held credential, if any.
    pub fn get(&self) -> Option<Credential> {
        self.credential
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> ProviderResult<Option<Credential>> {
        Ok(self.get())
    }

    fn store(&self, credential: &Credential) -> ProviderResult<()> {
        *self
            .credential
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(credential.clone());
        Ok(())
    }

    fn clear(&self) -> ProviderResult<()> {
        *self
            .credential
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}
