//! Credential acquisition.
//!
//! The [`CredentialManager`] ties a [`CredentialStore`] to an
//! [`AuthorizationFlow`]:
//!
//! 1. Load the persisted credential, if any
//! 2. Hand it out unchanged if it is still valid
//! 3. Otherwise refresh it when a refresh token is available, or run the
//!    interactive flow
//! 4. Persist the new credential before returning it
//!
//! Failures are never retried; they propagate to the caller as-is.

use tracing::{debug, info};

use crate::credential::{Credential, CredentialStore};
use crate::error::ProviderResult;
use crate::flow::{AuthorizationFlow, Grant};

/// Loads, renews and persists credentials.
#[derive(Debug)]
pub struct CredentialManager<S, F> {
    store: S,
    flow: F,
    scopes: Vec<String>,
}

impl<S, F> CredentialManager<S, F>
where
    S: CredentialStore,
    F: AuthorizationFlow,
{
    /// Creates a manager requesting `scopes` whenever the interactive flow runs.
    pub fn new(store: S, flow: F, scopes: Vec<String>) -> Self {
        Self {
            store,
            flow,
            scopes,
        }
    }

    /// Returns a usable credential.
    ///
    /// # Errors
    ///
    /// Authentication errors from the flow or a corrupt token file, storage
    /// errors from reading or writing the token file.
    pub async fn acquire(&self) -> ProviderResult<Credential> {
        self.acquire_with_grant()
            .await
            .map(|(credential, _)| credential)
    }

    /// Like [`acquire`](Self::acquire), also reporting how the credential was
    /// obtained.
    pub async fn acquire_with_grant(&self) -> ProviderResult<(Credential, Grant)> {
        let stored = self.store.load()?;

        let (credential, grant) = match stored {
            Some(credential) if credential.is_valid() => {
                debug!("stored credential is valid");
                return Ok((credential, Grant::Preloaded));
            }
            Some(credential) if credential.can_refresh() => {
                debug!("stored credential is no longer valid, refreshing");
                let refreshed = self.flow.refresh(&credential).await?;
                (refreshed, Grant::Refreshed)
            }
            Some(_) => {
                debug!("stored credential is invalid and has no refresh token");
                (self.flow.authorize(&self.scopes).await?, Grant::Interactive)
            }
            None => {
                debug!("no stored credential");
                (self.flow.authorize(&self.scopes).await?, Grant::Interactive)
            }
        };

        self.store.store(&credential)?;
        info!(grant = %grant, "credential acquired");
        Ok((credential, grant))
    }

    /// Runs the interactive flow regardless of what is stored, and persists
    /// the result.
    pub async fn reauthorize(&self) -> ProviderResult<Credential> {
        let credential = self.flow.authorize(&self.scopes).await?;
        self.store.store(&credential)?;
        info!(grant = %Grant::Interactive, "credential acquired");
        Ok(credential)
    }

    /// Removes the persisted credential.
    pub fn forget(&self) -> ProviderResult<()> {
        self.store.clear()
    }

    /// Returns the scopes requested by the interactive flow.
    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}
