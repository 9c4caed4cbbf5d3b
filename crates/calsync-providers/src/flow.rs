//! The authorization capability behind the credential manager.
//!
//! An [`AuthorizationFlow`] knows how to obtain a brand-new grant and how to
//! renew an existing one. The Google implementation drives a browser and a
//! loopback listener; [`PreloadedFlow`] hands out a credential it was given,
//! which is what tests and token-injection setups use.

use std::future::Future;
use std::pin::Pin;

use crate::credential::Credential;
use crate::error::{ProviderError, ProviderResult};

/// A boxed future, used to keep the traits object-safe.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// How a credential handed out by the manager was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grant {
    /// Loaded from the store and still valid.
    Preloaded,
    /// Renewed with a refresh token.
    Refreshed,
    /// Obtained through the interactive consent flow.
    Interactive,
}

impl Grant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Preloaded => "preloaded",
            Self::Refreshed => "refreshed",
            Self::Interactive => "interactive",
        }
    }
}

impl std::fmt::Display for Grant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Obtains and renews credentials.
pub trait AuthorizationFlow {
    /// Runs the interactive flow and returns the granted credential.
    ///
    /// # Errors
    ///
    /// Returns an authentication error if the user declines, the client
    /// registration is missing, or the token exchange fails.
    fn authorize<'a>(&'a self, scopes: &'a [String]) -> BoxFuture<'a, ProviderResult<Credential>>;

    /// Exchanges the refresh token of `credential` for a new access token.
    ///
    /// Returns the updated credential; the input is left untouched.
    fn refresh<'a>(&'a self, credential: &'a Credential)
    -> BoxFuture<'a, ProviderResult<Credential>>;
}

impl<F: AuthorizationFlow + ?Sized> AuthorizationFlow for &F {
    fn authorize<'a>(&'a self, scopes: &'a [String]) -> BoxFuture<'a, ProviderResult<Credential>> {
        (**self).authorize(scopes)
    }

    fn refresh<'a>(
        &'a self,
        credential: &'a Credential,
    ) -> BoxFuture<'a, ProviderResult<Credential>> {
        (**self).refresh(credential)
    }
}

/// A flow that hands out a fixed credential and never touches the network.
///
/// Refreshing is not possible: the token's owner is expected to provide a new
/// one instead.
#[derive(Debug, Clone)]
pub struct PreloadedFlow {
    credential: Credential,
}

impl PreloadedFlow {
    pub fn new(credential: Credential) -> Self {
        Self { credential }
    }

    /// Wraps a bare access token with no expiry and no refresh token.
    pub fn from_access_token(access_token: impl Into<String>) -> Self {
        Self::new(Credential::new(access_token, None, None, Vec::new()))
    }
}

impl AuthorizationFlow for PreloadedFlow {
    fn authorize<'a>(&'a self, _scopes: &'a [String]) -> BoxFuture<'a, ProviderResult<Credential>> {
        Box::pin(async move {
            if self.credential.access_token.is_empty() {
                return Err(ProviderError::authentication("preloaded access token is empty"));
            }
            Ok(self.credential.clone())
        })
    }

    fn refresh<'a>(
        &'a self,
        _credential: &'a Credential,
    ) -> BoxFuture<'a, ProviderResult<Credential>> {
        Box::pin(async move {
            Err(ProviderError::authentication(
                "preloaded credentials cannot be refreshed; supply a new access token",
            ))
        })
    }
}
