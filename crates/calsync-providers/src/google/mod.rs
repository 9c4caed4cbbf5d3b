//! Google Calendar implementation.
//!
//! - [`GoogleOAuthFlow`] runs the OAuth 2.0 PKCE consent flow with a loopback
//!   redirect, and redeems refresh tokens
//! - [`GoogleCalendarClient`] fetches pages of the user's calendar list
//! - [`GoogleConfig`] holds the client registration, token location, scopes
//!   and endpoints shared by both
//!
//! # Authentication Flow
//!
//! 1. User provides their own OAuth client ID/secret (required by Google)
//! 2. A local HTTP server is started on a loopback port
//! 3. The browser is opened on Google's authorization page with a PKCE challenge
//! 4. User grants permissions in the browser
//! 5. Google redirects to the loopback server with the authorization code
//! 6. The code is exchanged for access and refresh tokens
//!
//! # Example
//!
//! ```ignore
//! use calsync_providers::google::{GoogleCalendarClient, GoogleConfig, GoogleOAuthFlow, RegistrationSource};
//! use calsync_providers::{CredentialManager, FileCredentialStore, list_calendars};
//!
//! let config = GoogleConfig::new(RegistrationSource::File(GoogleConfig::default_registration_path()));
//! let store = FileCredentialStore::new(&config.token_path);
//! let manager = CredentialManager::new(store, GoogleOAuthFlow::new(config.clone())?, config.scopes.clone());
//!
//! let credential = manager.acquire().await?;
//! let calendars = list_calendars(GoogleCalendarClient::new(&config)?, &credential).await?;
//! ```

mod client;
mod config;
mod oauth;

pub use client::GoogleCalendarClient;
pub use config::{
    ClientRegistration, GOOGLE_API_BASE, GOOGLE_AUTH_URL, GOOGLE_TOKEN_URL, GoogleConfig,
    RegistrationSource,
};
pub use oauth::{GoogleOAuthFlow, PkceFlow, UrlOpener};

/// Provider name attached to errors raised by this module.
pub(crate) const PROVIDER_NAME: &str = "google";
