//! Error types for credential and calendar-list operations.
//!
//! Every failure is surfaced to the caller as a [`ProviderError`]; nothing is
//! retried or downgraded along the way. The [`ErrorCode`] tells callers which
//! side of the system failed.

use std::fmt;
use thiserror::Error;

/// The category of a provider error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Credential acquisition failed: the interactive flow, the refresh
    /// exchange, the client registration, or a corrupt persisted token.
    AuthenticationFailed,
    /// A calendar-list request failed or returned a malformed payload.
    ApiError,
    /// The token file could not be read, written or removed.
    StorageError,
}

impl ErrorCode {
    /// Returns a stable machine-readable name for this error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthenticationFailed => "authentication_failed",
            Self::ApiError => "api_error",
            Self::StorageError => "storage_error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An error from credential management or calendar listing.
#[derive(Debug, Error)]
pub struct ProviderError {
    code: ErrorCode,
    message: String,
    /// The provider that generated this error (e.g., "google").
    provider: Option<String>,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ProviderError {
    /// Creates a new provider error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider: None,
            source: None,
        }
    }

    /// Creates an authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::AuthenticationFailed, message)
    }

    /// Creates an API error.
    pub fn api(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ApiError, message)
    }

    /// Creates a storage error.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::StorageError, message)
    }

    /// Sets the provider name for this error.
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Sets the source error for this error.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    /// Returns the error code.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the provider name, if set.
    pub fn provider(&self) -> Option<&str> {
        self.provider.as_deref()
    }

    pub fn is_authentication(&self) -> bool {
        self.code == ErrorCode::AuthenticationFailed
    }

    pub fn is_api(&self) -> bool {
        self.code == ErrorCode::ApiError
    }

    pub fn is_storage(&self) -> bool {
        self.code == ErrorCode::StorageError
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref provider) = self.provider {
            write!(f, "[{}] ", provider)?;
        }
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// A specialized Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_code_names() {
        assert_eq!(
            ErrorCode::AuthenticationFailed.as_str(),
            "authentication_failed"
        );
        assert_eq!(ErrorCode::ApiError.as_str(), "api_error");
        assert_eq!(ErrorCode::StorageError.to_string(), "storage_error");
    }

    #[test]
    fn constructors_set_code() {
        assert!(ProviderError::authentication("denied").is_authentication());
        assert!(ProviderError::api("bad page").is_api());
        assert!(ProviderError::storage("read-only").is_storage());
    }

    #[test]
    fn provider_error_display() {
        let err = ProviderError::api("missing items").with_provider("google");
        let display = format!("{}", err);
        assert_eq!(display, "[google] api_error: missing items");
        assert_eq!(err.provider(), Some("google"));
        assert_eq!(err.message(), "missing items");
    }

    #[test]
    fn provider_error_with_source() {
        use std::error::Error;
        let io_err = std::io::Error::other("disk full");
        let err = ProviderError::storage("failed to write token file").with_source(io_err);
        assert!(err.source().is_some());
        assert!(err.source().unwrap().to_string().contains("disk full"));
    }
}
