//! Credential management and calendar listing.
//!
//! This crate holds the two halves of talking to a calendar provider:
//!
//! - [`CredentialManager`] - loads a persisted [`Credential`], refreshes it or
//!   runs the interactive flow when it is no longer valid, and persists the
//!   result through a [`CredentialStore`]
//! - [`CalendarPager`] / [`list_calendars`] - walk the paginated calendar list
//!   exposed by a [`CalendarListSource`]
//! - [`ProviderError`] - the error type shared by both
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐   ┌───────────────────┐
//! │ CredentialStore  │   │ AuthorizationFlow │
//! │ (file / memory)  │   │ (Google / preload)│
//! └────────┬─────────┘   └─────────┬─────────┘
//!          └───────────┬───────────┘
//!                      ▼
//!            ┌───────────────────┐
//!            │ CredentialManager │──► Credential
//!            └───────────────────┘        │
//!                                         ▼
//!            ┌───────────────────┐   ┌──────────────┐
//!            │ CalendarListSource│◄──│ CalendarPager│──► Vec<CalendarEntry>
//!            └───────────────────┘   └──────────────┘
//! ```
//!
//! The Google implementations live in [`google`], behind the `google` feature.

pub mod credential;
pub mod error;
pub mod flow;
#[cfg(feature = "google")]
pub mod google;
pub mod manager;
pub mod pager;

// Re-export main types at crate root
pub use credential::{
    Credential, CredentialStore, EXPIRY_SKEW_SECS, FileCredentialStore, MemoryCredentialStore,
};
pub use error::{ErrorCode, ProviderError, ProviderResult};
pub use flow::{AuthorizationFlow, BoxFuture, Grant, PreloadedFlow};
pub use manager::CredentialManager;
pub use pager::{CalendarListPage, CalendarListSource, CalendarPager, list_calendars};
