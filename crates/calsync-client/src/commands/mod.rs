//! Subcommand implementations.

#[cfg(feature = "google")]
pub mod auth;
#[cfg(feature = "google")]
pub mod calendars;
pub mod config;
#[cfg(feature = "google")]
pub mod logout;
