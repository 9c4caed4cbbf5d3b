//! Calendar list types.
//!
//! This module provides the provider-agnostic types produced by listing
//! calendars:
//! - [`CalendarEntry`]: One calendar as returned by the provider, kept opaque
//! - [`PageToken`]: A continuation cursor between list pages

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A calendar from the provider's calendar list.
///
/// The entry is the provider's JSON object, passed through as-is. Fields are
/// not validated or renamed; the accessors below only read well-known keys
/// when they happen to be present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CalendarEntry(Map<String, Value>);

impl CalendarEntry {
    /// Returns the raw value for a field.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Returns a field as a string, if it is one.
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(Value::as_str)
    }

    /// The calendar identifier.
    pub fn id(&self) -> Option<&str> {
        self.get_str("id")
    }

    /// The display name.
    pub fn summary(&self) -> Option<&str> {
        self.get_str("summary")
    }

    /// The caller's access role (`owner`, `writer`, `reader`, ...).
    pub fn access_role(&self) -> Option<&str> {
        self.get_str("accessRole")
    }

    /// Whether the provider marks this as the user's primary calendar.
    pub fn is_primary(&self) -> bool {
        self.get("primary")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

/// An opaque continuation cursor returned by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageToken(String);

impl PageToken {
    /// Creates a page token.
    ///
    /// Returns `None` for an empty cursor, which providers use interchangeably
    /// with an absent one.
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        if token.is_empty() {
            None
        } else {
            Some(Self(token))
        }
    }

    /// Returns the cursor as sent on the wire.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PageToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
