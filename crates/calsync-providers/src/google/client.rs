//! Google Calendar API client.
//!
//! Fetches single pages of `users/me/calendarList`; the pager in
//! [`crate::pager`] strings them together.

use calsync_core::{CalendarEntry, PageToken};
use serde::Deserialize;
use tracing::debug;

use crate::credential::Credential;
use crate::error::{ProviderError, ProviderResult};
use crate::flow::BoxFuture;
use crate::pager::{CalendarListPage, CalendarListSource};

use super::PROVIDER_NAME;
use super::config::GoogleConfig;

/// Google Calendar API client.
#[derive(Debug, Clone)]
pub struct GoogleCalendarClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl GoogleCalendarClient {
    /// Creates a client for the API base URL in `config`.
    pub fn new(config: &GoogleConfig) -> ProviderResult<Self> {
        let http_client = config.http_client().map_err(|e| {
            ProviderError::api(format!("failed to create HTTP client: {}", e)).with_source(e)
        })?;

        Ok(Self {
            http_client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Fetches one page of the calendar list.
    async fn list_calendars_page(
        &self,
        credential: &Credential,
        page_token: Option<&PageToken>,
    ) -> ProviderResult<CalendarListPage> {
        let url = format!("{}/users/me/calendarList", self.base_url);

        let mut request = self
            .http_client
            .get(&url)
            .bearer_auth(&credential.access_token);
        if let Some(token) = page_token {
            request = request.query(&[("pageToken", token.as_str())]);
        }

        debug!(has_cursor = page_token.is_some(), "requesting calendar list page");

        let response = request.send().await.map_err(|e| {
            let message = if e.is_timeout() {
                "request timeout".to_string()
            } else if e.is_connect() {
                format!("connection failed: {}", e)
            } else {
                format!("request failed: {}", e)
            };
            ProviderError::api(message)
                .with_provider(PROVIDER_NAME)
                .with_source(e)
        })?;

        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ProviderError::api("access token expired or invalid (401)")
                .with_provider(PROVIDER_NAME));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(
                ProviderError::api(format!("API error ({}): {}", status, body))
                    .with_provider(PROVIDER_NAME),
            );
        }

        let body = response.text().await.map_err(|e| {
            ProviderError::api(format!("failed to read response: {}", e))
                .with_provider(PROVIDER_NAME)
                .with_source(e)
        })?;

        let list: CalendarListResponse = serde_json::from_str(&body).map_err(|e| {
            ProviderError::api(format!("malformed calendar list response: {}", e))
                .with_provider(PROVIDER_NAME)
                .with_source(e)
        })?;

        Ok(CalendarListPage {
            items: list.items,
            next_page_token: list.next_page_token.and_then(PageToken::new),
        })
    }
}

impl CalendarListSource for GoogleCalendarClient {
    fn fetch_page<'a>(
        &'a self,
        credential: &'a Credential,
        page_token: Option<&'a PageToken>,
    ) -> BoxFuture<'a, ProviderResult<CalendarListPage>> {
        Box::pin(self.list_calendars_page(credential, page_token))
    }
}

/// Calendar list response from the API.
///
/// `items` has no default: a page without it is malformed.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CalendarListResponse {
    items: Vec<CalendarEntry>,
    #[serde(default)]
    next_page_token: Option<String>,
}
