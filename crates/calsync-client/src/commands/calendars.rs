//! Calendar listing command.

use calsync_core::CalendarEntry;
use calsync_providers::google::{GoogleCalendarClient, GoogleConfig, GoogleOAuthFlow};
use calsync_providers::{
    CredentialManager, FileCredentialStore, MemoryCredentialStore, PreloadedFlow, list_calendars,
};
use tracing::info;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::render::{render_json, render_table};

/// Print the user's calendars.
pub async fn run(
    config: &ClientConfig,
    json: bool,
    access_token: Option<String>,
) -> ClientResult<()> {
    let google_config = config
        .google
        .to_provider_config()
        .map_err(ClientError::Config)?;

    let calendars = fetch(&google_config, access_token).await?;

    let output = if json {
        render_json(&calendars)?
    } else {
        render_table(&calendars)
    };
    println!("{}", output);

    Ok(())
}

/// Acquires a credential and lists every calendar.
///
/// With an explicit access token the credential lives in memory only;
/// otherwise the token file is loaded, renewed and saved as needed.
pub async fn fetch(
    config: &GoogleConfig,
    access_token: Option<String>,
) -> ClientResult<Vec<CalendarEntry>> {
    let credential = match access_token {
        Some(token) => {
            CredentialManager::new(
                MemoryCredentialStore::new(),
                PreloadedFlow::from_access_token(token),
                config.scopes.clone(),
            )
            .acquire()
            .await?
        }
        None => {
            CredentialManager::new(
                FileCredentialStore::new(&config.token_path),
                GoogleOAuthFlow::new(config.clone())?,
                config.scopes.clone(),
            )
            .acquire()
            .await?
        }
    };

    let client = GoogleCalendarClient::new(config)?;
    let calendars = list_calendars(&client, &credential).await?;
    info!(count = calendars.len(), "listed calendars");

    Ok(calendars)
}
