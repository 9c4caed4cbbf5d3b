//! Authentication commands.

use std::path::{Path, PathBuf};

use calsync_providers::google::{ClientRegistration, GoogleConfig, GoogleOAuthFlow, RegistrationSource};
use calsync_providers::{Credential, CredentialManager, CredentialStore, FileCredentialStore, Grant};
use tracing::{info, warn};

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Client registration given on the command line.
#[derive(Debug, Default)]
pub struct RegistrationArgs {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub credentials_file: Option<PathBuf>,
}

/// Acquire a Google credential and store it.
///
/// With `force`, the browser consent flow runs even if a usable token is
/// stored. A registration given on the command line overrides the one in
/// `config.toml` and is saved there once authentication succeeds.
pub async fn google(
    args: RegistrationArgs,
    force: bool,
    config: &ClientConfig,
    config_path: &Path,
) -> ClientResult<()> {
    let cli_registration = registration_from_args(args)?;

    let mut google_config = config
        .google
        .to_provider_config()
        .map_err(ClientError::Config)?;
    if let Some(ref source) = cli_registration {
        google_config.registration = source.clone();
    }

    let store = FileCredentialStore::new(&google_config.token_path);
    let needs_browser = force || needs_consent(store.load()?.as_ref());
    let flow = GoogleOAuthFlow::new(google_config.clone())?;
    let manager = CredentialManager::new(store, flow, google_config.scopes.clone());

    if needs_browser {
        println!("Starting Google Calendar authentication...");
        println!();
        println!("A browser window will open for you to authorize access.");
        println!("If the browser doesn't open, check the terminal for a URL to copy.");
        println!();
    }

    let grant = if force {
        manager.reauthorize().await?;
        Grant::Interactive
    } else {
        manager.acquire_with_grant().await?.1
    };

    if grant == Grant::Interactive
        && let Some(RegistrationSource::Inline(ref registration)) = cli_registration
    {
        save_registration_to_config(config_path, registration);
    }

    let token_path = google_config.token_path.display();
    match grant {
        Grant::Preloaded => {
            println!("Already authenticated with Google Calendar.");
            println!("Use --force to re-authenticate.");
        }
        Grant::Refreshed => {
            println!("Access token refreshed; saved to {}", token_path);
        }
        Grant::Interactive => {
            info!("Google authentication successful");
            println!("Authentication successful!");
            println!("Your Google Calendar token has been saved to {}", token_path);
        }
    }

    Ok(())
}

/// Returns true when acquiring a credential will need the browser.
fn needs_consent(stored: Option<&Credential>) -> bool {
    stored.is_none_or(|cred| !cred.is_valid() && !cred.can_refresh())
}

/// Builds a registration from command-line flags.
///
/// Priority (highest to lowest):
/// 1. `--client-id` + `--client-secret`
/// 2. `--credentials-file` (Google Cloud Console JSON)
///
/// Returns `None` when neither is given, leaving `config.toml` in charge.
fn registration_from_args(args: RegistrationArgs) -> ClientResult<Option<RegistrationSource>> {
    match (args.client_id, args.client_secret) {
        (Some(id), Some(secret)) => {
            return Ok(Some(RegistrationSource::Inline(ClientRegistration::new(
                id, secret,
            ))));
        }
        (None, None) => {}
        _ => {
            return Err(ClientError::Config(
                "both --client-id and --client-secret are required when providing credentials directly"
                    .to_string(),
            ));
        }
    }

    if let Some(path) = args.credentials_file {
        // Read now so a bad path is reported before the browser opens
        let registration = ClientRegistration::from_file(&path)?;
        return Ok(Some(RegistrationSource::Inline(registration)));
    }

    Ok(None)
}

/// Saves the client registration to `config.toml` under `[google]`.
///
/// Existing content and formatting are preserved. Failures are logged and
/// otherwise ignored: the token is already stored at this point.
fn save_registration_to_config(config_path: &Path, registration: &ClientRegistration) {
    let content = if config_path.exists() {
        match std::fs::read_to_string(config_path) {
            Ok(content) => content,
            Err(e) => {
                warn!("could not read {}: {}", config_path.display(), e);
                return;
            }
        }
    } else {
        String::new()
    };

    let updated = match with_registration(&content, registration) {
        Ok(updated) => updated,
        Err(e) => {
            warn!("could not parse {} for writing: {}", config_path.display(), e);
            return;
        }
    };

    if let Some(parent) = config_path.parent()
        && let Err(e) = std::fs::create_dir_all(parent)
    {
        warn!(
            "could not create config directory {}: {}",
            parent.display(),
            e
        );
        return;
    }

    match std::fs::write(config_path, updated) {
        Ok(()) => {
            info!("client registration saved to {}", config_path.display());
            println!("Client registration saved to {}", config_path.display());
        }
        Err(e) => warn!(
            "could not save client registration to {}: {}",
            config_path.display(),
            e
        ),
    }
}

/// Returns `content` with `[google] client_id / client_secret` set.
fn with_registration(
    content: &str,
    registration: &ClientRegistration,
) -> Result<String, toml_edit::TomlError> {
    let mut doc = content.parse::<toml_edit::DocumentMut>()?;

    if !doc.contains_key("google") {
        doc["google"] = toml_edit::Item::Table(toml_edit::Table::new());
    }

    if let Some(google) = doc["google"].as_table_mut() {
        google["client_id"] = toml_edit::value(registration.client_id.as_str());
        google["client_secret"] = toml_edit::value(registration.client_secret.as_str());
    }

    Ok(doc.to_string())
}

/// Default location of the token file for `config`.
pub fn token_path(config: &ClientConfig) -> PathBuf {
    config
        .google
        .token_path
        .clone()
        .unwrap_or_else(GoogleConfig::default_token_path)
}
