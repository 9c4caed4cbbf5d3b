//! calsync CLI entry point.

use std::path::Path;
use std::process::ExitCode;

use calsync_core::{TracingConfig, init_tracing};
use clap::Parser;

use calsync_client::cli::{Cli, Command, ConfigAction};
use calsync_client::commands;
#[cfg(feature = "google")]
use calsync_client::commands::auth::RegistrationArgs;
use calsync_client::config::ClientConfig;
use calsync_client::error::{ClientError, ClientResult};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(ClientConfig::default_path);
    let config = load_config(cli.config.is_some(), &config_path);

    let debug = cli.debug || config.as_ref().is_ok_and(|c| c.debug);
    let tracing_config = if debug {
        TracingConfig::cli_debug()
    } else {
        TracingConfig::default()
    };
    if let Err(e) = init_tracing(tracing_config.with_format(cli.log_format.into())) {
        eprintln!("warning: {}", e);
    }

    let result = match config {
        Ok(config) => run(cli.command, &config, &config_path).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Loads the configuration; only an explicitly given file must exist.
fn load_config(explicit: bool, path: &Path) -> ClientResult<ClientConfig> {
    let config = if explicit {
        ClientConfig::load_from(path)
    } else {
        ClientConfig::load()
    };
    config.map_err(ClientError::Config)
}

async fn run(command: Command, config: &ClientConfig, config_path: &Path) -> ClientResult<()> {
    match command {
        #[cfg(feature = "google")]
        Command::Auth {
            force,
            client_id,
            client_secret,
            credentials_file,
        } => {
            let args = RegistrationArgs {
                client_id,
                client_secret,
                credentials_file,
            };
            commands::auth::google(args, force, config, config_path).await
        }
        #[cfg(feature = "google")]
        Command::Calendars { json, access_token } => {
            commands::calendars::run(config, json, access_token).await
        }
        #[cfg(feature = "google")]
        Command::Logout => commands::logout::run(config),
        Command::Config { action } => match action {
            ConfigAction::Dump => commands::config::dump(config, config_path),
            ConfigAction::Validate => commands::config::validate(config),
            ConfigAction::Path => commands::config::path(config_path),
        },
    }
}
