//! Command-line interface definition.

use std::path::PathBuf;

use calsync_core::TracingOutputFormat;
use clap::{Parser, Subcommand, ValueEnum};

/// calsync - Google Calendar credentials and calendar listing
#[derive(Debug, Parser)]
#[command(name = "calsync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "CALSYNC_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v', global = true)]
    pub debug: bool,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Compact, global = true)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Pretty,
    Compact,
    Json,
}

impl From<LogFormat> for TracingOutputFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
            LogFormat::Json => Self::Json,
        }
    }
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sign in to Google Calendar and store the token
    #[cfg(feature = "google")]
    Auth {
        /// Run the browser consent flow even if a usable token is stored
        #[arg(long, short)]
        force: bool,

        /// OAuth client ID (from Google Cloud Console)
        ///
        /// Saved to config.toml after a successful sign-in. To keep the ID out
        /// of the file, set `client_id = "env::VAR"` there instead.
        #[arg(long)]
        client_id: Option<String>,

        /// OAuth client secret (from Google Cloud Console)
        #[arg(long)]
        client_secret: Option<String>,

        /// Path to Google Cloud Console credentials JSON file
        ///
        /// This is the JSON file downloaded from the Google Cloud Console
        /// OAuth 2.0 credentials page. Alternative to providing client_id
        /// and client_secret separately.
        #[arg(long)]
        credentials_file: Option<PathBuf>,
    },

    /// List the calendars of the signed-in user
    #[cfg(feature = "google")]
    Calendars {
        /// Print the raw calendar entries as a JSON array
        #[arg(long)]
        json: bool,

        /// Use this access token instead of the stored credential
        ///
        /// Nothing is written to disk in this mode.
        #[arg(long, env = "CALSYNC_ACCESS_TOKEN", hide_env_values = true)]
        access_token: Option<String>,
    },

    /// Remove the stored token
    #[cfg(feature = "google")]
    Logout,

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump current configuration
    Dump,

    /// Validate configuration
    Validate,

    /// Show configuration file path
    Path,
}
