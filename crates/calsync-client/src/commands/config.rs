//! Configuration commands.

use std::path::Path;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Dump the current configuration to stdout.
pub fn dump(config: &ClientConfig, config_path: &Path) -> ClientResult<()> {
    let toml_str = toml::to_string_pretty(config)
        .map_err(|e| ClientError::Config(format!("failed to serialize config: {}", e)))?;
    println!("# config.toml ({})", config_path.display());
    println!("{}", toml_str);

    Ok(())
}

/// Validate the configuration.
///
/// Inline secret references are resolved and, when a credentials file is
/// configured instead, it is read and checked too.
pub fn validate(config: &ClientConfig) -> ClientResult<()> {
    #[cfg(feature = "google")]
    {
        let google = config
            .google
            .to_provider_config()
            .map_err(|e| ClientError::Config(format!("invalid [google] settings: {}", e)))?;

        google.registration.resolve()?;
        println!("Google client registration is valid.");
    }
    #[cfg(not(feature = "google"))]
    let _ = config;

    println!("Configuration is valid.");
    Ok(())
}

/// Show the configuration file path.
pub fn path(config_path: &Path) -> ClientResult<()> {
    println!("config: {}", config_path.display());
    Ok(())
}
