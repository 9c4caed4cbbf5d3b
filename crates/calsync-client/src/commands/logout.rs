//! Sign-out command.

use std::path::Path;

use calsync_providers::{CredentialStore, FileCredentialStore};

use crate::config::ClientConfig;
use crate::error::ClientResult;

/// Remove the stored token.
pub fn run(config: &ClientConfig) -> ClientResult<()> {
    let path = super::auth::token_path(config);
    if remove_token(&path)? {
        println!("Removed stored token {}", path.display());
    } else {
        println!("No stored token at {}", path.display());
    }
    Ok(())
}

/// Deletes the token file; returns whether there was one.
fn remove_token(path: &Path) -> ClientResult<bool> {
    let existed = path.exists();
    FileCredentialStore::new(path).clear()?;
    Ok(existed)
}

#[cfg(test)]
mod tests {
    use calsync_providers::Credential;

    use super::*;

    #[test]
    fn removes_existing_token() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        FileCredentialStore::new(&path)
            .store(&Credential::new("token", None, None, vec![]))
            .unwrap();

        assert!(remove_token(&path).unwrap());
        assert!(!path.exists());
    }

    #[test]
    fn missing_token_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!remove_token(&dir.path().join("token.json")).unwrap());
    }
}
