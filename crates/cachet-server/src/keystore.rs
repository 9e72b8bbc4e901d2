//! On-disk PEM key persistence for the server identity.
//!
//! The key pair lives as `private-key.pem` / `public-key.pem` in the
//! configured directory. A missing pair is generated once at startup and
//! persisted; the private key file is created owner-read-only on Unix.

use std::{fs, path::Path};

use cachet_crypto::{DEFAULT_KEY_BITS, KeyPair, generate_key_pair, private_key_from_pem};
use rand::rngs::OsRng;

use crate::error::ServerError;

/// File name of the private key inside the key directory.
pub const PRIVATE_KEY_FILE: &str = "private-key.pem";

/// File name of the public key inside the key directory.
pub const PUBLIC_KEY_FILE: &str = "public-key.pem";

/// Load the server key pair from `dir`, generating and persisting a fresh
/// 2048-bit pair if none exists.
///
/// # Errors
///
/// - `ServerError::Keystore` on unreadable, unwritable, or unparseable key
///   material
pub fn load_or_generate(dir: &Path) -> Result<KeyPair, ServerError> {
    let private_path = dir.join(PRIVATE_KEY_FILE);

    if private_path.exists() {
        let pem = fs::read_to_string(&private_path).map_err(|e| {
            ServerError::Keystore(format!("cannot read '{}': {e}", private_path.display()))
        })?;
        let private = private_key_from_pem(&pem)
            .map_err(|e| ServerError::Keystore(format!("bad private key: {e}")))?;

        tracing::info!(path = %private_path.display(), "loaded server key pair");
        return Ok(KeyPair::from_private(private));
    }

    tracing::info!(dir = %dir.display(), "no key pair found, generating");

    fs::create_dir_all(dir).map_err(|e| {
        ServerError::Keystore(format!("cannot create '{}': {e}", dir.display()))
    })?;

    let pair = generate_key_pair(&mut OsRng, DEFAULT_KEY_BITS)
        .map_err(|e| ServerError::Keystore(format!("key generation failed: {e}")))?;

    let private_pem = pair.private_key_pem()?;
    fs::write(&private_path, private_pem.as_bytes()).map_err(|e| {
        ServerError::Keystore(format!("cannot write '{}': {e}", private_path.display()))
    })?;
    restrict_permissions(&private_path)?;

    let public_path = dir.join(PUBLIC_KEY_FILE);
    fs::write(&public_path, pair.public_key_pem()?).map_err(|e| {
        ServerError::Keystore(format!("cannot write '{}': {e}", public_path.display()))
    })?;

    Ok(pair)
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<(), ServerError> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(|e| {
        ServerError::Keystore(format!("cannot restrict '{}': {e}", path.display()))
    })
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<(), ServerError> {
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn generates_then_reloads_same_pair() {
        let dir = tempfile::tempdir().unwrap();

        let generated = load_or_generate(dir.path()).unwrap();
        assert!(dir.path().join(PRIVATE_KEY_FILE).exists());
        assert!(dir.path().join(PUBLIC_KEY_FILE).exists());

        let reloaded = load_or_generate(dir.path()).unwrap();
        assert_eq!(reloaded.private, generated.private);
    }

    #[test]
    fn garbage_private_key_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(PRIVATE_KEY_FILE), "not a pem").unwrap();

        let result = load_or_generate(dir.path());
        assert!(matches!(result, Err(ServerError::Keystore(_))));
    }

    #[cfg(unix)]
    #[test]
    fn private_key_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        load_or_generate(dir.path()).unwrap();

        let mode = fs::metadata(dir.path().join(PRIVATE_KEY_FILE)).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
