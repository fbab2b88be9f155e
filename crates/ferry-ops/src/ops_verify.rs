//! Operation: check a detached signature against a file and a public key.

use std::path::Path;

use ferry_sign::key::{key_id_for, load_public_key_pem};
use ferry_util::errors::{FerryError, FerryResult};

/// Verify `signature` over `file` with the PEM public key at `public_key`.
///
/// Returns the key id of the verifying key.
pub fn verify_file(file: &Path, signature: &Path, public_key: &Path) -> FerryResult<String> {
    let content = std::fs::read(file).map_err(|e| FerryError::Generic {
        message: format!("Failed to read {}: {e}", file.display()),
    })?;
    let armored = std::fs::read_to_string(signature).map_err(|e| FerryError::Generic {
        message: format!("Failed to read signature {}: {e}", signature.display()),
    })?;
    let key = load_public_key_pem(public_key)?;

    ferry_sign::verify(&content, &armored, &key)?;
    let key_id = key_id_for(&key);
    tracing::debug!("{} verified with key {key_id}", file.display());
    Ok(key_id)
}
