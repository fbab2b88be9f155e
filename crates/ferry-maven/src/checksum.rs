//! Checksum sidecars (`.md5`, `.sha1`, `.sha256`) next to staged files.

use ferry_core::publication::{checksum, CHECKSUM_ALGORITHMS};

/// Extract the hex hash from a checksum file.
///
/// Maven checksum files may contain just the hash, or `hash  filename`.
pub fn extract_hash(content: &str) -> String {
    content.split_whitespace().next().unwrap_or("").to_string()
}

/// Algorithm named by a sidecar path's extension, if it is one.
pub fn sidecar_algorithm(path: &str) -> Option<&'static str> {
    let ext = path.rsplit_once('.')?.1;
    CHECKSUM_ALGORITHMS.into_iter().find(|algo| *algo == ext)
}

/// Compare `data` against the content of a checksum sidecar.
///
/// Returns a violation message on mismatch.
pub fn verify_sidecar(algorithm: &str, data: &[u8], sidecar: &str) -> Result<(), String> {
    let expected = extract_hash(sidecar);
    let actual = checksum(algorithm, data);
    if actual.eq_ignore_ascii_case(&expected) {
        tracing::debug!("{algorithm} ok");
        Ok(())
    } else {
        Err(format!(
            "{algorithm} mismatch: expected {expected}, got {actual}"
        ))
    }
}
