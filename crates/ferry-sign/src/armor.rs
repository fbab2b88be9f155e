//! ASCII armor for detached signatures.
//!
//! ```text
//! -----BEGIN FERRY SIGNATURE-----
//! Key-Id: 3f9a0c1d2e4b5a69
//! Algorithm: ed25519
//!
//! <base64, wrapped at 64 columns>
//! -----END FERRY SIGNATURE-----
//! ```

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use ferry_util::errors::{FerryError, FerryResult};

pub const BEGIN: &str = "-----BEGIN FERRY SIGNATURE-----";
pub const END: &str = "-----END FERRY SIGNATURE-----";
pub const ALGORITHM: &str = "ed25519";

const LINE_WIDTH: usize = 64;

/// A decoded armored signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArmoredSignature {
    pub key_id: String,
    pub bytes: [u8; 64],
}

/// Armor raw signature bytes.
pub fn encode(key_id: &str, bytes: &[u8; 64]) -> String {
    let body = STANDARD.encode(bytes);
    let mut out = String::with_capacity(body.len() + 128);
    out.push_str(BEGIN);
    out.push('\n');
    out.push_str(&format!("Key-Id: {key_id}\n"));
    out.push_str(&format!("Algorithm: {ALGORITHM}\n"));
    out.push('\n');
    for chunk in body.as_bytes().chunks(LINE_WIDTH) {
        out.push_str(&String::from_utf8_lossy(chunk));
        out.push('\n');
    }
    out.push_str(END);
    out.push('\n');
    out
}

/// Parse armored signature text.
pub fn decode(text: &str) -> FerryResult<ArmoredSignature> {
    let mut lines = text.lines().map(str::trim);

    if !lines.by_ref().any(|l| l == BEGIN) {
        return Err(malformed("missing BEGIN line"));
    }

    let mut key_id = None;
    for line in lines.by_ref() {
        if line.is_empty() {
            break;
        }
        let Some((name, value)) = line.split_once(':') else {
            return Err(malformed(&format!("bad header line '{line}'")));
        };
        match name.trim() {
            "Key-Id" => key_id = Some(value.trim().to_string()),
            "Algorithm" if value.trim() != ALGORITHM => {
                return Err(malformed(&format!(
                    "unsupported algorithm '{}'",
                    value.trim()
                )));
            }
            _ => {}
        }
    }

    let mut body = String::new();
    let mut terminated = false;
    for line in lines {
        if line == END {
            terminated = true;
            break;
        }
        body.push_str(line);
    }
    if !terminated {
        return Err(malformed("missing END line"));
    }

    let key_id = key_id.ok_or_else(|| malformed("missing Key-Id header"))?;
    let decoded = STANDARD
        .decode(body.as_bytes())
        .map_err(|e| malformed(&format!("invalid base64: {e}")))?;
    let bytes: [u8; 64] = decoded
        .as_slice()
        .try_into()
        .map_err(|_| malformed(&format!("expected 64 signature bytes, got {}", decoded.len())))?;

    Ok(ArmoredSignature { key_id, bytes })
}

fn malformed(detail: &str) -> FerryError {
    FerryError::Signing {
        message: format!("malformed armored signature: {detail}"),
    }
}
