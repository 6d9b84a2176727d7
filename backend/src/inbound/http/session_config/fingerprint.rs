//! Non-secret identifier for the active session key.
//!
//! Operators compare fingerprints across replicas to confirm they share a
//! key without ever logging key material.

use actix_web::cookie::Key;
use sha2::{Digest, Sha256};

const FINGERPRINT_BYTES: usize = 8;

/// First eight bytes of SHA-256 over the signing half of `key`, hex encoded.
///
/// ```
/// use actix_web::cookie::Key;
/// use portal::inbound::http::session_config::fingerprint::key_fingerprint;
///
/// let fp = key_fingerprint(&Key::generate());
/// assert_eq!(fp.len(), 16);
/// ```
#[must_use]
pub fn key_fingerprint(key: &Key) -> String {
    let digest = Sha256::digest(key.signing());
    hex::encode(digest.get(..FINGERPRINT_BYTES).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn same_material_gives_same_fingerprint() {
        let material = [7_u8; 64];
        assert_eq!(
            key_fingerprint(&Key::derive_from(&material)),
            key_fingerprint(&Key::derive_from(&material))
        );
    }

    #[rstest]
    fn different_keys_differ() {
        assert_ne!(
            key_fingerprint(&Key::derive_from(&[1_u8; 64])),
            key_fingerprint(&Key::derive_from(&[2_u8; 64]))
        );
    }
}
