//! PKCE (RFC 7636) verifier and S256 challenge derivation.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;

use crate::capability::{DigestFunction, RandomBytesSource};

/// Length of generated code verifiers (RFC 7636 allows 43..=128).
pub const VERIFIER_LENGTH: usize = 64;

const ALPHABET: &[u8; 62] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Random alphanumeric verifier of `length` characters.
///
/// Each random byte is reduced modulo 62.
pub fn generate_verifier(random: &dyn RandomBytesSource, length: usize) -> String {
    let mut bytes = vec![0u8; length];
    random.fill(&mut bytes);
    bytes
        .iter()
        .map(|b| ALPHABET[*b as usize % ALPHABET.len()] as char)
        .collect()
}

/// `BASE64URL-NOPAD(SHA256(verifier))`.
pub fn code_challenge(digest: &dyn DigestFunction, verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(digest.sha256(verifier.as_bytes()))
}
