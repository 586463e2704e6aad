//! Opaque token generation and validation.
//!
//! All customer-facing access is authenticated by unguessable tokens rather
//! than logins, so every token here is drawn from the operating system RNG
//! and encoded as fixed-length lowercase hex. Shape validation runs before
//! any datastore lookup so malformed input is rejected cheaply.

use rand::TryRngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Length in hex characters of invoice and customer tokens (192 bits).
pub const TOKEN_LEN: usize = 48;

/// Length in hex characters of company API keys (256 bits).
pub const API_KEY_LEN: usize = 64;

/// Length in hex characters of OAuth CSRF state tokens (256 bits).
pub const CSRF_STATE_LEN: usize = 64;

/// Fills a buffer from the OS RNG and encodes it as lowercase hex.
///
/// # Panics
///
/// Panics if the operating system randomness source fails. There is no
/// fallback: a weaker source must never be substituted for token entropy.
fn random_hex(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    OsRng
        .try_fill_bytes(&mut buf)
        .expect("operating system randomness source failed");
    hex::encode(buf)
}

/// Generates an invoice or customer token: 48 hex characters.
#[must_use]
pub fn generate_token() -> String {
    random_hex(TOKEN_LEN / 2)
}

/// Generates a company API key: 64 hex characters.
#[must_use]
pub fn generate_api_key() -> String {
    random_hex(API_KEY_LEN / 2)
}

/// Generates an OAuth CSRF state token: 64 hex characters.
#[must_use]
pub fn generate_csrf_state() -> String {
    random_hex(CSRF_STATE_LEN / 2)
}

/// Returns true if the value is exactly `len` lowercase hex characters.
#[must_use]
pub fn is_hex_of_len(value: &str, len: usize) -> bool {
    value.len() == len
        && value
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

/// Validates the shape of an invoice or customer token.
#[must_use]
pub fn is_well_formed_token(value: &str) -> bool {
    is_hex_of_len(value, TOKEN_LEN)
}

/// Validates the shape of a company API key.
#[must_use]
pub fn is_well_formed_api_key(value: &str) -> bool {
    is_hex_of_len(value, API_KEY_LEN)
}

/// Validates the shape of a CSRF state token.
#[must_use]
pub fn is_well_formed_state(value: &str) -> bool {
    is_hex_of_len(value, CSRF_STATE_LEN)
}

/// Compares two secrets in constant time.
///
/// Both sides are hashed first so the comparison leaks neither content nor
/// length. Used for the shared master registration key; per-company keys are
/// high-entropy and resolved through an indexed lookup instead.
#[must_use]
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    let hash_a = Sha256::digest(a.as_bytes());
    let hash_b = Sha256::digest(b.as_bytes());
    hash_a.ct_eq(&hash_b).into()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_token_format() {
        let token = generate_token();
        assert_eq!(token.len(), TOKEN_LEN);
        assert!(is_well_formed_token(&token));
    }

    #[test]
    fn test_api_key_format() {
        let key = generate_api_key();
        assert_eq!(key.len(), API_KEY_LEN);
        assert!(is_well_formed_api_key(&key));
    }

    #[test]
    fn test_csrf_state_format() {
        let state = generate_csrf_state();
        assert_eq!(state.len(), CSRF_STATE_LEN);
        assert!(is_well_formed_state(&state));
    }

    #[test]
    fn test_no_duplicates_in_10k_tokens() {
        let tokens: HashSet<String> = (0..10_000).map(|_| generate_token()).collect();
        assert_eq!(tokens.len(), 10_000);
    }

    #[test]
    fn test_well_formed_rejects_bad_shapes() {
        assert!(!is_well_formed_token(""));
        assert!(!is_well_formed_token("abc123"));
        // Right length, uppercase hex
        assert!(!is_well_formed_token(&"A".repeat(TOKEN_LEN)));
        // Right length, non-hex characters
        assert!(!is_well_formed_token(&"g".repeat(TOKEN_LEN)));
        // One short, one long
        assert!(!is_well_formed_token(&"a".repeat(TOKEN_LEN - 1)));
        assert!(!is_well_formed_token(&"a".repeat(TOKEN_LEN + 1)));
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq("secret", "secret"));
        assert!(!constant_time_eq("secret", "Secret"));
        assert!(!constant_time_eq("secret", "secret2"));
        assert!(!constant_time_eq("", "secret"));
        assert!(constant_time_eq("", ""));
    }
}
