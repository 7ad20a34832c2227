//! State token and PKCE (RFC 7636, S256) generation.
//!
//! Both generators draw from the operating system CSPRNG. The `_with` variants
//! take any [`RngCore`] so the encode/hash pipeline can be pinned in tests.

use base64::{
    Engine as _,
    engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD},
};
use rand::{RngCore, rngs::OsRng};
use sha2::{Digest, Sha256};

/// Raw entropy behind a state token.
pub const STATE_BYTES: usize = 16;
/// Raw entropy behind a code verifier (54 characters once encoded).
pub const VERIFIER_BYTES: usize = 40;

const VERIFIER_MIN_LEN: usize = 43;
const VERIFIER_MAX_LEN: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PkcePair {
    pub code_verifier: String,
    pub code_challenge: String,
}

/// Random CSRF state for one authorization request. Keeps its base64 padding.
pub fn generate_state() -> Result<String, rand::Error> {
    generate_state_with(&mut OsRng)
}

pub fn generate_state_with<R: RngCore + ?Sized>(rng: &mut R) -> Result<String, rand::Error> {
    let mut bytes = [0u8; STATE_BYTES];
    rng.try_fill_bytes(&mut bytes)?;
    Ok(URL_SAFE.encode(bytes))
}

/// Fresh verifier plus its S256 challenge.
pub fn generate_pkce_pair() -> Result<PkcePair, rand::Error> {
    generate_pkce_pair_with(&mut OsRng)
}

pub fn generate_pkce_pair_with<R: RngCore + ?Sized>(rng: &mut R) -> Result<PkcePair, rand::Error> {
    let mut bytes = [0u8; VERIFIER_BYTES];
    rng.try_fill_bytes(&mut bytes)?;

    let code_verifier = URL_SAFE_NO_PAD.encode(bytes);
    let code_challenge = code_challenge_s256(&code_verifier);

    Ok(PkcePair {
        code_verifier,
        code_challenge,
    })
}

pub fn code_challenge_s256(verifier: &str) -> String {
    let digest = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(digest)
}

/// Length and alphabet check from RFC 7636 section 4.1.
pub fn is_valid_code_verifier(verifier: &str) -> bool {
    (VERIFIER_MIN_LEN..=VERIFIER_MAX_LEN).contains(&verifier.len())
        && verifier
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~'))
}

/// Compares two secrets without short-circuiting on the first differing byte.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
