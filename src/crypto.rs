//! SHA-256 and HMAC-SHA256 primitives.
//!
//! These are pure functions over byte strings. Text inputs are hashed over their UTF-8 bytes.

use {
    crate::constants::SHA256_OUTPUT_LEN,
    hmac::{Hmac, Mac},
    sha2::{Digest, Sha256},
};

type HmacSha256 = Hmac<Sha256>;

/// Compute the SHA-256 digest of `value`.
#[inline(always)]
pub fn sha256(value: &[u8]) -> [u8; SHA256_OUTPUT_LEN] {
    Sha256::digest(value).into()
}

/// Compute the SHA-256 digest of `value` as lowercase hex.
#[inline(always)]
pub fn sha256_hex(value: &[u8]) -> String {
    to_hex(sha256(value))
}

/// HMAC-SHA256 of `value` under `key`. The key may be raw bytes from a prior HMAC or UTF-8 text.
#[inline(always)]
pub fn hmac_sha256(key: &[u8], value: &[u8]) -> [u8; SHA256_OUTPUT_LEN] {
    // HMAC accepts keys of any length; longer keys are hashed first.
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take a key of any size");
    mac.update(value);
    mac.finalize().into_bytes().into()
}

/// Lowercase hex, two digits per byte, no separators.
#[inline(always)]
pub fn to_hex<T: AsRef<[u8]>>(bytes: T) -> String {
    hex::encode(bytes)
}
