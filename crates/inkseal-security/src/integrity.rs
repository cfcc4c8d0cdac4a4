// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Watermark integrity — SHA-256 hashing of watermark content and documents.

use inkseal_core::error::InksealError;
use sha2::{Digest, Sha256};

/// Compute the SHA-256 hash of `data` and return it as a lowercase hex string.
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// SHA-256 hex of a UTF-8 string.
pub fn hash_str(text: &str) -> String {
    hash_bytes(text.as_bytes())
}

/// The first `len` hex characters of the SHA-256 of `text`.
///
/// `len` is capped at the full 64-character digest.
pub fn short_hash(text: &str, len: usize) -> String {
    let mut digest = hash_str(text);
    digest.truncate(len.min(64));
    digest
}

/// Security hash written into the PDF producer field (20 hex chars).
pub fn security_hash(watermark_text: &str) -> String {
    short_hash(watermark_text, 20)
}

/// Verify that `actual_hex` (as read back from a document) matches the hash
/// expected for `data`. Prefix comparisons are used so truncated hashes can
/// be checked.
pub fn verify_hash(data: &[u8], actual_hex: &str) -> Result<(), InksealError> {
    let expected = hash_bytes(data);
    if !actual_hex.is_empty() && expected.starts_with(&actual_hex.to_ascii_lowercase()) {
        Ok(())
    } else {
        let mut expected_prefix = expected;
        expected_prefix.truncate(actual_hex.len().clamp(1, 64));
        Err(InksealError::IntegrityMismatch {
            expected: expected_prefix,
            actual: actual_hex.to_owned(),
        })
    }
}
