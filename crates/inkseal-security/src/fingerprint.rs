// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Fingerprints and identifiers derived from watermark content.
//
// Random components come from the caller's RNG so runs can be reproduced
// with a seeded generator.

use rand::Rng;
use tracing::debug;

use crate::integrity::{hash_str, short_hash};

/// A per-run forensic fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    /// 16 lowercase hex characters.
    pub id: String,
    /// Nine-digit nonce mixed into the hash.
    pub nonce: u32,
}

impl Fingerprint {
    /// Derive a fingerprint for `watermark_text` with a fresh nonce.
    pub fn generate<R: Rng + ?Sized>(watermark_text: &str, rng: &mut R) -> Self {
        let nonce = rng.random_range(100_000_000..=999_999_999u32);
        let id = short_hash(&format!("{watermark_text}_{nonce}"), 16);
        debug!(%id, "forensic fingerprint generated");
        Self { id, nonce }
    }

    /// Hex digits of the id as values `0..16`.
    pub fn nibbles(&self) -> impl Iterator<Item = u8> + '_ {
        self.id
            .chars()
            .filter_map(|c| c.to_digit(16))
            .map(|d| d as u8)
    }
}

/// Full SHA-256 document id: hash of the text and a five-digit salt.
pub fn document_id<R: Rng + ?Sized>(watermark_text: &str, rng: &mut R) -> String {
    let salt = rng.random_range(10_000..=99_999u32);
    hash_str(&format!("{watermark_text}_{salt}"))
}

/// Twelve-character per-page id.
pub fn page_hash(watermark_text: &str, page_index: u32) -> String {
    short_hash(&format!("{watermark_text}_page_{page_index}"), 12)
}
