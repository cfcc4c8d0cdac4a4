// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// inkseal-security — hashing and identifiers behind the protection layers.
//
// Nothing here is a cryptographic guarantee: the hashes only label a
// document so the inspection tools can recognise it later.

pub mod fingerprint;
pub mod integrity;

pub use fingerprint::{Fingerprint, document_id, page_hash};
pub use integrity::{hash_bytes, hash_str, security_hash, short_hash, verify_hash};
