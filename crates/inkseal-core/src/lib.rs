// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Inkseal — Core types, callback parsing, and error definitions shared across
// all crates.

pub mod callback;
pub mod config;
pub mod error;
pub mod human_errors;
pub mod types;

pub use callback::parse_callback;
pub use config::{ProtectionConfig, WatermarkConfig};
pub use error::InksealError;
pub use types::*;
