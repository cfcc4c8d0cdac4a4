// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Watermark module — placement geometry, the text and image passes, the
// hidden decoration layers, inspection of marked files, and the pipeline
// that ties them to a saved output.

pub mod geometry;
pub mod image;
pub mod inspect;
pub mod pipeline;
pub mod protection;
pub mod text;

pub use inspect::{
    FingerprintSummary, HiddenData, IntegrityReport, extract_hidden_data, verify_integrity,
};
pub use image::{ImageCache, PreparedImage};
pub use pipeline::{WatermarkOutcome, Watermarker, protection_score};

use inkseal_core::error::InksealError;
use tracing::warn;

/// What one pass over the pages did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PassSummary {
    pub pages_done: u32,
    pub pages_skipped: u32,
    /// Text runs, image placements, or dots drawn.
    pub items: u32,
    /// One line per failed page.
    pub failures: Vec<String>,
}

impl PassSummary {
    /// Fold one page result into the summary. Failures are logged and kept.
    pub(crate) fn record(&mut self, pass: &str, page: u32, result: Result<u32, InksealError>) {
        match result {
            Ok(items) => {
                self.pages_done += 1;
                self.items += items;
            }
            Err(err) => {
                let err = InksealError::PageFailed {
                    page: page + 1,
                    reason: err.to_string(),
                };
                warn!(pass, error = %err, "page skipped");
                self.pages_skipped += 1;
                self.failures.push(format!("{pass}: {err}"));
            }
        }
    }
}

/// Constants shared by the layers that write and the inspection that reads.
pub(crate) mod marks {
    pub const SUBJECT: &str = "Watermark Protection Level: MAXIMUM";
    pub const AUTHOR: &str = "Inkseal Security System";
    pub const CREATOR: &str = "Advanced Watermark Protection System";
    pub const PRODUCER_PREFIX: &str = "Security Hash: ";
    pub const KEYWORDS_PREFIX: &str = "protected,watermarked,secured,";
}
