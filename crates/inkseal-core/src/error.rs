// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Inkseal.

use thiserror::Error;

/// Top-level error type for all Inkseal operations.
#[derive(Debug, Error)]
pub enum InksealError {
    // -- Request errors --
    #[error("invalid watermark callback: {0}")]
    InvalidCallback(String),

    #[error("unsupported watermark type: {0}")]
    UnsupportedWatermark(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("watermark request cancelled")]
    Cancelled,

    #[error("chat session error: {0}")]
    Chat(String),

    // -- Document errors --
    #[error("PDF operation failed: {0}")]
    PdfError(String),

    #[error("image processing failed: {0}")]
    ImageError(String),

    #[error("page {page} could not be watermarked: {reason}")]
    PageFailed { page: u32, reason: String },

    #[error("save failed (primary: {primary}; fallback: {fallback})")]
    SaveFailed { primary: String, fallback: String },

    // -- Integrity --
    #[error("integrity check failed: expected {expected}, got {actual}")]
    IntegrityMismatch { expected: String, actual: String },

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, InksealError>;
