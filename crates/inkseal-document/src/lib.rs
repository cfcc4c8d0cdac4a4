// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// inkseal-document — Watermarking for PDF documents.
//
// Provides a drawing surface over existing PDFs, the text and image
// watermark passes with their hidden decoration layers, a save step with a
// single fallback, inspection of marked files, and PDF creation from image
// or text inputs.

pub mod image;
pub mod pdf;
pub mod watermark;

// Re-export the primary structs so callers can use `inkseal_document::Watermarker` etc.
pub use image::processor::ImageProcessor;
pub use pdf::reader::PdfReader;
pub use pdf::writer::PdfWriter;
pub use pdf::{LopdfSurface, PdfSurface, Persister};
pub use watermark::{
    HiddenData, ImageCache, IntegrityReport, WatermarkOutcome, Watermarker, extract_hidden_data,
    protection_score, verify_integrity,
};
