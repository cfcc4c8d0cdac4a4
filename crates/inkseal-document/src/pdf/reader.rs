// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF reader — open existing PDFs and inspect pages, metadata, and the
// drawing operators on each page using the `lopdf` crate.

use std::path::Path;

use inkseal_core::PageRect;
use inkseal_core::error::InksealError;
use lopdf::content::Content;
use lopdf::{Document, ObjectId};
use tracing::{debug, info, instrument};

use super::metadata::{DocumentMetadata, read_metadata};
use super::surface::page_rect_of;

/// Operators that paint a filled path (the dot layers use `f`).
const FILL_OPERATORS: &[&str] = &["f", "F", "f*", "B", "B*", "b", "b*"];

/// Operators that show text.
const TEXT_OPERATORS: &[&str] = &["Tj", "TJ", "'", "\""];

/// Read-only view of an existing PDF.
pub struct PdfReader {
    document: Document,
    /// Source path, if opened from a file (useful for diagnostics).
    source_path: Option<String>,
}

impl PdfReader {
    // -- Construction ---------------------------------------------------------

    /// Open a PDF from the filesystem.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self, InksealError> {
        let path_ref = path.as_ref();
        info!("Opening PDF: {}", path_ref.display());

        let document = Document::load(path_ref).map_err(|err| {
            InksealError::PdfError(format!("failed to open {}: {}", path_ref.display(), err))
        })?;

        debug!(pages = document.get_pages().len(), "PDF loaded");

        Ok(Self {
            document,
            source_path: Some(path_ref.display().to_string()),
        })
    }

    /// Create a reader from raw PDF bytes already in memory.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self, InksealError> {
        let document = Document::load_mem(data).map_err(|err| {
            InksealError::PdfError(format!("failed to load PDF from memory: {}", err))
        })?;

        debug!(pages = document.get_pages().len(), "PDF loaded from bytes");

        Ok(Self {
            document,
            source_path: None,
        })
    }

    // -- Inspection -----------------------------------------------------------

    /// Number of pages in the document.
    pub fn page_count(&self) -> u32 {
        self.document.get_pages().len() as u32
    }

    /// Return the source path if the reader was created via [`PdfReader::open`].
    pub fn source_path(&self) -> Option<&str> {
        self.source_path.as_deref()
    }

    /// The /Info fields.
    pub fn metadata(&self) -> DocumentMetadata {
        read_metadata(&self.document)
    }

    /// Rectangle of a 0-based page.
    pub fn page_rect(&self, page: u32) -> Result<PageRect, InksealError> {
        Ok(page_rect_of(&self.document, self.page_id(page)?))
    }

    /// Number of text-showing operators on a 0-based page.
    pub fn text_object_count(&self, page: u32) -> Result<usize, InksealError> {
        self.operator_count(page, TEXT_OPERATORS)
    }

    /// Number of filled drawings on a 0-based page.
    pub fn drawing_count(&self, page: u32) -> Result<usize, InksealError> {
        self.operator_count(page, FILL_OPERATORS)
    }

    /// Number of image/form placements (`Do`) on a 0-based page.
    pub fn placement_count(&self, page: u32) -> Result<usize, InksealError> {
        self.operator_count(page, &["Do"])
    }

    /// Count content-stream operators on a page that match `operators`.
    pub fn operator_count(&self, page: u32, operators: &[&str]) -> Result<usize, InksealError> {
        let content = self.page_content(page)?;
        Ok(content
            .operations
            .iter()
            .filter(|op| operators.contains(&op.operator.as_str()))
            .count())
    }

    // -- Helpers --------------------------------------------------------------

    fn page_id(&self, page: u32) -> Result<ObjectId, InksealError> {
        let pages = self.document.get_pages();
        pages.get(&(page + 1)).copied().ok_or_else(|| {
            InksealError::PdfError(format!(
                "page {} out of range (document has {} pages)",
                page + 1,
                pages.len()
            ))
        })
    }

    fn page_content(&self, page: u32) -> Result<Content, InksealError> {
        let page_id = self.page_id(page)?;
        let bytes = self.document.get_page_content(page_id).map_err(|err| {
            InksealError::PdfError(format!("cannot read content of page {}: {}", page + 1, err))
        })?;
        Content::decode(&bytes).map_err(|err| {
            InksealError::PdfError(format!("cannot parse content of page {}: {}", page + 1, err))
        })
    }
}
