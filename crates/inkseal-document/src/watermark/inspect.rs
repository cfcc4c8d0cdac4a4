// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Inspection of watermarked PDFs.
//
// These checks only read /Info and count filled drawings per page. They
// recognise Inkseal output; they do not decode any hidden layer.

use std::path::Path;

use inkseal_core::error::InksealError;
use inkseal_security::verify_hash;
use serde::Serialize;
use tracing::{info, instrument, warn};

use super::marks;
use crate::pdf::PdfReader;

/// Pages with more drawings than this carry a forensic trace.
const TRACE_THRESHOLD: usize = 100;

/// Pages with more drawings than this are reported as fingerprinted.
const FINGERPRINT_THRESHOLD: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProtectionLevel {
    None,
    High,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntegrityReport {
    pub is_watermarked: bool,
    pub protection_level: ProtectionLevel,
    pub tampering_detected: bool,
    /// One line per page with a forensic trace.
    pub forensic_traces: Vec<String>,
    pub digital_signature_valid: bool,
    /// Whether the Producer hash matches the expected text, when one was
    /// given and the hash is present.
    pub text_matches: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Complexity {
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FingerprintSummary {
    /// 1-based page number.
    pub page: u32,
    pub pattern_points: usize,
    pub complexity: Complexity,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HiddenData {
    pub document_id: Option<String>,
    pub forensic_fingerprints: Vec<FingerprintSummary>,
    /// Number of distinct kinds of trace found.
    pub protection_layers: u32,
}

/// Check whether `path` carries Inkseal marks and whether they look intact.
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn verify_integrity(
    path: impl AsRef<Path>,
    expected_text: Option<&str>,
) -> Result<IntegrityReport, InksealError> {
    let reader = PdfReader::open(path)?;
    Ok(integrity_of(&reader, expected_text))
}

/// [`verify_integrity`] over an already opened document.
pub fn integrity_of(reader: &PdfReader, expected_text: Option<&str>) -> IntegrityReport {
    let metadata = reader.metadata();
    let producer = metadata.producer.unwrap_or_default();
    let producer_hash = producer
        .find(marks::PRODUCER_PREFIX.trim_end())
        .map(|at| producer[at + marks::PRODUCER_PREFIX.trim_end().len()..].trim());
    let is_watermarked = producer_hash.is_some();

    let forensic_traces: Vec<String> = (0..reader.page_count())
        .filter_map(|page| {
            let drawings = drawings_on(reader, page);
            (drawings > TRACE_THRESHOLD)
                .then(|| format!("Page {}: {} forensic points", page + 1, drawings))
        })
        .collect();

    let digital_signature_valid = metadata
        .creator
        .is_some_and(|creator| creator.contains(marks::CREATOR));

    let text_matches = match (expected_text, producer_hash) {
        (Some(text), Some(hash)) => Some(verify_hash(text.as_bytes(), hash).is_ok()),
        _ => None,
    };

    let missing_traces = is_watermarked && (forensic_traces.len() as u32) < reader.page_count();
    let report = IntegrityReport {
        is_watermarked,
        protection_level: if is_watermarked {
            ProtectionLevel::High
        } else {
            ProtectionLevel::None
        },
        tampering_detected: missing_traces || text_matches == Some(false),
        forensic_traces,
        digital_signature_valid,
        text_matches,
    };
    info!(
        watermarked = report.is_watermarked,
        tampering = report.tampering_detected,
        "Integrity checked"
    );
    report
}

/// Collect the document id and per-page dot counts of `path`.
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn extract_hidden_data(path: impl AsRef<Path>) -> Result<HiddenData, InksealError> {
    let reader = PdfReader::open(path)?;
    Ok(hidden_data_of(&reader))
}

/// [`extract_hidden_data`] over an already opened document.
pub fn hidden_data_of(reader: &PdfReader) -> HiddenData {
    let document_id = reader
        .metadata()
        .keywords
        .filter(|keywords| keywords.contains(marks::KEYWORDS_PREFIX))
        .and_then(|keywords| keywords.rsplit(',').next().map(str::to_owned));

    let forensic_fingerprints: Vec<FingerprintSummary> = (0..reader.page_count())
        .filter_map(|page| {
            let drawings = drawings_on(reader, page);
            (drawings > FINGERPRINT_THRESHOLD).then(|| FingerprintSummary {
                page: page + 1,
                pattern_points: drawings,
                complexity: if drawings > TRACE_THRESHOLD {
                    Complexity::High
                } else {
                    Complexity::Medium
                },
            })
        })
        .collect();

    let protection_layers =
        u32::from(document_id.is_some()) + u32::from(!forensic_fingerprints.is_empty());
    HiddenData {
        document_id,
        forensic_fingerprints,
        protection_layers,
    }
}

fn drawings_on(reader: &PdfReader, page: u32) -> usize {
    reader.drawing_count(page).unwrap_or_else(|err| {
        warn!(page = page + 1, error = %err, "page content unreadable, counted as empty");
        0
    })
}
