// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Watermark pipeline — open the input, run the visible pass, add the hidden
// layers the config enables, and persist `<work dir>/<output file>`.

use std::path::{Path, PathBuf};

use inkseal_core::error::InksealError;
use inkseal_core::{
    Position, ProtectionReport, WatermarkConfig, WatermarkKind, WatermarkPayload, WatermarkRequest,
};
use inkseal_security::Fingerprint;
use rand::Rng;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use super::PassSummary;
use super::geometry::{anchor, single_image_rect, text_width};
use super::image::{ImageCache, apply_image};
use super::protection::{apply_forensic, apply_multilayer, apply_signature, apply_steganography};
use super::text::apply_text;
use crate::pdf::{LopdfSurface, PdfSurface, Persister};

/// A finished run.
#[derive(Debug, Clone, Serialize)]
pub struct WatermarkOutcome {
    pub output: PathBuf,
    pub report: ProtectionReport,
    /// Pages or layers that were skipped, one line each.
    pub failures: Vec<String>,
}

/// Applies watermark requests to PDF files.
pub struct Watermarker {
    config: WatermarkConfig,
    persister: Persister,
}

impl Watermarker {
    pub fn new(config: WatermarkConfig) -> Self {
        Self {
            config,
            persister: Persister::default(),
        }
    }

    /// Replace the save strategy.
    pub fn with_persister(mut self, persister: Persister) -> Self {
        self.persister = persister;
        self
    }

    pub fn config(&self) -> &WatermarkConfig {
        &self.config
    }

    /// Path the result of a run in `work_dir` is written to.
    pub fn output_path(&self, work_dir: &Path) -> PathBuf {
        work_dir.join(&self.config.output_file_name)
    }

    /// Watermark the PDF at `input` and save it into `work_dir`.
    #[instrument(skip_all, fields(input = %input.display(), kind = request.options.kind.code()))]
    pub fn apply<R: Rng + ?Sized>(
        &self,
        input: &Path,
        work_dir: &Path,
        request: &WatermarkRequest,
        rng: &mut R,
        cache: &mut ImageCache,
    ) -> Result<WatermarkOutcome, InksealError> {
        validate(request)?;

        let mut surface = LopdfSurface::open(input)?;
        let (report, failures) = self.apply_to_surface(&mut surface, request, rng, cache)?;

        let mut document = surface.into_document()?;
        let output = self.output_path(work_dir);
        self.persister.persist(&mut document, &output)?;

        info!(
            output = %output.display(),
            pages = report.pages_watermarked,
            skipped = report.pages_skipped,
            layers = report.layers_added,
            "Watermark complete"
        );
        Ok(WatermarkOutcome {
            output,
            report,
            failures,
        })
    }

    /// Run every pass on an open surface without saving.
    pub fn apply_to_surface<S, R>(
        &self,
        surface: &mut S,
        request: &WatermarkRequest,
        rng: &mut R,
        cache: &mut ImageCache,
    ) -> Result<(ProtectionReport, Vec<String>), InksealError>
    where
        S: PdfSurface + ?Sized,
        R: Rng + ?Sized,
    {
        validate(request)?;
        let options = &request.options;
        let mut report = ProtectionReport::default();
        let mut failures = Vec::new();

        // Visible pass. `seed` keys the hidden layers and `placed_at` is the
        // anchor the multilayer pass records.
        let (visible, seed, placed_at) = match &request.payload {
            WatermarkPayload::Text(text) => {
                let summary = apply_text(surface, text, options, &self.config);
                report.text_objects = summary.items;
                (summary, text.clone(), self.text_anchor(&*surface, text, options.position))
            }
            WatermarkPayload::File(path) => {
                let prepared = cache.get_or_prepare(path, options.opacity, &self.config)?;
                report.background_removed = prepared.background_removed;
                let summary = apply_image(surface, &prepared, options, &self.config, rng)?;
                report.image_placements = summary.items;
                let (w, h) = prepared.image.dimensions();
                let placed_at = first_page(&*surface).map_or((0.0, 0.0), |rect| {
                    let r = single_image_rect(&rect, w as f32, h as f32, options.position);
                    (r.x, r.y)
                });
                (summary, image_seed(path), placed_at)
            }
        };
        report.pages_watermarked = visible.pages_done;
        report.pages_skipped = visible.pages_skipped;
        if visible.pages_done > 0 {
            report.layers_added += 1;
        }
        failures.extend(visible.failures);

        let protection = &self.config.protection;
        if protection.forensic {
            let fingerprint = Fingerprint::generate(&seed, rng);
            let summary = apply_forensic(surface, &fingerprint);
            report.forensic_points = summary.items;
            report.forensic_id = Some(fingerprint.id);
            count_layer(&mut report, &mut failures, summary);
        }
        if protection.steganography && options.kind == WatermarkKind::Text {
            let summary = apply_steganography(surface, &seed);
            report.steganography = summary.items > 0;
            report.stego_bits = summary.items;
            count_layer(&mut report, &mut failures, summary);
        }
        if protection.multilayer {
            let mark = apply_multilayer(surface, &seed, placed_at, rng);
            report.multilayer = mark.summary.pages_done > 0;
            report.micro_dots = mark.summary.items;
            report.encoded_position = Some(mark.encoded_position);
            count_layer(&mut report, &mut failures, mark.summary);
        }
        if protection.signature {
            let mark = apply_signature(surface, &seed, rng);
            if !mark.metadata_written {
                failures.push("signature: metadata not written".to_owned());
            }
            report.document_id = Some(mark.document_id);
            count_layer(&mut report, &mut failures, mark.summary);
        }

        debug!(?report, "passes finished");
        Ok((report, failures))
    }

    fn text_anchor<S: PdfSurface + ?Sized>(
        &self,
        surface: &S,
        text: &str,
        position: Position,
    ) -> (f32, f32) {
        first_page(surface).map_or((0.0, 0.0), |rect| {
            let font_size = (rect.height / self.config.single_font_divisor).floor().max(1.0);
            anchor(rect.width, rect.height, text_width(text, font_size), position)
        })
    }
}

/// Headline number for the summary message:
/// `min(100, 40 + 15 per layer + 10 for forensic dots + 10 for stego bits)`.
pub fn protection_score(report: &ProtectionReport) -> u32 {
    let mut score = 40 + 15 * report.layers_added;
    if report.forensic_points > 0 {
        score += 10;
    }
    if report.steganography {
        score += 10;
    }
    score.min(100)
}

fn validate(request: &WatermarkRequest) -> Result<(), InksealError> {
    match (request.options.kind, &request.payload) {
        (WatermarkKind::Pdf, _) => Err(InksealError::UnsupportedWatermark(
            "PDF files cannot be used as a watermark".into(),
        )),
        (WatermarkKind::Text, WatermarkPayload::Text(text)) if text.trim().is_empty() => Err(
            InksealError::InvalidInput("watermark text is empty".into()),
        ),
        (WatermarkKind::Text, WatermarkPayload::Text(_))
        | (WatermarkKind::Image, WatermarkPayload::File(_)) => Ok(()),
        (kind, _) => Err(InksealError::InvalidInput(format!(
            "payload does not match a {} watermark",
            kind.code()
        ))),
    }
}

fn count_layer(report: &mut ProtectionReport, failures: &mut Vec<String>, summary: PassSummary) {
    if summary.pages_done > 0 {
        report.layers_added += 1;
    }
    failures.extend(summary.failures);
}

fn first_page<S: PdfSurface + ?Sized>(surface: &S) -> Option<inkseal_core::PageRect> {
    if surface.page_count() == 0 {
        return None;
    }
    surface
        .page_rect(0)
        .map_err(|err| warn!(error = %err, "first page unreadable"))
        .ok()
}

/// Image watermarks key their hidden layers on the image file name.
fn image_seed(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::testing::blank_pdf;
    use crate::pdf::{PdfReader, SaveMode};
    use crate::watermark::recording::RecordingSurface;
    use inkseal_core::{ProtectionConfig, parse_callback};
    use lopdf::Document;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn text_request(callback: &str, text: &str) -> WatermarkRequest {
        WatermarkRequest::text(parse_callback(callback).unwrap(), text)
    }

    fn run(
        surface: &mut RecordingSurface,
        config: WatermarkConfig,
        request: &WatermarkRequest,
    ) -> ProtectionReport {
        Watermarker::new(config)
            .apply_to_surface(
                surface,
                request,
                &mut StdRng::seed_from_u64(11),
                &mut ImageCache::new(),
            )
            .unwrap()
            .0
    }

    #[test]
    fn pdf_watermarks_are_rejected() {
        let options = parse_callback("#wa|pdf|op05|M").unwrap();
        let request = WatermarkRequest::file(options, "/tmp/w.pdf");
        let err = Watermarker::new(WatermarkConfig::default())
            .apply_to_surface(
                &mut RecordingSurface::with_pages(1, 100.0, 100.0),
                &request,
                &mut StdRng::seed_from_u64(1),
                &mut ImageCache::new(),
            )
            .unwrap_err();
        assert!(matches!(err, InksealError::UnsupportedWatermark(_)));
    }

    #[test]
    fn blank_text_is_rejected() {
        let err = validate(&text_request("#wa|txt|op05|M|R", "   ")).unwrap_err();
        assert!(matches!(err, InksealError::InvalidInput(_)));
    }

    #[test]
    fn mismatched_payload_is_rejected() {
        let request = WatermarkRequest::text(parse_callback("#wa|img|op05|T").unwrap(), "oops");
        assert!(matches!(validate(&request), Err(InksealError::InvalidInput(_))));
    }

    #[test]
    fn plain_text_run_adds_only_the_visible_layer() {
        let mut surface = RecordingSurface::with_pages(2, 600.0, 800.0);
        let config = WatermarkConfig {
            protection: ProtectionConfig::disabled(),
            ..WatermarkConfig::default()
        };
        let report = run(&mut surface, config, &text_request("#wa|txt|op08|T|R", "DRAFT"));

        assert_eq!(report.layers_added, 1);
        assert_eq!(report.pages_watermarked, 2);
        assert_eq!(report.text_objects, 2);
        assert!(surface.circles.is_empty());
        assert!(surface.metadata.is_none());
        assert_eq!(protection_score(&report), 55);
    }

    #[test]
    fn all_layers_fill_the_report() {
        let mut surface = RecordingSurface::with_pages(1, 600.0, 800.0);
        let report = run(
            &mut surface,
            WatermarkConfig::default(),
            &text_request("#wa|txt|op08|B|G", "Owner"),
        );

        assert_eq!(report.layers_added, 5);
        assert!(report.steganography);
        assert_eq!(report.stego_bits, 40);
        assert!(report.multilayer);
        assert!(report.forensic_points > 0);
        assert_eq!(report.forensic_id.as_ref().map(String::len), Some(16));
        assert_eq!(report.document_id.as_ref().map(String::len), Some(64));
        assert!(report.encoded_position.is_some());
        assert_eq!(protection_score(&report), 100);
    }

    #[test]
    fn image_runs_skip_steganography() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stamp.png");
        ::image::RgbaImage::from_pixel(40, 30, ::image::Rgba([200, 0, 0, 255]))
            .save(&path)
            .unwrap();
        let mut surface = RecordingSurface::with_pages(1, 600.0, 800.0);
        let options = parse_callback("#wa|img|op10|T").unwrap();
        let request = WatermarkRequest::file(options, path.clone());

        let report = run(&mut surface, WatermarkConfig::default(), &request);

        assert!(!report.steganography);
        assert_eq!(report.stego_bits, 0);
        assert_eq!(report.image_placements, 1);
        assert!(report.forensic_points > 0);
        assert!(report.multilayer);
        // Visible, forensic, multilayer and signature.
        assert_eq!(report.layers_added, 4);
    }

    #[test]
    fn skipped_pages_are_reported() {
        let mut surface = RecordingSurface::with_pages(3, 600.0, 800.0);
        surface.broken_pages.insert(2);
        let (report, failures) = Watermarker::new(WatermarkConfig::default())
            .apply_to_surface(
                &mut surface,
                &text_request("#wa|txt|op08|T|R", "DRAFT"),
                &mut StdRng::seed_from_u64(4),
                &mut ImageCache::new(),
            )
            .unwrap();

        assert_eq!(report.pages_watermarked, 2);
        assert_eq!(report.pages_skipped, 1);
        // The visible pass and four layers each lose page 3.
        assert_eq!(failures.len(), 5);
    }

    #[test]
    fn score_is_capped() {
        let report = ProtectionReport {
            layers_added: 9,
            ..ProtectionReport::default()
        };
        assert_eq!(protection_score(&report), 100);
        assert_eq!(protection_score(&ProtectionReport::default()), 40);
    }

    #[test]
    fn apply_writes_output_with_same_page_count() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input.pdf");
        std::fs::write(&input, blank_pdf(1, 595.0, 842.0)).unwrap();

        let outcome = Watermarker::new(WatermarkConfig::default())
            .apply(
                &input,
                dir.path(),
                &text_request("#wa|txt|op08|M|R", "Confidential"),
                &mut StdRng::seed_from_u64(5),
                &mut ImageCache::new(),
            )
            .unwrap();

        assert_eq!(outcome.output, dir.path().join("outPut.pdf"));
        let reader = PdfReader::open(&outcome.output).unwrap();
        assert_eq!(reader.page_count(), 1);
        assert_eq!(
            reader.text_object_count(0).unwrap() as u32,
            outcome.report.text_objects + 3 + 1
        );
    }

    struct AlwaysFails;

    impl SaveMode for AlwaysFails {
        fn name(&self) -> &'static str {
            "always-fails"
        }

        fn save(&self, _doc: &mut Document, _path: &Path) -> Result<(), InksealError> {
            Err(InksealError::PdfError("disk full".into()))
        }
    }

    #[test]
    fn save_failure_surfaces_after_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input.pdf");
        std::fs::write(&input, blank_pdf(1, 300.0, 300.0)).unwrap();

        let err = Watermarker::new(WatermarkConfig::default())
            .with_persister(Persister::new(Box::new(AlwaysFails), Box::new(AlwaysFails)))
            .apply(
                &input,
                dir.path(),
                &text_request("#wa|txt|op08|T|R", "DRAFT"),
                &mut StdRng::seed_from_u64(5),
                &mut ImageCache::new(),
            )
            .unwrap_err();
        assert!(matches!(err, InksealError::SaveFailed { .. }));
    }
}
