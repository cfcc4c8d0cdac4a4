// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Hidden decoration layers drawn on top of the visible watermark.
//
// None of these can be decoded back into the watermark. They only leave
// traces (dot patterns, white labels, /Info fields) that `inspect` can
// recognise. Every layer is additive and a failing page never stops the
// others.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::Utc;
use inkseal_core::PageRect;
use inkseal_core::error::InksealError;
use inkseal_security::{Fingerprint, document_id, hash_str, page_hash, security_hash};
use rand::Rng;
use tracing::{debug, info, instrument, warn};

use super::PassSummary;
use super::marks;
use crate::pdf::{DocumentMetadata, PdfSurface, TextSpec};

const BLACK: [f32; 3] = [0.0, 0.0, 0.0];
const WHITE: [f32; 3] = [1.0, 1.0, 1.0];

const FORENSIC_MARGIN: f32 = 100.0;
const FORENSIC_RADIUS: f32 = 0.2;
const FORENSIC_ALPHA: f32 = 0.003;

const STEGO_MARGIN: f32 = 50.0;
const STEGO_RADIUS: f32 = 0.3;
const STEGO_ONE_ALPHA: f32 = 0.005;
const STEGO_ZERO_ALPHA: f32 = 0.002;

const MICRO_DOT_SPACING: usize = 200;
const MICRO_DOT_JITTER: i32 = 20;
const MICRO_DOT_RADIUS: f32 = 0.5;
const MICRO_DOT_ALPHA: f32 = 0.01;
const LABEL_FONT_SIZE: f32 = 0.1;

const PAGE_ID_FONT_SIZE: f32 = 0.01;

/// Whole points available for a dot pattern once `margin` is removed, or
/// `None` when the page is too small.
fn usable_span(length: f32, margin: f32) -> Option<i64> {
    let span = (length - margin).trunc() as i64;
    (length > margin && span >= 1).then_some(span)
}

// -- Forensic fingerprint ---------------------------------------------------

/// Dot positions encoding the bits of `fingerprint` on a page of the given
/// size. Empty when the page is 100 pt or smaller in either direction.
pub fn forensic_points(rect: &PageRect, fingerprint: &Fingerprint) -> Vec<(f32, f32)> {
    let (Some(span_x), Some(span_y)) = (
        usable_span(rect.width, FORENSIC_MARGIN),
        usable_span(rect.height, FORENSIC_MARGIN),
    ) else {
        return Vec::new();
    };

    let mut points = Vec::new();
    for (i, nibble) in fingerprint.nibbles().enumerate() {
        let i = i as i64;
        for bit in 0..4i64 {
            if nibble & (1 << bit) != 0 {
                let x = (i * 47 + bit * 23) % span_x + 50;
                let y = (i * 31 + bit * 19) % span_y + 50;
                points.push((x as f32, y as f32));
            }
        }
    }
    points
}

/// Draw the fingerprint dot pattern on every page.
#[instrument(skip_all, fields(fingerprint = %fingerprint.id))]
pub fn apply_forensic<S: PdfSurface + ?Sized>(
    surface: &mut S,
    fingerprint: &Fingerprint,
) -> PassSummary {
    let mut summary = PassSummary::default();
    for page in 0..surface.page_count() {
        let result = surface.page_rect(page).and_then(|rect| {
            let points = forensic_points(&rect, fingerprint);
            for center in &points {
                surface.draw_circle(page, *center, FORENSIC_RADIUS, BLACK, FORENSIC_ALPHA)?;
            }
            Ok(points.len() as u32)
        });
        summary.record("forensic", page, result);
    }
    info!(points = summary.items, "Forensic layer applied");
    summary
}

// -- Steganographic bits ----------------------------------------------------

/// Bits of the UTF-8 encoding of `text`, most significant bit first.
pub fn text_bits(text: &str) -> Vec<bool> {
    text.bytes()
        .flat_map(|byte| (0..8).rev().map(move |shift| byte >> shift & 1 == 1))
        .collect()
}

/// Dot position of bit `k`, or `None` when the page is 50 pt or smaller.
pub fn stego_point(rect: &PageRect, k: usize) -> Option<(f32, f32)> {
    let span_x = usable_span(rect.width, STEGO_MARGIN)?;
    let span_y = usable_span(rect.height, STEGO_MARGIN)?;
    let k = k as i64;
    Some((
        ((k * 37) % span_x + 25) as f32,
        ((k * 73) % span_y + 25) as f32,
    ))
}

/// Scatter the bits of `text` over every page as faint dots: darker for a
/// one, fainter for a zero.
#[instrument(skip_all, fields(chars = text.chars().count()))]
pub fn apply_steganography<S: PdfSurface + ?Sized>(surface: &mut S, text: &str) -> PassSummary {
    let bits = text_bits(text);
    let mut summary = PassSummary::default();
    for page in 0..surface.page_count() {
        let result = surface.page_rect(page).and_then(|rect| {
            let mut drawn = 0;
            for (k, bit) in bits.iter().enumerate() {
                let Some(center) = stego_point(&rect, k) else {
                    break;
                };
                let alpha = if *bit { STEGO_ONE_ALPHA } else { STEGO_ZERO_ALPHA };
                surface.draw_circle(page, center, STEGO_RADIUS, BLACK, alpha)?;
                drawn += 1;
            }
            Ok(drawn)
        });
        summary.record("steganography", page, result);
    }
    info!(bits = bits.len(), dots = summary.items, "Steganographic layer applied");
    summary
}

// -- Multilayer -------------------------------------------------------------

/// Result of the multilayer pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultilayerMark {
    pub summary: PassSummary,
    /// Base64 of `"x,y"` for the watermark anchor.
    pub encoded_position: String,
}

/// Base64 of the anchor as whole points, `"x,y"`.
pub fn encode_position(anchor: (f32, f32)) -> String {
    STANDARD.encode(format!("{},{}", anchor.0.trunc() as i64, anchor.1.trunc() as i64))
}

/// Micro dot grid plus white `% WATERMARK_DATA` labels on every page.
#[instrument(skip_all)]
pub fn apply_multilayer<S, R>(
    surface: &mut S,
    watermark_text: &str,
    anchor: (f32, f32),
    rng: &mut R,
) -> MultilayerMark
where
    S: PdfSurface + ?Sized,
    R: Rng + ?Sized,
{
    let labels = [
        ("watermark_id", hash_str(watermark_text)),
        ("protection_level", "maximum".to_owned()),
        (
            "timestamp",
            rng.random_range(1_000_000..=9_999_999u32).to_string(),
        ),
    ]
    .map(|(key, value)| format!("% WATERMARK_DATA: {key}={value}"));

    let mut summary = PassSummary::default();
    for page in 0..surface.page_count() {
        let result = multilayer_page(surface, page, &labels, rng);
        summary.record("multilayer", page, result);
    }
    info!(dots = summary.items, "Multilayer protection applied");
    MultilayerMark {
        summary,
        encoded_position: encode_position(anchor),
    }
}

fn multilayer_page<S, R>(
    surface: &mut S,
    page: u32,
    labels: &[String],
    rng: &mut R,
) -> Result<u32, InksealError>
where
    S: PdfSurface + ?Sized,
    R: Rng + ?Sized,
{
    let rect = surface.page_rect(page)?;
    let mut dots = 0;
    for x in (0..rect.width.trunc() as i32).step_by(MICRO_DOT_SPACING) {
        for y in (0..rect.height.trunc() as i32).step_by(MICRO_DOT_SPACING) {
            let dx = rng.random_range(-MICRO_DOT_JITTER..=MICRO_DOT_JITTER);
            let dy = rng.random_range(-MICRO_DOT_JITTER..=MICRO_DOT_JITTER);
            let center = ((x + dx) as f32, (y + dy) as f32);
            surface.draw_circle(page, center, MICRO_DOT_RADIUS, BLACK, MICRO_DOT_ALPHA)?;
            dots += 1;
        }
    }

    for label in labels {
        let drawn = surface.insert_text(
            page,
            &TextSpec {
                text: label,
                origin: (0.0, 0.0),
                font_size: LABEL_FONT_SIZE,
                color: WHITE,
                alpha: 1.0,
                rotation: 0.0,
            },
        );
        if let Err(err) = drawn {
            warn!(page, error = %err, "hidden label skipped");
        }
    }
    Ok(dots)
}

// -- Signature metadata -----------------------------------------------------

/// Result of the signature pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignatureMark {
    pub document_id: String,
    pub summary: PassSummary,
    pub metadata_written: bool,
}

/// /Info fields identifying a protected document.
pub fn signature_metadata(watermark_text: &str, document_id: &str) -> DocumentMetadata {
    let short_id: String = document_id.chars().take(16).collect();
    DocumentMetadata {
        title: Some(format!("Protected Document - ID: {short_id}")),
        author: Some(marks::AUTHOR.to_owned()),
        subject: Some(marks::SUBJECT.to_owned()),
        keywords: Some(format!("{}{document_id}", marks::KEYWORDS_PREFIX)),
        creator: Some(marks::CREATOR.to_owned()),
        producer: Some(format!(
            "{}{}",
            marks::PRODUCER_PREFIX,
            security_hash(watermark_text)
        )),
        mod_date: Some(format!("D:{}Z", Utc::now().format("%Y%m%d%H%M%S"))),
    }
}

/// Write the signature /Info fields and a white `ID:<page hash>` label in
/// the bottom-right corner of every page. A metadata failure is logged and
/// the labels are still drawn.
#[instrument(skip_all)]
pub fn apply_signature<S, R>(surface: &mut S, watermark_text: &str, rng: &mut R) -> SignatureMark
where
    S: PdfSurface + ?Sized,
    R: Rng + ?Sized,
{
    let document_id = document_id(watermark_text, rng);
    let metadata = signature_metadata(watermark_text, &document_id);
    let metadata_written = match surface.set_metadata(&metadata) {
        Ok(()) => true,
        Err(err) => {
            warn!(error = %err, "signature metadata not written");
            false
        }
    };

    let mut summary = PassSummary::default();
    for page in 0..surface.page_count() {
        let result = surface.page_rect(page).and_then(|rect| {
            let label = format!("ID:{}", page_hash(watermark_text, page));
            surface.insert_text(
                page,
                &TextSpec {
                    text: &label,
                    origin: (rect.width - 5.0, rect.height - 5.0),
                    font_size: PAGE_ID_FONT_SIZE,
                    color: WHITE,
                    alpha: 1.0,
                    rotation: 0.0,
                },
            )?;
            Ok(1)
        });
        summary.record("signature", page, result);
    }
    debug!(%document_id, pages = summary.pages_done, "Signature layer applied");
    SignatureMark {
        document_id,
        summary,
        metadata_written,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watermark::recording::RecordingSurface;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn fingerprint(id: &str) -> Fingerprint {
        Fingerprint {
            id: id.to_owned(),
            nonce: 123_456_789,
        }
    }

    #[test]
    fn forensic_points_follow_set_bits() {
        let rect = PageRect::new(0.0, 0.0, 600.0, 800.0);
        // "1" sets bit 0 only, "0" sets nothing, "f" sets all four.
        let points = forensic_points(&rect, &fingerprint("10f0000000000000"));
        assert_eq!(points.len(), 5);
        assert_eq!(points[0], (50.0, 50.0));
        // i = 2, bit = 3: x = 94 + 69, y = 62 + 57
        assert_eq!(points[4], (213.0, 169.0));
    }

    #[test]
    fn forensic_skips_small_pages() {
        let rect = PageRect::new(0.0, 0.0, 100.0, 800.0);
        assert!(forensic_points(&rect, &fingerprint("ffffffffffffffff")).is_empty());
    }

    #[test]
    fn forensic_layer_draws_faint_dots() {
        let mut surface = RecordingSurface::with_pages(2, 600.0, 800.0);
        let summary = apply_forensic(&mut surface, &fingerprint("ffffffffffffffff"));
        assert_eq!(summary.items, 2 * 64);
        assert!(surface.circles.iter().all(|c| c.radius == 0.2 && c.alpha == 0.003));
    }

    #[test]
    fn text_bits_are_msb_first_utf8() {
        assert_eq!(
            text_bits("A"),
            vec![false, true, false, false, false, false, false, true]
        );
        assert_eq!(text_bits("é").len(), 16);
    }

    #[test]
    fn stego_point_positions() {
        let rect = PageRect::new(0.0, 0.0, 600.0, 800.0);
        assert_eq!(stego_point(&rect, 0), Some((25.0, 25.0)));
        assert_eq!(stego_point(&rect, 20), Some((215.0, 735.0)));
        assert_eq!(stego_point(&PageRect::new(0.0, 0.0, 50.0, 800.0), 0), None);
    }

    #[test]
    fn stego_alpha_depends_on_bit() {
        let mut surface = RecordingSurface::with_pages(1, 600.0, 800.0);
        let summary = apply_steganography(&mut surface, "A");
        assert_eq!(summary.items, 8);
        let alphas: Vec<f32> = surface.circles.iter().map(|c| c.alpha).collect();
        assert_eq!(alphas[0], STEGO_ZERO_ALPHA);
        assert_eq!(alphas[1], STEGO_ONE_ALPHA);
        assert_eq!(alphas[7], STEGO_ONE_ALPHA);
    }

    #[test]
    fn stego_on_tiny_page_draws_nothing() {
        let mut surface = RecordingSurface::with_pages(1, 40.0, 40.0);
        let summary = apply_steganography(&mut surface, "hello");
        assert_eq!(summary.items, 0);
        assert_eq!(summary.pages_done, 1);
    }

    #[test]
    fn multilayer_grid_and_labels() {
        let mut surface = RecordingSurface::with_pages(1, 595.0, 842.0);
        let mark = apply_multilayer(
            &mut surface,
            "secret",
            (247.0, 42.0),
            &mut StdRng::seed_from_u64(9),
        );

        // x in {0, 200, 400}, y in {0, 200, 400, 600, 800}
        assert_eq!(mark.summary.items, 15);
        assert_eq!(mark.encoded_position, STANDARD.encode("247,42"));
        let labels: Vec<&str> = surface.texts.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(labels.len(), 3);
        assert!(labels[0].starts_with("% WATERMARK_DATA: watermark_id="));
        assert_eq!(labels[1], "% WATERMARK_DATA: protection_level=maximum");
        for circle in &surface.circles {
            let nearest_x = (circle.center.0 / 200.0).round() * 200.0;
            assert!((circle.center.0 - nearest_x).abs() <= 20.0);
        }
    }

    #[test]
    fn signature_sets_info_and_page_labels() {
        let mut surface = RecordingSurface::with_pages(2, 600.0, 800.0);
        let mark = apply_signature(&mut surface, "secret", &mut StdRng::seed_from_u64(1));

        assert!(mark.metadata_written);
        assert_eq!(mark.document_id.len(), 64);
        let meta = surface.metadata.unwrap();
        assert_eq!(
            meta.producer.as_deref(),
            Some(format!("Security Hash: {}", security_hash("secret")).as_str())
        );
        assert!(meta.keywords.unwrap().ends_with(&mark.document_id));
        assert_eq!(meta.creator.as_deref(), Some(marks::CREATOR));

        assert_eq!(surface.texts.len(), 2);
        assert_eq!(surface.texts[1].text, format!("ID:{}", page_hash("secret", 1)));
        assert_eq!(surface.texts[1].origin, (595.0, 795.0));
    }
}
