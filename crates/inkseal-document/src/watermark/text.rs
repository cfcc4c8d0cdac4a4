// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Text watermark pass.

use inkseal_core::error::InksealError;
use inkseal_core::{Position, WatermarkConfig, WatermarkOptions};
use tracing::{debug, info, instrument};

use super::PassSummary;
use super::geometry::{anchor, text_tile_positions, text_width};
use crate::pdf::{PdfSurface, TextSpec};

/// Draw `text` on every page. Middle tiles the page diagonally; top and
/// bottom place one line in their band.
#[instrument(skip_all, fields(position = options.position.code(), chars = text.chars().count()))]
pub fn apply_text<S: PdfSurface + ?Sized>(
    surface: &mut S,
    text: &str,
    options: &WatermarkOptions,
    config: &WatermarkConfig,
) -> PassSummary {
    let mut summary = PassSummary::default();
    for page in 0..surface.page_count() {
        let result = text_page(surface, page, text, options, config);
        summary.record("text", page, result);
    }
    info!(
        pages = summary.pages_done,
        skipped = summary.pages_skipped,
        runs = summary.items,
        "Text watermark applied"
    );
    summary
}

fn text_page<S: PdfSurface + ?Sized>(
    surface: &mut S,
    page: u32,
    text: &str,
    options: &WatermarkOptions,
    config: &WatermarkConfig,
) -> Result<u32, InksealError> {
    let rect = surface.page_rect(page)?;
    let color = options.color.rgb();
    let alpha = options.opacity.alpha();

    match options.position {
        Position::Middle => {
            let font_size = (rect.height / config.tiled_font_divisor).floor().max(1.0);
            let positions = text_tile_positions(&rect, text_width(text, font_size), font_size);
            debug!(page, font_size, tiles = positions.len(), "tiling text");
            for origin in &positions {
                surface.insert_text(
                    page,
                    &TextSpec {
                        text,
                        origin: *origin,
                        font_size,
                        color,
                        alpha,
                        rotation: config.tiled_rotation,
                    },
                )?;
            }
            Ok(positions.len() as u32)
        }
        Position::Top | Position::Bottom => {
            let font_size = (rect.height / config.single_font_divisor).floor().max(1.0);
            let origin = anchor(
                rect.width,
                rect.height,
                text_width(text, font_size),
                options.position,
            );
            surface.insert_text(
                page,
                &TextSpec {
                    text,
                    origin,
                    font_size,
                    color,
                    alpha,
                    rotation: 0.0,
                },
            )?;
            Ok(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watermark::recording::RecordingSurface;
    use inkseal_core::parse_callback;

    fn options(callback: &str) -> WatermarkOptions {
        parse_callback(callback).unwrap()
    }

    #[test]
    fn top_places_one_run_per_page() {
        let mut surface = RecordingSurface::with_pages(3, 600.0, 800.0);
        let summary = apply_text(
            &mut surface,
            "DRAFT",
            &options("#wa|txt|op08|T|R"),
            &WatermarkConfig::default(),
        );

        assert_eq!(summary.pages_done, 3);
        assert_eq!(summary.items, 3);
        let first = &surface.texts[0];
        assert_eq!(first.font_size, 40.0);
        // width 5 * 40 * 0.5 = 100
        assert_eq!(first.origin, (250.0, 40.0));
        assert_eq!(first.color, [1.0, 0.0, 0.0]);
        assert!((first.alpha - 0.8).abs() < f32::EPSILON);
        assert_eq!(first.rotation, 0.0);
    }

    #[test]
    fn bottom_uses_lower_band() {
        let mut surface = RecordingSurface::with_pages(1, 600.0, 800.0);
        apply_text(
            &mut surface,
            "DRAFT",
            &options("#wa|txt|op05|B|B"),
            &WatermarkConfig::default(),
        );
        assert_eq!(surface.texts[0].origin.1, 760.0);
    }

    #[test]
    fn middle_tiles_with_rotation() {
        let mut surface = RecordingSurface::with_pages(1, 595.0, 842.0);
        let summary = apply_text(
            &mut surface,
            "CONFIDENTIAL",
            &options("#wa|txt|op03|M|N"),
            &WatermarkConfig::default(),
        );

        assert!(summary.items > 1);
        assert_eq!(summary.items as usize, surface.texts.len());
        assert!(surface.texts.iter().all(|t| t.rotation == 45.0));
        assert!(surface.texts.iter().all(|t| t.font_size == 28.0));
    }

    #[test]
    fn repeated_runs_draw_the_same_number_of_runs() {
        let opts = options("#wa|txt|op08|M|R");
        let config = WatermarkConfig::default();

        let mut first = RecordingSurface::with_pages(2, 612.0, 792.0);
        let mut second = RecordingSurface::with_pages(2, 612.0, 792.0);
        let a = apply_text(&mut first, "Sample", &opts, &config);
        let b = apply_text(&mut second, "Sample", &opts, &config);

        assert_eq!(a.items, b.items);
        assert_eq!(first.texts, second.texts);
    }

    #[test]
    fn broken_page_is_skipped_and_others_continue() {
        let mut surface = RecordingSurface::with_pages(3, 600.0, 800.0);
        surface.broken_pages.insert(1);
        let summary = apply_text(
            &mut surface,
            "DRAFT",
            &options("#wa|txt|op08|T|R"),
            &WatermarkConfig::default(),
        );

        assert_eq!(summary.pages_done, 2);
        assert_eq!(summary.pages_skipped, 1);
        assert_eq!(summary.failures.len(), 1);
        assert!(summary.failures[0].contains("page 2"));
        assert!(surface.texts.iter().all(|t| t.page != 1));
    }

    #[test]
    fn tiny_pages_still_get_a_readable_font() {
        let mut surface = RecordingSurface::with_pages(1, 10.0, 10.0);
        apply_text(
            &mut surface,
            "X",
            &options("#wa|txt|op08|T|R"),
            &WatermarkConfig::default(),
        );
        assert_eq!(surface.texts[0].font_size, 1.0);
    }
}
