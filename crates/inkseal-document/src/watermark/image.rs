// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image watermark pass, plus the per-request cache of prepared images.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ::image::RgbaImage;
use inkseal_core::error::InksealError;
use inkseal_core::{Opacity, Position, WatermarkConfig, WatermarkOptions};
use rand::Rng;
use tracing::{debug, info, instrument, warn};

use super::PassSummary;
use super::geometry::{image_tile_rects, single_image_rect};
use crate::image::ImageProcessor;
use crate::pdf::{ImageHandle, PdfSurface};

/// Longest side an embedded watermark image keeps.
const MAX_IMAGE_SIDE: u32 = 2048;

/// A watermark image with its background made transparent.
#[derive(Debug, Clone)]
pub struct PreparedImage {
    pub image: RgbaImage,
    pub background_removed: bool,
}

impl PreparedImage {
    /// Load `path` and clear its background.
    ///
    /// Pixels above `white_threshold` are always cleared. Translucent
    /// watermarks also lose the `opacity_pass_min..opacity_pass_max` range.
    /// If the cleaned image cannot be re-encoded the original is kept and
    /// `background_removed` is false.
    #[instrument(skip(config), fields(path = %path.display(), opacity = opacity.level()))]
    pub fn load(
        path: &Path,
        opacity: Opacity,
        config: &WatermarkConfig,
    ) -> Result<Self, InksealError> {
        let original = ImageProcessor::open(path)?.limit_size(MAX_IMAGE_SIDE);
        let fallback = original.as_rgba().clone();

        let (mut processor, removed) = original.remove_background(config.white_threshold);
        if !opacity.is_opaque() {
            processor = processor.clear_range(config.opacity_pass_min, config.opacity_pass_max);
        }
        let processor = processor.smooth(config.smoothing_sigma);

        match processor
            .to_png_bytes()
            .and_then(|png| ImageProcessor::from_bytes(&png))
        {
            Ok(cleaned) => Ok(Self {
                image: cleaned.into_rgba(),
                background_removed: removed,
            }),
            Err(err) => {
                warn!(error = %err, "background removal failed, using original image");
                Ok(Self {
                    image: fallback,
                    background_removed: false,
                })
            }
        }
    }
}

/// Prepared images for one request, keyed by source path and opacity.
#[derive(Debug, Default)]
pub struct ImageCache {
    entries: HashMap<(PathBuf, u8), Arc<PreparedImage>>,
}

impl ImageCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the prepared image for `path`, preparing it on first use.
    pub fn get_or_prepare(
        &mut self,
        path: &Path,
        opacity: Opacity,
        config: &WatermarkConfig,
    ) -> Result<Arc<PreparedImage>, InksealError> {
        let key = (path.to_path_buf(), opacity.level());
        if let Some(hit) = self.entries.get(&key) {
            debug!(path = %path.display(), "prepared image cache hit");
            return Ok(Arc::clone(hit));
        }
        let prepared = Arc::new(PreparedImage::load(path, opacity, config)?);
        self.entries.insert(key, Arc::clone(&prepared));
        Ok(prepared)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Place `prepared` on every page. The image is embedded once; middle tiles
/// it with random jitter, top and bottom place one copy in their band.
#[instrument(skip_all, fields(position = options.position.code()))]
pub fn apply_image<S, R>(
    surface: &mut S,
    prepared: &PreparedImage,
    options: &WatermarkOptions,
    config: &WatermarkConfig,
    rng: &mut R,
) -> Result<PassSummary, InksealError>
where
    S: PdfSurface + ?Sized,
    R: Rng + ?Sized,
{
    let handle = surface.embed_image(&prepared.image)?;
    let mut summary = PassSummary::default();
    for page in 0..surface.page_count() {
        let result = image_page(surface, page, &handle, options, config, rng);
        summary.record("image", page, result);
    }
    info!(
        pages = summary.pages_done,
        skipped = summary.pages_skipped,
        placements = summary.items,
        "Image watermark applied"
    );
    Ok(summary)
}

fn image_page<S, R>(
    surface: &mut S,
    page: u32,
    handle: &ImageHandle,
    options: &WatermarkOptions,
    config: &WatermarkConfig,
    rng: &mut R,
) -> Result<u32, InksealError>
where
    S: PdfSurface + ?Sized,
    R: Rng + ?Sized,
{
    let rect = surface.page_rect(page)?;
    let alpha = options.opacity.alpha();
    let (img_w, img_h) = (handle.width as f32, handle.height as f32);

    let rects = match options.position {
        Position::Middle => image_tile_rects(
            &rect,
            img_w,
            img_h,
            config.tile_scale,
            config.tile_gap,
            config.tile_jitter,
            rng,
        ),
        Position::Top | Position::Bottom => {
            vec![single_image_rect(&rect, img_w, img_h, options.position)]
        }
    };
    for placement in &rects {
        surface.insert_image(page, handle, *placement, alpha)?;
    }
    Ok(rects.len() as u32)
}
