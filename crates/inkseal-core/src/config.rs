// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Watermark configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::Result;

/// Settings that shape a watermark run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatermarkConfig {
    /// File name of the result inside the request directory.
    pub output_file_name: String,
    /// Reply that aborts input collection.
    pub exit_sentinel: String,
    /// Invalid replies tolerated before the collector gives up.
    pub max_prompts: u32,
    /// Accepted extensions for image watermarks (lowercase, no dot).
    pub image_extensions: Vec<String>,
    /// Pixels with every channel above this value become transparent.
    pub white_threshold: u8,
    /// Lower bound (inclusive) of the extra clearing pass for non-opaque
    /// image watermarks.
    pub opacity_pass_min: u8,
    /// Upper bound (exclusive) of the extra clearing pass.
    pub opacity_pass_max: u8,
    /// Gaussian sigma used to soften edges after background removal.
    /// Zero disables smoothing.
    pub smoothing_sigma: f32,
    /// Scale applied to image tiles on middle placement.
    pub tile_scale: f32,
    /// Gap between image tiles as a multiple of the tile size.
    pub tile_gap: f32,
    /// Maximum random offset (points) applied to each image tile.
    pub tile_jitter: f32,
    /// Page height divisor for tiled text font size.
    pub tiled_font_divisor: f32,
    /// Page height divisor for single text font size.
    pub single_font_divisor: f32,
    /// Rotation (degrees) for tiled text.
    pub tiled_rotation: f32,
    /// Paper size used when image or text inputs are turned into PDFs.
    pub paper_size: crate::PaperSize,
    pub protection: ProtectionConfig,
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            output_file_name: "outPut.pdf".into(),
            exit_sentinel: "/exit".into(),
            max_prompts: 5,
            image_extensions: vec!["png".into(), "jpeg".into(), "jpg".into()],
            white_threshold: 240,
            opacity_pass_min: 200,
            opacity_pass_max: 255,
            smoothing_sigma: 0.6,
            tile_scale: 0.2,
            tile_gap: 1.5,
            tile_jitter: 6.0,
            tiled_font_divisor: 30.0,
            single_font_divisor: 20.0,
            tiled_rotation: 45.0,
            paper_size: crate::PaperSize::A4,
            protection: ProtectionConfig::default(),
        }
    }
}

/// Toggles for the additive decoration layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtectionConfig {
    pub forensic: bool,
    pub steganography: bool,
    pub multilayer: bool,
    pub signature: bool,
}

impl ProtectionConfig {
    /// All layers off; only the visible watermark is drawn.
    pub fn disabled() -> Self {
        Self {
            forensic: false,
            steganography: false,
            multilayer: false,
            signature: false,
        }
    }
}

impl Default for ProtectionConfig {
    fn default() -> Self {
        Self {
            forensic: true,
            steganography: true,
            multilayer: true,
            signature: true,
        }
    }
}

impl WatermarkConfig {
    /// Load a JSON config file. A missing or unreadable file yields defaults.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let data = match std::fs::read_to_string(path) {
            Ok(data) => data,
            Err(err) => {
                warn!(path = %path.display(), %err, "config not readable, using defaults");
                return Self::default();
            }
        };
        match serde_json::from_str(&data) {
            Ok(config) => {
                info!(path = %path.display(), "config loaded");
                config
            }
            Err(err) => {
                warn!(path = %path.display(), %err, "config invalid, using defaults");
                Self::default()
            }
        }
    }

    /// Write the config as pretty JSON.
    pub fn persist(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }

    /// Whether `ext` (without dot, any case) is an accepted image extension.
    pub fn accepts_image_extension(&self, ext: &str) -> bool {
        let ext = ext.to_ascii_lowercase();
        self.image_extensions.iter().any(|allowed| *allowed == ext)
    }
}
