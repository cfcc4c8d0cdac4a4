// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Watermark geometry — anchors for single placements and tile grids for
// the middle position. All coordinates are top-left-origin page points.

use inkseal_core::{NamedColor, PageRect, Position, Rect};
use rand::Rng;

/// Average glyph advance as a fraction of the font size.
const GLYPH_WIDTH_FACTOR: f32 = 0.5;

/// Colour triple for a colour code. Unknown codes give black.
pub fn resolve_color(code: &str) -> [f32; 3] {
    NamedColor::from_code(code).rgb()
}

/// Position for a position code. Unknown codes give [`Position::Middle`].
pub fn resolve_position(code: &str) -> Position {
    Position::from_code(code)
}

/// Estimated width of `text` set at `font_size` in the watermark font.
pub fn text_width(text: &str, font_size: f32) -> f32 {
    text.chars().count() as f32 * font_size * GLYPH_WIDTH_FACTOR
}

/// Where a single watermark starts on a page: horizontally centred, with
/// the vertical band chosen by `position`. Values are truncated to whole
/// points.
pub fn anchor(page_w: f32, page_h: f32, text_w: f32, position: Position) -> (f32, f32) {
    let x = ((page_w - text_w) / 2.0).trunc();
    let band = page_h / 20.0;
    let y = match position {
        Position::Top => band,
        Position::Middle => (page_h - band) / 2.0,
        Position::Bottom => page_h - band,
    };
    (x, y.trunc())
}

/// Baseline origins for the tiled text watermark.
///
/// The grid covers three times the page in each direction so the rotated
/// rows still reach the corners. Every other row is shifted by half a
/// column to give a brick pattern.
pub fn text_tile_positions(rect: &PageRect, text_w: f32, font_size: f32) -> Vec<(f32, f32)> {
    let h = rect.height.trunc() as i64;
    let w = rect.width.trunc() as i64;
    let vs = ((font_size * 5.0).trunc() as i64).max(1);
    let hs = ((text_w * 1.5).trunc() as i64).max(1);
    let half_column = hs as f32 / 2.0;

    let mut positions = Vec::new();
    for i in (-h..2 * h).step_by(vs as usize) {
        let offset = i.div_euclid(vs).rem_euclid(2) as f32 * half_column;
        for j in (-w..2 * w).step_by(hs as usize) {
            positions.push((j as f32 + offset, i as f32));
        }
    }
    positions
}

/// Rectangles for the tiled image watermark.
///
/// Tiles are `scale` times the image size, spaced `gap` tile-sizes apart,
/// brick-offset on odd rows, and nudged by up to `jitter` points on each
/// axis. Tiles that end up off the page are dropped.
pub fn image_tile_rects<R: Rng + ?Sized>(
    rect: &PageRect,
    img_w: f32,
    img_h: f32,
    scale: f32,
    gap: f32,
    jitter: f32,
    rng: &mut R,
) -> Vec<Rect> {
    let tile_w = img_w * scale;
    let tile_h = img_h * scale;
    let gap_x = ((tile_w * gap).trunc() as i64).max(1);
    let gap_y = ((tile_h * gap).trunc() as i64).max(1);
    let half_gap = gap_x as f32 / 2.0;
    let jitter = jitter.abs();

    let mut tiles = Vec::new();
    for y in (0..rect.height.trunc() as i64).step_by(gap_y as usize) {
        let offset = y.div_euclid(gap_y).rem_euclid(2) as f32 * half_gap;
        for x in (0..rect.width.trunc() as i64).step_by(gap_x as usize) {
            let (dx, dy) = if jitter > 0.0 {
                (
                    rng.random_range(-jitter..=jitter),
                    rng.random_range(-jitter..=jitter),
                )
            } else {
                (0.0, 0.0)
            };
            let tile = Rect::new(x as f32 + offset + dx, y as f32 + dy, tile_w, tile_h);
            if rect.intersects(&tile) {
                tiles.push(tile);
            }
        }
    }
    tiles
}

/// Rectangle for a single image watermark: scaled down to the page width
/// when wider (never up), centred, and placed in the top or bottom band.
pub fn single_image_rect(rect: &PageRect, img_w: f32, img_h: f32, position: Position) -> Rect {
    let scale = if img_w > rect.width { rect.width / img_w } else { 1.0 };
    let (w, h) = (img_w * scale, img_h * scale);
    let x = ((rect.width - w) / 2.0).max(0.0);
    let band = (rect.height / 20.0).trunc();
    let y = match position {
        Position::Bottom => (rect.height - band - h).max(0.0),
        Position::Top | Position::Middle => band,
    };
    Rect::new(x, y, w, h)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn a4() -> PageRect {
        PageRect::new(0.0, 0.0, 595.0, 842.0)
    }

    #[test]
    fn unknown_codes_fall_back() {
        assert_eq!(resolve_position("Q"), Position::Middle);
        assert_eq!(resolve_color("purple"), [0.0, 0.0, 0.0]);
        assert_eq!(resolve_color("R"), [1.0, 0.0, 0.0]);
    }

    #[test]
    fn anchors_follow_position_bands() {
        assert_eq!(anchor(600.0, 800.0, 100.0, Position::Top), (250.0, 40.0));
        assert_eq!(anchor(600.0, 800.0, 100.0, Position::Middle), (250.0, 380.0));
        assert_eq!(anchor(600.0, 800.0, 100.0, Position::Bottom), (250.0, 760.0));
    }

    #[test]
    fn anchor_truncates_fractions() {
        let (x, y) = anchor(595.0, 842.0, 100.0, Position::Top);
        assert_eq!((x, y), (247.0, 42.0));
    }

    #[test]
    fn text_width_scales_with_length() {
        assert_eq!(text_width("ABCD", 10.0), 20.0);
        assert_eq!(text_width("", 10.0), 0.0);
    }

    #[test]
    fn text_tiles_are_brick_offset() {
        let rect = PageRect::new(0.0, 0.0, 100.0, 100.0);
        let tiles = text_tile_positions(&rect, 20.0, 4.0);
        // vs = 20, hs = 30: rows -100..200 step 20, cols -100..200 step 30.
        assert_eq!(tiles.len(), 15 * 10);
        // Row -100 sits at -100 div 20 = -5, an odd row, so it is shifted.
        assert_eq!(tiles[0], (-85.0, -100.0));
        assert_eq!(tiles[10], (-100.0, -80.0));
    }

    #[test]
    fn text_tiles_are_deterministic() {
        let a = text_tile_positions(&a4(), 120.0, 28.0);
        let b = text_tile_positions(&a4(), 120.0, 28.0);
        assert_eq!(a, b);
        assert!(!a.is_empty());
    }

    #[test]
    fn degenerate_text_width_still_terminates() {
        let tiles = text_tile_positions(&PageRect::new(0.0, 0.0, 10.0, 10.0), 0.0, 0.0);
        assert_eq!(tiles.len(), 30 * 30);
    }

    #[test]
    fn image_tiles_stay_on_page() {
        let mut rng = StdRng::seed_from_u64(7);
        let rect = a4();
        let tiles = image_tile_rects(&rect, 400.0, 200.0, 0.2, 1.5, 6.0, &mut rng);
        assert!(!tiles.is_empty());
        for tile in &tiles {
            assert!(rect.intersects(tile));
            assert_eq!((tile.width, tile.height), (80.0, 40.0));
        }
    }

    #[test]
    fn image_tiles_without_jitter_are_reproducible() {
        let rect = a4();
        let a = image_tile_rects(&rect, 100.0, 100.0, 0.2, 1.5, 0.0, &mut StdRng::seed_from_u64(1));
        let b = image_tile_rects(&rect, 100.0, 100.0, 0.2, 1.5, 0.0, &mut StdRng::seed_from_u64(2));
        assert_eq!(a, b);
        // gap 30: second row is shifted by 15.
        assert_eq!(a[0].x, 0.0);
        let second_row = a.iter().find(|t| t.y == 30.0).unwrap();
        assert_eq!(second_row.x, 15.0);
    }

    #[test]
    fn single_image_is_never_upscaled() {
        let small = single_image_rect(&a4(), 100.0, 50.0, Position::Top);
        assert_eq!((small.width, small.height), (100.0, 50.0));
        assert_eq!(small.x, 247.5);
        assert_eq!(small.y, 42.0);

        let wide = single_image_rect(&a4(), 1190.0, 100.0, Position::Bottom);
        assert_eq!((wide.width, wide.height), (595.0, 50.0));
        assert_eq!(wide.x, 0.0);
        assert_eq!(wide.y, 842.0 - 42.0 - 50.0);
    }
}
