// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for watermark requests.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

/// Unique identifier for a single watermark request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What the watermark is made of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WatermarkKind {
    Text,
    Image,
    /// Collected like an image but not applicable to pages.
    Pdf,
}

impl WatermarkKind {
    /// Callback type code (`txt`, `img`, `pdf`).
    pub fn code(&self) -> &'static str {
        match self {
            Self::Text => "txt",
            Self::Image => "img",
            Self::Pdf => "pdf",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "txt" => Some(Self::Text),
            "img" => Some(Self::Image),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }
}

/// Watermark opacity on a 0..=10 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Opacity(u8);

impl Opacity {
    pub const MAX: u8 = 10;
    pub const DEFAULT: u8 = 5;

    /// Build an opacity, clamping to `0..=10`.
    pub fn new(level: u8) -> Self {
        Self(level.min(Self::MAX))
    }

    /// Parse an opacity token such as `op08`.
    ///
    /// Only the last two characters are read. Tokens that are not numeric
    /// fall back to [`Opacity::DEFAULT`].
    pub fn from_token(token: &str) -> Self {
        let chars: Vec<char> = token.trim().chars().collect();
        let tail: String = chars[chars.len().saturating_sub(2)..].iter().collect();
        match tail.parse::<u8>() {
            Ok(level) => Self::new(level),
            Err(_) => {
                warn!(token, "unrecognised opacity, using default");
                Self(Self::DEFAULT)
            }
        }
    }

    pub fn level(&self) -> u8 {
        self.0
    }

    /// Alpha value applied to drawing operations (`level / 10`).
    pub fn alpha(&self) -> f32 {
        f32::from(self.0) / 10.0
    }

    pub fn is_opaque(&self) -> bool {
        self.0 == Self::MAX
    }
}

impl Default for Opacity {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}

/// Vertical band the watermark is anchored to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Position {
    Top,
    /// Middle placements are tiled across the whole page.
    Middle,
    Bottom,
}

impl Position {
    /// Resolve a position code. Anything outside `T`, `M`, `B` is `Middle`.
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_ascii_uppercase().as_str() {
            "T" => Self::Top,
            "M" => Self::Middle,
            "B" => Self::Bottom,
            other => {
                warn!(code = other, "unrecognised position, using middle");
                Self::Middle
            }
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Top => "T",
            Self::Middle => "M",
            Self::Bottom => "B",
        }
    }
}

/// The nine named watermark colours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NamedColor {
    Red,
    Green,
    Navy,
    Yellow,
    Orange,
    Violet,
    Chocolate,
    Black,
    White,
}

impl NamedColor {
    /// Resolve a colour code. Unknown codes are black.
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_ascii_uppercase().as_str() {
            "R" => Self::Red,
            "G" => Self::Green,
            "N" => Self::Navy,
            "Y" => Self::Yellow,
            "O" => Self::Orange,
            "V" => Self::Violet,
            "C" => Self::Chocolate,
            "B" => Self::Black,
            "W" => Self::White,
            other => {
                warn!(code = other, "unrecognised colour, using black");
                Self::Black
            }
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Red => "R",
            Self::Green => "G",
            Self::Navy => "N",
            Self::Yellow => "Y",
            Self::Orange => "O",
            Self::Violet => "V",
            Self::Chocolate => "C",
            Self::Black => "B",
            Self::White => "W",
        }
    }

    /// Device RGB components in `0.0..=1.0`.
    pub fn rgb(&self) -> [f32; 3] {
        match self {
            Self::Red => [1.0, 0.0, 0.0],
            Self::Green => [0.0, 1.0, 0.0],
            Self::Navy => [0.0, 0.0, 1.0],
            Self::Yellow => [1.0, 1.0, 0.0],
            Self::Orange => [1.0, 0.65, 0.0],
            Self::Violet => [0.93, 0.51, 0.93],
            Self::Chocolate => [0.65, 0.24, 0.24],
            Self::Black => [0.0, 0.0, 0.0],
            Self::White => [1.0, 1.0, 1.0],
        }
    }
}

/// Normalised options carried by a watermark callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatermarkOptions {
    pub kind: WatermarkKind,
    pub opacity: Opacity,
    pub position: Position,
    pub color: NamedColor,
}

/// The watermark content supplied by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatermarkPayload {
    Text(String),
    /// A downloaded image (or PDF) file.
    File(PathBuf),
}

/// A complete, normalised watermark request.
#[derive(Debug, Clone)]
pub struct WatermarkRequest {
    pub options: WatermarkOptions,
    pub payload: WatermarkPayload,
}

impl WatermarkRequest {
    pub fn text(options: WatermarkOptions, text: impl Into<String>) -> Self {
        Self {
            options,
            payload: WatermarkPayload::Text(text.into()),
        }
    }

    pub fn file(options: WatermarkOptions, path: impl Into<PathBuf>) -> Self {
        Self {
            options,
            payload: WatermarkPayload::File(path.into()),
        }
    }
}

/// Page rectangle in PDF points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageRect {
    pub x0: f32,
    pub y0: f32,
    pub width: f32,
    pub height: f32,
}

impl PageRect {
    pub fn new(x0: f32, y0: f32, width: f32, height: f32) -> Self {
        Self {
            x0,
            y0,
            width,
            height,
        }
    }

    /// Whether a top-left-origin rectangle overlaps this page.
    pub fn intersects(&self, rect: &Rect) -> bool {
        rect.x < self.width && rect.x + rect.width > 0.0 && rect.y < self.height
            && rect.y + rect.height > 0.0
    }
}

/// A placement rectangle relative to the page's top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Counters describing what a watermark run added to the document.
///
/// Used for the summary message and logs only; it is never checked against
/// the written file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProtectionReport {
    pub layers_added: u32,
    pub pages_watermarked: u32,
    pub pages_skipped: u32,
    pub text_objects: u32,
    pub image_placements: u32,
    pub background_removed: bool,
    pub steganography: bool,
    pub stego_bits: u32,
    pub forensic_points: u32,
    pub forensic_id: Option<String>,
    pub multilayer: bool,
    pub micro_dots: u32,
    pub encoded_position: Option<String>,
    pub document_id: Option<String>,
}

/// Kinds of input document the workflow accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentType {
    Pdf,
    Jpeg,
    Png,
    PlainText,
}

impl DocumentType {
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::PlainText => "text/plain",
        }
    }

    /// Infer document type from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "txt" => Some(Self::PlainText),
            _ => None,
        }
    }

    pub fn from_path(path: &std::path::Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }
}

/// Standard paper sizes for PDFs created from image or text inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaperSize {
    A4,
    A5,
    Letter,
    Legal,
    Custom { width_mm: u32, height_mm: u32 },
}

impl PaperSize {
    /// Dimensions in millimetres (width, height).
    pub fn dimensions_mm(&self) -> (u32, u32) {
        match self {
            Self::A4 => (210, 297),
            Self::A5 => (148, 210),
            Self::Letter => (216, 279),
            Self::Legal => (216, 356),
            Self::Custom {
                width_mm,
                height_mm,
            } => (*width_mm, *height_mm),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_position_is_middle() {
        for code in ["X", "", "top", "MM", "9"] {
            assert_eq!(Position::from_code(code), Position::Middle, "code {code:?}");
        }
        assert_eq!(Position::from_code(" t "), Position::Top);
        assert_eq!(Position::from_code("b"), Position::Bottom);
    }

    #[test]
    fn unknown_color_is_black() {
        for code in ["P", "", "red", "Z"] {
            assert_eq!(NamedColor::from_code(code), NamedColor::Black);
            assert_eq!(NamedColor::from_code(code).rgb(), [0.0, 0.0, 0.0]);
        }
        assert_eq!(NamedColor::from_code("o").rgb(), [1.0, 0.65, 0.0]);
    }

    #[test]
    fn opacity_reads_last_two_characters() {
        let op = Opacity::from_token("op08");
        assert_eq!(op.level(), 8);
        assert!((op.alpha() - 0.8).abs() < f32::EPSILON);

        assert_eq!(Opacity::from_token("op10").level(), 10);
        assert_eq!(Opacity::from_token("7").level(), 7);
        // 99 is clamped rather than rejected.
        assert_eq!(Opacity::from_token("op99").level(), 10);
    }

    #[test]
    fn opacity_non_numeric_defaults() {
        assert_eq!(Opacity::from_token("opxx").level(), Opacity::DEFAULT);
        assert_eq!(Opacity::from_token("").level(), Opacity::DEFAULT);
    }

    #[test]
    fn page_rect_intersection() {
        let page = PageRect::new(0.0, 0.0, 100.0, 200.0);
        assert!(page.intersects(&Rect::new(90.0, 190.0, 20.0, 20.0)));
        assert!(!page.intersects(&Rect::new(100.0, 0.0, 10.0, 10.0)));
        assert!(!page.intersects(&Rect::new(-20.0, 10.0, 20.0, 10.0)));
    }

    #[test]
    fn document_type_from_path() {
        let path = std::path::Path::new("/tmp/logo.JPG");
        assert_eq!(DocumentType::from_path(path), Some(DocumentType::Jpeg));
        assert_eq!(DocumentType::from_path(std::path::Path::new("a.docx")), None);
    }
}
