// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF writer — turn image and plain-text inputs into PDFs with `printpdf` 0.8
// so they can go through the same watermark pipeline as PDF uploads.
//
// printpdf 0.8 is data-oriented: pages are `PdfPage` values holding a
// `Vec<Op>`, serialised by `PdfDocument::save()`.

use std::path::Path;

use inkseal_core::error::InksealError;
use inkseal_core::{DocumentType, PaperSize};
use printpdf::{
    BuiltinFont, Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg, Point, Pt, RawImage,
    RawImageData, RawImageFormat, TextItem, XObjectTransform,
};
use tracing::{debug, info, instrument, warn};

const DOCUMENT_TITLE: &str = "Inkseal input";
const TEXT_FONT_SIZE_PT: f32 = 11.0;
const TEXT_LINE_HEIGHT_PT: f32 = 14.0;
const TEXT_MARGIN_MM: f32 = 20.0;
const IMAGE_MARGIN_MM: f32 = 10.0;
/// Native resolution assumed for uploaded images.
const IMAGE_DPI: f32 = 150.0;

/// Creates PDFs from raster images or plain text.
pub struct PdfWriter {
    paper_size: PaperSize,
}

impl PdfWriter {
    pub fn new(paper_size: PaperSize) -> Self {
        Self { paper_size }
    }

    fn page_dimensions(&self) -> (Mm, Mm) {
        let (w_mm, h_mm) = self.paper_size.dimensions_mm();
        (Mm(w_mm as f32), Mm(h_mm as f32))
    }

    /// Render an input file to PDF bytes according to its extension.
    ///
    /// PDFs are returned unchanged.
    pub fn render_file(&self, path: impl AsRef<Path>) -> Result<Vec<u8>, InksealError> {
        let path = path.as_ref();
        let kind = DocumentType::from_path(path).ok_or_else(|| {
            InksealError::InvalidInput(format!("unsupported input file {}", path.display()))
        })?;
        let bytes = std::fs::read(path)?;
        match kind {
            DocumentType::Pdf => Ok(bytes),
            DocumentType::Png | DocumentType::Jpeg => self.create_from_image(&bytes),
            DocumentType::PlainText => {
                let text = String::from_utf8(bytes).map_err(|err| {
                    InksealError::InvalidInput(format!("text input is not UTF-8: {err}"))
                })?;
                self.create_from_text(&text)
            }
        }
    }

    // -- Text to PDF ----------------------------------------------------------

    /// Lay plain text out top-to-bottom in Helvetica, wrapping long lines and
    /// breaking pages as needed. Empty input yields one blank page.
    #[instrument(skip(self, text), fields(text_len = text.len()))]
    pub fn create_from_text(&self, text: &str) -> Result<Vec<u8>, InksealError> {
        let (page_w, page_h) = self.page_dimensions();
        let margin_pt = Mm(TEXT_MARGIN_MM).into_pt().0;
        let page_h_pt = page_h.into_pt().0;

        // Average Helvetica glyph width is about half the font size;
        // 1pt = 0.3528mm.
        let glyph_mm = 0.5 * TEXT_FONT_SIZE_PT * 0.3528;
        let max_chars = ((page_w.0 - 2.0 * TEXT_MARGIN_MM) / glyph_mm).max(1.0) as usize;
        let lines_per_page =
            (((page_h_pt - 2.0 * margin_pt) / TEXT_LINE_HEIGHT_PT) as usize).max(1);

        let lines = wrap_text(text, max_chars);
        let mut pages: Vec<PdfPage> = lines
            .chunks(lines_per_page)
            .map(|chunk| {
                let ops = chunk
                    .iter()
                    .enumerate()
                    .flat_map(|(idx, line)| {
                        let y = page_h_pt - margin_pt - idx as f32 * TEXT_LINE_HEIGHT_PT;
                        text_line_ops(line, margin_pt, y)
                    })
                    .collect();
                PdfPage::new(page_w, page_h, ops)
            })
            .collect();
        if pages.is_empty() {
            pages.push(PdfPage::new(page_w, page_h, Vec::new()));
        }

        info!(lines = lines.len(), pages = pages.len(), "Rendered text input");
        let mut doc = PdfDocument::new(DOCUMENT_TITLE);
        doc.with_pages(pages);
        Ok(save(&doc))
    }

    // -- Image to PDF ---------------------------------------------------------

    /// Place an image on a single page, centred and scaled down to fit inside
    /// the margins with its aspect ratio kept.
    #[instrument(skip(self, image_bytes), fields(bytes_len = image_bytes.len()))]
    pub fn create_from_image(&self, image_bytes: &[u8]) -> Result<Vec<u8>, InksealError> {
        let (page_w, page_h) = self.page_dimensions();

        let decoded = ::image::load_from_memory(image_bytes).map_err(|err| {
            InksealError::ImageError(format!("failed to decode image input: {}", err))
        })?;
        let (img_width, img_height) = (decoded.width() as usize, decoded.height() as usize);
        let raw = RawImage {
            pixels: RawImageData::U8(decoded.to_rgb8().into_raw()),
            width: img_width,
            height: img_height,
            data_format: RawImageFormat::RGB8,
            tag: Vec::new(),
        };

        let mut doc = PdfDocument::new(DOCUMENT_TITLE);
        let xobject_id = doc.add_image(&raw);

        let margin_pt = Mm(IMAGE_MARGIN_MM).into_pt().0;
        let usable_w = Mm(page_w.0 - 2.0 * IMAGE_MARGIN_MM).into_pt().0;
        let usable_h = Mm(page_h.0 - 2.0 * IMAGE_MARGIN_MM).into_pt().0;
        let native_w = img_width as f32 / IMAGE_DPI * 72.0;
        let native_h = img_height as f32 / IMAGE_DPI * 72.0;
        let scale = (usable_w / native_w).min(usable_h / native_h).min(1.0);

        let x = margin_pt + (usable_w - native_w * scale) / 2.0;
        let y = margin_pt + (usable_h - native_h * scale) / 2.0;
        debug!(scale, x, y, "Image placed on page");

        let ops = vec![Op::UseXobject {
            id: xobject_id,
            transform: XObjectTransform {
                translate_x: Some(Pt(x)),
                translate_y: Some(Pt(y)),
                scale_x: Some(scale),
                scale_y: Some(scale),
                dpi: Some(IMAGE_DPI),
                rotate: None,
            },
        }];
        doc.with_pages(vec![PdfPage::new(page_w, page_h, ops)]);

        info!(img_width, img_height, "Rendered image input");
        Ok(save(&doc))
    }
}

fn text_line_ops(line: &str, x: f32, y: f32) -> Vec<Op> {
    vec![
        Op::StartTextSection,
        Op::SetTextCursor {
            pos: Point { x: Pt(x), y: Pt(y) },
        },
        Op::SetFontSizeBuiltinFont {
            size: Pt(TEXT_FONT_SIZE_PT),
            font: BuiltinFont::Helvetica,
        },
        Op::WriteTextBuiltinFont {
            items: vec![TextItem::Text(line.to_owned())],
            font: BuiltinFont::Helvetica,
        },
        Op::EndTextSection,
    ]
}

fn save(doc: &PdfDocument) -> Vec<u8> {
    let mut warnings: Vec<PdfWarnMsg> = Vec::new();
    let bytes = doc.save(&PdfSaveOptions::default(), &mut warnings);
    if !warnings.is_empty() {
        warn!(count = warnings.len(), "printpdf reported warnings");
    }
    bytes
}

/// Wrap text so no line exceeds `max_width` characters. Existing newlines
/// are kept; words longer than a line are split.
fn wrap_text(text: &str, max_width: usize) -> Vec<String> {
    let mut lines = Vec::new();

    for paragraph in text.lines() {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let chars: Vec<char> = word.chars().collect();
            for piece in chars.chunks(max_width) {
                let piece: String = piece.iter().collect();
                let needed = if current.is_empty() { 0 } else { 1 } + piece.chars().count();
                if !current.is_empty() && current.chars().count() + needed > max_width {
                    lines.push(std::mem::take(&mut current));
                }
                if !current.is_empty() {
                    current.push(' ');
                }
                current.push_str(&piece);
            }
        }
        lines.push(current);
    }

    // Trailing blank lines add nothing to the page.
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines
}
