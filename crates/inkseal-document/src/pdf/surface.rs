// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page surface — the drawing operations the watermark passes need, backed by
// `lopdf`.
//
// Callers work in top-left-origin page coordinates (y grows downward), the
// way a page looks on screen. The lopdf implementation flips them into PDF
// user space, buffers the operations per page, and writes a single overlay
// content stream for each touched page when the surface is finished.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use image::RgbaImage;
use inkseal_core::error::InksealError;
use inkseal_core::{PageRect, Rect};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat, dictionary};
use tracing::{debug, info, instrument, warn};

use super::metadata::{DocumentMetadata, write_metadata};

/// Fallback page size (A4 portrait, points) when no /MediaBox is found.
const DEFAULT_PAGE_SIZE: (f32, f32) = (595.0, 842.0);

/// Bézier control-point factor for approximating a quarter circle.
const KAPPA: f32 = 0.552_284_8;

/// Resource name prefix for everything Inkseal adds to a page.
const RESOURCE_PREFIX: &str = "Ink";

/// One run of watermark text.
#[derive(Debug, Clone, Copy)]
pub struct TextSpec<'a> {
    pub text: &'a str,
    /// Baseline start, top-left-origin.
    pub origin: (f32, f32),
    pub font_size: f32,
    pub color: [f32; 3],
    pub alpha: f32,
    /// Counter-clockwise rotation in degrees.
    pub rotation: f32,
}

/// A raster image embedded once in the document and placeable on any page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageHandle {
    pub name: String,
    pub object_id: ObjectId,
    pub width: u32,
    pub height: u32,
}

/// Drawing operations used by the watermark passes.
///
/// Pages are addressed by 0-based index.
pub trait PdfSurface {
    fn page_count(&self) -> u32;

    fn page_rect(&self, page: u32) -> Result<PageRect, InksealError>;

    fn insert_text(&mut self, page: u32, spec: &TextSpec<'_>) -> Result<(), InksealError>;

    /// Embed an RGBA image; the alpha channel becomes a soft mask.
    fn embed_image(&mut self, image: &RgbaImage) -> Result<ImageHandle, InksealError>;

    fn insert_image(
        &mut self,
        page: u32,
        image: &ImageHandle,
        rect: Rect,
        alpha: f32,
    ) -> Result<(), InksealError>;

    fn draw_circle(
        &mut self,
        page: u32,
        center: (f32, f32),
        radius: f32,
        color: [f32; 3],
        alpha: f32,
    ) -> Result<(), InksealError>;

    fn set_metadata(&mut self, metadata: &DocumentMetadata) -> Result<(), InksealError>;
}

/// Resources a page overlay refers to.
#[derive(Debug, Default)]
struct PageOverlay {
    operations: Vec<Operation>,
    uses_font: bool,
    graphics_states: BTreeMap<String, ObjectId>,
    xobjects: BTreeMap<String, ObjectId>,
}

/// [`PdfSurface`] over an in-memory `lopdf::Document`.
pub struct LopdfSurface {
    document: Document,
    page_ids: Vec<ObjectId>,
    overlays: BTreeMap<u32, PageOverlay>,
    font_id: Option<ObjectId>,
    /// Alpha (as f32 bits) -> (resource name, ExtGState object).
    graphics_states: HashMap<u32, (String, ObjectId)>,
    image_count: usize,
}

impl LopdfSurface {
    /// Open a PDF from the filesystem.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self, InksealError> {
        let path_ref = path.as_ref();
        let document = Document::load(path_ref).map_err(|err| {
            InksealError::PdfError(format!("failed to open {}: {}", path_ref.display(), err))
        })?;
        info!("Opened PDF for watermarking: {}", path_ref.display());
        Ok(Self::from_document(document))
    }

    /// Load a surface from PDF bytes already in memory.
    pub fn from_bytes(data: &[u8]) -> Result<Self, InksealError> {
        let document = Document::load_mem(data).map_err(|err| {
            InksealError::PdfError(format!("failed to load PDF from memory: {}", err))
        })?;
        Ok(Self::from_document(document))
    }

    pub fn from_document(document: Document) -> Self {
        // get_pages is keyed by 1-based page number in page-tree order.
        let page_ids: Vec<ObjectId> = document.get_pages().into_values().collect();
        debug!(pages = page_ids.len(), "surface ready");
        Self {
            document,
            page_ids,
            overlays: BTreeMap::new(),
            font_id: None,
            graphics_states: HashMap::new(),
            image_count: 0,
        }
    }

    /// Write every buffered overlay into the document and hand it back.
    #[instrument(skip(self), fields(pages = self.overlays.len()))]
    pub fn into_document(mut self) -> Result<Document, InksealError> {
        let overlays = std::mem::take(&mut self.overlays);
        for (page, overlay) in overlays {
            let page_id = self.page_id(page)?;
            self.commit_overlay(page_id, overlay)?;
        }
        Ok(self.document)
    }

    fn page_id(&self, page: u32) -> Result<ObjectId, InksealError> {
        self.page_ids.get(page as usize).copied().ok_or_else(|| {
            InksealError::PdfError(format!(
                "page {} out of range (document has {} pages)",
                page + 1,
                self.page_ids.len()
            ))
        })
    }

    fn overlay(&mut self, page: u32) -> Result<&mut PageOverlay, InksealError> {
        self.page_id(page)?;
        Ok(self.overlays.entry(page).or_default())
    }

    fn to_user_space(&self, page: u32, point: (f32, f32)) -> Result<(f32, f32), InksealError> {
        let rect = self.page_rect(page)?;
        Ok((rect.x0 + point.0, rect.y0 + rect.height - point.1))
    }

    fn font(&mut self) -> ObjectId {
        if let Some(id) = self.font_id {
            return id;
        }
        let id = self.document.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Times-Italic",
            "Encoding" => "WinAnsiEncoding",
        });
        self.font_id = Some(id);
        id
    }

    /// ExtGState for a fill/stroke alpha, shared across pages.
    fn graphics_state(&mut self, alpha: f32) -> (String, ObjectId) {
        let alpha = alpha.clamp(0.0, 1.0);
        if let Some(entry) = self.graphics_states.get(&alpha.to_bits()) {
            return entry.clone();
        }
        let name = format!("{RESOURCE_PREFIX}GS{}", self.graphics_states.len());
        let id = self.document.add_object(dictionary! {
            "Type" => "ExtGState",
            "CA" => Object::Real(alpha),
            "ca" => Object::Real(alpha),
        });
        self.graphics_states.insert(alpha.to_bits(), (name.clone(), id));
        (name, id)
    }

    fn push_alpha(&mut self, page: u32, alpha: f32) -> Result<Operation, InksealError> {
        let (name, id) = self.graphics_state(alpha);
        self.overlay(page)?.graphics_states.insert(name.clone(), id);
        Ok(Operation::new("gs", vec![Object::Name(name.into_bytes())]))
    }

    /// Append the overlay to the page: the existing content is wrapped in
    /// q/Q so its graphics state cannot leak into ours.
    fn commit_overlay(
        &mut self,
        page_id: ObjectId,
        overlay: PageOverlay,
    ) -> Result<(), InksealError> {
        if overlay.operations.is_empty() {
            return Ok(());
        }

        let mut resources = effective_resources(&self.document, page_id)?;
        if overlay.uses_font {
            let font_id = self.font();
            let font = [(format!("{RESOURCE_PREFIX}F1"), font_id)];
            merge_resources(&self.document, &mut resources, b"Font", &font);
        }
        let states: Vec<(String, ObjectId)> = overlay.graphics_states.into_iter().collect();
        merge_resources(&self.document, &mut resources, b"ExtGState", &states);
        let xobjects: Vec<(String, ObjectId)> = overlay.xobjects.into_iter().collect();
        merge_resources(&self.document, &mut resources, b"XObject", &xobjects);

        let op_count = overlay.operations.len();
        let content = Content {
            operations: overlay.operations,
        }
        .encode()
        .map_err(|err| InksealError::PdfError(format!("failed to encode overlay: {err}")))?;

        let save_id = self
            .document
            .add_object(Stream::new(dictionary! {}, b"q\n".to_vec()));
        let mut overlay_bytes = b"Q\n".to_vec();
        overlay_bytes.extend_from_slice(&content);
        let overlay_id = self
            .document
            .add_object(Stream::new(dictionary! {}, overlay_bytes));

        let mut contents = existing_contents(&self.document, page_id)?;
        contents.insert(0, Object::Reference(save_id));
        contents.push(Object::Reference(overlay_id));

        let page_dict = self
            .document
            .get_object_mut(page_id)
            .and_then(|o| o.as_dict_mut())
            .map_err(|err| InksealError::PdfError(format!("page {page_id:?} unreadable: {err}")))?;
        page_dict.set("Contents", Object::Array(contents));
        page_dict.set("Resources", Object::Dictionary(resources));

        debug!(?page_id, op_count, "overlay committed");
        Ok(())
    }
}

impl PdfSurface for LopdfSurface {
    fn page_count(&self) -> u32 {
        self.page_ids.len() as u32
    }

    fn page_rect(&self, page: u32) -> Result<PageRect, InksealError> {
        let page_id = self.page_id(page)?;
        Ok(page_rect_of(&self.document, page_id))
    }

    fn insert_text(&mut self, page: u32, spec: &TextSpec<'_>) -> Result<(), InksealError> {
        let (x, y) = self.to_user_space(page, spec.origin)?;
        let gs = self.push_alpha(page, spec.alpha)?;
        let (sin, cos) = spec.rotation.to_radians().sin_cos();
        let [r, g, b] = spec.color;

        let overlay = self.overlay(page)?;
        overlay.uses_font = true;
        overlay.operations.extend([
            Operation::new("q", vec![]),
            gs,
            Operation::new("rg", vec![Object::Real(r), Object::Real(g), Object::Real(b)]),
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![
                    Object::Name(format!("{RESOURCE_PREFIX}F1").into_bytes()),
                    Object::Real(spec.font_size),
                ],
            ),
            Operation::new(
                "Tm",
                vec![
                    Object::Real(cos),
                    Object::Real(sin),
                    Object::Real(-sin),
                    Object::Real(cos),
                    Object::Real(x),
                    Object::Real(y),
                ],
            ),
            Operation::new(
                "Tj",
                vec![Object::String(encode_win_ansi(spec.text), StringFormat::Literal)],
            ),
            Operation::new("ET", vec![]),
            Operation::new("Q", vec![]),
        ]);
        Ok(())
    }

    fn embed_image(&mut self, image: &RgbaImage) -> Result<ImageHandle, InksealError> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(InksealError::ImageError("cannot embed an empty image".into()));
        }

        let mut rgb = Vec::with_capacity((width * height * 3) as usize);
        let mut alpha = Vec::with_capacity((width * height) as usize);
        for pixel in image.pixels() {
            rgb.extend_from_slice(&pixel.0[..3]);
            alpha.push(pixel.0[3]);
        }

        let mut smask = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width as i64,
                "Height" => height as i64,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
            },
            alpha,
        );
        compress_stream(&mut smask);
        let smask_id = self.document.add_object(smask);

        let mut stream = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width as i64,
                "Height" => height as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
                "SMask" => smask_id,
            },
            rgb,
        );
        compress_stream(&mut stream);
        let object_id = self.document.add_object(stream);

        let name = format!("{RESOURCE_PREFIX}Im{}", self.image_count);
        self.image_count += 1;
        debug!(%name, width, height, "image embedded");
        Ok(ImageHandle {
            name,
            object_id,
            width,
            height,
        })
    }

    fn insert_image(
        &mut self,
        page: u32,
        image: &ImageHandle,
        rect: Rect,
        alpha: f32,
    ) -> Result<(), InksealError> {
        // Image space is anchored at the rectangle's lower-left corner.
        let (x, y) = self.to_user_space(page, (rect.x, rect.y + rect.height))?;
        let gs = self.push_alpha(page, alpha)?;

        let overlay = self.overlay(page)?;
        overlay
            .xobjects
            .insert(image.name.clone(), image.object_id);
        overlay.operations.extend([
            Operation::new("q", vec![]),
            gs,
            Operation::new(
                "cm",
                vec![
                    Object::Real(rect.width),
                    Object::Real(0.0),
                    Object::Real(0.0),
                    Object::Real(rect.height),
                    Object::Real(x),
                    Object::Real(y),
                ],
            ),
            Operation::new("Do", vec![Object::Name(image.name.clone().into_bytes())]),
            Operation::new("Q", vec![]),
        ]);
        Ok(())
    }

    fn draw_circle(
        &mut self,
        page: u32,
        center: (f32, f32),
        radius: f32,
        color: [f32; 3],
        alpha: f32,
    ) -> Result<(), InksealError> {
        let (cx, cy) = self.to_user_space(page, center)?;
        let gs = self.push_alpha(page, alpha)?;
        let [r, g, b] = color;
        let k = radius * KAPPA;

        let curve = |points: [f32; 6]| {
            Operation::new("c", points.iter().map(|v| Object::Real(*v)).collect())
        };

        let overlay = self.overlay(page)?;
        overlay.operations.extend([
            Operation::new("q", vec![]),
            gs,
            Operation::new("rg", vec![Object::Real(r), Object::Real(g), Object::Real(b)]),
            Operation::new("m", vec![Object::Real(cx + radius), Object::Real(cy)]),
            curve([cx + radius, cy + k, cx + k, cy + radius, cx, cy + radius]),
            curve([cx - k, cy + radius, cx - radius, cy + k, cx - radius, cy]),
            curve([cx - radius, cy - k, cx - k, cy - radius, cx, cy - radius]),
            curve([cx + k, cy - radius, cx + radius, cy - k, cx + radius, cy]),
            Operation::new("f", vec![]),
            Operation::new("Q", vec![]),
        ]);
        Ok(())
    }

    fn set_metadata(&mut self, metadata: &DocumentMetadata) -> Result<(), InksealError> {
        write_metadata(&mut self.document, metadata)
    }
}

// -- Page geometry ----------------------------------------------------------

/// Page rectangle from the /MediaBox, following /Parent inheritance.
pub(crate) fn page_rect_of(doc: &Document, page_id: ObjectId) -> PageRect {
    let mut current = Some(page_id);
    while let Some(id) = current {
        let Ok(dict) = doc.get_object(id).and_then(|o| o.as_dict()) else {
            break;
        };
        if let Some(rect) = media_box(doc, dict) {
            return rect;
        }
        current = dict.get(b"Parent").and_then(|p| p.as_reference()).ok();
    }
    warn!(?page_id, "no /MediaBox found, assuming A4");
    PageRect::new(0.0, 0.0, DEFAULT_PAGE_SIZE.0, DEFAULT_PAGE_SIZE.1)
}

fn media_box(doc: &Document, dict: &Dictionary) -> Option<PageRect> {
    let resolved = resolve(doc, dict.get(b"MediaBox").ok()?)?;
    let values: Vec<f32> = resolved
        .as_array()
        .ok()?
        .iter()
        .filter_map(|o| resolve(doc, o).and_then(number))
        .collect();
    if values.len() != 4 {
        return None;
    }
    let (llx, lly) = (values[0].min(values[2]), values[1].min(values[3]));
    let (urx, ury) = (values[0].max(values[2]), values[1].max(values[3]));
    Some(PageRect::new(llx, lly, urx - llx, ury - lly))
}

pub(crate) fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(f) => Some(*f),
        _ => None,
    }
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

// -- Resources ----------------------------------------------------------------

/// The page's resources as an owned dictionary, including resources
/// inherited from ancestor page-tree nodes.
fn effective_resources(doc: &Document, page_id: ObjectId) -> Result<Dictionary, InksealError> {
    let mut current = Some(page_id);
    while let Some(id) = current {
        let dict = doc
            .get_object(id)
            .and_then(|o| o.as_dict())
            .map_err(|err| InksealError::PdfError(format!("page tree node {id:?}: {err}")))?;
        if let Ok(resources) = dict.get(b"Resources") {
            return match resolve(doc, resources) {
                Some(Object::Dictionary(found)) => Ok(found.clone()),
                _ => Ok(Dictionary::new()),
            };
        }
        current = dict.get(b"Parent").and_then(|p| p.as_reference()).ok();
    }
    Ok(Dictionary::new())
}

/// Add `entries` to a named sub-dictionary of `resources` (/Font,
/// /ExtGState, /XObject), inlining a referenced sub-dictionary first.
/// The page's content streams as a flat list of references. A `/Contents`
/// reference to an array of streams is expanded into its items.
fn existing_contents(doc: &Document, page_id: ObjectId) -> Result<Vec<Object>, InksealError> {
    let page = doc
        .get_dictionary(page_id)
        .map_err(|err| InksealError::PdfError(format!("page {page_id:?} unreadable: {err}")))?;

    let contents = match page.get(b"Contents") {
        Ok(Object::Reference(id)) => match doc.get_object(*id) {
            Ok(Object::Array(items)) => items.clone(),
            _ => vec![Object::Reference(*id)],
        },
        Ok(Object::Array(items)) => items.clone(),
        Ok(other) => {
            warn!(?page_id, ?other, "unexpected /Contents, replacing");
            Vec::new()
        }
        Err(_) => Vec::new(),
    };
    Ok(contents)
}

fn merge_resources(
    doc: &Document,
    resources: &mut Dictionary,
    key: &[u8],
    entries: &[(String, ObjectId)],
) {
    if entries.is_empty() {
        return;
    }
    let mut merged = match resources.get(key) {
        Ok(Object::Dictionary(dict)) => dict.clone(),
        Ok(Object::Reference(id)) => doc
            .get_object(*id)
            .and_then(|o| o.as_dict())
            .cloned()
            .unwrap_or_else(|_| Dictionary::new()),
        _ => Dictionary::new(),
    };
    for (name, id) in entries {
        merged.set(name.clone(), *id);
    }
    resources.set(key.to_vec(), Object::Dictionary(merged));
}

fn compress_stream(stream: &mut Stream) {
    if let Err(err) = stream.compress() {
        warn!(%err, "stream compression failed, storing uncompressed");
    }
}

/// Encode text for a WinAnsi Type1 font. Characters outside Latin-1 are
/// shown as `?`.
pub(crate) fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c as u32 {
            0x20..=0x7E | 0xA0..=0xFF => c as u32 as u8,
            _ => b'?',
        })
        .collect()
}
