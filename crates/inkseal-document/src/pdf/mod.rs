// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module — page surface for drawing, metadata, reading, creating PDFs
// from images or text, and persisting with a fallback save mode.

pub mod metadata;
pub mod persist;
pub mod reader;
pub mod surface;
pub mod writer;

pub use metadata::DocumentMetadata;
pub use persist::{CompactSave, DirectSave, Persister, SaveMode};
pub use reader::PdfReader;
pub use surface::{ImageHandle, LopdfSurface, PdfSurface, TextSpec};
pub use writer::PdfWriter;

#[cfg(test)]
pub(crate) mod testing {
    use lopdf::{Document, Object, Stream, dictionary};

    /// Serialise a PDF with `pages` empty pages of the given size.
    pub(crate) fn blank_pdf(pages: u32, width: f32, height: f32) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let kids: Vec<Object> = (0..pages)
            .map(|_| {
                let content_id = doc.add_object(Stream::new(dictionary! {}, Vec::new()));
                let page_id = doc.add_object(dictionary! {
                    "Type" => "Page",
                    "Parent" => pages_id,
                    "Contents" => content_id,
                });
                Object::Reference(page_id)
            })
            .collect();

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => pages as i64,
                "Resources" => dictionary! {},
                "MediaBox" => vec![0.into(), 0.into(), Object::Real(width), Object::Real(height)],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).expect("blank PDF serialises");
        bytes
    }
}
