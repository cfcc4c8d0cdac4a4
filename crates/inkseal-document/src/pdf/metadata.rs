// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document information dictionary (/Info) access.

use inkseal_core::error::InksealError;
use lopdf::{Document, Object, ObjectId, StringFormat, dictionary};
use tracing::debug;

/// The /Info fields Inkseal reads and writes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub keywords: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    /// PDF date string, e.g. `D:20260101120000Z`.
    pub mod_date: Option<String>,
}

impl DocumentMetadata {
    fn fields(&self) -> [(&'static str, Option<&String>); 7] {
        [
            ("Title", self.title.as_ref()),
            ("Author", self.author.as_ref()),
            ("Subject", self.subject.as_ref()),
            ("Keywords", self.keywords.as_ref()),
            ("Creator", self.creator.as_ref()),
            ("Producer", self.producer.as_ref()),
            ("ModDate", self.mod_date.as_ref()),
        ]
    }
}

/// Read the /Info dictionary. Missing dictionaries yield empty metadata.
pub fn read_metadata(doc: &Document) -> DocumentMetadata {
    let info = match doc.trailer.get(b"Info") {
        Ok(Object::Reference(id)) => doc.get_object(*id).and_then(|o| o.as_dict()).ok(),
        Ok(Object::Dictionary(dict)) => Some(dict),
        _ => None,
    };
    let Some(info) = info else {
        return DocumentMetadata::default();
    };

    let text = |key: &[u8]| -> Option<String> {
        match info.get(key).ok()? {
            Object::String(bytes, _) => Some(decode_pdf_string(bytes)),
            _ => None,
        }
    };

    DocumentMetadata {
        title: text(b"Title"),
        author: text(b"Author"),
        subject: text(b"Subject"),
        keywords: text(b"Keywords"),
        creator: text(b"Creator"),
        producer: text(b"Producer"),
        mod_date: text(b"ModDate"),
    }
}

/// Merge `metadata` into the /Info dictionary, creating it when absent.
/// Fields left as `None` are not touched.
pub fn write_metadata(doc: &mut Document, metadata: &DocumentMetadata) -> Result<(), InksealError> {
    let info_id = info_dictionary_id(doc);

    let info = doc
        .get_object_mut(info_id)
        .and_then(|o| o.as_dict_mut())
        .map_err(|err| InksealError::PdfError(format!("/Info is not a dictionary: {err}")))?;

    let mut written = 0usize;
    for (key, value) in metadata.fields() {
        if let Some(value) = value {
            info.set(key, encode_pdf_string(value));
            written += 1;
        }
    }
    debug!(written, "document metadata updated");
    Ok(())
}

fn info_dictionary_id(doc: &mut Document) -> ObjectId {
    let existing: Option<Object> = doc.trailer.get(b"Info").ok().cloned();
    match existing {
        Some(Object::Reference(id)) => id,
        Some(Object::Dictionary(dict)) => {
            // Inline /Info: move it to an indirect object so it can be edited.
            let id = doc.add_object(Object::Dictionary(dict));
            doc.trailer.set("Info", id);
            id
        }
        _ => {
            let id = doc.add_object(Object::Dictionary(dictionary! {}));
            doc.trailer.set("Info", id);
            id
        }
    }
}

/// PDF text strings are PDFDocEncoding or UTF-16BE with a BOM.
fn encode_pdf_string(value: &str) -> Object {
    if value.is_ascii() {
        Object::String(value.as_bytes().to_vec(), StringFormat::Literal)
    } else {
        let mut bytes = vec![0xFE, 0xFF];
        for unit in value.encode_utf16() {
            bytes.extend_from_slice(&unit.to_be_bytes());
        }
        Object::String(bytes, StringFormat::Hexadecimal)
    }
}

fn decode_pdf_string(bytes: &[u8]) -> String {
    if bytes.starts_with(&[0xFE, 0xFF]) {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else {
        bytes.iter().map(|&b| b as char).collect()
    }
}
