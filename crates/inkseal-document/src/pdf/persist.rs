// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Persisting a watermarked document.
//
// A direct save is tried first. If it fails, one compacting save is
// attempted before the failure is reported. There are no further retries.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use inkseal_core::error::InksealError;
use lopdf::Document;
use tracing::{info, instrument, warn};

/// One way of writing a document to disk.
pub trait SaveMode {
    fn name(&self) -> &'static str;

    fn save(&self, doc: &mut Document, path: &Path) -> Result<(), InksealError>;
}

/// Write the document exactly as it is in memory.
pub struct DirectSave;

impl SaveMode for DirectSave {
    fn name(&self) -> &'static str {
        "direct"
    }

    fn save(&self, doc: &mut Document, path: &Path) -> Result<(), InksealError> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        doc.save_to(&mut writer).map_err(|err| {
            InksealError::PdfError(format!("failed to write {}: {}", path.display(), err))
        })?;
        // Dropping a BufWriter swallows the final flush error.
        writer.into_inner().map_err(|err| err.into_error())?;
        Ok(())
    }
}

/// Drop unreferenced objects and empty streams, renumber, compress, then
/// write through an in-memory buffer.
pub struct CompactSave;

impl SaveMode for CompactSave {
    fn name(&self) -> &'static str {
        "compact"
    }

    fn save(&self, doc: &mut Document, path: &Path) -> Result<(), InksealError> {
        let pruned = doc.prune_objects().len();
        doc.delete_zero_length_streams();
        doc.renumber_objects();
        doc.compress();

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).map_err(|err| {
            InksealError::PdfError(format!("failed to serialise compacted PDF: {}", err))
        })?;
        std::fs::write(path, &buffer)?;
        info!(pruned, bytes = buffer.len(), "compacted PDF written");
        Ok(())
    }
}

/// Primary save with a single fallback.
pub struct Persister {
    primary: Box<dyn SaveMode + Send + Sync>,
    fallback: Box<dyn SaveMode + Send + Sync>,
}

impl Default for Persister {
    fn default() -> Self {
        Self::new(Box::new(DirectSave), Box::new(CompactSave))
    }
}

impl Persister {
    pub fn new(
        primary: Box<dyn SaveMode + Send + Sync>,
        fallback: Box<dyn SaveMode + Send + Sync>,
    ) -> Self {
        Self { primary, fallback }
    }

    /// Save `doc` to `path`, falling back once if the primary mode fails.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn persist(&self, doc: &mut Document, path: impl AsRef<Path>) -> Result<(), InksealError> {
        let path = path.as_ref();
        let primary_err = match self.primary.save(doc, path) {
            Ok(()) => {
                info!(mode = self.primary.name(), "Saved watermarked PDF");
                return Ok(());
            }
            Err(err) => err,
        };

        warn!(
            mode = self.primary.name(),
            fallback = self.fallback.name(),
            error = %primary_err,
            "primary save failed, trying fallback"
        );

        match self.fallback.save(doc, path) {
            Ok(()) => {
                info!(mode = self.fallback.name(), "Saved watermarked PDF");
                Ok(())
            }
            Err(fallback_err) => Err(InksealError::SaveFailed {
                primary: primary_err.to_string(),
                fallback: fallback_err.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::testing::blank_pdf;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts calls and optionally fails.
    struct Scripted {
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    impl SaveMode for Scripted {
        fn name(&self) -> &'static str {
            "scripted"
        }

        fn save(&self, doc: &mut Document, path: &Path) -> Result<(), InksealError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(InksealError::PdfError("scripted failure".into()));
            }
            DirectSave.save(doc, path)
        }
    }

    fn scripted(fail: bool) -> (Box<Scripted>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Box::new(Scripted {
                calls: Arc::clone(&calls),
                fail,
            }),
            calls,
        )
    }

    fn document() -> Document {
        Document::load_mem(&blank_pdf(1, 200.0, 200.0)).unwrap()
    }

    #[test]
    fn fallback_runs_when_primary_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("outPut.pdf");
        let (primary, primary_calls) = scripted(true);
        let (fallback, fallback_calls) = scripted(false);

        Persister::new(primary, fallback)
            .persist(&mut document(), &path)
            .unwrap();

        assert_eq!(primary_calls.load(Ordering::SeqCst), 1);
        assert_eq!(fallback_calls.load(Ordering::SeqCst), 1);
        assert!(path.exists());
    }

    #[test]
    fn fallback_skipped_when_primary_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let (primary, _) = scripted(false);
        let (fallback, fallback_calls) = scripted(false);

        Persister::new(primary, fallback)
            .persist(&mut document(), dir.path().join("out.pdf"))
            .unwrap();

        assert_eq!(fallback_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn both_failures_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let (primary, _) = scripted(true);
        let (fallback, fallback_calls) = scripted(true);

        let err = Persister::new(primary, fallback)
            .persist(&mut document(), dir.path().join("out.pdf"))
            .unwrap_err();

        assert_eq!(fallback_calls.load(Ordering::SeqCst), 1);
        assert!(matches!(err, InksealError::SaveFailed { .. }));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn direct_save_reports_a_full_device() {
        let err = DirectSave.save(&mut document(), Path::new("/dev/full")).unwrap_err();
        assert!(matches!(err, InksealError::Io(_)));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn full_device_falls_back() {
        let (fallback, fallback_calls) = scripted(true);

        let err = Persister::new(Box::new(DirectSave), fallback)
            .persist(&mut document(), "/dev/full")
            .unwrap_err();

        assert_eq!(fallback_calls.load(Ordering::SeqCst), 1);
        assert!(matches!(err, InksealError::SaveFailed { .. }));
    }

    #[test]
    fn default_persister_writes_loadable_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.pdf");
        Persister::default().persist(&mut document(), &path).unwrap();
        assert_eq!(Document::load(&path).unwrap().get_pages().len(), 1);
    }

    #[test]
    fn compact_save_produces_loadable_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("compact.pdf");
        CompactSave.save(&mut document(), &path).unwrap();
        assert_eq!(Document::load(&path).unwrap().get_pages().len(), 1);
    }
}
