// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-request state. Each request owns its directory, its prepared-image
// cache, and its list of broken works, so concurrent requests share nothing.

use std::path::{Path, PathBuf};

use inkseal_core::RequestId;
use inkseal_core::error::Result;
use inkseal_document::ImageCache;
use tracing::{debug, warn};

#[derive(Debug)]
pub struct RequestContext {
    pub id: RequestId,
    work_dir: PathBuf,
    /// Watermark images already prepared for this request.
    pub images: ImageCache,
    broken: Vec<String>,
}

impl RequestContext {
    /// Create a fresh request with its own directory under `root`.
    pub fn create(root: impl AsRef<Path>) -> Result<Self> {
        let id = RequestId::new();
        let work_dir = root.as_ref().join(id.to_string());
        std::fs::create_dir_all(&work_dir)?;
        debug!(request = %id, dir = %work_dir.display(), "request directory created");
        Ok(Self::in_dir(id, work_dir))
    }

    /// Use an existing directory for the request.
    pub fn in_dir(id: RequestId, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            id,
            work_dir: work_dir.into(),
            images: ImageCache::new(),
            broken: Vec::new(),
        }
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Note a page or layer that could not be processed.
    pub fn record_broken(&mut self, what: impl Into<String>) {
        let what = what.into();
        warn!(request = %self.id, %what, "broken work recorded");
        self.broken.push(what);
    }

    pub fn broken_works(&self) -> &[String] {
        &self.broken
    }

    /// Delete the request directory and everything in it.
    pub fn cleanup(self) -> Result<()> {
        if self.work_dir.exists() {
            std::fs::remove_dir_all(&self.work_dir)?;
        }
        Ok(())
    }
}
