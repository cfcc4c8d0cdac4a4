// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Watermark request handler — the chat entry point. Parses the callback,
// collects the watermark, runs the pipeline, and replies with a summary or
// a human-readable error.

use std::path::{Path, PathBuf};

use inkseal_core::error::{InksealError, Result};
use inkseal_core::human_errors::humanize_error;
use inkseal_core::{
    DocumentType, ProtectionReport, WatermarkConfig, WatermarkOptions, WatermarkRequest,
    parse_callback,
};
use inkseal_document::{PdfWriter, WatermarkOutcome, Watermarker, protection_score};
use rand::Rng;
use tracing::{error, info, instrument};

use crate::collector::{Collected, collect_watermark};
use crate::context::RequestContext;
use crate::traits::ChatSession;

/// File name for inputs rendered to PDF before watermarking.
const RENDERED_INPUT: &str = "input.pdf";

pub struct WatermarkHandler {
    watermarker: Watermarker,
    writer: PdfWriter,
}

impl WatermarkHandler {
    pub fn new(config: WatermarkConfig) -> Self {
        let writer = PdfWriter::new(config.paper_size);
        Self {
            watermarker: Watermarker::new(config),
            writer,
        }
    }

    /// Replace the pipeline, e.g. to change the save strategy.
    pub fn with_watermarker(mut self, watermarker: Watermarker) -> Self {
        self.watermarker = watermarker;
        self
    }

    pub fn config(&self) -> &WatermarkConfig {
        self.watermarker.config()
    }

    /// Handle one watermark request for `input`.
    ///
    /// Every failure is logged and answered in the chat before it is
    /// returned; cancellation has already been acknowledged by the collector.
    #[instrument(skip_all, fields(request = %ctx.id, callback = %callback))]
    pub async fn handle<S, R>(
        &self,
        session: &mut S,
        ctx: &mut RequestContext,
        callback: &str,
        input: &Path,
        rng: &mut R,
    ) -> Result<WatermarkOutcome>
    where
        S: ChatSession,
        R: Rng + ?Sized,
    {
        let result = self.run(session, ctx, callback, input, rng).await;
        match &result {
            Ok(outcome) => {
                for failure in &outcome.failures {
                    ctx.record_broken(failure.clone());
                }
                session.send(&summary(&outcome.report)).await?;
            }
            Err(InksealError::Cancelled) => info!("request cancelled"),
            Err(err) => {
                error!(error = %err, "watermark request failed");
                session.send(&humanize_error(err).to_chat_text()).await?;
            }
        }
        result
    }

    async fn run<S, R>(
        &self,
        session: &mut S,
        ctx: &mut RequestContext,
        callback: &str,
        input: &Path,
        rng: &mut R,
    ) -> Result<WatermarkOutcome>
    where
        S: ChatSession,
        R: Rng + ?Sized,
    {
        let options = parse_callback(callback)?;
        let collected = collect_watermark(session, options.kind, self.config()).await?;
        let request = self.build_request(session, ctx, options, collected).await?;
        session.send("Adding watermark...").await?;
        self.watermark(ctx, &request, input, rng)
    }

    /// Apply an already collected request to `input` inside the request
    /// directory. No chat traffic.
    pub fn watermark<R: Rng + ?Sized>(
        &self,
        ctx: &mut RequestContext,
        request: &WatermarkRequest,
        input: &Path,
        rng: &mut R,
    ) -> Result<WatermarkOutcome> {
        let work_dir = ctx.work_dir().to_path_buf();
        let pdf = self.prepare_input(input, &work_dir)?;
        self.watermarker
            .apply(&pdf, &work_dir, request, rng, &mut ctx.images)
    }

    async fn build_request<S: ChatSession>(
        &self,
        session: &mut S,
        ctx: &RequestContext,
        options: WatermarkOptions,
        collected: Collected,
    ) -> Result<WatermarkRequest> {
        match collected {
            Collected::Text(text) => Ok(WatermarkRequest::text(options, text)),
            Collected::Document(attachment) => {
                let file_name = Path::new(&attachment.file_name)
                    .file_name()
                    .map(|name| format!("watermark_{}", name.to_string_lossy()))
                    .ok_or_else(|| {
                        InksealError::InvalidInput("attachment has no file name".into())
                    })?;
                let stored = session
                    .download(&attachment, &ctx.work_dir().join(file_name))
                    .await?;
                Ok(WatermarkRequest::file(options, stored))
            }
        }
    }

    /// PDFs are used as they are; images and text files are rendered to a
    /// PDF in the request directory first.
    pub fn prepare_input(&self, input: &Path, work_dir: &Path) -> Result<PathBuf> {
        match DocumentType::from_path(input) {
            Some(DocumentType::Pdf) => Ok(input.to_path_buf()),
            Some(kind) => {
                info!(mime = kind.mime_type(), "rendering input to PDF");
                let bytes = self.writer.render_file(input)?;
                let rendered = work_dir.join(RENDERED_INPUT);
                std::fs::write(&rendered, bytes)?;
                Ok(rendered)
            }
            None => Err(InksealError::InvalidInput(format!(
                "{} is not a PDF, image, or text file",
                input.display()
            ))),
        }
    }
}

/// Chat reply for a finished run.
pub fn summary(report: &ProtectionReport) -> String {
    let mut lines = vec![
        "Watermark added.".to_owned(),
        format!("Protection score: {}/100", protection_score(report)),
        format!(
            "Pages: {} watermarked, {} skipped",
            report.pages_watermarked, report.pages_skipped
        ),
        format!("Layers: {}", report.layers_added),
    ];
    if report.background_removed {
        lines.push("Image background removed.".to_owned());
    }
    if report.forensic_points > 0 {
        lines.push(format!("Forensic points: {}", report.forensic_points));
    }
    if report.steganography {
        lines.push(format!("Hidden bits: {}", report.stego_bits));
    }
    if let Some(id) = &report.document_id {
        lines.push(format!("Document ID: {}", &id[..id.len().min(16)]));
    }
    lines.join("\n")
}
