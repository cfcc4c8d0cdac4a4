// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Watermark input collection: ask until the user sends something usable,
// cancels with the exit sentinel, or runs out of attempts.

use inkseal_core::error::{InksealError, Result};
use inkseal_core::{WatermarkConfig, WatermarkKind};
use tracing::{debug, info, instrument};

use crate::traits::{Attachment, ChatSession, IncomingMessage};

/// What the user supplied as the watermark.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Collected {
    Text(String),
    Document(Attachment),
}

fn question(kind: WatermarkKind, exit: &str) -> String {
    match kind {
        WatermarkKind::Text => format!("Send the watermark text.\n{exit} to cancel."),
        WatermarkKind::Image => {
            format!("Send the watermark image as a file (PNG or JPEG).\n{exit} to cancel.")
        }
        WatermarkKind::Pdf => format!("Send the watermark PDF as a file.\n{exit} to cancel."),
    }
}

fn accept(
    kind: WatermarkKind,
    reply: IncomingMessage,
    config: &WatermarkConfig,
) -> Option<Collected> {
    match (kind, reply) {
        (WatermarkKind::Text, IncomingMessage::Text(text)) if !text.trim().is_empty() => {
            Some(Collected::Text(text))
        }
        (WatermarkKind::Image, IncomingMessage::Document(doc))
            if doc
                .extension()
                .is_some_and(|ext| config.accepts_image_extension(&ext)) =>
        {
            Some(Collected::Document(doc))
        }
        (WatermarkKind::Pdf, IncomingMessage::Document(doc))
            if doc.extension().as_deref() == Some("pdf") =>
        {
            Some(Collected::Document(doc))
        }
        _ => None,
    }
}

/// Ask for a watermark of `kind`.
///
/// Returns [`InksealError::Cancelled`] when the user sends the exit sentinel
/// or after `max_prompts` unusable replies.
#[instrument(skip_all, fields(kind = kind.code()))]
pub async fn collect_watermark<S: ChatSession>(
    session: &mut S,
    kind: WatermarkKind,
    config: &WatermarkConfig,
) -> Result<Collected> {
    let prompt = question(kind, &config.exit_sentinel);
    let attempts = config.max_prompts.max(1);

    for attempt in 1..=attempts {
        let reply = session.ask(&prompt, kind == WatermarkKind::Text).await?;

        if let IncomingMessage::Text(text) = &reply {
            if text.trim() == config.exit_sentinel {
                info!("watermark cancelled by user");
                session.send("Process cancelled.").await?;
                return Err(InksealError::Cancelled);
            }
        }

        match accept(kind, reply, config) {
            Some(collected) => {
                debug!(attempt, "watermark input accepted");
                return Ok(collected);
            }
            None => debug!(attempt, "unusable reply, asking again"),
        }
    }

    info!(attempts, "no usable watermark input");
    session
        .send("No usable watermark received. Start again from the menu.")
        .await?;
    Err(InksealError::Cancelled)
}
