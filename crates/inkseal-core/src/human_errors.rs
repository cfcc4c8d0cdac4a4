// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for chat replies.
//
// Every technical error is mapped to a plain sentence with a suggestion the
// user can act on. The bot never surfaces stack traces or library errors.

use crate::error::InksealError;

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Something went wrong on our side; trying again may help.
    Transient,
    /// The user must send something different.
    ActionRequired,
    /// Retrying with the same input will not help.
    Permanent,
}

/// A chat-friendly error with a short message and an actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    pub message: String,
    pub suggestion: String,
    pub retriable: bool,
    pub severity: Severity,
}

impl HumanError {
    /// Message and suggestion joined for a single chat reply.
    pub fn to_chat_text(&self) -> String {
        format!("{}\n{}", self.message, self.suggestion)
    }
}

/// Convert an `InksealError` into something a chat user can understand.
pub fn humanize_error(err: &InksealError) -> HumanError {
    match err {
        InksealError::InvalidCallback(_) => HumanError {
            message: "That button is out of date.".into(),
            suggestion: "Open the watermark menu again and pick your options.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        InksealError::UnsupportedWatermark(kind) => HumanError {
            message: "This kind of watermark isn't available.".into(),
            suggestion: format!("Use a text or image watermark instead. ({kind})"),
            retriable: false,
            severity: Severity::Permanent,
        },

        InksealError::InvalidInput(detail) => HumanError {
            message: "We couldn't use what you sent.".into(),
            suggestion: format!("Send a PDF, PNG, or JPEG file and try again. ({detail})"),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        InksealError::Cancelled => HumanError {
            message: "Watermarking cancelled.".into(),
            suggestion: "Nothing was changed. Start again whenever you like.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        InksealError::Chat(_) => HumanError {
            message: "We lost track of the conversation.".into(),
            suggestion: "Please try again in a moment.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        InksealError::PdfError(_) | InksealError::PageFailed { .. } => HumanError {
            message: "We couldn't read or change this PDF.".into(),
            suggestion: "The file may be damaged or protected. Try another copy of it.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        InksealError::ImageError(_) => HumanError {
            message: "We couldn't open your watermark image.".into(),
            suggestion: "Send the image as a PNG or JPEG file (not as a photo).".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        InksealError::SaveFailed { .. } | InksealError::Io(_) => HumanError {
            message: "We couldn't save the watermarked file.".into(),
            suggestion: "Please try again in a moment.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        InksealError::IntegrityMismatch { .. } => HumanError {
            message: "The watermark on this file doesn't match.".into(),
            suggestion: "The document may have been edited after watermarking.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        InksealError::Serialization(_) => HumanError {
            message: "Something went wrong while preparing the result.".into(),
            suggestion: "Please try again in a moment.".into(),
            retriable: true,
            severity: Severity::Transient,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_is_action_required() {
        let human = humanize_error(&InksealError::Cancelled);
        assert_eq!(human.severity, Severity::ActionRequired);
        assert!(!human.retriable);
    }

    #[test]
    fn save_failure_is_transient() {
        let err = InksealError::SaveFailed {
            primary: "disk full".into(),
            fallback: "disk full".into(),
        };
        let human = humanize_error(&err);
        assert_eq!(human.severity, Severity::Transient);
        assert!(human.retriable);
    }

    #[test]
    fn unsupported_watermark_mentions_kind() {
        let human = humanize_error(&InksealError::UnsupportedWatermark("pdf".into()));
        assert_eq!(human.severity, Severity::Permanent);
        assert!(human.suggestion.contains("pdf"));
    }

    #[test]
    fn chat_text_joins_lines() {
        let human = humanize_error(&InksealError::ImageError("bad png".into()));
        let text = human.to_chat_text();
        assert!(text.starts_with(&human.message));
        assert!(text.ends_with(&human.suggestion));
    }
}
