// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Transport-agnostic chat session.
//
// A chat backend (a bot API, the console, a test script) implements
// `ChatSession`; the collector and handler only talk to this trait.

use std::future::Future;
use std::path::{Path, PathBuf};

use inkseal_core::error::Result;

/// A document the user sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Name as sent, including the extension.
    pub file_name: String,
    /// Backend handle used to download the file.
    pub file_id: String,
    pub file_size: Option<u64>,
}

impl Attachment {
    /// Lowercase extension without the dot, if any.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.file_name)
            .extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
    }
}

/// One reply from the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IncomingMessage {
    Text(String),
    Document(Attachment),
    /// Stickers, photos without a file name, and anything else unusable.
    Other,
}

/// The operations the watermark workflow needs from a chat backend.
pub trait ChatSession {
    /// Send `prompt` and wait for the user's next message. With
    /// `force_reply` the backend should open a reply field for the user.
    fn ask(
        &mut self,
        prompt: &str,
        force_reply: bool,
    ) -> impl Future<Output = Result<IncomingMessage>> + Send;

    /// Send a message without waiting for an answer.
    fn send(&mut self, text: &str) -> impl Future<Output = Result<()>> + Send;

    /// Store `attachment` at `dest` and return the stored path.
    fn download(
        &mut self,
        attachment: &Attachment,
        dest: &Path,
    ) -> impl Future<Output = Result<PathBuf>> + Send;
}

#[cfg(test)]
pub(crate) mod scripted {
    use std::collections::VecDeque;

    use inkseal_core::error::InksealError;

    use super::*;

    /// Replays queued replies and records everything sent.
    #[derive(Debug, Default)]
    pub(crate) struct ScriptedSession {
        pub replies: VecDeque<IncomingMessage>,
        pub prompts: Vec<(String, bool)>,
        pub sent: Vec<String>,
    }

    impl ScriptedSession {
        pub fn new(replies: impl IntoIterator<Item = IncomingMessage>) -> Self {
            Self {
                replies: replies.into_iter().collect(),
                ..Self::default()
            }
        }

        pub fn text(text: &str) -> IncomingMessage {
            IncomingMessage::Text(text.to_owned())
        }

        pub fn document(path: &Path) -> IncomingMessage {
            IncomingMessage::Document(Attachment {
                file_name: path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                file_id: path.display().to_string(),
                file_size: None,
            })
        }
    }

    impl ChatSession for ScriptedSession {
        async fn ask(&mut self, prompt: &str, force_reply: bool) -> Result<IncomingMessage> {
            self.prompts.push((prompt.to_owned(), force_reply));
            self.replies
                .pop_front()
                .ok_or_else(|| InksealError::Chat("script exhausted".into()))
        }

        async fn send(&mut self, text: &str) -> Result<()> {
            self.sent.push(text.to_owned());
            Ok(())
        }

        async fn download(&mut self, attachment: &Attachment, dest: &Path) -> Result<PathBuf> {
            tokio::fs::copy(&attachment.file_id, dest).await?;
            Ok(dest.to_path_buf())
        }
    }
}
