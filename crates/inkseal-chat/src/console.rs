// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Line-based chat session for terminals. A line of the form `file:<path>`
// is treated as a document attachment; anything else is text.

use std::path::{Path, PathBuf};

use inkseal_core::error::{InksealError, Result};
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Lines, Stdin, Stdout,
};
use tracing::debug;

use crate::traits::{Attachment, ChatSession, IncomingMessage};

const FILE_PREFIX: &str = "file:";

pub struct ConsoleSession<R, W> {
    lines: Lines<R>,
    out: W,
}

impl ConsoleSession<BufReader<Stdin>, Stdout> {
    /// Session over the process's stdin and stdout.
    pub fn stdio() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

impl<R, W> ConsoleSession<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(input: R, out: W) -> Self {
        Self {
            lines: input.lines(),
            out,
        }
    }

    pub fn into_writer(self) -> W {
        self.out
    }

    async fn write_line(&mut self, text: &str) -> Result<()> {
        self.out.write_all(text.as_bytes()).await?;
        self.out.write_all(b"\n").await?;
        self.out.flush().await?;
        Ok(())
    }
}

/// Parse one console line into a message.
pub fn parse_line(line: &str) -> IncomingMessage {
    let trimmed = line.trim();
    match trimmed.strip_prefix(FILE_PREFIX) {
        Some(path) if !path.trim().is_empty() => {
            let path = Path::new(path.trim());
            match path.file_name() {
                Some(name) => IncomingMessage::Document(Attachment {
                    file_name: name.to_string_lossy().into_owned(),
                    file_id: path.display().to_string(),
                    file_size: std::fs::metadata(path).ok().map(|meta| meta.len()),
                }),
                None => IncomingMessage::Other,
            }
        }
        Some(_) => IncomingMessage::Other,
        None => IncomingMessage::Text(line.trim_end_matches(['\r', '\n']).to_owned()),
    }
}

impl<R, W> ChatSession for ConsoleSession<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn ask(&mut self, prompt: &str, force_reply: bool) -> Result<IncomingMessage> {
        self.write_line(prompt).await?;
        if force_reply {
            self.out.write_all(b"> ").await?;
            self.out.flush().await?;
        }
        match self.lines.next_line().await? {
            Some(line) => Ok(parse_line(&line)),
            None => Err(InksealError::Chat("input closed".into())),
        }
    }

    async fn send(&mut self, text: &str) -> Result<()> {
        self.write_line(text).await
    }

    async fn download(&mut self, attachment: &Attachment, dest: &Path) -> Result<PathBuf> {
        let copied = tokio::fs::copy(&attachment.file_id, dest).await?;
        debug!(
            from = %attachment.file_id,
            to = %dest.display(),
            bytes = copied,
            "attachment copied"
        );
        Ok(dest.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(input: &'static str) -> ConsoleSession<BufReader<&'static [u8]>, Vec<u8>> {
        ConsoleSession::new(BufReader::new(input.as_bytes()), Vec::new())
    }

    #[test]
    fn file_lines_become_attachments() {
        match parse_line("file: /tmp/logo.png") {
            IncomingMessage::Document(doc) => {
                assert_eq!(doc.file_name, "logo.png");
                assert_eq!(doc.file_id, "/tmp/logo.png");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(parse_line("file:"), IncomingMessage::Other);
        assert_eq!(parse_line("hello "), IncomingMessage::Text("hello ".into()));
    }

    #[tokio::test]
    async fn ask_writes_prompt_and_reads_reply() {
        let mut s = session("Top secret\n");
        let reply = s.ask("Send the watermark text.", true).await.unwrap();
        assert_eq!(reply, IncomingMessage::Text("Top secret".into()));

        let written = String::from_utf8(s.into_writer()).unwrap();
        assert_eq!(written, "Send the watermark text.\n> ");
    }

    #[tokio::test]
    async fn closed_input_is_a_chat_error() {
        let mut s = session("");
        let err = s.ask("anything?", false).await.unwrap_err();
        assert!(matches!(err, InksealError::Chat(_)));
    }

    #[tokio::test]
    async fn download_copies_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("logo.png");
        std::fs::write(&source, b"png bytes").unwrap();
        let attachment = match parse_line(&format!("file:{}", source.display())) {
            IncomingMessage::Document(doc) => doc,
            other => panic!("unexpected {other:?}"),
        };
        assert_eq!(attachment.file_size, Some(9));

        let dest = dir.path().join("copy.png");
        let stored = session("").download(&attachment, &dest).await.unwrap();
        assert_eq!(std::fs::read(stored).unwrap(), b"png bytes");
    }
}
