// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// inkseal-chat — the conversational side of a watermark request: asking
// for the watermark, keeping per-request state, and replying with the
// result. Backends plug in through `ChatSession`.

pub mod collector;
pub mod console;
pub mod context;
pub mod handler;
pub mod traits;

pub use collector::{Collected, collect_watermark};
pub use console::ConsoleSession;
pub use context::RequestContext;
pub use handler::{WatermarkHandler, summary};
pub use traits::{Attachment, ChatSession, IncomingMessage};
