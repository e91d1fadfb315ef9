// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 MARES contributors

//! Conversation model and submission engine
//!
//! Messages, attachments, the streaming accumulator, and the engine that
//! orchestrates one submission end to end.

pub mod accumulator;
pub mod attachment;
pub mod engine;
pub mod message;

pub use accumulator::MessageAccumulator;
pub use attachment::{Attachment, AttachmentPolicy};
pub use engine::ChatEngine;
pub use message::{Message, Role, Transcript, ERROR_MESSAGE_PREFIX};
