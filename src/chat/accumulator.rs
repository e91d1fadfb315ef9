// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 MARES contributors

//! Event-to-message accumulation
//!
//! Per-submission streaming state: the active agent label and the running
//! text buffer for one agent message. Fragments are applied strictly in
//! arrival order; every fragment republishes the target message, so
//! observers see monotonically-growing content.

use crate::chat::message::Transcript;
use crate::sse::RunEvent;

/// Accumulates streamed fragments into one agent message
#[derive(Debug)]
pub struct MessageAccumulator {
    message_id: String,
    agent_label: Option<String>,
    buffer: String,
}

impl MessageAccumulator {
    /// Fresh state targeting the given placeholder message
    pub fn new(message_id: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
            agent_label: None,
            buffer: String::new(),
        }
    }

    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    pub fn agent_label(&self) -> Option<&str> {
        self.agent_label.as_deref()
    }

    /// Apply one decoded event
    ///
    /// Records the author as the active agent label, then appends each text
    /// fragment (plus a single trailing space) to the running buffer and
    /// replaces the target message's content with the trimmed buffer -
    /// once per fragment, not batched.
    ///
    /// Returns false when the target message no longer exists; the stream
    /// is stale (reset happened) and the caller should stop consuming.
    pub fn apply(&mut self, event: &RunEvent, transcript: &mut Transcript) -> bool {
        if let Some(author) = event.author.as_deref() {
            if !author.is_empty() && self.agent_label.as_deref() != Some(author) {
                self.agent_label = Some(author.to_string());
            }
        }

        for fragment in &event.fragments {
            self.buffer.push_str(fragment);
            self.buffer.push(' ');
            let alive = transcript.set_agent_output(
                &self.message_id,
                self.buffer.trim_end(),
                self.agent_label.as_deref(),
            );
            if !alive {
                return false;
            }
        }
        true
    }
}
