// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 MARES contributors

//! Message model and conversation transcript
//!
//! The transcript is an ordered, append-only sequence of messages owned for
//! the session's lifetime and replaced wholesale only on explicit reset.
//! Every mutation publishes a full snapshot over a watch channel, so
//! observers always see a consistent, monotonically-growing view.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use uuid::Uuid;

use crate::chat::attachment::Attachment;

/// Prefix for synthetic agent messages that surface submission failures
pub const ERROR_MESSAGE_PREFIX: &str = "Sorry, there was an error processing your request: ";

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Human,
    Agent,
}

/// One transcript entry
///
/// Agent messages are mutated in place (content replaced, never
/// appended-then-reparsed) while their producing stream is live, and never
/// after it terminates.
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub agent_name: Option<String>,
    pub attachments: Vec<Attachment>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// A human message carrying the submitted query and its attachments
    pub fn human(content: impl Into<String>, attachments: Vec<Attachment>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: Role::Human,
            content: content.into(),
            agent_name: None,
            attachments,
            created_at: Utc::now(),
        }
    }

    /// The empty agent placeholder appended when a response begins
    pub fn agent_placeholder() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: Role::Agent,
            content: String::new(),
            agent_name: None,
            attachments: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// A synthetic agent message surfacing a submission failure
    pub fn agent_error(detail: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: Role::Agent,
            content: format!("{ERROR_MESSAGE_PREFIX}{detail}"),
            agent_name: None,
            attachments: Vec::new(),
            created_at: Utc::now(),
        }
    }
}

/// The ordered message list for the current session
pub struct Transcript {
    messages: Vec<Message>,
    snapshots: watch::Sender<Vec<Message>>,
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new()
    }
}

impl Transcript {
    pub fn new() -> Self {
        let (snapshots, _) = watch::channel(Vec::new());
        Self {
            messages: Vec::new(),
            snapshots,
        }
    }

    /// Observe transcript snapshots; one full copy per mutation
    pub fn subscribe(&self) -> watch::Receiver<Vec<Message>> {
        self.snapshots.subscribe()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Append a message and publish
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
        self.publish();
    }

    /// Replace the content (and, when given, the agent label) of the agent
    /// message with the given id, then publish.
    ///
    /// Returns false when no such message exists - the handle is stale, as
    /// after a reset, and the update is dropped.
    pub fn set_agent_output(&mut self, id: &str, content: &str, agent_name: Option<&str>) -> bool {
        let Some(message) = self.messages.iter_mut().find(|m| m.id == id) else {
            tracing::debug!("ignoring update for unknown message id {id}");
            return false;
        };
        message.content = content.to_string();
        if let Some(name) = agent_name {
            message.agent_name = Some(name.to_string());
        }
        self.publish();
        true
    }

    /// Discard all messages and publish the empty transcript
    pub fn clear(&mut self) {
        self.messages.clear();
        self.publish();
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.messages.clone());
    }
}
