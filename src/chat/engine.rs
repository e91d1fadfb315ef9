// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 MARES contributors

//! Chat submission engine
//!
//! Ties the pipeline together: lazy session provisioning, transcript
//! mutation, the retry-wrapped streamed send, and driving the SSE
//! demultiplexer to exhaustion. One submission is in flight at a time;
//! the engine is not a guard against concurrent callers.

use futures_util::StreamExt;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::chat::accumulator::MessageAccumulator;
use crate::chat::attachment::Attachment;
use crate::chat::message::{Message, Transcript};
use crate::client::api::{ApiClient, InlineData, MessagePart};
use crate::client::retry::{with_retry, RetryConfig};
use crate::client::session::{self, Session};
use crate::error::Result;
use crate::sse::{self, RunEvent};

/// Owns all state for one conversation with the backend
pub struct ChatEngine {
    api: ApiClient,
    retry: RetryConfig,
    transcript: Transcript,
    session: Option<Session>,
    cancel: CancellationToken,
    loading: watch::Sender<bool>,
}

impl ChatEngine {
    pub fn new(api: ApiClient, retry: RetryConfig) -> Self {
        let (loading, _) = watch::channel(false);
        Self {
            api,
            retry,
            transcript: Transcript::new(),
            session: None,
            cancel: CancellationToken::new(),
            loading,
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Observe transcript snapshots
    pub fn subscribe(&self) -> watch::Receiver<Vec<Message>> {
        self.transcript.subscribe()
    }

    /// Observe the per-submission loading flag
    pub fn subscribe_loading(&self) -> watch::Receiver<bool> {
        self.loading.subscribe()
    }

    pub fn is_loading(&self) -> bool {
        *self.loading.borrow()
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Handle that cancels the current in-flight stream when triggered;
    /// replaced by `reset`
    pub fn cancel_handle(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Submit a brief and stream the agent's response into the transcript
    ///
    /// A submission whose trimmed text is empty and which carries no
    /// attachments is a no-op. Failures are surfaced as a trailing synthetic
    /// agent message; prior messages are never rolled back. The loading flag
    /// clears when the submission ends, whether or not any agent text was
    /// produced.
    pub async fn submit(&mut self, query: &str, attachments: Vec<Attachment>) {
        if query.trim().is_empty() && attachments.is_empty() {
            return;
        }

        self.loading.send_replace(true);
        let cancel = self.cancel.clone();
        if let Err(error) = self.run_submission(query, attachments, &cancel).await {
            tracing::error!("submission failed: {error}");
            self.transcript.push(Message::agent_error(&error.to_string()));
        }
        self.loading.send_replace(false);
    }

    async fn run_submission(
        &mut self,
        query: &str,
        attachments: Vec<Attachment>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        // Create session if it doesn't exist
        let session = match &self.session {
            Some(session) => session.clone(),
            None => {
                tracing::debug!("creating new session");
                let session = session::provision(&self.api, &self.retry).await?;
                tracing::debug!(
                    session_id = %session.session_id,
                    app_name = %session.app_name,
                    "session created"
                );
                self.session = Some(session.clone());
                session
            }
        };

        // Encode the outgoing parts before the attachments move into the
        // transcript: one text part plus one inline-data part per file
        let mut parts = vec![MessagePart::Text {
            text: query.to_string(),
        }];
        for attachment in &attachments {
            parts.push(MessagePart::InlineData {
                inline_data: InlineData {
                    mime_type: attachment.media_type.clone(),
                    data: attachment.to_base64(),
                },
            });
        }

        // Human message first, then the placeholder the stream will fill;
        // both precede any network send
        self.transcript.push(Message::human(query, attachments));
        let placeholder = Message::agent_placeholder();
        let mut accumulator = MessageAccumulator::new(placeholder.id.clone());
        self.transcript.push(placeholder);

        let api = &self.api;
        let response = with_retry(
            || api.run_sse(&session, parts.clone()),
            &self.retry,
            "run_sse",
        )
        .await?;

        let mut payloads = Box::pin(sse::payload_stream(response.bytes_stream()));
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!("stream cancelled by reset");
                    break;
                }
                next = payloads.next() => match next {
                    Some(Ok(payload)) => {
                        let event = RunEvent::parse(&payload);
                        if !accumulator.apply(&event, &mut self.transcript) {
                            // Target message is gone; stop consuming
                            break;
                        }
                    }
                    Some(Err(error)) => return Err(error),
                    None => break,
                }
            }
        }

        Ok(())
    }

    /// Explicit reset: cancel the in-flight stream, discard the session,
    /// and clear the transcript. Late events from an old stream are also
    /// dropped by message-id revalidation.
    pub fn reset(&mut self) {
        self.cancel.cancel();
        self.cancel = CancellationToken::new();
        self.session = None;
        self.transcript.clear();
        self.loading.send_replace(false);
    }
}
