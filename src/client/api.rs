// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 MARES contributors

//! HTTP client for the agent backend
//!
//! Wraps the three backend endpoints: session creation, the readiness probe,
//! and the streamed `run_sse` message send. Response bodies from `run_sse`
//! are handed back as raw byte streams for the SSE demultiplexer.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::client::session::Session;
use crate::error::{ApiError, MaresError, Result};

/// Client for the MARES agent backend
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a new client for the given base URL (e.g. `http://localhost:8000/api`)
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            client: Client::new(),
            base_url,
        }
    }

    /// The backend base URL this client talks to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Create a session keyed by a fresh client-generated identifier
    ///
    /// Returns the `(userId, sessionId, appName)` triple as echoed by the
    /// backend. A non-success status is a provisioning failure.
    pub async fn create_session(&self) -> Result<Session> {
        let provisioning_key = Uuid::new_v4();
        let url = format!(
            "{}/apps/app/users/u_999/sessions/{}",
            self.base_url, provisioning_key
        );

        let response = self
            .client
            .post(&url)
            .header("content-type", "application/json")
            .send()
            .await
            .map_err(|e| MaresError::Api(ApiError::Network(e.to_string())))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MaresError::Api(ApiError::Provisioning {
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or("").to_string(),
            }));
        }

        let created: SessionResponse = response
            .json()
            .await
            .map_err(|e| MaresError::Api(ApiError::InvalidResponse(e.to_string())))?;

        Ok(Session {
            user_id: created.user_id,
            session_id: created.id,
            app_name: created.app_name,
        })
    }

    /// One readiness poll against the docs endpoint
    ///
    /// Network failures and non-success statuses both count as "not ready"
    /// and are swallowed.
    pub async fn check_health(&self) -> bool {
        let url = format!("{}/docs", self.base_url);
        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(error) => {
                tracing::debug!("backend not ready yet: {error}");
                false
            }
        }
    }

    /// Send a message and return the streamed SSE response
    ///
    /// The response body is consumed by the caller as a raw byte stream.
    pub async fn run_sse(&self, session: &Session, parts: Vec<MessagePart>) -> Result<reqwest::Response> {
        let url = format!("{}/run_sse", self.base_url);
        let body = RunRequest {
            app_name: &session.app_name,
            user_id: &session.user_id,
            session_id: &session.session_id,
            new_message: NewMessage {
                parts,
                role: "user",
            },
            streaming: false,
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| MaresError::Api(ApiError::Network(e.to_string())))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MaresError::Api(ApiError::Send {
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or("").to_string(),
            }));
        }

        Ok(response)
    }
}

// Backend wire types

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionResponse {
    user_id: String,
    id: String,
    app_name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RunRequest<'a> {
    app_name: &'a str,
    user_id: &'a str,
    session_id: &'a str,
    new_message: NewMessage,
    streaming: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewMessage {
    pub parts: Vec<MessagePart>,
    pub role: &'static str,
}

/// One part of an outgoing message: query text or inline attachment data
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum MessagePart {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

#[derive(Debug, Clone, Serialize)]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}
