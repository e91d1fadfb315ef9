// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 MARES contributors

//! Session provisioning
//!
//! A session is created lazily on first submission and lives until an
//! explicit reset discards it. The backend assigns all identifiers; the
//! client only supplies the randomized provisioning key.

use serde::{Deserialize, Serialize};

use crate::client::api::ApiClient;
use crate::client::retry::{with_retry, RetryConfig};
use crate::error::Result;

/// The `(userId, sessionId, appName)` triple echoed by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    pub session_id: String,
    pub app_name: String,
}

/// Provision a session through the retry executor
///
/// Each attempt generates a fresh provisioning key, so a retried creation
/// never reuses a half-created session. Exhausted retries surface as a
/// provisioning failure, fatal to the current submission.
pub async fn provision(api: &ApiClient, retry: &RetryConfig) -> Result<Session> {
    with_retry(|| api.create_session(), retry, "create_session").await
}
