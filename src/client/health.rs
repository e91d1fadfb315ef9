// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 MARES contributors

//! Backend readiness probe
//!
//! Polls the health endpoint until the backend accepts traffic or the
//! attempt ceiling elapses. Failed polls are swallowed; the outcome is a
//! state, never an error.

use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::client::api::ApiClient;
use crate::config::ReadinessConfig;

/// Outcome of the readiness gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadinessState {
    /// Still polling
    Checking,
    /// Backend answered a poll successfully
    Ready,
    /// Attempt ceiling reached (or the wait was cancelled) without success
    Unavailable,
}

/// Polls the backend health endpoint at a fixed interval
#[derive(Debug, Clone)]
pub struct ReadinessProbe {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for ReadinessProbe {
    fn default() -> Self {
        Self::from(&ReadinessConfig::default())
    }
}

impl From<&ReadinessConfig> for ReadinessProbe {
    fn from(config: &ReadinessConfig) -> Self {
        Self {
            interval: Duration::from_millis(config.interval_ms),
            max_attempts: config.max_attempts,
        }
    }
}

impl ReadinessProbe {
    /// Wait until the backend is ready, the attempt ceiling elapses, or the
    /// token is cancelled. Never returns `Checking`.
    pub async fn wait(&self, api: &ApiClient, cancel: &CancellationToken) -> ReadinessState {
        for attempt in 0..self.max_attempts {
            if cancel.is_cancelled() {
                return ReadinessState::Unavailable;
            }
            if api.check_health().await {
                return ReadinessState::Ready;
            }
            tracing::debug!(attempt, "backend not ready, waiting");
            tokio::select! {
                _ = cancel.cancelled() => return ReadinessState::Unavailable,
                _ = sleep(self.interval) => {}
            }
        }
        tracing::error!(
            "backend failed to become ready within {} attempts",
            self.max_attempts
        );
        ReadinessState::Unavailable
    }
}
