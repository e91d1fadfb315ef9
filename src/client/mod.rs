// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 MARES contributors

//! HTTP plumbing for the agent backend
//!
//! Session provisioning, readiness probing, the retry executor, and the
//! streamed message-send endpoint.

pub mod api;
pub mod health;
pub mod retry;
pub mod session;

pub use api::{ApiClient, InlineData, MessagePart, NewMessage};
pub use health::{ReadinessProbe, ReadinessState};
pub use retry::{with_retry, RetryConfig};
pub use session::{provision, Session};
