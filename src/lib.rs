// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 MARES contributors

//! MARES - chat client for the MARES research agent backend.
//!
//! This crate exposes the shared runtime used by the `mares` CLI
//! (`src/main.rs`):
//! - `client`: HTTP plumbing (session provisioning, readiness probe,
//!   retry executor, streamed message send)
//! - `sse`: incremental Server-Sent-Events demultiplexer over raw byte
//!   chunks and the agent run-event payload model
//! - `chat`: transcript, attachments, streaming accumulator, and the
//!   submission engine that ties the pipeline together
//! - `config`: settings persisted under `~/.mares/settings.json`

pub mod chat;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod sse;

pub use error::{MaresError, Result};
