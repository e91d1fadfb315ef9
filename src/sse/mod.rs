// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 MARES contributors

//! Server-Sent-Events demultiplexing
//!
//! Turns raw byte chunks from a streamed response body into decoded agent
//! run events.

pub mod decoder;
pub mod event;

pub use decoder::{payload_stream, SseDecoder};
pub use event::RunEvent;
