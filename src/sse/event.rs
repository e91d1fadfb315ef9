// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 MARES contributors

//! Agent run-event payloads
//!
//! Each SSE `data:` block carries one JSON document shaped as
//! `{ author?: string, content?: { parts: [{text?: string}, ...] } }`.
//! A malformed block yields an empty event and the stream keeps going.

use serde::Deserialize;

/// One decoded run event: the authoring agent and its text fragments
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunEvent {
    pub author: Option<String>,
    pub fragments: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    author: Option<String>,
    content: Option<RawContent>,
}

#[derive(Debug, Deserialize)]
struct RawContent {
    #[serde(default)]
    parts: Vec<RawPart>,
}

#[derive(Debug, Deserialize)]
struct RawPart {
    text: Option<String>,
}

impl RunEvent {
    /// Parse one dispatched `data:` block
    ///
    /// Parts without text (and empty-string text) are dropped. Invalid JSON
    /// is logged and produces an empty fragment list; a malformed event must
    /// never abort the stream.
    pub fn parse(data: &str) -> RunEvent {
        match serde_json::from_str::<RawEvent>(data) {
            Ok(raw) => RunEvent {
                author: raw.author,
                fragments: raw
                    .content
                    .map(|content| {
                        content
                            .parts
                            .into_iter()
                            .filter_map(|part| part.text.filter(|text| !text.is_empty()))
                            .collect()
                    })
                    .unwrap_or_default(),
            },
            Err(error) => {
                let truncated: String = data.chars().take(200).collect();
                tracing::warn!("dropping malformed SSE payload ({error}): {truncated}");
                RunEvent::default()
            }
        }
    }

    /// True when the event carries neither an author nor any text
    pub fn is_empty(&self) -> bool {
        self.author.is_none() && self.fragments.is_empty()
    }
}
