// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 MARES contributors

//! File attachments
//!
//! Attachments are read fully into memory and sent inline as base64; there
//! is no chunked upload. Policy violations block a submission before any
//! transcript or network activity.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{MaresError, Result};

/// One file attached to a submission
#[derive(Debug, Clone, Serialize)]
pub struct Attachment {
    pub file_name: String,
    pub media_type: String,
    #[serde(skip)]
    pub data: Vec<u8>,
}

impl Attachment {
    pub fn new(
        file_name: impl Into<String>,
        media_type: impl Into<String>,
        data: Vec<u8>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            media_type: media_type.into(),
            data,
        }
    }

    /// Read a file fully into memory, deriving the media type from its
    /// extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let media_type = media_type_for(&extension_of(&file_name)).to_string();
        Ok(Self {
            file_name,
            media_type,
            data,
        })
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    /// Base64 payload for the `inline_data` message part
    pub fn to_base64(&self) -> String {
        BASE64.encode(&self.data)
    }
}

/// Media type for a file extension; the backend only needs a declared type
pub fn media_type_for(extension: &str) -> &'static str {
    match extension.to_ascii_lowercase().as_str() {
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "md" => "text/markdown",
        "csv" => "text/csv",
        "json" => "application/json",
        "xml" => "application/xml",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => "application/octet-stream",
    }
}

fn extension_of(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Static validation rules applied before a submission reaches the engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentPolicy {
    /// Maximum number of files per submission
    #[serde(default = "default_max_files")]
    pub max_files: usize,

    /// Maximum size per file in bytes
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,

    /// Accepted file extensions (lowercase, without dots)
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,
}

fn default_max_files() -> usize {
    5
}

fn default_max_file_size() -> u64 {
    10 * 1024 * 1024
}

fn default_allowed_extensions() -> Vec<String> {
    ["pdf", "txt", "doc", "docx", "md", "csv", "json", "xml"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for AttachmentPolicy {
    fn default() -> Self {
        Self {
            max_files: default_max_files(),
            max_file_size: default_max_file_size(),
            allowed_extensions: default_allowed_extensions(),
        }
    }
}

impl AttachmentPolicy {
    /// Validate a set of attachments, producing a user-visible message on
    /// the first violation
    pub fn validate(&self, attachments: &[Attachment]) -> Result<()> {
        if attachments.len() > self.max_files {
            return Err(MaresError::Attachment(format!(
                "Maximum {} files allowed",
                self.max_files
            )));
        }
        for attachment in attachments {
            if attachment.size() > self.max_file_size {
                return Err(MaresError::Attachment(format!(
                    "File \"{}\" exceeds maximum size of {}MB",
                    attachment.file_name,
                    self.max_file_size / 1024 / 1024
                )));
            }
            let extension = extension_of(&attachment.file_name).to_ascii_lowercase();
            if !self.allowed_extensions.contains(&extension) {
                return Err(MaresError::Attachment(format!(
                    "File type \".{}\" is not supported",
                    extension
                )));
            }
        }
        Ok(())
    }
}
