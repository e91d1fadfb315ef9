// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 MARES contributors

//! Settings management
//!
//! Handles loading and saving settings from ~/.mares/settings.json

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::chat::attachment::AttachmentPolicy;
use crate::error::Result;

/// Main settings structure, stored in ~/.mares/settings.json
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Backend connection settings
    #[serde(default)]
    pub backend: BackendConfig,

    /// Retry and resilience settings for API calls
    #[serde(default)]
    pub resilience: ResilienceConfig,

    /// Readiness probe settings
    #[serde(default)]
    pub readiness: ReadinessConfig,

    /// Attachment validation rules
    #[serde(default)]
    pub attachments: AttachmentPolicy,
}

/// Backend connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the agent backend API
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

fn default_base_url() -> String {
    "http://localhost:8000/api".to_string()
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

/// Retry settings for session creation and message send
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResilienceConfig {
    /// Maximum number of attempts
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Wall-clock budget in seconds for all attempts combined
    #[serde(default = "default_max_duration_secs")]
    pub max_duration_secs: u64,

    /// Base delay in milliseconds for exponential backoff
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Maximum delay in milliseconds (cap for backoff)
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_max_retries() -> u32 {
    10
}

fn default_max_duration_secs() -> u64 {
    120
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_max_delay_ms() -> u64 {
    5000
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            max_duration_secs: default_max_duration_secs(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

/// Readiness probe settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessConfig {
    /// Interval between polls in milliseconds
    #[serde(default = "default_readiness_interval_ms")]
    pub interval_ms: u64,

    /// Poll ceiling before the backend is declared unavailable
    #[serde(default = "default_readiness_max_attempts")]
    pub max_attempts: u32,
}

fn default_readiness_interval_ms() -> u64 {
    2000
}

fn default_readiness_max_attempts() -> u32 {
    60
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_readiness_interval_ms(),
            max_attempts: default_readiness_max_attempts(),
        }
    }
}

impl Settings {
    /// Configuration directory (~/.mares)
    pub fn config_dir() -> PathBuf {
        dirs::home_dir().unwrap_or_default().join(".mares")
    }

    /// Path to the settings file
    pub fn path() -> PathBuf {
        Self::config_dir().join("settings.json")
    }

    /// Load settings from the default path; a missing file yields defaults
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path())
    }

    /// Load settings from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Save settings to the default path, creating the directory if needed
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path())
    }

    /// Save settings to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}
