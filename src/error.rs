// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 MARES contributors

//! Error types for the MARES client
//!
//! This module defines all error types used throughout the application.

use thiserror::Error;

/// Main error type for MARES client operations
#[derive(Error, Debug)]
pub enum MaresError {
    /// API-related errors
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Attachment validation errors
    #[error("Attachment error: {0}")]
    Attachment(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// API-specific error types
#[derive(Error, Debug)]
pub enum ApiError {
    /// Session provisioning failed with a non-success status
    #[error("Failed to create session: {status} {message}")]
    Provisioning { status: u16, message: String },

    /// Message send failed with a non-success status
    #[error("Failed to send message: {status} {message}")]
    Send { status: u16, message: String },

    /// Network connectivity error
    #[error("Network error: {0}")]
    Network(String),

    /// Retry budget exhausted before any attempt succeeded
    #[error("Retry timeout after {0}ms")]
    RetryTimeout(u64),

    /// Invalid response from the backend
    #[error("Invalid API response: {0}")]
    InvalidResponse(String),

    /// Streaming error while reading a response body
    #[error("Streaming error: {0}")]
    StreamError(String),
}

/// Result type alias for MARES client operations
pub type Result<T> = std::result::Result<T, MaresError>;
