//! Error types for the cloudconvert-jobs library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`CloudConvertError`] - **Fatal** for the request that raised it:
//!   malformed parameters, a non-2xx API response, a transport failure.
//!   Returned as `Err(CloudConvertError)` from every client and builder call.
//!
//! * [`ItemError`] - **Non-fatal** for a batch: one item failed, but the
//!   caller asked to continue on failure. Stored inside
//!   [`crate::output::ItemOutcome::Failed`] so the other items still
//!   produce their output.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the cloudconvert-jobs library.
#[derive(Debug, Error)]
pub enum CloudConvertError {
    // ── Validation errors ─────────────────────────────────────────────────
    /// A free-form JSON parameter could not be parsed.
    #[error("Invalid JSON in '{field}' field: {detail}")]
    MalformedInput { field: String, detail: String },

    /// An upload source was requested but the item carries no binary data.
    #[error("No binary data found for property \"{property}\"")]
    MissingBinary { property: String },

    /// No API key was supplied.
    #[error("CloudConvert API key is missing.\nSet CLOUDCONVERT_API_KEY or pass --api-key.")]
    MissingApiKey,

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── API errors ────────────────────────────────────────────────────────
    /// The CloudConvert API answered with a non-2xx status.
    #[error("CloudConvert API error {status} on {method} {url}: {message}")]
    Api {
        method: String,
        url: String,
        status: u16,
        message: String,
    },

    /// The storage endpoint rejected the multipart upload.
    #[error("File upload to '{url}' was rejected with HTTP {status}")]
    UploadRejected { url: String, status: u16 },

    /// The upload task finished without a form to post the file to.
    #[error("Upload task '{task_id}' returned no upload form")]
    MissingUploadForm { task_id: String },

    // ── Transport errors ──────────────────────────────────────────────────
    /// The request could not be sent or its body could not be read.
    #[error("HTTP request to '{url}' failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The response body was not the JSON we expected.
    #[error("Failed to decode response from '{url}': {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not write a downloaded file to disk.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error, e.g. a task graph with a dangling input.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CloudConvertError {
    /// Shorthand for [`CloudConvertError::MalformedInput`].
    pub fn malformed(field: impl Into<String>, detail: impl ToString) -> Self {
        Self::MalformedInput {
            field: field.into(),
            detail: detail.to_string(),
        }
    }

    /// `true` for errors caused by the caller's parameters rather than by
    /// the API or the network. These are shown to the user as-is.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::MalformedInput { .. }
                | Self::MissingBinary { .. }
                | Self::MissingApiKey
                | Self::InvalidConfig(_)
        )
    }

    /// HTTP status of an API error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } | Self::UploadRejected { status, .. } => Some(*status),
            Self::Http { source, .. } => source.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// A non-fatal error for a single batch item.
///
/// Serialises as `{"item": 3, "error": "..."}` so it can be written in the
/// item's output slot.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
#[error("Item {item}: {error}")]
pub struct ItemError {
    pub item: usize,
    pub error: String,
}

impl ItemError {
    pub fn new(item: usize, err: &CloudConvertError) -> Self {
        Self {
            item,
            error: err.to_string(),
        }
    }
}
