//! Error types for the explorer engine.
//!
//! Provides structured error handling with meaningful error messages
//! and proper error categorization for each domain:
//!
//! - [`PermissionDenied`] - Rejected by the permission engine before any network call
//! - [`UploadError`] - Validation, signed-URL, transfer, and cancellation failures
//! - [`BackendError`] - Failures reported by the backend collaborator
//! - [`ExplorerError`] - Everything an explorer operation can return

use thiserror::Error;

use crate::models::Action;

/// An action was denied by the permission rules.
///
/// Carries the action and, for single-entry checks, the entry's display name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{} access denied{}", .action.readable(), denied_suffix(.entry))]
pub struct PermissionDenied {
    pub action: Action,
    pub entry: Option<String>,
}

fn denied_suffix(entry: &Option<String>) -> String {
    entry
        .as_ref()
        .map(|name| format!(" for {}", name))
        .unwrap_or_default()
}

/// Stable category of an upload failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadErrorKind {
    /// Pre-upload check rejected the file
    ValidationFailed,
    /// Could not obtain a signed upload URL
    SignedUrlFailed,
    /// Network or server error during the transfer
    TransferFailed,
    /// Aborted by the user
    Canceled,
}

/// Upload failure reported through the pipeline's event channel.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct UploadError {
    pub kind: UploadErrorKind,
    pub message: String,
    /// HTTP status, when a response was received
    pub status: Option<u16>,
    pub status_text: Option<String>,
    /// Raw response body
    pub body: Option<String>,
}

impl UploadError {
    pub fn new(kind: UploadErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
            status_text: None,
            body: None,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(UploadErrorKind::ValidationFailed, message)
    }

    pub fn canceled() -> Self {
        Self::new(UploadErrorKind::Canceled, "Upload canceled.")
    }

    /// Attach the HTTP response that caused the failure.
    pub fn with_response(
        mut self,
        status: u16,
        status_text: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        self.status = Some(status);
        self.status_text = Some(status_text.into());
        self.body = Some(body.into());
        self
    }
}

/// Failure reported by the backend collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// Request could not be sent or no response arrived
    #[error("Network error: {0}")]
    Network(String),
    /// Non-2xx response
    #[error("HTTP error {status}: {status_text}")]
    Http {
        status: u16,
        status_text: String,
        body: String,
    },
    /// Name collides with an existing sibling
    #[error("'{0}' already exists")]
    Conflict(String),
    /// Target path is unknown to the backend
    #[error("'{0}' not found")]
    NotFound(String),
    /// Response could not be decoded
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Errors returned by explorer operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExplorerError {
    #[error(transparent)]
    PermissionDenied(#[from] PermissionDenied),
    #[error("Cannot paste here: {0}")]
    InvalidPasteTarget(String),
    #[error("Clipboard is empty")]
    EmptyClipboard,
    #[error("No items selected")]
    NothingSelected,
    #[error("'{0}' not found")]
    NotFound(String),
    #[error("Invalid name '{0}'")]
    InvalidName(String),
    #[error("Another item is already being edited")]
    EditInProgress,
    #[error("Nothing is being edited")]
    NotEditing,
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error(transparent)]
    Backend(#[from] BackendError),
}
