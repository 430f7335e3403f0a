//! Upload task types.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Entry;
use crate::core::error::UploadError;

/// Caller-supplied metadata sent along with an upload.
pub type Metadata = BTreeMap<String, String>;

/// Identifier of an upload task within a pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Raw file queued for upload.
///
/// Bytes are shared so retries and snapshots do not copy the payload.
#[derive(Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub name: String,
    /// MIME type; empty when unknown
    pub content_type: String,
    pub data: Rc<[u8]>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            data: data.into(),
        }
    }

    /// Size in bytes.
    #[inline]
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    /// Content type to send with a raw upload.
    pub fn content_type_or_default(&self) -> &str {
        if self.content_type.is_empty() {
            "application/octet-stream"
        } else {
            &self.content_type
        }
    }
}

impl fmt::Debug for UploadFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadFile")
            .field("name", &self.name)
            .field("content_type", &self.content_type)
            .field("size", &self.data.len())
            .finish()
    }
}

/// Upload task lifecycle.
///
/// `Queued → Validating → Uploading → {Completed | Failed | Canceled}`;
/// `Failed` and `Canceled` may be retried.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UploadState {
    #[default]
    Queued,
    Validating,
    Uploading,
    Completed,
    Failed,
    Canceled,
}

impl UploadState {
    /// No automatic transition leaves a terminal state.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Canceled)
    }

    /// Check whether a manual retry is possible.
    pub fn can_retry(self) -> bool {
        matches!(self, Self::Failed | Self::Canceled)
    }

    /// Validating or uploading.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Validating | Self::Uploading)
    }
}

/// Point-in-time view of an upload task.
#[derive(Clone, Debug, PartialEq)]
pub struct UploadTask {
    pub id: TaskId,
    pub file: UploadFile,
    pub metadata: Metadata,
    /// Folder the file is uploaded into
    pub destination: String,
    /// 0–100
    pub progress: u8,
    pub state: UploadState,
    pub error: Option<UploadError>,
    /// Pre-upload validation has passed at least once
    pub validated: bool,
}

/// Normalized result reported when an upload completes.
#[derive(Clone, Debug, PartialEq)]
pub enum UploadResult {
    /// Signed-URL upload; the engine knows what was stored
    Signed(SignedUploadRecord),
    /// Direct upload; the server's raw response body
    Direct(String),
}

/// File description synthesized after a signed-URL upload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedUploadRecord {
    pub name: String,
    pub size: u64,
    #[serde(rename = "mimeType")]
    pub content_type: String,
    pub metadata: Metadata,
    pub updated_at: DateTime<Utc>,
}

/// Shapes a direct-upload server may answer with.
#[derive(Deserialize)]
#[serde(untagged)]
enum DirectResponse {
    Wrapped { file: Entry },
    Bare(Entry),
}

impl UploadResult {
    /// Entry to append to the store for a file uploaded into `destination`.
    ///
    /// Direct uploads are parsed from the server's JSON (`{ "file": entry }`
    /// or a bare entry); `None` when the response cannot be understood.
    pub fn to_entry(&self, destination: &str) -> Option<Entry> {
        match self {
            Self::Signed(record) => Some(
                Entry::file(destination, &record.name)
                    .with_size(record.size)
                    .with_updated_at(record.updated_at),
            ),
            Self::Direct(body) => match serde_json::from_str::<DirectResponse>(body) {
                Ok(DirectResponse::Wrapped { file } | DirectResponse::Bare(file)) => Some(file),
                Err(err) => {
                    log::warn!("Unrecognized upload response: {}", err);
                    None
                }
            },
        }
    }
}
