//! Explorer configuration.
//!
//! Centralizes the configuration constants used throughout the engine and
//! the serde-loadable settings supplied by the host application.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::core::upload::UploadValidator;
use crate::models::PermissionRule;

// =============================================================================
// Navigation
// =============================================================================

/// Name of the root folder shown in breadcrumbs and denial messages.
pub const ROOT_FOLDER_NAME: &str = "Home";

/// Base name for folders created from the toolbar or context menu.
pub const NEW_FOLDER_NAME: &str = "New Folder";

// =============================================================================
// Pointer Gestures
// =============================================================================

/// Two clicks on the same entry within this window open it.
pub const DOUBLE_CLICK_WINDOW_MS: u64 = 300;

/// Press-and-hold duration that adds an entry to the selection.
pub const LONG_PRESS_THRESHOLD_MS: u64 = 500;

// =============================================================================
// Display
// =============================================================================

/// Names longer than this are shortened in the middle.
pub const MAX_NAME_DISPLAY_LEN: usize = 40;

// =============================================================================
// Upload
// =============================================================================

/// Upload wire format constants.
pub mod upload {
    /// Multipart field carrying the file in direct uploads.
    pub const FILE_FIELD: &str = "file";
    /// JSON key of the URL returned by the signed-URL endpoint.
    pub const SIGNED_URL_KEY: &str = "signedUrl";
    /// Message used when a failure carries no message of its own.
    pub const DEFAULT_ERROR: &str = "Upload failed.";
    /// Message used when the signed-URL endpoint rejects the request.
    pub const SIGNED_URL_ERROR: &str = "Failed to get signed upload URL";
}

// =============================================================================
// Explorer Settings
// =============================================================================

/// Settings supplied by the host application.
///
/// Loaded from JSON with camelCase keys; every field is optional.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExplorerConfig {
    /// Folder to open first, if it exists
    pub initial_path: String,
    /// Label of the root breadcrumb
    pub root_folder: String,
    /// Collapse every selection gesture to a single entry
    pub disable_multiple_selection: bool,
    /// Path-pattern permission rules
    pub permissions: Vec<PermissionRule>,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            initial_path: String::new(),
            root_folder: ROOT_FOLDER_NAME.to_string(),
            disable_multiple_selection: false,
            permissions: Vec::new(),
        }
    }
}

impl ExplorerConfig {
    /// Parse settings from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// How files reach the server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransferMode {
    /// Multipart `POST` to a fixed endpoint
    Direct { url: String },
    /// Ask `endpoint` for a short-lived URL, then `PUT` the raw bytes there
    SignedUrl { endpoint: String },
}

/// Upload settings.
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UploadConfig {
    /// Direct upload endpoint
    pub url: Option<String>,
    /// Endpoint issuing signed upload URLs; takes precedence over `url`
    pub generate_signed_url_endpoint: Option<String>,
    /// Headers applied to the transfer request
    pub headers: BTreeMap<String, String>,
    /// Largest accepted file in bytes
    pub max_file_size: Option<u64>,
    /// Comma-separated extensions, e.g. `".png, .pdf"`
    pub accepted_file_types: Option<String>,
    /// Pre-flight validator
    #[serde(skip)]
    pub can_upload: Option<Rc<dyn UploadValidator>>,
}

impl UploadConfig {
    /// Parse settings from JSON. The validator must be attached separately.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Direct upload to `url`.
    pub fn direct(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Default::default()
        }
    }

    /// Signed-URL upload through `endpoint`.
    pub fn signed(endpoint: impl Into<String>) -> Self {
        Self {
            generate_signed_url_endpoint: Some(endpoint.into()),
            ..Default::default()
        }
    }

    /// Attach a pre-flight validator.
    pub fn with_validator(mut self, validator: impl UploadValidator + 'static) -> Self {
        self.can_upload = Some(Rc::new(validator));
        self
    }

    /// Add a header sent with every transfer.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Resolve the transport mode, if an endpoint is configured.
    pub fn mode(&self) -> Option<TransferMode> {
        if let Some(endpoint) = &self.generate_signed_url_endpoint {
            return Some(TransferMode::SignedUrl {
                endpoint: endpoint.clone(),
            });
        }
        self.url
            .as_ref()
            .map(|url| TransferMode::Direct { url: url.clone() })
    }

    /// Accepted extensions, lowercase and without the leading dot.
    ///
    /// Empty when every type is accepted.
    pub fn accepted_extensions(&self) -> Vec<String> {
        self.accepted_file_types
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(|ext| ext.trim().trim_start_matches('.').to_lowercase())
            .filter(|ext| !ext.is_empty() && ext != "*")
            .collect()
    }
}

impl fmt::Debug for UploadConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadConfig")
            .field("url", &self.url)
            .field(
                "generate_signed_url_endpoint",
                &self.generate_signed_url_endpoint,
            )
            .field("headers", &self.headers)
            .field("max_file_size", &self.max_file_size)
            .field("accepted_file_types", &self.accepted_file_types)
            .field("can_upload", &self.can_upload.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Action;

    #[test]
    fn test_explorer_config_defaults() {
        let config = ExplorerConfig::from_json("{}").unwrap();
        assert_eq!(config.root_folder, "Home");
        assert_eq!(config.initial_path, "");
        assert!(!config.disable_multiple_selection);
        assert!(config.permissions.is_empty());
    }

    #[test]
    fn test_explorer_config_from_json() {
        let json = r#"{
            "initialPath": "/docs",
            "disableMultipleSelection": true,
            "permissions": [{"path": "/docs/**", "delete": false}]
        }"#;
        let config = ExplorerConfig::from_json(json).unwrap();
        assert_eq!(config.initial_path, "/docs");
        assert!(config.disable_multiple_selection);
        assert_eq!(config.permissions[0].flags.get(Action::Delete), Some(false));
    }

    #[test]
    fn test_upload_mode_prefers_signed_url() {
        let mut config = UploadConfig::direct("https://api.test/upload");
        assert_eq!(
            config.mode(),
            Some(TransferMode::Direct {
                url: "https://api.test/upload".to_string()
            })
        );
        config.generate_signed_url_endpoint = Some("https://api.test/sign".to_string());
        assert!(matches!(config.mode(), Some(TransferMode::SignedUrl { .. })));
        assert_eq!(UploadConfig::default().mode(), None);
    }

    #[test]
    fn test_upload_config_from_json() {
        let json = r#"{
            "url": "https://api.test/upload",
            "headers": {"Authorization": "Bearer token"},
            "maxFileSize": 1048576,
            "acceptedFileTypes": ".png, .PDF"
        }"#;
        let config = UploadConfig::from_json(json).unwrap();
        assert_eq!(config.headers["Authorization"], "Bearer token");
        assert_eq!(config.max_file_size, Some(1_048_576));
        assert_eq!(config.accepted_extensions(), vec!["png", "pdf"]);
        assert!(config.can_upload.is_none());
    }
}
