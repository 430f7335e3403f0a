use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::ROOT_FOLDER_NAME;
use crate::utils::path::{join_path, parent_path};

// =============================================================================
// Entry
// =============================================================================

/// A file or folder record in the flat entry collection.
///
/// Entries arrive from the backend as JSON with camelCase keys:
///
/// ```json
/// { "name": "report.pdf", "path": "/docs/report.pdf", "isDirectory": false,
///   "size": 1024, "updatedAt": "2024-01-01T00:00:00Z" }
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    /// Leaf segment, unique among siblings
    pub name: String,
    /// Full path (`parent + "/" + name`)
    pub path: String,
    /// Folder or file; never changes for the lifetime of the entry
    pub is_directory: bool,
    /// Presentation-only name override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// File size in bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// Last modification time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Directory whose children have not been loaded yet
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_placeholder: bool,
    /// Entry currently being named (new folder or in-place rename)
    #[serde(skip)]
    pub is_editing: bool,
}

impl Entry {
    fn new(parent: &str, name: &str, is_directory: bool) -> Self {
        Self {
            name: name.to_string(),
            path: join_path(parent, name),
            is_directory,
            display_name: None,
            size: None,
            updated_at: None,
            is_placeholder: false,
            is_editing: false,
        }
    }

    /// Create a file entry under `parent`.
    pub fn file(parent: &str, name: &str) -> Self {
        Self::new(parent, name, false)
    }

    /// Create a folder entry under `parent`.
    pub fn folder(parent: &str, name: &str) -> Self {
        Self::new(parent, name, true)
    }

    /// Synthetic root folder used when an operation targets the root.
    pub fn home() -> Self {
        Self {
            name: ROOT_FOLDER_NAME.to_string(),
            path: "/".to_string(),
            is_directory: true,
            display_name: None,
            size: None,
            updated_at: None,
            is_placeholder: false,
            is_editing: false,
        }
    }

    /// Set the file size.
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    /// Set the modification time.
    pub fn with_updated_at(mut self, updated_at: DateTime<Utc>) -> Self {
        self.updated_at = Some(updated_at);
        self
    }

    /// Set the display name override.
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    /// Mark as a placeholder whose children are still loading.
    pub fn placeholder(mut self) -> Self {
        self.is_placeholder = true;
        self
    }

    /// Name shown to the user (display name override or leaf name).
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }

    /// Path of the folder containing this entry.
    pub fn parent_path(&self) -> &str {
        parent_path(&self.path)
    }

    /// Check whether this entry may appear in listings and selections.
    #[inline]
    pub fn is_listable(&self) -> bool {
        !self.is_placeholder
    }

    /// Check whether the stored path agrees with the name.
    pub fn is_consistent(&self) -> bool {
        !self.name.is_empty()
            && !self.name.contains('/')
            && self.path == join_path(self.parent_path(), &self.name)
    }
}

// =============================================================================
// Sorting
// =============================================================================

/// Column used to order a listing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    /// Display name (default)
    #[default]
    Name,
    /// File size
    Size,
    /// Modification time
    Modified,
}

/// Sort direction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    /// Apply this direction to an ascending ordering.
    #[inline]
    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Self::Asc => ordering,
            Self::Desc => ordering.reverse(),
        }
    }
}

/// Active sort column and direction for the current listing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortConfig {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl SortConfig {
    pub fn new(key: SortKey, direction: SortDirection) -> Self {
        Self { key, direction }
    }

    /// Column header click: flip direction on the active ascending key,
    /// otherwise sort ascending by `key`.
    pub fn toggled(self, key: SortKey) -> Self {
        let direction = if self.key == key && self.direction == SortDirection::Asc {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        };
        Self { key, direction }
    }
}
