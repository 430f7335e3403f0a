//! Backend collaborator contract.
//!
//! The explorer never talks to a server directly. Every mutating operation
//! is delegated to a [`Backend`] after local permission checks pass.

use std::future::Future;

use serde::Serialize;

use crate::core::error::BackendError;
use crate::models::Entry;

/// One staged entry and the name it takes at the destination.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferItem {
    pub source_path: String,
    pub target_name: String,
}

/// Resolved paste operation handed to [`Backend::transfer`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferPlan {
    pub items: Vec<TransferItem>,
    pub destination_path: String,
    pub is_moving: bool,
}

impl TransferPlan {
    /// Source paths in staging order.
    pub fn source_paths(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(|item| item.source_path.as_str())
    }
}

/// Remote side of the explorer.
///
/// Each operation must be atomic per entry: an entry is either fully
/// created, renamed, moved or copied, or reported as failed.
pub trait Backend {
    /// Full snapshot of all entries.
    fn list(&self) -> impl Future<Output = Result<Vec<Entry>, BackendError>>;

    /// Create a folder and return it with its resolved path.
    fn create_folder(
        &self,
        name: &str,
        parent_path: &str,
    ) -> impl Future<Output = Result<Entry, BackendError>>;

    /// Rename an entry, returning it and any descendants under their new paths.
    ///
    /// Collisions with existing siblings must be rejected.
    fn rename(
        &self,
        path: &str,
        new_name: &str,
    ) -> impl Future<Output = Result<Vec<Entry>, BackendError>>;

    /// Delete entries and the descendants of deleted folders.
    fn delete(&self, paths: &[String]) -> impl Future<Output = Result<Vec<Entry>, BackendError>>;

    /// Move or copy entries, returning the entries created at the destination.
    fn transfer(
        &self,
        plan: &TransferPlan,
    ) -> impl Future<Output = Result<Vec<Entry>, BackendError>>;
}
