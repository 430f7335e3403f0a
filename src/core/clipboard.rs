//! Cut/copy staging and paste resolution.

use std::collections::HashSet;

use crate::core::backend::{Backend, TransferItem, TransferPlan};
use crate::core::error::ExplorerError;
use crate::core::naming::unique_name;
use crate::core::permissions::PermissionEngine;
use crate::core::store::EntryStore;
use crate::models::{Action, Entry};
use crate::utils::path::is_within;

/// Entries staged by a cut or copy.
#[derive(Clone, Debug, PartialEq)]
pub struct ClipboardEntry {
    pub files: Vec<Entry>,
    pub is_moving: bool,
}

/// Holds at most one staged transfer.
#[derive(Clone, Debug, Default)]
pub struct Clipboard {
    staged: Option<ClipboardEntry>,
}

impl Clipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn staged(&self) -> Option<&ClipboardEntry> {
        self.staged.as_ref()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.staged.is_none()
    }

    /// Check whether `path` is staged for a move (rendered dimmed).
    pub fn is_moving(&self, path: &str) -> bool {
        self.staged
            .as_ref()
            .is_some_and(|s| s.is_moving && s.files.iter().any(|e| e.path == path))
    }

    /// Stage `files` for a cut (`is_moving`) or copy.
    ///
    /// Replaces any prior staged transfer.
    pub fn stage(
        &mut self,
        files: Vec<Entry>,
        is_moving: bool,
        permissions: &PermissionEngine,
    ) -> Result<(), ExplorerError> {
        if files.is_empty() {
            return Err(ExplorerError::NothingSelected);
        }
        let action = if is_moving { Action::Move } else { Action::Copy };
        let refs: Vec<&Entry> = files.iter().collect();
        permissions.authorize(&refs, action)?;

        log::debug!(
            "Staged {} entries for {}",
            files.len(),
            if is_moving { "move" } else { "copy" }
        );
        self.staged = Some(ClipboardEntry { files, is_moving });
        Ok(())
    }

    pub fn clear(&mut self) {
        self.staged = None;
    }

    /// Validate a paste into `destination` and resolve target names.
    ///
    /// `None` is the root. Nothing here touches the network.
    pub fn plan_paste(
        &self,
        destination: Option<&Entry>,
        store: &EntryStore,
        permissions: &PermissionEngine,
    ) -> Result<TransferPlan, ExplorerError> {
        let staged = self.staged.as_ref().ok_or(ExplorerError::EmptyClipboard)?;

        let destination_path = destination.map_or("", |d| d.path.as_str());
        if let Some(folder) = destination
            && !folder.is_directory
        {
            return Err(ExplorerError::InvalidPasteTarget(format!(
                "'{}' is not a folder",
                folder.label()
            )));
        }
        if let Some(source) = staged
            .files
            .iter()
            .find(|file| is_within(destination_path, &file.path))
        {
            return Err(ExplorerError::InvalidPasteTarget(format!(
                "'{}' cannot be pasted into itself",
                source.label()
            )));
        }

        permissions.authorize_folder(destination, Action::Create)?;

        let mut assigned: HashSet<String> = HashSet::new();
        let mut items = Vec::with_capacity(staged.files.len());
        for file in &staged.files {
            // Moving into the current parent is a no-op
            if staged.is_moving && file.parent_path() == destination_path {
                continue;
            }
            let target_name = unique_name(&file.name, file.is_directory, |candidate| {
                store.has_child(destination_path, candidate) || assigned.contains(candidate)
            });
            assigned.insert(target_name.clone());
            items.push(TransferItem {
                source_path: file.path.clone(),
                target_name,
            });
        }

        Ok(TransferPlan {
            items,
            destination_path: destination_path.to_string(),
            is_moving: staged.is_moving,
        })
    }

    /// Paste the staged entries into `destination` through `backend`.
    ///
    /// On success the created entries are upserted into `store`. A move
    /// removes the sources first and returns the clipboard to idle; a copy
    /// stays staged.
    pub async fn paste<B: Backend>(
        &mut self,
        destination: Option<&Entry>,
        store: &mut EntryStore,
        permissions: &PermissionEngine,
        backend: &B,
    ) -> Result<Vec<Entry>, ExplorerError> {
        let plan = self.plan_paste(destination, store, permissions)?;

        if plan.items.is_empty() {
            log::debug!("Paste into '{}' has nothing to transfer", plan.destination_path);
            if plan.is_moving {
                self.clear();
            }
            return Ok(Vec::new());
        }

        let created = backend.transfer(&plan).await?;

        if plan.is_moving {
            for source in plan.source_paths() {
                store.remove_subtree(source);
            }
            self.clear();
        }
        store.upsert_all(created.iter().cloned());

        log::debug!(
            "Pasted {} entries into '{}'",
            created.len(),
            plan.destination_path
        );
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockBackend;
    use crate::models::PermissionRule;

    fn create_test_store() -> EntryStore {
        EntryStore::from_entries(vec![
            Entry::folder("", "a"),
            Entry::folder("", "b"),
            Entry::file("/a", "report.pdf"),
            Entry::file("/b", "report.pdf"),
            Entry::folder("/a", "sub"),
            Entry::file("/a/sub", "deep.txt"),
        ])
    }

    fn entry(store: &EntryStore, path: &str) -> Entry {
        store.get(path).cloned().unwrap()
    }

    // =========================================================================
    // Staging
    // =========================================================================

    #[test]
    fn test_stage_requires_permission() {
        let store = create_test_store();
        let rules = PermissionEngine::new(&[PermissionRule::new("/a/**").deny(Action::Move)]);
        let mut clipboard = Clipboard::new();

        let err = clipboard
            .stage(vec![entry(&store, "/a/report.pdf")], true, &rules)
            .unwrap_err();
        assert!(matches!(err, ExplorerError::PermissionDenied(_)));
        assert!(clipboard.is_empty());

        clipboard
            .stage(vec![entry(&store, "/a/report.pdf")], false, &rules)
            .unwrap();
        assert!(!clipboard.staged().unwrap().is_moving);
    }

    #[test]
    fn test_stage_replaces_and_rejects_empty() {
        let store = create_test_store();
        let rules = PermissionEngine::default();
        let mut clipboard = Clipboard::new();
        clipboard.stage(vec![entry(&store, "/a")], true, &rules).unwrap();
        clipboard.stage(vec![entry(&store, "/b")], true, &rules).unwrap();
        assert_eq!(clipboard.staged().unwrap().files[0].path, "/b");
        assert!(clipboard.is_moving("/b"));
        assert!(!clipboard.is_moving("/a"));

        assert_eq!(
            clipboard.stage(Vec::new(), true, &rules),
            Err(ExplorerError::NothingSelected)
        );
    }

    // =========================================================================
    // Planning
    // =========================================================================

    #[test]
    fn test_plan_resolves_collisions() {
        let store = create_test_store();
        let rules = PermissionEngine::default();
        let mut clipboard = Clipboard::new();
        clipboard
            .stage(vec![entry(&store, "/a/report.pdf")], false, &rules)
            .unwrap();

        let dest = entry(&store, "/b");
        let plan = clipboard.plan_paste(Some(&dest), &store, &rules).unwrap();
        assert_eq!(plan.items[0].target_name, "report (1).pdf");
        assert_eq!(plan.destination_path, "/b");
        assert!(!plan.is_moving);
    }

    #[test]
    fn test_plan_unique_within_batch() {
        let store = create_test_store();
        let rules = PermissionEngine::default();
        let mut clipboard = Clipboard::new();
        clipboard
            .stage(
                vec![entry(&store, "/a/report.pdf"), entry(&store, "/b/report.pdf")],
                false,
                &rules,
            )
            .unwrap();

        let plan = clipboard.plan_paste(None, &store, &rules).unwrap();
        let names: Vec<_> = plan.items.iter().map(|i| i.target_name.as_str()).collect();
        assert_eq!(names, vec!["report.pdf", "report (1).pdf"]);
        assert_eq!(plan.destination_path, "");
    }

    #[test]
    fn test_plan_rejects_self_and_descendant() {
        let store = create_test_store();
        let rules = PermissionEngine::default();
        let mut clipboard = Clipboard::new();
        clipboard.stage(vec![entry(&store, "/a")], true, &rules).unwrap();

        for target in ["/a", "/a/sub"] {
            let dest = entry(&store, target);
            let err = clipboard.plan_paste(Some(&dest), &store, &rules).unwrap_err();
            assert!(matches!(err, ExplorerError::InvalidPasteTarget(_)));
        }
    }

    #[test]
    fn test_plan_rejects_file_target() {
        let store = create_test_store();
        let rules = PermissionEngine::default();
        let mut clipboard = Clipboard::new();
        clipboard.stage(vec![entry(&store, "/b")], false, &rules).unwrap();

        let dest = entry(&store, "/a/report.pdf");
        let err = clipboard.plan_paste(Some(&dest), &store, &rules).unwrap_err();
        assert!(matches!(err, ExplorerError::InvalidPasteTarget(_)));
    }

    #[test]
    fn test_plan_requires_create() {
        let store = create_test_store();
        let rules = PermissionEngine::new(&[PermissionRule::new("/b").deny(Action::Create)]);
        let mut clipboard = Clipboard::new();
        clipboard.stage(vec![entry(&store, "/a/sub")], false, &rules).unwrap();

        let dest = entry(&store, "/b");
        let err = clipboard.plan_paste(Some(&dest), &store, &rules).unwrap_err();
        assert_eq!(err.to_string(), "Create access denied for b");
    }

    #[test]
    fn test_plan_requires_staging() {
        let store = create_test_store();
        let err = Clipboard::new()
            .plan_paste(None, &store, &PermissionEngine::default())
            .unwrap_err();
        assert_eq!(err, ExplorerError::EmptyClipboard);
    }

    // =========================================================================
    // Paste
    // =========================================================================

    #[tokio::test]
    async fn test_paste_move_removes_sources() {
        let mut store = create_test_store();
        let rules = PermissionEngine::default();
        let backend = MockBackend::new(store.entries().to_vec());
        let mut clipboard = Clipboard::new();
        clipboard.stage(vec![entry(&store, "/a/sub")], true, &rules).unwrap();

        let dest = entry(&store, "/b");
        let created = clipboard
            .paste(Some(&dest), &mut store, &rules, &backend)
            .await
            .unwrap();

        assert!(created.iter().any(|e| e.path == "/b/sub"));
        assert!(store.get("/a/sub").is_none());
        assert!(store.get("/a/sub/deep.txt").is_none());
        assert!(store.get("/b/sub/deep.txt").is_some());
        assert!(clipboard.is_empty());
    }

    #[tokio::test]
    async fn test_paste_copy_keeps_original_and_stays_staged() {
        let mut store = create_test_store();
        let rules = PermissionEngine::default();
        let backend = MockBackend::new(store.entries().to_vec());
        let mut clipboard = Clipboard::new();
        clipboard
            .stage(vec![entry(&store, "/a/report.pdf")], false, &rules)
            .unwrap();

        let dest = entry(&store, "/b");
        clipboard
            .paste(Some(&dest), &mut store, &rules, &backend)
            .await
            .unwrap();

        assert!(store.get("/a/report.pdf").is_some());
        assert!(store.get("/b/report.pdf").is_some());
        assert!(store.get("/b/report (1).pdf").is_some());
        assert!(!clipboard.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_paste_never_calls_backend() {
        let mut store = create_test_store();
        let rules = PermissionEngine::default();
        let backend = MockBackend::new(store.entries().to_vec());
        let mut clipboard = Clipboard::new();
        clipboard.stage(vec![entry(&store, "/a")], true, &rules).unwrap();

        let dest = entry(&store, "/a/sub");
        let result = clipboard.paste(Some(&dest), &mut store, &rules, &backend).await;
        assert!(result.is_err());
        assert_eq!(backend.transfer_calls(), 0);
    }

    #[tokio::test]
    async fn test_move_into_same_parent_is_noop() {
        let mut store = create_test_store();
        let rules = PermissionEngine::default();
        let backend = MockBackend::new(store.entries().to_vec());
        let mut clipboard = Clipboard::new();
        clipboard
            .stage(vec![entry(&store, "/a/report.pdf")], true, &rules)
            .unwrap();

        let dest = entry(&store, "/a");
        let created = clipboard
            .paste(Some(&dest), &mut store, &rules, &backend)
            .await
            .unwrap();
        assert!(created.is_empty());
        assert_eq!(backend.transfer_calls(), 0);
        assert!(store.get("/a/report.pdf").is_some());
    }
}
