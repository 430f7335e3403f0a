//! Explorer facade.
//!
//! Owns the entry store and all interaction state for one explorer
//! instance, and routes every mutation through the permission engine before
//! delegating to the [`Backend`].

use crate::config::ExplorerConfig;
use crate::core::backend::Backend;
use crate::core::clipboard::Clipboard;
use crate::core::error::{BackendError, ExplorerError, PermissionDenied};
use crate::core::index::{Crumb, FolderNode, Listing, ViewCache, breadcrumbs, derive_tree};
use crate::core::naming::is_valid_name;
use crate::core::permissions::PermissionEngine;
use crate::core::selection::Selection;
use crate::core::store::EntryStore;
use crate::core::upload::UploadEvent;
use crate::models::{
    Action, ClickOutcome, Entry, FolderChange, Modifiers, OpenOutcome, SortConfig, SortKey,
};
use crate::utils::path::{join_path, leaf_name, normalize_path, parent_path, rebase};

/// Entry currently being named.
#[derive(Clone, Debug, PartialEq, Eq)]
enum EditState {
    /// Optimistic folder not yet known to the backend
    CreateFolder { draft_path: String },
    Rename { path: String },
}

/// State engine behind one explorer view.
pub struct Explorer<B> {
    backend: B,
    config: ExplorerConfig,
    store: EntryStore,
    permissions: PermissionEngine,
    selection: Selection,
    clipboard: Clipboard,
    current_path: String,
    sort: SortConfig,
    cache: ViewCache,
    edit: Option<EditState>,
    denial: Option<PermissionDenied>,
    initial_path_applied: bool,
}

impl<B: Backend> Explorer<B> {
    pub fn new(backend: B, config: ExplorerConfig) -> Self {
        let permissions = PermissionEngine::new(&config.permissions);
        let selection = Selection::new(!config.disable_multiple_selection);
        Self {
            backend,
            config,
            store: EntryStore::new(),
            permissions,
            selection,
            clipboard: Clipboard::new(),
            current_path: String::new(),
            sort: SortConfig::default(),
            cache: ViewCache::new(),
            edit: None,
            denial: None,
            initial_path_applied: false,
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn config(&self) -> &ExplorerConfig {
        &self.config
    }

    pub fn store(&self) -> &EntryStore {
        &self.store
    }

    pub fn permissions(&self) -> &PermissionEngine {
        &self.permissions
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn clipboard(&self) -> &Clipboard {
        &self.clipboard
    }

    pub fn current_path(&self) -> &str {
        &self.current_path
    }

    pub fn sort(&self) -> SortConfig {
        self.sort
    }

    /// Take the most recent permission denial, for user-facing feedback.
    pub fn take_denial(&mut self) -> Option<PermissionDenied> {
        self.denial.take()
    }

    /// Remember a denial before handing the error back.
    fn track<T>(&mut self, result: Result<T, ExplorerError>) -> Result<T, ExplorerError> {
        if let Err(ExplorerError::PermissionDenied(denied)) = &result {
            self.denial = Some(denied.clone());
        }
        result
    }

    // =========================================================================
    // Loading
    // =========================================================================

    /// Replace the entry collection with a snapshot supplied by the host.
    ///
    /// The first non-placeholder snapshot applies the configured initial
    /// path if a folder exists there.
    pub fn set_entries(&mut self, entries: Vec<Entry>) {
        self.store.replace_all(entries);

        if !self.initial_path_applied && !self.store.is_loading() {
            self.initial_path_applied = true;
            let initial = normalize_path(&self.config.initial_path);
            if self.store.get(&initial).is_some_and(|e| e.is_directory) {
                log::debug!("Starting at '{}'", initial);
                self.current_path = initial;
            }
        }

        self.sync_selection();
    }

    /// Load the full snapshot from the backend.
    pub async fn load(&mut self) -> Result<(), ExplorerError> {
        let entries = self.backend.list().await?;
        self.set_entries(entries);
        Ok(())
    }

    /// Reload from the backend, dropping the clipboard and any edit.
    pub async fn refresh(&mut self) -> Result<(), ExplorerError> {
        self.clipboard.clear();
        self.cancel_edit();
        self.load().await
    }

    // =========================================================================
    // Views
    // =========================================================================

    /// Sorted contents of the current folder.
    pub fn listing(&mut self) -> &Listing {
        self.cache
            .listing(&self.store, &self.current_path, self.sort)
    }

    /// Current folder; `None` at the root or when the path is unknown.
    pub fn current_folder(&self) -> Option<&Entry> {
        self.store
            .get(&self.current_path)
            .filter(|e| e.is_directory)
    }

    pub fn tree(&self) -> Vec<FolderNode> {
        derive_tree(&self.store)
    }

    pub fn breadcrumbs(&self) -> Vec<Crumb> {
        breadcrumbs(&self.store, &self.current_path, &self.config.root_folder)
    }

    /// Check `action` on the selection without recording a denial.
    pub fn selection_allows(&self, action: Action) -> bool {
        let refs: Vec<&Entry> = self.selection.items().iter().collect();
        self.permissions.is_allowed(&refs, action)
    }

    /// Check `action` on the current folder without recording a denial.
    ///
    /// An unknown current path allows nothing.
    pub fn folder_allows(&self, action: Action) -> bool {
        match self.target_folder() {
            Ok(folder) => self.permissions.is_folder_allowed(folder, action),
            Err(_) => false,
        }
    }

    /// Folder that folder-level actions apply to; `None` at the root.
    fn target_folder(&self) -> Result<Option<&Entry>, ExplorerError> {
        if self.current_path.is_empty() {
            return Ok(None);
        }
        self.current_folder()
            .map(Some)
            .ok_or_else(|| ExplorerError::NotFound(self.current_path.clone()))
    }

    /// Check whether `path` is staged for a move.
    pub fn is_moving(&self, path: &str) -> bool {
        self.clipboard.is_moving(path)
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    /// Make `path` the active folder.
    ///
    /// Unknown paths are accepted and render as an empty folder. Returns
    /// `None` when the path did not change.
    pub fn navigate(&mut self, path: &str) -> Option<FolderChange> {
        let path = normalize_path(path);
        if path == self.current_path {
            return None;
        }

        self.cancel_edit();
        self.selection.clear();
        let previous = std::mem::replace(&mut self.current_path, path);
        log::debug!("Navigated '{}' -> '{}'", previous, self.current_path);

        Some(FolderChange {
            previous,
            current: self.current_path.clone(),
        })
    }

    /// Open an entry: navigate into a folder or request a file preview.
    pub fn open(&mut self, path: &str) -> Result<OpenOutcome, ExplorerError> {
        let result = self.open_inner(path);
        self.track(result)
    }

    fn open_inner(&mut self, path: &str) -> Result<OpenOutcome, ExplorerError> {
        let entry = self
            .store
            .get(path)
            .cloned()
            .ok_or_else(|| ExplorerError::NotFound(path.to_string()))?;
        self.permissions.authorize(&[&entry], Action::Read)?;

        if entry.is_directory {
            let change = self.navigate(&entry.path).unwrap_or(FolderChange {
                previous: entry.path.clone(),
                current: entry.path.clone(),
            });
            Ok(OpenOutcome::Navigated(change))
        } else {
            Ok(OpenOutcome::Preview(entry))
        }
    }

    /// Column header click.
    pub fn set_sort(&mut self, key: SortKey) -> SortConfig {
        self.sort = self.sort.toggled(key);
        self.sort
    }

    // =========================================================================
    // Selection
    // =========================================================================

    /// Click on a listed entry at `now_ms`.
    pub fn click(&mut self, path: &str, modifiers: Modifiers, now_ms: u64) -> ClickOutcome {
        let listing = self
            .cache
            .listing(&self.store, &self.current_path, self.sort);
        match listing.entries.iter().find(|e| e.path == path) {
            Some(entry) => self
                .selection
                .click(entry, modifiers, &listing.entries, now_ms),
            None => ClickOutcome::Ignored,
        }
    }

    pub fn toggle_checkbox(&mut self, path: &str, checked: bool) {
        let listing = self
            .cache
            .listing(&self.store, &self.current_path, self.sort);
        if let Some(entry) = listing.entries.iter().find(|e| e.path == path) {
            self.selection.toggle_checkbox(entry, checked);
        }
    }

    pub fn press_start(&mut self, path: &str, now_ms: u64) {
        let listing = self
            .cache
            .listing(&self.store, &self.current_path, self.sort);
        if let Some(entry) = listing.entries.iter().find(|e| e.path == path) {
            self.selection.press_start(entry, now_ms);
        }
    }

    pub fn pointer_move(&mut self) {
        self.selection.pointer_move();
    }

    pub fn press_end(&mut self) {
        self.selection.press_end();
    }

    /// Returns `true` when a long press just selected an entry.
    pub fn poll_long_press(&mut self, now_ms: u64) -> bool {
        self.selection.poll_long_press(now_ms)
    }

    pub fn select_all(&mut self) {
        let listing = self
            .cache
            .listing(&self.store, &self.current_path, self.sort);
        self.selection.select_all(&listing.entries);
    }

    pub fn select_first(&mut self) {
        let listing = self
            .cache
            .listing(&self.store, &self.current_path, self.sort);
        self.selection.select_first(&listing.entries);
    }

    pub fn select_last(&mut self) {
        let listing = self
            .cache
            .listing(&self.store, &self.current_path, self.sort);
        self.selection.select_last(&listing.entries);
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Positions of the selected entries in the current listing.
    pub fn selected_indexes(&mut self) -> Vec<usize> {
        let listing = self
            .cache
            .listing(&self.store, &self.current_path, self.sort);
        self.selection.indexes(&listing.entries)
    }

    fn sync_selection(&mut self) {
        let listing = self
            .cache
            .listing(&self.store, &self.current_path, self.sort);
        self.selection.sync(&listing.entries);
    }

    // =========================================================================
    // Clipboard
    // =========================================================================

    /// Stage the selection for a move.
    pub fn cut(&mut self) -> Result<(), ExplorerError> {
        let files = self.selection.items().to_vec();
        let result = self.clipboard.stage(files, true, &self.permissions);
        self.track(result)
    }

    /// Stage the selection for a copy.
    pub fn copy(&mut self) -> Result<(), ExplorerError> {
        let files = self.selection.items().to_vec();
        let result = self.clipboard.stage(files, false, &self.permissions);
        self.track(result)
    }

    /// Paste into `destination`, or the current folder when `None`.
    pub async fn paste(&mut self, destination: Option<&str>) -> Result<Vec<Entry>, ExplorerError> {
        let result = self.paste_inner(destination).await;
        self.sync_selection();
        self.track(result)
    }

    async fn paste_inner(&mut self, destination: Option<&str>) -> Result<Vec<Entry>, ExplorerError> {
        let path = destination
            .map(normalize_path)
            .unwrap_or_else(|| self.current_path.clone());
        let folder = if path.is_empty() {
            None
        } else {
            Some(
                self.store
                    .get(&path)
                    .cloned()
                    .ok_or_else(|| ExplorerError::NotFound(path.clone()))?,
            )
        };

        self.clipboard
            .paste(
                folder.as_ref(),
                &mut self.store,
                &self.permissions,
                &self.backend,
            )
            .await
    }

    /// Begin dragging `path`.
    ///
    /// An unselected entry becomes the whole selection. The selection is
    /// staged for a move with the same checks as [`cut`](Self::cut).
    pub fn drag_start(&mut self, path: &str) -> Result<(), ExplorerError> {
        if !self.selection.contains(path) {
            let Some(entry) = self.store.get(path).cloned() else {
                return Err(ExplorerError::NotFound(path.to_string()));
            };
            self.selection.set(&[entry]);
        }
        self.cut()
    }

    /// Drop the dragged entries on the folder at `path` (`""` for root).
    pub async fn drop_on(&mut self, path: &str) -> Result<Vec<Entry>, ExplorerError> {
        let path = normalize_path(path);
        if self.selection.contains(&path) {
            return Err(ExplorerError::InvalidPasteTarget(
                "cannot drop onto a dragged item".to_string(),
            ));
        }
        self.paste(Some(&path)).await
    }

    /// Drag finished or was abandoned.
    pub fn drag_end(&mut self) {
        self.clipboard.clear();
    }

    // =========================================================================
    // Create & Rename
    // =========================================================================

    /// Insert an editable `New Folder` draft into the current folder.
    pub fn begin_create_folder(&mut self) -> Result<Entry, ExplorerError> {
        let result = self.begin_create_folder_inner();
        self.track(result)
    }

    fn begin_create_folder_inner(&mut self) -> Result<Entry, ExplorerError> {
        if self.edit.is_some() {
            return Err(ExplorerError::EditInProgress);
        }
        self.permissions
            .authorize_folder(self.target_folder()?, Action::Create)?;

        let draft = self.store.insert_draft_folder(&self.current_path);
        self.edit = Some(EditState::CreateFolder {
            draft_path: draft.path.clone(),
        });
        Ok(draft)
    }

    /// Flag the entry at `path` for in-place renaming.
    pub fn begin_rename(&mut self, path: &str) -> Result<(), ExplorerError> {
        let result = self.begin_rename_inner(path);
        self.track(result)
    }

    fn begin_rename_inner(&mut self, path: &str) -> Result<(), ExplorerError> {
        if self.edit.is_some() {
            return Err(ExplorerError::EditInProgress);
        }
        let entry = self
            .store
            .get(path)
            .ok_or_else(|| ExplorerError::NotFound(path.to_string()))?;
        self.permissions.authorize(&[entry], Action::Rename)?;

        self.store.set_editing(path);
        self.edit = Some(EditState::Rename {
            path: path.to_string(),
        });
        Ok(())
    }

    /// Confirm the pending edit with `name`.
    ///
    /// Returns the entries created or renamed by the backend. The edit is
    /// finished either way.
    pub async fn commit_edit(&mut self, name: &str) -> Result<Vec<Entry>, ExplorerError> {
        let Some(edit) = self.edit.clone() else {
            return Err(ExplorerError::NotEditing);
        };
        let name = name.trim();
        if !is_valid_name(name) {
            return Err(ExplorerError::InvalidName(name.to_string()));
        }

        self.cancel_edit();
        let result = match edit {
            EditState::CreateFolder { draft_path } => {
                let parent = parent_path(&draft_path).to_string();
                self.backend
                    .create_folder(name, &parent)
                    .await
                    .map(|folder| {
                        log::debug!("Created folder '{}'", folder.path);
                        self.store.append(folder.clone());
                        vec![folder]
                    })
            }
            EditState::Rename { path } => self.rename(&path, name).await,
        };

        self.sync_selection();
        result.map_err(ExplorerError::from)
    }

    async fn rename(
        &mut self,
        path: &str,
        name: &str,
    ) -> Result<Vec<Entry>, BackendError> {
        if leaf_name(path) == name {
            return Ok(Vec::new());
        }

        let renamed = self.backend.rename(path, name).await?;
        self.store.remove_subtree(path);
        self.store.upsert_all(renamed.iter().cloned());

        let target = join_path(parent_path(path), name);
        if let Some(current) = rebase(&self.current_path, path, &target) {
            self.current_path = current;
        }
        log::debug!("Renamed '{}' to '{}'", path, name);
        Ok(renamed)
    }

    /// Abandon the pending edit, discarding an unsaved folder draft.
    pub fn cancel_edit(&mut self) {
        match self.edit.take() {
            Some(EditState::CreateFolder { draft_path }) => {
                self.store.remove(&draft_path);
            }
            Some(EditState::Rename { .. }) => self.store.clear_editing(),
            None => {}
        }
    }

    /// Entry currently being named.
    pub fn editing(&self) -> Option<&Entry> {
        self.store.editing()
    }

    // =========================================================================
    // Delete
    // =========================================================================

    /// Delete every selected entry.
    pub async fn delete_selected(&mut self) -> Result<Vec<Entry>, ExplorerError> {
        let result = self.delete_selected_inner().await;
        self.track(result)
    }

    async fn delete_selected_inner(&mut self) -> Result<Vec<Entry>, ExplorerError> {
        if self.selection.is_empty() {
            return Err(ExplorerError::NothingSelected);
        }
        let refs: Vec<&Entry> = self.selection.items().iter().collect();
        self.permissions.authorize(&refs, Action::Delete)?;

        let paths: Vec<String> = self
            .selection
            .items()
            .iter()
            .map(|e| e.path.clone())
            .collect();
        let removed = self.backend.delete(&paths).await?;

        for path in paths.iter().chain(removed.iter().map(|e| &e.path)) {
            self.store.remove_subtree(path);
        }
        self.selection.clear();
        log::debug!("Deleted {} entries", removed.len());
        Ok(removed)
    }

    // =========================================================================
    // Download
    // =========================================================================

    /// Hand the selected entries over for download.
    ///
    /// Requires read access on every selected entry; clears the selection
    /// once granted.
    pub fn download_selected(&mut self) -> Result<Vec<Entry>, ExplorerError> {
        let result = self.download_selected_inner();
        self.track(result)
    }

    fn download_selected_inner(&mut self) -> Result<Vec<Entry>, ExplorerError> {
        if self.selection.is_empty() {
            return Err(ExplorerError::NothingSelected);
        }
        let refs: Vec<&Entry> = self.selection.items().iter().collect();
        self.permissions.authorize(&refs, Action::Read)?;

        let entries = self.selection.items().to_vec();
        self.selection.clear();
        log::debug!("Downloading {} entries", entries.len());
        Ok(entries)
    }

    // =========================================================================
    // Upload
    // =========================================================================

    /// Check that the current folder accepts uploads and return its path.
    pub fn authorize_upload(&mut self) -> Result<String, ExplorerError> {
        let result = self
            .target_folder()
            .and_then(|folder| {
                self.permissions
                    .authorize_folder(folder, Action::Upload)
                    .map_err(ExplorerError::from)
            })
            .map(|()| self.current_path.clone());
        self.track(result)
    }

    /// Apply a pipeline event to the store.
    ///
    /// Returns the appended entry for completed uploads.
    pub fn apply_upload_event(&mut self, event: &UploadEvent) -> Option<Entry> {
        let UploadEvent::Completed {
            result,
            destination,
            ..
        } = event
        else {
            return None;
        };
        let entry = result.to_entry(destination)?;
        self.store.append(entry.clone());
        Some(entry)
    }
}
