use std::collections::HashMap;

use crate::config::NEW_FOLDER_NAME;
use crate::core::naming::unique_name;
use crate::models::Entry;
use crate::utils::path::{is_within, join_path, parent_path};

/// Flat collection of entries with derived per-path lookups.
///
/// The store is the single owner of entry data. Every mutation bumps
/// [`version`](Self::version) so derived views can be memoized.
///
/// # Path Convention
///
/// - Root folder: empty string `""` (never stored as an entry)
/// - Top-level entry: `"/docs"`
/// - Nested entry: `"/docs/report.pdf"`
#[derive(Clone, Debug, Default)]
pub struct EntryStore {
    entries: Vec<Entry>,
    /// Path to index in `entries`
    by_path: HashMap<String, usize>,
    /// Parent path to indexes of its children
    children: HashMap<String, Vec<usize>>,
    /// Path to display-name override
    display_names: HashMap<String, String>,
    version: u64,
}

impl EntryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store from a backend snapshot.
    pub fn from_entries(entries: Vec<Entry>) -> Self {
        let mut store = Self::new();
        store.replace_all(entries);
        store
    }

    /// Replace the whole collection with a new snapshot.
    ///
    /// Entries whose path disagrees with their name are skipped; a later
    /// entry with the same path replaces an earlier one.
    pub fn replace_all(&mut self, entries: Vec<Entry>) {
        let mut accepted: Vec<Entry> = Vec::with_capacity(entries.len());
        let mut seen: HashMap<String, usize> = HashMap::new();

        for entry in entries {
            if !entry.is_consistent() {
                log::warn!(
                    "Skipping entry '{}': path '{}' does not match its name",
                    entry.name,
                    entry.path
                );
                continue;
            }
            match seen.get(&entry.path) {
                Some(&idx) => accepted[idx] = entry,
                None => {
                    seen.insert(entry.path.clone(), accepted.len());
                    accepted.push(entry);
                }
            }
        }

        self.entries = accepted;
        self.reindex();
    }

    /// Rebuild lookups and bump the version.
    fn reindex(&mut self) {
        self.by_path.clear();
        self.children.clear();
        self.display_names.clear();

        for (idx, entry) in self.entries.iter().enumerate() {
            self.by_path.insert(entry.path.clone(), idx);
            self.children
                .entry(entry.parent_path().to_string())
                .or_default()
                .push(idx);
            if let Some(display_name) = &entry.display_name {
                self.display_names
                    .insert(entry.path.clone(), display_name.clone());
            }
        }

        self.version += 1;
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Monotonic counter bumped on every mutation.
    #[inline]
    pub fn version(&self) -> u64 {
        self.version
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries in insertion order.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Get an entry by path.
    pub fn get(&self, path: &str) -> Option<&Entry> {
        self.by_path.get(path).map(|&idx| &self.entries[idx])
    }

    pub fn contains(&self, path: &str) -> bool {
        self.by_path.contains_key(path)
    }

    /// Check whether `path` is the root or a known folder.
    pub fn is_folder(&self, path: &str) -> bool {
        path.is_empty() || self.get(path).is_some_and(|e| e.is_directory)
    }

    /// Direct children of `parent`, placeholders included.
    pub fn children_of<'a>(&'a self, parent: &str) -> impl Iterator<Item = &'a Entry> + 'a {
        self.children
            .get(parent)
            .into_iter()
            .flatten()
            .map(|&idx| &self.entries[idx])
    }

    /// Check whether `parent` already has a child named `name`.
    pub fn has_child(&self, parent: &str, name: &str) -> bool {
        self.contains(&join_path(parent, name))
    }

    /// Display-name override for a path.
    pub fn display_name(&self, path: &str) -> Option<&str> {
        self.display_names.get(path).map(String::as_str)
    }

    /// True when the only entry is a placeholder (initial loading state).
    pub fn is_loading(&self) -> bool {
        self.entries.len() == 1 && self.entries[0].is_placeholder
    }

    /// The entry currently being named, if any.
    pub fn editing(&self) -> Option<&Entry> {
        self.entries.iter().find(|e| e.is_editing)
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Add an entry, replacing any entry already stored at its path.
    pub fn append(&mut self, entry: Entry) {
        match self.by_path.get(&entry.path) {
            Some(&idx) => self.entries[idx] = entry,
            None => self.entries.push(entry),
        }
        self.reindex();
    }

    /// Add or replace several entries at once.
    pub fn upsert_all(&mut self, entries: impl IntoIterator<Item = Entry>) {
        for entry in entries {
            if !entry.is_consistent() {
                log::warn!("Skipping inconsistent entry '{}'", entry.path);
                continue;
            }
            match self.by_path.get(&entry.path) {
                Some(&idx) => self.entries[idx] = entry,
                None => {
                    self.by_path.insert(entry.path.clone(), self.entries.len());
                    self.entries.push(entry);
                }
            }
        }
        self.reindex();
    }

    /// Remove the entry at `path`.
    pub fn remove(&mut self, path: &str) -> Option<Entry> {
        let idx = *self.by_path.get(path)?;
        let removed = self.entries.remove(idx);
        self.reindex();
        Some(removed)
    }

    /// Remove the entry at `path` and everything beneath it.
    pub fn remove_subtree(&mut self, path: &str) -> Vec<Entry> {
        if path.is_empty() {
            return Vec::new();
        }
        let (removed, kept): (Vec<Entry>, Vec<Entry>) = std::mem::take(&mut self.entries)
            .into_iter()
            .partition(|e| is_within(&e.path, path));
        self.entries = kept;
        self.reindex();
        removed
    }

    // =========================================================================
    // Editing
    // =========================================================================

    /// Insert an optimistic folder under `parent` in editing state.
    ///
    /// The name is `New Folder`, disambiguated against existing siblings.
    pub fn insert_draft_folder(&mut self, parent: &str) -> Entry {
        self.clear_editing();
        let name = unique_name(NEW_FOLDER_NAME, true, |candidate| {
            self.has_child(parent, candidate)
        });
        let mut draft = Entry::folder(parent, &name);
        draft.is_editing = true;
        self.append(draft.clone());
        draft
    }

    /// Flag `path` as the single entry being edited.
    pub fn set_editing(&mut self, path: &str) -> bool {
        if !self.contains(path) {
            return false;
        }
        for entry in &mut self.entries {
            entry.is_editing = entry.path == path;
        }
        self.version += 1;
        true
    }

    /// Clear the editing flag from every entry.
    pub fn clear_editing(&mut self) {
        if self.entries.iter().any(|e| e.is_editing) {
            for entry in &mut self.entries {
                entry.is_editing = false;
            }
            self.version += 1;
        }
    }
}

/// Parent folder entry of `path`, if the parent is stored.
pub fn parent_of(store: &EntryStore, path: &str) -> Option<Entry> {
    store.get(parent_path(path)).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_store() -> EntryStore {
        EntryStore::from_entries(vec![
            Entry::folder("", "docs").with_display_name("Documents"),
            Entry::file("/docs", "report.pdf").with_size(2048),
            Entry::folder("/docs", "private"),
            Entry::file("/docs/private", "secret.txt"),
            Entry::file("", "readme.md"),
        ])
    }

    #[test]
    fn test_from_entries() {
        let store = create_test_store();
        assert_eq!(store.len(), 5);
        assert!(store.get("/docs/report.pdf").is_some());
        assert_eq!(store.display_name("/docs"), Some("Documents"));
    }

    #[test]
    fn test_inconsistent_entries_skipped() {
        let mut broken = Entry::file("/docs", "a.txt");
        broken.path = "/elsewhere/b.txt".to_string();
        let store = EntryStore::from_entries(vec![broken, Entry::folder("", "docs")]);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_duplicate_paths_last_wins() {
        let store = EntryStore::from_entries(vec![
            Entry::file("", "a.txt").with_size(1),
            Entry::file("", "a.txt").with_size(2),
        ]);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("/a.txt").unwrap().size, Some(2));
    }

    #[test]
    fn test_children_of() {
        let store = create_test_store();
        let mut names: Vec<_> = store.children_of("/docs").map(|e| e.name.as_str()).collect();
        names.sort();
        assert_eq!(names, vec!["private", "report.pdf"]);
        assert_eq!(store.children_of("").count(), 2);
        assert_eq!(store.children_of("/nope").count(), 0);
    }

    #[test]
    fn test_is_folder() {
        let store = create_test_store();
        assert!(store.is_folder(""));
        assert!(store.is_folder("/docs"));
        assert!(!store.is_folder("/docs/report.pdf"));
        assert!(!store.is_folder("/missing"));
    }

    #[test]
    fn test_version_bumps_on_mutation() {
        let mut store = create_test_store();
        let before = store.version();
        store.append(Entry::file("", "new.txt"));
        assert!(store.version() > before);
        let before = store.version();
        store.remove("/new.txt");
        assert!(store.version() > before);
    }

    #[test]
    fn test_append_replaces_by_path() {
        let mut store = create_test_store();
        store.append(Entry::file("/docs", "report.pdf").with_size(1));
        assert_eq!(store.len(), 5);
        assert_eq!(store.get("/docs/report.pdf").unwrap().size, Some(1));
    }

    #[test]
    fn test_remove_subtree() {
        let mut store = create_test_store();
        let removed = store.remove_subtree("/docs");
        assert_eq!(removed.len(), 4);
        assert_eq!(store.len(), 1);
        assert!(store.get("/readme.md").is_some());
    }

    #[test]
    fn test_remove_subtree_does_not_touch_prefix_siblings() {
        let mut store = EntryStore::from_entries(vec![
            Entry::folder("", "doc"),
            Entry::folder("", "docs"),
        ]);
        store.remove_subtree("/doc");
        assert!(store.get("/docs").is_some());
    }

    #[test]
    fn test_draft_folder_is_unique_and_editing() {
        let mut store = create_test_store();
        let first = store.insert_draft_folder("/docs");
        assert_eq!(first.name, "New Folder");
        store.clear_editing();
        let second = store.insert_draft_folder("/docs");
        assert_eq!(second.name, "New Folder (1)");
        assert_eq!(store.editing().unwrap().path, "/docs/New Folder (1)");
    }

    #[test]
    fn test_single_editing_entry() {
        let mut store = create_test_store();
        assert!(store.set_editing("/docs"));
        assert!(store.set_editing("/readme.md"));
        let editing: Vec<_> = store.entries().iter().filter(|e| e.is_editing).collect();
        assert_eq!(editing.len(), 1);
        assert_eq!(editing[0].path, "/readme.md");
        assert!(!store.set_editing("/missing"));
    }

    #[test]
    fn test_is_loading() {
        let store = EntryStore::from_entries(vec![Entry::folder("", "loading").placeholder()]);
        assert!(store.is_loading());
        assert!(!create_test_store().is_loading());
    }

    #[test]
    fn test_parent_of() {
        let store = create_test_store();
        assert_eq!(parent_of(&store, "/docs/report.pdf").unwrap().name, "docs");
        assert!(parent_of(&store, "/docs").is_none());
    }
}
