//! Derived views over the entry store.
//!
//! Pure recomputation functions plus a version-keyed cache:
//! - [`derive_listing`] - Sorted children of the current folder
//! - [`derive_tree`] - Folder hierarchy for the navigation pane
//! - [`breadcrumbs`] - Path segments from the root to the current folder

use std::cmp::Ordering;
use std::collections::HashMap;

use unicode_normalization::UnicodeNormalization;

use crate::core::store::EntryStore;
use crate::models::{Entry, SortConfig, SortKey};
use crate::utils::path::{join_path, segments};

// =============================================================================
// Listing
// =============================================================================

/// Contents of the current folder.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Listing {
    /// Current folder; `None` at the root or for an unknown path
    pub folder: Option<Entry>,
    /// Sorted, placeholder-free children
    pub entries: Vec<Entry>,
}

/// Derive the sorted listing of `path`.
///
/// Unknown folders yield an empty listing instead of an error.
pub fn derive_listing(store: &EntryStore, path: &str, sort: SortConfig) -> Listing {
    if store.is_loading() {
        return Listing::default();
    }

    let folder = if path.is_empty() {
        None
    } else {
        match store.get(path) {
            Some(entry) if entry.is_directory => Some(entry.clone()),
            _ => return Listing::default(),
        }
    };

    let mut entries: Vec<Entry> = store
        .children_of(path)
        .filter(|e| e.is_listable())
        .cloned()
        .collect();
    sort_entries(&mut entries, sort);

    Listing { folder, entries }
}

/// Sort entries in place: directories first, then by `sort`.
///
/// The sort is stable and the direction never moves files above folders.
pub fn sort_entries(entries: &mut [Entry], sort: SortConfig) {
    entries.sort_by(|a, b| compare_entries(a, b, sort));
}

fn compare_entries(a: &Entry, b: &Entry, sort: SortConfig) -> Ordering {
    match (a.is_directory, b.is_directory) {
        (true, false) => return Ordering::Less,
        (false, true) => return Ordering::Greater,
        _ => {}
    }

    let ordering = match sort.key {
        SortKey::Name => compare_names(a.label(), b.label()),
        SortKey::Size => a.size.unwrap_or(0).cmp(&b.size.unwrap_or(0)),
        SortKey::Modified => modified_millis(a).cmp(&modified_millis(b)),
    };
    sort.direction.apply(ordering)
}

#[inline]
fn modified_millis(entry: &Entry) -> i64 {
    entry.updated_at.map_or(0, |ts| ts.timestamp_millis())
}

/// Case-insensitive comparison of NFC-normalized names.
///
/// Names equal under folding fall back to a raw comparison so the order is
/// total.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    fold(a).cmp(&fold(b)).then_with(|| a.cmp(b))
}

fn fold(name: &str) -> String {
    name.nfc().flat_map(char::to_lowercase).collect()
}

// =============================================================================
// Tree
// =============================================================================

/// A folder and its sub-folders.
#[derive(Clone, Debug, PartialEq)]
pub struct FolderNode {
    pub entry: Entry,
    pub children: Vec<FolderNode>,
}

impl FolderNode {
    /// Total number of folders in this subtree, including this one.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(FolderNode::count).sum::<usize>()
    }
}

/// Build the folder hierarchy rooted at the empty path.
///
/// Folders without recorded children are leaves. Siblings are ordered by
/// name.
pub fn derive_tree(store: &EntryStore) -> Vec<FolderNode> {
    let mut by_parent: HashMap<&str, Vec<&Entry>> = HashMap::new();
    for entry in store.entries().iter().filter(|e| e.is_directory) {
        by_parent.entry(entry.parent_path()).or_default().push(entry);
    }
    for folders in by_parent.values_mut() {
        folders.sort_by(|a, b| compare_names(a.label(), b.label()));
    }
    build_nodes(&by_parent, "")
}

fn build_nodes(by_parent: &HashMap<&str, Vec<&Entry>>, parent: &str) -> Vec<FolderNode> {
    by_parent
        .get(parent)
        .map(|folders| {
            folders
                .iter()
                .map(|folder| FolderNode {
                    entry: (*folder).clone(),
                    children: build_nodes(by_parent, &folder.path),
                })
                .collect()
        })
        .unwrap_or_default()
}

// =============================================================================
// Breadcrumbs
// =============================================================================

/// One step of the breadcrumb trail.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Crumb {
    pub name: String,
    pub path: String,
}

/// Breadcrumb trail from the root to `path`.
///
/// The first crumb is always the root, labeled `root_name`.
pub fn breadcrumbs(store: &EntryStore, path: &str, root_name: &str) -> Vec<Crumb> {
    let mut crumbs = vec![Crumb {
        name: root_name.to_string(),
        path: String::new(),
    }];

    let mut current = String::new();
    for segment in segments(path) {
        current = join_path(&current, segment);
        let name = store.display_name(&current).unwrap_or(segment).to_string();
        crumbs.push(Crumb {
            name,
            path: current.clone(),
        });
    }

    crumbs
}

// =============================================================================
// Cache
// =============================================================================

/// Memoizes the last derived listing, keyed on store version, path and sort.
#[derive(Debug, Default)]
pub struct ViewCache {
    key: Option<(u64, String, SortConfig)>,
    listing: Listing,
}

impl ViewCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the listing for `path`, recomputing only when the key changed.
    pub fn listing(&mut self, store: &EntryStore, path: &str, sort: SortConfig) -> &Listing {
        let fresh = matches!(
            &self.key,
            Some((version, cached_path, cached_sort))
                if *version == store.version() && cached_path == path && *cached_sort == sort
        );
        if !fresh {
            self.listing = derive_listing(store, path, sort);
            self.key = Some((store.version(), path.to_string(), sort));
        }
        &self.listing
    }
}
