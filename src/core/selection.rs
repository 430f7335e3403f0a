//! Multi-item selection driven by pointer gestures.
//!
//! Timestamps are supplied by the caller in milliseconds so gesture timing
//! stays deterministic and testable.

use crate::config::{DOUBLE_CLICK_WINDOW_MS, LONG_PRESS_THRESHOLD_MS};
use crate::models::{ClickOutcome, Entry, Modifiers};

/// A press that may turn into a long press.
#[derive(Clone, Debug)]
struct PendingPress {
    entry: Entry,
    started_at: u64,
}

/// Ordered, path-unique set of selected entries in the active folder.
#[derive(Clone, Debug, Default)]
pub struct Selection {
    items: Vec<Entry>,
    multiple: bool,
    /// Path of the previous click; range selections extend from here
    anchor: Option<String>,
    last_click: Option<(String, u64)>,
    pending_press: Option<PendingPress>,
}

#[inline]
fn selectable(entry: &Entry) -> bool {
    !entry.is_editing && entry.is_listable()
}

impl Selection {
    /// Create an empty selection. `multiple = false` collapses every
    /// gesture to a single entry.
    pub fn new(multiple: bool) -> Self {
        Self {
            multiple,
            ..Default::default()
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn items(&self) -> &[Entry] {
        &self.items
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.items.iter().any(|e| e.path == path)
    }

    pub fn allows_multiple(&self) -> bool {
        self.multiple
    }

    /// Positions of the selected entries within `listing`.
    pub fn indexes(&self, listing: &[Entry]) -> Vec<usize> {
        listing
            .iter()
            .enumerate()
            .filter(|(_, e)| self.contains(&e.path))
            .map(|(idx, _)| idx)
            .collect()
    }

    // =========================================================================
    // Clicks
    // =========================================================================

    /// Apply a click on `entry` at `now_ms`.
    ///
    /// A second click on the same entry within the double-click window
    /// returns [`ClickOutcome::Open`].
    pub fn click(
        &mut self,
        entry: &Entry,
        modifiers: Modifiers,
        listing: &[Entry],
        now_ms: u64,
    ) -> ClickOutcome {
        if !selectable(entry) {
            return ClickOutcome::Ignored;
        }

        if !self.multiple {
            self.select_single(entry);
        } else if modifiers.shift && !self.items.is_empty() {
            self.select_range(entry, listing);
        } else if modifiers.toggles() && !self.items.is_empty() {
            self.toggle(entry);
        } else {
            self.select_single(entry);
        }
        self.anchor = Some(entry.path.clone());

        let is_double = matches!(
            &self.last_click,
            Some((path, at)) if *path == entry.path
                && now_ms.saturating_sub(*at) < DOUBLE_CLICK_WINDOW_MS
        );
        if is_double {
            self.last_click = None;
            return ClickOutcome::Open(entry.clone());
        }
        self.last_click = Some((entry.path.clone(), now_ms));
        ClickOutcome::Selected
    }

    fn select_single(&mut self, entry: &Entry) {
        self.items = vec![entry.clone()];
    }

    /// Add or remove `entry` by path.
    fn toggle(&mut self, entry: &Entry) {
        match self.items.iter().position(|e| e.path == entry.path) {
            Some(idx) => {
                self.items.remove(idx);
            }
            None => self.items.push(entry.clone()),
        }
    }

    /// Select the listing slice between the anchor and `entry`.
    fn select_range(&mut self, entry: &Entry, listing: &[Entry]) {
        let position = |path: &str| listing.iter().position(|e| e.path == path);

        let anchor = self
            .anchor
            .as_deref()
            .filter(|path| self.contains(path))
            .and_then(position)
            .or_else(|| self.items.first().and_then(|first| position(&first.path)));

        let (Some(start), Some(end)) = (anchor, position(&entry.path)) else {
            self.select_single(entry);
            return;
        };

        self.items = if start <= end {
            listing[start..=end].to_vec()
        } else {
            listing[end..=start].iter().rev().cloned().collect()
        };
        self.items.retain(selectable);
    }

    /// Checkbox toggle: add or remove without affecting other entries.
    ///
    /// With multi-selection disabled the selection becomes `[entry]` or
    /// empty.
    pub fn toggle_checkbox(&mut self, entry: &Entry, checked: bool) {
        if !selectable(entry) {
            return;
        }
        if !self.multiple {
            self.items = if checked { vec![entry.clone()] } else { Vec::new() };
            return;
        }
        if checked && !self.contains(&entry.path) {
            self.items.push(entry.clone());
        } else if !checked {
            self.items.retain(|e| e.path != entry.path);
        }
        self.anchor = Some(entry.path.clone());
    }

    // =========================================================================
    // Long Press
    // =========================================================================

    /// Pointer went down on `entry`.
    pub fn press_start(&mut self, entry: &Entry, now_ms: u64) {
        self.pending_press = selectable(entry).then(|| PendingPress {
            entry: entry.clone(),
            started_at: now_ms,
        });
    }

    /// Pointer moved; cancels a pending long press.
    pub fn pointer_move(&mut self) {
        self.pending_press = None;
    }

    /// Pointer released.
    pub fn press_end(&mut self) {
        self.pending_press = None;
    }

    /// Fire the pending long press if held long enough.
    ///
    /// Returns `true` when the pressed entry was added to the selection.
    pub fn poll_long_press(&mut self, now_ms: u64) -> bool {
        let Some(press) = &self.pending_press else {
            return false;
        };
        if now_ms.saturating_sub(press.started_at) < LONG_PRESS_THRESHOLD_MS {
            return false;
        }

        let Some(press) = self.pending_press.take() else {
            return false;
        };
        if !self.multiple {
            self.select_single(&press.entry);
        } else if !self.contains(&press.entry.path) {
            self.items.push(press.entry.clone());
        }
        self.anchor = Some(press.entry.path);
        true
    }

    // =========================================================================
    // Bulk
    // =========================================================================

    /// Select every selectable entry of `listing`.
    pub fn select_all(&mut self, listing: &[Entry]) {
        if !self.multiple {
            return;
        }
        self.items = listing.iter().filter(|e| selectable(e)).cloned().collect();
    }

    pub fn select_first(&mut self, listing: &[Entry]) {
        if let Some(first) = listing.iter().find(|e| selectable(e)) {
            self.select_single(first);
            self.anchor = Some(first.path.clone());
        }
    }

    pub fn select_last(&mut self, listing: &[Entry]) {
        if let Some(last) = listing.iter().rev().find(|e| selectable(e)) {
            self.select_single(last);
            self.anchor = Some(last.path.clone());
        }
    }

    /// Replace the selection with `entries`.
    pub fn set(&mut self, entries: &[Entry]) {
        let mut items: Vec<Entry> = Vec::new();
        for entry in entries.iter().filter(|e| selectable(e)) {
            if !items.iter().any(|e| e.path == entry.path) {
                items.push(entry.clone());
            }
        }
        if !self.multiple {
            items.truncate(1);
        }
        self.items = items;
    }

    /// Clear the selection and all gesture state.
    pub fn clear(&mut self) {
        self.items.clear();
        self.anchor = None;
        self.last_click = None;
        self.pending_press = None;
    }

    /// Refresh selected entries from `listing`, dropping vanished ones.
    pub fn sync(&mut self, listing: &[Entry]) {
        self.items = self
            .items
            .iter()
            .filter_map(|selected| listing.iter().find(|e| e.path == selected.path))
            .filter(|e| selectable(e))
            .cloned()
            .collect();
    }
}
