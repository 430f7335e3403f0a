//! Explorer interaction types shared between the engine and the view layer.

use super::Entry;

/// Modifier keys held during a click.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    /// Cmd on macOS
    pub meta: bool,
}

impl Modifiers {
    /// No modifiers held.
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        ctrl: false,
        meta: false,
    };

    /// Shift held (range selection).
    pub const SHIFT: Modifiers = Modifiers {
        shift: true,
        ctrl: false,
        meta: false,
    };

    /// Ctrl held (toggle selection).
    pub const CTRL: Modifiers = Modifiers {
        shift: false,
        ctrl: true,
        meta: false,
    };

    /// Ctrl or Cmd held.
    #[inline]
    pub fn toggles(&self) -> bool {
        self.ctrl || self.meta
    }
}

/// What the view should do after a click was processed.
#[derive(Clone, Debug, PartialEq)]
pub enum ClickOutcome {
    /// Selection changed; nothing else to do
    Selected,
    /// Click ignored (entry is being edited or not selectable)
    Ignored,
    /// Double click: open the entry
    Open(Entry),
}

/// Result of opening an entry.
#[derive(Clone, Debug, PartialEq)]
pub enum OpenOutcome {
    /// Navigated into a folder
    Navigated(FolderChange),
    /// A file preview was requested
    Preview(Entry),
}

/// Emitted when the active directory changes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FolderChange {
    /// Path before navigation
    pub previous: String,
    /// Path after navigation
    pub current: String,
}
