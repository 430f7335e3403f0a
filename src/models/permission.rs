//! Permission rule types supplied by the host application.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// An action gated by the permission engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    Copy,
    Move,
    Read,
    Write,
    Rename,
    Delete,
    Upload,
}

impl Action {
    pub const ALL: [Action; 8] = [
        Action::Create,
        Action::Copy,
        Action::Move,
        Action::Read,
        Action::Write,
        Action::Rename,
        Action::Delete,
        Action::Upload,
    ];

    /// Key used in rule JSON.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Copy => "copy",
            Self::Move => "move",
            Self::Read => "read",
            Self::Write => "write",
            Self::Rename => "rename",
            Self::Delete => "delete",
            Self::Upload => "upload",
        }
    }

    /// Human-readable name for denial messages.
    pub fn readable(self) -> &'static str {
        match self {
            Self::Create => "Create",
            Self::Copy => "Copy",
            Self::Move => "Move",
            Self::Read => "Read",
            Self::Write => "Write",
            Self::Rename => "Rename",
            Self::Delete => "Delete",
            Self::Upload => "Upload",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.readable())
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|a| a.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown action '{}'", s))
    }
}

/// Restricts a rule to files or folders.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplyTo {
    File,
    Folder,
}

impl ApplyTo {
    /// Check whether a rule with this restriction covers the entry kind.
    pub fn covers(restriction: Option<ApplyTo>, is_directory: bool) -> bool {
        match restriction {
            None => true,
            Some(ApplyTo::Folder) => is_directory,
            Some(ApplyTo::File) => !is_directory,
        }
    }
}

/// Per-action verdicts of a rule. `None` means the rule is silent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionFlags {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copy: Option<bool>,
    #[serde(default, rename = "move", skip_serializing_if = "Option::is_none")]
    pub move_: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rename: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload: Option<bool>,
}

impl ActionFlags {
    pub fn get(&self, action: Action) -> Option<bool> {
        match action {
            Action::Create => self.create,
            Action::Copy => self.copy,
            Action::Move => self.move_,
            Action::Read => self.read,
            Action::Write => self.write,
            Action::Rename => self.rename,
            Action::Delete => self.delete,
            Action::Upload => self.upload,
        }
    }

    pub fn set(&mut self, action: Action, value: Option<bool>) {
        let slot = match action {
            Action::Create => &mut self.create,
            Action::Copy => &mut self.copy,
            Action::Move => &mut self.move_,
            Action::Read => &mut self.read,
            Action::Write => &mut self.write,
            Action::Rename => &mut self.rename,
            Action::Delete => &mut self.delete,
            Action::Upload => &mut self.upload,
        };
        *slot = value;
    }

    /// Combine two flag sets, keeping the most restrictive verdict per action.
    pub fn restrict(&self, other: &ActionFlags) -> ActionFlags {
        let mut merged = ActionFlags::default();
        for action in Action::ALL {
            let value = match (self.get(action), other.get(action)) {
                (Some(a), Some(b)) => Some(a && b),
                (a, b) => a.or(b),
            };
            merged.set(action, value);
        }
        merged
    }
}

/// A path-pattern permission rule.
///
/// Patterns: an exact path (`/docs/private`), direct children (`/docs/*`),
/// all descendants including the folder itself (`/docs/**`), or everything
/// (`/**`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionRule {
    /// Path pattern
    pub path: String,
    /// Entry kind restriction (`None` = both)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apply_to: Option<ApplyTo>,
    #[serde(flatten)]
    pub flags: ActionFlags,
}

impl PermissionRule {
    /// Create a rule with no verdicts.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            apply_to: None,
            flags: ActionFlags::default(),
        }
    }

    /// Restrict the rule to files or folders.
    pub fn apply_to(mut self, apply_to: ApplyTo) -> Self {
        self.apply_to = Some(apply_to);
        self
    }

    /// Allow `action`.
    pub fn allow(mut self, action: Action) -> Self {
        self.flags.set(action, Some(true));
        self
    }

    /// Deny `action`.
    pub fn deny(mut self, action: Action) -> Self {
        self.flags.set(action, Some(false));
        self
    }
}
