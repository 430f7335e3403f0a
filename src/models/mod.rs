//! Data models and types for the explorer engine.
//!
//! Contains domain types for:
//! - [`Entry`], [`SortConfig`] - Flat entry collection and listing order
//! - [`PermissionRule`], [`Action`] - Path-pattern permission rules
//! - [`Modifiers`], [`ClickOutcome`], [`FolderChange`] - View interaction
//! - [`UploadTask`], [`UploadFile`], [`UploadResult`] - Upload pipeline

mod entry;
mod explorer;
mod permission;
mod upload;

pub use entry::{Entry, SortConfig, SortDirection, SortKey};
pub use explorer::{ClickOutcome, FolderChange, Modifiers, OpenOutcome};
pub use permission::{ActionFlags, Action, ApplyTo, PermissionRule};
pub use upload::{
    Metadata, SignedUploadRecord, TaskId, UploadFile, UploadResult, UploadState, UploadTask,
};
