//! Core business logic for the explorer engine.
//!
//! This module provides:
//! - [`EntryStore`] indexing and [`derive_listing`] / [`derive_tree`] views
//! - [`PermissionEngine`] path-pattern permission resolution
//! - [`Selection`] and [`Clipboard`] interaction state
//! - [`UploadPipeline`] upload task lifecycle
//! - [`Explorer`] tying them together over a [`Backend`]

pub mod backend;
mod clipboard;
pub mod error;
mod explorer;
pub mod index;
mod naming;
pub mod permissions;
mod selection;
pub mod store;
pub mod upload;

pub use backend::{Backend, TransferItem, TransferPlan};
pub use clipboard::{Clipboard, ClipboardEntry};
pub use explorer::Explorer;
pub use index::{Crumb, FolderNode, Listing, derive_listing, derive_tree};
pub use naming::{is_valid_name, unique_name};
pub use permissions::{Decision, PermissionEngine};
pub use selection::Selection;
pub use store::EntryStore;
pub use upload::{UploadEvent, UploadPipeline, UploadTransport, UploadValidator, ValidationOutcome};
