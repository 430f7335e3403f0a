//! Client-side state engine for a virtual filesystem explorer.
//!
//! The host supplies a flat list of [`Entry`] records and a [`Backend`];
//! the engine derives folder listings, the folder tree and breadcrumbs,
//! resolves path-pattern permissions, and drives selection, clipboard
//! and upload state. Rendering is left to the host.
//!
//! - [`core`] - Store, views, permissions, interaction state, uploads
//! - [`models`] - Entry, rule, and upload types
//! - [`config`] - Constants and host-supplied settings
//! - [`utils`] - Path and formatting helpers, browser transport

pub mod config;
pub mod core;
pub mod models;
pub mod utils;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use crate::config::{ExplorerConfig, UploadConfig};
pub use crate::core::error::{BackendError, ExplorerError, PermissionDenied, UploadError};
pub use crate::core::{Backend, Explorer, PermissionEngine, UploadPipeline, UploadTransport};
pub use crate::models::{Action, Entry, PermissionRule};
