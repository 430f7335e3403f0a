//! Utility modules for paths, formatting, and browser networking.
//!
//! Provides:
//! - [`path`] - Path joining, splitting, and rebasing
//! - [`format`] - Size, date, and name formatting for listings
//! - `XhrTransport` - Upload transport for the browser (wasm32 only)

pub mod format;
pub mod path;
#[cfg(target_arch = "wasm32")]
mod xhr;

#[cfg(target_arch = "wasm32")]
pub use xhr::XhrTransport;
