//! GeekCMS Core Types
//!
//! This crate contains pure types and logic with no I/O: plugin references,
//! the conflict model shared by every sequencing stage, and the plugin
//! catalog capability the sequencer validates operands against.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod catalog;
pub mod error;
pub mod plugin;

// Re-exports
pub use catalog::{
    AssetKind, PermissiveCatalog, PluginCatalog, PluginEntry, PluginRegistry, RegistryError,
    RegistryManifest,
};
pub use error::{ConflictKind, IdentError, SequenceError, SequenceResult};
pub use plugin::{is_identifier, PluginRef};
