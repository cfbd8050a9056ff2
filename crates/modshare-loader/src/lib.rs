//! Extension loader for shared-module hosts.
//!
//! Consumes the registry from `modshare-core` to satisfy an extension
//! manifest's declared shared dependencies, rewrites the extension's
//! static import statements into references against the loaded
//! instances' global binding slots, and executes the rewritten text as
//! an isolated module.

pub mod error;
pub mod loader;
pub mod manifest;
pub mod rewrite;

pub use error::{LoaderError, Result};
pub use loader::{ExtensionLoader, LoadedExtension};
pub use manifest::ExtensionManifest;
pub use rewrite::{
    global_slot_name, rewrite_imports, ImportClause, NamedBinding, RewriteResult,
    UnsupportedImport,
};
