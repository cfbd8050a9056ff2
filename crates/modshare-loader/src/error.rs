//! Loader error types.

use modshare_core::ModuleError;

/// Errors produced while loading an extension.
#[derive(Debug, thiserror::Error)]
pub enum LoaderError {
    /// A shared-module resolution or execution failure, surfaced
    /// unchanged from the registry.
    #[error(transparent)]
    Module(#[from] ModuleError),

    /// The extension manifest could not be parsed.
    #[error("invalid extension manifest: {0}")]
    Manifest(String),
}

/// Result type for loader operations.
pub type Result<T> = std::result::Result<T, LoaderError>;
