//! Extension manifest model.

use modshare_core::ModuleRequest;
use serde::Deserialize;

use crate::error::{LoaderError, Result};

/// Manifest shipped alongside an extension's source, declaring which
/// shared modules the host should resolve for it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionManifest {
    /// Extension name; used for logging and artifact naming.
    pub name: String,

    /// Declared shared-module requests.
    #[serde(default)]
    pub shared_dependencies: Vec<ModuleRequest>,
}

impl ExtensionManifest {
    /// Manifest with no shared dependencies.
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            shared_dependencies: Vec::new(),
        }
    }

    /// Parse a manifest from its JSON form.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| LoaderError::Manifest(e.to_string()))
    }
}
