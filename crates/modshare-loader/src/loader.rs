//! Extension loading against shared modules.
//!
//! The loader is the sole boundary where extension-authored text
//! enters execution: it resolves the manifest's shared dependencies
//! through a per-extension consumer, installs each resolved instance
//! under a derived global binding slot, rewrites the extension's
//! static imports to read from those slots, and hands the rewritten
//! text to the registry's execution capability as an independent
//! module instance.

use std::collections::HashMap;
use tracing::{debug, info, warn};

use modshare_core::{ModuleArtifact, ModuleConsumer, ModuleHandle, SharedModuleRegistry};

use crate::error::Result;
use crate::manifest::ExtensionManifest;
use crate::rewrite::{global_slot_name, rewrite_imports};

/// A successfully executed extension.
pub struct LoadedExtension {
    /// The extension's module namespace.
    pub namespace: ModuleHandle,
    /// The consumer holding the extension's shared-module references.
    consumer: ModuleConsumer,
}

impl LoadedExtension {
    /// The consumer facade tracking this extension's holdings.
    pub fn consumer(&self) -> &ModuleConsumer {
        &self.consumer
    }

    /// Release every shared-module reference this extension holds.
    /// Accounting only; nothing is unloaded.
    pub fn release_shared(&self) {
        self.consumer.release_all();
    }
}

/// Loads extensions with their shared dependencies satisfied from the
/// registry.
pub struct ExtensionLoader {
    registry: SharedModuleRegistry,
}

impl ExtensionLoader {
    /// Create a loader over `registry`.
    pub fn new(registry: SharedModuleRegistry) -> Self {
        Self { registry }
    }

    /// Load an extension from its raw source and manifest.
    ///
    /// Optional dependencies that fail to resolve are simply absent:
    /// their imports stay untouched in the source. Rewrite or
    /// execution failures are surfaced unchanged. Ephemeral artifact
    /// resources are released once the load settles either way.
    pub async fn load_extension(
        &self,
        source: &str,
        manifest: &ExtensionManifest,
    ) -> Result<LoadedExtension> {
        let consumer = ModuleConsumer::new(self.registry.clone());
        let handles = consumer
            .require_all(&manifest.shared_dependencies)
            .await?;

        let scope = self.registry.global_scope();
        let mut bindings = HashMap::new();
        for (name, handle) in &handles {
            let slot = global_slot_name(name);
            scope.install(slot.clone(), handle.clone());
            bindings.insert(name.clone(), slot);
        }

        let rewrite = rewrite_imports(source, &bindings);
        for skipped in &rewrite.unsupported {
            warn!(
                extension = %manifest.name,
                module = %skipped.module,
                reason = %skipped.reason,
                "unsupported import left untouched"
            );
        }
        debug!(
            extension = %manifest.name,
            rewritten = rewrite.rewritten.len(),
            "imports rewritten"
        );

        let mut artifact = ModuleArtifact::new(&manifest.name, rewrite.source);
        artifact.materialize()?;
        let result = self.registry.executor().execute(&artifact).await;
        // Dropping the artifact releases its backing file no matter
        // how the load settled.
        drop(artifact);

        let namespace = result?;
        info!(extension = %manifest.name, "extension loaded");
        Ok(LoadedExtension {
            namespace,
            consumer,
        })
    }
}
