//! The dynamic-execution boundary.
//!
//! The registry itself only produces data: descriptors, source text,
//! handles. Turning externally supplied text into a running module is
//! a separate capability behind [`ModuleExecutor`], so a host can plug
//! in a real engine, a sandboxed one, or disable execution entirely
//! per target platform.

use async_trait::async_trait;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

use crate::error::{ModuleError, Result};
use crate::handle::ModuleHandle;

/// A module body staged for execution.
///
/// Holds the source text in memory and, when an executor needs to load
/// from a path, an optional temporary backing file. The backing file
/// is deleted when the artifact is dropped, so dropping the artifact
/// as soon as the load settles releases every ephemeral resource it
/// created.
#[derive(Debug)]
pub struct ModuleArtifact {
    name: String,
    version: Option<String>,
    source: String,
    backing: Option<NamedTempFile>,
}

impl ModuleArtifact {
    /// Stage an in-memory module body.
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
            source: source.into(),
            backing: None,
        }
    }

    /// Record the catalog version this body came from.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Module name the artifact belongs to.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Catalog version, when known.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// The module source text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Write the source to a temporary file for executors that load
    /// from a path. The file lives exactly as long as the artifact.
    pub fn materialize(&mut self) -> Result<&Path> {
        if self.backing.is_none() {
            let mut file = NamedTempFile::new().map_err(|e| ModuleError::Io {
                path: format!("<artifact {}>", self.name),
                message: e.to_string(),
            })?;
            file.write_all(self.source.as_bytes())
                .map_err(|e| ModuleError::Io {
                    path: format!("<artifact {}>", self.name),
                    message: e.to_string(),
                })?;
            self.backing = Some(file);
        }
        Ok(self.backing.as_ref().unwrap().path())
    }

    /// Path of the backing file, when one has been materialized.
    pub fn path(&self) -> Option<&Path> {
        self.backing.as_ref().map(|f| f.path())
    }
}

/// Turns a staged artifact into an executed module namespace.
///
/// This is the only boundary in the subsystem where text becomes
/// running code. Implementations run each artifact as an independent
/// module instance, never merged into an existing module graph.
#[async_trait]
pub trait ModuleExecutor: Send + Sync {
    async fn execute(&self, artifact: &ModuleArtifact) -> Result<ModuleHandle>;
}

/// Executor for platforms without an engine: every execution fails
/// with [`ModuleError::ExecutionDisabled`]. Registries built with this
/// executor can still serve resolver-backed and global-binding loads.
#[derive(Debug, Default)]
pub struct DisabledExecutor;

#[async_trait]
impl ModuleExecutor for DisabledExecutor {
    async fn execute(&self, artifact: &ModuleArtifact) -> Result<ModuleHandle> {
        tracing::warn!(module = artifact.name(), "execution requested but disabled");
        Err(ModuleError::ExecutionDisabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_backing_file_lifecycle() {
        let mut artifact = ModuleArtifact::new("katex", "export default {};");
        assert!(artifact.path().is_none());

        let path = artifact.materialize().unwrap().to_path_buf();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "export default {};");

        // Re-materializing reuses the same file.
        assert_eq!(artifact.materialize().unwrap(), path);

        drop(artifact);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_disabled_executor() {
        let artifact = ModuleArtifact::new("katex", "export default {};");
        let err = DisabledExecutor.execute(&artifact).await.unwrap_err();
        assert!(matches!(err, ModuleError::ExecutionDisabled));
    }
}
