//! Registry error types.
//!
//! Errors are `Clone` so that an in-flight load shared by several
//! concurrent requesters can hand the same failure to each of them.
//! Source errors that are not themselves cloneable (IO, HTTP) are
//! carried as messages.

/// Errors produced by the shared-module registry.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ModuleError {
    /// No registered descriptor satisfies the requested range.
    #[error("no compatible descriptor for {name}@{range}")]
    DescriptorNotFound { name: String, range: String },

    /// A descriptor was found but every source in the priority chain failed.
    #[error("could not load module {name}@{version}: all sources failed")]
    AllSourcesFailed { name: String, version: String },

    /// A recursive dependency load failed.
    #[error("dependency {dependency} of {name} failed to load: {source}")]
    DependencyLoadFailed {
        name: String,
        dependency: String,
        #[source]
        source: Box<ModuleError>,
    },

    /// A remote fetch failed. Non-fatal per source attempt.
    #[error("fetch failed for {url}: {message}")]
    Fetch { url: String, message: String },

    /// A local bundle read failed. Non-fatal per source attempt.
    #[error("bundle read failed for {path}: {message}")]
    Io { path: String, message: String },

    /// Module execution failed.
    #[error("execution failed for {name}: {message}")]
    Execution { name: String, message: String },

    /// The descriptor's declared global binding is not present in the
    /// host scope. Non-fatal per source attempt.
    #[error("global binding {binding} is not present in the host scope")]
    GlobalBindingMissing { binding: String },

    /// Dynamic execution is not available on this platform.
    #[error("module execution is disabled on this platform")]
    ExecutionDisabled,
}

/// Result type for registry operations.
pub type Result<T> = std::result::Result<T, ModuleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ModuleError::DescriptorNotFound {
            name: "markdown-it".into(),
            range: "^14.0.0".into(),
        };
        assert_eq!(
            err.to_string(),
            "no compatible descriptor for markdown-it@^14.0.0"
        );

        let err = ModuleError::DependencyLoadFailed {
            name: "katex-plugin".into(),
            dependency: "katex".into(),
            source: Box::new(ModuleError::ExecutionDisabled),
        };
        assert!(err.to_string().contains("katex"));
    }
}
