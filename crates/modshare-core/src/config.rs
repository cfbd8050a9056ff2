//! Registry configuration.

use serde::Deserialize;
use std::path::PathBuf;

/// Configuration for a [`SharedModuleRegistry`](crate::SharedModuleRegistry).
///
/// Deliberately small: the registry has no timeouts and no retry
/// policy, so the only knobs are where locally hosted bundles live and
/// how remote fetches identify themselves.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Root directory of locally hosted bundles. Entries follow the
    /// `<bundle_root>/<module-name>/<version>/<entry-file>` convention.
    pub bundle_root: PathBuf,

    /// User-Agent header sent on remote fetches.
    pub user_agent: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            bundle_root: PathBuf::from("shared-modules"),
            user_agent: format!("modshare/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RegistryConfig::default();
        assert_eq!(config.bundle_root, PathBuf::from("shared-modules"));
        assert!(config.user_agent.starts_with("modshare/"));
    }

    #[test]
    fn test_deserialize_partial() {
        let config: RegistryConfig =
            serde_json::from_str(r#"{"bundle_root": "/srv/bundles"}"#).unwrap();
        assert_eq!(config.bundle_root, PathBuf::from("/srv/bundles"));
        assert!(!config.user_agent.is_empty());
    }
}
