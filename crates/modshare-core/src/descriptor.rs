//! Module descriptors and the descriptor store.
//!
//! A descriptor is one catalog entry: one version of a shared module
//! and every way the registry knows to obtain it. The store keeps, per
//! module name, a list of descriptors sorted descending by version so
//! that first-match resolution always yields the newest compatible
//! version.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::version::{satisfies, Version};

/// How a module's executed namespace is shaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ModuleFormat {
    /// ES module: exports under named members, default under `default`.
    #[default]
    Esm,
    /// Classic script exposing a single global object.
    Global,
    /// UMD build: global object that may or may not carry `default`.
    Umd,
}

/// Catalog entry describing one version of a shared module.
///
/// At least one of `local_path`, `remote_url` or `global_name` should
/// be set; a descriptor with none can only be satisfied by an external
/// resolver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleDescriptor {
    /// Logical module name, e.g. `"markdown-it"`.
    pub name: String,

    /// Version string, best-effort semantic triple (see [`Version`]).
    pub version: String,

    /// Entry file under the locally hosted bundle convention
    /// `<bundle_root>/<name>/<version>/<local_path>`.
    #[serde(default)]
    pub local_path: Option<String>,

    /// Remote content-delivery URL for this exact version.
    #[serde(default)]
    pub remote_url: Option<String>,

    /// Name of a pre-existing host global binding carrying this module.
    #[serde(default)]
    pub global_name: Option<String>,

    /// Shape of the executed namespace.
    #[serde(default)]
    pub format: ModuleFormat,

    /// Names of modules that must be loaded before this one. Any
    /// available version satisfies (loaded with range `*`).
    #[serde(default)]
    pub dependencies: Vec<String>,

    /// Informational: not preloaded by hosts that warm the cache.
    #[serde(default)]
    pub lazy: bool,
}

impl ModuleDescriptor {
    /// Create a descriptor with no sources attached.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            local_path: None,
            remote_url: None,
            global_name: None,
            format: ModuleFormat::default(),
            dependencies: Vec::new(),
            lazy: false,
        }
    }

    /// Set the locally hosted entry file.
    pub fn with_local_path(mut self, path: impl Into<String>) -> Self {
        self.local_path = Some(path.into());
        self
    }

    /// Set the remote URL.
    pub fn with_remote_url(mut self, url: impl Into<String>) -> Self {
        self.remote_url = Some(url.into());
        self
    }

    /// Set the pre-existing host global binding name.
    pub fn with_global_name(mut self, name: impl Into<String>) -> Self {
        self.global_name = Some(name.into());
        self
    }

    /// Set the namespace format.
    pub fn with_format(mut self, format: ModuleFormat) -> Self {
        self.format = format;
        self
    }

    /// Add dependency names.
    pub fn with_dependencies(mut self, deps: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.dependencies.extend(deps.into_iter().map(Into::into));
        self
    }

    /// Mark as lazily loaded.
    pub fn lazy(mut self) -> Self {
        self.lazy = true;
        self
    }

    /// Cache key of the instance this descriptor loads into.
    pub fn instance_key(&self) -> String {
        format!("{}@{}", self.name, self.version)
    }
}

/// Diagnostic view of one registered module name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AvailableModule {
    pub name: String,
    /// Version strings, newest first.
    pub versions: Vec<String>,
}

/// Holds every known descriptor, grouped by module name.
#[derive(Debug, Default)]
pub struct DescriptorStore {
    descriptors: HashMap<String, Vec<ModuleDescriptor>>,
}

impl DescriptorStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor. The name's list is re-sorted descending
    /// by version. Re-registering an identical name/version appends a
    /// duplicate entry; callers are responsible for not
    /// double-registering.
    pub fn register(&mut self, descriptor: ModuleDescriptor) {
        let list = self.descriptors.entry(descriptor.name.clone()).or_default();
        list.push(descriptor);
        list.sort_by(|a, b| Version::parse(&b.version).cmp(&Version::parse(&a.version)));
    }

    /// Find the newest descriptor of `name` whose version satisfies
    /// `range`. The per-name list is already descending, so the first
    /// match is the highest compatible version.
    pub fn find_compatible(&self, name: &str, range: &str) -> Option<&ModuleDescriptor> {
        self.descriptors
            .get(name)?
            .iter()
            .find(|d| satisfies(&d.version, range))
    }

    /// Read-only diagnostic view: every registered name with its known
    /// versions, newest first.
    pub fn list_available(&self) -> Vec<AvailableModule> {
        let mut available: Vec<AvailableModule> = self
            .descriptors
            .iter()
            .map(|(name, list)| AvailableModule {
                name: name.clone(),
                versions: list.iter().map(|d| d.version.clone()).collect(),
            })
            .collect();
        available.sort_by(|a, b| a.name.cmp(&b.name));
        available
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_keeps_descending_order() {
        let mut store = DescriptorStore::new();
        store.register(ModuleDescriptor::new("highlight", "10.7.2"));
        store.register(ModuleDescriptor::new("highlight", "11.9.0"));
        store.register(ModuleDescriptor::new("highlight", "11.2.0"));

        let available = store.list_available();
        assert_eq!(available.len(), 1);
        assert_eq!(available[0].versions, vec!["11.9.0", "11.2.0", "10.7.2"]);
    }

    #[test]
    fn test_find_compatible_returns_newest_match() {
        let mut store = DescriptorStore::new();
        store.register(ModuleDescriptor::new("katex", "0.16.0"));
        store.register(ModuleDescriptor::new("katex", "0.16.9"));
        store.register(ModuleDescriptor::new("katex", "0.15.3"));

        let found = store.find_compatible("katex", "^0.16.0").unwrap();
        assert_eq!(found.version, "0.16.9");

        let found = store.find_compatible("katex", "*").unwrap();
        assert_eq!(found.version, "0.16.9");
    }

    #[test]
    fn test_find_compatible_misses() {
        let mut store = DescriptorStore::new();
        store.register(ModuleDescriptor::new("katex", "0.16.9"));

        assert!(store.find_compatible("unknown", "*").is_none());
        assert!(store.find_compatible("katex", "^1.0.0").is_none());
    }

    #[test]
    fn test_duplicate_registration_appends() {
        let mut store = DescriptorStore::new();
        store.register(ModuleDescriptor::new("vue", "3.4.0"));
        store.register(ModuleDescriptor::new("vue", "3.4.0"));

        assert_eq!(store.list_available()[0].versions.len(), 2);
    }

    #[test]
    fn test_descriptor_builder() {
        let descriptor = ModuleDescriptor::new("markdown-it", "14.1.0")
            .with_local_path("index.js")
            .with_remote_url("https://cdn.example.com/markdown-it/14.1.0/index.js")
            .with_global_name("markdownit")
            .with_format(ModuleFormat::Umd)
            .with_dependencies(["entities"])
            .lazy();

        assert_eq!(descriptor.instance_key(), "markdown-it@14.1.0");
        assert_eq!(descriptor.dependencies, vec!["entities"]);
        assert!(descriptor.lazy);
    }
}
