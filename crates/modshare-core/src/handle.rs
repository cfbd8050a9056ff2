//! Loaded-module handles and the host global scope.

use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Opaque handle to an executed module, shared by every consumer that
/// required it. Handle identity is pointer identity: two `require`
/// calls satisfied by the same loaded instance return clones of the
/// same `Arc`.
pub type ModuleHandle = Arc<ModuleNamespace>;

/// The namespace object produced by executing a module.
///
/// The registry treats this as opaque data; the JSON value is whatever
/// the executor produced (an ES-module-shaped object with a `default`
/// member, or a plain object for classic globals).
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleNamespace {
    value: Value,
}

impl ModuleNamespace {
    /// Wrap a namespace value into a shareable handle.
    pub fn handle(value: Value) -> ModuleHandle {
        Arc::new(Self { value })
    }

    /// The raw namespace value.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// The `default` export when the namespace is ES-module shaped,
    /// otherwise the namespace itself.
    pub fn default_export(&self) -> &Value {
        match self.value.get("default") {
            Some(default) => default,
            None => &self.value,
        }
    }
}

/// The host's global execution scope: named binding slots where loaded
/// module instances are exposed for reference by rewritten extension
/// code.
///
/// Seeded by the host at startup for libraries it already carries
/// (consulted by the global-binding load source), and written by the
/// extension loader when it installs resolved modules for an
/// extension's imports.
#[derive(Debug, Default)]
pub struct GlobalScope {
    bindings: Mutex<HashMap<String, ModuleHandle>>,
}

impl GlobalScope {
    /// Create an empty scope.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a binding, replacing any previous value in the slot.
    pub fn install(&self, name: impl Into<String>, handle: ModuleHandle) {
        self.bindings.lock().insert(name.into(), handle);
    }

    /// Look up a binding by slot name.
    pub fn lookup(&self, name: &str) -> Option<ModuleHandle> {
        self.bindings.lock().get(name).cloned()
    }

    /// Whether a slot is currently bound.
    pub fn contains(&self, name: &str) -> bool {
        self.bindings.lock().contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_export_fallback() {
        let esm = ModuleNamespace::handle(json!({"default": {"render": true}, "other": 1}));
        assert_eq!(esm.default_export(), &json!({"render": true}));

        let plain = ModuleNamespace::handle(json!({"render": true}));
        assert_eq!(plain.default_export(), plain.value());
    }

    #[test]
    fn test_scope_install_and_lookup() {
        let scope = GlobalScope::new();
        assert!(!scope.contains("G_LIB"));

        let handle = ModuleNamespace::handle(json!({"x": 1}));
        scope.install("G_LIB", handle.clone());
        assert!(scope.contains("G_LIB"));
        assert!(Arc::ptr_eq(&scope.lookup("G_LIB").unwrap(), &handle));
    }
}
