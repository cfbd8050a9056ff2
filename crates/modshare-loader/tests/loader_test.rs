//! Integration tests for extension loading.

use async_trait::async_trait;
use serde_json::json;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use modshare_core::{
    GlobalScope, ModuleArtifact, ModuleDescriptor, ModuleError, ModuleExecutor, ModuleHandle,
    ModuleNamespace, RegistryConfig, Result as CoreResult, SharedModuleRegistry,
};
use modshare_loader::{ExtensionLoader, ExtensionManifest, LoaderError};

/// Executor that records what it was asked to run and returns a fixed
/// namespace, or fails when told to.
#[derive(Default)]
struct CapturingExecutor {
    fail: bool,
    executed: Mutex<Vec<(String, String, Option<PathBuf>)>>,
}

impl CapturingExecutor {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    fn executed(&self) -> Vec<(String, String, Option<PathBuf>)> {
        self.executed.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModuleExecutor for CapturingExecutor {
    async fn execute(&self, artifact: &ModuleArtifact) -> CoreResult<ModuleHandle> {
        self.executed.lock().unwrap().push((
            artifact.name().to_string(),
            artifact.source().to_string(),
            artifact.path().map(|p| p.to_path_buf()),
        ));
        if self.fail {
            return Err(ModuleError::Execution {
                name: artifact.name().to_string(),
                message: "engine rejected module".into(),
            });
        }
        Ok(ModuleNamespace::handle(json!({"loaded": artifact.name()})))
    }
}

/// Registry whose only load source is a pre-seeded host global
/// binding for katex.
fn registry_with_host_katex(
    executor: Arc<CapturingExecutor>,
) -> (SharedModuleRegistry, ModuleHandle) {
    let scope = Arc::new(GlobalScope::new());
    let katex = ModuleNamespace::handle(json!({"default": {"render": true}}));
    scope.install("KatexHost", katex.clone());

    let registry = SharedModuleRegistry::with_scope(RegistryConfig::default(), executor, scope);
    registry.register(ModuleDescriptor::new("katex", "0.16.9").with_global_name("KatexHost"));
    (registry, katex)
}

#[tokio::test]
async fn test_load_extension_end_to_end() {
    let executor = Arc::new(CapturingExecutor::default());
    let (registry, katex) = registry_with_host_katex(executor.clone());
    let loader = ExtensionLoader::new(registry.clone());

    let manifest = ExtensionManifest::from_json(
        r#"{
            "name": "math-preview",
            "sharedDependencies": [{"name": "katex", "versionRange": "^0.16.0"}]
        }"#,
    )
    .unwrap();
    let source = "import katex from \"katex\";\nexport function render(el) { katex.render(el); }\n";

    let loaded = loader.load_extension(source, &manifest).await.unwrap();
    assert_eq!(loaded.namespace.value(), &json!({"loaded": "math-preview"}));
    assert_eq!(loaded.consumer().held_count(), 1);

    // The resolved instance was installed under its derived slot.
    let scope = registry.global_scope();
    let slot = scope.lookup("__MODSHARE_KATEX__").unwrap();
    assert!(Arc::ptr_eq(&slot, &katex));

    // The executed text reads from the slot instead of importing.
    let executed = executor.executed();
    assert_eq!(executed.len(), 1);
    let (name, rewritten, path) = &executed[0];
    assert_eq!(name, "math-preview");
    assert!(!rewritten.contains("import katex"));
    assert!(rewritten.contains("globalThis.__MODSHARE_KATEX__"));
    assert!(rewritten.contains("export function render"));

    // The artifact was materialized for the executor and released
    // once the load settled.
    let path = path.as_ref().unwrap();
    assert!(!path.exists());
}

#[tokio::test]
async fn test_optional_missing_dependency_leaves_import_untouched() {
    let executor = Arc::new(CapturingExecutor::default());
    let (registry, _) = registry_with_host_katex(executor.clone());
    let loader = ExtensionLoader::new(registry);

    let manifest = ExtensionManifest::from_json(
        r#"{
            "name": "diagram-preview",
            "sharedDependencies": [
                {"name": "katex", "versionRange": "^0.16.0"},
                {"name": "mermaid", "optional": true}
            ]
        }"#,
    )
    .unwrap();
    let source = "import katex from \"katex\";\nimport mermaid from \"mermaid\";\n";

    let loaded = loader.load_extension(source, &manifest).await.unwrap();
    assert_eq!(loaded.consumer().held_count(), 1);

    let (_, rewritten, _) = &executor.executed()[0];
    assert!(rewritten.contains("globalThis.__MODSHARE_KATEX__"));
    // The optional miss resolved nothing, so its import stays as-is.
    assert!(rewritten.contains("import mermaid from \"mermaid\";"));
}

#[tokio::test]
async fn test_required_missing_dependency_fails_load() {
    let executor = Arc::new(CapturingExecutor::default());
    let (registry, _) = registry_with_host_katex(executor.clone());
    let loader = ExtensionLoader::new(registry);

    let manifest = ExtensionManifest::from_json(
        r#"{
            "name": "broken",
            "sharedDependencies": [{"name": "mermaid"}]
        }"#,
    )
    .unwrap();

    let err = loader.load_extension("export default 1;", &manifest).await;
    assert!(matches!(
        err,
        Err(LoaderError::Module(ModuleError::DescriptorNotFound { .. }))
    ));
    // Nothing was executed.
    assert!(executor.executed().is_empty());
}

#[tokio::test]
async fn test_execution_failure_surfaces_and_releases_artifact() {
    let executor = Arc::new(CapturingExecutor::failing());
    let (registry, _) = registry_with_host_katex(executor.clone());
    let loader = ExtensionLoader::new(registry);

    let manifest = ExtensionManifest::empty("bad-extension");
    let err = loader.load_extension("syntax error {", &manifest).await;
    assert!(matches!(
        err,
        Err(LoaderError::Module(ModuleError::Execution { .. }))
    ));

    let (_, _, path) = &executor.executed()[0];
    assert!(!path.as_ref().unwrap().exists());
}

#[tokio::test]
async fn test_release_shared_returns_references() {
    let executor = Arc::new(CapturingExecutor::default());
    let (registry, _) = registry_with_host_katex(executor);
    let loader = ExtensionLoader::new(registry.clone());

    let manifest = ExtensionManifest::from_json(
        r#"{
            "name": "math-preview",
            "sharedDependencies": [{"name": "katex", "versionRange": "^0.16.0"}]
        }"#,
    )
    .unwrap();

    let loaded = loader
        .load_extension("import katex from \"katex\";", &manifest)
        .await
        .unwrap();
    assert_eq!(registry.loaded_instances()[0].ref_count, 1);

    loaded.release_shared();
    assert_eq!(loaded.consumer().held_count(), 0);
    // The instance itself stays cached; release is accounting only.
    let instances = registry.loaded_instances();
    assert_eq!(instances.len(), 1);
    assert_eq!(instances[0].ref_count, 0);
}
