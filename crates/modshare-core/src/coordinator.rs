//! The load coordinator: version resolution, multi-source loading and
//! deduplication of concurrent requests.
//!
//! [`SharedModuleRegistry`] owns the three registry maps as one
//! explicit object:
//! - the descriptor store (catalog of available versions),
//! - the loaded-instance cache, keyed `name@version`, refcounted,
//! - the pending-load map, keyed `name@range`, holding in-flight loads.
//!
//! The registry handle is cheap to clone and every clone shares the
//! same state; construct one per process and pass it to each API
//! surface.
//!
//! Concurrency model: registry state lives behind a synchronous lock
//! that is never held across an await point. Every map mutation
//! (registering a pending load, committing a loaded instance) happens
//! synchronously before the first suspension point of its operation,
//! so re-entrant loads triggered from resolvers or dependency loads
//! never observe a half-updated registry.

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::RegistryConfig;
use crate::descriptor::{AvailableModule, DescriptorStore, ModuleDescriptor};
use crate::error::{ModuleError, Result};
use crate::executor::ModuleExecutor;
use crate::handle::{GlobalScope, ModuleHandle};
use crate::resolver::ModuleResolver;
use crate::sources::BuiltinSources;
use crate::version::{satisfies, Version};

/// One entry of a batch [`SharedModuleRegistry::require_all`] call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleRequest {
    /// Module name.
    pub name: String,

    /// Version range, `*` when unspecified.
    #[serde(default = "default_range")]
    pub version_range: String,

    /// Optional requests that fail are logged and left out of the
    /// result instead of failing the batch.
    #[serde(default)]
    pub optional: bool,
}

fn default_range() -> String {
    "*".to_string()
}

impl ModuleRequest {
    /// A required request for any version of `name`.
    pub fn any(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version_range: default_range(),
            optional: false,
        }
    }

    /// A required request for `name` within `range`.
    pub fn new(name: impl Into<String>, range: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version_range: range.into(),
            optional: false,
        }
    }

    /// Mark this request optional.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }
}

/// A successfully loaded module, cached for the process lifetime.
///
/// Reference counts are bookkeeping for a future eviction policy;
/// nothing is ever unloaded.
#[derive(Debug, Clone)]
struct LoadedInstance {
    descriptor: ModuleDescriptor,
    handle: ModuleHandle,
    loaded_at: DateTime<Utc>,
    ref_count: u64,
}

/// Diagnostic snapshot of one cached instance.
#[derive(Debug, Clone, Serialize)]
pub struct LoadedInstanceInfo {
    pub name: String,
    pub version: String,
    pub ref_count: u64,
    pub loaded_at: DateTime<Utc>,
}

type SharedLoad = Shared<BoxFuture<'static, Result<ModuleHandle>>>;

struct RegistryState {
    store: DescriptorStore,
    loaded: HashMap<String, LoadedInstance>,
    pending: HashMap<String, SharedLoad>,
    resolvers: Vec<Arc<dyn ModuleResolver>>,
}

impl RegistryState {
    /// Highest-versioned cached instance of `name` satisfying `range`.
    fn find_loaded_key(&self, name: &str, range: &str) -> Option<String> {
        self.loaded
            .iter()
            .filter(|(_, inst)| {
                inst.descriptor.name == name && satisfies(&inst.descriptor.version, range)
            })
            .max_by_key(|(_, inst)| Version::parse(&inst.descriptor.version))
            .map(|(key, _)| key.clone())
    }
}

/// Process-wide shared-module registry and load coordinator.
#[derive(Clone)]
pub struct SharedModuleRegistry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    state: Mutex<RegistryState>,
    sources: BuiltinSources,
}

impl SharedModuleRegistry {
    /// Create a registry with a fresh host scope.
    pub fn new(config: RegistryConfig, executor: Arc<dyn ModuleExecutor>) -> Self {
        Self::with_scope(config, executor, Arc::new(GlobalScope::new()))
    }

    /// Create a registry over an existing host scope (used when the
    /// host has already exposed some libraries globally).
    pub fn with_scope(
        config: RegistryConfig,
        executor: Arc<dyn ModuleExecutor>,
        scope: Arc<GlobalScope>,
    ) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                state: Mutex::new(RegistryState {
                    store: DescriptorStore::new(),
                    loaded: HashMap::new(),
                    pending: HashMap::new(),
                    resolvers: Vec::new(),
                }),
                sources: BuiltinSources::new(config, executor, scope),
            }),
        }
    }

    /// The host global scope this registry reads and the extension
    /// loader writes.
    pub fn global_scope(&self) -> Arc<GlobalScope> {
        self.inner.sources.scope().clone()
    }

    /// The dynamic-execution capability this registry was built with.
    pub fn executor(&self) -> Arc<dyn ModuleExecutor> {
        self.inner.sources.executor().clone()
    }

    /// Register one descriptor in the catalog.
    pub fn register(&self, descriptor: ModuleDescriptor) {
        info!(
            name = %descriptor.name,
            version = %descriptor.version,
            "descriptor registered"
        );
        self.inner.state.lock().store.register(descriptor);
    }

    /// Register a batch of descriptors.
    pub fn register_all(&self, descriptors: impl IntoIterator<Item = ModuleDescriptor>) {
        for descriptor in descriptors {
            self.register(descriptor);
        }
    }

    /// Append a resolver to the priority-ordered list consulted before
    /// built-in sources.
    pub fn add_resolver(&self, resolver: Arc<dyn ModuleResolver>) {
        self.inner.state.lock().resolvers.push(resolver);
    }

    /// Every registered name with its known versions, newest first.
    pub fn list_available(&self) -> Vec<AvailableModule> {
        self.inner.state.lock().store.list_available()
    }

    /// Snapshot of the loaded-instance cache.
    pub fn loaded_instances(&self) -> Vec<LoadedInstanceInfo> {
        let state = self.inner.state.lock();
        let mut infos: Vec<LoadedInstanceInfo> = state
            .loaded
            .values()
            .map(|inst| LoadedInstanceInfo {
                name: inst.descriptor.name.clone(),
                version: inst.descriptor.version.clone(),
                ref_count: inst.ref_count,
                loaded_at: inst.loaded_at,
            })
            .collect();
        infos.sort_by(|a, b| (&a.name, &a.version).cmp(&(&b.name, &b.version)));
        infos
    }

    /// Obtain a module satisfying `range`, loading it if necessary.
    ///
    /// An already-loaded satisfying instance is returned immediately
    /// with its reference count bumped. Otherwise the request joins an
    /// in-flight load with the identical `name@range` key, or starts a
    /// new one. Deduplication is keyed by the requested range string:
    /// two requests with different range strings that resolve to the
    /// same version each drive their own load, and only the commit
    /// step collapses them onto one cached instance.
    pub async fn require(&self, name: &str, range: &str) -> Result<ModuleHandle> {
        enum Plan {
            Hit(ModuleHandle),
            Join(SharedLoad),
            Start(SharedLoad, String),
        }

        // Everything up to the first await happens under the lock, so
        // concurrent requests see either no pending entry or the
        // complete one.
        let plan = {
            let mut state = self.inner.state.lock();
            if let Some(key) = state.find_loaded_key(name, range) {
                let inst = state.loaded.get_mut(&key).unwrap();
                inst.ref_count += 1;
                debug!(%key, ref_count = inst.ref_count, "cache hit");
                Plan::Hit(inst.handle.clone())
            } else {
                let cache_key = format!("{name}@{range}");
                if let Some(pending) = state.pending.get(&cache_key) {
                    debug!(%cache_key, "joining in-flight load");
                    Plan::Join(pending.clone())
                } else {
                    let load = {
                        let registry = self.clone();
                        let name = name.to_string();
                        let range = range.to_string();
                        async move { registry.perform_load(name, range).await }
                            .boxed()
                            .shared()
                    };
                    state.pending.insert(cache_key.clone(), load.clone());
                    Plan::Start(load, cache_key)
                }
            }
        };

        match plan {
            Plan::Hit(handle) => Ok(handle),
            Plan::Join(load) => {
                let handle = load.await?;
                // Joiners account for their own reference.
                let mut state = self.inner.state.lock();
                if let Some(key) = state.find_loaded_key(name, range) {
                    state.loaded.get_mut(&key).unwrap().ref_count += 1;
                }
                Ok(handle)
            }
            Plan::Start(load, cache_key) => {
                // Pending entries are removed once the load settles,
                // success or failure.
                let guard = scopeguard::guard(self.clone(), move |registry| {
                    registry.inner.state.lock().pending.remove(&cache_key);
                });
                let result = load.await;
                drop(guard);
                result
            }
        }
    }

    /// Drop one reference to a loaded instance compatible with
    /// `range`. Counts floor at zero and nothing is ever unloaded;
    /// this is an accounting signal only.
    pub fn release(&self, name: &str, range: &str) {
        let mut state = self.inner.state.lock();
        if let Some(key) = state.find_loaded_key(name, range) {
            let inst = state.loaded.get_mut(&key).unwrap();
            inst.ref_count = inst.ref_count.saturating_sub(1);
            debug!(%key, ref_count = inst.ref_count, "released");
        }
    }

    /// Issue a batch of requests concurrently.
    ///
    /// Optional requests that fail are logged and absent from the
    /// result map; a required failure fails the whole batch.
    pub async fn require_all(
        &self,
        requests: &[ModuleRequest],
    ) -> Result<HashMap<String, ModuleHandle>> {
        let loads = requests
            .iter()
            .map(|req| async move { (req, self.require(&req.name, &req.version_range).await) });
        let settled = futures::future::join_all(loads).await;

        let mut handles = HashMap::new();
        for (req, result) in settled {
            match result {
                Ok(handle) => {
                    handles.insert(req.name.clone(), handle);
                }
                Err(err) if req.optional => {
                    warn!(name = %req.name, range = %req.version_range, %err,
                        "optional dependency missing");
                }
                Err(err) => return Err(err),
            }
        }
        Ok(handles)
    }

    /// Drive one load to completion: resolve the descriptor, load its
    /// dependencies sequentially, then walk the source priority chain.
    fn perform_load(self, name: String, range: String) -> BoxFuture<'static, Result<ModuleHandle>> {
        async move {
            let descriptor = {
                let state = self.inner.state.lock();
                state.store.find_compatible(&name, &range).cloned()
            }
            .ok_or_else(|| ModuleError::DescriptorNotFound {
                name: name.clone(),
                range: range.clone(),
            })?;

            // Dependencies load strictly in list order; a later one is
            // not started until the earlier one has settled.
            for dependency in &descriptor.dependencies {
                self.require(dependency, "*").await.map_err(|err| {
                    ModuleError::DependencyLoadFailed {
                        name: name.clone(),
                        dependency: dependency.clone(),
                        source: Box::new(err),
                    }
                })?;
            }

            let handle = self.attempt_sources(&descriptor).await?;
            Ok(self.commit(descriptor, handle))
        }
        .boxed()
    }

    /// Walk resolvers, then built-in sources, in fixed priority order.
    /// A failing source is logged and the chain proceeds; only
    /// exhaustion of the whole chain is fatal.
    async fn attempt_sources(&self, descriptor: &ModuleDescriptor) -> Result<ModuleHandle> {
        let resolvers = self.inner.state.lock().resolvers.clone();
        for (index, resolver) in resolvers.iter().enumerate() {
            match resolver.resolve(&descriptor.name, &descriptor.version).await {
                Ok(Some(handle)) => {
                    debug!(name = %descriptor.name, index, "resolved by external resolver");
                    return Ok(handle);
                }
                Ok(None) => {}
                Err(err) => {
                    warn!(name = %descriptor.name, index, %err, "resolver failed, trying next source");
                }
            }
        }

        match self.inner.sources.try_local(descriptor).await {
            Ok(Some(handle)) => return Ok(handle),
            Ok(None) => {}
            Err(err) => {
                warn!(name = %descriptor.name, %err, "local bundle failed, trying next source");
            }
        }

        match self.inner.sources.try_remote(descriptor).await {
            Ok(Some(handle)) => return Ok(handle),
            Ok(None) => {}
            Err(err) => {
                warn!(name = %descriptor.name, %err, "remote fetch failed, trying next source");
            }
        }

        match self.inner.sources.try_global(descriptor) {
            Ok(Some(handle)) => return Ok(handle),
            Ok(None) => {}
            Err(err) => {
                warn!(name = %descriptor.name, %err, "global binding lookup failed");
            }
        }

        Err(ModuleError::AllSourcesFailed {
            name: descriptor.name.clone(),
            version: descriptor.version.clone(),
        })
    }

    /// Commit a freshly loaded handle to the cache. A `name@version`
    /// instance is created at most once: if a load for a different
    /// range string committed the same version first, this request
    /// becomes another reference to that instance.
    fn commit(&self, descriptor: ModuleDescriptor, handle: ModuleHandle) -> ModuleHandle {
        let key = descriptor.instance_key();
        let mut state = self.inner.state.lock();
        if let Some(existing) = state.loaded.get_mut(&key) {
            existing.ref_count += 1;
            return existing.handle.clone();
        }

        info!(%key, "module loaded");
        state.loaded.insert(
            key,
            LoadedInstance {
                descriptor,
                handle: handle.clone(),
                loaded_at: Utc::now(),
                ref_count: 1,
            },
        );
        handle
    }
}
