//! Per-extension consumer facade.
//!
//! Each extension identity gets its own [`ModuleConsumer`] over the
//! shared registry. The facade records which `(name, range)` pairs the
//! consumer currently holds so the host can bulk-release everything
//! when the extension goes away.

use parking_lot::Mutex;
use std::collections::HashMap;
use uuid::Uuid;

use crate::coordinator::{ModuleRequest, SharedModuleRegistry};
use crate::descriptor::AvailableModule;
use crate::error::Result;
use crate::handle::ModuleHandle;
use tracing::debug;

/// Consumer-facing API scoped to one extension identity.
pub struct ModuleConsumer {
    registry: SharedModuleRegistry,
    consumer_id: Uuid,
    held: Mutex<Vec<(String, String)>>,
}

impl ModuleConsumer {
    /// Create a facade over `registry` for one extension.
    pub fn new(registry: SharedModuleRegistry) -> Self {
        Self {
            registry,
            consumer_id: Uuid::new_v4(),
            held: Mutex::new(Vec::new()),
        }
    }

    /// Identity of this consumer, used in log lines.
    pub fn id(&self) -> Uuid {
        self.consumer_id
    }

    /// Require a module; `range` defaults to `*` when `None`.
    pub async fn require(&self, name: &str, range: Option<&str>) -> Result<ModuleHandle> {
        let range = range.unwrap_or("*");
        let handle = self.registry.require(name, range).await?;
        debug!(consumer = %self.consumer_id, name, range, "consumer acquired module");
        self.held
            .lock()
            .push((name.to_string(), range.to_string()));
        Ok(handle)
    }

    /// Batch-require on behalf of this consumer; successful entries
    /// are recorded as held.
    pub async fn require_all(
        &self,
        requests: &[ModuleRequest],
    ) -> Result<HashMap<String, ModuleHandle>> {
        let handles = self.registry.require_all(requests).await?;
        let mut held = self.held.lock();
        for req in requests {
            if handles.contains_key(&req.name) {
                held.push((req.name.clone(), req.version_range.clone()));
            }
        }
        Ok(handles)
    }

    /// Release one previously required `(name, range)` pair. A pair
    /// this consumer does not hold is ignored.
    pub fn release(&self, name: &str, range: Option<&str>) {
        let range = range.unwrap_or("*");
        let mut held = self.held.lock();
        let Some(pos) = held
            .iter()
            .position(|(n, r)| n == name && r == range)
        else {
            return;
        };
        held.remove(pos);
        drop(held);

        debug!(consumer = %self.consumer_id, name, range, "consumer released module");
        self.registry.release(name, range);
    }

    /// Release everything this consumer still holds.
    pub fn release_all(&self) {
        let held = std::mem::take(&mut *self.held.lock());
        for (name, range) in held {
            debug!(consumer = %self.consumer_id, %name, %range, "consumer released module");
            self.registry.release(&name, &range);
        }
    }

    /// Diagnostic view of the catalog.
    pub fn get_available(&self) -> Vec<AvailableModule> {
        self.registry.list_available()
    }

    /// Number of `(name, range)` pairs currently held.
    pub fn held_count(&self) -> usize {
        self.held.lock().len()
    }
}
