//! Built-in load sources.
//!
//! After external resolvers pass on a descriptor, the coordinator
//! falls back to these in fixed priority order: the locally hosted
//! bundle, the remote URL, then a pre-existing host global binding.
//! Each source either does not apply to the descriptor (`Ok(None)`) or
//! was attempted and produced a handle or a failure; failures are
//! non-fatal to the chain.

use std::sync::Arc;

use crate::config::RegistryConfig;
use crate::descriptor::ModuleDescriptor;
use crate::error::{ModuleError, Result};
use crate::executor::{ModuleArtifact, ModuleExecutor};
use crate::handle::{GlobalScope, ModuleHandle};

/// The built-in fallback sources shared by every load.
pub(crate) struct BuiltinSources {
    config: RegistryConfig,
    http: reqwest::Client,
    executor: Arc<dyn ModuleExecutor>,
    scope: Arc<GlobalScope>,
}

impl BuiltinSources {
    pub(crate) fn new(
        config: RegistryConfig,
        executor: Arc<dyn ModuleExecutor>,
        scope: Arc<GlobalScope>,
    ) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
            executor,
            scope,
        }
    }

    /// Load from the locally hosted bundle directory, honoring the
    /// `<bundle_root>/<name>/<version>/<entry>` convention.
    pub(crate) async fn try_local(
        &self,
        descriptor: &ModuleDescriptor,
    ) -> Result<Option<ModuleHandle>> {
        let Some(entry) = &descriptor.local_path else {
            return Ok(None);
        };

        let path = self
            .config
            .bundle_root
            .join(&descriptor.name)
            .join(&descriptor.version)
            .join(entry);
        let source = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| ModuleError::Io {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

        let artifact =
            ModuleArtifact::new(&descriptor.name, source).with_version(&descriptor.version);
        self.executor.execute(&artifact).await.map(Some)
    }

    /// Fetch from the descriptor's remote URL and execute the body.
    pub(crate) async fn try_remote(
        &self,
        descriptor: &ModuleDescriptor,
    ) -> Result<Option<ModuleHandle>> {
        let Some(url) = &descriptor.remote_url else {
            return Ok(None);
        };

        let fetch_err = |message: String| ModuleError::Fetch {
            url: url.clone(),
            message,
        };
        let response = self
            .http
            .get(url)
            .header(reqwest::header::USER_AGENT, self.config.user_agent.as_str())
            .send()
            .await
            .map_err(|e| fetch_err(e.to_string()))?
            .error_for_status()
            .map_err(|e| fetch_err(e.to_string()))?;
        let source = response
            .text()
            .await
            .map_err(|e| fetch_err(e.to_string()))?;

        let artifact =
            ModuleArtifact::new(&descriptor.name, source).with_version(&descriptor.version);
        self.executor.execute(&artifact).await.map(Some)
    }

    /// Look up the descriptor's declared binding in the host scope.
    pub(crate) fn try_global(&self, descriptor: &ModuleDescriptor) -> Result<Option<ModuleHandle>> {
        let Some(binding) = &descriptor.global_name else {
            return Ok(None);
        };

        match self.scope.lookup(binding) {
            Some(handle) => Ok(Some(handle)),
            None => Err(ModuleError::GlobalBindingMissing {
                binding: binding.clone(),
            }),
        }
    }

    pub(crate) fn scope(&self) -> &Arc<GlobalScope> {
        &self.scope
    }

    pub(crate) fn executor(&self) -> &Arc<dyn ModuleExecutor> {
        &self.executor
    }
}
