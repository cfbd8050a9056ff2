//! Pluggable module resolvers.
//!
//! Resolvers are consulted, in registration order, before any built-in
//! load source. A resolver that returns `None` simply passes; a
//! resolver that errors is logged and treated the same way. The usual
//! host use is binding a module name to an instance the host already
//! carries in-process.

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::error::Result;
use crate::handle::ModuleHandle;

/// A pluggable resolution strategy: given a module name and the exact
/// version selected from the catalog, produce an instance or pass.
#[async_trait]
pub trait ModuleResolver: Send + Sync {
    async fn resolve(&self, name: &str, version: &str) -> Result<Option<ModuleHandle>>;
}

/// Adapter turning a closure into a [`ModuleResolver`].
pub struct FnResolver<F> {
    f: F,
}

impl<F> FnResolver<F>
where
    F: Fn(&str, &str) -> BoxFuture<'static, Result<Option<ModuleHandle>>> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F> ModuleResolver for FnResolver<F>
where
    F: Fn(&str, &str) -> BoxFuture<'static, Result<Option<ModuleHandle>>> + Send + Sync,
{
    async fn resolve(&self, name: &str, version: &str) -> Result<Option<ModuleHandle>> {
        (self.f)(name, version).await
    }
}
