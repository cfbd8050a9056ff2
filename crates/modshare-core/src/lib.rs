//! Shared-module registry for extension hosts.
//!
//! Lets a host application load third-party extension code against a
//! fixed set of shared libraries without bundling a copy of those
//! libraries into every extension. The crate provides:
//!
//! - a catalog of [`ModuleDescriptor`]s: every available version of
//!   each logical module name and how to obtain it (local bundle,
//!   remote URL, pre-existing global binding, or a pluggable
//!   [`ModuleResolver`]),
//! - a [`SharedModuleRegistry`] that resolves version ranges, loads
//!   each `name@version` exactly once no matter how many concurrent
//!   callers ask, and shares the resulting [`ModuleHandle`] with
//!   reference counting,
//! - a per-extension [`ModuleConsumer`] facade with bulk release,
//! - a [`ModuleExecutor`] boundary separating resolution (data) from
//!   execution (running code).
//!
//! Deliberate non-goals: no transitive dependency solving with
//! backtracking (resolution is greedy, newest compatible version
//! first), no sandboxing, no unloading (reference counts are
//! bookkeeping only), no timeouts or cancellation.

pub mod config;
pub mod consumer;
pub mod coordinator;
pub mod descriptor;
pub mod error;
pub mod executor;
pub mod handle;
pub mod resolver;
mod sources;
pub mod version;

pub use config::RegistryConfig;
pub use consumer::ModuleConsumer;
pub use coordinator::{LoadedInstanceInfo, ModuleRequest, SharedModuleRegistry};
pub use descriptor::{AvailableModule, ModuleDescriptor, ModuleFormat};
pub use error::{ModuleError, Result};
pub use executor::{DisabledExecutor, ModuleArtifact, ModuleExecutor};
pub use handle::{GlobalScope, ModuleHandle, ModuleNamespace};
pub use resolver::{FnResolver, ModuleResolver};
pub use version::{satisfies, Version};
