//! Handler-per-method RPC endpoints.
//!
//! Each contract method is served by its own small [`Handler`] type. Handlers
//! are collected into a validated [`Registry`] at startup, and every contract
//! is exposed to the RPC host through one [`Dispatcher`] that resolves a fresh
//! handler instance per call.

pub mod bind;
pub mod builder;
pub mod container;
pub mod context;
pub mod contract;
pub mod descriptor;
pub mod dispatch;
pub mod handler;
pub mod host;
pub mod registry;
pub mod scope;
pub mod status;

// Re-export the public API.
pub use bind::{BindError, Binder};
pub use builder::{Endpoints, EndpointsBuilder};
pub use container::{Container, ContainerBuilder, ScopeStats};
pub use context::{CallContext, ContextBuilder, Invocation, Metadata};
pub use contract::{Contract, ContractId, ContractSchema, MethodId, MethodSignature, TypeInfo};
pub use descriptor::HandlerDescriptor;
pub use dispatch::{DispatchError, DispatchOptions, Dispatcher, FallbackReason, MissPolicy, Outcome, ResolveStage};
pub use handler::{Handler, Message};
pub use host::{Host, HostError, Server, Service};
pub use registry::{BuildError, Registry, RegistryBuilder};
pub use scope::{Instance, ResolveError, Resolver, Scope};
pub use status::{Code, Status};

pub use async_trait::async_trait;
pub use tokio_util::sync::CancellationToken;

#[cfg(test)]
mod testing;

#[cfg(test)]
mod tests;
