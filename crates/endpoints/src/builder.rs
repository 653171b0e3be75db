//! # Endpoints builder
//!
//! Fluent startup API: list the handlers, name the contracts to expose, then
//! `build` validates the registry and binds every contract in one fail-fast
//! step.
//!
//! ```ignore
//! let endpoints = Endpoints::builder()
//!     .handler::<SayHello>()
//!     .handler::<SayGoodbye>()
//!     .contract::<Greeter>()
//!     .build(Arc::new(container), &server)?;
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use crate::bind::BindError;
use crate::bind::Binder;
use crate::contract::Contract;
use crate::contract::ContractId;
use crate::descriptor::HandlerDescriptor;
use crate::dispatch::DispatchOptions;
use crate::dispatch::Dispatcher;
use crate::handler::Handler;
use crate::host::Host;
use crate::registry::BuildError;
use crate::registry::Registry;
use crate::scope::Resolver;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("registry build failed: {0}")]
    Build(#[from] BuildError),
    #[error("binding failed: {0}")]
    Bind(#[from] BindError),
}

pub type Result<T> = std::result::Result<T, Error>;

type Bound = Arc<dyn Any + Send + Sync>;
type BindFn = fn(&mut Binder<'_>) -> std::result::Result<(ContractId, Bound), BindError>;

fn bind_contract<C: Contract>(binder: &mut Binder<'_>) -> std::result::Result<(ContractId, Bound), BindError> {
    let dispatcher = binder.bind::<C>()?;
    Ok((ContractId::of::<C>(), dispatcher as Bound))
}

/// The result of a successful startup: a frozen registry and its bound contracts.
#[derive(Clone)]
pub struct Endpoints {
    registry: Registry,
    contracts: Vec<ContractId>,
    dispatchers: HashMap<ContractId, Bound>,
}

impl Endpoints {
    pub fn builder() -> EndpointsBuilder {
        EndpointsBuilder::new()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Bound contracts, in binding order.
    pub fn contracts(&self) -> &[ContractId] {
        &self.contracts
    }

    /// The dispatcher bound for `C`, if it was bound.
    pub fn dispatcher<C: Contract>(&self) -> Option<Arc<Dispatcher<C>>> {
        self.dispatchers
            .get(&ContractId::of::<C>())
            .cloned()
            .and_then(|d| d.downcast::<Dispatcher<C>>().ok())
    }
}

impl std::fmt::Debug for Endpoints {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<_> = self.contracts.iter().map(|c| c.name()).collect();
        f.debug_struct("Endpoints")
            .field("contracts", &names)
            .field("handlers", &self.registry.len())
            .finish()
    }
}

/// Fluent builder for [`Endpoints`].
#[derive(Default)]
pub struct EndpointsBuilder {
    handlers: Vec<HandlerDescriptor>,
    contracts: Vec<BindFn>,
    options: DispatchOptions,
}

impl EndpointsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handler<H: Handler>(mut self) -> Self {
        self.handlers.push(HandlerDescriptor::of::<H>());
        self
    }

    /// Adds a list of descriptors, typically from [`handlers!`](crate::handlers).
    pub fn handlers(mut self, descriptors: impl IntoIterator<Item = HandlerDescriptor>) -> Self {
        self.handlers.extend(descriptors);
        self
    }

    /// Exposes contract `C`. Contracts are bound in the order given.
    pub fn contract<C: Contract>(mut self) -> Self {
        self.contracts.push(bind_contract::<C>);
        self
    }

    pub fn options(mut self, options: DispatchOptions) -> Self {
        self.options = options;
        self
    }

    /// Builds the registry and binds every requested contract to `host`.
    pub fn build(self, resolver: Arc<dyn Resolver>, host: &dyn Host) -> Result<Endpoints> {
        let registry = Registry::build(self.handlers)?;

        let mut binder = Binder::new(registry.clone(), resolver, host).options(self.options);
        let mut contracts = Vec::with_capacity(self.contracts.len());
        let mut dispatchers = HashMap::with_capacity(self.contracts.len());

        for bind in self.contracts {
            let (contract, dispatcher) = bind(&mut binder)?;
            contracts.push(contract);
            dispatchers.insert(contract, dispatcher);
        }

        for contract in registry.contracts() {
            if !binder.is_bound(contract) {
                tracing::warn!(
                    contract = contract.name(),
                    "handlers registered for a contract that is never bound"
                );
            }
        }

        Ok(Endpoints {
            registry,
            contracts,
            dispatchers,
        })
    }
}
