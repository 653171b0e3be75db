//! # Contract binder
//!
//! Installs one [`Dispatcher`] per contract as that contract's implementation
//! on a [`Host`]. The registry, resolver and dispatch options are shared by
//! every dispatcher the binder creates.

use std::collections::HashSet;
use std::sync::Arc;

use crate::contract::Contract;
use crate::contract::ContractId;
use crate::dispatch::DispatchOptions;
use crate::dispatch::Dispatcher;
use crate::host::Host;
use crate::host::HostError;
use crate::registry::Registry;
use crate::scope::Resolver;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BindError {
    /// The contract was already bound by this binder.
    #[error("contract '{0}' is already bound")]
    AlreadyBound(&'static str),
    #[error(transparent)]
    Host(#[from] HostError),
}

pub type Result<T> = std::result::Result<T, BindError>;

/// Binds contracts to a host, one dispatcher each.
pub struct Binder<'h> {
    registry: Registry,
    resolver: Arc<dyn Resolver>,
    options: DispatchOptions,
    host: &'h dyn Host,
    bound: HashSet<ContractId>,
}

impl<'h> Binder<'h> {
    pub fn new(registry: Registry, resolver: Arc<dyn Resolver>, host: &'h dyn Host) -> Self {
        Self {
            registry,
            resolver,
            options: DispatchOptions::default(),
            host,
            bound: HashSet::new(),
        }
    }

    /// Options applied to every dispatcher bound from here on.
    pub fn options(mut self, options: DispatchOptions) -> Self {
        self.options = options;
        self
    }

    /// Creates the dispatcher for `C` and registers it with the host.
    ///
    /// A contract with no registered handlers is still bound; every call to it
    /// falls back to the contract's default behaviour.
    pub fn bind<C: Contract>(&mut self) -> Result<Arc<Dispatcher<C>>> {
        let contract = ContractId::of::<C>();
        if self.bound.contains(&contract) || self.host.has_service(contract) {
            return Err(BindError::AlreadyBound(C::NAME));
        }

        let dispatcher = Arc::new(Dispatcher::<C>::with_options(
            &self.registry,
            Arc::clone(&self.resolver),
            self.options,
        ));

        if dispatcher.is_empty() {
            tracing::warn!(contract = C::NAME, "binding contract with no registered handlers");
        }

        self.host.add_service(dispatcher.clone())?;
        self.bound.insert(contract);

        tracing::info!(contract = C::NAME, handlers = dispatcher.len(), "contract bound");
        Ok(dispatcher)
    }

    /// Contracts bound so far.
    pub fn bound(&self) -> impl Iterator<Item = ContractId> + '_ {
        self.bound.iter().copied()
    }

    /// Whether `contract` has been bound by this binder.
    pub fn is_bound(&self, contract: ContractId) -> bool {
        self.bound.contains(&contract)
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}
