//! # RPC host surface
//!
//! The RPC framework only sees [`Service`]s: one per contract, addressed by
//! contract name and method name, exchanging type-erased messages. Every
//! [`Dispatcher`] is a `Service`, so binding a contract is a matter of handing
//! its dispatcher to a [`Host`].
//!
//! [`Server`] is an in-process host. It routes `(service, method, message)`
//! calls to registered services concurrently and answers `unimplemented` for
//! anything it does not know.

use std::any::type_name;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::context::CallContext;
use crate::context::Invocation;
use crate::contract::Contract;
use crate::contract::ContractId;
use crate::dispatch::Dispatcher;
use crate::dispatch::surface;
use crate::handler::Message;
use crate::status::Status;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    #[error("a service is already registered for contract '{0}'")]
    AlreadyRegistered(&'static str),
}

pub type Result<T> = std::result::Result<T, HostError>;

/// A contract implementation as the RPC host sees it.
#[async_trait]
pub trait Service: Send + Sync + 'static {
    fn contract(&self) -> ContractId;

    /// Serves one call to the method named `method`.
    async fn call(&self, method: &str, request: Message, context: CallContext) -> std::result::Result<Message, Status>;
}

#[async_trait]
impl<C: Contract> Service for Dispatcher<C> {
    fn contract(&self) -> ContractId {
        ContractId::of::<C>()
    }

    async fn call(&self, name: &str, request: Message, context: CallContext) -> std::result::Result<Message, Status> {
        let Some(method) = C::method(name) else {
            return Err(Status::unimplemented(format!("method '{}/{name}' is not declared", C::NAME)));
        };

        let outcome = self.dispatch_erased(method, request, context).await;
        surface::<C, Message>(method, outcome)
    }
}

/// Where bound contracts are registered.
pub trait Host {
    fn add_service(&self, service: Arc<dyn Service>) -> Result<()>;

    fn has_service(&self, contract: ContractId) -> bool;
}

/// In-process RPC host keyed by contract name.
#[derive(Default)]
pub struct Server {
    services: DashMap<&'static str, Arc<dyn Service>>,
}

impl Server {
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes one erased call.
    pub async fn call(
        &self,
        service: &str,
        method: &str,
        request: Message,
        context: CallContext,
    ) -> std::result::Result<Message, Status> {
        // clone out so no map guard is held across the await
        let target = self.services.get(service).map(|s| Arc::clone(s.value()));
        let Some(target) = target else {
            tracing::debug!(service, method, "call to unknown service");
            return Err(Status::unimplemented(format!("unknown service '{service}'")));
        };

        target.call(method, request, context).await
    }

    /// Routes one typed call, the way a client stub would.
    pub async fn call_typed<Req, Resp>(
        &self,
        service: &str,
        method: &str,
        invocation: Invocation<Req>,
    ) -> std::result::Result<Resp, Status>
    where
        Req: Send + 'static,
        Resp: Send + 'static,
    {
        let (request, context) = invocation.into_parts();
        let response = self.call(service, method, Box::new(request), context).await?;
        response
            .downcast::<Resp>()
            .map(|r| *r)
            .map_err(|_| Status::internal(format!("response of '{service}/{method}' is not a {}", type_name::<Resp>())))
    }

    /// Names of the registered services, sorted.
    pub fn services(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.services.iter().map(|e| *e.key()).collect();
        names.sort_unstable();
        names
    }
}

impl Host for Server {
    fn add_service(&self, service: Arc<dyn Service>) -> Result<()> {
        let contract = service.contract();
        match self.services.entry(contract.name()) {
            Entry::Occupied(_) => Err(HostError::AlreadyRegistered(contract.name())),
            Entry::Vacant(slot) => {
                slot.insert(service);
                tracing::debug!(service = contract.name(), "service registered");
                Ok(())
            }
        }
    }

    fn has_service(&self, contract: ContractId) -> bool {
        self.services
            .get(contract.name())
            .is_some_and(|s| s.contract() == contract)
    }
}
