//! # Handler descriptors
//!
//! A [`HandlerDescriptor`] is the metadata record binding a handler type to a
//! contract method. It is extracted statically from the handler's associated
//! items; discovery is an explicit list of handler types (see [`handlers!`]).
//!
//! The descriptor also owns the monomorphized glue that turns an erased
//! instance and request back into the concrete handler call.

use std::any::type_name;
use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::context::CallContext;
use crate::contract::Contract;
use crate::contract::ContractId;
use crate::contract::ContractSchema;
use crate::contract::MethodId;
use crate::contract::TypeInfo;
use crate::handler::Handler;
use crate::handler::Message;
use crate::scope::Instance;
use crate::status::Status;

/// Failure of the erased call glue.
#[derive(Debug)]
pub(crate) enum InvokeError {
    /// The handler ran and returned an application failure.
    Handler(Status),
    /// The resolver produced an instance of another type.
    InstanceMismatch { expected: &'static str },
    /// The request was not of the handler's request type.
    RequestMismatch { expected: &'static str },
}

type Invoker = fn(Instance, Message, CallContext) -> BoxFuture<'static, Result<Message, InvokeError>>;

/// Metadata binding a handler implementation to one contract method.
#[derive(Clone)]
pub struct HandlerDescriptor {
    contract: ContractId,
    method: &'static str,
    handler: TypeInfo,
    request: TypeInfo,
    response: TypeInfo,
    schema: fn() -> ContractSchema,
    invoker: Invoker,
}

impl HandlerDescriptor {
    /// Extracts the descriptor of handler type `H`.
    pub fn of<H: Handler>() -> Self {
        Self {
            contract: ContractId::of::<H::Contract>(),
            method: H::METHOD.name(),
            handler: TypeInfo::of::<H>(),
            request: TypeInfo::of::<H::Request>(),
            response: TypeInfo::of::<H::Response>(),
            schema: <H::Contract as Contract>::schema,
            invoker: invoke::<H>,
        }
    }

    pub fn contract(&self) -> ContractId {
        self.contract
    }

    pub fn method(&self) -> &'static str {
        self.method
    }

    /// Identity the resolver uses to construct an instance.
    pub fn handler(&self) -> &TypeInfo {
        &self.handler
    }

    pub fn request_type(&self) -> &TypeInfo {
        &self.request
    }

    pub fn response_type(&self) -> &TypeInfo {
        &self.response
    }

    /// The declared method set of the contract this handler serves.
    pub fn contract_schema(&self) -> ContractSchema {
        (self.schema)()
    }

    pub(crate) fn invoke(
        &self,
        instance: Instance,
        request: Message,
        context: CallContext,
    ) -> BoxFuture<'static, Result<Message, InvokeError>> {
        (self.invoker)(instance, request, context)
    }
}

impl fmt::Debug for HandlerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerDescriptor")
            .field("contract", &self.contract.name())
            .field("method", &self.method)
            .field("handler", &self.handler.name())
            .field("request", &self.request.name())
            .field("response", &self.response.name())
            .finish()
    }
}

fn invoke<H: Handler>(
    instance: Instance,
    request: Message,
    context: CallContext,
) -> BoxFuture<'static, Result<Message, InvokeError>> {
    Box::pin(async move {
        let handler: Arc<H> = instance
            .downcast::<H>()
            .map_err(|_| InvokeError::InstanceMismatch { expected: type_name::<H>() })?;

        let request = request
            .downcast::<H::Request>()
            .map_err(|_| InvokeError::RequestMismatch { expected: type_name::<H::Request>() })?;

        let response = handler
            .execute(*request, &context)
            .await
            .map_err(InvokeError::Handler)?;

        Ok(Box::new(response) as Message)
    })
}

/// Builds the descriptor list for a set of handler types.
///
/// ```ignore
/// let registry = Registry::build(handlers![SayHello, SayGoodbye])?;
/// ```
#[macro_export]
macro_rules! handlers {
    ($($handler:ty),* $(,)?) => {
        vec![$($crate::HandlerDescriptor::of::<$handler>()),*]
    };
}
