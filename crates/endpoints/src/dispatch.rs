//! # Dispatcher
//!
//! One [`Dispatcher`] serves one contract. It holds that contract's slice of the
//! [`Registry`] and a [`Resolver`], and runs every call through the same steps:
//!
//! 1. Look the method up. Unbound methods fall back to the contract's default.
//! 2. Open a scope and resolve the handler instance inside it.
//! 3. Run the handler and hand its result back unchanged.
//! 4. Close the scope, on every exit path.
//!
//! The dispatcher is stateless across calls and safe to share between tasks.
//! It never aborts a handler; cancellation reaches handlers through the
//! [`CallContext`] and is observed cooperatively.

use std::any::Any;
use std::any::TypeId;
use std::any::type_name;
use std::marker::PhantomData;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tracing::Instrument;

use crate::context::CallContext;
use crate::context::Invocation;
use crate::contract::Contract;
use crate::contract::ContractId;
use crate::contract::MethodId;
use crate::descriptor::HandlerDescriptor;
use crate::descriptor::InvokeError;
use crate::handler::Message;
use crate::registry::ContractTable;
use crate::registry::Registry;
use crate::scope::ResolveError;
use crate::scope::Resolver;
use crate::scope::ScopeGuard;
use crate::status::Status;

/// Why a call ended in the contract's fallback.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FallbackReason {
    /// No handler is registered for the method.
    Unbound,
    /// A handler is registered but the resolver produced no instance.
    ResolutionMiss,
}

/// How a call that did not fail ended.
#[derive(Debug)]
pub enum Outcome<T> {
    /// The handler ran and produced a response.
    Completed(T),
    /// The contract's default behaviour applies.
    Fallback(FallbackReason),
}

impl<T> Outcome<T> {
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback(_))
    }
}

/// A call that failed.
///
/// [`DispatchError::Handler`] is the handler's own failure and belongs to the
/// caller. Every other variant is an internal failure of the dispatch path.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    #[error("handler failed: {0}")]
    Handler(Status),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error("resolver produced no instance of {handler}")]
    Unresolved { handler: &'static str },
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
    #[error("handler {handler} panicked: {message}")]
    Panicked { handler: &'static str, message: String },
    #[error("resolver panicked while {stage}: {message}")]
    ResolverPanicked { stage: ResolveStage, message: String },
}

pub type Result<T> = std::result::Result<T, DispatchError>;

/// The resolver step a [`DispatchError::ResolverPanicked`] happened in.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ResolveStage {
    OpenScope,
    Resolve,
}

impl std::fmt::Display for ResolveStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OpenScope => f.write_str("opening a scope"),
            Self::Resolve => f.write_str("resolving a handler"),
        }
    }
}

impl DispatchError {
    /// True for failures of the dispatch machinery rather than the handler.
    pub fn is_internal(&self) -> bool {
        !matches!(self, Self::Handler(_))
    }

    /// The status a caller should observe for this failure.
    pub fn into_status(self) -> Status {
        match self {
            Self::Handler(status) => status,
            internal => Status::internal(internal.to_string()),
        }
    }
}

impl From<DispatchError> for Status {
    fn from(e: DispatchError) -> Self {
        e.into_status()
    }
}

/// What to do when a registered handler cannot be resolved.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum MissPolicy {
    /// Treat the miss like an unbound method.
    #[default]
    Fallback,
    /// Fail the call with [`DispatchError::Unresolved`].
    Error,
}

/// Per-dispatcher settings.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct DispatchOptions {
    pub on_resolution_miss: MissPolicy,
}

impl DispatchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_resolution_miss(mut self, policy: MissPolicy) -> Self {
        self.on_resolution_miss = policy;
        self
    }
}

/// Runtime implementation of contract `C`, backed by registered handlers.
pub struct Dispatcher<C: Contract> {
    handlers: Arc<ContractTable>,
    resolver: Arc<dyn Resolver>,
    options: DispatchOptions,
    _contract: PhantomData<fn() -> C>,
}

impl<C: Contract> Clone for Dispatcher<C> {
    fn clone(&self) -> Self {
        Self {
            handlers: Arc::clone(&self.handlers),
            resolver: Arc::clone(&self.resolver),
            options: self.options,
            _contract: PhantomData,
        }
    }
}

impl<C: Contract> std::fmt::Debug for Dispatcher<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut methods: Vec<_> = self.handlers.keys().copied().collect();
        methods.sort_unstable();
        f.debug_struct("Dispatcher")
            .field("contract", &C::NAME)
            .field("methods", &methods)
            .field("options", &self.options)
            .finish()
    }
}

impl<C: Contract> Dispatcher<C> {
    pub fn new(registry: &Registry, resolver: Arc<dyn Resolver>) -> Self {
        Self::with_options(registry, resolver, DispatchOptions::default())
    }

    pub fn with_options(registry: &Registry, resolver: Arc<dyn Resolver>, options: DispatchOptions) -> Self {
        Self {
            handlers: registry.table(ContractId::of::<C>()),
            resolver,
            options,
            _contract: PhantomData,
        }
    }

    pub fn contract(&self) -> ContractId {
        ContractId::of::<C>()
    }

    pub fn options(&self) -> DispatchOptions {
        self.options
    }

    pub fn is_bound(&self, method: C::Method) -> bool {
        self.handlers.contains_key(method.name())
    }

    pub fn handler(&self, method: C::Method) -> Option<&HandlerDescriptor> {
        self.handlers.get(method.name()).map(|d| d.as_ref())
    }

    /// Number of bound methods.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Dispatches an already type-erased request.
    pub async fn dispatch_erased(
        &self,
        method: C::Method,
        request: Message,
        context: CallContext,
    ) -> Result<Outcome<Message>> {
        let span = tracing::debug_span!("dispatch", contract = C::NAME, method = method.name());
        self.run(method, request, context).instrument(span).await
    }

    /// Dispatches a typed request, checking it against the method's signature.
    pub async fn dispatch<Req, Resp>(&self, method: C::Method, invocation: Invocation<Req>) -> Result<Outcome<Resp>>
    where
        Req: Send + 'static,
        Resp: Send + 'static,
    {
        check_type::<Req>(method.request_type().id(), method.request_type().name())?;
        check_type::<Resp>(method.response_type().id(), method.response_type().name())?;

        let (request, context) = invocation.into_parts();
        match self.dispatch_erased(method, Box::new(request), context).await? {
            Outcome::Completed(response) => {
                let response = response.downcast::<Resp>().map_err(|_| DispatchError::TypeMismatch {
                    expected: type_name::<Resp>(),
                    found: "a response of another type",
                })?;
                Ok(Outcome::Completed(*response))
            }
            Outcome::Fallback(reason) => Ok(Outcome::Fallback(reason)),
        }
    }

    /// Serves one call the way a host observes it: fallbacks become the
    /// contract's default status, internal failures become `internal`.
    pub async fn invoke<Req, Resp>(&self, method: C::Method, invocation: Invocation<Req>) -> std::result::Result<Resp, Status>
    where
        Req: Send + 'static,
        Resp: Send + 'static,
    {
        let outcome = self.dispatch(method, invocation).await;
        surface::<C, Resp>(method, outcome)
    }

    async fn run(&self, method: C::Method, request: Message, context: CallContext) -> Result<Outcome<Message>> {
        let Some(descriptor) = self.handlers.get(method.name()) else {
            tracing::debug!("method not bound, using contract fallback");
            return Ok(Outcome::Fallback(FallbackReason::Unbound));
        };
        let handler = descriptor.handler().name();

        let opened = std::panic::catch_unwind(AssertUnwindSafe(|| ScopeGuard::open(self.resolver.as_ref())));
        // dropped on every exit path below, including the caller dropping this future
        let mut scope = match opened {
            Ok(scope) => scope?,
            Err(payload) => {
                return Err(DispatchError::ResolverPanicked {
                    stage: ResolveStage::OpenScope,
                    message: panic_message(payload.as_ref()),
                });
            }
        };

        let resolved = std::panic::catch_unwind(AssertUnwindSafe(|| scope.resolve(descriptor.handler())));
        let instance = match resolved {
            Ok(Ok(Some(instance))) => instance,
            Ok(Ok(None)) => match self.options.on_resolution_miss {
                MissPolicy::Fallback => {
                    tracing::warn!(handler, reason = "resolution-miss", "resolver produced no instance, using contract fallback");
                    return Ok(Outcome::Fallback(FallbackReason::ResolutionMiss));
                }
                MissPolicy::Error => return Err(DispatchError::Unresolved { handler }),
            },
            Ok(Err(e)) => return Err(e.into()),
            Err(payload) => {
                return Err(DispatchError::ResolverPanicked {
                    stage: ResolveStage::Resolve,
                    message: panic_message(payload.as_ref()),
                });
            }
        };

        let result = AssertUnwindSafe(descriptor.invoke(instance, request, context))
            .catch_unwind()
            .await;
        drop(scope);

        match result {
            Ok(Ok(response)) => Ok(Outcome::Completed(response)),
            Ok(Err(InvokeError::Handler(status))) => Err(DispatchError::Handler(status)),
            Ok(Err(InvokeError::InstanceMismatch { expected })) => Err(DispatchError::TypeMismatch {
                expected,
                found: "a resolved instance of another type",
            }),
            Ok(Err(InvokeError::RequestMismatch { expected })) => Err(DispatchError::TypeMismatch {
                expected,
                found: "a request of another type",
            }),
            Err(payload) => Err(DispatchError::Panicked {
                handler,
                message: panic_message(payload.as_ref()),
            }),
        }
    }
}

fn check_type<T: 'static>(expected: TypeId, expected_name: &'static str) -> Result<()> {
    if TypeId::of::<T>() == expected {
        Ok(())
    } else {
        Err(DispatchError::TypeMismatch {
            expected: expected_name,
            found: type_name::<T>(),
        })
    }
}

/// Maps a dispatch result to what the host hands back to the caller.
pub(crate) fn surface<C: Contract, T>(method: C::Method, result: Result<Outcome<T>>) -> std::result::Result<T, Status> {
    match result {
        Ok(Outcome::Completed(response)) => Ok(response),
        Ok(Outcome::Fallback(_)) => Err(C::fallback(method)),
        Err(DispatchError::Handler(status)) => Err(status),
        Err(internal) => {
            tracing::error!(
                contract = C::NAME,
                method = method.name(),
                error = %internal,
                "dispatch failed"
            );
            Err(internal.into_status())
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
