//! Messages and contract of the `greet.Greeter` service.
//!
//! This is what a code generator would emit from the service definition:
//! plain message structs, the method enum, the [`Contract`] description and a
//! typed client-facing trait.

use async_trait::async_trait;

use endpoints::CallContext;
use endpoints::Contract;
use endpoints::Dispatcher;
use endpoints::Invocation;
use endpoints::MethodId;
use endpoints::Status;
use endpoints::TypeInfo;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HelloRequest {
    pub name: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HelloReply {
    pub message: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GoodbyeRequest {
    pub name: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GoodbyeReply {
    pub message: String,
}

/// The `greet.Greeter` service.
pub struct Greeter;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum GreeterMethod {
    SayHello,
    SayGoodbye,
}

impl MethodId for GreeterMethod {
    fn name(self) -> &'static str {
        match self {
            Self::SayHello => "SayHello",
            Self::SayGoodbye => "SayGoodbye",
        }
    }

    fn request_type(self) -> TypeInfo {
        match self {
            Self::SayHello => TypeInfo::of::<HelloRequest>(),
            Self::SayGoodbye => TypeInfo::of::<GoodbyeRequest>(),
        }
    }

    fn response_type(self) -> TypeInfo {
        match self {
            Self::SayHello => TypeInfo::of::<HelloReply>(),
            Self::SayGoodbye => TypeInfo::of::<GoodbyeReply>(),
        }
    }
}

impl Contract for Greeter {
    const NAME: &'static str = "greet.Greeter";
    type Method = GreeterMethod;

    fn methods() -> &'static [GreeterMethod] {
        &[GreeterMethod::SayHello, GreeterMethod::SayGoodbye]
    }
}

/// Typed surface of the Greeter service.
#[async_trait]
pub trait GreeterService: Send + Sync {
    async fn say_hello(&self, request: Invocation<HelloRequest>) -> Result<HelloReply, Status>;

    async fn say_goodbye(&self, request: Invocation<GoodbyeRequest>) -> Result<GoodbyeReply, Status>;
}

#[async_trait]
impl GreeterService for Dispatcher<Greeter> {
    async fn say_hello(&self, request: Invocation<HelloRequest>) -> Result<HelloReply, Status> {
        self.invoke(GreeterMethod::SayHello, request).await
    }

    async fn say_goodbye(&self, request: Invocation<GoodbyeRequest>) -> Result<GoodbyeReply, Status> {
        self.invoke(GreeterMethod::SayGoodbye, request).await
    }
}

/// Shorthand for a call with an empty context.
pub fn hello(name: impl Into<String>) -> Invocation<HelloRequest> {
    Invocation::with_context(HelloRequest { name: name.into() }, CallContext::new())
}

/// Shorthand for a call with an empty context.
pub fn goodbye(name: impl Into<String>) -> Invocation<GoodbyeRequest> {
    Invocation::with_context(GoodbyeRequest { name: name.into() }, CallContext::new())
}
