//! # Handlers
//!
//! A handler is a small unit implementing exactly one contract method. It
//! declares, as static metadata, which contract and method it serves, and
//! exposes a single asynchronous `execute` operation.
//!
//! ```ignore
//! pub struct SayHello;
//!
//! #[async_trait]
//! impl Handler for SayHello {
//!     type Contract = Greeter;
//!     type Request = HelloRequest;
//!     type Response = HelloReply;
//!     const METHOD: GreeterMethod = GreeterMethod::SayHello;
//!
//!     async fn execute(&self, request: HelloRequest, _ctx: &CallContext) -> Result<HelloReply, Status> {
//!         Ok(HelloReply { message: format!("Hello {}", request.name) })
//!     }
//! }
//! ```

use std::any::Any;

use async_trait::async_trait;

use crate::context::CallContext;
use crate::contract::Contract;
use crate::status::Status;

/// A type-erased request or response travelling between host and handler.
pub type Message = Box<dyn Any + Send>;

/// Implementation of a single contract method.
///
/// Instances are created per call by a [`Resolver`](crate::scope::Resolver)
/// and never outlive the call's scope, so handlers may hold per-call state.
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    type Contract: Contract;
    type Request: Send + 'static;
    type Response: Send + 'static;

    /// The contract method this handler serves.
    const METHOD: <Self::Contract as Contract>::Method;

    /// Serves one call.
    ///
    /// The context carries call metadata and the caller's cancellation token.
    /// An `Err` is an application-level failure and reaches the caller unchanged.
    async fn execute(&self, request: Self::Request, context: &CallContext) -> Result<Self::Response, Status>;
}
