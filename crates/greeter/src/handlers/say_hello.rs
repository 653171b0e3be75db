use std::sync::Arc;

use async_trait::async_trait;

use endpoints::CallContext;
use endpoints::Handler;
use endpoints::Status;

use crate::proto::Greeter;
use crate::proto::GreeterMethod;
use crate::proto::HelloReply;
use crate::proto::HelloRequest;

/// Greets the caller by name, signed with the configured origin.
pub struct SayHello {
    origin: Arc<str>,
}

impl SayHello {
    pub fn new(origin: Arc<str>) -> Self {
        Self { origin }
    }
}

#[async_trait]
impl Handler for SayHello {
    type Contract = Greeter;
    type Request = HelloRequest;
    type Response = HelloReply;
    const METHOD: GreeterMethod = GreeterMethod::SayHello;

    async fn execute(&self, request: HelloRequest, _ctx: &CallContext) -> Result<HelloReply, Status> {
        if request.name.trim().is_empty() {
            return Err(Status::invalid_argument("name must not be empty"));
        }

        tracing::info!(name = %request.name, "saying hello");
        Ok(HelloReply {
            message: format!("Hello {} from {}!", request.name, self.origin),
        })
    }
}
