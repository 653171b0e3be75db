use async_trait::async_trait;

use endpoints::CallContext;
use endpoints::Handler;
use endpoints::Status;

use crate::proto::GoodbyeReply;
use crate::proto::GoodbyeRequest;
use crate::proto::Greeter;
use crate::proto::GreeterMethod;

pub struct SayGoodbye;

#[async_trait]
impl Handler for SayGoodbye {
    type Contract = Greeter;
    type Request = GoodbyeRequest;
    type Response = GoodbyeReply;
    const METHOD: GreeterMethod = GreeterMethod::SayGoodbye;

    async fn execute(&self, request: GoodbyeRequest, _ctx: &CallContext) -> Result<GoodbyeReply, Status> {
        tracing::info!(name = %request.name, "saying goodbye");
        Ok(GoodbyeReply {
            message: format!("Goodbye {}, hope to see you again soon!", request.name),
        })
    }
}
