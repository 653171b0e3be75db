//! Sample Greeter service built from per-method handlers.

pub mod handlers;
pub mod proto;

use std::sync::Arc;

use endpoints::Container;
use endpoints::Endpoints;
use endpoints::Host;
use endpoints::builder;

use crate::handlers::SayGoodbye;
use crate::handlers::SayHello;
use crate::proto::Greeter;

/// Origin used in greetings when `GREETER_ORIGIN` is unset.
pub const DEFAULT_ORIGIN: &str = "GrpcEndpoints";

/// Process-level settings of the sample.
#[derive(Clone, Debug)]
pub struct Settings {
    pub origin: Arc<str>,
}

impl Settings {
    pub fn from_env() -> Self {
        let origin = std::env::var("GREETER_ORIGIN")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ORIGIN.to_string());
        Self { origin: origin.into() }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self { origin: DEFAULT_ORIGIN.into() }
    }
}

/// The container that builds Greeter handlers, one per call.
pub fn container(settings: &Settings) -> Container {
    let origin = Arc::clone(&settings.origin);
    Container::builder()
        .scoped(move || SayHello::new(Arc::clone(&origin)))
        .scoped(|| SayGoodbye)
        .build()
}

/// Registers the Greeter handlers and binds the contract to `host`.
pub fn serve(container: Container, host: &dyn Host) -> builder::Result<Endpoints> {
    Endpoints::builder()
        .handler::<SayHello>()
        .handler::<SayGoodbye>()
        .contract::<Greeter>()
        .build(Arc::new(container), host)
}
