//! End-to-end tests across registry, container, binder and host.

use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use async_trait::async_trait;

use crate::builder::Endpoints;
use crate::container::Container;
use crate::container::ScopeStats;
use crate::context::CallContext;
use crate::context::Invocation;
use crate::contract::Contract;
use crate::contract::MethodId;
use crate::contract::TypeInfo;
use crate::dispatch::DispatchOptions;
use crate::dispatch::MissPolicy;
use crate::handler::Handler;
use crate::host::Server;
use crate::status::Code;
use crate::status::Status;
use crate::testing::Add;
use crate::testing::Calc;
use crate::testing::Echo;
use crate::testing::EchoService;
use crate::testing::Explode;
use crate::testing::Fail;
use crate::testing::Identify;

/// Contract whose handler reads call metadata.
struct Session;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
enum SessionMethod {
    Whoami,
}

impl MethodId for SessionMethod {
    fn name(self) -> &'static str {
        "Whoami"
    }

    fn request_type(self) -> TypeInfo {
        TypeInfo::of::<()>()
    }

    fn response_type(self) -> TypeInfo {
        TypeInfo::of::<String>()
    }
}

impl Contract for Session {
    const NAME: &'static str = "test.Session";
    type Method = SessionMethod;

    fn methods() -> &'static [SessionMethod] {
        &[SessionMethod::Whoami]
    }
}

struct Whoami;

#[async_trait]
impl Handler for Whoami {
    type Contract = Session;
    type Request = ();
    type Response = String;
    const METHOD: SessionMethod = SessionMethod::Whoami;

    async fn execute(&self, _request: (), ctx: &CallContext) -> Result<String, Status> {
        ctx.metadata()
            .get("user")
            .map(str::to_string)
            .ok_or_else(|| Status::invalid_argument("missing 'user' metadata"))
    }
}

fn container() -> Container {
    let next = Arc::new(AtomicUsize::new(0));
    Container::builder()
        .scoped(|| Add)
        .scoped(|| Fail)
        .scoped(|| Explode)
        .scoped(|| Echo)
        .scoped(|| Whoami)
        .scoped(move || Identify { id: next.fetch_add(1, Ordering::SeqCst) })
        .build()
}

fn serve(container: &Container, server: &Server) -> Endpoints {
    Endpoints::builder()
        .handlers(crate::handlers![Add, Fail, Explode, Identify, Echo, Whoami])
        .contract::<Calc>()
        .contract::<EchoService>()
        .contract::<Session>()
        .build(Arc::new(container.clone()), server)
        .unwrap()
}

#[tokio::test]
async fn test_calls_through_host_use_container_scopes() {
    let container = container();
    let server = Server::new();
    serve(&container, &server);

    let sum: i64 = server
        .call_typed("test.Calc", "Add", Invocation::new((20i64, 22i64)))
        .await
        .unwrap();
    let echoed: String = server
        .call_typed("test.Echo", "Echo", Invocation::new("ping".to_string()))
        .await
        .unwrap();

    assert_eq!(sum, 42);
    assert_eq!(echoed, "ping");
    assert_eq!(container.stats(), ScopeStats { opened: 2, closed: 2 });
}

#[tokio::test]
async fn test_metadata_reaches_handler() {
    let container = container();
    let server = Server::new();
    serve(&container, &server);

    let ctx = CallContext::builder().metadata("user", "ada").build();
    let who: String = server
        .call_typed("test.Session", "Whoami", Invocation::with_context((), ctx))
        .await
        .unwrap();
    assert_eq!(who, "ada");

    let err = server
        .call_typed::<(), String>("test.Session", "Whoami", Invocation::new(()))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::InvalidArgument);
}

#[tokio::test]
async fn test_failures_keep_their_kind_at_the_host() {
    let container = container();
    let server = Server::new();
    serve(&container, &server);

    let app = server
        .call_typed::<String, i64>("test.Calc", "Fail", Invocation::new("nope".into()))
        .await
        .unwrap_err();
    assert_eq!(app, Status::failed_precondition("nope"));

    let internal = server
        .call_typed::<(), ()>("test.Calc", "Explode", Invocation::new(()))
        .await
        .unwrap_err();
    assert_eq!(internal.code(), Code::Internal);

    let unbound = server
        .call_typed::<i64, i64>("test.Calc", "Negate", Invocation::new(3))
        .await
        .unwrap_err();
    assert_eq!(unbound.code(), Code::Unimplemented);

    // failure paths close their scopes too; the unbound call never opened one
    assert_eq!(container.stats(), ScopeStats { opened: 2, closed: 2 });
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_container_builds_fresh_instance_per_call() {
    let container = container();
    let server = Arc::new(Server::new());
    serve(&container, &server);

    let mut calls = Vec::new();
    for _ in 0..32 {
        let server = Arc::clone(&server);
        calls.push(tokio::spawn(async move {
            server
                .call_typed::<(), usize>("test.Calc", "Identify", Invocation::new(()))
                .await
        }));
    }

    let mut ids = Vec::new();
    for call in calls {
        ids.push(call.await.unwrap().unwrap());
    }
    ids.sort_unstable();
    assert_eq!(ids, (0..32).collect::<Vec<_>>());
    assert_eq!(container.stats().active(), 0);
}

#[tokio::test]
async fn test_strict_policy_surfaces_missing_registration() {
    // Add is served by the registry but the container cannot build it
    let container = Container::builder().build();
    let server = Server::new();

    Endpoints::builder()
        .handler::<Add>()
        .contract::<Calc>()
        .options(DispatchOptions::new().on_resolution_miss(MissPolicy::Error))
        .build(Arc::new(container.clone()), &server)
        .unwrap();

    let err = server
        .call_typed::<(i64, i64), i64>("test.Calc", "Add", Invocation::new((1, 1)))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::Internal);
    assert_eq!(container.stats(), ScopeStats { opened: 1, closed: 1 });
}

#[tokio::test]
async fn test_failing_factory_is_internal() {
    let container = Container::builder()
        .try_scoped::<Add, _>(|| Err("no connection".into()))
        .build();
    let server = Server::new();

    let endpoints = Endpoints::builder()
        .handler::<Add>()
        .contract::<Calc>()
        .build(Arc::new(container.clone()), &server)
        .unwrap();

    let calc = endpoints.dispatcher::<Calc>().unwrap();
    let err = calc
        .dispatch::<(i64, i64), i64>(crate::testing::CalcMethod::Add, Invocation::new((1, 1)))
        .await
        .unwrap_err();
    assert!(err.is_internal());
    assert!(err.to_string().contains("no connection"));
    assert_eq!(container.stats().active(), 0);
}
