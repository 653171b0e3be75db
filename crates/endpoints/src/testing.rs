//! Contracts, handlers and a counting resolver for the test suite.
//!
//! These are used internally by the tests and are not part of the public API.

use std::any::Any;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use async_trait::async_trait;

use crate::context::CallContext;
use crate::contract::Contract;
use crate::contract::MethodId;
use crate::contract::TypeInfo;
use crate::handler::Handler;
use crate::scope;
use crate::scope::Instance;
use crate::scope::ResolveError;
use crate::scope::Resolver;
use crate::scope::Scope;
use crate::status::Status;

// --- Contracts ---

pub(crate) struct Calc;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) enum CalcMethod {
    Add,
    Negate,
    Fail,
    Wait,
    Explode,
    Identify,
    /// Present on the enum but not declared by the contract.
    Reset,
}

impl MethodId for CalcMethod {
    fn name(self) -> &'static str {
        match self {
            Self::Add => "Add",
            Self::Negate => "Negate",
            Self::Fail => "Fail",
            Self::Wait => "Wait",
            Self::Explode => "Explode",
            Self::Identify => "Identify",
            Self::Reset => "Reset",
        }
    }

    fn request_type(self) -> TypeInfo {
        match self {
            Self::Add => TypeInfo::of::<(i64, i64)>(),
            Self::Negate => TypeInfo::of::<i64>(),
            Self::Fail => TypeInfo::of::<String>(),
            Self::Wait | Self::Explode | Self::Identify | Self::Reset => TypeInfo::of::<()>(),
        }
    }

    fn response_type(self) -> TypeInfo {
        match self {
            Self::Add | Self::Negate | Self::Fail => TypeInfo::of::<i64>(),
            Self::Identify => TypeInfo::of::<usize>(),
            Self::Wait | Self::Explode | Self::Reset => TypeInfo::of::<()>(),
        }
    }
}

impl Contract for Calc {
    const NAME: &'static str = "test.Calc";
    type Method = CalcMethod;

    fn methods() -> &'static [CalcMethod] {
        &[
            CalcMethod::Add,
            CalcMethod::Negate,
            CalcMethod::Fail,
            CalcMethod::Wait,
            CalcMethod::Explode,
            CalcMethod::Identify,
        ]
    }
}

pub(crate) struct EchoService;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) enum EchoMethod {
    Echo,
}

impl MethodId for EchoMethod {
    fn name(self) -> &'static str {
        "Echo"
    }

    fn request_type(self) -> TypeInfo {
        TypeInfo::of::<String>()
    }

    fn response_type(self) -> TypeInfo {
        TypeInfo::of::<String>()
    }
}

impl Contract for EchoService {
    const NAME: &'static str = "test.Echo";
    type Method = EchoMethod;

    fn methods() -> &'static [EchoMethod] {
        &[EchoMethod::Echo]
    }
}

// --- Handlers ---

pub(crate) struct Add;

#[async_trait]
impl Handler for Add {
    type Contract = Calc;
    type Request = (i64, i64);
    type Response = i64;
    const METHOD: CalcMethod = CalcMethod::Add;

    async fn execute(&self, request: (i64, i64), _ctx: &CallContext) -> Result<i64, Status> {
        let (a, b) = request;
        Ok(a + b)
    }
}

/// Claims the same method as [`Add`].
pub(crate) struct AddTwice;

#[async_trait]
impl Handler for AddTwice {
    type Contract = Calc;
    type Request = (i64, i64);
    type Response = i64;
    const METHOD: CalcMethod = CalcMethod::Add;

    async fn execute(&self, request: (i64, i64), _ctx: &CallContext) -> Result<i64, Status> {
        let (a, b) = request;
        Ok(2 * (a + b))
    }
}

pub(crate) struct Negate;

#[async_trait]
impl Handler for Negate {
    type Contract = Calc;
    type Request = i64;
    type Response = i64;
    const METHOD: CalcMethod = CalcMethod::Negate;

    async fn execute(&self, n: i64, _ctx: &CallContext) -> Result<i64, Status> {
        Ok(-n)
    }
}

pub(crate) struct Fail;

#[async_trait]
impl Handler for Fail {
    type Contract = Calc;
    type Request = String;
    type Response = i64;
    const METHOD: CalcMethod = CalcMethod::Fail;

    async fn execute(&self, reason: String, _ctx: &CallContext) -> Result<i64, Status> {
        Err(Status::failed_precondition(reason))
    }
}

/// Blocks until the caller cancels.
pub(crate) struct Wait;

#[async_trait]
impl Handler for Wait {
    type Contract = Calc;
    type Request = ();
    type Response = ();
    const METHOD: CalcMethod = CalcMethod::Wait;

    async fn execute(&self, _request: (), ctx: &CallContext) -> Result<(), Status> {
        ctx.cancellation().cancelled().await;
        Err(Status::cancelled("caller went away"))
    }
}

pub(crate) struct Explode;

#[async_trait]
impl Handler for Explode {
    type Contract = Calc;
    type Request = ();
    type Response = ();
    const METHOD: CalcMethod = CalcMethod::Explode;

    async fn execute(&self, _request: (), _ctx: &CallContext) -> Result<(), Status> {
        panic!("handler exploded");
    }
}

/// Reports the id it was constructed with.
pub(crate) struct Identify {
    pub id: usize,
}

#[async_trait]
impl Handler for Identify {
    type Contract = Calc;
    type Request = ();
    type Response = usize;
    const METHOD: CalcMethod = CalcMethod::Identify;

    async fn execute(&self, _request: (), _ctx: &CallContext) -> Result<usize, Status> {
        tokio::task::yield_now().await;
        Ok(self.id)
    }
}

/// Serves a method the contract does not declare.
pub(crate) struct Orphan;

#[async_trait]
impl Handler for Orphan {
    type Contract = Calc;
    type Request = ();
    type Response = ();
    const METHOD: CalcMethod = CalcMethod::Reset;

    async fn execute(&self, _request: (), _ctx: &CallContext) -> Result<(), Status> {
        Ok(())
    }
}

/// Declares a response type that differs from the contract's.
pub(crate) struct WrongReply;

#[async_trait]
impl Handler for WrongReply {
    type Contract = Calc;
    type Request = (i64, i64);
    type Response = String;
    const METHOD: CalcMethod = CalcMethod::Add;

    async fn execute(&self, request: (i64, i64), _ctx: &CallContext) -> Result<String, Status> {
        let (a, b) = request;
        Ok((a + b).to_string())
    }
}

pub(crate) struct Echo;

#[async_trait]
impl Handler for Echo {
    type Contract = EchoService;
    type Request = String;
    type Response = String;
    const METHOD: EchoMethod = EchoMethod::Echo;

    async fn execute(&self, s: String, _ctx: &CallContext) -> Result<String, Status> {
        Ok(s)
    }
}

// --- Resolver double ---

type Provider = Arc<dyn Fn() -> Instance + Send + Sync>;

#[derive(Default)]
struct Counters {
    opened: AtomicUsize,
    closed: AtomicUsize,
    resolved: AtomicUsize,
}

/// Resolver that builds a fresh instance per resolve and counts scope traffic.
///
/// Clones share their counters.
#[derive(Clone, Default)]
pub(crate) struct CountingResolver {
    providers: HashMap<TypeId, Provider>,
    counters: Arc<Counters>,
    fail_open: bool,
    panic_on_open: bool,
    panic_on_resolve: bool,
}

impl CountingResolver {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn provide<H: Any + Send + Sync>(mut self, f: impl Fn() -> H + Send + Sync + 'static) -> Self {
        let provider: Provider = Arc::new(move || Arc::new(f()) as Instance);
        self.providers.insert(TypeId::of::<H>(), provider);
        self
    }

    /// Every `open_scope` fails, as if the container were unavailable.
    pub(crate) fn failing_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    /// Every `open_scope` panics.
    pub(crate) fn panicking_open(mut self) -> Self {
        self.panic_on_open = true;
        self
    }

    /// Every `resolve` panics after the scope was opened.
    pub(crate) fn panicking_resolve(mut self) -> Self {
        self.panic_on_resolve = true;
        self
    }

    pub(crate) fn opened(&self) -> usize {
        self.counters.opened.load(Ordering::SeqCst)
    }

    pub(crate) fn closed(&self) -> usize {
        self.counters.closed.load(Ordering::SeqCst)
    }

    pub(crate) fn resolved(&self) -> usize {
        self.counters.resolved.load(Ordering::SeqCst)
    }
}

impl Resolver for CountingResolver {
    fn open_scope(&self) -> scope::Result<Box<dyn Scope>> {
        if self.fail_open {
            return Err(ResolveError::Scope("resolver offline".into()));
        }
        if self.panic_on_open {
            panic!("container poisoned");
        }
        self.counters.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(CountingScope {
            providers: self.providers.clone(),
            counters: Arc::clone(&self.counters),
            panic_on_resolve: self.panic_on_resolve,
        }))
    }
}

struct CountingScope {
    providers: HashMap<TypeId, Provider>,
    counters: Arc<Counters>,
    panic_on_resolve: bool,
}

impl Scope for CountingScope {
    fn resolve(&mut self, handler: &TypeInfo) -> scope::Result<Option<Instance>> {
        if self.panic_on_resolve {
            panic!("factory for {handler} panicked");
        }
        let Some(provider) = self.providers.get(&handler.id()) else {
            return Ok(None);
        };
        self.counters.resolved.fetch_add(1, Ordering::SeqCst);
        Ok(Some(provider()))
    }

    fn close(self: Box<Self>) {
        self.counters.closed.fetch_add(1, Ordering::SeqCst);
    }
}
