//! # Scoped handler container
//!
//! A small dependency container implementing [`Resolver`]. Handler types are
//! registered with a factory closure at startup; each scope then constructs at
//! most one instance per handler type and drops them all when it closes.
//!
//! Factories capture whatever shared dependencies the handler needs
//! (configuration, clients, pools), so handlers stay plain structs.

use std::any::Any;
use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use crate::contract::TypeInfo;
use crate::scope::Instance;
use crate::scope::ResolveError;
use crate::scope::Resolver;
use crate::scope::Result;
use crate::scope::Scope;

type Factory = Arc<dyn Fn() -> Result<Instance> + Send + Sync>;

/// Opened/closed scope counts of a [`Container`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ScopeStats {
    pub opened: u64,
    pub closed: u64,
}

impl ScopeStats {
    /// Scopes currently open.
    pub fn active(&self) -> u64 {
        self.opened.saturating_sub(self.closed)
    }
}

struct Inner {
    factories: HashMap<TypeId, Factory>,
    next_scope: AtomicU64,
    closed: AtomicU64,
}

/// Resolver that constructs handlers from registered factories.
///
/// Cheap to clone; clones share factories and statistics.
#[derive(Clone)]
pub struct Container {
    inner: Arc<Inner>,
}

impl Container {
    pub fn builder() -> ContainerBuilder {
        ContainerBuilder::new()
    }

    pub fn contains(&self, handler: &TypeInfo) -> bool {
        self.inner.factories.contains_key(&handler.id())
    }

    pub fn stats(&self) -> ScopeStats {
        ScopeStats {
            opened: self.inner.next_scope.load(Ordering::Acquire),
            closed: self.inner.closed.load(Ordering::Acquire),
        }
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("factories", &self.inner.factories.len())
            .field("stats", &self.stats())
            .finish()
    }
}

impl Resolver for Container {
    fn open_scope(&self) -> Result<Box<dyn Scope>> {
        let id = self.inner.next_scope.fetch_add(1, Ordering::AcqRel) + 1;
        tracing::trace!(scope = id, "scope opened");
        Ok(Box::new(ContainerScope {
            id,
            container: Arc::clone(&self.inner),
            instances: HashMap::new(),
        }))
    }
}

/// One call's worth of handler instances.
struct ContainerScope {
    id: u64,
    container: Arc<Inner>,
    instances: HashMap<TypeId, Instance>,
}

impl Scope for ContainerScope {
    fn resolve(&mut self, handler: &TypeInfo) -> Result<Option<Instance>> {
        if let Some(instance) = self.instances.get(&handler.id()) {
            return Ok(Some(Arc::clone(instance)));
        }

        let Some(factory) = self.container.factories.get(&handler.id()) else {
            return Ok(None);
        };

        let instance = factory()?;
        self.instances.insert(handler.id(), Arc::clone(&instance));
        Ok(Some(instance))
    }

    fn close(self: Box<Self>) {
        let ContainerScope { id, container, instances } = *self;
        let released = instances.len();
        drop(instances);
        container.closed.fetch_add(1, Ordering::AcqRel);
        tracing::trace!(scope = id, released, "scope closed");
    }
}

/// Registers handler factories before freezing them into a [`Container`].
#[derive(Default)]
pub struct ContainerBuilder {
    factories: HashMap<TypeId, Factory>,
}

impl ContainerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `T` as scoped: one new instance per scope that asks for it.
    pub fn scoped<T, F>(self, factory: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.try_scoped(move || Ok(factory()))
    }

    /// Registers a fallible factory; its error surfaces as a dispatch failure.
    pub fn try_scoped<T, F>(mut self, factory: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn() -> std::result::Result<T, String> + Send + Sync + 'static,
    {
        let handler = std::any::type_name::<T>();
        let factory: Factory = Arc::new(move || {
            factory()
                .map(|t| Arc::new(t) as Instance)
                .map_err(|reason| ResolveError::Construct { handler, reason })
        });
        self.factories.insert(TypeId::of::<T>(), factory);
        self
    }

    pub fn build(self) -> Container {
        Container {
            inner: Arc::new(Inner {
                factories: self.factories,
                next_scope: AtomicU64::new(0),
                closed: AtomicU64::new(0),
            }),
        }
    }
}
