//! # Scoped handler resolution
//!
//! The dispatcher never constructs handlers itself. For every call it opens one
//! [`Scope`] from the configured [`Resolver`], resolves the handler inside it,
//! and closes the scope once the call is over. Dependency containers plug in
//! here; [`Container`](crate::container::Container) is the bundled one.
//!
//! ## Invariants
//!
//! - One scope per call, closed exactly once on every exit path, including the
//!   caller dropping the call future.
//! - A scope must not hand out instances after it has been closed, and must not
//!   retain them past closure.

use std::any::Any;
use std::sync::Arc;

use crate::contract::TypeInfo;

/// A live, type-erased handler instance.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Failures of the resolution infrastructure itself.
///
/// "Type not registered" is not an error; scopes report it as `Ok(None)`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("failed to open scope: {0}")]
    Scope(String),
    #[error("failed to construct {handler}: {reason}")]
    Construct { handler: &'static str, reason: String },
}

pub type Result<T> = std::result::Result<T, ResolveError>;

/// Opens per-call resolution scopes.
pub trait Resolver: Send + Sync + 'static {
    fn open_scope(&self) -> Result<Box<dyn Scope>>;
}

/// A bounded lifetime within which handler instances are created.
pub trait Scope: Send {
    /// Produces an instance of `handler`, or `None` when the type is unknown.
    fn resolve(&mut self, handler: &TypeInfo) -> Result<Option<Instance>>;

    /// Releases every instance created within the scope.
    fn close(self: Box<Self>);
}

/// Owns an open scope and closes it when dropped.
pub(crate) struct ScopeGuard {
    scope: Option<Box<dyn Scope>>,
}

impl ScopeGuard {
    pub(crate) fn open(resolver: &dyn Resolver) -> Result<Self> {
        let scope = resolver.open_scope()?;
        Ok(Self { scope: Some(scope) })
    }

    pub(crate) fn resolve(&mut self, handler: &TypeInfo) -> Result<Option<Instance>> {
        match self.scope.as_mut() {
            Some(scope) => scope.resolve(handler),
            None => Ok(None),
        }
    }
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        if let Some(scope) = self.scope.take() {
            scope.close();
        }
    }
}
