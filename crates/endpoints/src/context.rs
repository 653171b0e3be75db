//! Per-call invocation context.
//!
//! The host creates one [`CallContext`] per inbound call and hands it, together
//! with the decoded request, to the dispatcher as an [`Invocation`]. The context
//! is owned by that call alone and is dropped when the call completes.

use std::collections::BTreeMap;
use std::time::Duration;
use std::time::Instant;

use tokio_util::sync::CancellationToken;

/// Ambient call metadata (headers, trailers, peer information).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Metadata {
    entries: BTreeMap<String, String>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.entries.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Everything a handler may observe about the call besides the request itself.
///
/// Cancellation is cooperative: handlers watch [`CallContext::cancellation`]
/// and decide how to stop. The deadline is informational and never enforced
/// by the dispatcher.
#[derive(Debug)]
pub struct CallContext {
    metadata: Metadata,
    cancellation: CancellationToken,
    deadline: Option<Instant>,
}

impl CallContext {
    /// A context with no metadata, no deadline and a fresh cancellation token.
    pub fn new() -> Self {
        ContextBuilder::new().build()
    }

    pub fn builder() -> ContextBuilder {
        ContextBuilder::new()
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }
}

impl Default for CallContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Fluent builder for [`CallContext`].
#[derive(Debug, Default)]
pub struct ContextBuilder {
    metadata: Metadata,
    cancellation: Option<CancellationToken>,
    deadline: Option<Instant>,
}

impl ContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key, value);
        self
    }

    /// Shares the host's cancellation signal with the handler.
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn timeout(self, timeout: Duration) -> Self {
        self.deadline(Instant::now() + timeout)
    }

    pub fn build(self) -> CallContext {
        CallContext {
            metadata: self.metadata,
            cancellation: self.cancellation.unwrap_or_default(),
            deadline: self.deadline,
        }
    }
}

/// A decoded request travelling with its call context.
#[derive(Debug)]
pub struct Invocation<T> {
    pub request: T,
    pub context: CallContext,
}

impl<T> Invocation<T> {
    pub fn new(request: T) -> Self {
        Self {
            request,
            context: CallContext::new(),
        }
    }

    pub fn with_context(request: T, context: CallContext) -> Self {
        Self { request, context }
    }

    pub fn into_parts(self) -> (T, CallContext) {
        (self.request, self.context)
    }
}
