//! # Handler registry
//!
//! The registry is the source of truth for which handler serves which contract
//! method. It is built once at startup from an explicit list of descriptors
//! and frozen afterwards.
//!
//! ## Philosophy
//!
//! - **Startup Safety**: Duplicate registrations, undeclared methods and
//!   request/response mismatches fail the build. Nothing is checked at call time.
//! - **Deterministic Contents**: Candidates are validated in a canonical order,
//!   so the same set of handlers yields the same registry, or the same error,
//!   whatever order they were listed in.
//! - **Lock-free Reads**: After build, lookups are plain `HashMap` reads shared
//!   through an `Arc`; O(1) on the call path.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::sync::Arc;

use crate::contract::ContractId;
use crate::descriptor::HandlerDescriptor;
use crate::handler::Handler;

/// Which half of a method signature disagreed with the contract.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SignaturePart {
    Request,
    Response,
}

impl fmt::Display for SignaturePart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Request => f.write_str("request"),
            Self::Response => f.write_str("response"),
        }
    }
}

/// Registry build errors. Each one aborts startup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    /// Two handlers claim the same contract method. Handler names are sorted.
    #[error("conflicting handlers for '{contract}/{method}': {first} and {second}")]
    Duplicate {
        contract: &'static str,
        method: &'static str,
        first: &'static str,
        second: &'static str,
    },
    /// A handler names a method the contract does not declare.
    #[error("handler {handler} serves '{method}', which is not declared on contract '{contract}'")]
    UnknownMethod {
        contract: &'static str,
        method: &'static str,
        handler: &'static str,
    },
    /// A handler's request or response type differs from the declared one.
    #[error("handler {handler} for '{contract}/{method}' has {part} type {found}, contract declares {expected}")]
    SignatureMismatch {
        contract: &'static str,
        method: &'static str,
        handler: &'static str,
        part: SignaturePart,
        expected: &'static str,
        found: &'static str,
    },
}

pub type Result<T> = std::result::Result<T, BuildError>;

/// Handlers of a single contract, keyed by method name.
pub type ContractTable = HashMap<&'static str, Arc<HandlerDescriptor>>;

/// Immutable index from `(contract, method)` to handler descriptor.
#[derive(Clone, Debug, Default)]
pub struct Registry {
    contracts: Arc<HashMap<ContractId, Arc<ContractTable>>>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Validates `candidates` and freezes them into a registry.
    pub fn build(candidates: impl IntoIterator<Item = HandlerDescriptor>) -> Result<Self> {
        let mut candidates: Vec<HandlerDescriptor> = candidates.into_iter().collect();
        candidates.sort_by(|a, b| {
            (a.contract().name(), a.method(), a.handler().name())
                .cmp(&(b.contract().name(), b.method(), b.handler().name()))
        });

        let mut contracts: HashMap<ContractId, ContractTable> = HashMap::new();

        for descriptor in candidates {
            validate(&descriptor)?;

            let table = contracts.entry(descriptor.contract()).or_default();
            match table.entry(descriptor.method()) {
                Entry::Occupied(existing) => {
                    // sorted above, so the existing handler name never sorts after this one
                    return Err(BuildError::Duplicate {
                        contract: descriptor.contract().name(),
                        method: descriptor.method(),
                        first: existing.get().handler().name(),
                        second: descriptor.handler().name(),
                    });
                }
                Entry::Vacant(slot) => {
                    tracing::debug!(
                        contract = descriptor.contract().name(),
                        method = descriptor.method(),
                        handler = descriptor.handler().name(),
                        "registered handler"
                    );
                    slot.insert(Arc::new(descriptor));
                }
            }
        }

        let contracts: HashMap<_, _> = contracts
            .into_iter()
            .map(|(id, table)| (id, Arc::new(table)))
            .collect();

        let registry = Self { contracts: Arc::new(contracts) };
        tracing::info!(
            contracts = registry.contracts.len(),
            handlers = registry.len(),
            "handler registry built"
        );
        Ok(registry)
    }

    /// Looks up the handler serving `method` on `contract`.
    pub fn lookup(&self, contract: ContractId, method: &str) -> Option<&HandlerDescriptor> {
        self.contracts
            .get(&contract)
            .and_then(|table| table.get(method))
            .map(|d| d.as_ref())
    }

    /// The handlers of one contract; empty when none were registered.
    pub fn table(&self, contract: ContractId) -> Arc<ContractTable> {
        self.contracts.get(&contract).cloned().unwrap_or_default()
    }

    /// Every contract at least one handler was registered for, sorted by name.
    pub fn contracts(&self) -> Vec<ContractId> {
        let mut ids: Vec<_> = self.contracts.keys().copied().collect();
        ids.sort_by_key(|id| id.name());
        ids
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &HandlerDescriptor> {
        self.contracts
            .values()
            .flat_map(|table| table.values())
            .map(|d| d.as_ref())
    }

    pub fn len(&self) -> usize {
        self.contracts.values().map(|t| t.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Checks a descriptor against the method set its contract declares.
fn validate(descriptor: &HandlerDescriptor) -> Result<()> {
    let schema = descriptor.contract_schema();
    let contract = descriptor.contract().name();
    let method = descriptor.method();
    let handler = descriptor.handler().name();

    let sig = schema.method(method).ok_or(BuildError::UnknownMethod {
        contract,
        method,
        handler,
    })?;

    let checks = [
        (SignaturePart::Request, &sig.request, descriptor.request_type()),
        (SignaturePart::Response, &sig.response, descriptor.response_type()),
    ];

    for (part, expected, found) in checks {
        if expected != found {
            return Err(BuildError::SignatureMismatch {
                contract,
                method,
                handler,
                part,
                expected: expected.name(),
                found: found.name(),
            });
        }
    }

    Ok(())
}

/// Collects handler descriptors before freezing them into a [`Registry`].
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    candidates: Vec<HandlerDescriptor>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H: Handler>(mut self) -> Self {
        self.candidates.push(HandlerDescriptor::of::<H>());
        self
    }

    pub fn add(mut self, descriptor: HandlerDescriptor) -> Self {
        self.candidates.push(descriptor);
        self
    }

    pub fn extend(mut self, descriptors: impl IntoIterator<Item = HandlerDescriptor>) -> Self {
        self.candidates.extend(descriptors);
        self
    }

    pub fn build(self) -> Result<Registry> {
        Registry::build(self.candidates)
    }
}
