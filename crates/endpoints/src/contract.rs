//! # Service contracts
//!
//! A contract is the set of method signatures an RPC service definition declares.
//! Generated code (or a hand-written equivalent) describes it through the
//! [`Contract`] trait, naming each method with a [`MethodId`] rather than a raw
//! string so renames and typos surface at compile time.
//!
//! The registry only needs an erased view of a contract: its identity and the
//! request/response types of every declared method. That view is the
//! [`ContractSchema`], the analogue of an interface schema in a link-time ledger.

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::hash::Hasher;

use crate::status::Status;

/// A Rust type identity paired with its name for diagnostics.
#[derive(Copy, Clone, Debug)]
pub struct TypeInfo {
    id: TypeId,
    name: &'static str,
}

impl TypeInfo {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeInfo {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeInfo {}

impl Hash for TypeInfo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Stable identity of a service contract.
///
/// Equality follows the contract's Rust type, the name is carried for routing
/// and error messages.
#[derive(Copy, Clone, Debug)]
pub struct ContractId {
    type_id: TypeId,
    name: &'static str,
}

impl ContractId {
    pub fn of<C: Contract>() -> Self {
        Self {
            type_id: TypeId::of::<C>(),
            name: C::NAME,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for ContractId {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for ContractId {}

impl Hash for ContractId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Display for ContractId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Identifier of one method declared on a contract, typically a generated enum.
pub trait MethodId: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static {
    /// The exact, case-sensitive method name used for routing.
    fn name(self) -> &'static str;

    fn request_type(self) -> TypeInfo;

    fn response_type(self) -> TypeInfo;
}

/// A service contract whose methods can be served by registered handlers.
///
/// The implementing type is only an identity marker; it is never instantiated
/// by the dispatch engine.
pub trait Contract: Sized + Send + Sync + 'static {
    /// Fully qualified service name (e.g. `greet.Greeter`).
    const NAME: &'static str;

    type Method: MethodId;

    /// Every method the contract declares.
    fn methods() -> &'static [Self::Method];

    /// Looks up a declared method by its exact name.
    fn method(name: &str) -> Option<Self::Method> {
        Self::methods().iter().copied().find(|m| m.name() == name)
    }

    /// The contract's own behaviour for a method nobody serves.
    fn fallback(method: Self::Method) -> Status {
        Status::unimplemented(format!(
            "method '{}/{}' is not implemented",
            Self::NAME,
            method.name()
        ))
    }

    /// Erased view of the declared method set, used for build-time validation.
    fn schema() -> ContractSchema {
        let methods = Self::methods()
            .iter()
            .map(|m| {
                let sig = MethodSignature {
                    request: m.request_type(),
                    response: m.response_type(),
                };
                (m.name(), sig)
            })
            .collect();

        ContractSchema {
            id: ContractId::of::<Self>(),
            methods,
        }
    }
}

/// The declared methods of one contract, keyed by method name.
#[derive(Clone, Debug)]
pub struct ContractSchema {
    pub id: ContractId,
    pub methods: HashMap<&'static str, MethodSignature>,
}

impl ContractSchema {
    pub fn method(&self, name: &str) -> Option<&MethodSignature> {
        self.methods.get(name)
    }
}

/// Request and response types of a declared method.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MethodSignature {
    pub request: TypeInfo,
    pub response: TypeInfo,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::Code;
    use crate::testing::Calc;
    use crate::testing::CalcMethod;

    #[test]
    fn test_method_lookup_is_exact() {
        assert_eq!(Calc::method("Add"), Some(CalcMethod::Add));
        assert_eq!(Calc::method("add"), None);
        assert_eq!(Calc::method("Subtract"), None);
    }

    #[test]
    fn test_schema_lists_every_declared_method() {
        let schema = Calc::schema();

        assert_eq!(schema.id, ContractId::of::<Calc>());
        assert_eq!(schema.methods.len(), Calc::methods().len());

        let add = schema.method("Add").expect("Add should be declared");
        assert_eq!(add.request, TypeInfo::of::<(i64, i64)>());
        assert_eq!(add.response, TypeInfo::of::<i64>());
    }

    #[test]
    fn test_default_fallback_is_unimplemented() {
        let status = Calc::fallback(CalcMethod::Negate);
        assert_eq!(status.code(), Code::Unimplemented);
        assert!(status.message().contains("test.Calc/Negate"));
    }

    #[test]
    fn test_contract_identity_ignores_name_collisions() {
        struct Shadow;
        impl Contract for Shadow {
            const NAME: &'static str = "test.Calc";
            type Method = CalcMethod;
            fn methods() -> &'static [CalcMethod] {
                &[]
            }
        }

        assert_ne!(ContractId::of::<Calc>(), ContractId::of::<Shadow>());
        assert_eq!(ContractId::of::<Shadow>().name(), "test.Calc");

        let schema = Shadow::schema();
        assert_eq!(schema.id, ContractId::of::<Shadow>());
        assert!(schema.methods.is_empty());
    }
}
