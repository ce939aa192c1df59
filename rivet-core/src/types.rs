//! Runtime type identities.
//!
//! Rust has no reflective class hierarchy, so the dispatcher works with
//! explicit [`TypeRef`]s: a concrete type, or a trait-object type standing in
//! for an interface. Supertype relations are declared where services are
//! registered, never discovered.

use std::{
    any::TypeId,
    fmt,
    hash::{Hash, Hasher},
};

/// Identity of a Rust type as seen by the parameter resolver.
///
/// Two `TypeRef`s are equal when they refer to the same type. The name is
/// kept for diagnostics only.
///
/// Note that `dyn Trait` and `dyn Trait + Send + Sync` are distinct types;
/// declare the auto traits as supertraits (`trait Greeter: Send + Sync`) and
/// use the plain `dyn Greeter` everywhere.
#[derive(Clone, Copy)]
pub struct TypeRef {
    id: TypeId,
    name: &'static str,
}

impl TypeRef {
    /// The `TypeRef` of `T`.
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// The underlying `TypeId`.
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Fully qualified type name, as reported by `std::any::type_name`.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns true if this is the `TypeRef` of `T`.
    pub fn is<T: ?Sized + 'static>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }
}

impl PartialEq for TypeRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeRef {}

impl Hash for TypeRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeRef({})", self.name)
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}
