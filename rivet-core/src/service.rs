//! Seams between the engine and its collaborators.
//!
//! [`ServiceProvider`] is the read side of a service registry: named shared
//! instances plus configuration scalars. [`EntityLocator`] translates a raw
//! scalar into a domain object by field name.

use crate::{
    error::{BoxError, ResolveError},
    types::TypeRef,
    value::{Object, Value},
};
use std::sync::Arc;

/// Named services and configuration parameters.
///
/// Implementations are read-mostly: after startup they only construct lazy
/// services on first use.
pub trait ServiceProvider: Send + Sync {
    /// Returns true if a service is registered under `name`.
    fn has(&self, name: &str) -> bool;

    /// Returns true if the service's implementation type is `declared`, or
    /// it provides `declared` as a view. Unknown names are never assignable.
    fn is_assignable(&self, name: &str, declared: TypeRef) -> bool;

    /// Service names in registration order.
    fn service_names(&self) -> Box<dyn Iterator<Item = &str> + '_>;

    /// Obtain the service viewed as `view`, constructing it on first use.
    fn get(&self, name: &str, view: TypeRef) -> Result<Object, ResolveError>;

    /// Returns true if a configuration parameter is registered under `name`.
    fn has_parameter(&self, name: &str) -> bool;

    /// A configuration parameter's value.
    fn parameter(&self, name: &str) -> Option<Value>;

    /// The configured entity locator, if any.
    fn entity_locator(&self) -> Option<&dyn EntityLocator> {
        None
    }
}

/// Lookup of domain objects by field value.
pub trait EntityLocator: Send + Sync {
    /// Returns true if entities of this type can be looked up.
    fn handles(&self, entity: TypeRef) -> bool;

    /// Find one entity whose `field` equals `value`.
    ///
    /// `Ok(None)` means "not found" and is not an error.
    fn find_one_by(
        &self,
        entity: TypeRef,
        field: &str,
        value: &Value,
    ) -> Result<Option<Value>, BoxError>;
}

impl<T: EntityLocator + ?Sized> EntityLocator for Arc<T> {
    fn handles(&self, entity: TypeRef) -> bool {
        (**self).handles(entity)
    }

    fn find_one_by(
        &self,
        entity: TypeRef,
        field: &str,
        value: &Value,
    ) -> Result<Option<Value>, BoxError> {
        (**self).find_one_by(entity, field, value)
    }
}
