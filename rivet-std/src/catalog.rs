//! Handler catalog: handler name to callable table.

use rivet_core::{BuildError, DynHandler, HandlerDefinition, Injectable, InvocationTarget};
use std::{collections::HashMap, sync::Arc};

/// Registration entry for a handler collected through `inventory`.
///
/// Submitted by `#[handler(register)]`, or manually:
///
/// ```rust,ignore
/// inventory::submit! {
///     HandlerRegistration::new("Controller", || Controller::definition().into_dyn())
/// }
/// ```
#[cfg(feature = "inventory")]
pub struct HandlerRegistration {
    /// Handler name.
    pub name: &'static str,
    /// Builds the handler's table.
    pub definition: fn() -> Arc<dyn DynHandler>,
}

#[cfg(feature = "inventory")]
impl HandlerRegistration {
    /// Create a registration entry.
    pub const fn new(name: &'static str, definition: fn() -> Arc<dyn DynHandler>) -> Self {
        Self { name, definition }
    }
}

#[cfg(feature = "inventory")]
inventory::collect!(HandlerRegistration);

/// Builder for [`HandlerCatalog`].
#[derive(Default)]
pub struct HandlerCatalogBuilder {
    handlers: Vec<Arc<dyn DynHandler>>,
}

impl HandlerCatalogBuilder {
    /// Create a new empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler type by its own definition.
    pub fn handler<T: Injectable>(self) -> Self {
        self.definition(T::definition())
    }

    /// Register a handler definition.
    pub fn definition<H: Send + 'static>(self, definition: HandlerDefinition<H>) -> Self {
        self.dyn_handler(definition.into_dyn())
    }

    /// Register an already erased handler.
    pub fn dyn_handler(mut self, handler: Arc<dyn DynHandler>) -> Self {
        self.handlers.push(handler);
        self
    }

    /// Register every handler submitted through `inventory`.
    #[cfg(feature = "inventory")]
    pub fn collect_registered(mut self) -> Self {
        for registration in inventory::iter::<HandlerRegistration>() {
            tracing::debug!(handler = registration.name, "collected registered handler");
            self.handlers.push((registration.definition)());
        }
        self
    }

    /// Validate every table and freeze the catalog.
    pub fn build(self) -> Result<HandlerCatalog, BuildError> {
        let mut handlers = HashMap::with_capacity(self.handlers.len());
        for handler in self.handlers {
            handler.validate()?;
            let name = handler.name().to_string();
            if handlers.insert(name.clone(), handler).is_some() {
                return Err(BuildError::DuplicateHandler(name));
            }
        }
        Ok(HandlerCatalog { handlers })
    }
}

/// Frozen map of handler names to callable tables.
#[derive(Default)]
pub struct HandlerCatalog {
    handlers: HashMap<String, Arc<dyn DynHandler>>,
}

impl HandlerCatalog {
    /// Start building a catalog.
    pub fn builder() -> HandlerCatalogBuilder {
        HandlerCatalogBuilder::new()
    }

    /// Look up a handler by name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn DynHandler>> {
        self.handlers.get(name)
    }

    /// Returns true if the target names a registered handler method.
    pub fn contains_target(&self, target: &InvocationTarget) -> bool {
        self.get(target.handler())
            .is_some_and(|handler| handler.method_parameters(target.method()).is_some())
    }

    /// Check that the target names a registered handler method.
    pub fn check_target(&self, target: &InvocationTarget) -> Result<(), BuildError> {
        if self.contains_target(target) {
            Ok(())
        } else {
            Err(BuildError::UnknownTarget(target.to_string()))
        }
    }

    /// Iterate over the registered handlers.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn DynHandler>> {
        self.handlers.values()
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns true if no handlers are registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rivet_core::ParameterDescriptor;

    #[derive(Default)]
    struct Home;

    impl Injectable for Home {
        fn definition() -> HandlerDefinition<Self> {
            HandlerDefinition::from_default("Home").method("index", vec![], |_: &mut Home| "home")
        }
    }

    #[test]
    fn test_targets() {
        let catalog = HandlerCatalog::builder().handler::<Home>().build().unwrap();
        assert_eq!(catalog.len(), 1);
        assert!(catalog.contains_target(&InvocationTarget::new("Home", "index")));
        assert!(!catalog.contains_target(&InvocationTarget::new("Home", "missing")));
        assert_eq!(
            catalog.check_target(&InvocationTarget::new("Away", "index")),
            Err(BuildError::UnknownTarget("Away::index".into()))
        );
    }

    #[test]
    fn test_duplicates_rejected() {
        let result = HandlerCatalog::builder()
            .handler::<Home>()
            .definition(HandlerDefinition::<Home>::from_default("Home"))
            .build();
        assert_eq!(result.err(), Some(BuildError::DuplicateHandler("Home".into())));
    }

    #[test]
    fn test_invalid_tables_rejected() {
        let result = HandlerCatalog::builder()
            .definition(HandlerDefinition::<Home>::from_default("Home").method(
                "show",
                vec![ParameterDescriptor::named("id")],
                |_: &mut Home| (),
            ))
            .build();
        assert!(matches!(result, Err(BuildError::ArityMismatch { .. })));
    }
}
