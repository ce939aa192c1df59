//! # Parameter Resolution
//!
//! Binds one declared parameter to a value. The sources are tried in a
//! fixed order and the first that applies wins:
//!
//! 1. a raw value for a typed parameter, looked up through the entity
//!    locator when one handles the type (otherwise bound unchanged)
//! 2. a raw value for an untyped parameter
//! 3. a service registered under the parameter's name, if assignable
//! 4. the ambient request, if the declared type is [`Request`]
//! 5. the first registered service assignable to the declared type
//! 6. a configuration parameter registered under the parameter's name
//! 7. the declared default of an optional parameter (`Null` if none)
//!
//! When nothing applies, resolution fails with
//! [`ResolveError::MissingDependency`].

use rivet_core::{
    Arguments, EntityLocator, Object, ParameterDescriptor, RawParameters, Request, ResolveError,
    ServiceProvider, TypeRef, Value,
};

/// The callable a parameter belongs to, for diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CallSite<'a> {
    /// Declaring handler.
    pub handler: &'a str,
    /// Declaring method (`new` for constructors).
    pub method: &'a str,
}

impl<'a> CallSite<'a> {
    /// Identify a callable.
    pub fn new(handler: &'a str, method: &'a str) -> Self {
        Self { handler, method }
    }
}

/// Where a bound value came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BindingSource {
    /// Looked up through the entity locator.
    Entity,
    /// Taken verbatim from the raw parameters.
    Raw,
    /// The service registered under the parameter's name.
    NamedService(String),
    /// The ambient request.
    Request,
    /// The first service assignable to the declared type.
    TypedService(String),
    /// A configuration parameter.
    Parameter,
    /// The declared default.
    Default,
}

/// A resolved parameter.
#[derive(Clone, Debug, PartialEq)]
pub struct Binding {
    /// The bound value.
    pub value: Value,
    /// Which rule produced it.
    pub source: BindingSource,
}

impl Binding {
    fn new(value: Value, source: BindingSource) -> Self {
        Self { value, source }
    }
}

/// Resolves declared parameters against a service provider and the ambient
/// request.
pub struct ParameterResolver<'a> {
    services: &'a dyn ServiceProvider,
    request: Option<Object>,
}

impl<'a> ParameterResolver<'a> {
    /// A resolver bound to the current request.
    pub fn new(services: &'a dyn ServiceProvider, request: Object) -> Self {
        Self {
            services,
            request: Some(request),
        }
    }

    /// A resolver with no ambient request; rule 4 never applies.
    pub fn without_request(services: &'a dyn ServiceProvider) -> Self {
        Self {
            services,
            request: None,
        }
    }

    /// Bind one parameter, reporting which rule applied.
    pub fn bind(
        &self,
        site: CallSite<'_>,
        descriptor: &ParameterDescriptor,
        raw: &RawParameters,
    ) -> Result<Binding, ResolveError> {
        let binding = self.try_bind(descriptor, raw)?.ok_or_else(|| {
            ResolveError::MissingDependency {
                handler: site.handler.to_string(),
                method: site.method.to_string(),
                parameter: descriptor.name().to_string(),
            }
        })?;

        tracing::trace!(
            handler = site.handler,
            method = site.method,
            parameter = descriptor.name(),
            source = ?binding.source,
            "parameter bound"
        );
        Ok(binding)
    }

    /// Bind one parameter and return its value.
    pub fn resolve(
        &self,
        site: CallSite<'_>,
        descriptor: &ParameterDescriptor,
        raw: &RawParameters,
    ) -> Result<Value, ResolveError> {
        self.bind(site, descriptor, raw).map(|binding| binding.value)
    }

    /// Bind every parameter in declaration order.
    pub fn resolve_all(
        &self,
        site: CallSite<'_>,
        descriptors: &[ParameterDescriptor],
        raw: &RawParameters,
    ) -> Result<Vec<Value>, ResolveError> {
        descriptors
            .iter()
            .map(|descriptor| self.resolve(site, descriptor, raw))
            .collect()
    }

    /// Bind every parameter and pair the values with their names, ready to be
    /// passed to a callable.
    pub fn arguments(
        &self,
        site: CallSite<'_>,
        descriptors: &[ParameterDescriptor],
        raw: &RawParameters,
    ) -> Result<Arguments, ResolveError> {
        descriptors
            .iter()
            .map(|descriptor| {
                self.resolve(site, descriptor, raw)
                    .map(|value| (descriptor.name().to_string(), value))
            })
            .collect()
    }

    /// Returns true if the parameter can be bound without any raw value.
    ///
    /// Used at build time to flag parameters that will fail unless every
    /// route supplies them.
    pub fn is_statically_satisfiable(&self, descriptor: &ParameterDescriptor) -> bool {
        if descriptor.is_optional() || self.services.has_parameter(descriptor.name()) {
            return true;
        }
        match descriptor.declared_type() {
            Some(declared) => {
                self.services.is_assignable(descriptor.name(), declared)
                    || declared == TypeRef::of::<Request>()
                    || self.first_assignable(declared).is_some()
            }
            None => false,
        }
    }

    fn try_bind(
        &self,
        descriptor: &ParameterDescriptor,
        raw: &RawParameters,
    ) -> Result<Option<Binding>, ResolveError> {
        let name = descriptor.name();
        let declared = descriptor.declared_type();

        if let Some(value) = raw.get(name) {
            return match declared {
                Some(entity) => self.bind_raw_typed(entity, name, value).map(Some),
                None => Ok(Some(Binding::new(value.clone(), BindingSource::Raw))),
            };
        }

        if let Some(declared) = declared {
            if self.services.is_assignable(name, declared) {
                let service = self.services.get(name, declared)?;
                return Ok(Some(Binding::new(
                    Value::Object(service),
                    BindingSource::NamedService(name.to_string()),
                )));
            }

            if let Some(request) = self.request.as_ref().filter(|r| r.type_ref() == declared) {
                return Ok(Some(Binding::new(
                    Value::Object(request.clone()),
                    BindingSource::Request,
                )));
            }

            if let Some(service_name) = self.first_assignable(declared) {
                let service = self.services.get(&service_name, declared)?;
                return Ok(Some(Binding::new(
                    Value::Object(service),
                    BindingSource::TypedService(service_name),
                )));
            }
        }

        if let Some(value) = self.services.parameter(name) {
            return Ok(Some(Binding::new(value, BindingSource::Parameter)));
        }

        if descriptor.is_optional() {
            let value = descriptor.default_value().cloned().unwrap_or_default();
            return Ok(Some(Binding::new(value, BindingSource::Default)));
        }

        Ok(None)
    }

    fn bind_raw_typed(
        &self,
        entity: TypeRef,
        field: &str,
        value: &Value,
    ) -> Result<Binding, ResolveError> {
        let Some(locator) = self.locator_for(entity) else {
            return Ok(Binding::new(value.clone(), BindingSource::Raw));
        };

        let found = locator
            .find_one_by(entity, field, value)
            .map_err(|source| ResolveError::EntityLookup {
                entity: entity.name().to_string(),
                field: field.to_string(),
                source,
            })?;

        if found.is_none() {
            tracing::debug!(%entity, field, "entity not found, binding null");
        }
        Ok(Binding::new(found.unwrap_or_default(), BindingSource::Entity))
    }

    fn locator_for(&self, entity: TypeRef) -> Option<&dyn EntityLocator> {
        self.services
            .entity_locator()
            .filter(|locator| locator.handles(entity))
    }

    fn first_assignable(&self, declared: TypeRef) -> Option<String> {
        self.services
            .service_names()
            .find(|name| self.services.is_assignable(name, declared))
            .map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        registry::{Service, ServiceRegistry},
        testing::InMemoryEntityLocator,
    };
    use std::sync::Arc;

    trait Greeter: Send + Sync {
        fn greet(&self) -> String;
    }

    struct Base;

    impl Greeter for Base {
        fn greet(&self) -> String {
            "Hello World".into()
        }
    }

    struct Sub;

    impl Greeter for Sub {
        fn greet(&self) -> String {
            "Hello World Sub".into()
        }
    }

    #[derive(Debug, PartialEq)]
    struct User {
        id: i64,
    }

    const SITE: CallSite<'static> = CallSite {
        handler: "Controller",
        method: "someAction",
    };

    fn registry() -> ServiceRegistry {
        ServiceRegistry::builder()
            .parameter("baseUrl", "/home")
            .register(
                Service::new("service", |_| Base)
                    .provides::<dyn Greeter>(|s| s as Arc<dyn Greeter>),
            )
            .register(
                Service::new("serviceSub", |_| Sub)
                    .provides::<dyn Greeter>(|s| s as Arc<dyn Greeter>),
            )
            .build()
            .unwrap()
    }

    fn request() -> Object {
        Object::new(Arc::new(Request::get("/blubb/155?some=foo")))
    }

    fn greet(binding: &Binding) -> String {
        binding.value.downcast::<dyn Greeter>().unwrap().greet()
    }

    #[test]
    fn test_raw_value_wins_for_untyped() {
        let registry = registry();
        let resolver = ParameterResolver::new(&registry, request());
        let raw = RawParameters::new().with("baseUrl", "/override");

        let binding = resolver
            .bind(SITE, &ParameterDescriptor::named("baseUrl"), &raw)
            .unwrap();
        assert_eq!(binding.value, Value::from("/override"));
        assert_eq!(binding.source, BindingSource::Raw);
    }

    #[test]
    fn test_named_service_beats_type_order() {
        let registry = registry();
        let resolver = ParameterResolver::new(&registry, request());
        let descriptor = ParameterDescriptor::typed::<dyn Greeter>("serviceSub");

        let binding = resolver
            .bind(SITE, &descriptor, &RawParameters::new())
            .unwrap();
        assert_eq!(binding.source, BindingSource::NamedService("serviceSub".into()));
        assert_eq!(greet(&binding), "Hello World Sub");
    }

    #[test]
    fn test_first_assignable_service_wins() {
        let registry = registry();
        let resolver = ParameterResolver::new(&registry, request());
        let descriptor = ParameterDescriptor::typed::<dyn Greeter>("greeter");

        let binding = resolver
            .bind(SITE, &descriptor, &RawParameters::new())
            .unwrap();
        assert_eq!(binding.source, BindingSource::TypedService("service".into()));
        assert_eq!(greet(&binding), "Hello World");

        let again = resolver
            .bind(SITE, &descriptor, &RawParameters::new())
            .unwrap();
        assert_eq!(again, binding);
    }

    #[test]
    fn test_request_binding() {
        let registry = registry();
        let resolver = ParameterResolver::new(&registry, request());
        let binding = resolver
            .bind(SITE, &ParameterDescriptor::typed::<Request>("request"), &RawParameters::new())
            .unwrap();
        assert_eq!(binding.source, BindingSource::Request);
        let request = binding.value.downcast::<Request>().unwrap();
        assert_eq!(request.query("some"), Some("foo"));

        let detached = ParameterResolver::without_request(&registry);
        assert!(
            detached
                .bind(
                    SITE,
                    &ParameterDescriptor::typed::<Request>("request"),
                    &RawParameters::new(),
                )
                .unwrap_err()
                .is_missing_dependency()
        );
    }

    #[test]
    fn test_configuration_then_default() {
        let registry = registry();
        let resolver = ParameterResolver::new(&registry, request());
        let none = RawParameters::new();

        let base_url = resolver
            .bind(SITE, &ParameterDescriptor::named("baseUrl"), &none)
            .unwrap();
        assert_eq!(base_url, Binding::new(Value::from("/home"), BindingSource::Parameter));

        let id = resolver
            .bind(SITE, &ParameterDescriptor::named("id").with_default(317), &none)
            .unwrap();
        assert_eq!(id, Binding::new(Value::Int(317), BindingSource::Default));

        let maybe = resolver
            .resolve(SITE, &ParameterDescriptor::named("q").optional(), &none)
            .unwrap();
        assert_eq!(maybe, Value::Null);
    }

    #[test]
    fn test_missing_dependency_names_the_parameter() {
        let registry = ServiceRegistry::empty();
        let resolver = ParameterResolver::new(&registry, request());
        let err = resolver
            .resolve(
                CallSite::new("Controller", "new"),
                &ParameterDescriptor::typed::<Base>("service"),
                &RawParameters::new(),
            )
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "cannot pass parameter `service` to Controller::new"
        );
    }

    #[test]
    fn test_raw_typed_without_locator_is_unchanged() {
        let registry = registry();
        let resolver = ParameterResolver::new(&registry, request());
        let raw = RawParameters::new().with("user", "7");

        let binding = resolver
            .bind(SITE, &ParameterDescriptor::typed::<User>("user"), &raw)
            .unwrap();
        assert_eq!(binding, Binding::new(Value::from("7"), BindingSource::Raw));
    }

    #[test]
    fn test_raw_typed_goes_through_locator() {
        let locator =
            InMemoryEntityLocator::new().with_entity(Arc::new(User { id: 7 }), [("user", 7)]);
        let registry = ServiceRegistry::builder()
            .entity_locator(Arc::new(locator))
            .build()
            .unwrap();
        let resolver = ParameterResolver::new(&registry, request());
        let descriptor = ParameterDescriptor::typed::<User>("user");

        let found = resolver
            .bind(SITE, &descriptor, &RawParameters::new().with("user", "7"))
            .unwrap();
        assert_eq!(found.source, BindingSource::Entity);
        assert_eq!(found.value.downcast::<User>().unwrap().id, 7);

        let missing = resolver
            .resolve(SITE, &descriptor, &RawParameters::new().with("user", 8))
            .unwrap();
        assert_eq!(missing, Value::Null);
    }

    #[test]
    fn test_locator_failure_propagates() {
        let locator = InMemoryEntityLocator::new().failing("database unavailable");
        let registry = ServiceRegistry::builder()
            .entity_locator(Arc::new(locator.handling::<User>()))
            .build()
            .unwrap();
        let resolver = ParameterResolver::new(&registry, request());

        let err = resolver
            .resolve(
                SITE,
                &ParameterDescriptor::typed::<User>("user"),
                &RawParameters::new().with("user", 7),
            )
            .unwrap_err();
        assert!(matches!(err, ResolveError::EntityLookup { ref field, .. } if field == "user"));
    }

    #[test]
    fn test_static_satisfiability() {
        let registry = registry();
        let resolver = ParameterResolver::without_request(&registry);

        let satisfiable = |descriptor: ParameterDescriptor| {
            resolver.is_statically_satisfiable(&descriptor)
        };

        assert!(satisfiable(ParameterDescriptor::typed::<dyn Greeter>("x")));
        assert!(satisfiable(ParameterDescriptor::typed::<Request>("request")));
        assert!(satisfiable(ParameterDescriptor::named("baseUrl")));
        assert!(satisfiable(ParameterDescriptor::named("id").with_default(1)));
        assert!(!satisfiable(ParameterDescriptor::named("id")));
        assert!(!satisfiable(ParameterDescriptor::typed::<User>("user")));
    }
}
