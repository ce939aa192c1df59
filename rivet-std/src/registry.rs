//! Service registry with lazy, once-only construction.
//!
//! The registry has two phases. During startup a [`ServiceRegistryBuilder`]
//! collects services, configuration parameters and an optional entity
//! locator. [`ServiceRegistryBuilder::build`] freezes them into a
//! [`ServiceRegistry`] which is shared (usually behind an `Arc`) while
//! serving. The only mutation after that is constructing each service the
//! first time it is requested.
//!
//! # Example
//!
//! ```rust,ignore
//! let registry = ServiceRegistry::builder()
//!     .parameter("baseUrl", "/home")
//!     .register(Service::new("mailer", |_| Mailer::default()))
//!     .register(
//!         Service::new("serviceSub", |_| ServiceSub::default())
//!             .provides::<dyn Greeter>(|s| s as Arc<dyn Greeter>),
//!     )
//!     .build()?;
//! ```

use crate::config::AppConfig;
use once_cell::sync::OnceCell;
use rivet_core::{
    BoxError, BuildError, EntityLocator, Object, ResolveError, ServiceProvider, TypeRef, Value,
};
use std::{
    cell::RefCell,
    collections::{HashMap, HashSet},
    fmt,
    sync::Arc,
};

type Factory = Box<dyn Fn(&dyn ServiceProvider) -> Result<Object, BoxError> + Send + Sync>;
type ViewCast = Box<dyn Fn(&Object) -> Option<Object> + Send + Sync>;

/// A service recipe: a name, a factory for `T`, and the views it provides.
///
/// The factory runs at most once, on first use. It receives the registry so
/// it can read configuration parameters or other services. Factories that
/// request each other in a cycle fail with
/// [`ResolveError::CircularService`].
pub struct Service<T> {
    name: String,
    factory: Factory,
    views: Vec<(TypeRef, ViewCast)>,
    _marker: std::marker::PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> Service<T> {
    /// A service built by an infallible factory.
    pub fn new<F>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&dyn ServiceProvider) -> T + Send + Sync + 'static,
    {
        Self::from_factory(
            name.into(),
            Box::new(move |services: &dyn ServiceProvider| {
                Ok(Object::new(Arc::new(factory(services))))
            }),
        )
    }

    /// A service built by a fallible factory. Failures are not cached: the
    /// next request retries.
    pub fn try_new<F, E>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&dyn ServiceProvider) -> Result<T, E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        Self::from_factory(
            name.into(),
            Box::new(move |services: &dyn ServiceProvider| {
                factory(services)
                    .map(|service| Object::new(Arc::new(service)))
                    .map_err(Into::into)
            }),
        )
    }

    /// A service wrapping an already constructed instance.
    pub fn from_instance(name: impl Into<String>, instance: Arc<T>) -> Self {
        Self::from_factory(
            name.into(),
            Box::new(move |_: &dyn ServiceProvider| Ok(Object::new(instance.clone()))),
        )
    }

    /// Declare that this service can also be viewed as `U`, typically a trait
    /// object it implements. Typed parameters declared as `U` will match it.
    pub fn provides<U>(mut self, cast: impl Fn(Arc<T>) -> Arc<U> + Send + Sync + 'static) -> Self
    where
        U: ?Sized + Send + Sync + 'static,
    {
        self.views.push((
            TypeRef::of::<U>(),
            Box::new(move |object: &Object| object.downcast::<T>().map(|t| Object::new(cast(t)))),
        ));
        self
    }

    /// Service name.
    pub fn name(&self) -> &str {
        &self.name
    }

    fn from_factory(name: String, factory: Factory) -> Self {
        Self {
            name,
            factory,
            views: Vec::new(),
            _marker: std::marker::PhantomData,
        }
    }

    fn into_entry(self) -> ServiceEntry {
        ServiceEntry {
            name: self.name,
            implementation: TypeRef::of::<T>(),
            views: self.views,
            factory: self.factory,
            instance: OnceCell::new(),
        }
    }
}

struct ServiceEntry {
    name: String,
    implementation: TypeRef,
    views: Vec<(TypeRef, ViewCast)>,
    factory: Factory,
    instance: OnceCell<Object>,
}

impl ServiceEntry {
    fn is_assignable(&self, declared: TypeRef) -> bool {
        self.implementation == declared || self.views.iter().any(|(view, _)| *view == declared)
    }

    fn provided_types(&self) -> impl Iterator<Item = TypeRef> + '_ {
        std::iter::once(self.implementation).chain(self.views.iter().map(|(view, _)| *view))
    }
}

/// Named service recipes available to declarative configuration.
///
/// Configuration files refer to services by class name; this table maps each
/// class name to the typed recipe registered in code.
#[derive(Default)]
pub struct ServiceClasses {
    classes: HashMap<String, Box<dyn Fn(&str) -> ServiceEntry + Send + Sync>>,
}

impl ServiceClasses {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a class. The recipe receives the configured service name.
    pub fn class<T, F>(mut self, class: impl Into<String>, recipe: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&str) -> Service<T> + Send + Sync + 'static,
    {
        self.classes
            .insert(class.into(), Box::new(move |name: &str| recipe(name).into_entry()));
        self
    }

    /// Returns true if the class is known.
    pub fn contains(&self, class: &str) -> bool {
        self.classes.contains_key(class)
    }

    fn instantiate(&self, class: &str, name: &str) -> Option<ServiceEntry> {
        self.classes.get(class).map(|recipe| recipe(name))
    }
}

/// Builder for [`ServiceRegistry`].
#[derive(Default)]
pub struct ServiceRegistryBuilder {
    services: Vec<ServiceEntry>,
    parameters: HashMap<String, Value>,
    entity_locator: Option<Arc<dyn EntityLocator>>,
}

impl ServiceRegistryBuilder {
    /// Create a new empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a service. Registration order decides type-directed matches.
    pub fn register<T: Send + Sync + 'static>(mut self, service: Service<T>) -> Self {
        self.services.push(service.into_entry());
        self
    }

    /// Register a configuration parameter. A later value replaces an earlier
    /// one.
    pub fn parameter(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    /// Register several configuration parameters.
    pub fn parameters<K, V>(mut self, parameters: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        self.parameters
            .extend(parameters.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Install the entity locator used for typed raw values.
    pub fn entity_locator(mut self, locator: Arc<dyn EntityLocator>) -> Self {
        self.entity_locator = Some(locator);
        self
    }

    /// Apply the parameters and services of a loaded configuration.
    ///
    /// Configured services are appended in file order after anything
    /// registered so far.
    pub fn configure(
        mut self,
        config: &AppConfig,
        classes: &ServiceClasses,
    ) -> Result<Self, BuildError> {
        for (name, value) in &config.parameters {
            self.parameters.insert(name.clone(), value.clone());
        }
        for service in &config.services {
            let entry = classes
                .instantiate(&service.class, &service.name)
                .ok_or_else(|| BuildError::UnknownClass {
                    service: service.name.clone(),
                    class: service.class.clone(),
                })?;
            self.services.push(entry);
        }
        Ok(self)
    }

    /// Freeze the registry.
    ///
    /// Fails on duplicate service names. Types provided by more than one
    /// service are reported as warnings; the first registered service wins.
    pub fn build(self) -> Result<ServiceRegistry, BuildError> {
        let mut index = HashMap::with_capacity(self.services.len());
        for (position, service) in self.services.iter().enumerate() {
            if index.insert(service.name.clone(), position).is_some() {
                return Err(BuildError::DuplicateService(service.name.clone()));
            }
        }

        for (declared, names) in ambiguous(&self.services) {
            tracing::warn!(
                %declared,
                services = ?names,
                chosen = names[0],
                "ambiguous service match, first registered wins"
            );
        }

        tracing::debug!(
            services = self.services.len(),
            parameters = self.parameters.len(),
            "service registry built"
        );

        Ok(ServiceRegistry {
            services: self.services,
            index,
            parameters: self.parameters,
            entity_locator: self.entity_locator,
        })
    }
}

/// Types provided by more than one service, each with its providers in
/// registration order.
fn ambiguous(services: &[ServiceEntry]) -> Vec<(TypeRef, Vec<&str>)> {
    let mut providers: Vec<(TypeRef, Vec<&str>)> = Vec::new();
    for service in services {
        let mut seen = HashSet::new();
        for provided in service.provided_types().filter(|t| seen.insert(*t)) {
            match providers.iter_mut().find(|(t, _)| *t == provided) {
                Some((_, names)) => names.push(service.name.as_str()),
                None => providers.push((provided, vec![service.name.as_str()])),
            }
        }
    }

    providers.retain(|(_, names)| names.len() > 1);
    providers
}

thread_local! {
    /// Services whose factories are running on this thread, keyed by the
    /// address of the owning registry.
    static CONSTRUCTING: RefCell<Vec<(usize, String)>> = const { RefCell::new(Vec::new()) };
}

/// Marks a service as under construction until dropped.
struct ConstructionGuard;

impl ConstructionGuard {
    fn enter(registry: &ServiceRegistry, name: &str) -> Result<Self, ResolveError> {
        let key = registry as *const ServiceRegistry as usize;
        CONSTRUCTING.with_borrow_mut(|stack| {
            if let Some(start) = stack.iter().position(|(r, n)| *r == key && n == name) {
                let mut chain: Vec<String> = stack[start..]
                    .iter()
                    .filter(|(r, _)| *r == key)
                    .map(|(_, n)| n.clone())
                    .collect();
                chain.push(name.to_string());
                return Err(ResolveError::CircularService { chain });
            }
            stack.push((key, name.to_string()));
            Ok(ConstructionGuard)
        })
    }
}

impl Drop for ConstructionGuard {
    fn drop(&mut self) {
        CONSTRUCTING.with_borrow_mut(|stack| {
            stack.pop();
        });
    }
}

/// Frozen catalog of named services and configuration parameters.
pub struct ServiceRegistry {
    services: Vec<ServiceEntry>,
    index: HashMap<String, usize>,
    parameters: HashMap<String, Value>,
    entity_locator: Option<Arc<dyn EntityLocator>>,
}

impl ServiceRegistry {
    /// Start building a registry.
    pub fn builder() -> ServiceRegistryBuilder {
        ServiceRegistryBuilder::new()
    }

    /// An empty registry.
    pub fn empty() -> Self {
        Self {
            services: Vec::new(),
            index: HashMap::new(),
            parameters: HashMap::new(),
            entity_locator: None,
        }
    }

    /// Obtain a service as `Arc<T>`, where `T` is its implementation type or
    /// one of its views.
    pub fn get_as<T>(&self, name: &str) -> Result<Arc<T>, ResolveError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.get(name, TypeRef::of::<T>())?
            .downcast::<T>()
            .ok_or_else(|| ResolveError::MissingView {
                name: name.to_string(),
                view: TypeRef::of::<T>().name().to_string(),
            })
    }

    /// Returns true once the named service has been constructed.
    pub fn is_constructed(&self, name: &str) -> bool {
        self.entry(name)
            .is_some_and(|entry| entry.instance.get().is_some())
    }

    /// Types provided by more than one service, with the providers in
    /// registration order. Type-directed matches pick the first.
    pub fn ambiguous_matches(&self) -> Vec<(TypeRef, Vec<&str>)> {
        ambiguous(&self.services)
    }

    /// Number of registered services.
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// Returns true if no services are registered.
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    fn entry(&self, name: &str) -> Option<&ServiceEntry> {
        self.index.get(name).map(|&position| &self.services[position])
    }

    fn instance(&self, entry: &ServiceEntry) -> Result<Object, ResolveError> {
        if let Some(instance) = entry.instance.get() {
            return Ok(instance.clone());
        }

        // Entered before the cell so a cycle fails instead of blocking on it.
        let _guard = ConstructionGuard::enter(self, &entry.name)?;
        entry
            .instance
            .get_or_try_init(|| {
                tracing::debug!(service = %entry.name, "constructing service");
                (entry.factory)(self)
            })
            .cloned()
            .map_err(|source| match source.downcast::<ResolveError>() {
                Ok(inner) if matches!(*inner, ResolveError::CircularService { .. }) => *inner,
                Ok(inner) => ResolveError::ServiceConstruction {
                    name: entry.name.clone(),
                    source: inner,
                },
                Err(source) => ResolveError::ServiceConstruction {
                    name: entry.name.clone(),
                    source,
                },
            })
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::empty()
    }
}

impl ServiceProvider for ServiceRegistry {
    fn has(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    fn is_assignable(&self, name: &str, declared: TypeRef) -> bool {
        self.entry(name)
            .is_some_and(|entry| entry.is_assignable(declared))
    }

    fn service_names(&self) -> Box<dyn Iterator<Item = &str> + '_> {
        Box::new(self.services.iter().map(|entry| entry.name.as_str()))
    }

    fn get(&self, name: &str, view: TypeRef) -> Result<Object, ResolveError> {
        let entry = self
            .entry(name)
            .ok_or_else(|| ResolveError::UnknownService(name.to_string()))?;
        let missing_view = || ResolveError::MissingView {
            name: name.to_string(),
            view: view.name().to_string(),
        };

        if !entry.is_assignable(view) {
            return Err(missing_view());
        }

        let instance = self.instance(entry)?;
        if entry.implementation == view {
            return Ok(instance);
        }

        entry
            .views
            .iter()
            .find(|(provided, _)| *provided == view)
            .and_then(|(_, cast)| cast(&instance))
            .ok_or_else(missing_view)
    }

    fn has_parameter(&self, name: &str) -> bool {
        self.parameters.contains_key(name)
    }

    fn parameter(&self, name: &str) -> Option<Value> {
        self.parameters.get(name).cloned()
    }

    fn entity_locator(&self) -> Option<&dyn EntityLocator> {
        self.entity_locator.as_deref()
    }
}

impl fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field(
                "services",
                &self.services.iter().map(|s| &s.name).collect::<Vec<_>>(),
            )
            .field("parameters", &self.parameters)
            .field("entity_locator", &self.entity_locator.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    trait Greeter: Send + Sync {
        fn greet(&self) -> String;
    }

    #[derive(Debug, Default)]
    struct Plain;

    struct Polite {
        salutation: String,
    }

    impl Greeter for Polite {
        fn greet(&self) -> String {
            format!("{} World", self.salutation)
        }
    }

    #[test]
    fn test_lookup_and_views() {
        let registry = ServiceRegistry::builder()
            .register(Service::new("plain", |_| Plain))
            .register(
                Service::new("polite", |_| Polite {
                    salutation: "Hello".into(),
                })
                .provides::<dyn Greeter>(|s| s as Arc<dyn Greeter>),
            )
            .build()
            .unwrap();

        assert!(registry.has("plain"));
        assert!(!registry.has("missing"));
        assert_eq!(
            registry.service_names().collect::<Vec<_>>(),
            vec!["plain", "polite"]
        );
        assert!(registry.is_assignable("polite", TypeRef::of::<dyn Greeter>()));
        assert!(registry.is_assignable("polite", TypeRef::of::<Polite>()));
        assert!(!registry.is_assignable("plain", TypeRef::of::<dyn Greeter>()));
        assert!(!registry.is_assignable("missing", TypeRef::of::<Plain>()));

        let greeter = registry.get_as::<dyn Greeter>("polite").unwrap();
        assert_eq!(greeter.greet(), "Hello World");

        let concrete = registry.get("polite", TypeRef::of::<Polite>()).unwrap();
        let view = registry.get("polite", TypeRef::of::<dyn Greeter>()).unwrap();
        assert!(concrete.same_instance(&view));

        assert!(matches!(
            registry.get("plain", TypeRef::of::<dyn Greeter>()),
            Err(ResolveError::MissingView { .. })
        ));
        assert!(matches!(
            registry.get("missing", TypeRef::of::<Plain>()),
            Err(ResolveError::UnknownService(_))
        ));
    }

    #[test]
    fn test_construction_is_lazy_and_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let registry = ServiceRegistry::builder()
            .register(Service::new("plain", move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Plain
            }))
            .build()
            .unwrap();

        assert!(!registry.is_constructed("plain"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let a = registry.get_as::<Plain>("plain").unwrap();
        let b = registry.get_as::<Plain>("plain").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(registry.is_constructed("plain"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_concurrent_first_use_constructs_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let registry = Arc::new(
            ServiceRegistry::builder()
                .register(Service::new("plain", move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    std::thread::sleep(std::time::Duration::from_millis(10));
                    Plain
                }))
                .build()
                .unwrap(),
        );

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                std::thread::spawn(move || registry.get_as::<Plain>("plain").is_ok())
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap());
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_factory_is_retried() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let registry = ServiceRegistry::builder()
            .register(Service::try_new("flaky", move |_| {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err("not yet")
                } else {
                    Ok(Plain)
                }
            }))
            .build()
            .unwrap();

        let err = registry.get_as::<Plain>("flaky").unwrap_err();
        assert!(matches!(
            err,
            ResolveError::ServiceConstruction { ref name, .. } if name == "flaky"
        ));
        assert!(!registry.is_constructed("flaky"));

        assert!(registry.get_as::<Plain>("flaky").is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    fn needs(other: &'static str) -> impl Fn(&dyn ServiceProvider) -> Result<Plain, BoxError> {
        move |services: &dyn ServiceProvider| {
            services.get(other, TypeRef::of::<Plain>())?;
            Ok(Plain)
        }
    }

    #[test]
    fn test_circular_factories_fail_instead_of_blocking() {
        let registry = ServiceRegistry::builder()
            .register(Service::try_new("a", needs("b")))
            .register(Service::try_new("b", needs("a")))
            .register(Service::try_new("c", needs("a")))
            .build()
            .unwrap();

        for _ in 0..2 {
            match registry.get_as::<Plain>("a") {
                Err(ResolveError::CircularService { chain }) => {
                    assert_eq!(chain, vec!["a", "b", "a"]);
                }
                other => panic!("expected CircularService, got {other:?}"),
            }
        }
        match registry.get_as::<Plain>("c") {
            Err(ResolveError::CircularService { chain }) => {
                assert_eq!(chain, vec!["a", "b", "a"]);
            }
            other => panic!("expected CircularService, got {other:?}"),
        }
        assert!(!registry.is_constructed("a"));
        assert!(!registry.is_constructed("b"));
    }

    #[test]
    fn test_nested_factories_still_share_instances() {
        let registry = ServiceRegistry::builder()
            .register(Service::try_new("outer", needs("inner")))
            .register(Service::new("inner", |_| Plain))
            .build()
            .unwrap();

        registry.get_as::<Plain>("outer").unwrap();
        assert!(registry.is_constructed("inner"));
        assert!(registry.get_as::<Plain>("outer").is_ok());
    }

    #[test]
    fn test_nested_failure_names_the_outer_service() {
        let registry = ServiceRegistry::builder()
            .register(Service::try_new("outer", needs("absent")))
            .build()
            .unwrap();

        match registry.get_as::<Plain>("outer") {
            Err(ResolveError::ServiceConstruction { name, source }) => {
                assert_eq!(name, "outer");
                assert!(matches!(
                    source.downcast_ref::<ResolveError>(),
                    Some(ResolveError::UnknownService(absent)) if absent == "absent"
                ));
            }
            other => panic!("expected ServiceConstruction, got {other:?}"),
        }
    }

    #[test]
    fn test_ambiguous_matches_listed_in_registration_order() {
        let polite = |salutation: &str| {
            let salutation = salutation.to_string();
            Service::new(salutation.to_lowercase(), move |_| Polite {
                salutation: salutation.clone(),
            })
            .provides::<dyn Greeter>(|s| s as Arc<dyn Greeter>)
        };
        let registry = ServiceRegistry::builder()
            .register(polite("Hello"))
            .register(Service::new("plain", |_| Plain))
            .register(polite("Howdy"))
            .build()
            .unwrap();

        assert_eq!(
            registry.ambiguous_matches(),
            vec![
                (TypeRef::of::<Polite>(), vec!["hello", "howdy"]),
                (TypeRef::of::<dyn Greeter>(), vec!["hello", "howdy"]),
            ]
        );
        assert!(ServiceRegistry::empty().ambiguous_matches().is_empty());
    }

    #[test]
    fn test_factories_read_parameters() {
        let registry = ServiceRegistry::builder()
            .parameter("salutation", "Howdy")
            .register(Service::new("polite", |services: &dyn ServiceProvider| Polite {
                salutation: services
                    .parameter("salutation")
                    .and_then(|v| v.scalar_text())
                    .unwrap_or_default(),
            }))
            .build()
            .unwrap();

        assert!(registry.has_parameter("salutation"));
        assert_eq!(
            registry.get_as::<Polite>("polite").unwrap().greet(),
            "Howdy World"
        );
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let result = ServiceRegistry::builder()
            .register(Service::new("plain", |_| Plain))
            .register(Service::from_instance("plain", Arc::new(Plain)))
            .build();
        assert_eq!(
            result.err(),
            Some(BuildError::DuplicateService("plain".into()))
        );
    }

    #[test]
    fn test_from_instance_shares_the_arc() {
        let shared = Arc::new(Plain);
        let registry = ServiceRegistry::builder()
            .register(Service::from_instance("plain", shared.clone()))
            .build()
            .unwrap();
        assert!(Arc::ptr_eq(&registry.get_as::<Plain>("plain").unwrap(), &shared));
    }
}
