//! # Dispatch Orchestrator
//!
//! Sequences one request:
//!
//! ```text
//! ROUTE_MATCH -> (no match: RouteNotFound)
//!             -> APP_BEFORE_HOOK?     -> short-circuit -> DONE
//!             -> HANDLER_BEFORE_HOOK? -> short-circuit -> DONE
//!             -> HANDLER_ACTION       -> DONE
//! ```
//!
//! The application-level hook is invoked through the same chain as the
//! matched handler, with the route parameters, but without its own `before`
//! hook. [`Dispatcher::handle`] adds response coercion on top of
//! [`Dispatcher::dispatch`].
//!
//! [`Dispatcher::from_config`] prepares a builder from a loaded
//! configuration, so an application directory becomes a running dispatcher
//! in a few lines:
//!
//! ```rust,ignore
//! let config = AppConfig::load_dir("config")?;
//! let dispatcher = Dispatcher::from_config(&config, &classes, ServiceRegistry::builder())?
//!     .handler::<Controller>()
//!     .build()?;
//! ```

use crate::{
    catalog::{HandlerCatalog, HandlerCatalogBuilder},
    chain::InvocationChain,
    config::AppConfig,
    registry::{ServiceClasses, ServiceRegistry, ServiceRegistryBuilder},
    resolve::ParameterResolver,
    response::into_response,
    routing::StaticRouteResolver,
};
use rivet_core::{
    BuildError, CONSTRUCTOR, DispatchError, DynHandler, HandlerDefinition, Injectable,
    InvocationTarget, ParameterDescriptor, Request, Response, RouteResolver, RouteResult,
    ServiceProvider, Value,
};
use std::sync::Arc;

#[cfg(feature = "matchit")]
type ConfiguredRoutes = crate::routing::PatternRouteResolver;
#[cfg(not(feature = "matchit"))]
type ConfiguredRoutes = StaticRouteResolver;

/// Builder for [`Dispatcher`].
#[derive(Default)]
pub struct DispatcherBuilder {
    services: Option<Arc<ServiceRegistry>>,
    handlers: HandlerCatalogBuilder,
    routes: Option<Box<dyn RouteResolver>>,
    before: Option<String>,
}

impl DispatcherBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use this service registry. Defaults to an empty one.
    pub fn services(mut self, services: Arc<ServiceRegistry>) -> Self {
        self.services = Some(services);
        self
    }

    /// Register a handler type by its own definition.
    pub fn handler<T: Injectable>(mut self) -> Self {
        self.handlers = self.handlers.handler::<T>();
        self
    }

    /// Register a handler definition.
    pub fn definition<H: Send + 'static>(mut self, definition: HandlerDefinition<H>) -> Self {
        self.handlers = self.handlers.definition(definition);
        self
    }

    /// Register an already erased handler.
    pub fn dyn_handler(mut self, handler: Arc<dyn DynHandler>) -> Self {
        self.handlers = self.handlers.dyn_handler(handler);
        self
    }

    /// Register every handler submitted through `inventory`.
    #[cfg(feature = "inventory")]
    pub fn collect_registered(mut self) -> Self {
        self.handlers = self.handlers.collect_registered();
        self
    }

    /// Use this route table. Defaults to one that matches nothing.
    pub fn routes(mut self, routes: impl RouteResolver + 'static) -> Self {
        self.routes = Some(Box::new(routes));
        self
    }

    /// Install an application-level hook, `Type::method`, run before every
    /// matched handler.
    pub fn before(mut self, target: impl Into<String>) -> Self {
        self.before = Some(target.into());
        self
    }

    /// Validate handler tables, the hook target and every route target.
    ///
    /// Parameters that can never be bound without a raw value are logged as
    /// warnings.
    pub fn build(self) -> Result<Dispatcher, BuildError> {
        let handlers = self.handlers.build()?;
        let services = self
            .services
            .unwrap_or_else(|| Arc::new(ServiceRegistry::empty()));
        let routes = self
            .routes
            .unwrap_or_else(|| Box::new(StaticRouteResolver::default()));

        let before = self
            .before
            .as_deref()
            .map(InvocationTarget::parse)
            .transpose()?;
        if let Some(target) = &before {
            handlers.check_target(target)?;
        }
        for target in routes.targets() {
            handlers.check_target(&target)?;
        }

        warn_unsatisfiable(services.as_ref(), &handlers);

        tracing::debug!(
            handlers = handlers.len(),
            services = services.len(),
            before = ?before,
            "dispatcher built"
        );

        Ok(Dispatcher {
            services,
            handlers,
            routes,
            before,
        })
    }
}

fn warn_unsatisfiable(services: &ServiceRegistry, handlers: &HandlerCatalog) {
    let resolver = ParameterResolver::without_request(services);
    let entity_backed = |descriptor: &ParameterDescriptor| {
        descriptor.declared_type().is_some_and(|declared| {
            services
                .entity_locator()
                .is_some_and(|locator| locator.handles(declared))
        })
    };

    for handler in handlers.iter() {
        let callables = std::iter::once((CONSTRUCTOR, handler.constructor_parameters())).chain(
            handler.methods().into_iter().filter_map(|method| {
                handler
                    .method_parameters(method)
                    .map(|parameters| (method, parameters))
            }),
        );
        for (method, parameters) in callables {
            for descriptor in parameters {
                if descriptor.declared_type().is_some()
                    && !entity_backed(descriptor)
                    && !resolver.is_statically_satisfiable(descriptor)
                {
                    tracing::warn!(
                        handler = handler.name(),
                        method,
                        parameter = descriptor.name(),
                        "typed parameter has no service, request or default to bind"
                    );
                }
            }
        }
    }
}

/// Routes requests to handlers and runs their invocation chains.
pub struct Dispatcher {
    services: Arc<ServiceRegistry>,
    handlers: HandlerCatalog,
    routes: Box<dyn RouteResolver>,
    before: Option<InvocationTarget>,
}

impl Dispatcher {
    /// Start building a dispatcher.
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::new()
    }

    /// A builder prepared from a loaded configuration.
    ///
    /// The configured parameters and services are added to `services`,
    /// which is then frozen. The configured routes become the route table,
    /// read as `matchit` patterns when that feature is enabled and as exact
    /// paths otherwise. Handlers and the application hook are still added on
    /// the returned builder.
    pub fn from_config(
        config: &AppConfig,
        classes: &ServiceClasses,
        services: ServiceRegistryBuilder,
    ) -> Result<DispatcherBuilder, BuildError> {
        let services = services.configure(config, classes)?.build()?;
        let routes = ConfiguredRoutes::from_config(&config.routes)?;
        Ok(DispatcherBuilder::new()
            .services(Arc::new(services))
            .routes(routes))
    }

    /// The service registry shared by every request.
    pub fn services(&self) -> &Arc<ServiceRegistry> {
        &self.services
    }

    /// The registered handlers.
    pub fn handlers(&self) -> &HandlerCatalog {
        &self.handlers
    }

    /// Dispatch a request and return the raw result value.
    pub fn dispatch(&self, request: Request) -> Result<Value, DispatchError> {
        let span = tracing::info_span!(
            "dispatch",
            method = request.method(),
            path = request.path()
        );
        let _enter = span.enter();

        let request = Arc::new(request);
        let route = match self.routes.resolve(request.path()) {
            RouteResult::Matched(route) => route,
            RouteResult::NotFound => {
                return Err(DispatchError::RouteNotFound(request.path().to_string()));
            }
        };
        tracing::debug!(handler = %route.target, "route matched");

        let chain = InvocationChain::new(self.services.as_ref(), &self.handlers, request.clone());

        if let Some(before) = &self.before {
            let result = chain.invoke(before, &route.parameters, false)?.into_value();
            if result.is_short_circuit() {
                tracing::debug!(hook = %before, "application before hook short-circuited");
                return Ok(result);
            }
        }

        Ok(chain
            .invoke(&route.target, &route.parameters, true)?
            .into_value())
    }

    /// Dispatch a request and coerce the result into a response.
    ///
    /// Failures are logged and presented as `404 Not Found` (no route) or
    /// `500 Internal Server Error` (everything else).
    pub fn handle(&self, request: Request) -> Response {
        match self.dispatch(request) {
            Ok(value) => into_response(value),
            Err(err) => {
                let status = err.status_code();
                tracing::error!(error = %err, status, "request failed");
                match err {
                    DispatchError::RouteNotFound(_) => Response::not_found(),
                    DispatchError::Invoke(_) => Response::internal_error(),
                }
            }
        }
    }
}
