//! # rivet - Parameter-Resolving Request Dispatcher
//!
//! `rivet` routes a request to a handler method, constructs the handler and
//! calls it, supplying every parameter from explicit route values, a service
//! registry, the current request or declared defaults. A handler-local
//! `before` hook and an application-level hook can stop dispatch by
//! returning `false` or a response.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use rivet::prelude::*;
//! use std::sync::Arc;
//!
//! #[derive(Default)]
//! struct Greeter;
//!
//! struct Controller {
//!     greeter: Arc<Greeter>,
//!     id: i64,
//! }
//!
//! impl Injectable for Controller {
//!     fn definition() -> HandlerDefinition<Self> {
//!         HandlerDefinition::new(
//!             "Controller",
//!             vec![
//!                 ParameterDescriptor::typed::<Greeter>("greeter"),
//!                 ParameterDescriptor::named("id").with_default(317),
//!             ],
//!             |greeter: Arc<Greeter>, id: i64| Controller { greeter, id },
//!         )
//!         .method(
//!             "show",
//!             vec![ParameterDescriptor::named("id")],
//!             |_: &mut Controller, id: i64| format!("showing {id}"),
//!         )
//!     }
//! }
//!
//! let services = ServiceRegistry::builder()
//!     .register(Service::new("greeter", |_| Greeter))
//!     .build()?;
//! let dispatcher = Dispatcher::builder()
//!     .services(Arc::new(services))
//!     .handler::<Controller>()
//!     .routes(PatternRouteResolver::builder().route("/show/{id}", "Controller::show")?.build()?)
//!     .build()?;
//!
//! let response = dispatcher.handle(Request::get("/show/155"));
//! assert_eq!(response.body(), "showing 155");
//! ```
//!
//! With the `macros` feature, `#[handler]` writes the [`Injectable`] impl
//! from an ordinary `impl` block.
//!
//! ## Features
//!
//! - `matchit` (default): [`PatternRouteResolver`]
//! - `macros`: the `#[handler]` attribute
//! - `inventory`: handler self-registration and
//!   [`DispatcherBuilder::collect_registered`]

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

// Values
pub use rivet_core::{Object, RawParameters, Request, Response, TypeRef, Value};

// Handlers
pub use rivet_core::{
    Arguments, CONSTRUCTOR, Constructor, DynHandler, FromValue, HandlerDefinition, Injectable,
    Instance, IntoValue, Method, ParameterDescriptor,
};

// Seams
pub use rivet_core::{
    EntityLocator, InvocationTarget, RouteMatch, RouteResolver, RouteResult, ServiceProvider,
};

// Errors
pub use rivet_core::{
    BoxError, BuildError, CallError, DispatchError, ExtractError, InvokeError, ResolveError,
};

// Engine
pub use rivet_std::{
    catalog::{HandlerCatalog, HandlerCatalogBuilder},
    chain::{BEFORE, InvocationChain, Outcome},
    config::{AppConfig, ConfigError, RouteConfig, ServiceConfig},
    dispatch::{Dispatcher, DispatcherBuilder},
    registry::{Service, ServiceClasses, ServiceRegistry, ServiceRegistryBuilder},
    resolve::{Binding, BindingSource, CallSite, ParameterResolver},
    response::{JSON_CONTENT_TYPE, into_response},
};

// Routing
pub use rivet_std::routing::{RouteTableBuilder, StaticRouteResolver, StaticRouteResolverBuilder};

#[cfg(feature = "matchit")]
pub use rivet_std::routing::{PatternRouteResolver, PatternRouteResolverBuilder};

/// Testing utilities.
pub mod testing {
    pub use rivet_std::testing::{CallRecorder, InMemoryEntityLocator};
}

/// Prelude module - common imports for Rivet.
///
/// # Usage
///
/// ```rust,ignore
/// use rivet::prelude::*;
/// ```
pub mod prelude {
    #[cfg(feature = "matchit")]
    pub use crate::PatternRouteResolver;
    pub use crate::{
        BuildError, DispatchError, Dispatcher, HandlerDefinition, Injectable, Object,
        ParameterDescriptor, RawParameters, Request, Response, RouteTableBuilder, Service,
        ServiceRegistry, StaticRouteResolver, Value,
    };
}

#[cfg(feature = "macros")]
pub use rivet_macros::handler;

#[cfg(feature = "inventory")]
pub use rivet_std::catalog::HandlerRegistration;

#[cfg(feature = "inventory")]
pub use inventory;
