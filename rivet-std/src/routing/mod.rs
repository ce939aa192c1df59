//! # Route Resolvers
//!
//! Tables mapping request paths to handler identities, built through a
//! [`RouteTableBuilder`] so backends can be swapped:
//!
//! - [`StaticRouteResolver`] - exact path lookup in a `HashMap`
//! - [`PatternRouteResolver`] - `matchit` patterns such as `/blubb/{id}`
//!   (feature `matchit`)
//!
//! Each route may declare default parameters. Values captured from the path
//! take precedence over defaults.

#[cfg(feature = "matchit")]
mod pattern;

#[cfg(feature = "matchit")]
pub use pattern::{PatternRouteResolver, PatternRouteResolverBuilder};

use crate::config::RouteConfig;
use rivet_core::{
    BuildError, InvocationTarget, RawParameters, RouteMatch, RouteResolver, RouteResult,
};
use std::collections::HashMap;

/// Builder interface shared by the route table backends.
pub trait RouteTableBuilder: Default {
    /// The resolver this builder produces.
    type Resolver: RouteResolver;

    /// Add a route. Fails if the path is already taken or malformed.
    fn insert(
        &mut self,
        path: &str,
        target: InvocationTarget,
        defaults: RawParameters,
    ) -> Result<(), BuildError>;

    /// Build the resolver.
    fn build(self) -> Result<Self::Resolver, BuildError>;

    /// Build a resolver from configured routes.
    fn from_config(routes: &[RouteConfig]) -> Result<Self::Resolver, BuildError> {
        let mut builder = Self::default();
        for route in routes {
            builder.insert(&route.path, route.target.clone(), route.defaults.clone())?;
        }
        builder.build()
    }
}

/// A route's destination and default parameters.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Route {
    pub(crate) target: InvocationTarget,
    pub(crate) defaults: RawParameters,
}

impl Route {
    /// Merge captured parameters over the defaults.
    pub(crate) fn matched(&self, captured: RawParameters) -> RouteMatch {
        let mut parameters = self.defaults.clone();
        parameters.extend(captured);
        RouteMatch::new(self.target.clone()).with_parameters(parameters)
    }
}

/// Exact-path route table.
#[derive(Debug, Default)]
pub struct StaticRouteResolver {
    routes: HashMap<String, Route>,
}

impl StaticRouteResolver {
    /// Start building a table.
    pub fn builder() -> StaticRouteResolverBuilder {
        StaticRouteResolverBuilder::default()
    }

    /// Build a table from configured routes.
    pub fn from_config(routes: &[RouteConfig]) -> Result<Self, BuildError> {
        <StaticRouteResolverBuilder as RouteTableBuilder>::from_config(routes)
    }
}

impl RouteResolver for StaticRouteResolver {
    fn resolve(&self, path: &str) -> RouteResult {
        match self.routes.get(path) {
            Some(route) => RouteResult::Matched(route.matched(RawParameters::new())),
            None => RouteResult::NotFound,
        }
    }

    fn targets(&self) -> Vec<InvocationTarget> {
        self.routes.values().map(|r| r.target.clone()).collect()
    }
}

/// Builder for [`StaticRouteResolver`].
#[derive(Debug, Default)]
pub struct StaticRouteResolverBuilder {
    routes: HashMap<String, Route>,
}

impl StaticRouteResolverBuilder {
    /// Builder-style [`RouteTableBuilder::insert`] without defaults.
    pub fn route(mut self, path: &str, target: &str) -> Result<Self, BuildError> {
        self.insert(path, InvocationTarget::parse(target)?, RawParameters::new())?;
        Ok(self)
    }
}

impl RouteTableBuilder for StaticRouteResolverBuilder {
    type Resolver = StaticRouteResolver;

    fn insert(
        &mut self,
        path: &str,
        target: InvocationTarget,
        defaults: RawParameters,
    ) -> Result<(), BuildError> {
        if self.routes.contains_key(path) {
            return Err(BuildError::DuplicateRoute(path.to_string()));
        }
        self.routes
            .insert(path.to_string(), Route { target, defaults });
        Ok(())
    }

    fn build(self) -> Result<Self::Resolver, BuildError> {
        Ok(StaticRouteResolver {
            routes: self.routes,
        })
    }
}
