//! Matchit-based route table.
//!
//! Patterns use `matchit` syntax: `/blubb/{id}` captures one segment,
//! `/assets/{*path}` captures the rest of the path.

use super::{Route, RouteTableBuilder};
use crate::config::RouteConfig;
use matchit::{InsertError, Match, Router as InnerRouter};
use rivet_core::{BuildError, InvocationTarget, RawParameters, RouteResolver, RouteResult};

/// A route table based on `matchit`.
pub struct PatternRouteResolver {
    router: InnerRouter<Route>,
    targets: Vec<InvocationTarget>,
}

impl PatternRouteResolver {
    /// Start building a table.
    pub fn builder() -> PatternRouteResolverBuilder {
        PatternRouteResolverBuilder::default()
    }

    /// Build a table from configured routes.
    pub fn from_config(routes: &[RouteConfig]) -> Result<Self, BuildError> {
        <PatternRouteResolverBuilder as RouteTableBuilder>::from_config(routes)
    }
}

impl RouteResolver for PatternRouteResolver {
    fn resolve(&self, path: &str) -> RouteResult {
        match self.router.at(path) {
            Ok(Match { value, params }) => {
                RouteResult::Matched(value.matched(params.iter().collect()))
            }
            Err(_) => RouteResult::NotFound,
        }
    }

    fn targets(&self) -> Vec<InvocationTarget> {
        self.targets.clone()
    }
}

/// Builder for [`PatternRouteResolver`].
pub struct PatternRouteResolverBuilder {
    router: InnerRouter<Route>,
    targets: Vec<InvocationTarget>,
}

impl Default for PatternRouteResolverBuilder {
    fn default() -> Self {
        Self {
            router: InnerRouter::new(),
            targets: Vec::new(),
        }
    }
}

impl PatternRouteResolverBuilder {
    /// Builder-style [`RouteTableBuilder::insert`] without defaults.
    pub fn route(mut self, path: &str, target: &str) -> Result<Self, BuildError> {
        self.insert(path, InvocationTarget::parse(target)?, RawParameters::new())?;
        Ok(self)
    }
}

impl RouteTableBuilder for PatternRouteResolverBuilder {
    type Resolver = PatternRouteResolver;

    fn insert(
        &mut self,
        path: &str,
        target: InvocationTarget,
        defaults: RawParameters,
    ) -> Result<(), BuildError> {
        let route = Route {
            target: target.clone(),
            defaults,
        };
        self.router.insert(path, route).map_err(|e| match e {
            InsertError::Conflict { .. } => BuildError::DuplicateRoute(path.to_string()),
            other => BuildError::InvalidRoute {
                route: path.to_string(),
                reason: other.to_string(),
            },
        })?;
        self.targets.push(target);
        Ok(())
    }

    fn build(self) -> Result<Self::Resolver, BuildError> {
        Ok(PatternRouteResolver {
            router: self.router,
            targets: self.targets,
        })
    }
}
