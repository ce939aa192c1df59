//! Handler identities and route resolution.

use crate::{error::BuildError, parameter::RawParameters};
use std::{fmt, str::FromStr};

/// A handler identity of the form `Type::method`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct InvocationTarget {
    handler: String,
    method: String,
}

impl InvocationTarget {
    /// Build a target from its parts.
    pub fn new(handler: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            handler: handler.into(),
            method: method.into(),
        }
    }

    /// Parse `Type::method`. The split happens at the last `::`, and both
    /// sides must be non-empty.
    pub fn parse(target: &str) -> Result<Self, BuildError> {
        match target.rsplit_once("::") {
            Some((handler, method)) if !handler.is_empty() && !method.is_empty() => {
                Ok(Self::new(handler, method))
            }
            _ => Err(BuildError::InvalidTarget(target.to_string())),
        }
    }

    /// Handler name.
    pub fn handler(&self) -> &str {
        &self.handler
    }

    /// Method name.
    pub fn method(&self) -> &str {
        &self.method
    }
}

impl FromStr for InvocationTarget {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for InvocationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.handler, self.method)
    }
}

/// The outcome of resolving a path: a handler identity plus route
/// parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct RouteMatch {
    /// Handler to invoke.
    pub target: InvocationTarget,
    /// Named parameters captured from the path or declared as defaults.
    pub parameters: RawParameters,
}

impl RouteMatch {
    /// A match without parameters.
    pub fn new(target: InvocationTarget) -> Self {
        Self {
            target,
            parameters: RawParameters::new(),
        }
    }

    /// Attach route parameters.
    pub fn with_parameters(mut self, parameters: RawParameters) -> Self {
        self.parameters = parameters;
        self
    }
}

/// Result of a route lookup.
#[derive(Clone, Debug, PartialEq)]
pub enum RouteResult {
    /// A route matched.
    Matched(RouteMatch),
    /// No route matched.
    NotFound,
}

impl RouteResult {
    /// Returns true if a route matched.
    pub fn is_matched(&self) -> bool {
        matches!(self, RouteResult::Matched(_))
    }

    /// Convert into an `Option`.
    pub fn into_match(self) -> Option<RouteMatch> {
        match self {
            RouteResult::Matched(m) => Some(m),
            RouteResult::NotFound => None,
        }
    }
}

/// Maps request paths to handler identities.
pub trait RouteResolver: Send + Sync {
    /// Resolve a path.
    fn resolve(&self, path: &str) -> RouteResult;

    /// Every target this resolver can produce, for validation at build time.
    fn targets(&self) -> Vec<InvocationTarget> {
        Vec::new()
    }
}

impl<F> RouteResolver for F
where
    F: Fn(&str) -> RouteResult + Send + Sync,
{
    fn resolve(&self, path: &str) -> RouteResult {
        self(path)
    }
}
