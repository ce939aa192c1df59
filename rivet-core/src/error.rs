//! Error types for Rivet.
//!
//! Errors are layered the way a request travels through the engine:
//!
//! - [`ExtractError`] - a bound value does not fit the Rust argument type
//! - [`CallError`] - a type-erased constructor or method call failed
//! - [`ResolveError`] - a parameter could not be bound
//! - [`InvokeError`] - an invocation chain failed
//! - [`DispatchError`] - top-level, per-request failure
//! - [`BuildError`] - invalid configuration detected while building

use crate::value::Value;
use thiserror::Error;

/// A boxed error type for collaborator and handler failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A bound value could not be converted into the declared argument type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot bind {found}{} (expected {expected})", parameter_suffix(.parameter))]
pub struct ExtractError {
    parameter: Option<String>,
    expected: &'static str,
    found: String,
}

impl ExtractError {
    /// A value of the wrong shape was bound.
    pub fn mismatch(expected: &'static str, found: &Value) -> Self {
        Self {
            parameter: None,
            expected,
            found: found.describe(),
        }
    }

    /// Attach the name of the parameter being extracted.
    pub fn for_parameter(mut self, name: &str) -> Self {
        self.parameter = Some(name.to_string());
        self
    }

    /// The parameter name, once known.
    pub fn parameter(&self) -> Option<&str> {
        self.parameter.as_deref()
    }

    /// The Rust type the callable expected.
    pub fn expected(&self) -> &'static str {
        self.expected
    }

    /// Description of the value that was bound.
    pub fn found(&self) -> &str {
        &self.found
    }
}

fn parameter_suffix(parameter: &Option<String>) -> String {
    parameter
        .as_ref()
        .map(|name| format!(" to parameter `{name}`"))
        .unwrap_or_default()
}

/// Failure of a single type-erased constructor or method call.
#[derive(Error, Debug)]
pub enum CallError {
    /// An argument could not be extracted.
    #[error(transparent)]
    Argument(#[from] ExtractError),

    /// The method is not part of the handler's table.
    #[error("unknown method `{0}`")]
    UnknownMethod(String),

    /// The instance passed in was built by a different handler.
    #[error("instance is not a `{expected}`")]
    InstanceMismatch {
        /// Type the handler operates on.
        expected: &'static str,
    },

    /// The callable itself returned an error.
    #[error(transparent)]
    Failed(BoxError),
}

/// A parameter could not be bound.
#[derive(Error, Debug)]
pub enum ResolveError {
    /// Every resolution rule was exhausted.
    #[error("cannot pass parameter `{parameter}` to {handler}::{method}")]
    MissingDependency {
        /// Declaring handler.
        handler: String,
        /// Declaring method (`new` for constructors).
        method: String,
        /// Parameter name.
        parameter: String,
    },

    /// The entity locator signalled a failure (not a plain "not found").
    #[error("entity lookup {entity}::findOneBy{field} failed")]
    EntityLookup {
        /// Entity type name.
        entity: String,
        /// Field the lookup was keyed on.
        field: String,
        /// Locator error.
        #[source]
        source: BoxError,
    },

    /// A service factory failed on first use.
    #[error("service `{name}` could not be constructed")]
    ServiceConstruction {
        /// Service name.
        name: String,
        /// Factory error.
        #[source]
        source: BoxError,
    },

    /// No service is registered under the name.
    #[error("no service named `{0}`")]
    UnknownService(String),

    /// The service does not provide the requested view.
    #[error("service `{name}` does not provide `{view}`")]
    MissingView {
        /// Service name.
        name: String,
        /// Requested view type.
        view: String,
    },

    /// Service factories depend on each other in a cycle.
    #[error("circular service dependency: {}", chain.join(" -> "))]
    CircularService {
        /// Services under construction, ending with the one requested again.
        chain: Vec<String>,
    },
}

impl ResolveError {
    /// Returns true for [`ResolveError::MissingDependency`].
    pub fn is_missing_dependency(&self) -> bool {
        matches!(self, ResolveError::MissingDependency { .. })
    }
}

/// An invocation chain failed.
#[derive(Error, Debug)]
pub enum InvokeError {
    /// Parameter resolution failed.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// No handler is registered under the name.
    #[error("no handler named `{0}`")]
    UnknownHandler(String),

    /// The handler has no such method.
    #[error("handler `{handler}` has no method `{method}`")]
    UnknownMethod {
        /// Handler name.
        handler: String,
        /// Method name.
        method: String,
    },

    /// A resolved value did not fit the argument type.
    #[error("invalid argument for {target}")]
    Argument {
        /// `Type::method` being invoked.
        target: String,
        /// Extraction failure.
        #[source]
        source: ExtractError,
    },

    /// The constructor or method returned an error.
    #[error("{target} failed")]
    Failed {
        /// `Type::method` being invoked.
        target: String,
        /// Handler error.
        #[source]
        source: BoxError,
    },
}

impl InvokeError {
    /// Attach call-site context to a [`CallError`].
    pub fn from_call(handler: &str, method: &str, error: CallError) -> Self {
        let target = format!("{handler}::{method}");
        match error {
            CallError::Argument(source) => InvokeError::Argument { target, source },
            CallError::UnknownMethod(method) => InvokeError::UnknownMethod {
                handler: handler.to_string(),
                method,
            },
            CallError::Failed(source) => InvokeError::Failed { target, source },
            mismatch @ CallError::InstanceMismatch { .. } => InvokeError::Failed {
                target,
                source: Box::new(mismatch),
            },
        }
    }
}

/// Top-level, per-request failure.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// No route matched the request path.
    #[error("no route found for path `{0}`")]
    RouteNotFound(String),

    /// The matched handler could not be invoked.
    #[error(transparent)]
    Invoke(#[from] InvokeError),
}

impl DispatchError {
    /// The status code a response-coercion layer should present.
    pub fn status_code(&self) -> u16 {
        match self {
            DispatchError::RouteNotFound(_) => 404,
            DispatchError::Invoke(_) => 500,
        }
    }

    /// Returns true if a parameter could not be bound.
    pub fn is_missing_dependency(&self) -> bool {
        matches!(
            self,
            DispatchError::Invoke(InvokeError::Resolve(err)) if err.is_missing_dependency()
        )
    }
}

impl From<ResolveError> for DispatchError {
    fn from(err: ResolveError) -> Self {
        DispatchError::Invoke(InvokeError::Resolve(err))
    }
}

/// Invalid configuration detected while building registries and tables.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// Two services share a name.
    #[error("service `{0}` is already registered")]
    DuplicateService(String),

    /// Two handlers share a name.
    #[error("handler `{0}` is already registered")]
    DuplicateHandler(String),

    /// A handler declares the same method twice.
    #[error("handler `{handler}` declares method `{method}` twice")]
    DuplicateMethod {
        /// Handler name.
        handler: String,
        /// Method name.
        method: String,
    },

    /// Two routes share a key.
    #[error("route `{0}` is already registered")]
    DuplicateRoute(String),

    /// A descriptor list does not match its function.
    #[error("{target} declares {declared} parameters but its function takes {arity}")]
    ArityMismatch {
        /// `Type::method`.
        target: String,
        /// Number of descriptors.
        declared: usize,
        /// Number of function arguments.
        arity: usize,
    },

    /// A handler identity is not of the form `Type::method`.
    #[error("invalid invocation target `{0}` (expected `Type::method`)")]
    InvalidTarget(String),

    /// A target names no registered handler method.
    #[error("invocation target `{0}` does not name a registered handler method")]
    UnknownTarget(String),

    /// A route pattern was rejected.
    #[error("invalid route `{route}`: {reason}")]
    InvalidRoute {
        /// Route path.
        route: String,
        /// Why the router rejected it.
        reason: String,
    },

    /// A configured service refers to an unregistered class.
    #[error("unknown class `{class}` for service `{service}`")]
    UnknownClass {
        /// Service name.
        service: String,
        /// Class name.
        class: String,
    },
}
