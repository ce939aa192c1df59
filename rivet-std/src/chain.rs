//! # Invocation Chain
//!
//! Applies construct, optional `before` hook and main method to one handler:
//!
//! 1. Resolve the constructor parameters and build an instance.
//! 2. If requested and the handler declares a `before` method, resolve its
//!    parameters and call it. A short-circuit value (`false` or a response)
//!    ends the chain and is returned as is.
//! 3. Resolve the main method's parameters, call it and return its result
//!    unchanged.
//!
//! Every step resolves parameters from the same raw values.

use crate::{
    catalog::HandlerCatalog,
    resolve::{CallSite, ParameterResolver},
};
use rivet_core::{
    CONSTRUCTOR, DynHandler, Instance, InvocationTarget, InvokeError, Object, RawParameters,
    Request, ServiceProvider, Value,
};
use std::sync::Arc;

/// Name of the per-handler hook method.
pub const BEFORE: &str = "before";

/// Result of an invocation chain.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    /// The main method ran and returned this value.
    Completed(Value),
    /// A hook returned a short-circuit value; the main method did not run.
    ShortCircuited(Value),
}

impl Outcome {
    /// Returns true if a hook stopped the chain.
    pub fn is_short_circuited(&self) -> bool {
        matches!(self, Outcome::ShortCircuited(_))
    }

    /// Borrow the resulting value.
    pub fn value(&self) -> &Value {
        match self {
            Outcome::Completed(v) | Outcome::ShortCircuited(v) => v,
        }
    }

    /// Take the resulting value.
    pub fn into_value(self) -> Value {
        match self {
            Outcome::Completed(v) | Outcome::ShortCircuited(v) => v,
        }
    }
}

/// Builds handlers and calls their methods with resolved parameters.
pub struct InvocationChain<'a> {
    handlers: &'a HandlerCatalog,
    resolver: ParameterResolver<'a>,
}

impl<'a> InvocationChain<'a> {
    /// A chain for one request.
    pub fn new(
        services: &'a dyn ServiceProvider,
        handlers: &'a HandlerCatalog,
        request: Arc<Request>,
    ) -> Self {
        Self {
            handlers,
            resolver: ParameterResolver::new(services, Object::new(request)),
        }
    }

    /// Construct a handler instance.
    pub fn construct(&self, handler: &str, raw: &RawParameters) -> Result<Instance, InvokeError> {
        let table = self.handler(handler)?;
        self.construct_with(table.as_ref(), raw)
    }

    /// Call a method on an instance built by [`InvocationChain::construct`].
    pub fn call_method(
        &self,
        handler: &str,
        instance: &mut Instance,
        method: &str,
        raw: &RawParameters,
    ) -> Result<Value, InvokeError> {
        let table = self.handler(handler)?;
        self.call_with(table.as_ref(), instance, method, raw)
    }

    /// Run the chain for a target.
    pub fn invoke(
        &self,
        target: &InvocationTarget,
        raw: &RawParameters,
        run_before_hook: bool,
    ) -> Result<Outcome, InvokeError> {
        let span = tracing::debug_span!("invoke", %target, run_before_hook);
        let _enter = span.enter();

        let table = self.handler(target.handler())?;
        if table.method_parameters(target.method()).is_none() {
            return Err(InvokeError::UnknownMethod {
                handler: target.handler().to_string(),
                method: target.method().to_string(),
            });
        }

        let mut instance = self.construct_with(table.as_ref(), raw)?;

        if run_before_hook && table.method_parameters(BEFORE).is_some() {
            let result = self.call_with(table.as_ref(), &mut instance, BEFORE, raw)?;
            if result.is_short_circuit() {
                tracing::debug!(result = result.kind(), "before hook short-circuited");
                return Ok(Outcome::ShortCircuited(result));
            }
        }

        self.call_with(table.as_ref(), &mut instance, target.method(), raw)
            .map(Outcome::Completed)
    }

    fn handler(&self, name: &str) -> Result<&'a Arc<dyn DynHandler>, InvokeError> {
        self.handlers
            .get(name)
            .ok_or_else(|| InvokeError::UnknownHandler(name.to_string()))
    }

    fn construct_with(
        &self,
        table: &dyn DynHandler,
        raw: &RawParameters,
    ) -> Result<Instance, InvokeError> {
        let site = CallSite::new(table.name(), CONSTRUCTOR);
        let args = self
            .resolver
            .arguments(site, table.constructor_parameters(), raw)?;
        table
            .construct(args)
            .map_err(|e| InvokeError::from_call(table.name(), CONSTRUCTOR, e))
    }

    fn call_with(
        &self,
        table: &dyn DynHandler,
        instance: &mut Instance,
        method: &str,
        raw: &RawParameters,
    ) -> Result<Value, InvokeError> {
        let parameters = table
            .method_parameters(method)
            .ok_or_else(|| InvokeError::UnknownMethod {
                handler: table.name().to_string(),
                method: method.to_string(),
            })?;
        let args = self
            .resolver
            .arguments(CallSite::new(table.name(), method), parameters, raw)?;
        table
            .call(instance, method, args)
            .map_err(|e| InvokeError::from_call(table.name(), method, e))
    }
}
