//! # rivet-core
//!
//! Data model and seams for the Rivet parameter-resolving dispatcher.
//!
//! This crate holds no engine logic. It defines what the engine moves around
//! and the traits collaborators implement, so that plugins can depend on it
//! without pulling in `rivet-std`.
//!
//! # Data Model
//!
//! - [`Value`] / [`Object`] - dynamic values and type-tagged shared instances
//! - [`Request`] / [`Response`] - the ambient request and response-shaped values
//! - [`ParameterDescriptor`] / [`RawParameters`] - what a callable declares,
//!   and what one invocation supplies
//!
//! # Callable Tables
//!
//! Handlers describe their constructor and methods with explicit descriptor
//! lists instead of runtime reflection. See [`HandlerDefinition`],
//! [`DynHandler`] and [`Injectable`].
//!
//! # Seams
//!
//! - [`ServiceProvider`] - named services and configuration scalars
//! - [`EntityLocator`] - domain object lookup by field
//! - [`RouteResolver`] - path to [`InvocationTarget`]
//!
//! # Error Types
//!
//! - [`ResolveError`] - a parameter could not be bound
//! - [`InvokeError`] - an invocation chain failed
//! - [`DispatchError`] - top-level request failure
//! - [`BuildError`] - invalid registration detected at startup

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

mod error;
mod extract;
mod handler;
mod parameter;
mod request;
mod response;
mod router;
mod service;
mod types;
mod value;

pub use error::{
    BoxError, BuildError, CallError, DispatchError, ExtractError, InvokeError, ResolveError,
};
pub use extract::{Arguments, FromValue, IntoValue};
pub use handler::{
    CONSTRUCTOR, Constructor, DynHandler, HandlerDefinition, Injectable, Instance, Method,
};
pub use parameter::{ParameterDescriptor, RawParameters};
pub use request::Request;
pub use response::Response;
pub use router::{InvocationTarget, RouteMatch, RouteResolver, RouteResult};
pub use service::{EntityLocator, ServiceProvider};
pub use types::TypeRef;
pub use value::{Object, Value};
