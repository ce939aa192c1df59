//! # rivet-std
//!
//! The Rivet engine and its standard collaborators.
//!
//! This crate provides:
//! - **Services**: [`ServiceRegistry`](registry::ServiceRegistry) with lazy,
//!   once-only construction
//! - **Resolution**: [`ParameterResolver`](resolve::ParameterResolver)
//! - **Invocation**: [`InvocationChain`](chain::InvocationChain) and the
//!   [`HandlerCatalog`](catalog::HandlerCatalog)
//! - **Dispatch**: [`Dispatcher`](dispatch::Dispatcher) and response coercion
//! - **Routing**: exact and pattern route tables
//! - **Configuration**: YAML loading
//! - **Testing**: an in-memory entity locator and a call recorder

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

// Re-export core types
pub use rivet_core;

// Modules
pub mod catalog;
pub mod chain;
pub mod config;
pub mod dispatch;
pub mod registry;
pub mod resolve;
pub mod response;
pub mod routing;
pub mod testing;

#[cfg(feature = "inventory")]
pub use inventory;
