//! Procedural macros for Rivet.
//!
//! Use these through the `rivet` crate with the `macros` feature; the
//! generated code refers to `::rivet` paths.

use proc_macro::TokenStream;

mod handler;

/// Generate a handler's callable table from an inherent `impl` block.
///
/// ```rust,ignore
/// #[handler]
/// impl Controller {
///     #[constructor]
///     fn new(service: Arc<Service>, #[param(default = 317)] id: i64) -> Self {
///         Self { service, id }
///     }
///
///     fn before(&self, #[param(default = true)] ok: bool) -> bool {
///         ok
///     }
///
///     #[method(name = "someAction")]
///     fn some_action(&self, request: Arc<Request>, id: i64) -> String {
///         format!("{} {}", request.path(), id)
///     }
/// }
/// ```
///
/// - `#[constructor]` marks the constructor; without one the handler is built
///   with `Default`.
/// - Every method taking `&self` or `&mut self` becomes invokable under its
///   own name, unless marked `#[method(skip)]`. `#[method(name = "...")]`
///   renames it.
/// - `Arc<T>` parameters are typed as `T`, `Option<Arc<T>>` are typed and
///   optional, other `Option<_>` are untyped and optional, everything else is
///   untyped.
/// - `#[param(name = "...", default = expr)]` renames a parameter or gives it
///   a default.
///
/// Attribute options: `name = "..."` overrides the handler name (the type
/// name by default); `register` submits the handler to `inventory`.
#[proc_macro_attribute]
pub fn handler(attr: TokenStream, item: TokenStream) -> TokenStream {
    handler::handler_impl(attr, item)
}
