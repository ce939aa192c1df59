//! # Callable Tables
//!
//! A handler is a type whose constructor and methods are described by
//! explicit [`ParameterDescriptor`] lists. The engine never inspects
//! signatures at runtime; it reads the table built here.
//!
//! - [`Method`] / [`Constructor`] - implemented for plain closures of arity 0-12
//! - [`HandlerDefinition`] - the typed table for one handler type
//! - [`DynHandler`] - the object-safe view the engine works with
//! - [`Injectable`] - handler types that know their own definition
//!
//! ```rust,ignore
//! let def = HandlerDefinition::new(
//!     "Controller",
//!     vec![
//!         ParameterDescriptor::typed::<Service>("service"),
//!         ParameterDescriptor::named("id").with_default(317),
//!     ],
//!     |service: Arc<Service>, id: i64| Controller { service, id },
//! )
//! .method(
//!     "before",
//!     vec![ParameterDescriptor::named("ok").with_default(true)],
//!     |_: &mut Controller, ok: bool| ok,
//! );
//! ```

use crate::{
    error::{BuildError, CallError},
    extract::{Arguments, FromValue, IntoValue},
    parameter::ParameterDescriptor,
    types::TypeRef,
    value::Value,
};
use std::{any::Any, collections::HashSet, fmt, marker::PhantomData, sync::Arc};

/// Method name used for constructors in diagnostics.
pub const CONSTRUCTOR: &str = "new";

/// A callable usable as a handler method.
///
/// Implemented for every `Fn(&mut H, T1, .., Tn) -> Out` where each `Ti`
/// implements [`FromValue`] and `Out` implements [`IntoValue`].
pub trait Method<H, Args>: Send + Sync + 'static {
    /// Number of arguments after the receiver.
    const ARITY: usize;

    /// Extract the arguments and call the function.
    fn call(&self, handler: &mut H, args: &mut Arguments) -> Result<Value, CallError>;
}

/// A callable usable as a handler constructor.
///
/// Implemented for every `Fn(T1, .., Tn) -> H` where each `Ti` implements
/// [`FromValue`].
pub trait Constructor<H, Args>: Send + Sync + 'static {
    /// Number of arguments.
    const ARITY: usize;

    /// Extract the arguments and build the handler.
    fn construct(&self, args: &mut Arguments) -> Result<H, CallError>;
}

macro_rules! count {
    () => { 0usize };
    ($head:ident $($tail:ident)*) => { 1usize + count!($($tail)*) };
}

macro_rules! impl_callables {
    ($($T:ident),*) => {
        impl<F, H, Out, $($T,)*> Method<H, ($($T,)*)> for F
        where
            F: Fn(&mut H, $($T),*) -> Out + Send + Sync + 'static,
            Out: IntoValue,
            $($T: FromValue,)*
        {
            const ARITY: usize = count!($($T)*);

            #[allow(non_snake_case, unused_variables)]
            fn call(&self, handler: &mut H, args: &mut Arguments) -> Result<Value, CallError> {
                $(
                    let $T = args.next::<$T>()?;
                )*
                (self)(handler, $($T),*).into_value()
            }
        }

        impl<F, H, $($T,)*> Constructor<H, ($($T,)*)> for F
        where
            F: Fn($($T),*) -> H + Send + Sync + 'static,
            $($T: FromValue,)*
        {
            const ARITY: usize = count!($($T)*);

            #[allow(non_snake_case, unused_variables)]
            fn construct(&self, args: &mut Arguments) -> Result<H, CallError> {
                $(
                    let $T = args.next::<$T>()?;
                )*
                Ok((self)($($T),*))
            }
        }
    };
}

impl_callables!();
impl_callables!(T1);
impl_callables!(T1, T2);
impl_callables!(T1, T2, T3);
impl_callables!(T1, T2, T3, T4);
impl_callables!(T1, T2, T3, T4, T5);
impl_callables!(T1, T2, T3, T4, T5, T6);
impl_callables!(T1, T2, T3, T4, T5, T6, T7);
impl_callables!(T1, T2, T3, T4, T5, T6, T7, T8);
impl_callables!(T1, T2, T3, T4, T5, T6, T7, T8, T9);
impl_callables!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10);
impl_callables!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11);
impl_callables!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11, T12);

// Type erasure

trait ErasedMethod<H>: Send + Sync {
    fn call(&self, handler: &mut H, args: Arguments) -> Result<Value, CallError>;
}

trait ErasedConstructor<H>: Send + Sync {
    fn construct(&self, args: Arguments) -> Result<H, CallError>;
}

/// Pins the argument tuple of a closure so it can be boxed.
struct Erased<F, Args> {
    func: F,
    _marker: PhantomData<fn() -> Args>,
}

impl<F, Args> Erased<F, Args> {
    fn new(func: F) -> Self {
        Self {
            func,
            _marker: PhantomData,
        }
    }
}

impl<H, F, Args> ErasedMethod<H> for Erased<F, Args>
where
    F: Method<H, Args>,
{
    fn call(&self, handler: &mut H, mut args: Arguments) -> Result<Value, CallError> {
        Method::call(&self.func, handler, &mut args)
    }
}

impl<H, F, Args> ErasedConstructor<H> for Erased<F, Args>
where
    F: Constructor<H, Args>,
{
    fn construct(&self, mut args: Arguments) -> Result<H, CallError> {
        Constructor::construct(&self.func, &mut args)
    }
}

struct ConstructorEntry<H> {
    parameters: Vec<ParameterDescriptor>,
    arity: usize,
    func: Box<dyn ErasedConstructor<H>>,
}

struct MethodEntry<H> {
    name: String,
    parameters: Vec<ParameterDescriptor>,
    arity: usize,
    func: Box<dyn ErasedMethod<H>>,
}

/// The callable table of one handler type.
pub struct HandlerDefinition<H> {
    name: String,
    constructor: ConstructorEntry<H>,
    methods: Vec<MethodEntry<H>>,
}

impl<H: Send + 'static> HandlerDefinition<H> {
    /// Define a handler with an explicit constructor.
    pub fn new<F, Args>(
        name: impl Into<String>,
        parameters: Vec<ParameterDescriptor>,
        constructor: F,
    ) -> Self
    where
        F: Constructor<H, Args>,
        Args: 'static,
    {
        Self {
            name: name.into(),
            constructor: ConstructorEntry {
                parameters,
                arity: F::ARITY,
                func: Box::new(Erased::new(constructor)),
            },
            methods: Vec::new(),
        }
    }

    /// Define a handler without constructor parameters, built via `Default`.
    pub fn from_default(name: impl Into<String>) -> Self
    where
        H: Default,
    {
        Self::new(name, Vec::new(), H::default)
    }

    /// Add an invokable method.
    pub fn method<F, Args>(
        mut self,
        name: impl Into<String>,
        parameters: Vec<ParameterDescriptor>,
        func: F,
    ) -> Self
    where
        F: Method<H, Args>,
        Args: 'static,
    {
        self.methods.push(MethodEntry {
            name: name.into(),
            parameters,
            arity: F::ARITY,
            func: Box::new(Erased::new(func)),
        });
        self
    }

    /// Handler name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Build a typed instance from resolved constructor arguments.
    pub fn new_instance(&self, args: Arguments) -> Result<H, CallError> {
        self.constructor.func.construct(args)
    }

    /// Call a method on a typed instance.
    pub fn call_method(
        &self,
        instance: &mut H,
        method: &str,
        args: Arguments,
    ) -> Result<Value, CallError> {
        self.find(method)
            .ok_or_else(|| CallError::UnknownMethod(method.to_string()))?
            .func
            .call(instance, args)
    }

    /// Wrap into the shared, type-erased form used by the engine.
    pub fn into_dyn(self) -> Arc<dyn DynHandler> {
        Arc::new(self)
    }

    fn find(&self, method: &str) -> Option<&MethodEntry<H>> {
        self.methods.iter().find(|m| m.name == method)
    }
}

impl<H> fmt::Debug for HandlerDefinition<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerDefinition")
            .field("name", &self.name)
            .field("constructor", &self.constructor.parameters)
            .field(
                "methods",
                &self.methods.iter().map(|m| &m.name).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// An opaque, constructed handler instance.
pub struct Instance {
    type_ref: TypeRef,
    inner: Box<dyn Any + Send>,
}

impl Instance {
    /// Wrap a handler value.
    pub fn new<H: Send + 'static>(handler: H) -> Self {
        Self {
            type_ref: TypeRef::of::<H>(),
            inner: Box::new(handler),
        }
    }

    /// Type of the wrapped handler.
    pub fn type_ref(&self) -> TypeRef {
        self.type_ref
    }

    /// Borrow the handler as `H`.
    pub fn downcast_ref<H: 'static>(&self) -> Option<&H> {
        self.inner.downcast_ref()
    }

    /// Mutably borrow the handler as `H`.
    pub fn downcast_mut<H: 'static>(&mut self) -> Option<&mut H> {
        self.inner.downcast_mut()
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Instance({})", self.type_ref.name())
    }
}

/// Object-safe view of a [`HandlerDefinition`].
pub trait DynHandler: Send + Sync {
    /// Handler name.
    fn name(&self) -> &str;

    /// Type of the instances this handler builds.
    fn handler_type(&self) -> TypeRef;

    /// Constructor parameters in declaration order.
    fn constructor_parameters(&self) -> &[ParameterDescriptor];

    /// Parameters of a method, or `None` if the method is unknown.
    fn method_parameters(&self, method: &str) -> Option<&[ParameterDescriptor]>;

    /// Method names in declaration order.
    fn methods(&self) -> Vec<&str>;

    /// Build an instance from resolved constructor arguments.
    fn construct(&self, args: Arguments) -> Result<Instance, CallError>;

    /// Call a method on an instance built by this handler.
    fn call(
        &self,
        instance: &mut Instance,
        method: &str,
        args: Arguments,
    ) -> Result<Value, CallError>;

    /// Check descriptor lists against function arities and method names.
    fn validate(&self) -> Result<(), BuildError>;
}

impl<H: Send + 'static> DynHandler for HandlerDefinition<H> {
    fn name(&self) -> &str {
        &self.name
    }

    fn handler_type(&self) -> TypeRef {
        TypeRef::of::<H>()
    }

    fn constructor_parameters(&self) -> &[ParameterDescriptor] {
        &self.constructor.parameters
    }

    fn method_parameters(&self, method: &str) -> Option<&[ParameterDescriptor]> {
        self.find(method).map(|m| m.parameters.as_slice())
    }

    fn methods(&self) -> Vec<&str> {
        self.methods.iter().map(|m| m.name.as_str()).collect()
    }

    fn construct(&self, args: Arguments) -> Result<Instance, CallError> {
        self.new_instance(args).map(Instance::new)
    }

    fn call(
        &self,
        instance: &mut Instance,
        method: &str,
        args: Arguments,
    ) -> Result<Value, CallError> {
        let handler = instance
            .downcast_mut::<H>()
            .ok_or(CallError::InstanceMismatch {
                expected: std::any::type_name::<H>(),
            })?;
        self.call_method(handler, method, args)
    }

    fn validate(&self) -> Result<(), BuildError> {
        if self.name.is_empty() {
            return Err(BuildError::InvalidTarget(self.name.clone()));
        }

        check_arity(
            &self.name,
            CONSTRUCTOR,
            self.constructor.parameters.len(),
            self.constructor.arity,
        )?;

        let mut seen = HashSet::new();
        for method in &self.methods {
            if !seen.insert(method.name.as_str()) {
                return Err(BuildError::DuplicateMethod {
                    handler: self.name.clone(),
                    method: method.name.clone(),
                });
            }
            check_arity(&self.name, &method.name, method.parameters.len(), method.arity)?;
        }
        Ok(())
    }
}

fn check_arity(
    handler: &str,
    method: &str,
    declared: usize,
    arity: usize,
) -> Result<(), BuildError> {
    if declared == arity {
        Ok(())
    } else {
        Err(BuildError::ArityMismatch {
            target: format!("{handler}::{method}"),
            declared,
            arity,
        })
    }
}

/// A handler type that carries its own callable table.
///
/// Implemented by hand or generated by `#[handler]`.
pub trait Injectable: Sized + Send + 'static {
    /// Build the handler's definition.
    fn definition() -> HandlerDefinition<Self>;
}
