//! Dynamic values bound to callable parameters.
//!
//! Route parameters, explicit overrides, configuration scalars, services and
//! handler return values all travel through the engine as a [`Value`].
//! Shared instances (services, entities, the current request) are carried as
//! an [`Object`].

use crate::{response::Response, types::TypeRef};
use std::{any::Any, collections::BTreeMap, fmt, sync::Arc};

/// A type-tagged, shared instance.
///
/// An `Object` wraps an `Arc<T>` where `T` may be unsized, so a service can be
/// handed out both as its concrete type and as a trait-object view
/// (`Arc<dyn Greeter>`). The tag is the `TypeRef` of the view.
#[derive(Clone)]
pub struct Object {
    type_ref: TypeRef,
    addr: usize,
    inner: Arc<dyn Any + Send + Sync>,
}

impl Object {
    /// Wrap a shared instance, tagging it with `T`.
    pub fn new<T: ?Sized + Send + Sync + 'static>(instance: Arc<T>) -> Self {
        let addr = Arc::as_ptr(&instance).cast::<()>() as usize;
        Self {
            type_ref: TypeRef::of::<T>(),
            addr,
            inner: Arc::new(instance),
        }
    }

    /// The type this object is viewed as.
    pub fn type_ref(&self) -> TypeRef {
        self.type_ref
    }

    /// Recover the shared instance as `Arc<T>`, if `T` is the tagged view.
    pub fn downcast<T: ?Sized + 'static>(&self) -> Option<Arc<T>> {
        self.inner.downcast_ref::<Arc<T>>().cloned()
    }

    /// Returns true if both objects point at the same underlying instance,
    /// regardless of the view they are tagged with.
    pub fn same_instance(&self, other: &Object) -> bool {
        self.addr == other.addr
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        self.type_ref == other.type_ref && self.addr == other.addr
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Object({})", self.type_ref.name())
    }
}

/// A value that can be bound to a parameter or returned from a handler.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    /// Absent value.
    #[default]
    Null,
    /// Boolean scalar.
    Bool(bool),
    /// Integer scalar.
    Int(i64),
    /// Floating point scalar.
    Float(f64),
    /// String scalar.
    String(String),
    /// Ordered list of values.
    List(Vec<Value>),
    /// String-keyed map of values.
    Map(BTreeMap<String, Value>),
    /// A shared instance (service, entity, request).
    Object(Object),
    /// A response-shaped value.
    Response(Response),
}

impl Value {
    /// Returns true for the two short-circuit sentinels: exactly `false`, or a
    /// response-shaped value.
    pub fn is_short_circuit(&self) -> bool {
        matches!(self, Value::Bool(false) | Value::Response(_))
    }

    /// Returns true if this is `Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The boolean, if this is a `Bool`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The integer, if this is an `Int`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// The float, if this is a `Float` or an `Int`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// The string slice, if this is a `String`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// The object, if this is an `Object`.
    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    /// The response, if this is a `Response`.
    pub fn as_response(&self) -> Option<&Response> {
        match self {
            Value::Response(r) => Some(r),
            _ => None,
        }
    }

    /// Downcast an `Object` value to `Arc<T>`.
    pub fn downcast<T: ?Sized + 'static>(&self) -> Option<Arc<T>> {
        self.as_object().and_then(Object::downcast::<T>)
    }

    /// Short name of the variant, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Object(_) => "object",
            Value::Response(_) => "response",
        }
    }

    /// Human readable description of the value's shape.
    pub fn describe(&self) -> String {
        match self {
            Value::Object(o) => format!("object `{}`", o.type_ref().name()),
            other => other.kind().to_string(),
        }
    }

    /// Text form of a scalar (`Bool`, `Int`, `Float`, `String`).
    pub fn scalar_text(&self) -> Option<String> {
        match self {
            Value::Bool(b) => Some(b.to_string()),
            Value::Int(i) => Some(i.to_string()),
            Value::Float(f) => Some(f.to_string()),
            Value::String(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

macro_rules! impl_from_int {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::Int(i64::from(v))
                }
            }
        )*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(f64::from(v))
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Null
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(v: BTreeMap<String, Value>) -> Self {
        Value::Map(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl From<Object> for Value {
    fn from(v: Object) -> Self {
        Value::Object(v)
    }
}

impl From<Response> for Value {
    fn from(v: Response) -> Self {
        Value::Response(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Greeter: Send + Sync {
        fn greet(&self) -> String;
    }

    struct English;

    impl Greeter for English {
        fn greet(&self) -> String {
            "hello".to_string()
        }
    }

    #[test]
    fn test_short_circuit_sentinels() {
        assert!(Value::Bool(false).is_short_circuit());
        assert!(Value::Response(Response::new("stop")).is_short_circuit());
        assert!(!Value::Bool(true).is_short_circuit());
        assert!(!Value::Null.is_short_circuit());
        assert!(!Value::Int(0).is_short_circuit());
        assert!(!Value::String(String::new()).is_short_circuit());
    }

    #[test]
    fn test_object_views_share_identity() {
        let concrete = Arc::new(English);
        let view: Arc<dyn Greeter> = concrete.clone();

        let a = Object::new(concrete);
        let b = Object::new(view);

        assert!(a.same_instance(&b));
        assert_ne!(a, b, "different views are different values");
        assert_eq!(b.downcast::<dyn Greeter>().unwrap().greet(), "hello");
        assert!(b.downcast::<English>().is_none());
        assert!(a.downcast::<English>().is_some());
    }

    #[test]
    fn test_conversions() {
        assert_eq!(Value::from(317), Value::Int(317));
        assert_eq!(Value::from("/home"), Value::String("/home".into()));
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(
            Value::from(vec![1, 2]),
            Value::List(vec![Value::Int(1), Value::Int(2)])
        );
        assert_eq!(Value::Int(7).scalar_text().as_deref(), Some("7"));
        assert_eq!(Value::Null.scalar_text(), None);
    }
}
