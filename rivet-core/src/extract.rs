//! Conversions between bound [`Value`]s and typed Rust arguments.
//!
//! - [`FromValue`] - turn a resolved value into a function argument
//! - [`IntoValue`] - turn a handler's return value back into a [`Value`]
//! - [`Arguments`] - walk resolved values in declaration order
//!
//! Route segments arrive as strings, so scalar extraction is loose: `"155"`
//! binds to an integer and `"false"` or `"0"` bind to `bool`.

use crate::{
    error::{BoxError, CallError, ExtractError},
    response::Response,
    value::{Object, Value},
};
use std::{collections::BTreeMap, sync::Arc};

/// Types that can be extracted from a bound [`Value`].
pub trait FromValue: Sized {
    /// Convert the value, or describe why it does not fit.
    fn from_value(value: Value) -> Result<Self, ExtractError>;
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self, ExtractError> {
        Ok(value)
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self, ExtractError> {
        match &value {
            Value::Bool(b) => Ok(*b),
            Value::Int(i) => Ok(*i != 0),
            Value::String(s) => match s.as_str() {
                "true" | "1" => Ok(true),
                "false" | "0" | "" => Ok(false),
                _ => Err(ExtractError::mismatch("bool", &value)),
            },
            _ => Err(ExtractError::mismatch("bool", &value)),
        }
    }
}

macro_rules! impl_from_value_int {
    ($($ty:ty),*) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: Value) -> Result<Self, ExtractError> {
                    let parsed = match &value {
                        Value::Int(i) => <$ty>::try_from(*i).ok(),
                        Value::String(s) => s.trim().parse::<$ty>().ok(),
                        Value::Bool(b) => Some(<$ty>::from(*b)),
                        _ => None,
                    };
                    parsed.ok_or_else(|| ExtractError::mismatch(stringify!($ty), &value))
                }
            }
        )*
    };
}

impl_from_value_int!(i8, i16, i32, i64, u8, u16, u32, u64, usize);

impl FromValue for f64 {
    fn from_value(value: Value) -> Result<Self, ExtractError> {
        let parsed = match &value {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        };
        parsed.ok_or_else(|| ExtractError::mismatch("f64", &value))
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self, ExtractError> {
        match value {
            Value::String(s) => Ok(s),
            other => other
                .scalar_text()
                .ok_or_else(|| ExtractError::mismatch("String", &other)),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self, ExtractError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: Value) -> Result<Self, ExtractError> {
        match value {
            Value::List(items) => items.into_iter().map(T::from_value).collect(),
            other => Err(ExtractError::mismatch("list", &other)),
        }
    }
}

impl FromValue for BTreeMap<String, Value> {
    fn from_value(value: Value) -> Result<Self, ExtractError> {
        match value {
            Value::Map(map) => Ok(map),
            other => Err(ExtractError::mismatch("map", &other)),
        }
    }
}

impl FromValue for Object {
    fn from_value(value: Value) -> Result<Self, ExtractError> {
        match value {
            Value::Object(o) => Ok(o),
            other => Err(ExtractError::mismatch("object", &other)),
        }
    }
}

impl FromValue for Response {
    fn from_value(value: Value) -> Result<Self, ExtractError> {
        match value {
            Value::Response(r) => Ok(r),
            other => Err(ExtractError::mismatch("Response", &other)),
        }
    }
}

impl<T: ?Sized + Send + Sync + 'static> FromValue for Arc<T> {
    fn from_value(value: Value) -> Result<Self, ExtractError> {
        value
            .downcast::<T>()
            .ok_or_else(|| ExtractError::mismatch(std::any::type_name::<T>(), &value))
    }
}

/// Types a handler method may return.
pub trait IntoValue {
    /// Convert into a [`Value`], or surface the handler's own failure.
    fn into_value(self) -> Result<Value, CallError>;
}

macro_rules! impl_into_value_via_from {
    ($($ty:ty),*) => {
        $(
            impl IntoValue for $ty {
                fn into_value(self) -> Result<Value, CallError> {
                    Ok(Value::from(self))
                }
            }
        )*
    };
}

impl_into_value_via_from!(
    Value, bool, i8, i16, i32, i64, u8, u16, u32, f32, f64, String, &'static str, (), Object,
    Response
);

impl IntoValue for BTreeMap<String, Value> {
    fn into_value(self) -> Result<Value, CallError> {
        Ok(Value::Map(self))
    }
}

impl<T: IntoValue> IntoValue for Option<T> {
    fn into_value(self) -> Result<Value, CallError> {
        match self {
            Some(v) => v.into_value(),
            None => Ok(Value::Null),
        }
    }
}

impl<T: IntoValue> IntoValue for Vec<T> {
    fn into_value(self) -> Result<Value, CallError> {
        self.into_iter()
            .map(IntoValue::into_value)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List)
    }
}

impl<T: ?Sized + Send + Sync + 'static> IntoValue for Arc<T> {
    fn into_value(self) -> Result<Value, CallError> {
        Ok(Value::Object(Object::new(self)))
    }
}

impl<T, E> IntoValue for Result<T, E>
where
    T: IntoValue,
    E: Into<BoxError>,
{
    fn into_value(self) -> Result<Value, CallError> {
        match self {
            Ok(v) => v.into_value(),
            Err(e) => Err(CallError::Failed(e.into())),
        }
    }
}

/// Resolved argument values, consumed in declaration order.
///
/// The parameter names travel alongside so extraction failures can name the
/// offending parameter.
#[derive(Debug, Default)]
pub struct Arguments {
    values: std::vec::IntoIter<(String, Value)>,
}

impl Arguments {
    /// Pair resolved values with their parameter names.
    pub fn new(values: Vec<(String, Value)>) -> Self {
        Self {
            values: values.into_iter(),
        }
    }

    /// Number of arguments not yet consumed.
    pub fn remaining(&self) -> usize {
        self.values.len()
    }

    /// Extract the next argument as `T`. A missing argument is treated as
    /// `Null`.
    pub fn next<T: FromValue>(&mut self) -> Result<T, ExtractError> {
        match self.values.next() {
            Some((name, value)) => T::from_value(value).map_err(|e| e.for_parameter(&name)),
            None => T::from_value(Value::Null),
        }
    }
}

impl FromIterator<(String, Value)> for Arguments {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
