//! Parameter descriptors and per-invocation raw values.

use crate::{types::TypeRef, value::Value};
use std::collections::{HashMap, hash_map};

/// Static metadata about one parameter of a callable.
///
/// Descriptors are derived once per callable (by hand or by `#[handler]`) and
/// are independent of any invocation.
#[derive(Clone, Debug, PartialEq)]
pub struct ParameterDescriptor {
    name: String,
    declared_type: Option<TypeRef>,
    optional: bool,
    default: Option<Value>,
}

impl ParameterDescriptor {
    /// An untyped (scalar) parameter.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            declared_type: None,
            optional: false,
            default: None,
        }
    }

    /// A parameter declared with type `T`, bound as `Arc<T>`.
    pub fn typed<T: ?Sized + 'static>(name: impl Into<String>) -> Self {
        Self {
            declared_type: Some(TypeRef::of::<T>()),
            ..Self::named(name)
        }
    }

    /// Make the parameter optional with the given default.
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.optional = true;
        self.default = Some(default.into());
        self
    }

    /// Make the parameter optional; it binds `Null` when nothing else applies.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Parameter name, the key looked up in raw values, services and
    /// configuration.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared type, absent for untyped parameters.
    pub fn declared_type(&self) -> Option<TypeRef> {
        self.declared_type
    }

    /// Returns true if the parameter may fall back to its default.
    pub fn is_optional(&self) -> bool {
        self.optional
    }

    /// The declared default, if any.
    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }
}

/// Named values supplied for a single invocation: route parameters or
/// explicit caller overrides.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawParameters(HashMap<String, Value>);

impl RawParameters {
    /// Empty parameter map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Insert a value, returning the previous one.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(name.into(), value.into())
    }

    /// Look up a value by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Returns true if a value is present for the name.
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Number of values.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if no values are present.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over name/value pairs in no particular order.
    pub fn iter(&self) -> hash_map::Iter<'_, String, Value> {
        self.0.iter()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for RawParameters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl<K: Into<String>, V: Into<Value>> Extend<(K, V)> for RawParameters {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl IntoIterator for RawParameters {
    type Item = (String, Value);
    type IntoIter = hash_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a RawParameters {
    type Item = (&'a String, &'a Value);
    type IntoIter = hash_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
