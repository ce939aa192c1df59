//! Testing utilities for Rivet.
//!
//! # Features
//!
//! - [`InMemoryEntityLocator`]: an entity locator backed by a `Vec`
//! - [`CallRecorder`]: an injectable service that records what was called

use rivet_core::{BoxError, EntityLocator, Object, TypeRef, Value};
use std::{
    collections::{HashMap, HashSet},
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicUsize, Ordering},
    },
};

// ============================================================================
// In-Memory Entity Locator
// ============================================================================

struct StoredEntity {
    object: Object,
    fields: HashMap<String, Value>,
}

/// An [`EntityLocator`] over a fixed set of entities.
///
/// Field values are compared loosely: the route segment `"7"` finds an entity
/// whose field is the integer `7`.
///
/// # Example
///
/// ```rust,ignore
/// let locator = InMemoryEntityLocator::new()
///     .with_entity(Arc::new(User { id: 7 }), [("user", 7)]);
/// ```
#[derive(Default)]
pub struct InMemoryEntityLocator {
    entities: Vec<StoredEntity>,
    handled: HashSet<TypeRef>,
    failure: Option<String>,
    lookups: AtomicUsize,
}

impl InMemoryEntityLocator {
    /// Create an empty locator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entity, keyed by the given field values. The entity's type
    /// becomes handled.
    pub fn with_entity<T, K, V>(
        mut self,
        entity: Arc<T>,
        fields: impl IntoIterator<Item = (K, V)>,
    ) -> Self
    where
        T: Send + Sync + 'static,
        K: Into<String>,
        V: Into<Value>,
    {
        self.handled.insert(TypeRef::of::<T>());
        self.entities.push(StoredEntity {
            object: Object::new(entity),
            fields: fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        });
        self
    }

    /// Handle `T` without storing any entity of that type.
    pub fn handling<T: ?Sized + 'static>(mut self) -> Self {
        self.handled.insert(TypeRef::of::<T>());
        self
    }

    /// Make every lookup fail with the given message.
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    /// Number of lookups performed.
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

fn loosely_equal(a: &Value, b: &Value) -> bool {
    match (a.scalar_text(), b.scalar_text()) {
        (Some(a), Some(b)) => a == b,
        _ => a == b,
    }
}

impl EntityLocator for InMemoryEntityLocator {
    fn handles(&self, entity: TypeRef) -> bool {
        self.handled.contains(&entity)
    }

    fn find_one_by(
        &self,
        entity: TypeRef,
        field: &str,
        value: &Value,
    ) -> Result<Option<Value>, BoxError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.failure {
            return Err(message.clone().into());
        }

        Ok(self
            .entities
            .iter()
            .filter(|stored| stored.object.type_ref() == entity)
            .find(|stored| {
                stored
                    .fields
                    .get(field)
                    .is_some_and(|candidate| loosely_equal(candidate, value))
            })
            .map(|stored| Value::Object(stored.object.clone())))
    }
}

// ============================================================================
// Call Recorder
// ============================================================================

/// A service that records calls made by handlers.
///
/// Register it as a service, inject it into a handler and record from each
/// method; the recording shows which steps of a chain actually ran.
///
/// # Example
///
/// ```rust,ignore
/// let recorder = Arc::new(CallRecorder::new());
/// let registry = ServiceRegistry::builder()
///     .register(Service::from_instance("recorder", recorder.clone()))
///     .build()?;
///
/// // ... dispatch ...
/// assert_eq!(recorder.calls(), vec!["before"]);
/// ```
#[derive(Debug, Default)]
pub struct CallRecorder {
    calls: Mutex<Vec<String>>,
}

impl CallRecorder {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a call.
    pub fn record(&self, call: impl Into<String>) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call.into());
    }

    /// Get a clone of the recorded calls, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Get the number of recorded calls.
    pub fn count(&self) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns true if the call was recorded at least once.
    pub fn was_called(&self, call: &str) -> bool {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|c| c == call)
    }

    /// Clear all recorded calls.
    pub fn clear(&self) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
