//! Shared, identity-bearing objects and their properties.

use std::fmt;
use std::sync::{Arc, OnceLock};

use indexmap::IndexMap;
use parking_lot::RwLock;

use super::{Observable, Value};
use crate::editable::EditableObject;
use crate::reactive::Memo;

/// One property of an [`Object`].
///
/// The variant is the capability the graph walker dispatches on: only
/// [`Property::Observable`] is a writable cell.
#[derive(Debug, Clone)]
pub enum Property {
    /// A writable observable cell.
    Observable(Observable),
    /// A derived, read-only cell.
    Computed(Memo<Value>),
    /// A plain value.
    Plain(Value),
}

impl Property {
    /// The cell behind this property, if it is a writable observable.
    pub fn as_writable(&self) -> Option<&Observable> {
        match self {
            Property::Observable(observable) => Some(observable),
            _ => None,
        }
    }

    /// Read through any observable layer to the plain current value.
    ///
    /// Reading a computed property evaluates it if needed.
    pub fn unwrap_value(&self) -> Value {
        match self {
            Property::Observable(observable) => observable.get(),
            Property::Computed(memo) => memo.get(),
            Property::Plain(value) => value.clone(),
        }
    }
}

impl From<Observable> for Property {
    fn from(observable: Observable) -> Self {
        Property::Observable(observable)
    }
}

impl From<Memo<Value>> for Property {
    fn from(memo: Memo<Value>) -> Self {
        Property::Computed(memo)
    }
}

impl From<Value> for Property {
    fn from(value: Value) -> Self {
        Property::Plain(value)
    }
}

impl From<Object> for Property {
    fn from(object: Object) -> Self {
        Property::Plain(Value::Object(object))
    }
}

#[derive(Default)]
struct ObjectInner {
    properties: RwLock<IndexMap<String, Property>>,
    facade: OnceLock<EditableObject>,
}

/// An application object: an ordered bag of named properties.
///
/// Clones share the same instance; equality is identity. Objects may
/// reference each other in cycles.
#[derive(Clone, Default)]
pub struct Object {
    inner: Arc<ObjectInner>,
}

impl Object {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Object::set`].
    pub fn with(self, name: impl Into<String>, property: impl Into<Property>) -> Self {
        self.set(name, property);
        self
    }

    /// Insert or replace a property. New properties go last.
    pub fn set(&self, name: impl Into<String>, property: impl Into<Property>) {
        self.inner
            .properties
            .write()
            .insert(name.into(), property.into());
    }

    pub fn get(&self, name: &str) -> Option<Property> {
        self.inner.properties.read().get(name).cloned()
    }

    /// The named property, if it is a writable observable.
    pub fn observable(&self, name: &str) -> Option<Observable> {
        self.get(name).and_then(|p| p.as_writable().cloned())
    }

    /// Snapshot of all properties in insertion order.
    pub fn properties(&self) -> Vec<(String, Property)> {
        self.inner
            .properties
            .read()
            .iter()
            .map(|(name, property)| (name.clone(), property.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.properties.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Opaque identity token, stable for the lifetime of the instance.
    pub fn identity(&self) -> usize {
        Arc::as_ptr(&self.inner) as usize
    }

    pub fn ptr_eq(&self, other: &Object) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// The editable facade attached to this object, if any.
    pub fn facade(&self) -> Option<EditableObject> {
        self.inner.facade.get().cloned()
    }

    pub(crate) fn facade_slot(&self) -> &OnceLock<EditableObject> {
        &self.inner.facade
    }

    /// Build an object from a JSON object: every non-object field becomes
    /// an observable, nested JSON objects become plain nested objects built
    /// the same way. Non-object input yields an empty object.
    pub fn from_json_observables(json: &serde_json::Value) -> Self {
        let object = Object::new();
        if let serde_json::Value::Object(map) = json {
            for (name, value) in map {
                match value {
                    serde_json::Value::Object(_) => {
                        object.set(name.clone(), Object::from_json_observables(value));
                    }
                    other => {
                        object.set(name.clone(), Observable::new(Value::from(other.clone())));
                    }
                }
            }
        }
        object
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Object {
    // Properties may point back at this object, so only keys are printed.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys: Vec<String> = self.inner.properties.read().keys().cloned().collect();
        f.debug_struct("Object")
            .field("identity", &format_args!("{:#x}", self.identity()))
            .field("keys", &keys)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn properties_keep_insertion_order() {
        let object = Object::new()
            .with("b", Value::from(1))
            .with("a", Observable::new(2))
            .with("c", Memo::new(|| Value::from(3)));

        let names: Vec<String> = object.properties().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
    }

    #[test]
    fn only_observables_are_writable() {
        let object = Object::new()
            .with("plain", Value::from(1))
            .with("cell", Observable::new(2))
            .with("derived", Memo::new(|| Value::from(3)));

        assert!(object.get("plain").unwrap().as_writable().is_none());
        assert!(object.get("cell").unwrap().as_writable().is_some());
        assert!(object.get("derived").unwrap().as_writable().is_none());
        assert_eq!(object.get("derived").unwrap().unwrap_value(), Value::from(3));
    }

    #[test]
    fn self_reference_is_allowed() {
        let object = Object::new();
        object.set("me", object.clone());

        let me = object.get("me").unwrap().unwrap_value();
        assert!(me.as_object().unwrap().ptr_eq(&object));
        assert!(format!("{object:?}").contains("me"));
    }

    #[test]
    fn json_leaves_become_observables() {
        let object = Object::from_json_observables(&json!({
            "name": "Ann",
            "tags": [1, 2],
            "address": { "city": "Kyiv" }
        }));

        assert_eq!(object.observable("name").unwrap().get(), Value::from("Ann"));
        assert!(object.observable("tags").unwrap().get().is_array());

        let address = object.get("address").unwrap().unwrap_value();
        let city = address.as_object().unwrap().observable("city").unwrap();
        assert_eq!(city.get(), Value::from("Kyiv"));
    }
}
