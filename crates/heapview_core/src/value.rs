//! Built-in object kinds: mapping, set, text, sequence and instance.
//!
//! These are the common container and scalar kinds the classifier ships
//! formatters for. Containers hold [`Value`]s, which may point at other
//! tracked objects; those references are what the collector traces.

use crate::error::FormatError;
use crate::object::{HeapObject, ObjectRef};
use crate::token::ObjectToken;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A slot value inside a container or instance.
#[derive(Clone)]
pub enum Value {
    /// Absent value.
    Null,
    /// Boolean.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Floating point number.
    Float(f64),
    /// Inline string (not a tracked object).
    Str(String),
    /// Strong reference to another tracked object.
    Ref(ObjectRef),
}

impl Value {
    /// Wraps a tracked object.
    pub fn object<T: HeapObject + 'static>(object: &Arc<T>) -> Self {
        Self::Ref(object.clone())
    }

    /// Short, non-recursive representation.
    ///
    /// References render as `<Kind object at token>` so cyclic structures
    /// never recurse.
    pub fn repr(&self) -> String {
        match self {
            Self::Null => "null".to_string(),
            Self::Bool(b) => b.to_string(),
            Self::Int(i) => i.to_string(),
            Self::Float(x) => format!("{:?}", x),
            Self::Str(s) => format!("{:?}", s),
            Self::Ref(obj) => format!("<{} object at {}>", obj.kind(), ObjectToken::of_arc(obj)),
        }
    }

    /// The referenced object, if this value is a reference.
    pub fn as_ref_object(&self) -> Option<&ObjectRef> {
        match self {
            Self::Ref(obj) => Some(obj),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Ref(a), Self::Ref(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.repr())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<ObjectRef> for Value {
    fn from(obj: ObjectRef) -> Self {
        Self::Ref(obj)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn referents_of<'a>(values: impl Iterator<Item = &'a Value>) -> Vec<ObjectRef> {
    values.filter_map(|v| v.as_ref_object().cloned()).collect()
}

/// Mapping from string keys to values.
#[derive(Default)]
pub struct Dict {
    entries: Mutex<BTreeMap<String, Value>>,
}

impl Dict {
    /// Creates an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces an entry, returning the previous value.
    pub fn insert(&self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        lock(&self.entries).insert(key.into(), value.into())
    }

    /// Removes an entry.
    pub fn remove(&self, key: &str) -> Option<Value> {
        lock(&self.entries).remove(key)
    }

    /// Returns a clone of the value under `key`.
    pub fn get(&self, key: &str) -> Option<Value> {
        lock(&self.entries).get(key).cloned()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    /// True when the mapping has no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entries in key order.
    pub fn entries(&self) -> Vec<(String, Value)> {
        lock(&self.entries)
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

impl HeapObject for Dict {
    fn referents(&self) -> Vec<ObjectRef> {
        referents_of(lock(&self.entries).values())
    }

    fn attributes(&self) -> Vec<(String, Value)> {
        vec![("len".to_string(), Value::Int(self.len() as i64))]
    }

    fn clear(&self) {
        // Take the entries out first so their drops run without the lock held.
        let entries = std::mem::take(&mut *lock(&self.entries));
        drop(entries);
    }
}

/// Unordered collection of distinct values.
#[derive(Default)]
pub struct Set {
    items: Mutex<Vec<Value>>,
}

impl Set {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a value; returns false if an equal value is already present.
    pub fn insert(&self, value: impl Into<Value>) -> bool {
        let value = value.into();
        let mut items = lock(&self.items);
        if items.contains(&value) {
            return false;
        }
        items.push(value);
        true
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        lock(&self.items).len()
    }

    /// True when the set has no members.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Members in insertion order.
    pub fn items(&self) -> Vec<Value> {
        lock(&self.items).clone()
    }
}

impl HeapObject for Set {
    fn referents(&self) -> Vec<ObjectRef> {
        referents_of(lock(&self.items).iter())
    }

    fn attributes(&self) -> Vec<(String, Value)> {
        vec![("len".to_string(), Value::Int(self.len() as i64))]
    }

    fn clear(&self) {
        let items = std::mem::take(&mut *lock(&self.items));
        drop(items);
    }
}

/// Immutable tracked string.
pub struct Text(String);

impl Text {
    /// Wraps a string.
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// The string contents.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl HeapObject for Text {
    fn describe(&self) -> Result<String, FormatError> {
        Ok(format!("{:?}", self.0))
    }

    fn attributes(&self) -> Vec<(String, Value)> {
        vec![("len".to_string(), Value::Int(self.0.chars().count() as i64))]
    }
}

/// Growable ordered sequence.
#[derive(Default)]
pub struct List {
    items: Mutex<Vec<Value>>,
}

impl List {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a value.
    pub fn push(&self, value: impl Into<Value>) {
        lock(&self.items).push(value.into());
    }

    /// Removes and returns the last value.
    pub fn pop(&self) -> Option<Value> {
        lock(&self.items).pop()
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        lock(&self.items).len()
    }

    /// True when the list has no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Elements in order.
    pub fn items(&self) -> Vec<Value> {
        lock(&self.items).clone()
    }
}

impl HeapObject for List {
    fn describe(&self) -> Result<String, FormatError> {
        let items = lock(&self.items);
        let body: Vec<String> = items.iter().map(Value::repr).collect();
        Ok(format!("[{}]", body.join(", ")))
    }

    fn referents(&self) -> Vec<ObjectRef> {
        referents_of(lock(&self.items).iter())
    }

    fn attributes(&self) -> Vec<(String, Value)> {
        vec![("len".to_string(), Value::Int(self.len() as i64))]
    }

    fn clear(&self) {
        let items = std::mem::take(&mut *lock(&self.items));
        drop(items);
    }
}

/// Object of a dynamically named class with named fields.
///
/// Its kind is the class name, so instances of application-defined classes
/// group separately even though they share one Rust type.
pub struct Instance {
    class: String,
    fields: Mutex<BTreeMap<String, Value>>,
}

impl Instance {
    /// Creates an instance with no fields.
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            fields: Mutex::new(BTreeMap::new()),
        }
    }

    /// Builder-style field assignment.
    pub fn with(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Assigns a field, returning its previous value.
    pub fn set(&self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        lock(&self.fields).insert(name.into(), value.into())
    }

    /// Returns a clone of a field.
    pub fn get(&self, name: &str) -> Option<Value> {
        lock(&self.fields).get(name).cloned()
    }

    /// The class name.
    pub fn class(&self) -> &str {
        &self.class
    }
}

impl HeapObject for Instance {
    fn kind(&self) -> String {
        self.class.clone()
    }

    fn referents(&self) -> Vec<ObjectRef> {
        referents_of(lock(&self.fields).values())
    }

    fn attributes(&self) -> Vec<(String, Value)> {
        lock(&self.fields)
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    fn clear(&self) {
        let fields = std::mem::take(&mut *lock(&self.fields));
        drop(fields);
    }
}
