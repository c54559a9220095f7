//! The trait every heap-tracked object implements.

use crate::error::FormatError;
use crate::token::ObjectToken;
use crate::value::Value;
use std::any::Any;
use std::sync::Arc;

/// Shared handle to a tracked object.
pub type ObjectRef = Arc<dyn HeapObject>;

/// Upcast to `Any`, implemented for every `'static` type.
///
/// Lets formatters registered for a concrete type downcast a
/// `&dyn HeapObject` back to it.
pub trait AsAny {
    /// Returns `self` as `&dyn Any`.
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// An object living on a [`Heap`](crate::Heap).
///
/// Only `kind`, `describe`, `referents`, `attributes` and `clear` have
/// meaning to the profiler; all of them have defaults, so a plain struct
/// can be tracked with an empty `impl HeapObject for Foo {}`.
///
/// Objects that hold other tracked objects must report them from
/// `referents` and drop them in `clear`, otherwise reference cycles through
/// them can never be reclaimed by [`Heap::collect`](crate::Heap::collect).
pub trait HeapObject: AsAny + Send + Sync {
    /// Runtime type name used as the grouping key.
    ///
    /// Defaults to the Rust type name with module paths stripped.
    fn kind(&self) -> String {
        kind_label::<Self>()
    }

    /// Generic representation used when no formatter is registered for the
    /// object's kind.
    fn describe(&self) -> Result<String, FormatError> {
        Ok(format!("<{} object at {}>", self.kind(), ObjectToken::of(self)))
    }

    /// Tracked objects this object holds strong references to.
    fn referents(&self) -> Vec<ObjectRef> {
        Vec::new()
    }

    /// Named attributes shown on the inspection page.
    ///
    /// Names starting with `_` are treated as private and hidden.
    fn attributes(&self) -> Vec<(String, Value)> {
        Vec::new()
    }

    /// Drops every reference returned by `referents`.
    ///
    /// Called by the collector on members of an unreachable cycle.
    fn clear(&self) {}
}

/// Kind label for a Rust type: its type name with module paths stripped,
/// generic arguments included.
///
/// ```
/// use heapview_core::kind_label;
///
/// assert_eq!(kind_label::<Vec<String>>(), "Vec<String>");
/// assert_eq!(kind_label::<std::collections::HashMap<u8, u8>>(), "HashMap<u8, u8>");
/// ```
pub fn kind_label<T: ?Sized>() -> String {
    strip_paths(std::any::type_name::<T>())
}

/// Removes every `path::` prefix from a type name.
fn strip_paths(type_name: &str) -> String {
    let mut out = String::with_capacity(type_name.len());
    let mut segment = String::new();
    let mut chars = type_name.chars().peekable();

    while let Some(c) = chars.next() {
        if c == ':' && chars.peek() == Some(&':') {
            chars.next();
            segment.clear();
        } else if c.is_alphanumeric() || c == '_' {
            segment.push(c);
        } else {
            out.push_str(&segment);
            segment.clear();
            out.push(c);
        }
    }
    out.push_str(&segment);
    out
}
