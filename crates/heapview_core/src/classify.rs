//! Kind labels and bounded object summaries.
//!
//! Summaries go through a table of formatters keyed by kind label. Kinds
//! without an entry fall back to the object's own
//! [`describe`](crate::HeapObject::describe). A formatter that fails, either
//! by returning an error or by panicking, yields a summary starting with
//! [`FAILURE_MARKER`]; nothing in here ever propagates a failure to the
//! lister.

use crate::error::FormatError;
use crate::object::{kind_label, HeapObject};
use crate::value::{Dict, Set, Text, Value};
use std::any::Any;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::debug;

/// Prefix of every summary whose formatter failed.
pub const FAILURE_MARKER: &str = "Failed to format object: ";

/// Label given to objects whose kind cannot be determined.
pub const UNKNOWN_KIND: &str = "unknown";

/// Default summary length for listings.
pub const DEFAULT_SUMMARY_LIMIT: usize = 250;

const ELLIPSIS: &str = "...";

/// A summary formatter for one kind.
pub type Formatter = Box<dyn Fn(&dyn HeapObject) -> Result<String, FormatError> + Send + Sync>;

/// Classifies objects by kind and renders their summaries.
pub struct Classifier {
    formatters: HashMap<String, Formatter>,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Classifier {
    /// Creates a classifier with formatters for the built-in mapping, set and
    /// text kinds.
    pub fn new() -> Self {
        let mut classifier = Self::empty();
        classifier.register_type::<Dict, _>(format_dict);
        classifier.register_type::<Set, _>(format_set);
        classifier.register_type::<Text, _>(format_text);
        classifier
    }

    /// Creates a classifier with no formatters; every object uses its generic
    /// representation.
    pub fn empty() -> Self {
        Self {
            formatters: HashMap::new(),
        }
    }

    /// Registers (or replaces) the formatter for a kind label.
    pub fn register<F>(&mut self, kind: impl Into<String>, formatter: F)
    where
        F: Fn(&dyn HeapObject) -> Result<String, FormatError> + Send + Sync + 'static,
    {
        self.formatters.insert(kind.into(), Box::new(formatter));
    }

    /// Registers a formatter for a concrete type under its default kind label.
    ///
    /// Objects of that label that turn out to be a different type get a
    /// formatting failure rather than a wrong summary.
    pub fn register_type<T, F>(&mut self, formatter: F)
    where
        T: HeapObject + 'static,
        F: Fn(&T) -> Result<String, FormatError> + Send + Sync + 'static,
    {
        let kind = kind_label::<T>();
        let expected = kind.clone();
        self.register(kind, move |object: &dyn HeapObject| {
            match object.as_any().downcast_ref::<T>() {
                Some(typed) => formatter(typed),
                None => Err(FormatError::new(format!("object is not a {}", expected))),
            }
        });
    }

    /// True when a formatter is registered for `kind`.
    pub fn has_formatter(&self, kind: &str) -> bool {
        self.formatters.contains_key(kind)
    }

    /// Kind label of an object. Never fails.
    pub fn kind_of(&self, object: &dyn HeapObject) -> String {
        match catch_unwind(AssertUnwindSafe(|| object.kind())) {
            Ok(kind) if !kind.trim().is_empty() => kind,
            Ok(_) => UNKNOWN_KIND.to_string(),
            Err(_) => {
                debug!("kind() panicked, labelling object as unknown");
                UNKNOWN_KIND.to_string()
            }
        }
    }

    /// Bounded summary of an object.
    ///
    /// With `Some(limit)` the result is at most `limit` characters long;
    /// longer text is cut and ends in `...`.
    pub fn format_summary(&self, object: &dyn HeapObject, limit: Option<usize>) -> String {
        let kind = self.kind_of(object);
        let outcome = catch_unwind(AssertUnwindSafe(|| match self.formatters.get(&kind) {
            Some(formatter) => formatter(object),
            None => object.describe(),
        }));

        let text = match outcome {
            Ok(Ok(text)) => text,
            Ok(Err(err)) => {
                debug!(kind = %kind, error = %err, "formatter failed");
                format!("{}{}", FAILURE_MARKER, err)
            }
            Err(payload) => {
                let reason = panic_message(payload.as_ref());
                debug!(kind = %kind, reason = %reason, "formatter panicked");
                format!("{}{}", FAILURE_MARKER, reason)
            }
        };

        match limit {
            Some(limit) => truncate(text, limit),
            None => text,
        }
    }

    /// Unbounded summary, used on the inspection page.
    pub fn format_detail(&self, object: &dyn HeapObject) -> String {
        self.format_summary(object, None)
    }

    /// Short representation of an attribute or slot value.
    pub fn format_value(&self, value: &Value, limit: Option<usize>) -> String {
        match value {
            Value::Ref(object) => self.format_summary(&**object, limit),
            other => {
                let repr = other.repr();
                match limit {
                    Some(limit) => truncate(repr, limit),
                    None => repr,
                }
            }
        }
    }

    /// Public attributes of an object as `(name, summary)`, sorted by name.
    ///
    /// Names beginning with `_` are private and left out.
    pub fn public_attributes(
        &self,
        object: &dyn HeapObject,
        limit: Option<usize>,
    ) -> Vec<(String, String)> {
        let attributes = catch_unwind(AssertUnwindSafe(|| object.attributes())).unwrap_or_default();
        let mut out: Vec<(String, String)> = attributes
            .into_iter()
            .filter(|(name, _)| !name.starts_with('_'))
            .map(|(name, value)| {
                let summary = self.format_value(&value, limit);
                (name, summary)
            })
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }
}

impl std::fmt::Debug for Classifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kinds: Vec<&String> = self.formatters.keys().collect();
        kinds.sort();
        f.debug_struct("Classifier").field("formatters", &kinds).finish()
    }
}

/// Cuts `text` to at most `limit` characters, ending in `...` when cut.
///
/// Counts characters, not bytes, so multi-byte text is never split inside a
/// code point.
pub fn truncate(text: String, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text;
    }
    if limit <= ELLIPSIS.len() {
        return text.chars().take(limit).collect();
    }
    let mut out: String = text.chars().take(limit - ELLIPSIS.len()).collect();
    out.push_str(ELLIPSIS);
    out
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "formatter panicked".to_string()
    }
}

fn format_dict(dict: &Dict) -> Result<String, FormatError> {
    let entries = dict.entries();
    let body: Vec<String> = entries
        .iter()
        .map(|(k, v)| format!("{:?}: {}", k, v.repr()))
        .collect();
    Ok(format!("Dict, len: {}, {{{}}}", entries.len(), body.join(", ")))
}

fn format_set(set: &Set) -> Result<String, FormatError> {
    let mut members: Vec<String> = set.items().iter().map(Value::repr).collect();
    members.sort();
    Ok(format!("Set, len: {}, ({})", members.len(), members.join(", ")))
}

fn format_text(text: &Text) -> Result<String, FormatError> {
    Ok(format!(
        "Text, len: {}, {}",
        text.as_str().chars().count(),
        text.as_str()
    ))
}
