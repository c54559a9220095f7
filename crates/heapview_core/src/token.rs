//! Object identity tokens.

use crate::error::{ProfilerError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// An identity token derived from the address of a tracked object.
///
/// Tokens are unique among objects that are live at the same time. Once an
/// object is collected and its registry slot purged, the same address (and so
/// the same token) may be handed to a new object, so a token kept from an
/// earlier snapshot must always be resolved again before use.
///
/// Holding a token never keeps the object alive.
///
/// # Examples
///
/// ```
/// use heapview_core::ObjectToken;
///
/// let token: ObjectToken = "140234".parse().unwrap();
/// assert_eq!(token.as_raw(), 140234);
/// assert_eq!(token.to_string(), "140234");
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectToken(u64);

impl ObjectToken {
    /// Creates a token from its raw numeric value.
    #[inline]
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw numeric value.
    #[inline]
    pub fn as_raw(&self) -> u64 {
        self.0
    }

    /// Computes the token of an object from its address.
    ///
    /// For an `Arc<T>` this is the address of the pointee, so
    /// `ObjectToken::of(&*arc) == ObjectToken::of_arc(&arc)`.
    #[inline]
    pub fn of<T: ?Sized>(object: &T) -> Self {
        Self(object as *const T as *const () as usize as u64)
    }

    /// Computes the token of a shared object without touching its counts.
    #[inline]
    pub fn of_arc<T: ?Sized>(object: &Arc<T>) -> Self {
        Self(Arc::as_ptr(object) as *const () as usize as u64)
    }

    /// Parses a token from its decimal form.
    ///
    /// Surrounding whitespace is ignored.
    ///
    /// # Errors
    ///
    /// Returns `ProfilerError::InvalidToken` for anything that is not an
    /// unsigned decimal integer.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        s.parse::<u64>()
            .map(Self)
            .map_err(|e| ProfilerError::InvalidToken(format!("{:?}: {}", s, e)))
    }
}

impl FromStr for ObjectToken {
    type Err = ProfilerError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for ObjectToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for ObjectToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectToken({:#x})", self.0)
    }
}
