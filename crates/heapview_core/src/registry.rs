//! The managed heap and its identity registry.
//!
//! Every object allocated through a [`Heap`] is recorded under its
//! [`ObjectToken`] as a `Weak` reference. The registry never holds a strong
//! reference, so tracking an object does not extend its lifetime; a token
//! resolves only while some owner elsewhere keeps the object alive.
//!
//! A dead slot still pins its object's allocation block through the `Weak`,
//! so `track` purges dead slots whenever the registry doubles past the size
//! left by the previous purge.

use crate::error::{ProfilerError, Result};
use crate::gc::{self, CollectProgressCallback, CollectReport};
use crate::object::{HeapObject, ObjectRef};
use crate::token::ObjectToken;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tracing::debug;

/// A heap of tracked objects.
///
/// # Examples
///
/// ```
/// use heapview_core::{Heap, Text};
///
/// let heap = Heap::new();
/// let greeting = heap.alloc(Text::new("hello"));
/// let token = Heap::token_of(&greeting);
///
/// assert!(heap.resolve(token).is_ok());
/// drop(greeting);
/// assert!(heap.resolve(token).is_err());
/// ```
pub struct Heap {
    slots: Mutex<Slots>,
}

/// Smallest registry size that triggers a purge from `track`.
const MIN_PURGE_THRESHOLD: usize = 1024;

struct Slots {
    map: HashMap<ObjectToken, Weak<dyn HeapObject>>,
    purge_at: usize,
}

impl Slots {
    fn purge(&mut self) -> usize {
        let before = self.map.len();
        self.map.retain(|_, weak| weak.strong_count() > 0);
        self.purge_at = (self.map.len() * 2).max(MIN_PURGE_THRESHOLD);
        before - self.map.len()
    }
}

impl Default for Heap {
    fn default() -> Self {
        Self {
            slots: Mutex::new(Slots {
                map: HashMap::new(),
                purge_at: MIN_PURGE_THRESHOLD,
            }),
        }
    }
}

impl Heap {
    /// Creates an empty heap.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates `value` and starts tracking it.
    pub fn alloc<T: HeapObject + 'static>(&self, value: T) -> Arc<T> {
        let object = Arc::new(value);
        self.track(&object);
        object
    }

    /// Starts tracking an object allocated elsewhere.
    ///
    /// Tracking the same object twice is a no-op.
    pub fn track<T: HeapObject + 'static>(&self, object: &Arc<T>) -> ObjectToken {
        let token = ObjectToken::of_arc(object);
        let weak: Weak<dyn HeapObject> = Arc::downgrade(object) as Weak<dyn HeapObject>;
        let mut slots = self.lock_slots();
        slots.map.insert(token, weak);
        if slots.map.len() > slots.purge_at {
            let purged = slots.purge();
            debug!(purged, remaining = slots.map.len(), "purged dead registry slots");
        }
        token
    }

    /// Stops tracking an object. Returns false if it was not tracked.
    pub fn untrack(&self, token: ObjectToken) -> bool {
        self.lock_slots().map.remove(&token).is_some()
    }

    /// Identity token of a tracked (or untracked) object.
    ///
    /// Pure address arithmetic: O(1), no registry access.
    #[inline]
    pub fn token_of<T: ?Sized>(object: &Arc<T>) -> ObjectToken {
        ObjectToken::of_arc(object)
    }

    /// Returns the live object currently holding `token`.
    ///
    /// # Errors
    ///
    /// Returns `ProfilerError::ObjectNotFound` if no live object maps to the
    /// token: it was never tracked, its object has been dropped, or its slot
    /// was purged by a collection.
    pub fn resolve(&self, token: ObjectToken) -> Result<ObjectRef> {
        self.lock_slots()
            .map
            .get(&token)
            .and_then(Weak::upgrade)
            .ok_or(ProfilerError::ObjectNotFound(token))
    }

    /// True when `token` resolves to a live object.
    pub fn is_live(&self, token: ObjectToken) -> bool {
        self.lock_slots()
            .map
            .get(&token)
            .is_some_and(|weak| weak.strong_count() > 0)
    }

    /// Number of registry slots, including dead ones not yet purged.
    pub fn tracked_len(&self) -> usize {
        self.lock_slots().map.len()
    }

    /// Number of tracked objects that are still alive.
    pub fn live_len(&self) -> usize {
        self.lock_slots()
            .map
            .values()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }

    /// Visits every live tracked object.
    ///
    /// The registry lock is released before `visit` runs, so the visitor may
    /// allocate on this heap. Objects allocated during the walk are not
    /// visited; objects dropped during the walk are skipped.
    pub fn for_each_live(&self, mut visit: impl FnMut(ObjectToken, &dyn HeapObject)) {
        for (token, weak) in self.weak_entries() {
            if let Some(object) = weak.upgrade() {
                visit(token, &*object);
            }
        }
    }

    /// Strong references to every live tracked object.
    ///
    /// Holding the returned vector keeps all of them alive; prefer
    /// [`for_each_live`](Self::for_each_live) for counting.
    pub fn live_objects(&self) -> Vec<(ObjectToken, ObjectRef)> {
        self.weak_entries()
            .into_iter()
            .filter_map(|(token, weak)| weak.upgrade().map(|obj| (token, obj)))
            .collect()
    }

    /// Runs a full collection pass, reclaiming unreachable reference cycles
    /// and purging dead registry slots.
    pub fn collect(&self) -> CollectReport {
        self.collect_with_progress(None)
    }

    /// Like [`collect`](Self::collect), reporting each collector phase to
    /// `progress`.
    pub fn collect_with_progress(&self, progress: Option<&CollectProgressCallback<'_>>) -> CollectReport {
        let mut report = gc::collect_cycles_with_progress(self.live_objects(), progress);
        report.slots_purged = self.purge_dead();
        debug!(
            tracked = report.tracked,
            unreachable = report.unreachable,
            reclaimed = report.reclaimed,
            purged = report.slots_purged,
            "heap collection finished"
        );
        report
    }

    /// Removes registry slots whose object has been dropped.
    pub fn purge_dead(&self) -> usize {
        self.lock_slots().purge()
    }

    fn weak_entries(&self) -> Vec<(ObjectToken, Weak<dyn HeapObject>)> {
        self.lock_slots()
            .map
            .iter()
            .map(|(token, weak)| (*token, weak.clone()))
            .collect()
    }

    fn lock_slots(&self) -> MutexGuard<'_, Slots> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Heap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Heap")
            .field("tracked", &self.tracked_len())
            .finish()
    }
}
