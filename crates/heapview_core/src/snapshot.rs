//! Point-in-time grouping of live objects by kind.

use crate::classify::Classifier;
use crate::gc::{CollectProgressCallback, CollectReport};
use crate::registry::Heap;
use crate::token::ObjectToken;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;
use tracing::info;

/// Tokens of every live object at capture time, grouped by kind label.
///
/// Every token belongs to exactly one group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    groups: BTreeMap<String, BTreeSet<ObjectToken>>,
    total: usize,
}

impl Snapshot {
    /// Creates an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs a full collection, then enumerates and groups every live object.
    ///
    /// This is the most expensive operation in the crate: linear in the number
    /// of live objects in both time and space, and it forces a collection
    /// pass. Only call it on an explicit user action.
    pub fn capture(heap: &Heap, classifier: &Classifier) -> (Self, CollectReport) {
        Self::capture_with_progress(heap, classifier, None)
    }

    /// Like [`capture`](Self::capture), reporting collector phases to
    /// `progress`.
    pub fn capture_with_progress(
        heap: &Heap,
        classifier: &Classifier,
        progress: Option<&CollectProgressCallback<'_>>,
    ) -> (Self, CollectReport) {
        let started = Instant::now();
        let report = heap.collect_with_progress(progress);
        let snapshot = Self::enumerate(heap, classifier);
        info!(
            live = snapshot.total,
            kinds = snapshot.groups.len(),
            reclaimed = report.reclaimed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "heap snapshot captured"
        );
        (snapshot, report)
    }

    /// Groups every live object without forcing a collection first.
    pub fn enumerate(heap: &Heap, classifier: &Classifier) -> Self {
        let mut snapshot = Self::new();
        heap.for_each_live(|token, object| {
            snapshot.insert(classifier.kind_of(object), token);
        });
        snapshot
    }

    /// Adds a token under `kind`. Returns false if it was already present.
    pub fn insert(&mut self, kind: impl Into<String>, token: ObjectToken) -> bool {
        let inserted = self.groups.entry(kind.into()).or_default().insert(token);
        if inserted {
            self.total += 1;
        }
        inserted
    }

    /// Tokens recorded for `kind`.
    pub fn tokens(&self, kind: &str) -> Option<&BTreeSet<ObjectToken>> {
        self.groups.get(kind)
    }

    /// Number of objects recorded for `kind` (zero if absent).
    pub fn count(&self, kind: &str) -> usize {
        self.groups.get(kind).map_or(0, BTreeSet::len)
    }

    /// True when `kind` has at least one object.
    pub fn contains_kind(&self, kind: &str) -> bool {
        self.groups.contains_key(kind)
    }

    /// Kind labels in ascending order.
    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    /// `(kind, tokens)` groups in ascending kind order.
    pub fn groups(&self) -> impl Iterator<Item = (&str, &BTreeSet<ObjectToken>)> {
        self.groups.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Total number of objects across all kinds.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Number of distinct kinds.
    pub fn kind_count(&self) -> usize {
        self.groups.len()
    }

    /// True when no objects were recorded.
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// `(kind, count)` pairs, most populous first, ties by kind ascending.
    ///
    /// `limit` of `None` returns every kind.
    pub fn most_common(&self, limit: Option<usize>) -> Vec<(String, usize)> {
        let mut counts: Vec<(String, usize)> = self
            .groups
            .iter()
            .map(|(kind, tokens)| (kind.clone(), tokens.len()))
            .collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        if let Some(limit) = limit {
            counts.truncate(limit);
        }
        counts
    }
}
