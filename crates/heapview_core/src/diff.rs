//! Growth detection between two snapshots.

use crate::snapshot::Snapshot;
use crate::token::ObjectToken;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Growth of one kind between two snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrowthRecord {
    /// Kind label.
    pub kind: String,
    /// Objects present now that were not present before.
    pub new_count: usize,
    /// Objects of this kind present now.
    pub total_count: usize,
}

impl GrowthRecord {
    /// Creates a record.
    pub fn new(kind: impl Into<String>, new_count: usize, total_count: usize) -> Self {
        Self {
            kind: kind.into(),
            new_count,
            total_count,
        }
    }
}

/// How the first capture (with nothing to compare against) is treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FirstCapturePolicy {
    /// The first capture only establishes a baseline and reports nothing.
    #[default]
    BaselineOnly,
    /// The first capture is compared against an empty heap, so every kind is
    /// reported as entirely new.
    TreatAsEmpty,
}

/// Result of comparing two snapshots.
///
/// Holds growth records sorted by `new_count` descending (ties by kind
/// ascending) and, for each kind that grew, the tokens of its new objects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delta {
    records: Vec<GrowthRecord>,
    cohorts: BTreeMap<String, BTreeSet<ObjectToken>>,
}

impl Delta {
    /// Growth records, largest growth first.
    pub fn records(&self) -> &[GrowthRecord] {
        &self.records
    }

    /// Tokens that appeared for `kind`, if it grew.
    pub fn cohort(&self, kind: &str) -> Option<&BTreeSet<ObjectToken>> {
        self.cohorts.get(kind)
    }

    /// Kinds with a cohort, ascending.
    pub fn cohort_kinds(&self) -> impl Iterator<Item = &str> {
        self.cohorts.keys().map(String::as_str)
    }

    /// True when nothing grew.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Total number of new objects across all kinds.
    pub fn new_objects(&self) -> usize {
        self.records.iter().map(|r| r.new_count).sum()
    }
}

/// Compares `current` against `previous`.
///
/// With no previous snapshot the outcome depends on `policy`.
pub fn diff(previous: Option<&Snapshot>, current: &Snapshot, policy: FirstCapturePolicy) -> Delta {
    match (previous, policy) {
        (Some(previous), _) => diff_snapshots(previous, current),
        (None, FirstCapturePolicy::TreatAsEmpty) => diff_snapshots(&Snapshot::new(), current),
        (None, FirstCapturePolicy::BaselineOnly) => Delta::default(),
    }
}

/// Compares two snapshots, reporting growth only.
///
/// Kinds that shrank or stayed the same produce no record and no cohort.
pub fn diff_snapshots(previous: &Snapshot, current: &Snapshot) -> Delta {
    let mut delta = Delta::default();

    for (kind, tokens) in current.groups() {
        let fresh: BTreeSet<ObjectToken> = match previous.tokens(kind) {
            None => tokens.clone(),
            Some(before) => tokens.difference(before).copied().collect(),
        };

        if fresh.is_empty() {
            continue;
        }

        delta
            .records
            .push(GrowthRecord::new(kind, fresh.len(), tokens.len()));
        delta.cohorts.insert(kind.to_string(), fresh);
    }

    delta.records.sort_by(|a, b| {
        b.new_count
            .cmp(&a.new_count)
            .then_with(|| a.kind.cmp(&b.kind))
    });

    debug!(
        kinds = delta.records.len(),
        new_objects = delta.new_objects(),
        "snapshot difference computed"
    );
    delta
}
