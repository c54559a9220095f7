//! Cycle collection for tracked objects.
//!
//! Reference counting frees acyclic garbage on its own; what it cannot free
//! are cycles whose members only keep each other alive. This module finds
//! them with a trial-deletion mark-and-sweep:
//!
//! 1. **Scan**: for every tracked object count the references coming from
//!    other tracked objects. Whatever part of its strong count is left over
//!    comes from outside the tracked graph (locals, globals, untracked
//!    owners), which makes the object a root.
//! 2. **Mark**: everything reachable from a root through `referents` is live.
//! 3. **Sweep**: every unmarked object is cyclic garbage; `clear` is called on
//!    each of them, breaking the cycles so reference counting can free them.

use crate::object::{HeapObject, ObjectRef};
use crate::token::ObjectToken;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Weak};

/// Progress callback for collection passes.
/// Called with (current, total, phase) where phase is "scan", "mark" or "sweep".
pub type CollectProgressCallback<'a> = dyn Fn(usize, usize, &str) + 'a;

/// Report from a collection pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CollectReport {
    /// Live tracked objects when the pass started.
    pub tracked: usize,

    /// Objects reachable from a root (kept).
    pub reachable: usize,

    /// Objects found to be cyclic garbage and cleared.
    pub unreachable: usize,

    /// Cleared objects that were actually freed once their cycles broke.
    pub reclaimed: usize,

    /// Dead registry slots removed after the sweep.
    pub slots_purged: usize,
}

/// Runs a cycle collection over the given live objects.
///
/// `objects` must hold exactly one strong reference per object on top of
/// whatever the program holds; the pass consumes and drops them.
pub fn collect_cycles(objects: Vec<(ObjectToken, ObjectRef)>) -> CollectReport {
    collect_cycles_with_progress(objects, None)
}

/// Like [`collect_cycles`], reporting progress per phase.
pub fn collect_cycles_with_progress(
    objects: Vec<(ObjectToken, ObjectRef)>,
    progress: Option<&CollectProgressCallback<'_>>,
) -> CollectReport {
    let mut report = CollectReport {
        tracked: objects.len(),
        ..Default::default()
    };

    // Phase 1: Scan internal references
    if let Some(cb) = progress {
        cb(0, 3, "scan");
    }
    let (edges, internal) = scan_internal_refs(&objects);

    // Phase 2: Mark from externally referenced roots
    if let Some(cb) = progress {
        cb(1, 3, "mark");
    }
    let roots: Vec<usize> = objects
        .iter()
        .enumerate()
        .filter(|(i, (_, obj))| external_refs(obj, internal[*i]) > 0)
        .map(|(i, _)| i)
        .collect();
    let marked = mark_reachable(&edges, &roots);
    report.reachable = marked.iter().filter(|m| **m).count();

    // Phase 3: Sweep unreachable cycles
    if let Some(cb) = progress {
        cb(2, 3, "sweep");
    }
    let garbage = sweep_unreachable(objects, &marked);
    report.unreachable = garbage.len();
    report.reclaimed = garbage.iter().filter(|w| w.strong_count() == 0).count();

    if let Some(cb) = progress {
        cb(3, 3, "done");
    }

    report
}

/// Builds the tracked-to-tracked edge lists and per-object internal
/// reference counts.
fn scan_internal_refs(objects: &[(ObjectToken, ObjectRef)]) -> (Vec<Vec<usize>>, Vec<usize>) {
    let position: HashMap<ObjectToken, usize> = objects
        .iter()
        .enumerate()
        .map(|(i, (token, _))| (*token, i))
        .collect();

    let mut edges = vec![Vec::new(); objects.len()];
    let mut internal = vec![0usize; objects.len()];

    for (i, (_, obj)) in objects.iter().enumerate() {
        // The referent clones are dropped at the end of each iteration, so
        // strong counts are back to normal before roots are computed.
        for child in obj.referents() {
            if let Some(&j) = position.get(&ObjectToken::of_arc(&child)) {
                internal[j] += 1;
                edges[i].push(j);
            }
        }
    }

    (edges, internal)
}

/// Strong references to `obj` from outside the tracked graph.
///
/// One strong reference belongs to the collector's own working set.
fn external_refs(obj: &ObjectRef, internal: usize) -> usize {
    Arc::strong_count(obj)
        .saturating_sub(1)
        .saturating_sub(internal)
}

/// Marks every object reachable from `roots`.
///
/// Uses BFS over the edge lists built by the scan phase.
fn mark_reachable(edges: &[Vec<usize>], roots: &[usize]) -> Vec<bool> {
    let mut marked = vec![false; edges.len()];
    let mut queue = VecDeque::from_iter(roots.iter().copied());

    while let Some(i) = queue.pop_front() {
        // Skip if already marked
        if std::mem::replace(&mut marked[i], true) {
            continue;
        }
        queue.extend(edges[i].iter().copied().filter(|&j| !marked[j]));
    }

    marked
}

/// Clears every unmarked object, then releases the working set.
///
/// Returns weak handles to the cleared objects so the caller can tell which
/// of them were actually freed.
fn sweep_unreachable(
    objects: Vec<(ObjectToken, ObjectRef)>,
    marked: &[bool],
) -> Vec<Weak<dyn HeapObject>> {
    let mut garbage = Vec::new();

    for (i, (_, obj)) in objects.iter().enumerate() {
        if !marked[i] {
            garbage.push(Arc::downgrade(obj));
        }
    }

    for (i, (_, obj)) in objects.iter().enumerate() {
        if !marked[i] {
            obj.clear();
        }
    }

    drop(objects);
    garbage
}
