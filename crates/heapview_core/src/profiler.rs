//! Profiler session: the state one panel instance works against.
//!
//! A [`Profiler`] owns the current snapshot and the delta from the previous
//! capture. Both are replaced wholesale on every capture, so a reader
//! between captures always sees one consistent view. Calls take `&mut self`
//! for captures; hosts serving several threads wrap the session in a lock.

use crate::classify::Classifier;
use crate::config::ProfilerConfig;
use crate::diff::{diff, Delta, GrowthRecord};
use crate::error::{ProfilerError, Result};
use crate::gc::{CollectProgressCallback, CollectReport};
use crate::graph::{self, Direction, RefGraph};
use crate::paging::{paginate, Page, PageRequest, SortDir, SortField};
use crate::registry::Heap;
use crate::snapshot::Snapshot;
use crate::token::ObjectToken;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Summary shown for a listed token whose object is gone or was replaced by
/// an object of another kind.
pub const COLLECTED_PLACEHOLDER: &str = "<collected object>";

/// An object related to the inspected one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelatedObject {
    /// Bounded summary.
    pub summary: String,
    /// Identity token.
    pub token: ObjectToken,
    /// Kind label.
    pub kind: String,
}

/// Everything the inspection page shows about one object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Inspection {
    /// Identity token.
    pub token: ObjectToken,
    /// Kind label.
    pub kind: String,
    /// Unbounded summary.
    pub detail: String,
    /// Public attributes as `(name, summary)`, sorted by name.
    pub attributes: Vec<(String, String)>,
    /// Objects referencing this one, sorted by summary.
    pub referrers: Vec<RelatedObject>,
    /// Objects this one references, sorted by summary.
    pub referents: Vec<RelatedObject>,
}

/// A memory profiler session over one heap.
///
/// # Examples
///
/// ```
/// use heapview_core::{Heap, Instance, Profiler};
/// use std::sync::Arc;
///
/// let heap = Arc::new(Heap::new());
/// let mut profiler = Profiler::new(Arc::clone(&heap));
///
/// let _kept = heap.alloc(Instance::new("Session"));
/// profiler.capture_and_diff();
///
/// let _leaked: Vec<_> = (0..3).map(|_| heap.alloc(Instance::new("Session"))).collect();
/// let records = profiler.capture_and_diff();
/// assert_eq!(records[0].kind, "Session");
/// assert_eq!(records[0].new_count, 3);
/// ```
pub struct Profiler {
    heap: Arc<Heap>,
    classifier: Classifier,
    config: ProfilerConfig,
    current: Option<Snapshot>,
    delta: Delta,
    captures: usize,
    last_collect: CollectReport,
}

impl Profiler {
    /// Creates a session with default configuration and the built-in
    /// formatters.
    pub fn new(heap: Arc<Heap>) -> Self {
        Self::with_config(heap, ProfilerConfig::default())
    }

    /// Creates a session with the given configuration.
    pub fn with_config(heap: Arc<Heap>, config: ProfilerConfig) -> Self {
        Self {
            heap,
            classifier: Classifier::new(),
            config,
            current: None,
            delta: Delta::default(),
            captures: 0,
            last_collect: CollectReport::default(),
        }
    }

    /// Replaces the classifier.
    pub fn with_classifier(mut self, classifier: Classifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// The heap under inspection.
    pub fn heap(&self) -> &Arc<Heap> {
        &self.heap
    }

    /// The classifier used for kinds and summaries.
    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Mutable access to the classifier, for registering formatters.
    pub fn classifier_mut(&mut self) -> &mut Classifier {
        &mut self.classifier
    }

    /// Session configuration.
    pub fn config(&self) -> &ProfilerConfig {
        &self.config
    }

    /// Snapshot taken by the most recent capture.
    pub fn current_snapshot(&self) -> Option<&Snapshot> {
        self.current.as_ref()
    }

    /// Delta computed by the most recent capture.
    pub fn delta(&self) -> &Delta {
        &self.delta
    }

    /// Number of captures taken in this session.
    pub fn captures(&self) -> usize {
        self.captures
    }

    /// Collection report from the most recent capture.
    pub fn last_collect(&self) -> &CollectReport {
        &self.last_collect
    }

    /// Paging request using the configured page size and rounding.
    pub fn page_request(&self, sort: SortField, dir: SortDir, page: usize) -> PageRequest {
        PageRequest::new(sort, dir)
            .page(page)
            .with_page_size(self.config.listing.page_size)
            .with_rounding(self.config.listing.rounding)
    }

    /// Most populous kinds right now, largest first.
    ///
    /// Enumerates the heap without forcing a collection.
    pub fn overview(&self) -> Vec<(String, usize)> {
        Snapshot::enumerate(&self.heap, &self.classifier)
            .most_common(Some(self.config.listing.overview_limit))
    }

    /// One page of the live objects of `kind`, freshly enumerated.
    ///
    /// An unknown kind gives an empty page.
    pub fn list_by_kind(&self, kind: &str, request: &PageRequest) -> Page {
        let mut tokens = Vec::new();
        self.heap.for_each_live(|token, object| {
            if self.classifier.kind_of(object) == kind {
                tokens.push(token);
            }
        });
        debug!(kind, matched = tokens.len(), "listing objects by kind");
        paginate(tokens, request, |token| self.summarize(token, kind))
    }

    /// Captures a new snapshot and diffs it against the previous one.
    ///
    /// Forces a collection pass. The previous snapshot is dropped once the
    /// delta against it exists.
    pub fn capture_and_diff(&mut self) -> &[GrowthRecord] {
        self.capture_and_diff_with_progress(None)
    }

    /// Like [`capture_and_diff`](Self::capture_and_diff), reporting
    /// collector phases to `progress`.
    pub fn capture_and_diff_with_progress(
        &mut self,
        progress: Option<&CollectProgressCallback<'_>>,
    ) -> &[GrowthRecord] {
        let started = Instant::now();
        let (snapshot, report) =
            Snapshot::capture_with_progress(&self.heap, &self.classifier, progress);
        self.last_collect = report;
        let delta = diff(
            self.current.as_ref(),
            &snapshot,
            self.config.leaks.first_capture,
        );

        self.current = Some(snapshot);
        self.delta = delta;
        self.captures += 1;

        info!(
            capture = self.captures,
            growing_kinds = self.delta.records().len(),
            new_objects = self.delta.new_objects(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "leak capture finished"
        );
        self.delta.records()
    }

    /// Growth records from the most recent capture, without capturing.
    pub fn leaks(&self) -> &[GrowthRecord] {
        self.delta.records()
    }

    /// One page of the objects of `kind` that appeared in the last delta.
    ///
    /// # Errors
    ///
    /// Returns `ProfilerError::KindNotInDelta` if `kind` did not grow.
    pub fn list_new_objects(&self, kind: &str, request: &PageRequest) -> Result<Page> {
        let cohort = self
            .delta
            .cohort(kind)
            .ok_or_else(|| ProfilerError::KindNotInDelta(kind.to_string()))?;
        Ok(paginate(cohort.iter().copied(), request, |token| {
            self.summarize(token, kind)
        }))
    }

    /// Details of one live object.
    ///
    /// # Errors
    ///
    /// Returns `ProfilerError::ObjectNotFound` if the token does not resolve.
    pub fn resolve_for_inspection(&self, token: ObjectToken) -> Result<Inspection> {
        let object = self.heap.resolve(token)?;
        let limit = Some(self.config.listing.summary_limit);

        let referents = graph::direct_referents(&self.heap, &*object);
        let referrers = graph::direct_referrers(&self.heap, token);

        Ok(Inspection {
            token,
            kind: self.classifier.kind_of(&*object),
            detail: self.classifier.format_detail(&*object),
            attributes: self.classifier.public_attributes(&*object, limit),
            referrers: self.related(token, referrers),
            referents: self.related(token, referents),
        })
    }

    /// Reference chain around one object, within the configured limits.
    ///
    /// # Errors
    ///
    /// Returns `ProfilerError::ObjectNotFound` if the token does not resolve.
    pub fn reference_graph(
        &self,
        token: ObjectToken,
        direction: Direction,
        depth: usize,
    ) -> Result<RefGraph> {
        graph::reference_graph(
            &self.heap,
            &self.classifier,
            token,
            direction,
            depth,
            &self.config.graph.walk_config(),
        )
    }

    // Tokens may outlive their object and be reused by a new one, so a
    // listing resolves each token again and checks the kind still matches.
    fn summarize(&self, token: ObjectToken, kind: &str) -> String {
        match self.heap.resolve(token) {
            Ok(object) if self.classifier.kind_of(&*object) == kind => self
                .classifier
                .format_summary(&*object, Some(self.config.listing.summary_limit)),
            _ => COLLECTED_PLACEHOLDER.to_string(),
        }
    }

    fn related(&self, own: ObjectToken, tokens: Vec<ObjectToken>) -> Vec<RelatedObject> {
        let limit = Some(self.config.listing.summary_limit);
        let mut related: Vec<RelatedObject> = tokens
            .into_iter()
            .filter(|token| *token != own)
            .filter_map(|token| {
                let object = self.heap.resolve(token).ok()?;
                Some(RelatedObject {
                    summary: self.classifier.format_summary(&*object, limit),
                    token,
                    kind: self.classifier.kind_of(&*object),
                })
            })
            .collect();
        related.sort_by(|a, b| a.summary.cmp(&b.summary).then_with(|| a.token.cmp(&b.token)));
        related
    }
}

impl std::fmt::Debug for Profiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Profiler")
            .field("heap", &self.heap)
            .field("captures", &self.captures)
            .field("growing_kinds", &self.delta.records().len())
            .finish()
    }
}
