//! heapview Core Library
//!
//! A live heap snapshot and differencing engine for a memory introspection
//! panel, providing:
//! - A managed heap with weak identity tokens and a cycle collector
//! - Per-kind grouping of live objects and growth detection between captures
//! - Bounded, fail-safe object summaries
//! - Sorted, paginated listings that only format what they show
//!
//! # Quick Start
//!
//! ```
//! use heapview_core::{Heap, Instance, PageRequest, Profiler, SortDir, SortField};
//! use std::sync::Arc;
//!
//! let heap = Arc::new(Heap::new());
//! let mut profiler = Profiler::new(Arc::clone(&heap));
//!
//! // Baseline
//! profiler.capture_and_diff();
//!
//! // Something starts holding on to requests
//! let retained: Vec<_> = (0..3)
//!     .map(|i| heap.alloc(Instance::new("Request").with("id", i as i64)))
//!     .collect();
//!
//! let records = profiler.capture_and_diff();
//! assert_eq!(records[0].kind, "Request");
//! assert_eq!(records[0].new_count, 3);
//!
//! let page = profiler
//!     .list_new_objects("Request", &PageRequest::new(SortField::Token, SortDir::Asc))
//!     .unwrap();
//! assert_eq!(page.entries.len(), retained.len());
//! ```
//!
//! # Features
//!
//! ## Identity Without Ownership
//!
//! Tokens never keep an object alive:
//!
//! ```
//! use heapview_core::{Heap, Text};
//!
//! let heap = Heap::new();
//! let text = heap.alloc(Text::new("transient"));
//! let token = Heap::token_of(&text);
//!
//! drop(text);
//! assert!(matches!(heap.resolve(token), Err(e) if e.is_not_found()));
//! ```
//!
//! ## Fail-Safe Summaries
//!
//! A formatter that fails yields a marked string instead of an error:
//!
//! ```
//! use heapview_core::{Classifier, FormatError, HeapObject, Instance, FAILURE_MARKER};
//!
//! let mut classifier = Classifier::new();
//! classifier.register("Socket", |_: &dyn HeapObject| Err(FormatError::new("closed")));
//!
//! let summary = classifier.format_summary(&Instance::new("Socket"), Some(250));
//! assert!(summary.starts_with(FAILURE_MARKER));
//! ```

mod classify;
mod config;
mod diff;
mod error;
mod gc;
mod graph;
mod object;
mod paging;
mod profiler;
mod registry;
mod request;
mod snapshot;
mod token;
mod value;

pub use classify::{
    truncate, Classifier, Formatter, DEFAULT_SUMMARY_LIMIT, FAILURE_MARKER, UNKNOWN_KIND,
};
pub use config::{GraphSettings, LeakConfig, ListingConfig, ProfilerConfig, CONFIG_FILE};
pub use diff::{diff, diff_snapshots, Delta, FirstCapturePolicy, GrowthRecord};
pub use error::{FormatError, ProfilerError, Result};
pub use gc::{collect_cycles, collect_cycles_with_progress, CollectProgressCallback, CollectReport};
pub use graph::{
    direct_referents, direct_referrers, reference_graph, referrer_index, Direction, GraphConfig,
    RefGraph, RefNode, MAX_DEPTH,
};
pub use object::{kind_label, AsAny, HeapObject, ObjectRef};
pub use paging::{paginate, Page, PageRequest, PageRounding, SortDir, SortField, PAGE_SIZE};
pub use profiler::{Inspection, Profiler, RelatedObject, COLLECTED_PLACEHOLDER};
pub use registry::Heap;
pub use request::{Action, PanelRequest, PanelResponse};
pub use snapshot::Snapshot;
pub use token::ObjectToken;
pub use value::{Dict, Instance, List, Set, Text, Value};
