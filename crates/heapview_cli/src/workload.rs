//! Synthetic application workload for the demo and the shell.
//!
//! Simulates a small request handler that builds a few objects per request.
//! Most of them die with the request; a response cache keeps every fifth
//! request alive forever, and each request leaves a parent/child reference
//! cycle behind that only the collector can reclaim.

use heapview_core::{Classifier, Dict, FormatError, Heap, HeapObject, Instance, Text, Value};
use std::sync::Arc;
use tracing::debug;

/// Every `LEAK_EVERY`-th request is retained by the cache.
const LEAK_EVERY: usize = 5;

const PATHS: [&str; 4] = ["/", "/login", "/api/items", "/static/app.js"];

/// A running synthetic application.
pub struct Workload {
    heap: Arc<Heap>,
    // Long-lived state, alive for the whole session.
    config: Arc<Dict>,
    cache: Arc<Dict>,
    served: usize,
}

impl Workload {
    /// Starts the application and allocates its long-lived state.
    pub fn new(heap: Arc<Heap>) -> Self {
        let config = heap.alloc(Dict::new());
        config.insert("debug", false);
        config.insert("workers", 4i64);
        config.insert("name", "demo-app");

        let cache = heap.alloc(Dict::new());
        let app = Self {
            heap,
            config,
            cache,
            served: 0,
        };
        debug!("synthetic workload started");
        app
    }

    /// The heap this workload allocates on.
    pub fn heap(&self) -> &Arc<Heap> {
        &self.heap
    }

    /// Requests served so far.
    pub fn served(&self) -> usize {
        self.served
    }

    /// Requests retained by the cache so far.
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    /// Serves `requests` requests.
    pub fn run_round(&mut self, requests: usize) {
        for _ in 0..requests {
            self.serve_one();
        }
        debug!(
            served = self.served,
            cached = self.cache.len(),
            "workload round finished"
        );
    }

    fn serve_one(&mut self) {
        let id = self.served;
        self.served += 1;

        let path = PATHS[id % PATHS.len()];
        let body = self.heap.alloc(Text::new(format!("<html>{}</html>", path)));
        let request = self.heap.alloc(
            Instance::new("Request")
                .with("id", id as i64)
                .with("path", path)
                .with("body", Value::object(&body))
                .with("_settings", Value::object(&self.config)),
        );

        // Parent and child point at each other; dropping both leaves a cycle.
        let span = self.heap.alloc(Instance::new("Span").with("name", path));
        let child = self
            .heap
            .alloc(Instance::new("Span").with("parent", Value::object(&span)));
        span.set("child", Value::object(&child));

        if id % LEAK_EVERY == 0 {
            self.cache.insert(format!("req-{}", id), Value::object(&request));
        }
    }
}

/// Registers summary formatters for the workload's own kinds.
pub fn register_formatters(classifier: &mut Classifier) {
    classifier.register("Request", |object: &dyn HeapObject| {
        let request = object
            .as_any()
            .downcast_ref::<Instance>()
            .ok_or_else(|| FormatError::new("not an instance"))?;
        let id = match request.get("id") {
            Some(Value::Int(id)) => id,
            _ => return Err(FormatError::new("request without id")),
        };
        let path = request
            .get("path")
            .map(|p| p.repr())
            .unwrap_or_else(|| "?".to_string());
        Ok(format!("Request #{} {}", id, path))
    });
}
