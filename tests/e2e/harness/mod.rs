//! E2E test harness for heapview.
//!
//! This module contains test infrastructure with intentionally unused builders,
//! variants, and methods that will be used as more e2e scenarios are written.

#![allow(dead_code)]

pub mod runner;
pub mod scenario;

// Re-export commonly used types
pub use assertions::Assertion;
pub use scenario::Scenario;
