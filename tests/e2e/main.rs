//! End-to-end scenarios driving a profiler session through panel requests.

mod harness;
mod scenarios;
