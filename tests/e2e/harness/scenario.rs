use super::assertions::Assertion;
use super::runner::ScenarioRunner;
use super::steps::ScenarioStep;

/// Fluent DSL for building test scenarios
pub struct Scenario {
    name: String,
    config: Option<String>,
    steps: Vec<ScenarioStep>,
}

impl Scenario {
    /// Create a new scenario with the given name
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            config: None,
            steps: Vec::new(),
        }
    }

    // ===== Initial setup =====

    /// Write a heapview.toml the session loads on start
    pub fn with_config(mut self, toml: &str) -> Self {
        self.config = Some(toml.to_string());
        self
    }

    // ===== Application actions =====

    /// Allocate `count` objects of `kind`, held in a pool named after the kind
    pub fn app_allocates(self, kind: &str, count: usize) -> Self {
        self.app_allocates_into(kind, kind, count)
    }

    /// Allocate `count` objects of `kind`, held in the named pool
    pub fn app_allocates_into(mut self, pool: &str, kind: &str, count: usize) -> Self {
        self.steps.push(ScenarioStep::Allocate {
            pool: pool.to_string(),
            kind: kind.to_string(),
            count,
        });
        self
    }

    /// Allocate reference cycles of `kind` and drop them at once
    pub fn app_leaves_cycles(mut self, kind: &str, pairs: usize) -> Self {
        self.steps.push(ScenarioStep::AllocateGarbageCycles {
            kind: kind.to_string(),
            pairs,
        });
        self
    }

    /// Drop every object in a pool
    pub fn app_releases(mut self, pool: &str) -> Self {
        self.steps.push(ScenarioStep::Release {
            pool: pool.to_string(),
            count: None,
        });
        self
    }

    /// Drop the last `count` objects in a pool
    pub fn app_releases_some(mut self, pool: &str, count: usize) -> Self {
        self.steps.push(ScenarioStep::Release {
            pool: pool.to_string(),
            count: Some(count),
        });
        self
    }

    /// Make the first object of one pool reference the first of another
    pub fn app_links(mut self, from_pool: &str, to_pool: &str) -> Self {
        self.steps.push(ScenarioStep::Link {
            from_pool: from_pool.to_string(),
            to_pool: to_pool.to_string(),
        });
        self
    }

    /// Note the token of a pooled object for later requests
    pub fn remember(mut self, pool: &str, index: usize, name: &str) -> Self {
        self.steps.push(ScenarioStep::RememberToken {
            pool: pool.to_string(),
            index,
            name: name.to_string(),
        });
        self
    }

    /// Register a summary formatter for `kind` that always fails
    pub fn formatter_fails_for(mut self, kind: &str, reason: &str) -> Self {
        self.steps.push(ScenarioStep::RegisterFailingFormatter {
            kind: kind.to_string(),
            reason: reason.to_string(),
        });
        self
    }

    // ===== Panel actions =====

    /// Capture a snapshot and diff it against the previous one
    pub fn capture(mut self) -> Self {
        self.steps.push(ScenarioStep::Capture);
        self
    }

    /// Send a raw panel query
    pub fn request(mut self, query: &[(&str, &str)]) -> Self {
        self.steps.push(ScenarioStep::Request {
            query: query
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        });
        self
    }

    /// Inspect a remembered object
    pub fn inspect(mut self, name: &str) -> Self {
        self.steps.push(ScenarioStep::InspectRemembered {
            name: name.to_string(),
        });
        self
    }

    /// Walk the reference chain of a remembered object
    pub fn graph(mut self, name: &str, backrefs: bool, depth: usize) -> Self {
        self.steps.push(ScenarioStep::GraphRemembered {
            name: name.to_string(),
            backrefs,
            depth,
        });
        self
    }

    // ===== Assertions =====

    /// Add a general assertion
    pub fn assert(mut self, assertion: Assertion) -> Self {
        self.steps.push(ScenarioStep::Assert { assertion });
        self
    }

    /// Assert the exact growth records of the last capture
    pub fn assert_growth(self, records: &[(&str, usize, usize)]) -> Self {
        self.assert(Assertion::GrowthRecords(
            records
                .iter()
                .map(|(kind, new, total)| (kind.to_string(), *new, *total))
                .collect(),
        ))
    }

    /// Assert the last capture reported nothing
    pub fn assert_no_growth(self) -> Self {
        self.assert(Assertion::NoGrowth)
    }

    /// Assert the last response redirected to the overview
    pub fn assert_redirected(self) -> Self {
        self.assert(Assertion::Redirected)
    }

    /// Assert the number of entries on the last page
    pub fn assert_page_len(self, len: usize) -> Self {
        self.assert(Assertion::PageLen(len))
    }

    /// Assert the page count of the last listing
    pub fn assert_total_pages(self, pages: usize) -> Self {
        self.assert(Assertion::TotalPages(pages))
    }

    // ===== Execution =====

    /// Execute the scenario and return results
    pub fn run(self) -> ScenarioResult {
        let mut runner = match ScenarioRunner::new(self.config.as_deref()) {
            Ok(r) => r,
            Err(e) => {
                return ScenarioResult {
                    name: self.name.clone(),
                    success: false,
                    steps_executed: 0,
                    failure_step: Some(0),
                    error: Some(format!("Failed to create runner: {}", e)),
                }
            }
        };

        match runner.execute(&self.steps) {
            Ok(()) => ScenarioResult {
                name: self.name,
                success: true,
                steps_executed: self.steps.len(),
                failure_step: None,
                error: None,
            },
            Err(e) => {
                let failure_step = runner.current_step();
                ScenarioResult {
                    name: self.name,
                    success: false,
                    steps_executed: failure_step,
                    failure_step: Some(failure_step),
                    error: Some(format!("{:?}", e)),
                }
            }
        }
    }
}

/// Result of running a scenario
#[derive(Debug)]
pub struct ScenarioResult {
    pub name: String,
    pub success: bool,
    pub steps_executed: usize,
    pub failure_step: Option<usize>,
    pub error: Option<String>,
}

impl ScenarioResult {
    /// Unwrap the result, panicking if it failed
    pub fn unwrap(self) {
        if !self.success {
            panic!(
                "Scenario '{}' failed at step {}: {}",
                self.name,
                self.failure_step.unwrap_or(0),
                self.error.unwrap_or_else(|| "unknown error".to_string())
            );
        }
    }

    /// Expect the result to be successful
    pub fn expect(self, msg: &str) {
        if !self.success {
            panic!(
                "{}: Scenario '{}' failed at step {}: {}",
                msg,
                self.name,
                self.failure_step.unwrap_or(0),
                self.error.unwrap_or_else(|| "unknown error".to_string())
            );
        }
    }
}
