use super::assertions::Assertion;
use super::steps::ScenarioStep;
use super::workspace::TestWorkspace;
use anyhow::{anyhow, bail, ensure, Context, Result};
use heapview_core::{
    Action, FormatError, Heap, HeapObject, Instance, ObjectToken, PageRequest, PanelRequest,
    PanelResponse, Profiler, Value,
};
use std::collections::HashMap;
use std::sync::Arc;

/// Executes scenarios against a real profiler session
pub struct ScenarioRunner {
    // Keeps the config file alive for the length of the scenario.
    _workspace: TestWorkspace,
    heap: Arc<Heap>,
    profiler: Profiler,
    pools: HashMap<String, Vec<Arc<Instance>>>,
    remembered: HashMap<String, ObjectToken>,
    last_response: Option<PanelResponse>,
    current_step: usize,
}

impl ScenarioRunner {
    /// Create a new runner, loading `config` as the session's heapview.toml
    pub fn new(config: Option<&str>) -> Result<Self> {
        let workspace = match config {
            Some(toml) => TestWorkspace::with_config(toml)?,
            None => TestWorkspace::empty()?,
        };
        let heap = Arc::new(Heap::new());
        let profiler = Profiler::with_config(Arc::clone(&heap), workspace.load_config()?);

        Ok(Self {
            _workspace: workspace,
            heap,
            profiler,
            pools: HashMap::new(),
            remembered: HashMap::new(),
            last_response: None,
            current_step: 0,
        })
    }

    /// Get current step number
    pub fn current_step(&self) -> usize {
        self.current_step
    }

    /// Execute all steps in sequence
    pub fn execute(&mut self, steps: &[ScenarioStep]) -> Result<()> {
        for (i, step) in steps.iter().enumerate() {
            self.current_step = i;
            self.execute_step(step)
                .with_context(|| format!("Step {}: {:?}", i, step))?;
        }
        Ok(())
    }

    /// Execute a single step
    fn execute_step(&mut self, step: &ScenarioStep) -> Result<()> {
        match step {
            ScenarioStep::Allocate { pool, kind, count } => {
                self.handle_allocate(pool, kind, *count);
                Ok(())
            }
            ScenarioStep::AllocateGarbageCycles { kind, pairs } => {
                self.handle_garbage_cycles(kind, *pairs);
                Ok(())
            }
            ScenarioStep::Release { pool, count } => self.handle_release(pool, *count),
            ScenarioStep::Link { from_pool, to_pool } => self.handle_link(from_pool, to_pool),
            ScenarioStep::RememberToken { pool, index, name } => {
                self.handle_remember(pool, *index, name)
            }
            ScenarioStep::RegisterFailingFormatter { kind, reason } => {
                let reason = reason.clone();
                self.profiler
                    .classifier_mut()
                    .register(kind.clone(), move |_: &dyn HeapObject| {
                        Err(FormatError::new(reason.clone()))
                    });
                Ok(())
            }

            ScenarioStep::Capture => {
                self.dispatch(PanelRequest::new(Action::CaptureLeaks));
                Ok(())
            }
            ScenarioStep::Request { query } => {
                let request = PanelRequest::from_query(query)?;
                self.dispatch(request);
                Ok(())
            }
            ScenarioStep::InspectRemembered { name } => {
                let token = self.remembered_token(name)?;
                self.dispatch(PanelRequest::new(Action::InspectObject).with_token(token));
                Ok(())
            }
            ScenarioStep::GraphRemembered {
                name,
                backrefs,
                depth,
            } => {
                let token = self.remembered_token(name)?;
                let action = if *backrefs {
                    Action::BackrefGraph
                } else {
                    Action::RefGraph
                };
                let mut request = PanelRequest::new(action).with_token(token);
                request.depth = *depth;
                self.dispatch(request);
                Ok(())
            }

            ScenarioStep::Assert { assertion } => self.handle_assertion(assertion),
        }
    }

    // ===== Application action handlers =====

    fn handle_allocate(&mut self, pool: &str, kind: &str, count: usize) {
        let objects = self.pools.entry(pool.to_string()).or_default();
        for _ in 0..count {
            let index = objects.len() as i64;
            objects.push(
                self.heap
                    .alloc(Instance::new(kind).with("index", index).with("_pool", pool)),
            );
        }
    }

    fn handle_garbage_cycles(&mut self, kind: &str, pairs: usize) {
        for _ in 0..pairs {
            let a = self.heap.alloc(Instance::new(kind));
            let b = self.heap.alloc(Instance::new(kind));
            a.set("peer", Value::object(&b));
            b.set("peer", Value::object(&a));
        }
    }

    fn handle_release(&mut self, pool: &str, count: Option<usize>) -> Result<()> {
        let objects = self
            .pools
            .get_mut(pool)
            .ok_or_else(|| anyhow!("No pool named {:?}", pool))?;
        let keep = match count {
            Some(count) => objects.len().saturating_sub(count),
            None => 0,
        };
        objects.truncate(keep);
        Ok(())
    }

    fn handle_link(&mut self, from_pool: &str, to_pool: &str) -> Result<()> {
        let from = self.pooled(from_pool, 0)?;
        let to = self.pooled(to_pool, 0)?;
        from.set(format!("ref_{}", to_pool), Value::object(&to));
        Ok(())
    }

    fn handle_remember(&mut self, pool: &str, index: usize, name: &str) -> Result<()> {
        let object = self.pooled(pool, index)?;
        self.remembered
            .insert(name.to_string(), Heap::token_of(&object));
        Ok(())
    }

    fn pooled(&self, pool: &str, index: usize) -> Result<Arc<Instance>> {
        self.pools
            .get(pool)
            .and_then(|objects| objects.get(index))
            .cloned()
            .ok_or_else(|| anyhow!("No object {} in pool {:?}", index, pool))
    }

    fn remembered_token(&self, name: &str) -> Result<ObjectToken> {
        self.remembered
            .get(name)
            .copied()
            .ok_or_else(|| anyhow!("No token remembered as {:?}", name))
    }

    fn dispatch(&mut self, request: PanelRequest) {
        self.last_response = Some(self.profiler.dispatch(&request));
    }

    fn last_response(&self) -> Result<&PanelResponse> {
        self.last_response
            .as_ref()
            .ok_or_else(|| anyhow!("No panel request has been made yet"))
    }

    fn last_page(&self) -> Result<&heapview_core::Page> {
        match self.last_response()? {
            PanelResponse::Objects { page, .. } => Ok(page),
            other => bail!("Expected an object listing, got {:?}", other),
        }
    }

    // ===== Assertion handler =====

    fn handle_assertion(&mut self, assertion: &Assertion) -> Result<()> {
        match assertion {
            Assertion::GrowthRecords(expected) => {
                let actual: Vec<(String, usize, usize)> = self
                    .profiler
                    .leaks()
                    .iter()
                    .map(|r| (r.kind.clone(), r.new_count, r.total_count))
                    .collect();
                ensure!(
                    &actual == expected,
                    "Expected growth {:?}, got {:?}",
                    expected,
                    actual
                );
            }
            Assertion::NoGrowth => {
                let records = self.profiler.leaks();
                ensure!(records.is_empty(), "Expected no growth, got {:?}", records);
            }
            Assertion::KindNotInGrowth(kind) => {
                ensure!(
                    self.profiler.leaks().iter().all(|r| &r.kind != kind),
                    "Kind {:?} unexpectedly reported as growing",
                    kind
                );
            }
            Assertion::CaptureCount(expected) => {
                let actual = self.profiler.captures();
                ensure!(
                    actual == *expected,
                    "Expected {} captures, got {}",
                    expected,
                    actual
                );
            }

            Assertion::Redirected => {
                let response = self.last_response()?;
                ensure!(
                    response.is_redirect(),
                    "Expected a redirect, got {:?}",
                    response
                );
            }
            Assertion::NotRedirected => {
                let response = self.last_response()?;
                ensure!(
                    !response.is_redirect(),
                    "Unexpected redirect: {:?}",
                    response
                );
            }
            Assertion::PageLen(expected) => {
                let actual = self.last_page()?.entries.len();
                ensure!(
                    actual == *expected,
                    "Expected {} entries, got {}",
                    expected,
                    actual
                );
            }
            Assertion::TotalPages(expected) => {
                let actual = self.last_page()?.total_pages;
                ensure!(
                    actual == *expected,
                    "Expected {} pages, got {}",
                    expected,
                    actual
                );
            }
            Assertion::TotalItems(expected) => {
                let actual = self.last_page()?.total_items;
                ensure!(
                    actual == *expected,
                    "Expected {} items, got {}",
                    expected,
                    actual
                );
            }
            Assertion::PageHoldsHighestTokensOf { pool } => {
                let page = self.last_page()?;
                let mut tokens: Vec<ObjectToken> = self
                    .pools
                    .get(pool)
                    .ok_or_else(|| anyhow!("No pool named {:?}", pool))?
                    .iter()
                    .map(Heap::token_of)
                    .collect();
                tokens.sort_unstable_by(|a, b| b.cmp(a));
                tokens.truncate(page.entries.len());
                ensure!(
                    page.tokens() == tokens,
                    "Page does not hold the highest tokens of pool {:?}",
                    pool
                );
            }
            Assertion::PageTokensAscending => {
                let tokens = self.last_page()?.tokens();
                ensure!(
                    tokens.windows(2).all(|pair| pair[0] < pair[1]),
                    "Tokens not ascending: {:?}",
                    tokens
                );
            }
            Assertion::EverySummaryStartsWith(prefix) => {
                let page = self.last_page()?;
                ensure!(!page.is_empty(), "Expected a non-empty page");
                for (token, summary) in &page.entries {
                    ensure!(
                        summary.starts_with(prefix.as_str()),
                        "Summary of {} does not start with {:?}: {:?}",
                        token,
                        prefix,
                        summary
                    );
                }
            }
            Assertion::InspectedKind(expected) => match self.last_response()? {
                PanelResponse::Inspection(inspection) => ensure!(
                    &inspection.kind == expected,
                    "Expected kind {:?}, got {:?}",
                    expected,
                    inspection.kind
                ),
                other => bail!("Expected an inspection, got {:?}", other),
            },
            Assertion::AttributeNames(expected) => match self.last_response()? {
                PanelResponse::Inspection(inspection) => {
                    let names: Vec<String> = inspection
                        .attributes
                        .iter()
                        .map(|(name, _)| name.clone())
                        .collect();
                    ensure!(
                        &names == expected,
                        "Expected attributes {:?}, got {:?}",
                        expected,
                        names
                    );
                }
                other => bail!("Expected an inspection, got {:?}", other),
            },
            Assertion::ReferrerKinds(expected) => match self.last_response()? {
                PanelResponse::Inspection(inspection) => {
                    let kinds: Vec<String> = inspection
                        .referrers
                        .iter()
                        .map(|r| r.kind.clone())
                        .collect();
                    ensure!(
                        &kinds == expected,
                        "Expected referrer kinds {:?}, got {:?}",
                        expected,
                        kinds
                    );
                }
                other => bail!("Expected an inspection, got {:?}", other),
            },
            Assertion::GraphNodeCount(expected) => match self.last_response()? {
                PanelResponse::Graph { graph, dot } => {
                    ensure!(
                        graph.nodes.len() == *expected,
                        "Expected {} graph nodes, got {}",
                        expected,
                        graph.nodes.len()
                    );
                    ensure!(dot.starts_with("digraph"), "DOT output missing");
                }
                other => bail!("Expected a graph, got {:?}", other),
            },

            Assertion::OverviewLeader { kind, count } => {
                let overview = self.profiler.overview();
                let leader = overview
                    .first()
                    .ok_or_else(|| anyhow!("Overview is empty"))?;
                ensure!(
                    &leader.0 == kind && leader.1 == *count,
                    "Expected overview leader ({:?}, {}), got {:?}",
                    kind,
                    count,
                    leader
                );
            }
            Assertion::LiveCount { kind, count } => {
                let page = self
                    .profiler
                    .list_by_kind(kind, &PageRequest::default().with_page_size(1));
                ensure!(
                    page.total_items == *count,
                    "Expected {} live {:?}, got {}",
                    count,
                    kind,
                    page.total_items
                );
            }

            Assertion::Custom(check) => check(&mut self.profiler)?,
        }
        Ok(())
    }
}
