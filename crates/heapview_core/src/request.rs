//! Panel requests and responses.
//!
//! The panel talks to a [`Profiler`] through loosely typed query parameters.
//! [`PanelRequest::from_query`] turns them into a sanitised request and
//! [`Profiler::dispatch`] answers it. A token or kind that no longer resolves
//! is answered with a redirect to the overview, never with an error.

use crate::diff::GrowthRecord;
use crate::error::{ProfilerError, Result};
use crate::graph::{Direction, RefGraph, MAX_DEPTH};
use crate::paging::{Page, SortDir, SortField};
use crate::profiler::{Inspection, Profiler};
use crate::token::ObjectToken;
use serde::Serialize;
use tracing::{debug, warn};

/// What the panel asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Action {
    /// Most populous kinds.
    ViewOverview,
    /// Live objects of one kind.
    ListByType,
    /// Capture a snapshot and diff it against the previous one.
    CaptureLeaks,
    /// Records from the last capture, without capturing.
    ViewLeaks,
    /// New objects of one kind from the last capture.
    ListLeakedObjects,
    /// One object in detail.
    InspectObject,
    /// Chain of objects referenced by one object.
    RefGraph,
    /// Chain of objects referencing one object.
    BackrefGraph,
}

impl Action {
    /// Every action, in menu order.
    pub const ALL: [Action; 8] = [
        Action::ViewOverview,
        Action::ListByType,
        Action::CaptureLeaks,
        Action::ViewLeaks,
        Action::ListLeakedObjects,
        Action::InspectObject,
        Action::RefGraph,
        Action::BackrefGraph,
    ];

    /// Name used in queries.
    pub fn name(self) -> &'static str {
        match self {
            Action::ViewOverview => "view-overview",
            Action::ListByType => "list-by-type",
            Action::CaptureLeaks => "capture-leaks",
            Action::ViewLeaks => "view-leaks",
            Action::ListLeakedObjects => "list-leaked-objects",
            Action::InspectObject => "inspect-object",
            Action::RefGraph => "ref-graph",
            Action::BackrefGraph => "backref-graph",
        }
    }

    /// Looks an action up by its query name.
    ///
    /// # Errors
    ///
    /// Returns `ProfilerError::InvalidRequest` for an unknown name.
    pub fn from_name(name: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|action| action.name() == name)
            .ok_or_else(|| ProfilerError::InvalidRequest(format!("unknown action '{}'", name)))
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A sanitised panel request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelRequest {
    /// Requested action.
    pub action: Action,
    /// `type` parameter; `None` when missing or empty.
    pub kind: Option<String>,
    /// `id` parameter; `None` when missing or not a token.
    pub token: Option<ObjectToken>,
    /// Sort column.
    pub sort: SortField,
    /// Sort direction.
    pub dir: SortDir,
    /// Zero-based page.
    pub page: usize,
    /// Chain depth, at most [`MAX_DEPTH`].
    pub depth: usize,
}

impl PanelRequest {
    /// A request for `action` with every parameter at its default.
    pub fn new(action: Action) -> Self {
        Self {
            action,
            kind: None,
            token: None,
            sort: SortField::Token,
            dir: SortDir::Asc,
            page: 0,
            depth: MAX_DEPTH,
        }
    }

    /// Sets the `type` parameter.
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    /// Sets the `id` parameter.
    pub fn with_token(mut self, token: ObjectToken) -> Self {
        self.token = Some(token);
        self
    }

    /// Sets sort column and direction.
    pub fn sorted(mut self, sort: SortField, dir: SortDir) -> Self {
        self.sort = sort;
        self.dir = dir;
        self
    }

    /// Builds a request from query pairs.
    ///
    /// Bad paging values are clamped rather than rejected: a `sort` outside
    /// `{0, 1}` becomes 0, a negative or unparsable `page` becomes 0, any
    /// non-zero `dir` means descending and `depth` is capped at
    /// [`MAX_DEPTH`]. A missing `action` means the overview. When a key
    /// repeats, the first value wins.
    ///
    /// # Errors
    ///
    /// Returns `ProfilerError::InvalidRequest` for an unknown action.
    pub fn from_query<K, V>(params: &[(K, V)]) -> Result<Self>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let get = |key: &str| {
            params
                .iter()
                .find(|(k, _)| k.as_ref() == key)
                .map(|(_, v)| v.as_ref().trim())
        };
        let int = |key: &str| get(key).and_then(|v| v.parse::<i64>().ok());

        let action = match get("action") {
            Some(name) if !name.is_empty() => Action::from_name(name)?,
            _ => Action::ViewOverview,
        };

        let depth = match int("depth") {
            Some(depth) => usize::try_from(depth).unwrap_or(0).min(MAX_DEPTH),
            None => MAX_DEPTH,
        };

        Ok(Self {
            action,
            kind: get("type").filter(|k| !k.is_empty()).map(str::to_string),
            token: get("id").and_then(|v| ObjectToken::parse(v).ok()),
            sort: SortField::from_index(int("sort").unwrap_or(0)),
            dir: SortDir::from_flag(int("dir").unwrap_or(0)),
            page: int("page")
                .and_then(|p| usize::try_from(p).ok())
                .unwrap_or(0),
            depth,
        })
    }

    /// Query pairs for this request, the inverse of
    /// [`from_query`](Self::from_query).
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = vec![("action", self.action.name().to_string())];
        if let Some(kind) = &self.kind {
            query.push(("type", kind.clone()));
        }
        if let Some(token) = self.token {
            query.push(("id", token.to_string()));
        }
        match self.action {
            Action::ListByType | Action::ListLeakedObjects => {
                query.push(("sort", self.sort.index().to_string()));
                query.push(("dir", self.dir.flag().to_string()));
                query.push(("page", self.page.to_string()));
            }
            Action::RefGraph | Action::BackrefGraph => {
                query.push(("depth", self.depth.to_string()));
            }
            _ => {}
        }
        query
    }

    /// The request a column header links to.
    ///
    /// Re-sorting on the active column flips the direction; switching
    /// columns starts ascending. The page is kept.
    pub fn sort_link(&self, field: SortField) -> Self {
        let dir = if field == self.sort {
            self.dir.reversed()
        } else {
            SortDir::Asc
        };
        Self {
            sort: field,
            dir,
            ..self.clone()
        }
    }

    /// The request a pager link points to.
    pub fn page_link(&self, page: usize) -> Self {
        Self {
            page,
            ..self.clone()
        }
    }
}

/// Answer to a [`PanelRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum PanelResponse {
    /// Most populous kinds, largest first.
    Overview {
        /// `(kind, live count)` pairs.
        kinds: Vec<(String, usize)>,
    },
    /// A page of objects of one kind.
    Objects {
        /// Kind listed.
        kind: String,
        /// True when listing the kind's cohort from the last capture.
        leaked: bool,
        /// The page.
        page: Page,
    },
    /// Growth records.
    Leaks {
        /// Records, largest growth first.
        records: Vec<GrowthRecord>,
    },
    /// One object in detail.
    Inspection(Inspection),
    /// A reference chain.
    Graph {
        /// The chain.
        graph: RefGraph,
        /// Graphviz text for it.
        dot: String,
    },
    /// The request cannot be served; show the overview instead.
    Redirect {
        /// Where to go.
        to: Action,
        /// Why.
        reason: String,
    },
}

impl PanelResponse {
    fn redirect(reason: impl Into<String>) -> Self {
        Self::Redirect {
            to: Action::ViewOverview,
            reason: reason.into(),
        }
    }

    /// True for [`PanelResponse::Redirect`].
    pub fn is_redirect(&self) -> bool {
        matches!(self, Self::Redirect { .. })
    }
}

impl Profiler {
    /// Serves one panel request.
    ///
    /// Only [`Action::CaptureLeaks`] changes session state.
    pub fn dispatch(&mut self, request: &PanelRequest) -> PanelResponse {
        debug!(action = %request.action, "dispatching panel request");
        match self.serve(request) {
            Ok(response) => response,
            Err(err) => {
                if !err.is_not_found() {
                    warn!(action = %request.action, error = %err, "panel request failed");
                }
                PanelResponse::redirect(err.to_string())
            }
        }
    }

    fn serve(&mut self, request: &PanelRequest) -> Result<PanelResponse> {
        let page_request = self.page_request(request.sort, request.dir, request.page);

        let response = match request.action {
            Action::ViewOverview => PanelResponse::Overview {
                kinds: self.overview(),
            },
            Action::ListByType => {
                let kind = required_kind(request)?;
                PanelResponse::Objects {
                    page: self.list_by_kind(kind, &page_request),
                    kind: kind.to_string(),
                    leaked: false,
                }
            }
            Action::CaptureLeaks => PanelResponse::Leaks {
                records: self.capture_and_diff().to_vec(),
            },
            Action::ViewLeaks => PanelResponse::Leaks {
                records: self.leaks().to_vec(),
            },
            Action::ListLeakedObjects => {
                let kind = required_kind(request)?;
                PanelResponse::Objects {
                    page: self.list_new_objects(kind, &page_request)?,
                    kind: kind.to_string(),
                    leaked: true,
                }
            }
            Action::InspectObject => {
                PanelResponse::Inspection(self.resolve_for_inspection(required_token(request)?)?)
            }
            Action::RefGraph | Action::BackrefGraph => {
                let direction = if request.action == Action::RefGraph {
                    Direction::Referents
                } else {
                    Direction::Referrers
                };
                let graph =
                    self.reference_graph(required_token(request)?, direction, request.depth)?;
                PanelResponse::Graph {
                    dot: graph.to_dot(),
                    graph,
                }
            }
        };
        Ok(response)
    }
}

fn required_kind(request: &PanelRequest) -> Result<&str> {
    request
        .kind
        .as_deref()
        .ok_or_else(|| ProfilerError::InvalidRequest("missing 'type' parameter".into()))
}

fn required_token(request: &PanelRequest) -> Result<ObjectToken> {
    request
        .token
        .ok_or_else(|| ProfilerError::InvalidRequest("missing or invalid 'id' parameter".into()))
}
