//! Reference chains around a single object.
//!
//! Walks outward from one object through the objects it references
//! (referents) or the objects referencing it (referrers), and exports the
//! result as Graphviz DOT text. Rendering the DOT is left to the caller.

use crate::classify::Classifier;
use crate::error::Result;
use crate::object::HeapObject;
use crate::registry::Heap;
use crate::token::ObjectToken;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};

/// Hard upper bound on chain depth.
pub const MAX_DEPTH: usize = 20;

/// Which way references are followed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Objects the root references, transitively.
    Referents,
    /// Objects referencing the root, transitively.
    Referrers,
}

/// Limits for a chain walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Maximum distance from the root (capped at [`MAX_DEPTH`]).
    pub max_depth: usize,
    /// Maximum nodes to include.
    pub max_nodes: usize,
    /// Summary length for node labels.
    pub summary_limit: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            max_depth: MAX_DEPTH,
            max_nodes: 200,
            summary_limit: 60,
        }
    }
}

/// A node in a reference chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefNode {
    /// Identity token.
    pub token: ObjectToken,
    /// Kind label.
    pub kind: String,
    /// Short summary.
    pub summary: String,
    /// Distance from the root.
    pub depth: usize,
}

/// Reference chain around one object.
///
/// Edges always point from the referencing object to the referenced one,
/// whichever direction the walk went.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefGraph {
    /// Object the walk started from.
    pub root: ObjectToken,
    /// Direction of the walk.
    pub direction: Direction,
    /// Nodes in BFS order, root first.
    pub nodes: Vec<RefNode>,
    /// `(from, to)` reference edges between included nodes.
    pub edges: Vec<(ObjectToken, ObjectToken)>,
    /// True if the node limit stopped the walk early.
    pub truncated: bool,
}

impl RefGraph {
    /// Renders the chain as Graphviz DOT text.
    pub fn to_dot(&self) -> String {
        let mut output = String::from("digraph G {\n");
        output.push_str("  rankdir=LR;\n");
        output.push_str("  node [shape=box];\n\n");

        let mut node_labels: HashMap<ObjectToken, String> = HashMap::new();
        for (i, node) in self.nodes.iter().enumerate() {
            node_labels.insert(node.token, format!("n{}", i));
            let style = if node.token == self.root {
                ", style=filled, fillcolor=lightblue"
            } else {
                ""
            };
            output.push_str(&format!(
                "  n{} [label=\"{}\\n{}\"{}];\n",
                i,
                escape_dot_label(&node.kind),
                escape_dot_label(&node.summary),
                style
            ));
        }

        output.push('\n');

        for (from, to) in &self.edges {
            if let (Some(from), Some(to)) = (node_labels.get(from), node_labels.get(to)) {
                output.push_str(&format!("  {} -> {};\n", from, to));
            }
        }

        output.push_str("}\n");
        output
    }
}

/// Tokens of the tracked objects `object` references directly.
pub fn direct_referents(heap: &Heap, object: &dyn HeapObject) -> Vec<ObjectToken> {
    let mut seen = HashSet::new();
    object
        .referents()
        .iter()
        .map(ObjectToken::of_arc)
        .filter(|token| heap.is_live(*token) && seen.insert(*token))
        .collect()
}

/// Tokens of the tracked objects referencing `target` directly.
///
/// Scans the whole heap. Tokens come back ascending.
pub fn direct_referrers(heap: &Heap, target: ObjectToken) -> Vec<ObjectToken> {
    let mut found = Vec::new();
    heap.for_each_live(|token, object| {
        if object
            .referents()
            .iter()
            .any(|child| ObjectToken::of_arc(child) == target)
        {
            found.push(token);
        }
    });
    found.sort_unstable();
    found
}

/// Map from each tracked object to the tracked objects referencing it.
///
/// Built with one pass over the whole heap.
pub fn referrer_index(heap: &Heap) -> HashMap<ObjectToken, Vec<ObjectToken>> {
    let mut index: HashMap<ObjectToken, Vec<ObjectToken>> = HashMap::new();
    heap.for_each_live(|token, object| {
        let mut seen = HashSet::new();
        for child in object.referents() {
            let child = ObjectToken::of_arc(&child);
            if seen.insert(child) {
                index.entry(child).or_default().push(token);
            }
        }
    });
    index
}

/// Walks the reference chain around `root`.
///
/// # Errors
///
/// Returns `ProfilerError::ObjectNotFound` if `root` does not resolve.
pub fn reference_graph(
    heap: &Heap,
    classifier: &Classifier,
    root: ObjectToken,
    direction: Direction,
    depth: usize,
    config: &GraphConfig,
) -> Result<RefGraph> {
    let root_object = heap.resolve(root)?;
    let max_depth = depth.min(config.max_depth).min(MAX_DEPTH);
    let referrers = match direction {
        Direction::Referrers => Some(referrer_index(heap)),
        Direction::Referents => None,
    };

    let mut visited = HashSet::from([root]);
    let mut queue = VecDeque::from([(root, 0usize)]);
    let mut nodes = Vec::new();
    let mut edges = Vec::new();
    let mut truncated = false;

    while let Some((token, level)) = queue.pop_front() {
        // The root is already resolved; everything else may have died since
        // it was queued.
        let object = if token == root {
            root_object.clone()
        } else {
            match heap.resolve(token) {
                Ok(object) => object,
                Err(_) => continue,
            }
        };

        if nodes.len() >= config.max_nodes {
            truncated = true;
            break;
        }

        nodes.push(RefNode {
            token,
            kind: classifier.kind_of(&*object),
            summary: classifier.format_summary(&*object, Some(config.summary_limit)),
            depth: level,
        });

        if level >= max_depth {
            continue;
        }

        let neighbors = match &referrers {
            None => direct_referents(heap, &*object),
            Some(index) => index.get(&token).cloned().unwrap_or_default(),
        };

        for neighbor in neighbors {
            let edge = match direction {
                Direction::Referents => (token, neighbor),
                Direction::Referrers => (neighbor, token),
            };
            edges.push(edge);
            if visited.insert(neighbor) {
                queue.push_back((neighbor, level + 1));
            }
        }
    }

    let included: HashSet<ObjectToken> = nodes.iter().map(|n| n.token).collect();
    edges.retain(|(from, to)| included.contains(from) && included.contains(to));

    Ok(RefGraph {
        root,
        direction,
        nodes,
        edges,
        truncated,
    })
}

/// Escape special characters for DOT labels.
fn escape_dot_label(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}
