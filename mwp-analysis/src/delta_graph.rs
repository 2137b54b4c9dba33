// SPDX-License-Identifier: PMPL-1.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell

//! Delta graph: incremental detection of unavoidable failure.
//!
//! Nodes are delta sequences that have been labeled `∞` by a loop
//! correction, bucketed by length. Two same-length nodes are connected
//! by an edge labeled with the single index where they differ. When a
//! node has a full clique of same-label neighbours — one per remaining
//! domain value — the choice at that index is irrelevant: the clique
//! collapses to the common subsequence. If the empty sequence is ever
//! derived, every derivation fails and the analysis can stop early.

use rustc_hash::FxHashMap;

use crate::monomial::{Delta, Monomial};

/// A node: an index-ordered delta sequence.
pub type Node = Vec<Delta>;

/// Weighted graph of `∞`-labeled delta sequences.
#[derive(Debug, Clone)]
pub struct DeltaGraph {
    /// Number of derivation choices per index (the domain size).
    degree: usize,
    /// level (node length) → node → neighbour → differing index
    graph: FxHashMap<usize, FxHashMap<Node, FxHashMap<Node, usize>>>,
}

impl Default for DeltaGraph {
    fn default() -> Self {
        Self::new(3)
    }
}

impl DeltaGraph {
    /// Create an empty graph for the given domain size.
    pub fn new(degree: usize) -> Self {
        Self {
            degree,
            graph: FxHashMap::default(),
        }
    }

    /// Record a monomial whose scalar became `∞`.
    pub fn from_monomial(&mut self, monomial: &Monomial) {
        self.insert_node(monomial.deltas.clone());
    }

    /// True when the empty sequence was derived: failure no longer
    /// depends on any choice.
    pub fn forces_infinity(&self) -> bool {
        self.graph
            .get(&0)
            .is_some_and(|level| level.contains_key(&Vec::new()))
    }

    /// Insert a node, connecting it to every same-length node it
    /// differs from at exactly one index.
    pub fn insert_node(&mut self, node: Node) {
        let size = node.len();
        let level = self.graph.entry(size).or_default();
        if level.contains_key(&node) {
            return;
        }
        if level.is_empty() {
            level.insert(node, FxHashMap::default());
            return;
        }
        let mut edges = Vec::new();
        for other in level.keys() {
            let (diff, index) = node_diff(&node, other, None);
            if diff {
                if let Some(index) = index {
                    edges.push((other.clone(), index));
                }
            }
        }
        if edges.is_empty() {
            level.insert(node, FxHashMap::default());
        } else {
            for (other, label) in edges {
                self.insert_edge(node.clone(), other, label);
            }
        }
    }

    /// Add a symmetric edge between two nodes, creating them as needed.
    fn insert_edge(&mut self, node1: Node, node2: Node, label: usize) {
        let level = self.graph.entry(node1.len()).or_default();
        level
            .entry(node1.clone())
            .or_default()
            .insert(node2.clone(), label);
        level.entry(node2).or_default().insert(node1, label);
    }

    /// Remove a node together with every neighbour reached through an
    /// edge with the given label (they belong to the same collapsing
    /// clique).
    fn remove_node(&mut self, node: &Node, index: usize) {
        let size = node.len();
        let Some(level) = self.graph.get_mut(&size) else {
            return;
        };
        let Some(edges) = level.remove(node) else {
            return;
        };
        for (neighbour, label) in edges {
            let present = self
                .graph
                .get(&size)
                .is_some_and(|level| level.contains_key(&neighbour));
            if !present {
                continue;
            }
            if label == index {
                self.remove_node(&neighbour, index);
            } else if let Some(n_edges) = self
                .graph
                .get_mut(&size)
                .and_then(|level| level.get_mut(&neighbour))
            {
                n_edges.remove(node);
            }
        }
    }

    /// True when the node sits in a clique of `degree − 1` neighbours
    /// all differing at `index`.
    fn is_full(&self, node: &Node, size: usize, index: usize) -> bool {
        let adjacent = self.graph[&size][node]
            .values()
            .filter(|&&label| label == index)
            .count();
        adjacent == self.degree - 1
    }

    /// Collapse every same-label clique, longest nodes first.
    ///
    /// A clique at index `j` means all domain values at `j` fail under
    /// the same remaining conditions, so the sequences merge into their
    /// common subsequence without the `j` delta.
    pub fn fusion(&mut self) {
        let mut sizes: Vec<usize> = self.graph.keys().copied().collect();
        sizes.sort_unstable_by(|a, b| b.cmp(a));
        for size in sizes {
            let nodes: Vec<Node> = match self.graph.get(&size) {
                Some(level) => level.keys().cloned().collect(),
                None => continue,
            };
            for node in nodes {
                let indices: Vec<usize> = node.iter().map(|&(_, j)| j).collect();
                for index in indices {
                    let present = self
                        .graph
                        .get(&size)
                        .is_some_and(|level| level.contains_key(&node));
                    if present && self.is_full(&node, size, index) {
                        self.remove_node(&node, index);
                        self.insert_node(remove_index(&node, index));
                    }
                }
            }
        }
    }
}

/// Drop every delta with the given index from a sequence.
fn remove_index(node: &Node, index: usize) -> Node {
    node.iter().copied().filter(|&(_, j)| j != index).collect()
}

/// Compare two same-length sequences; `(true, Some(j))` when they
/// differ in exactly one delta, on both sides at the same index `j`.
fn node_diff(node1: &Node, node2: &Node, expected: Option<usize>) -> (bool, Option<usize>) {
    let mut diff_found = false;
    let mut index = expected;
    for delta in node1 {
        if node2.contains(delta) {
            continue;
        }
        let at = delta.1;
        if diff_found {
            return (false, Some(at));
        }
        match index {
            Some(expected) if expected != at => return (false, Some(expected)),
            Some(_) => diff_found = true,
            None => {
                // the other side must also have exactly one mismatch at `at`
                let (diff, _) = node_diff(node2, node1, Some(at));
                if diff {
                    index = Some(at);
                    diff_found = true;
                } else {
                    return (false, Some(at));
                }
            }
        }
    }
    (diff_found, index)
}
