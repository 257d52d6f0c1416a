//! A small generic DAG utility, grounded in the teacher's use of
//! `petgraph::graph::DiGraph` for its `EqualityGraph` (`core/solver/src/db.rs`).
//!
//! Used for the assertion creation-order dependency graph (edge
//! `theorem -> referenced assertion`) and, inside the syntactic parser, to
//! detect a syntax axiom whose pattern is left-recursive. spec.md 8's "DAG
//! invariant" — the topological order is consistent with the edge set, and
//! `reachable` is the transitive closure of edges — is exercised in the
//! tests below.

use std::collections::HashMap;
use std::hash::Hash;

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Bfs, Reversed};

#[derive(Debug, Clone)]
pub struct Dag<T: Eq + Hash + Clone> {
    graph: DiGraph<T, ()>,
    index: HashMap<T, NodeIndex>,
}

impl<T: Eq + Hash + Clone> Default for Dag<T> {
    fn default() -> Self {
        Self { graph: DiGraph::new(), index: HashMap::new() }
    }
}

impl<T: Eq + Hash + Clone> Dag<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, value: T) -> NodeIndex {
        if let Some(&ix) = self.index.get(&value) {
            return ix;
        }
        let ix = self.graph.add_node(value.clone());
        self.index.insert(value, ix);
        ix
    }

    /// Add edge `from -> to`, meaning "`from` depends on `to`".
    pub fn add_edge(&mut self, from: T, to: T) {
        let a = self.add_node(from);
        let b = self.add_node(to);
        self.graph.update_edge(a, b, ());
    }

    /// Topological order consistent with the edge set: every `from -> to`
    /// edge has `to` at or before `from`'s position would be wrong for a
    /// dependency graph read this way — for "theorem depends on earlier
    /// assertion" edges, dependencies (`to`) come *before* dependents
    /// (`from`) in proof/creation order, so we reverse petgraph's
    /// source-before-sink order to get that.
    pub fn topo_order(&self) -> Option<Vec<T>> {
        let order = toposort(&self.graph, None).ok()?;
        Some(order.into_iter().rev().map(|ix| self.graph[ix].clone()).collect())
    }

    /// All nodes reachable by following edges from `from` (the transitive
    /// closure of "depends on").
    pub fn reachable(&self, from: &T) -> Vec<T> {
        let Some(&start) = self.index.get(from) else { return Vec::new() };
        let mut bfs = Bfs::new(&self.graph, start);
        let mut out = Vec::new();
        while let Some(nx) = bfs.next(&self.graph) {
            if nx != start {
                out.push(self.graph[nx].clone());
            }
        }
        out
    }

    /// Nodes that (transitively) depend on `to` — the reverse direction of
    /// [`Dag::reachable`].
    pub fn dependents_of(&self, to: &T) -> Vec<T> {
        let Some(&start) = self.index.get(to) else { return Vec::new() };
        let reversed = Reversed(&self.graph);
        let mut bfs = Bfs::new(&reversed, start);
        let mut out = Vec::new();
        while let Some(nx) = bfs.next(&reversed) {
            if nx != start {
                out.push(self.graph[nx].clone());
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topo_order_respects_dependency_edges() {
        let mut dag: Dag<u32> = Dag::new();
        dag.add_edge(2, 0); // 2 depends on 0
        dag.add_edge(2, 1); // 2 depends on 1
        dag.add_edge(1, 0); // 1 depends on 0
        let order = dag.topo_order().unwrap();
        let pos = |x: u32| order.iter().position(|&v| v == x).unwrap();
        assert!(pos(0) < pos(1));
        assert!(pos(1) < pos(2));
    }

    #[test]
    fn reachable_is_transitive_closure() {
        let mut dag: Dag<u32> = Dag::new();
        dag.add_edge(2, 1);
        dag.add_edge(1, 0);
        let mut r = dag.reachable(&2);
        r.sort();
        assert_eq!(r, vec![0, 1]);
        assert!(dag.reachable(&0).is_empty());
    }
}
