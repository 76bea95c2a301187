//! The prerequisite graph and cycle detection.
//!
//! Nodes are course codes; an arc `A -> B` means "A requires B". The graph is a
//! borrowed view over one canonical snapshot and is rebuilt per run.
//!
//! An edge `u -> v` lies on a cycle exactly when `u` is reachable from `v`.
//! Reachability is computed once per distinct edge target and memoized, so the
//! detector is complete and never reports an edge that no cycle passes through.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::model::{Course, PrerequisiteEdge};

/// Directed "requires" graph over a canonical snapshot.
#[derive(Debug, Clone, Default)]
pub struct PrerequisiteGraph<'a> {
    nodes: BTreeSet<&'a str>,
    /// Distinct edges in insertion order.
    edges: Vec<&'a PrerequisiteEdge>,
    /// course -> courses it directly requires, in insertion order.
    requires: BTreeMap<&'a str, Vec<&'a str>>,
}

impl<'a> PrerequisiteGraph<'a> {
    /// Build from courses and edges. Edge endpoints become nodes even when no
    /// course carries that code; duplicate edges are ignored.
    pub fn build(courses: &'a [Course], prereqs: &'a [PrerequisiteEdge]) -> Self {
        let mut graph = Self::default();
        graph
            .nodes
            .extend(courses.iter().map(|c| c.course_code.as_str()));

        let mut seen = HashSet::new();
        for edge in prereqs {
            if !seen.insert(edge) {
                continue;
            }
            let from = edge.course_code.as_str();
            let to = edge.required_course_code.as_str();
            graph.nodes.insert(from);
            graph.nodes.insert(to);
            graph.requires.entry(from).or_default().push(to);
            graph.edges.push(edge);
        }
        graph
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Courses `course` directly requires.
    pub fn requires(&self, course: &str) -> &[&'a str] {
        self.requires.get(course).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every course reachable from `start` along "requires" arcs, including
    /// `start` itself.
    pub fn reachable_from(&self, start: &'a str) -> BTreeSet<&'a str> {
        let mut visited = BTreeSet::new();
        let mut stack = vec![start];
        while let Some(node) = stack.pop() {
            if !visited.insert(node) {
                continue;
            }
            stack.extend(
                self.requires(node)
                    .iter()
                    .copied()
                    .filter(|next| !visited.contains(next)),
            );
        }
        visited
    }

    /// Edges that participate in at least one cycle, in insertion order.
    pub fn cyclic_edges(&self) -> Vec<PrerequisiteEdge> {
        let mut reach: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        let mut cyclic = Vec::new();

        for &edge in &self.edges {
            let from = edge.course_code.as_str();
            let to = edge.required_course_code.as_str();
            let reachable = reach.entry(to).or_insert_with(|| self.reachable_from(to));
            if reachable.contains(from) {
                cyclic.push(edge.clone());
            }
        }
        cyclic
    }
}

/// Every prerequisite edge that participates in a cycle. Empty when the
/// graph is acyclic.
pub fn find_cycles(courses: &[Course], prereqs: &[PrerequisiteEdge]) -> Vec<PrerequisiteEdge> {
    let graph = PrerequisiteGraph::build(courses, prereqs);
    let cycles = graph.cyclic_edges();
    if cycles.is_empty() {
        tracing::info!(
            "no circular prerequisites across {} courses and {} edges",
            graph.node_count(),
            graph.edge_count()
        );
    } else {
        let listed: Vec<String> = cycles.iter().map(ToString::to_string).collect();
        tracing::error!("circular prerequisite dependency detected: {listed:?}");
    }
    cycles
}
