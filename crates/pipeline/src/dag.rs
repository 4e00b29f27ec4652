//! # Job DAG
//!
//! Directed acyclic graph of job dependencies using petgraph. An edge
//! `a -> b` means `b` depends on `a`.

use std::collections::HashMap;

use itertools::Itertools;
use petgraph::Direction;
use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Dfs;

use crate::error::{Error, Result};

/// Dependency graph keyed by job title.
#[derive(Debug, Clone, Default)]
pub struct JobGraph {
    graph: DiGraph<String, ()>,
    node_map: HashMap<String, NodeIndex>,
}

impl JobGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a job.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateJob` if the title is already present.
    pub fn add_job(&mut self, title: impl Into<String>) -> Result<()> {
        let title = title.into();
        if self.node_map.contains_key(&title) {
            return Err(Error::duplicate_job(title));
        }

        let index = self.graph.add_node(title.clone());
        self.node_map.insert(title, index);
        Ok(())
    }

    /// Declare that `job` runs after `depends_on`.
    ///
    /// # Errors
    ///
    /// Returns `SelfDependency`, `UnknownJob` or `DuplicateDependency`.
    pub fn add_dependency(&mut self, job: &str, depends_on: &str) -> Result<()> {
        if job == depends_on {
            return Err(Error::self_dependency(job));
        }
        let to = self.index(job)?;
        let from = self.index(depends_on)?;
        if self.graph.contains_edge(from, to) {
            return Err(Error::duplicate_dependency(job, depends_on));
        }

        self.graph.add_edge(from, to, ());
        Ok(())
    }

    pub fn contains(&self, title: &str) -> bool {
        self.node_map.contains_key(title)
    }

    #[must_use]
    pub fn job_count(&self) -> usize {
        self.graph.node_count()
    }

    #[must_use]
    pub fn dependency_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Titles in an order that respects every dependency.
    ///
    /// # Errors
    ///
    /// Returns `CycleDetected` naming the jobs on a cycle.
    pub fn execution_order(&self) -> Result<Vec<String>> {
        toposort(&self.graph, None)
            .map(|order| order.into_iter().map(|ix| self.title(ix)).collect_vec())
            .map_err(|_| Error::cycle_detected(self.cyclic_jobs()))
    }

    /// Direct dependencies of a job.
    ///
    /// # Errors
    ///
    /// Returns `UnknownJob` if the title is absent.
    pub fn dependencies_of(&self, title: &str) -> Result<Vec<String>> {
        let index = self.index(title)?;
        Ok(self
            .graph
            .neighbors_directed(index, Direction::Incoming)
            .map(|ix| self.title(ix))
            .sorted()
            .collect_vec())
    }

    /// Every job that depends on `title`, directly or transitively.
    ///
    /// # Errors
    ///
    /// Returns `UnknownJob` if the title is absent.
    pub fn dependents_of(&self, title: &str) -> Result<Vec<String>> {
        let start = self.index(title)?;
        let mut dfs = Dfs::new(&self.graph, start);
        let mut dependents = Vec::new();
        while let Some(ix) = dfs.next(&self.graph) {
            if ix != start {
                dependents.push(self.title(ix));
            }
        }
        dependents.sort();
        Ok(dependents)
    }

    fn index(&self, title: &str) -> Result<NodeIndex> {
        self.node_map
            .get(title)
            .copied()
            .ok_or_else(|| Error::unknown_job(title))
    }

    fn title(&self, index: NodeIndex) -> String {
        self.graph.node_weight(index).cloned().unwrap_or_default()
    }

    fn cyclic_jobs(&self) -> Vec<String> {
        tarjan_scc(&self.graph)
            .into_iter()
            .filter(|component| component.len() > 1)
            .flatten()
            .map(|ix| self.title(ix))
            .sorted()
            .collect_vec()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::panic)]

    use super::*;

    fn graph(jobs: &[&str], edges: &[(&str, &str)]) -> Result<JobGraph> {
        let mut graph = JobGraph::new();
        for job in jobs {
            graph.add_job(*job)?;
        }
        for (job, depends_on) in edges {
            graph.add_dependency(job, depends_on)?;
        }
        Ok(graph)
    }

    fn position(order: &[String], title: &str) -> Option<usize> {
        order.iter().position(|t| t == title)
    }

    #[test]
    fn test_new_graph_is_empty() {
        let graph = JobGraph::new();
        assert_eq!(graph.job_count(), 0);
        assert_eq!(graph.dependency_count(), 0);
    }

    #[test]
    fn test_add_duplicate_job_fails() -> Result<()> {
        let mut graph = JobGraph::new();
        graph.add_job("a")?;
        assert!(matches!(graph.add_job("a"), Err(Error::DuplicateJob { .. })));
        Ok(())
    }

    #[test]
    fn test_invalid_dependencies_rejected() -> Result<()> {
        let mut graph = graph(&["a", "b"], &[("b", "a")])?;

        assert!(matches!(
            graph.add_dependency("a", "a"),
            Err(Error::SelfDependency { .. })
        ));
        assert!(matches!(
            graph.add_dependency("a", "missing"),
            Err(Error::UnknownJob { .. })
        ));
        assert!(matches!(
            graph.add_dependency("b", "a"),
            Err(Error::DuplicateDependency { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_execution_order_respects_edges() -> Result<()> {
        let edges = [("b", "a"), ("c", "b"), ("d", "b"), ("d", "c")];
        let graph = graph(&["d", "c", "b", "a"], &edges)?;

        let order = graph.execution_order()?;

        assert_eq!(order.len(), 4);
        for (job, depends_on) in edges {
            assert!(position(&order, depends_on) < position(&order, job));
        }
        Ok(())
    }

    #[test]
    fn test_cycle_detected() -> Result<()> {
        let graph = graph(&["a", "b", "c", "x"], &[("b", "a"), ("c", "b"), ("a", "c")])?;

        match graph.execution_order() {
            Err(Error::CycleDetected { jobs }) => assert_eq!(jobs, vec!["a", "b", "c"]),
            other => panic!("expected CycleDetected, got {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn test_dependents_are_transitive() -> Result<()> {
        let graph = graph(
            &["a", "b", "c", "d", "e"],
            &[("b", "a"), ("c", "b"), ("d", "a"), ("e", "d")],
        )?;

        assert_eq!(graph.dependents_of("b")?, vec!["c"]);
        assert_eq!(graph.dependents_of("a")?, vec!["b", "c", "d", "e"]);
        assert!(graph.dependents_of("c")?.is_empty());
        assert_eq!(graph.dependencies_of("c")?, vec!["b"]);
        Ok(())
    }
}
