//! Query evaluation over a loaded [`ProvenanceGraph`].
//!
//! [`InMemoryEngine`] serializes the [`SelectQuery`] with
//! [`SelectQuery::to_sparql`] and hands the text to the graph's SPARQL
//! evaluator, so the text a user sees with `--show-sparql` is exactly what runs.

use std::collections::BTreeMap;

use provcheck_graph::{ProvenanceGraph, Term};

use crate::error::QueryError;
use crate::ir::SelectQuery;

/// One solution: variable name (without `?`) -> bound term.
pub type Binding = BTreeMap<String, Term>;

/// Something that can answer a [`SelectQuery`] against a graph.
pub trait QueryEngine {
    fn select(&self, graph: &ProvenanceGraph, query: &SelectQuery)
        -> Result<Vec<Binding>, QueryError>;
}

/// SPARQL over the graph's in-memory dataset.
#[derive(Debug, Clone, Copy, Default)]
pub struct InMemoryEngine;

impl InMemoryEngine {
    pub fn new() -> Self {
        Self
    }
}

impl QueryEngine for InMemoryEngine {
    fn select(
        &self,
        graph: &ProvenanceGraph,
        query: &SelectQuery,
    ) -> Result<Vec<Binding>, QueryError> {
        let sparql = query.to_sparql();
        tracing::trace!(locator = %graph.locator(), %sparql, "evaluating query");
        let solutions = graph
            .select(&sparql)
            .map_err(|e| QueryError::Engine(e.to_string()))?;

        let bindings: Vec<Binding> = solutions
            .rows
            .into_iter()
            .map(|row| {
                solutions
                    .variables
                    .iter()
                    .zip(row)
                    .filter(|(var, _)| query.projection.contains(*var))
                    .filter_map(|(var, term)| term.map(|t| (var.clone(), t)))
                    .collect()
            })
            .collect();
        tracing::debug!(
            locator = %graph.locator(),
            solutions = bindings.len(),
            "evaluated query"
        );
        Ok(bindings)
    }
}
