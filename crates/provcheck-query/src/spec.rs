use serde::{Deserialize, Serialize};

/// What to look for: method instances exposing these parameters and metrics,
/// produced by a tool whose label contains one of `tool_filters`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuerySpec {
    parameters: Vec<String>,
    metrics: Vec<String>,
    #[serde(default)]
    tool_filters: Vec<String>,
    #[serde(default)]
    named_graph: Option<String>,
}

impl QuerySpec {
    pub fn new<P, M>(parameters: P, metrics: M) -> Self
    where
        P: IntoIterator,
        P::Item: Into<String>,
        M: IntoIterator,
        M::Item: Into<String>,
    {
        Self {
            parameters: parameters.into_iter().map(Into::into).collect(),
            metrics: metrics.into_iter().map(Into::into).collect(),
            tool_filters: Vec::new(),
            named_graph: None,
        }
    }

    pub fn with_tool_filters<T>(mut self, filters: T) -> Self
    where
        T: IntoIterator,
        T::Item: Into<String>,
    {
        self.tool_filters = filters.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_named_graph(mut self, iri: impl Into<String>) -> Self {
        self.named_graph = Some(iri.into());
        self
    }

    pub fn parameters(&self) -> &[String] {
        &self.parameters
    }

    pub fn metrics(&self) -> &[String] {
        &self.metrics
    }

    pub fn tool_filters(&self) -> &[String] {
        &self.tool_filters
    }

    pub fn named_graph(&self) -> Option<&str> {
        self.named_graph.as_deref()
    }
}
