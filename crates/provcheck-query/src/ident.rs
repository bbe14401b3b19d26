//! Caller names -> SPARQL variable names.
//!
//! The mapping is computed once per query and carried with it ([`VariableMap`]),
//! so generation and result extraction always agree on which variable holds
//! which parameter or metric.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::QueryError;

pub const METHOD_VAR: &str = "method";
pub const TOOL_VAR: &str = "tool";
pub const TOOL_NAME_VAR: &str = "tool_name";

const NODE_VAR_PREFIX: &str = "param_";

const SPARQL_KEYWORDS: &[&str] = &[
    "a", "as", "asc", "ask", "base", "bind", "by", "construct", "desc", "describe", "distinct",
    "exists", "false", "filter", "from", "graph", "group", "having", "in", "limit", "minus",
    "named", "not", "offset", "optional", "order", "prefix", "reduced", "select", "service",
    "true", "undef", "union", "values", "where",
];

/// Replace every character outside `[A-Za-z0-9_]` with `_` and prefix a
/// leading digit with `_`. Already-safe identifiers are returned unchanged.
pub fn sanitize_identifier(name: &str) -> String {
    let mut out: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

fn check_identifier(name: &str, identifier: &str) -> Result<(), QueryError> {
    let invalid = |reason: &str| QueryError::InvalidName {
        name: name.to_string(),
        reason: reason.to_string(),
    };
    if name.trim().is_empty() {
        return Err(invalid("name is empty"));
    }
    if !identifier.chars().any(|c| c.is_ascii_alphanumeric()) {
        return Err(invalid(&format!(
            "sanitizes to `{identifier}`, which has no letters or digits"
        )));
    }
    let lowered = identifier.to_ascii_lowercase();
    if SPARQL_KEYWORDS.contains(&lowered.as_str()) {
        return Err(invalid(&format!(
            "sanitizes to the reserved SPARQL keyword `{identifier}`"
        )));
    }
    if [METHOD_VAR, TOOL_VAR, TOOL_NAME_VAR].contains(&identifier) {
        return Err(invalid(&format!(
            "sanitizes to `{identifier}`, which the query uses internally"
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Linked via `m4i:hasParameter` (an input of the method).
    Parameter,
    /// Linked via `m4i:investigates` (an output of the method).
    Metric,
}

impl Role {
    pub fn label(self) -> &'static str {
        match self {
            Role::Parameter => "parameter",
            Role::Metric => "metric",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableBinding {
    pub name: String,
    pub role: Role,
    /// Variable bound to the recorded value.
    pub value_var: String,
    /// Variable bound to the intermediate `schema:PropertyValue` node.
    pub node_var: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableMap {
    entries: Vec<VariableBinding>,
    by_var: HashMap<String, usize>,
    by_name: HashMap<String, usize>,
}

impl VariableMap {
    /// Build the map for `parameters` then `metrics` (order is preserved).
    pub fn new(parameters: &[String], metrics: &[String]) -> Result<Self, QueryError> {
        let mut entries = Vec::with_capacity(parameters.len() + metrics.len());
        // variable -> name that produced it
        let mut owners: HashMap<String, String> = HashMap::new();

        let tagged = parameters
            .iter()
            .map(|n| (n, Role::Parameter))
            .chain(metrics.iter().map(|n| (n, Role::Metric)));
        for (name, role) in tagged {
            let value_var = sanitize_identifier(name);
            check_identifier(name, &value_var)?;
            let node_var = format!("{NODE_VAR_PREFIX}{value_var}");

            for var in [&value_var, &node_var] {
                if let Some(first) = owners.get(var) {
                    return Err(QueryError::AmbiguousName {
                        first: first.clone(),
                        second: name.clone(),
                        identifier: var.clone(),
                    });
                }
            }
            owners.insert(value_var.clone(), name.clone());
            owners.insert(node_var.clone(), name.clone());

            entries.push(VariableBinding {
                name: name.clone(),
                role,
                value_var,
                node_var,
            });
        }

        let by_var = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.value_var.clone(), i))
            .collect();
        let by_name = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.name.clone(), i))
            .collect();
        Ok(Self {
            entries,
            by_var,
            by_name,
        })
    }

    pub fn entries(&self) -> &[VariableBinding] {
        &self.entries
    }

    pub fn with_role(&self, role: Role) -> impl Iterator<Item = &VariableBinding> {
        self.entries.iter().filter(move |e| e.role == role)
    }

    pub fn variable_for(&self, name: &str) -> Option<&str> {
        self.by_name
            .get(name)
            .map(|&i| self.entries[i].value_var.as_str())
    }

    pub fn name_for(&self, variable: &str) -> Option<&str> {
        self.by_var
            .get(variable)
            .map(|&i| self.entries[i].name.as_str())
    }

    /// Selected variables: parameters, metrics, then the tool label.
    pub fn projection(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|e| e.value_var.clone())
            .chain(std::iter::once(TOOL_NAME_VAR.to_string()))
            .collect()
    }
}
