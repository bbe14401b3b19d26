//! Ground-truth documents.
//!
//! Each tool writes a `summary.json` next to its simulation outputs: a list of
//! run summaries, each with the run's parameters and the metrics computed from
//! it. Parameters are either bare scalars or `{ "value": .., "unit": .. }`
//! objects.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use provcheck_query::ResultTable;

use crate::validator::ValidationError;

pub const DEFAULT_KEY_PARAMETER: &str = "element-size";
pub const DEFAULT_METRIC: &str = "max_von_mises_stress_nodes";
pub const DEFAULT_TRUTH_FILE: &str = "summary.json";

/// `(tool, key parameter value)`; ordered by tool, then by value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TruthKey {
    pub tool: String,
    pub key: f64,
}

impl TruthKey {
    pub fn new(tool: impl Into<String>, key: f64) -> Self {
        Self {
            tool: tool.into(),
            key,
        }
    }
}

impl PartialEq for TruthKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for TruthKey {}

impl PartialOrd for TruthKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TruthKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.tool
            .cmp(&other.tool)
            .then_with(|| self.key.total_cmp(&other.key))
    }
}

impl fmt::Display for TruthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.tool, self.key)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TruthEntry {
    pub tool: String,
    pub key: f64,
    pub expected: f64,
}

/// Expected metric value per [`TruthKey`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TruthTable {
    entries: BTreeMap<TruthKey, f64>,
}

impl TruthTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new key; an existing key is a [`TruthError::DuplicateKey`].
    pub fn insert(&mut self, key: TruthKey, expected: f64) -> Result<(), TruthError> {
        if self.entries.contains_key(&key) {
            return Err(TruthError::DuplicateKey { key });
        }
        self.entries.insert(key, expected);
        Ok(())
    }

    pub fn get(&self, key: &TruthKey) -> Option<f64> {
        self.entries.get(key).copied()
    }

    pub fn contains(&self, key: &TruthKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TruthKey, f64)> {
        self.entries.iter().map(|(k, v)| (k, *v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &TruthKey> {
        self.entries.keys()
    }

    /// Merge `other` in; overlapping keys are an error.
    pub fn merge(&mut self, other: TruthTable) -> Result<(), TruthError> {
        for (key, expected) in other.entries {
            self.insert(key, expected)?;
        }
        Ok(())
    }

    /// Flat, serializable view.
    pub fn entries(&self) -> Vec<TruthEntry> {
        self.entries
            .iter()
            .map(|(k, v)| TruthEntry {
                tool: k.tool.clone(),
                key: k.key,
                expected: *v,
            })
            .collect()
    }
}

impl FromIterator<(TruthKey, f64)> for TruthTable {
    /// Later duplicates overwrite earlier ones.
    fn from_iter<I: IntoIterator<Item = (TruthKey, f64)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TruthError {
    #[error("failed to read ground truth {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse ground truth {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{}: run #{index} has no `{field}`", path.display())]
    MissingField {
        path: PathBuf,
        index: usize,
        field: String,
    },
    #[error("{}: run #{index} has non-numeric `{field}` ({value})", path.display())]
    NonNumeric {
        path: PathBuf,
        index: usize,
        field: String,
        value: String,
    },
    #[error("duplicate ground-truth entry for {key}")]
    DuplicateKey { key: TruthKey },
}

/// One entry of a `summary.json` document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub benchmark: Option<String>,
    #[serde(default)]
    pub parameters: BTreeMap<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mesh: Option<String>,
    #[serde(default)]
    pub metrics: BTreeMap<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SummaryDocument {
    Many(Vec<RunSummary>),
    One(Box<RunSummary>),
}

/// Numeric reading of a summary field: number, numeric string, or `{value}`.
pub fn numeric(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        serde_json::Value::Object(map) => map.get("value").and_then(numeric),
        _ => None,
    }
}

impl RunSummary {
    pub fn parameter(&self, name: &str) -> Option<f64> {
        self.parameters.get(name).and_then(numeric)
    }
}

/// Parameters pinned to a reference value; only matching runs are compared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixedParameterFilter {
    constraints: Vec<(String, f64)>,
}

impl Default for FixedParameterFilter {
    /// Linear elements: `element-order = 1`, `element-degree = 1`.
    fn default() -> Self {
        Self {
            constraints: vec![
                ("element-order".to_string(), 1.0),
                ("element-degree".to_string(), 1.0),
            ],
        }
    }
}

impl FixedParameterFilter {
    /// A filter that accepts everything.
    pub fn none() -> Self {
        Self {
            constraints: Vec::new(),
        }
    }

    pub fn new<I, S>(constraints: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        Self {
            constraints: constraints
                .into_iter()
                .map(|(n, v)| (n.into(), v))
                .collect(),
        }
    }

    pub fn constraints(&self) -> &[(String, f64)] {
        &self.constraints
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.constraints.iter().map(|(n, _)| n.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    /// Runs missing a constrained parameter do not pass.
    pub fn accepts(&self, run: &RunSummary) -> bool {
        self.constraints
            .iter()
            .all(|(name, reference)| run.parameter(name) == Some(*reference))
    }

    /// Keep only the rows whose constrained columns hold the reference values.
    pub fn filter_table(&self, table: &ResultTable) -> Result<ResultTable, ValidationError> {
        let mut columns = Vec::with_capacity(self.constraints.len());
        for (name, reference) in &self.constraints {
            let index = table
                .column_index(name)
                .ok_or_else(|| ValidationError::MissingColumn { name: name.clone() })?;
            columns.push((index, *reference));
        }
        let mut filtered = table.clone();
        filtered.retain_rows(|row| {
            columns
                .iter()
                .all(|(i, reference)| row.get(*i).and_then(|v| v.to_number()) == Some(*reference))
        });
        tracing::debug!(
            before = table.len(),
            after = filtered.len(),
            "applied fixed-parameter filter to result table"
        );
        Ok(filtered)
    }
}

/// Reads per-tool `summary.json` files into a [`TruthTable`].
#[derive(Debug, Clone, PartialEq)]
pub struct TruthLoader {
    pub key_parameter: String,
    pub metric: String,
    pub filter: FixedParameterFilter,
    pub file_name: String,
}

impl Default for TruthLoader {
    fn default() -> Self {
        Self {
            key_parameter: DEFAULT_KEY_PARAMETER.to_string(),
            metric: DEFAULT_METRIC.to_string(),
            filter: FixedParameterFilter::default(),
            file_name: DEFAULT_TRUTH_FILE.to_string(),
        }
    }
}

impl TruthLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key_parameter(mut self, name: impl Into<String>) -> Self {
        self.key_parameter = name.into();
        self
    }

    pub fn with_metric(mut self, name: impl Into<String>) -> Self {
        self.metric = name.into();
        self
    }

    pub fn with_filter(mut self, filter: FixedParameterFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = name.into();
        self
    }

    /// Parse one tool's summary document. `path` is only used in errors.
    pub fn parse(&self, tool: &str, bytes: &[u8], path: &Path) -> Result<TruthTable, TruthError> {
        let runs = match serde_json::from_slice::<SummaryDocument>(bytes) {
            Ok(SummaryDocument::Many(runs)) => runs,
            Ok(SummaryDocument::One(run)) => vec![*run],
            Err(source) => {
                return Err(TruthError::Parse {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let mut table = TruthTable::new();
        let mut skipped = 0usize;
        for (index, run) in runs.iter().enumerate() {
            if !self.filter.accepts(run) {
                skipped += 1;
                continue;
            }
            let key = self.field(
                path,
                index,
                &self.key_parameter,
                run.parameters.get(&self.key_parameter),
            )?;
            let expected =
                self.field(path, index, &self.metric, run.metrics.get(&self.metric))?;
            table.insert(TruthKey::new(tool, key), expected)?;
        }
        tracing::debug!(
            tool,
            path = %path.display(),
            runs = runs.len(),
            kept = table.len(),
            skipped,
            "parsed ground truth"
        );
        Ok(table)
    }

    fn field(
        &self,
        path: &Path,
        index: usize,
        name: &str,
        value: Option<&serde_json::Value>,
    ) -> Result<f64, TruthError> {
        let value = value.ok_or_else(|| TruthError::MissingField {
            path: path.to_path_buf(),
            index,
            field: name.to_string(),
        })?;
        numeric(value).ok_or_else(|| TruthError::NonNumeric {
            path: path.to_path_buf(),
            index,
            field: name.to_string(),
            value: value.to_string(),
        })
    }

    /// Ground truth of one tool, read from `root/<tool>/<file_name>`.
    pub fn load_tool(&self, root: &Path, tool: &str) -> Result<TruthTable, TruthError> {
        let path = root.join(tool).join(&self.file_name);
        let bytes = std::fs::read(&path).map_err(|source| TruthError::Io {
            path: path.clone(),
            source,
        })?;
        self.parse(tool, &bytes, &path)
    }

    /// Load every tool in parallel and merge.
    ///
    /// On failure the error of the first failing tool (in `tools` order) is
    /// returned; the others are logged.
    pub fn load(&self, root: &Path, tools: &[String]) -> Result<TruthTable, TruthError> {
        let results: Vec<Result<TruthTable, TruthError>> = tools
            .par_iter()
            .map(|tool| self.load_tool(root, tool))
            .collect();

        let mut merged = TruthTable::new();
        let mut first_error = None;
        for (tool, result) in tools.iter().zip(results) {
            match result {
                Ok(table) if first_error.is_none() => merged.merge(table)?,
                Ok(_) => {}
                Err(err) if first_error.is_none() => first_error = Some(err),
                Err(err) => {
                    tracing::warn!(tool = %tool, error = %err, "ground truth failed to load")
                }
            }
        }
        if let Some(err) = first_error {
            return Err(err);
        }
        tracing::info!(
            root = %root.display(),
            tools = tools.len(),
            entries = merged.len(),
            "loaded ground truth"
        );
        Ok(merged)
    }
}
