use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

use provcheck_query::{ResultTable, Value};

use crate::truth::{TruthKey, TruthTable};

pub const DEFAULT_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("tool label `{label}` matches none of the configured tools")]
    UnmatchedTool { label: String },
    #[error(
        "provenance and ground truth cover different runs: missing [{}], extra [{}]",
        join_keys(.missing),
        join_keys(.extra)
    )]
    KeySetMismatch {
        missing: Vec<TruthKey>,
        extra: Vec<TruthKey>,
    },
    #[error("value mismatch at {key}: expected {expected}, got {got}")]
    ValueMismatch {
        key: TruthKey,
        expected: f64,
        got: f64,
    },
    #[error("row {row}: column `{column}` is not numeric ({value})")]
    NonNumeric {
        row: usize,
        column: String,
        value: String,
    },
    #[error("runs disagree at {key}: {first} vs {second}")]
    DuplicateRun {
        key: TruthKey,
        first: f64,
        second: f64,
    },
    #[error("result table has no `{name}` column")]
    MissingColumn { name: String },
    #[error("no provenance rows left to compare (after the fixed-parameter filter)")]
    EmptyTable,
    #[error("no ground-truth entries to compare against")]
    EmptyTruth,
    #[error("no provenance document covers the runs of [{}]", .tools.join(", "))]
    UncoveredTools { tools: Vec<String> },
}

fn join_keys(keys: &[TruthKey]) -> String {
    keys.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// First entry of `tools` contained in the lower-cased, trimmed `label`.
pub fn normalize_tool<'t>(label: &str, tools: &'t [String]) -> Option<&'t str> {
    let label = label.trim().to_lowercase();
    tools
        .iter()
        .map(String::as_str)
        .filter(|t| !t.trim().is_empty())
        .find(|t| label.contains(&t.trim().to_lowercase()))
}

/// Compares extracted provenance values against ground truth.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrossValidator {
    tolerance: f64,
}

impl Default for CrossValidator {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

impl CrossValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tolerance(tolerance: f64) -> Self {
        Self { tolerance }
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    fn within(&self, a: f64, b: f64) -> bool {
        (a - b).abs() <= self.tolerance
    }

    /// `(tool, key column) -> first metric column` for every row of `table`.
    pub fn extract(
        &self,
        table: &ResultTable,
        tools: &[String],
    ) -> Result<BTreeMap<TruthKey, f64>, ValidationError> {
        let metric_column = table.metric_columns().start;
        if table.metric_count == 0 || table.parameter_count == 0 {
            return Err(ValidationError::MissingColumn {
                name: if table.parameter_count == 0 {
                    "parameter".to_string()
                } else {
                    "metric".to_string()
                },
            });
        }
        let key_column = table.key_column();
        let tool_column = table.tool_column();

        let number = |row: usize, column: usize, value: Option<&Value>| {
            value
                .and_then(Value::to_number)
                .ok_or_else(|| ValidationError::NonNumeric {
                    row,
                    column: table.headers.get(column).cloned().unwrap_or_default(),
                    value: value.map(ToString::to_string).unwrap_or_default(),
                })
        };

        let mut extracted: BTreeMap<TruthKey, f64> = BTreeMap::new();
        for (i, row) in table.rows.iter().enumerate() {
            let label = row.get(tool_column).map(ToString::to_string).unwrap_or_default();
            let tool = normalize_tool(&label, tools)
                .ok_or_else(|| ValidationError::UnmatchedTool { label: label.clone() })?;
            let key = TruthKey::new(tool, number(i, key_column, row.get(key_column))?);
            let value = number(i, metric_column, row.get(metric_column))?;

            match extracted.get(&key) {
                Some(&first) if self.within(first, value) => {}
                Some(&first) => {
                    return Err(ValidationError::DuplicateRun {
                        key,
                        first,
                        second: value,
                    })
                }
                None => {
                    extracted.insert(key, value);
                }
            }
        }
        Ok(extracted)
    }

    /// Check that `table` covers exactly the runs of `truth`, each within tolerance.
    pub fn validate(
        &self,
        truth: &TruthTable,
        table: &ResultTable,
        tools: &[String],
    ) -> Result<(), ValidationError> {
        self.compare(truth, table, tools, false).map(drop)
    }

    /// Like [`validate`](Self::validate), but only the truth of the tools
    /// that appear in `table` is expected. Returns those tools.
    pub fn validate_scoped(
        &self,
        truth: &TruthTable,
        table: &ResultTable,
        tools: &[String],
    ) -> Result<BTreeSet<String>, ValidationError> {
        self.compare(truth, table, tools, true)
    }

    fn compare(
        &self,
        truth: &TruthTable,
        table: &ResultTable,
        tools: &[String],
        scoped: bool,
    ) -> Result<BTreeSet<String>, ValidationError> {
        if truth.is_empty() {
            return Err(ValidationError::EmptyTruth);
        }
        if table.rows.is_empty() {
            return Err(ValidationError::EmptyTable);
        }
        let extracted = self.extract(table, tools)?;
        let covered: BTreeSet<String> = extracted.keys().map(|k| k.tool.clone()).collect();
        let expected: Vec<(&TruthKey, f64)> = truth
            .iter()
            .filter(|(k, _)| !scoped || covered.contains(&k.tool))
            .collect();

        let missing: Vec<TruthKey> = expected
            .iter()
            .filter(|(k, _)| !extracted.contains_key(*k))
            .map(|(k, _)| (*k).clone())
            .collect();
        let extra: Vec<TruthKey> = extracted
            .keys()
            .filter(|k| !truth.contains(k))
            .cloned()
            .collect();
        if !missing.is_empty() || !extra.is_empty() {
            return Err(ValidationError::KeySetMismatch { missing, extra });
        }

        for (key, expected) in expected {
            let got = extracted[key];
            if !self.within(expected, got) {
                return Err(ValidationError::ValueMismatch {
                    key: key.clone(),
                    expected,
                    got,
                });
            }
        }
        tracing::info!(
            tools = ?covered,
            keys = extracted.len(),
            tolerance = self.tolerance,
            "provenance matches ground truth"
        );
        Ok(covered)
    }

    /// Validate one table per provenance document, in parallel.
    ///
    /// Each table is held to the truth of the tools it mentions; results are
    /// returned in `tables` order. Pair with [`check_coverage`](Self::check_coverage)
    /// so a tool that no document mentions is still reported.
    pub fn validate_many(
        &self,
        truth: &TruthTable,
        tables: &[ResultTable],
        tools: &[String],
    ) -> Vec<Result<BTreeSet<String>, ValidationError>> {
        tables
            .par_iter()
            .map(|table| self.validate_scoped(truth, table, tools))
            .collect()
    }

    /// Every tool with ground truth must appear in at least one table.
    pub fn check_coverage(
        &self,
        truth: &TruthTable,
        tables: &[ResultTable],
        tools: &[String],
    ) -> Result<(), ValidationError> {
        let covered: BTreeSet<&str> = tables
            .iter()
            .flat_map(|table| {
                let column = table.tool_column();
                table.rows.iter().filter_map(move |row| {
                    let label = row.get(column)?.to_string();
                    normalize_tool(&label, tools)
                })
            })
            .collect();
        let uncovered: Vec<String> = truth
            .keys()
            .map(|k| k.tool.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .filter(|tool| !covered.contains(tool))
            .map(str::to_string)
            .collect();
        if uncovered.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::UncoveredTools { tools: uncovered })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tools(xs: &[&str]) -> Vec<String> {
        xs.iter().map(|s| s.to_string()).collect()
    }

    fn table(rows: Vec<Vec<Value>>) -> ResultTable {
        ResultTable {
            headers: vec!["element-size".into(), "stress".into(), "tool_name".into()],
            parameter_count: 1,
            metric_count: 1,
            rows,
        }
    }

    fn row(size: f64, stress: f64, tool: &str) -> Vec<Value> {
        vec![Value::Number(size), Value::Number(stress), Value::Text(tool.into())]
    }

    #[test]
    fn first_listed_tool_wins() {
        let list = tools(&["fenics", "fenics-legacy"]);
        assert_eq!(normalize_tool("Fenics-Legacy-Solver v2", &list), Some("fenics"));
        assert_eq!(normalize_tool("  KRATOS ", &tools(&["kratos"])), Some("kratos"));
        assert_eq!(normalize_tool("abaqus", &list), None);
        assert_eq!(normalize_tool("anything", &tools(&[""])), None);
    }

    #[test]
    fn validates_within_tolerance_across_tool_order() {
        let truth: TruthTable = [(TruthKey::new("fenics", 0.01), 123.4)].into_iter().collect();
        let t = table(vec![row(0.01, 123.400_000_1, "FEniCS-dolfinx")]);
        CrossValidator::new()
            .validate(&truth, &t, &tools(&["kratos", "fenics"]))
            .expect("valid");
    }

    #[test]
    fn tolerance_is_inclusive() {
        let truth: TruthTable = [(TruthKey::new("fenics", 0.01), 0.0)].into_iter().collect();
        let v = CrossValidator::new();
        let list = tools(&["fenics"]);

        v.validate(&truth, &table(vec![row(0.01, 1e-6, "fenics")]), &list)
            .expect("boundary passes");

        let err = v
            .validate(&truth, &table(vec![row(0.01, 1e-6 + 1e-12, "fenics")]), &list)
            .expect_err("just over");
        assert!(matches!(err, ValidationError::ValueMismatch { expected, .. } if expected == 0.0));
    }

    #[test]
    fn nan_never_matches() {
        let truth: TruthTable = [(TruthKey::new("fenics", 0.01), 1.0)].into_iter().collect();
        let err = CrossValidator::new()
            .validate(&truth, &table(vec![row(0.01, f64::NAN, "fenics")]), &tools(&["fenics"]))
            .expect_err("nan");
        assert!(matches!(err, ValidationError::ValueMismatch { .. }));
    }

    #[test]
    fn key_set_differences_are_listed_in_full() {
        let truth: TruthTable = [
            (TruthKey::new("fenics", 0.01), 1.0),
            (TruthKey::new("fenics", 0.02), 2.0),
        ]
        .into_iter()
        .collect();
        let t = table(vec![row(0.01, 1.0, "fenics"), row(0.03, 3.0, "fenics")]);
        let err = CrossValidator::new()
            .validate(&truth, &t, &tools(&["fenics"]))
            .expect_err("mismatch");
        assert_eq!(
            err,
            ValidationError::KeySetMismatch {
                missing: vec![TruthKey::new("fenics", 0.02)],
                extra: vec![TruthKey::new("fenics", 0.03)],
            }
        );
        assert!(err.to_string().contains("missing [(fenics, 0.02)], extra [(fenics, 0.03)]"));
    }

    #[test]
    fn unmatched_tool_is_reported() {
        let err = CrossValidator::new()
            .extract(&table(vec![row(0.01, 1.0, "Abaqus 2023")]), &tools(&["fenics"]))
            .expect_err("unmatched");
        assert_eq!(
            err,
            ValidationError::UnmatchedTool {
                label: "Abaqus 2023".into()
            }
        );
    }

    #[test]
    fn numeric_text_is_accepted_other_text_is_not() {
        let v = CrossValidator::new();
        let list = tools(&["fenics"]);
        let ok = table(vec![vec![
            Value::Text("0.01".into()),
            Value::Text(" 5.5 ".into()),
            Value::Text("fenics".into()),
        ]]);
        let extracted = v.extract(&ok, &list).expect("numeric text");
        assert_eq!(extracted.get(&TruthKey::new("fenics", 0.01)), Some(&5.5));

        let bad = table(vec![vec![
            Value::Number(0.01),
            Value::Text("n/a".into()),
            Value::Text("fenics".into()),
        ]]);
        assert_eq!(
            v.extract(&bad, &list).expect_err("text"),
            ValidationError::NonNumeric {
                row: 0,
                column: "stress".into(),
                value: "n/a".into()
            }
        );
    }

    #[test]
    fn duplicate_rows_collapse_or_conflict() {
        let v = CrossValidator::new();
        let list = tools(&["fenics"]);
        let same = table(vec![row(0.01, 1.0, "fenics"), row(0.01, 1.0 + 1e-9, "FEniCS")]);
        assert_eq!(v.extract(&same, &list).expect("collapsed").len(), 1);

        let conflicting = table(vec![row(0.01, 1.0, "fenics"), row(0.01, 2.0, "fenics")]);
        assert_eq!(
            v.extract(&conflicting, &list).expect_err("conflict"),
            ValidationError::DuplicateRun {
                key: TruthKey::new("fenics", 0.01),
                first: 1.0,
                second: 2.0
            }
        );
    }

    #[test]
    fn custom_tolerance() {
        let truth: TruthTable = [(TruthKey::new("fenics", 0.01), 100.0)].into_iter().collect();
        let t = table(vec![row(0.01, 100.4, "fenics")]);
        let list = tools(&["fenics"]);
        assert!(CrossValidator::new().validate(&truth, &t, &list).is_err());
        assert!(CrossValidator::with_tolerance(0.5).validate(&truth, &t, &list).is_ok());
    }

    #[test]
    fn nothing_to_compare_is_an_error() {
        let truth: TruthTable = [(TruthKey::new("fenics", 0.01), 1.0)].into_iter().collect();
        let v = CrossValidator::new();
        let list = tools(&["fenics"]);
        assert_eq!(
            v.validate(&truth, &table(vec![]), &list),
            Err(ValidationError::EmptyTable)
        );
        assert_eq!(
            v.validate(&TruthTable::new(), &table(vec![row(0.01, 1.0, "fenics")]), &list),
            Err(ValidationError::EmptyTruth)
        );
    }

    #[test]
    fn scoped_validation_expects_only_the_tools_present() {
        let truth: TruthTable = [
            (TruthKey::new("fenics", 0.01), 1.0),
            (TruthKey::new("kratos", 0.01), 2.0),
        ]
        .into_iter()
        .collect();
        let list = tools(&["fenics", "kratos"]);
        let v = CrossValidator::new();
        let fenics_only = table(vec![row(0.01, 1.0, "FEniCS")]);

        assert!(matches!(
            v.validate(&truth, &fenics_only, &list),
            Err(ValidationError::KeySetMismatch { .. })
        ));
        let covered = v.validate_scoped(&truth, &fenics_only, &list).expect("scoped");
        assert_eq!(covered.into_iter().collect::<Vec<_>>(), vec!["fenics".to_string()]);

        assert_eq!(
            v.check_coverage(&truth, &[fenics_only.clone()], &list),
            Err(ValidationError::UncoveredTools {
                tools: vec!["kratos".into()]
            })
        );
        let kratos_only = table(vec![row(0.01, 2.0, "Kratos")]);
        assert_eq!(v.check_coverage(&truth, &[fenics_only, kratos_only], &list), Ok(()));
    }
}
