use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt::{self, Write as _};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    Text(String),
}

impl Value {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Text(_) => None,
        }
    }

    /// Numeric reading, accepting text that parses as a number.
    pub fn to_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Text(t) => t.trim().parse().ok(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(t) => Some(t),
            Value::Number(_) => None,
        }
    }

    /// Sort order for result rows: numbers (total order) before text.
    pub fn sort_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a.total_cmp(b),
            (Value::Number(_), Value::Text(_)) => Ordering::Less,
            (Value::Text(_), Value::Number(_)) => Ordering::Greater,
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{n}"),
            Value::Text(t) => f.write_str(t),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedValue {
    pub name: String,
    pub value: Value,
}

/// One method instance read back from a result row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodRecord {
    pub tool_name: String,
    pub parameters: BTreeMap<String, NamedValue>,
    pub metrics: BTreeMap<String, NamedValue>,
}

impl MethodRecord {
    pub fn parameter(&self, name: &str) -> Option<&Value> {
        self.parameters.get(name).map(|nv| &nv.value)
    }

    pub fn metric(&self, name: &str) -> Option<&Value> {
        self.metrics.get(name).map(|nv| &nv.value)
    }
}

/// Rows of `parameters.., metrics.., tool_name`, sorted by the first column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultTable {
    pub headers: Vec<String>,
    pub parameter_count: usize,
    pub metric_count: usize,
    pub rows: Vec<Vec<Value>>,
}

impl ResultTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// The comparison key: the first parameter.
    pub fn key_column(&self) -> usize {
        0
    }

    pub fn metric_columns(&self) -> std::ops::Range<usize> {
        self.parameter_count..self.parameter_count + self.metric_count
    }

    pub fn tool_column(&self) -> usize {
        self.parameter_count + self.metric_count
    }

    pub fn records(&self) -> Vec<MethodRecord> {
        let named = |row: &[Value], range: std::ops::Range<usize>| {
            range
                .filter_map(|i| {
                    let name = self.headers.get(i)?.clone();
                    let value = row.get(i)?.clone();
                    Some((name.clone(), NamedValue { name, value }))
                })
                .collect::<BTreeMap<_, _>>()
        };
        self.rows
            .iter()
            .map(|row| MethodRecord {
                tool_name: row
                    .get(self.tool_column())
                    .map(ToString::to_string)
                    .unwrap_or_default(),
                parameters: named(row.as_slice(), 0..self.parameter_count),
                metrics: named(row.as_slice(), self.metric_columns()),
            })
            .collect()
    }

    pub fn retain_rows<F>(&mut self, keep: F)
    where
        F: FnMut(&Vec<Value>) -> bool,
    {
        self.rows.retain(keep);
    }

    /// Aligned plain-text table.
    pub fn render_text(&self) -> String {
        let cells: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|r| r.iter().map(ToString::to_string).collect())
            .collect();
        let widths: Vec<usize> = self
            .headers
            .iter()
            .enumerate()
            .map(|(i, h)| {
                cells
                    .iter()
                    .filter_map(|r| r.get(i))
                    .map(|c| c.chars().count())
                    .chain(std::iter::once(h.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let mut out = String::new();
        let line = |out: &mut String, row: &[String]| {
            let padded: Vec<String> = row
                .iter()
                .zip(&widths)
                .map(|(c, w)| format!("{c:<w$}"))
                .collect();
            let _ = writeln!(out, "{}", padded.join("  ").trim_end());
        };
        line(&mut out, self.headers.as_slice());
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        line(&mut out, rule.as_slice());
        for row in &cells {
            line(&mut out, row.as_slice());
        }
        out
    }

    pub fn render_csv(&self) -> String {
        fn field(s: &str) -> String {
            if s.contains([',', '"', '\n', '\r']) {
                format!("\"{}\"", s.replace('"', "\"\""))
            } else {
                s.to_string()
            }
        }
        let mut out = String::new();
        let header: Vec<String> = self.headers.iter().map(|h| field(h)).collect();
        let _ = writeln!(out, "{}", header.join(","));
        for row in &self.rows {
            let cells: Vec<String> = row.iter().map(|v| field(&v.to_string())).collect();
            let _ = writeln!(out, "{}", cells.join(","));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> ResultTable {
        ResultTable {
            headers: vec![
                "element-size".into(),
                "max_von_mises_stress_nodes".into(),
                "tool_name".into(),
            ],
            parameter_count: 1,
            metric_count: 1,
            rows: vec![
                vec![
                    Value::Number(0.01),
                    Value::Number(123.4),
                    Value::Text("FEniCS, dolfinx".into()),
                ],
                vec![
                    Value::Number(0.02),
                    Value::Number(120.0),
                    Value::Text("Kratos".into()),
                ],
            ],
        }
    }

    #[test]
    fn numbers_sort_before_text() {
        let mut values = vec![
            Value::Text("b".into()),
            Value::Number(2.0),
            Value::Text("a".into()),
            Value::Number(-1.0),
        ];
        values.sort_by(Value::sort_cmp);
        assert_eq!(
            values,
            vec![
                Value::Number(-1.0),
                Value::Number(2.0),
                Value::Text("a".into()),
                Value::Text("b".into()),
            ]
        );
    }

    #[test]
    fn column_helpers() {
        let t = table();
        assert_eq!(t.column_index("tool_name"), Some(2));
        assert_eq!(t.metric_columns(), 1..2);
        assert_eq!(t.tool_column(), 2);
        assert_eq!(t.key_column(), 0);
    }

    #[test]
    fn records_split_roles() {
        let records = table().records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].tool_name, "Kratos");
        assert_eq!(records[0].parameter("element-size"), Some(&Value::Number(0.01)));
        assert_eq!(
            records[0].metric("max_von_mises_stress_nodes"),
            Some(&Value::Number(123.4))
        );
        assert!(records[0].parameter("max_von_mises_stress_nodes").is_none());
    }

    #[test]
    fn csv_quotes_fields_with_commas() {
        let csv = table().render_csv();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "element-size,max_von_mises_stress_nodes,tool_name");
        assert_eq!(lines[1], "0.01,123.4,\"FEniCS, dolfinx\"");
    }

    #[test]
    fn text_render_is_aligned() {
        let text = table().render_text();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[1].starts_with("------------  "));
        assert_eq!(
            lines[0].find("max_von_mises_stress_nodes"),
            lines[2].find("123.4")
        );
    }

    #[test]
    fn json_keeps_numbers_numeric() {
        let json = serde_json::to_value(table()).expect("json");
        assert_eq!(json["rows"][0][0], serde_json::json!(0.01));
        assert_eq!(json["rows"][1][2], serde_json::json!("Kratos"));
    }
}
