//! Typed query IR.
//!
//! Queries are assembled as data (triple patterns + filter expressions) and
//! only turned into SPARQL text by [`SelectQuery::to_sparql`]. Every caller
//! string reaches the text through the escaping in this module.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Write as _};

use provcheck_graph::term::RDF_TYPE_IRI;

use crate::error::QueryError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternTerm {
    Var(String),
    Iri(String),
    /// A simple (`xsd:string`) literal.
    Literal(String),
}

impl PatternTerm {
    pub fn var(name: &str) -> Self {
        PatternTerm::Var(name.to_string())
    }

    pub fn iri(iri: &str) -> Self {
        PatternTerm::Iri(iri.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriplePattern {
    pub subject: PatternTerm,
    pub predicate: PatternTerm,
    pub object: PatternTerm,
}

impl TriplePattern {
    pub fn new(subject: PatternTerm, predicate: PatternTerm, object: PatternTerm) -> Self {
        Self {
            subject,
            predicate,
            object,
        }
    }

    pub fn variables(&self) -> impl Iterator<Item = &str> {
        [&self.subject, &self.predicate, &self.object]
            .into_iter()
            .filter_map(|t| match t {
                PatternTerm::Var(v) => Some(v.as_str()),
                _ => None,
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expression {
    Var(String),
    Literal(String),
    LCase(Box<Expression>),
    Contains(Box<Expression>, Box<Expression>),
    Or(Vec<Expression>),
}

impl Expression {
    /// `CONTAINS(LCASE(?var), "needle")`
    pub fn lcase_contains(var: &str, needle: &str) -> Self {
        Expression::Contains(
            Box::new(Expression::LCase(Box::new(Expression::Var(var.to_string())))),
            Box::new(Expression::Literal(needle.to_string())),
        )
    }

    pub fn variables(&self) -> Vec<&str> {
        match self {
            Expression::Var(v) => vec![v.as_str()],
            Expression::Literal(_) => Vec::new(),
            Expression::LCase(inner) => inner.variables(),
            Expression::Contains(a, b) => {
                let mut vars = a.variables();
                vars.extend(b.variables());
                vars
            }
            Expression::Or(items) => items.iter().flat_map(|e| e.variables()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GraphPattern {
    /// Basic graph pattern plus the filters that constrain it.
    Group {
        triples: Vec<TriplePattern>,
        filters: Vec<Expression>,
    },
    /// `GRAPH <name> { inner }`
    Graph {
        name: String,
        inner: Box<GraphPattern>,
    },
}

impl GraphPattern {
    pub fn scoped(self, graph_iri: String) -> Self {
        GraphPattern::Graph {
            name: graph_iri,
            inner: Box::new(self),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectQuery {
    pub prefixes: Vec<(String, String)>,
    pub projection: Vec<String>,
    pub pattern: GraphPattern,
}

/// Reject strings that cannot appear inside `<...>` in SPARQL.
pub fn check_iri(iri: &str) -> Result<(), QueryError> {
    let invalid = |reason: &str| QueryError::InvalidIri {
        iri: iri.to_string(),
        reason: reason.to_string(),
    };
    if iri.is_empty() {
        return Err(invalid("IRI is empty"));
    }
    if let Some(c) = iri
        .chars()
        .find(|c| c.is_whitespace() || c.is_control() || "<>\"{}|^`\\".contains(*c))
    {
        return Err(invalid(&format!("character {c:?} is not allowed in an IRI")));
    }
    let has_scheme = iri
        .split_once(':')
        .map(|(scheme, _)| {
            scheme.starts_with(|c: char| c.is_ascii_alphabetic())
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        })
        .unwrap_or(false);
    if !has_scheme {
        return Err(invalid("IRI must be absolute (scheme:...)"));
    }
    Ok(())
}

fn escape_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

fn is_prefixed_local(local: &str) -> bool {
    !local.is_empty()
        && local.starts_with(|c: char| c.is_ascii_alphanumeric() || c == '_')
        && !local.ends_with('-')
        && local.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

impl SelectQuery {
    fn iri_text(&self, iri: &str) -> String {
        for (prefix, ns) in &self.prefixes {
            if let Some(local) = iri.strip_prefix(ns.as_str()) {
                if is_prefixed_local(local) {
                    return format!("{prefix}:{local}");
                }
            }
        }
        format!("<{iri}>")
    }

    fn term_text(&self, term: &PatternTerm, predicate_position: bool) -> String {
        match term {
            PatternTerm::Var(v) => format!("?{v}"),
            PatternTerm::Iri(iri) if predicate_position && iri == RDF_TYPE_IRI => "a".to_string(),
            PatternTerm::Iri(iri) => self.iri_text(iri),
            PatternTerm::Literal(lit) => escape_literal(lit),
        }
    }

    fn expression_text(&self, expr: &Expression) -> String {
        match expr {
            Expression::Var(v) => format!("?{v}"),
            Expression::Literal(lit) => escape_literal(lit),
            Expression::LCase(inner) => format!("LCASE({})", self.expression_text(inner)),
            Expression::Contains(a, b) => format!(
                "CONTAINS({}, {})",
                self.expression_text(a),
                self.expression_text(b)
            ),
            Expression::Or(items) => items
                .iter()
                .map(|e| self.expression_text(e))
                .collect::<Vec<_>>()
                .join(" || "),
        }
    }

    fn write_pattern(&self, out: &mut String, pattern: &GraphPattern, depth: usize) {
        let indent = "  ".repeat(depth);
        match pattern {
            GraphPattern::Group { triples, filters } => {
                for t in triples {
                    let _ = writeln!(
                        out,
                        "{indent}{} {} {} .",
                        self.term_text(&t.subject, false),
                        self.term_text(&t.predicate, true),
                        self.term_text(&t.object, false)
                    );
                }
                for f in filters {
                    let _ = writeln!(out, "{indent}FILTER({})", self.expression_text(f));
                }
            }
            GraphPattern::Graph { name, inner } => {
                let _ = writeln!(out, "{indent}GRAPH <{name}> {{");
                self.write_pattern(out, inner, depth + 1);
                let _ = writeln!(out, "{indent}}}");
            }
        }
    }

    /// Serialize for a SPARQL 1.1 engine.
    pub fn to_sparql(&self) -> String {
        let mut out = String::new();
        for (prefix, ns) in &self.prefixes {
            let _ = writeln!(out, "PREFIX {prefix}: <{ns}>");
        }
        out.push('\n');
        let vars: Vec<String> = self.projection.iter().map(|v| format!("?{v}")).collect();
        let _ = writeln!(out, "SELECT {}", vars.join(" "));
        out.push_str("WHERE {\n");
        self.write_pattern(&mut out, &self.pattern, 1);
        out.push('}');
        out
    }
}

impl fmt::Display for SelectQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sparql())
    }
}
