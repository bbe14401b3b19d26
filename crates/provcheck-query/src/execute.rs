use provcheck_graph::term::{Term, XSD_NS};
use provcheck_graph::ProvenanceGraph;

use crate::builder::Query;
use crate::engine::{InMemoryEngine, QueryEngine};
use crate::error::QueryError;
use crate::ident::{Role, TOOL_NAME_VAR};
use crate::table::{ResultTable, Value};

const XSD_NUMERIC: &[&str] = &[
    "integer",
    "decimal",
    "double",
    "float",
    "int",
    "long",
    "short",
    "byte",
    "nonNegativeInteger",
    "nonPositiveInteger",
    "positiveInteger",
    "negativeInteger",
    "unsignedLong",
    "unsignedInt",
    "unsignedShort",
    "unsignedByte",
];

const SCHEMA_NUMERIC: &[&str] = &["Float", "Integer", "Number"];

/// XSD numeric types, plus the schema.org numeric data types.
fn is_numeric_datatype(datatype: &str) -> bool {
    if let Some(local) = datatype.strip_prefix(XSD_NS) {
        return XSD_NUMERIC.contains(&local);
    }
    datatype
        .strip_prefix("http://schema.org/")
        .or_else(|| datatype.strip_prefix("https://schema.org/"))
        .map_or(false, |local| SCHEMA_NUMERIC.contains(&local))
}

fn to_value(term: &Term) -> Value {
    match term {
        Term::Literal(lit) => {
            let numeric = lit.datatype.as_deref().map_or(false, is_numeric_datatype);
            if numeric {
                if let Ok(n) = lit.lexical.trim().parse::<f64>() {
                    return Value::Number(n);
                }
            }
            Value::Text(lit.lexical.clone())
        }
        Term::Iri(iri) => Value::Text(iri.clone()),
        Term::BlankNode(id) => Value::Text(format!("_:{id}")),
    }
}

/// Run `query` with the built-in engine.
pub fn execute(graph: &ProvenanceGraph, query: &Query) -> Result<ResultTable, QueryError> {
    execute_with(&InMemoryEngine, graph, query)
}

/// Run `query` with `engine` and normalize the bindings into a [`ResultTable`].
///
/// Rows are in projection order and stable-sorted by the first parameter.
pub fn execute_with<E>(
    engine: &E,
    graph: &ProvenanceGraph,
    query: &Query,
) -> Result<ResultTable, QueryError>
where
    E: QueryEngine + ?Sized,
{
    let bindings = engine.select(graph, &query.select)?;
    if bindings.is_empty() {
        tracing::warn!(locator = %graph.locator(), "query matched nothing");
        return Err(QueryError::EmptyResult {
            query: query.to_sparql(),
        });
    }

    let projection = query.variables.projection();
    let mut rows = Vec::with_capacity(bindings.len());
    for (i, binding) in bindings.iter().enumerate() {
        let row = projection
            .iter()
            .map(|var| {
                binding
                    .get(var)
                    .map(to_value)
                    .ok_or_else(|| QueryError::UnboundVariable {
                        row: i,
                        variable: var.clone(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        rows.push(row);
    }
    rows.sort_by(|a, b| a[0].sort_cmp(&b[0]));

    let headers = query
        .variables
        .entries()
        .iter()
        .map(|e| e.name.clone())
        .chain(std::iter::once(TOOL_NAME_VAR.to_string()))
        .collect();
    let table = ResultTable {
        headers,
        parameter_count: query.variables.with_role(Role::Parameter).count(),
        metric_count: query.variables.with_role(Role::Metric).count(),
        rows,
    };
    tracing::info!(
        locator = %graph.locator(),
        rows = table.len(),
        "extracted method records"
    );
    Ok(table)
}
