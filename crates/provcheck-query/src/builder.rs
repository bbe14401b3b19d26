use provcheck_graph::term::RDF_TYPE_IRI;

use crate::error::QueryError;
use crate::ident::{Role, VariableMap, METHOD_VAR, TOOL_NAME_VAR, TOOL_VAR};
use crate::ir::{check_iri, Expression, GraphPattern, PatternTerm, SelectQuery, TriplePattern};
use crate::spec::QuerySpec;
use crate::vocab::{
    M4I_HAS_PARAMETER, M4I_INVESTIGATES, M4I_METHOD, PREFIXES, RDFS_LABEL, SCHEMA_PROPERTY_VALUE,
    SCHEMA_SOFTWARE_APPLICATION, SCHEMA_VALUE, SSN_IMPLEMENTED_BY,
};

/// A built query together with the name mapping used to read its results.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub select: SelectQuery,
    pub variables: VariableMap,
}

impl Query {
    pub fn to_sparql(&self) -> String {
        self.select.to_sparql()
    }
}

fn triple(s: PatternTerm, p: &str, o: PatternTerm) -> TriplePattern {
    TriplePattern::new(s, PatternTerm::iri(p), o)
}

/// Build the method-provenance query for `spec`.
///
/// Pure: the same spec always yields the same query.
pub fn build(spec: &QuerySpec) -> Result<Query, QueryError> {
    if spec.parameters().is_empty() {
        return Err(QueryError::EmptyNameList {
            role: Role::Parameter.label(),
        });
    }
    if spec.metrics().is_empty() {
        return Err(QueryError::EmptyNameList {
            role: Role::Metric.label(),
        });
    }
    let variables = VariableMap::new(spec.parameters(), spec.metrics())?;

    let method = PatternTerm::var(METHOD_VAR);
    let mut triples = vec![triple(method.clone(), RDF_TYPE_IRI, PatternTerm::iri(M4I_METHOD))];

    for binding in variables.entries() {
        let link = match binding.role {
            Role::Parameter => M4I_HAS_PARAMETER,
            Role::Metric => M4I_INVESTIGATES,
        };
        let node = PatternTerm::Var(binding.node_var.clone());
        triples.push(triple(method.clone(), link, node.clone()));
        triples.push(triple(
            node.clone(),
            RDF_TYPE_IRI,
            PatternTerm::iri(SCHEMA_PROPERTY_VALUE),
        ));
        triples.push(triple(
            node.clone(),
            RDFS_LABEL,
            PatternTerm::Literal(binding.name.clone()),
        ));
        triples.push(triple(
            node,
            SCHEMA_VALUE,
            PatternTerm::Var(binding.value_var.clone()),
        ));
    }

    let tool = PatternTerm::var(TOOL_VAR);
    triples.push(triple(method, SSN_IMPLEMENTED_BY, tool.clone()));
    triples.push(triple(
        tool.clone(),
        RDF_TYPE_IRI,
        PatternTerm::iri(SCHEMA_SOFTWARE_APPLICATION),
    ));
    triples.push(triple(tool, RDFS_LABEL, PatternTerm::var(TOOL_NAME_VAR)));

    let mut filters = Vec::new();
    if !spec.tool_filters().is_empty() {
        let alternatives = spec
            .tool_filters()
            .iter()
            .map(|f| Expression::lcase_contains(TOOL_NAME_VAR, &f.to_lowercase()))
            .collect();
        filters.push(Expression::Or(alternatives));
    }

    let mut pattern = GraphPattern::Group { triples, filters };
    if let Some(iri) = spec.named_graph() {
        check_iri(iri)?;
        pattern = pattern.scoped(iri.to_string());
    }

    let select = SelectQuery {
        prefixes: PREFIXES
            .iter()
            .map(|(p, ns)| (p.to_string(), ns.to_string()))
            .collect(),
        projection: variables.projection(),
        pattern,
    };
    tracing::debug!(
        parameters = spec.parameters().len(),
        metrics = spec.metrics().len(),
        tool_filters = spec.tool_filters().len(),
        named_graph = spec.named_graph().unwrap_or("-"),
        "built provenance query"
    );
    Ok(Query { select, variables })
}
