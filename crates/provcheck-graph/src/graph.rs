use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use sophia::api::dataset::Dataset;
use sophia::api::quad::Quad;
use sophia::api::sparql::{SparqlDataset, SparqlResult};
use sophia::api::term::Term as _;
use sophia::inmem::dataset::FastDataset;
use sophia::sparql::SparqlWrapper;

use crate::term::{local_name, Term, RDF_TYPE_IRI};
use crate::RdfFormat;

#[derive(Debug, thiserror::Error)]
#[error("SPARQL evaluation failed on {locator}: {message}")]
pub struct SelectError {
    pub locator: String,
    pub message: String,
}

/// Rows of a SELECT result; `rows[i][j]` is the binding of `variables[j]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Solutions {
    pub variables: Vec<String>,
    pub rows: Vec<Vec<Option<Term>>>,
}

/// An immutable in-memory dataset loaded from one provenance document.
#[derive(Clone)]
pub struct ProvenanceGraph {
    locator: String,
    path: Option<PathBuf>,
    format: RdfFormat,
    dataset: FastDataset,
    len: usize,
}

impl fmt::Debug for ProvenanceGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProvenanceGraph")
            .field("locator", &self.locator)
            .field("format", &self.format)
            .field("quads", &self.len)
            .finish()
    }
}

impl ProvenanceGraph {
    pub(crate) fn new(
        locator: String,
        path: Option<PathBuf>,
        format: RdfFormat,
        dataset: FastDataset,
    ) -> Self {
        let len = dataset.quads().count();
        Self {
            locator,
            path,
            format,
            dataset,
            len,
        }
    }

    /// Where the document came from (a file path, or `<memory>`).
    pub fn locator(&self) -> &str {
        &self.locator
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn format(&self) -> RdfFormat {
        self.format
    }

    pub fn dataset(&self) -> &FastDataset {
        &self.dataset
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Evaluate a SPARQL SELECT query over this document.
    pub fn select(&self, sparql: &str) -> Result<Solutions, SelectError> {
        let fail = |message: String| SelectError {
            locator: self.locator.clone(),
            message,
        };
        let wrapper = SparqlWrapper(&self.dataset);
        let bindings = match wrapper.query(sparql).map_err(|e| fail(e.to_string()))? {
            SparqlResult::Bindings(bindings) => bindings,
            _ => return Err(fail("not a SELECT query".to_string())),
        };
        let variables: Vec<String> = bindings.variables().into_iter().map(str::to_string).collect();
        let mut rows = Vec::new();
        for row in bindings {
            let row = row.map_err(|e| fail(e.to_string()))?;
            rows.push(row.into_iter().map(|t| t.and_then(Term::from_rdf)).collect());
        }
        Ok(Solutions { variables, rows })
    }

    /// Instance counts per `rdf:type` local name (diagnostics).
    pub fn type_summary(&self) -> BTreeMap<String, usize> {
        let mut out = BTreeMap::new();
        for quad in self.dataset.quads().filter_map(Result::ok) {
            if !quad.p().iri().is_some_and(|p| p.as_str() == RDF_TYPE_IRI) {
                continue;
            }
            if let Some(ty) = quad.o().iri() {
                *out.entry(local_name(ty.as_str()).to_string()).or_insert(0) += 1;
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rdf::parse_dataset;

    fn sample() -> ProvenanceGraph {
        let nq = br#"
<urn:a> <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> <urn:T> .
<urn:a> <urn:label> "a" .
<urn:a> <urn:label> "a" .
<urn:b> <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> <urn:T> <urn:g> .
<urn:b> <urn:label> "b" <urn:g> .
"#;
        let ds = parse_dataset(nq, RdfFormat::NQuads).expect("nquads");
        ProvenanceGraph::new("<memory>".to_string(), None, RdfFormat::NQuads, ds)
    }

    #[test]
    fn duplicate_statements_collapse() {
        assert_eq!(sample().len(), 4);
    }

    #[test]
    fn select_evaluates_sparql_text() {
        let g = sample();
        let solutions = g
            .select("SELECT ?s ?l WHERE { ?s a <urn:T> ; <urn:label> ?l }")
            .expect("select");
        assert_eq!(solutions.variables, vec!["s", "l"]);
        assert!(solutions
            .rows
            .iter()
            .any(|row| row[0] == Some(Term::iri("urn:a"))));

        let named = g
            .select("SELECT ?l WHERE { GRAPH <urn:g> { ?s <urn:label> ?l } }")
            .expect("select");
        assert_eq!(named.rows.len(), 1);
        assert_eq!(
            named.rows[0][0].as_ref().and_then(Term::as_literal).map(|l| l.lexical.as_str()),
            Some("b")
        );
    }

    #[test]
    fn filters_run_in_the_engine() {
        let g = sample();
        let solutions = g
            .select(r#"SELECT ?s WHERE { ?s <urn:label> ?l . FILTER(CONTAINS(LCASE(?l), "A")) }"#)
            .expect("select");
        assert!(solutions.rows.is_empty());
        let solutions = g
            .select(r#"SELECT ?s WHERE { ?s <urn:label> ?l . FILTER(CONTAINS(UCASE(?l), "A")) }"#)
            .expect("select");
        assert_eq!(solutions.rows.len(), 1);
    }

    #[test]
    fn malformed_sparql_is_an_error() {
        let err = sample().select("SELECT WHERE {").expect_err("syntax error");
        assert_eq!(err.locator, "<memory>");
    }

    #[test]
    fn type_summary_counts_local_names() {
        assert_eq!(sample().type_summary().get("T"), Some(&2));
    }
}
