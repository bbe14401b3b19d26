//! Owned RDF terms handed out by query results.

use std::fmt;

use sophia::api::term::{Term as RdfTerm, TermKind};

pub const RDF_TYPE_IRI: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
pub const XSD_NS: &str = "http://www.w3.org/2001/XMLSchema#";
pub const XSD_STRING_IRI: &str = "http://www.w3.org/2001/XMLSchema#string";
pub const XSD_INTEGER_IRI: &str = "http://www.w3.org/2001/XMLSchema#integer";
pub const XSD_DOUBLE_IRI: &str = "http://www.w3.org/2001/XMLSchema#double";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Literal {
    pub lexical: String,
    pub datatype: Option<String>,
    pub language: Option<String>,
}

impl Literal {
    pub fn plain(lexical: impl Into<String>) -> Self {
        Self {
            lexical: lexical.into(),
            datatype: None,
            language: None,
        }
    }

    pub fn typed(lexical: impl Into<String>, datatype: impl Into<String>) -> Self {
        Self {
            lexical: lexical.into(),
            datatype: Some(datatype.into()),
            language: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Term {
    Iri(String),
    BlankNode(String),
    Literal(Literal),
}

impl Term {
    pub fn iri(iri: impl Into<String>) -> Self {
        Term::Iri(iri.into())
    }

    /// Copy a Sophia term. Variables and quoted triples have no counterpart.
    pub fn from_rdf<T: RdfTerm>(term: T) -> Option<Self> {
        match term.kind() {
            TermKind::Iri => term.iri().map(|iri| Term::Iri(iri.as_str().to_string())),
            TermKind::BlankNode => term
                .bnode_id()
                .map(|id| Term::BlankNode(id.as_str().to_string())),
            TermKind::Literal => {
                let lexical = term.lexical_form()?.to_string();
                let language = term.language_tag().map(|tag| tag.as_str().to_string());
                // language-tagged literals are rdf:langString; keep only the tag
                let datatype = match language {
                    Some(_) => None,
                    None => term.datatype().map(|dt| dt.as_str().to_string()),
                };
                Some(Term::Literal(Literal {
                    lexical,
                    datatype,
                    language,
                }))
            }
            TermKind::Triple | TermKind::Variable => None,
        }
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Term::Literal(lit) => Some(lit),
            _ => None,
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Iri(iri) => write!(f, "<{iri}>"),
            Term::BlankNode(bn) => write!(f, "_:{bn}"),
            Term::Literal(lit) => {
                write!(f, "\"{}\"", lit.lexical.escape_default())?;
                if let Some(lang) = &lit.language {
                    write!(f, "@{lang}")
                } else if let Some(dt) = &lit.datatype {
                    write!(f, "^^<{dt}>")
                } else {
                    Ok(())
                }
            }
        }
    }
}

pub(crate) fn local_name(iri: &str) -> &str {
    iri.rsplit(['#', '/']).next().unwrap_or(iri)
}
