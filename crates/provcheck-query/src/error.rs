use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    #[error("query needs at least one {role} name")]
    EmptyNameList { role: &'static str },
    #[error("invalid name `{name}`: {reason}")]
    InvalidName { name: String, reason: String },
    #[error("names `{first}` and `{second}` both map to the query variable `?{identifier}`")]
    AmbiguousName {
        first: String,
        second: String,
        identifier: String,
    },
    #[error("invalid IRI <{iri}>: {reason}")]
    InvalidIri { iri: String, reason: String },
    #[error("query matched no method instances:\n{query}")]
    EmptyResult { query: String },
    #[error("result row {row} has no binding for `?{variable}`")]
    UnboundVariable { row: usize, variable: String },
    #[error("query engine failed: {0}")]
    Engine(String),
}
